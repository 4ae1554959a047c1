pub mod capture;
pub mod db;
pub mod error;
mod utils;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub use capture::{CaptureEngine, CaptureEvent};
pub use db::{
    ClipboardItem, ClipboardQuery, CustomIntegration, Database, IntegrationParameter,
    IntegrationUpsert, Snippet, StoreConfig, WorldClockEntry,
};
pub use error::{StoreError, StoreResult};

/// Install a global compact subscriber writing diagnostics to `path`. The log
/// file is informational only, not part of the data contract. Subsequent calls
/// are no-ops.
pub fn init_logging(path: &Path) -> StoreResult<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}
