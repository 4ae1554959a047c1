//! Ingestion policy for the clipboard capture stream.
//!
//! A system clipboard can fire several change notifications for one logical
//! copy action, so the engine decides per event whether anything gets written:
//! the history table should grow at human-action rate, not machine-event rate.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use image::ImageFormat;
use tracing::info;

use crate::db::{ClipboardItem, Database};
use crate::error::{StoreError, StoreResult};
use crate::utils::hash::canonical_image_hash;

const MIN_TEXT_CHARS: usize = 3;
const PREVIEW_CHARS: usize = 100;
const IMAGE_PLACEHOLDER: &str = "[Image]";

/// One observed clipboard change. Image bytes may arrive in any container
/// format the platform hands out.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    Text(String),
    Image(Vec<u8>),
}

pub struct CaptureEngine {
    db: Arc<Database>,
    /// Most recent accepted text, for rejecting immediate repeats. Text dedup
    /// is a single-value comparison, not a history scan.
    last_text: Mutex<Option<String>>,
}

impl CaptureEngine {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            last_text: Mutex::new(None),
        }
    }

    /// Decide whether `event` is novel enough to persist. Returns the stored
    /// row (timestamped by the store) on accept, `None` on reject.
    pub fn process(&self, event: CaptureEvent) -> StoreResult<Option<ClipboardItem>> {
        match event {
            CaptureEvent::Text(content) => self.process_text(&content),
            CaptureEvent::Image(bytes) => self.process_image(&bytes),
        }
    }

    fn process_text(&self, raw: &str) -> StoreResult<Option<ClipboardItem>> {
        let text = raw.trim();
        if text.chars().count() < MIN_TEXT_CHARS {
            return Ok(None);
        }

        let mut last = self.last_text.lock().map_err(|_| StoreError::LockPoisoned)?;
        if last.as_deref() == Some(text) {
            return Ok(None);
        }
        *last = Some(text.to_string());

        let preview = text_preview(text);
        let id = self
            .db
            .add_clipboard_item("text", None, Some(text), Some(&preview))?;
        info!("text capture stored");
        self.db.get_clipboard_item(id)
    }

    /// Image dedup compares canonical bitmaps against the latest stored image
    /// row, so it survives process restarts at the cost of one lookup per
    /// event.
    fn process_image(&self, bytes: &[u8]) -> StoreResult<Option<ClipboardItem>> {
        let incoming = canonical_image_hash(bytes)?;
        if let Some(stored) = self.db.latest_image_data()? {
            if canonical_image_hash(&stored)? == incoming {
                return Ok(None);
            }
        }

        let canonical = canonical_png(bytes)?;
        let id = self.db.add_clipboard_item(
            "image",
            Some(&canonical),
            Some(IMAGE_PLACEHOLDER),
            Some(IMAGE_PLACEHOLDER),
        )?;
        info!("image capture stored");
        self.db.get_clipboard_item(id)
    }
}

/// First 100 characters plus an ellipsis marker when truncated.
pub fn text_preview(content: &str) -> String {
    let mut preview: String = content.chars().take(PREVIEW_CHARS).collect();
    if content.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

fn canonical_png(bytes: &[u8]) -> StoreResult<Vec<u8>> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|err| StoreError::Image(format!("failed to decode image: {err}")))?;
    let mut output = Cursor::new(Vec::new());
    decoded
        .write_to(&mut output, ImageFormat::Png)
        .map_err(|err| StoreError::Image(format!("failed to encode image: {err}")))?;
    Ok(output.into_inner())
}
