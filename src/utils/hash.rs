use sha2::{Digest, Sha256};

use crate::error::{StoreError, StoreResult};

pub fn sha256_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    format!("{:x}", hasher.finalize())
}

/// Digest of the decoded RGBA pixels, independent of the container format the
/// bytes arrived in. Two captures of the same bitmap compare equal even when one
/// was encoded as PNG and the other as TIFF.
pub fn canonical_image_hash(bytes: &[u8]) -> StoreResult<String> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|err| StoreError::Image(format!("failed to decode image: {err}")))?;
    Ok(sha256_hex(decoded.to_rgba8().as_raw()))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, RgbaImage};

    use super::*;

    fn encode(format: ImageFormat) -> Vec<u8> {
        let rgba = RgbaImage::from_raw(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255]).expect("image");
        let mut output = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut output, format)
            .expect("encode");
        output.into_inner()
    }

    #[test]
    fn hash_is_deterministic() {
        let a = sha256_hex(b"hello");
        let b = sha256_hex(b"hello");
        let c = sha256_hex(b"world");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn canonical_hash_is_format_independent() {
        let png = canonical_image_hash(&encode(ImageFormat::Png)).expect("png hash");
        let tiff = canonical_image_hash(&encode(ImageFormat::Tiff)).expect("tiff hash");
        assert_eq!(png, tiff);
    }

    #[test]
    fn rejects_undecodable_bytes() {
        assert!(canonical_image_hash(b"not an image").is_err());
    }
}
