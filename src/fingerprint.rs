use image::ImageReader;
use image_hasher::{HashAlg, HasherConfig, ImageHash};
use std::fs;
use std::path::Path;

use crate::error::{Result, ViewerError};
use crate::loader::io_error;

/// Content and perceptual fingerprints of one file, for spotting duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// blake3 of the raw file bytes, hex encoded.
    pub content: String,
    pub perceptual: ImageHash,
}

impl Fingerprint {
    pub fn perceptual_base64(&self) -> String {
        self.perceptual.to_base64()
    }

    /// Hamming distance between the perceptual hashes.
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        self.perceptual.dist(&other.perceptual)
    }

    /// Overlay line: perceptual hash first, then the start of the content hash.
    pub fn label(&self) -> String {
        format!("phash,blake3: {}, {}", self.perceptual_base64(), &self.content[..16])
    }
}

pub fn fingerprint(path: &Path) -> Result<Fingerprint> {
    let bytes = fs::read(path).map_err(|e| io_error(path, e))?;
    let content = blake3::hash(&bytes).to_hex().to_string();

    let img = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| io_error(path, e))?
        .decode()
        .map_err(|e| ViewerError::from_image(path.to_path_buf(), e))?;

    let hasher = HasherConfig::new().hash_alg(HashAlg::Gradient).to_hasher();
    let perceptual = hasher.hash_image(&img);
    log::debug!("[fingerprint] {:?} -> {}", path, perceptual.to_base64());

    Ok(Fingerprint { content, perceptual })
}
