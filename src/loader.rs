use image::{ColorType, ImageDecoder, ImageReader};
use std::cell::OnceCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{Result, ViewerError};
use crate::fingerprint::{Fingerprint, fingerprint};

// ---------------------------------------------------------------------------
// Image entry: a path plus attributes resolved on first access
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    pub color_type: String,
}

#[derive(Debug)]
pub struct ImageEntry {
    path: PathBuf,
    info: OnceCell<ImageInfo>,
    fingerprint: OnceCell<Fingerprint>,
}

impl ImageEntry {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            info: OnceCell::new(),
            fingerprint: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Header-level attributes. Probed once, then served from the cell.
    pub fn info(&self) -> Result<&ImageInfo> {
        if let Some(info) = self.info.get() {
            return Ok(info);
        }
        let info = probe_image(&self.path)?;
        Ok(self.info.get_or_init(|| info))
    }

    pub fn shape(&self) -> Result<(u32, u32)> {
        self.info().map(|i| (i.width, i.height))
    }

    pub fn file_size(&self) -> Result<u64> {
        self.info().map(|i| i.file_size)
    }

    pub fn color_type(&self) -> Result<&str> {
        self.info().map(|i| i.color_type.as_str())
    }

    pub fn fingerprint(&self) -> Result<&Fingerprint> {
        if let Some(fp) = self.fingerprint.get() {
            return Ok(fp);
        }
        let fp = fingerprint(&self.path)?;
        Ok(self.fingerprint.get_or_init(|| fp))
    }
}

pub fn io_error(path: &Path, err: io::Error) -> ViewerError {
    if err.kind() == io::ErrorKind::NotFound {
        ViewerError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        ViewerError::Io(err)
    }
}

/// Reads dimensions and pixel format from the header without decoding pixels.
fn probe_image(path: &Path) -> Result<ImageInfo> {
    let file_size = fs::metadata(path).map_err(|e| io_error(path, e))?.len();
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| io_error(path, e))?;
    let decoder = reader
        .into_decoder()
        .map_err(|e| ViewerError::from_image(path.to_path_buf(), e))?;
    let (width, height) = decoder.dimensions();

    Ok(ImageInfo {
        width,
        height,
        file_size,
        color_type: color_type_name(decoder.color_type()).to_string(),
    })
}

pub fn color_type_name(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 => "L",
        ColorType::La8 => "LA",
        ColorType::Rgb8 => "RGB",
        ColorType::Rgba8 => "RGBA",
        ColorType::L16 => "L16",
        ColorType::La16 => "LA16",
        ColorType::Rgb16 => "RGB16",
        ColorType::Rgba16 => "RGBA16",
        ColorType::Rgb32F => "RGB32F",
        ColorType::Rgba32F => "RGBA32F",
        _ => "unknown",
    }
}

// ---------------------------------------------------------------------------
// Decoded image data (CPU side, ready for blitting)
// ---------------------------------------------------------------------------

pub struct DecodedImage {
    pub rgba_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl DecodedImage {
    pub fn mem_size(&self) -> u64 {
        self.rgba_bytes.len() as u64
    }
}

fn decode_image(path: &Path) -> Result<DecodedImage> {
    let img = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| io_error(path, e))?
        .decode()
        .map_err(|e| ViewerError::from_image(path.to_path_buf(), e))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        rgba_bytes: rgba.into_raw(),
        width,
        height,
    })
}

// ---------------------------------------------------------------------------
// Decode cache: pixels of recently shown images, bounded by a byte budget
// ---------------------------------------------------------------------------

pub struct DecodeCache {
    images: HashMap<PathBuf, Rc<DecodedImage>>,
    /// Least recently used first.
    order: VecDeque<PathBuf>,
    pub used_bytes: u64,
    pub budget: u64,
}

impl DecodeCache {
    pub fn new(budget: u64) -> Self {
        Self {
            images: HashMap::new(),
            order: VecDeque::new(),
            used_bytes: 0,
            budget,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn get(&mut self, path: &Path) -> Result<Rc<DecodedImage>> {
        if let Some(img) = self.images.get(path).cloned() {
            self.touch(path);
            return Ok(img);
        }

        let img = Rc::new(decode_image(path)?);
        self.used_bytes += img.mem_size();
        self.images.insert(path.to_path_buf(), Rc::clone(&img));
        self.order.push_back(path.to_path_buf());
        self.evict();
        Ok(img)
    }

    /// Drops a path whose file was moved or restored.
    pub fn forget(&mut self, path: &Path) {
        if let Some(img) = self.images.remove(path) {
            self.used_bytes -= img.mem_size();
            self.order.retain(|p| p != path);
        }
    }

    fn touch(&mut self, path: &Path) {
        if let Some(pos) = self.order.iter().position(|p| p == path) {
            if let Some(p) = self.order.remove(pos) {
                self.order.push_back(p);
            }
        }
    }

    /// The most recent image always stays, even when it alone exceeds the budget.
    fn evict(&mut self) {
        while self.used_bytes > self.budget && self.order.len() > 1 {
            let Some(oldest) = self.order.pop_front() else { break };
            if let Some(img) = self.images.remove(&oldest) {
                self.used_bytes -= img.mem_size();
                log::debug!("[cache] evicted {:?} ({} bytes)", oldest, img.mem_size());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{RgbImage, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn entry_resolves_shape_and_color_type_lazily() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("a.png");
        RgbImage::new(40, 30).save(&path).expect("save");

        let entry = ImageEntry::new(path.clone());
        assert!(entry.info.get().is_none());
        assert_eq!(entry.shape().expect("shape"), (40, 30));
        assert_eq!(entry.color_type().expect("color"), "RGB");
        assert_eq!(entry.file_size().expect("size"), fs::metadata(&path).expect("meta").len());
        assert!(entry.info.get().is_some());
    }

    #[test]
    fn cached_attributes_survive_file_removal() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("b.png");
        RgbaImage::new(8, 8).save(&path).expect("save");

        let entry = ImageEntry::new(path.clone());
        assert_eq!(entry.color_type().expect("color"), "RGBA");
        fs::remove_file(&path).expect("remove");
        assert_eq!(entry.shape().expect("cached shape"), (8, 8));
    }

    #[test]
    fn missing_file_is_not_found() {
        let entry = ImageEntry::new(PathBuf::from("/definitely/not/here.png"));
        assert!(matches!(entry.info(), Err(ViewerError::NotFound { .. })));
    }

    #[test]
    fn garbage_bytes_do_not_decode() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("broken.png");
        fs::write(&path, b"this is not a png").expect("write");

        let entry = ImageEntry::new(path);
        let err = entry.info().expect_err("should fail");
        assert!(matches!(
            err,
            ViewerError::CorruptImage { .. } | ViewerError::UnsupportedFormat { .. }
        ));
    }

    #[test]
    fn cache_evicts_oldest_over_budget() {
        let temp = tempdir().expect("tempdir");
        let paths: Vec<PathBuf> = (0..3)
            .map(|i| {
                let p = temp.path().join(format!("{}.png", i));
                RgbImage::new(10, 10).save(&p).expect("save");
                p
            })
            .collect();

        // Each image is 10 * 10 * 4 bytes; room for two.
        let mut cache = DecodeCache::new(800);
        for p in &paths {
            cache.get(p).expect("decode");
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.used_bytes, 800);
        assert!(!cache.images.contains_key(&paths[0]));

        cache.forget(&paths[2]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.used_bytes, 400);
    }
}
