use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::{Result, ViewerError};
use crate::loader::{ImageEntry, io_error};

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "ppm", "bmp", "gif", "tiff"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Digit runs compare as numbers and letters ignore case; the case-sensitive
/// pass only decides between names that are otherwise equal.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natord::compare_ignore_case(a, b).then_with(|| natord::compare(a, b))
}

// ---------------------------------------------------------------------------
// Filename filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameFilter {
    /// Keep only names containing one of these. Empty keeps everything.
    pub include: Vec<String>,
    /// Drop names containing any of these.
    pub exclude: Vec<String>,
}

impl NameFilter {
    pub fn is_active(&self) -> bool {
        !self.include.is_empty() || !self.exclude.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|s| name.contains(s.as_str()));
        included && !self.exclude.iter().any(|s| name.contains(s.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Directory index
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct DirectoryIndex {
    dir: PathBuf,
    entries: Vec<ImageEntry>,
    filter: NameFilter,
}

impl DirectoryIndex {
    pub fn build(path: &Path) -> Result<Self> {
        Self::build_filtered(path, NameFilter::default())
    }

    /// `path` is either a directory or a seed image whose directory is scanned.
    pub fn build_filtered(path: &Path, filter: NameFilter) -> Result<Self> {
        if !path.exists() {
            return Err(ViewerError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let dir = if path.is_dir() {
            path.to_path_buf()
        } else {
            if !is_image_file(path) {
                return Err(ViewerError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
            match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            }
        };

        if filter.is_active() {
            log::info!("Filtering {:?}: include {:?}, exclude {:?}", dir, filter.include, filter.exclude);
        }
        let start_time = Instant::now();
        let entries = scan_dir(&dir, &filter)?;
        if entries.is_empty() {
            return Err(ViewerError::EmptyDirectory { dir });
        }

        log::info!(
            "Indexed {:?} in {:.3}s: {} images",
            dir,
            start_time.elapsed().as_secs_f64(),
            entries.len()
        );

        Ok(Self {
            dir,
            entries,
            filter,
        })
    }

    /// Rescans the same directory with the same filter.
    pub fn rebuild(&self) -> Result<Self> {
        Self::build_filtered(&self.dir, self.filter.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn filter(&self) -> &NameFilter {
        &self.filter
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entry at `pos`, wrapped into this index's own bounds.
    pub fn entry(&self, pos: usize) -> &ImageEntry {
        &self.entries[pos % self.entries.len()]
    }

    /// Position of `path` by file name.
    pub fn locate(&self, path: &Path) -> Result<usize> {
        let name = path.file_name();
        self.entries
            .iter()
            .position(|e| e.path().file_name() == name)
            .ok_or_else(|| ViewerError::NotInIndex {
                path: path.to_path_buf(),
                dir: self.dir.clone(),
            })
    }
}

fn scan_dir(dir: &Path, filter: &NameFilter) -> Result<Vec<ImageEntry>> {
    let entries = fs::read_dir(dir).map_err(|e| io_error(dir, e))?;
    let mut files: Vec<(String, PathBuf)> = Vec::new();

    for entry in entries.filter_map(|e| e.ok()) {
        let p = entry.path();
        if !p.is_file() || !is_image_file(&p) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if filter.matches(&name) {
            files.push((name, p));
        }
    }

    files.sort_by(|a, b| natural_cmp(&a.0, &b.0));
    Ok(files.into_iter().map(|(_, p)| ImageEntry::new(p)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, b"").expect("write");
        p
    }

    fn names(index: &DirectoryIndex) -> Vec<String> {
        index.entries.iter().map(|e| e.file_name()).collect()
    }

    #[test]
    fn numeric_runs_sort_as_numbers() {
        let temp = tempdir().expect("tempdir");
        for name in ["img2.png", "img10.png", "img1.png"] {
            touch(temp.path(), name);
        }
        let index = DirectoryIndex::build(temp.path()).expect("build");
        assert_eq!(names(&index), ["img1.png", "img2.png", "img10.png"]);
    }

    #[test]
    fn letters_sort_ignoring_case() {
        assert_eq!(natural_cmp("b.png", "A.png"), Ordering::Greater);
        assert_eq!(natural_cmp("file2.png", "file10.png"), Ordering::Less);
        assert_ne!(natural_cmp("a.png", "A.png"), Ordering::Equal);
    }

    #[test]
    fn seed_file_scans_its_directory() {
        let temp = tempdir().expect("tempdir");
        touch(temp.path(), "b.jpg");
        let seed = touch(temp.path(), "a.PNG");
        touch(temp.path(), "notes.txt");
        touch(temp.path(), "c.tiff");

        let index = DirectoryIndex::build(&seed).expect("build");
        assert_eq!(index.dir(), temp.path());
        assert_eq!(names(&index), ["a.PNG", "b.jpg", "c.tiff"]);
        assert_eq!(index.locate(&seed).expect("locate"), 0);
    }

    #[test]
    fn missing_seed_is_not_found() {
        let temp = tempdir().expect("tempdir");
        let err = DirectoryIndex::build(&temp.path().join("nope.png")).expect_err("missing");
        assert!(matches!(err, ViewerError::NotFound { .. }));
    }

    #[test]
    fn unsupported_seed_extension() {
        let temp = tempdir().expect("tempdir");
        let seed = touch(temp.path(), "photo.webp");
        let err = DirectoryIndex::build(&seed).expect_err("webp");
        assert!(matches!(err, ViewerError::UnsupportedFormat { .. }));
    }

    #[test]
    fn directory_without_images_is_rejected() {
        let temp = tempdir().expect("tempdir");
        touch(temp.path(), "readme.md");
        let err = DirectoryIndex::build(temp.path()).expect_err("empty");
        assert!(matches!(err, ViewerError::EmptyDirectory { .. }));
    }

    #[test]
    fn vanished_file_is_not_in_rebuilt_index() {
        let temp = tempdir().expect("tempdir");
        let a = touch(temp.path(), "a.png");
        touch(temp.path(), "b.png");
        let index = DirectoryIndex::build(temp.path()).expect("build");

        fs::remove_file(&a).expect("remove");
        let rebuilt = index.rebuild().expect("rebuild");
        assert_eq!(rebuilt.len(), 1);
        assert!(matches!(rebuilt.locate(&a), Err(ViewerError::NotInIndex { .. })));
    }

    #[test]
    fn filters_apply_and_survive_rebuild() {
        let temp = tempdir().expect("tempdir");
        for name in ["cat_1.png", "cat_2_bad.png", "dog_1.png"] {
            touch(temp.path(), name);
        }
        let filter = NameFilter {
            include: vec!["cat".into()],
            exclude: vec!["bad".into()],
        };
        let index = DirectoryIndex::build_filtered(temp.path(), filter).expect("build");
        assert!(index.filter().is_active());
        assert_eq!(names(&index), ["cat_1.png"]);

        touch(temp.path(), "cat_3.png");
        assert_eq!(names(&index.rebuild().expect("rebuild")), ["cat_1.png", "cat_3.png"]);
    }

    #[test]
    fn entry_wraps_position() {
        let temp = tempdir().expect("tempdir");
        for name in ["1.png", "2.png", "3.png"] {
            touch(temp.path(), name);
        }
        let index = DirectoryIndex::build(temp.path()).expect("build");
        assert_eq!(index.entry(4).file_name(), "2.png");
    }
}
