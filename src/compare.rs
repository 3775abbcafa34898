use std::path::Path;

use crate::error::Result;
use crate::files::DirectoryIndex;

/// Outcome of an alignment check across comparison folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub aligned: bool,
    pub lengths: Vec<usize>,
}

impl Alignment {
    pub fn summary(&self) -> String {
        let counts: Vec<String> = self.lengths.iter().map(|n| n.to_string()).collect();
        format!("Number for each folder:\n\t{}", counts.join("\n\t"))
    }
}

/// Folders shown side by side. Folder 0 is the main one the session started from.
#[derive(Debug)]
pub struct ComparisonSet {
    folders: Vec<DirectoryIndex>,
    fidx: usize,
}

impl ComparisonSet {
    pub fn new(main: DirectoryIndex) -> Self {
        Self {
            folders: vec![main],
            fidx: 0,
        }
    }

    /// Indexes `path` with the main folder's filter and appends it.
    pub fn add_folder(&mut self, path: &Path) -> Result<Alignment> {
        let index = DirectoryIndex::build_filtered(path, self.folders[0].filter().clone())?;
        log::info!("Added comparison folder {:?} ({} images)", index.dir(), index.len());
        self.folders.push(index);
        Ok(self.alignment())
    }

    /// Rescans every folder from disk. A folder that fails to rebuild keeps its old index.
    pub fn rebuild(&mut self) -> Alignment {
        for folder in &mut self.folders {
            match folder.rebuild() {
                Ok(fresh) => *folder = fresh,
                Err(e) => log::warn!("Keeping stale index for {:?}: {}", folder.dir(), e),
            }
        }
        self.alignment()
    }

    pub fn alignment(&self) -> Alignment {
        let lengths: Vec<usize> = self.folders.iter().map(DirectoryIndex::len).collect();
        let aligned = lengths.windows(2).all(|w| w[0] == w[1]);
        Alignment { aligned, lengths }
    }

    /// Moves `fidx` by `step`, wrapping over the folder count.
    pub fn folder_browse(&mut self, step: isize) -> usize {
        self.fidx = wrap(self.fidx as isize + step, self.folders.len());
        self.fidx
    }

    pub fn fidx(&self) -> usize {
        self.fidx
    }

    pub fn is_main(&self) -> bool {
        self.fidx == 0
    }

    pub fn num_folders(&self) -> usize {
        self.folders.len()
    }

    pub fn main(&self) -> &DirectoryIndex {
        &self.folders[0]
    }

    /// Folder at `fidx`, wrapped into the folder count.
    pub fn folder(&self, fidx: usize) -> &DirectoryIndex {
        &self.folders[fidx % self.folders.len()]
    }
}

/// Euclidean modulo into `[0, len)`. `len` must be non-zero.
pub fn wrap(pos: isize, len: usize) -> usize {
    pos.rem_euclid(len as isize) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn folder_with(n: usize) -> TempDir {
        let temp = tempdir().expect("tempdir");
        for i in 0..n {
            fs::write(temp.path().join(format!("{}.png", i)), b"").expect("write");
        }
        temp
    }

    #[test]
    fn unequal_lengths_are_reported() {
        let dirs = [folder_with(10), folder_with(10), folder_with(8)];
        let mut set = ComparisonSet::new(DirectoryIndex::build(dirs[0].path()).expect("main"));
        assert!(set.add_folder(dirs[1].path()).expect("add").aligned);

        let alignment = set.add_folder(dirs[2].path()).expect("add");
        assert!(!alignment.aligned);
        assert_eq!(alignment.lengths, vec![10, 10, 8]);
        assert!(alignment.summary().contains("\n\t8"));
    }

    #[test]
    fn equal_lengths_are_aligned() {
        let dirs = [folder_with(3), folder_with(3)];
        let mut set = ComparisonSet::new(DirectoryIndex::build(dirs[0].path()).expect("main"));
        let alignment = set.add_folder(dirs[1].path()).expect("add");
        assert_eq!(alignment, Alignment { aligned: true, lengths: vec![3, 3] });
    }

    #[test]
    fn single_folder_never_leaves_zero() {
        let dir = folder_with(2);
        let mut set = ComparisonSet::new(DirectoryIndex::build(dir.path()).expect("main"));
        for step in [-7, -1, 0, 1, 3, 99999] {
            assert_eq!(set.folder_browse(step), 0);
        }
        assert!(set.is_main());
    }

    #[test]
    fn folder_browse_wraps_both_ways() {
        let dirs = [folder_with(1), folder_with(1), folder_with(1)];
        let mut set = ComparisonSet::new(DirectoryIndex::build(dirs[0].path()).expect("main"));
        set.add_folder(dirs[1].path()).expect("add");
        set.add_folder(dirs[2].path()).expect("add");

        assert_eq!(set.folder_browse(-1), 2);
        assert!(!set.is_main());
        assert_eq!(set.folder_browse(2), 1);
        assert_eq!(set.folder_browse(5), 0);
    }

    #[test]
    fn rebuild_picks_up_new_files() {
        let dirs = [folder_with(2), folder_with(2)];
        let mut set = ComparisonSet::new(DirectoryIndex::build(dirs[0].path()).expect("main"));
        set.add_folder(dirs[1].path()).expect("add");

        fs::write(dirs[1].path().join("extra.png"), b"").expect("write");
        let alignment = set.rebuild();
        assert_eq!(alignment.lengths, vec![2, 3]);
        assert!(!alignment.aligned);
    }

    #[test]
    fn missing_comparison_folder_is_an_error() {
        let dir = folder_with(1);
        let mut set = ComparisonSet::new(DirectoryIndex::build(dir.path()).expect("main"));
        assert!(set.add_folder(&dir.path().join("nope")).is_err());
        assert_eq!(set.num_folders(), 1);
    }

    #[test]
    fn wrap_is_euclidean() {
        assert_eq!(wrap(-1, 5), 4);
        assert_eq!(wrap(5, 5), 0);
        assert_eq!(wrap(-99999, 5), 1);
    }
}
