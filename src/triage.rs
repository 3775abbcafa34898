use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ViewerError};

/// Subdirectory for the reserved delete label.
pub const DELETED_SUBDIR: &str = "_deleted";

/// Letter buckets, `_A`..`_Z`.
const BUCKET_SUBDIRS: [&str; 26] = [
    "_A", "_B", "_C", "_D", "_E", "_F", "_G", "_H", "_I", "_J", "_K", "_L", "_M", "_N", "_O",
    "_P", "_Q", "_R", "_S", "_T", "_U", "_V", "_W", "_X", "_Y", "_Z",
];

/// Position in the bucket table, 0 for `_A`. Only [`Label::bucket`] makes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketId(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Deleted,
    Bucket(BucketId),
}

impl Label {
    /// Bucket label for an ASCII letter, either case.
    pub fn bucket(c: char) -> Option<Label> {
        c.is_ascii_alphabetic()
            .then(|| Label::Bucket(BucketId(c.to_ascii_uppercase() as u8 - b'A')))
    }

    pub fn subdir(self) -> &'static str {
        match self {
            Label::Deleted => DELETED_SUBDIR,
            Label::Bucket(BucketId(i)) => BUCKET_SUBDIRS[i as usize],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoRecord {
    pub original: PathBuf,
    pub position: usize,
    pub subdir: String,
}

impl UndoRecord {
    /// Where the file sits while the record is on the stack.
    pub fn moved_path(&self) -> PathBuf {
        insert_last_dir(&self.original, &self.subdir)
    }
}

/// `dir/name` -> `dir/subdir/name`.
fn insert_last_dir(path: &Path, subdir: &str) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    match path.file_name() {
        Some(name) => parent.join(subdir).join(name),
        None => parent.join(subdir),
    }
}

/// Moves `path` into `subdir` next to it and records the move on `undo`.
/// Returns the new location.
pub fn move_to_subdir(
    label: Label,
    path: &Path,
    position_before: usize,
    undo: &mut UndoStack,
) -> Result<PathBuf> {
    if !path.is_file() {
        return Err(ViewerError::FileMissing {
            path: path.to_path_buf(),
        });
    }

    let original = std::path::absolute(path)?;
    let subdir = label.subdir();
    let target = insert_last_dir(&original, subdir);
    if target.exists() {
        return Err(ViewerError::DestinationExists { path: target });
    }

    if let Some(dir) = target.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::rename(&original, &target)?;
    log::info!("Moved {:?} to {} (pidx {})", original, subdir, position_before);

    undo.push(UndoRecord {
        original,
        position: position_before,
        subdir: subdir.to_string(),
    });
    Ok(target)
}

/// Process-lifetime stack of reversible moves.
#[derive(Debug, Default)]
pub struct UndoStack {
    records: Vec<UndoRecord>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn peek(&self) -> Option<&UndoRecord> {
        self.records.last()
    }

    fn push(&mut self, record: UndoRecord) {
        self.records.push(record);
    }

    /// Moves the most recent file back. On failure the record stays on the stack.
    pub fn undo(&mut self) -> Result<UndoRecord> {
        let record = self.records.last().ok_or(ViewerError::EmptyUndo)?;
        if record.original.exists() {
            return Err(ViewerError::RestoreConflict {
                path: record.original.clone(),
            });
        }
        let moved = record.moved_path();
        if !moved.is_file() {
            return Err(ViewerError::FileMissing { path: moved });
        }

        fs::rename(&moved, &record.original)?;
        log::info!("Restored {:?} (pidx {})", record.original, record.position);
        self.records.pop().ok_or(ViewerError::EmptyUndo)
    }
}
