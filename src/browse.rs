//! Browse cursor over a comparison set.
//!
//! The cursor holds a single position `pidx`. What each view shows is derived
//! from it: consecutive images of one folder in interval mode, or the same
//! position across folders in folder mode.

use std::path::{Path, PathBuf};

use crate::compare::{ComparisonSet, wrap};
use crate::error::Result;
use crate::files::DirectoryIndex;
use crate::fingerprint::Fingerprint;
use crate::loader::ImageEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseMode {
    /// One folder; view `i` shows `pidx + i`.
    Interval,
    /// Several folders; view `i` shows `pidx` in folder `fidx + i`.
    Folder,
}

impl BrowseMode {
    pub fn of(set: &ComparisonSet) -> Self {
        if set.num_folders() == 1 {
            BrowseMode::Interval
        } else {
            BrowseMode::Folder
        }
    }
}

/// Where one view points, resolved against the current cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSlot {
    pub view: usize,
    pub fidx: usize,
    pub pidx: usize,
    /// 1-based position shown in captions.
    pub shown_idx: usize,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct Browser {
    set: ComparisonSet,
    pidx: usize,
}

impl Browser {
    pub fn new(set: ComparisonSet) -> Self {
        Self { set, pidx: 0 }
    }

    pub fn mode(&self) -> BrowseMode {
        BrowseMode::of(&self.set)
    }

    pub fn set(&self) -> &ComparisonSet {
        &self.set
    }

    pub fn set_mut(&mut self) -> &mut ComparisonSet {
        &mut self.set
    }

    pub fn pidx(&self) -> usize {
        self.pidx
    }

    pub fn fidx(&self) -> usize {
        self.set.fidx()
    }

    /// The collection `pidx` wraps over: the only folder, or folder 0.
    fn active(&self) -> &DirectoryIndex {
        self.set.main()
    }

    pub fn path_len(&self) -> usize {
        self.active().len()
    }

    /// Moves the cursor by `step` with wraparound and returns the position it left.
    pub fn path_browse(&mut self, step: isize) -> usize {
        let before = self.pidx;
        self.pidx = wrap(before as isize + step, self.path_len());
        log::debug!("[nav] {} -> {} (step {})", before, self.pidx, step);
        before
    }

    pub fn goto(&mut self, index: usize) {
        self.pidx = index % self.path_len();
    }

    pub fn first(&mut self) {
        self.pidx = 0;
    }

    pub fn last(&mut self) {
        self.pidx = self.path_len() - 1;
    }

    /// Pulls the cursor back into bounds after the folders were rescanned.
    pub fn rewrap(&mut self) {
        self.pidx %= self.path_len();
    }

    pub fn folder_browse(&mut self, step: isize) -> usize {
        self.set.folder_browse(step)
    }

    /// Entry at an explicit position, each defaulting to the cursor.
    /// Positions wrap into the chosen folder's own bounds.
    pub fn entry(&self, pidx: Option<usize>, fidx: Option<usize>) -> &ImageEntry {
        let folder = self.set.folder(fidx.unwrap_or(self.set.fidx()));
        folder.entry(pidx.unwrap_or(self.pidx))
    }

    pub fn get_path(&self, pidx: Option<usize>, fidx: Option<usize>) -> &Path {
        self.entry(pidx, fidx).path()
    }

    pub fn get_shape(&self, pidx: Option<usize>, fidx: Option<usize>) -> Result<(u32, u32)> {
        self.entry(pidx, fidx).shape()
    }

    pub fn get_file_size(&self, pidx: Option<usize>, fidx: Option<usize>) -> Result<u64> {
        self.entry(pidx, fidx).file_size()
    }

    pub fn get_color_type(&self, pidx: Option<usize>, fidx: Option<usize>) -> Result<&str> {
        self.entry(pidx, fidx).color_type()
    }

    pub fn get_fingerprint(&self, pidx: Option<usize>, fidx: Option<usize>) -> Result<&Fingerprint> {
        self.entry(pidx, fidx).fingerprint()
    }

    /// What view `view` of a multi-view layout shows right now.
    pub fn slot(&self, view: usize) -> ViewSlot {
        let (pidx, fidx, shown_idx) = match self.mode() {
            BrowseMode::Interval => {
                let pidx = self.pidx + view;
                (pidx, self.set.fidx(), self.pidx + 1 + view)
            }
            BrowseMode::Folder => (self.pidx, self.set.fidx() + view, self.pidx + 1),
        };
        let folder = self.set.folder(fidx);
        ViewSlot {
            view,
            fidx: fidx % self.set.num_folders(),
            pidx: pidx % folder.len(),
            shown_idx,
            path: folder.entry(pidx).path().to_path_buf(),
        }
    }

    pub fn slots(&self, num_views: usize) -> Vec<ViewSlot> {
        (0..num_views).map(|v| self.slot(v)).collect()
    }
}
