use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::browse::{BrowseMode, Browser, ViewSlot};
use crate::compare::{Alignment, ComparisonSet};
use crate::error::{Result, ViewerError};
use crate::files::{DirectoryIndex, NameFilter};
use crate::loader::{DecodeCache, DecodedImage};
use crate::triage::{Label, UndoRecord, UndoStack, move_to_subdir};
use crate::zoom::{ViewSet, initial_zoom};

// ---------------------------------------------------------------------------
// User intents, already decoded from raw input by the UI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Browse(isize),
    First,
    Last,
    CompareFolders(isize),
    /// Move the current image into `label`'s subdirectory, then step the
    /// cursor forward (`advance`) or back.
    Triage { label: Label, advance: bool },
    Undo,
    ZoomIn(f64),
    ZoomOut(f64),
    ResetZoom,
    AutoZoom,
    CancelAutoZoom,
    RotateCw,
    RotateCcw,
    ToggleBackground,
    ToggleFingerprint,
    Rebuild,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    White,
    LightGray,
}

impl Background {
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Background::White => (255, 255, 255),
            Background::LightGray => (211, 211, 211),
        }
    }

    fn toggled(self) -> Self {
        match self {
            Background::White => Background::LightGray,
            Background::LightGray => Background::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Focused,
    Unfocused,
}

impl Highlight {
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Highlight::Focused => (220, 0, 0),
            Highlight::Unfocused => (0, 160, 0),
        }
    }
}

/// Everything the renderer needs for one view.
pub struct ViewFrame {
    pub slot: ViewSlot,
    pub image: Option<Rc<DecodedImage>>,
    pub error: Option<String>,
    /// `[shown / total] name`
    pub caption: String,
    /// Path relative to the image's grandparent directory.
    pub shown_path: String,
    pub overlay: Vec<String>,
    pub highlight: Highlight,
    /// Red border marking the main folder while comparing in a single view.
    pub main_marker: bool,
}

// ---------------------------------------------------------------------------
// Session: the single owned context for one viewing session
// ---------------------------------------------------------------------------

pub struct Session {
    browser: Browser,
    undo: UndoStack,
    views: ViewSet,
    cache: DecodeCache,
    pub focus: usize,
    pub background: Background,
    pub show_fingerprint: bool,
    alignment: Alignment,
    message: Option<String>,
}

impl Session {
    /// Opens `start` (an image or a directory). Errors here end the program.
    pub fn open(start: &Path, filter: NameFilter, num_views: usize, budget: u64) -> Result<Self> {
        let index = DirectoryIndex::build_filtered(start, filter)?;
        let pidx = if start.is_dir() {
            0
        } else {
            index.locate(start).unwrap_or_else(|e| {
                log::warn!("{}; starting at the first image", e);
                0
            })
        };

        let set = ComparisonSet::new(index);
        let alignment = set.alignment();
        let mut browser = Browser::new(set);
        browser.goto(pidx);

        let num_views = num_views.clamp(1, 4);
        let mut views = ViewSet::new(num_views);
        match browser.get_shape(None, None) {
            Ok((w, _)) => {
                views.set_zoom(0, initial_zoom(w));
            }
            Err(e) => log::warn!("{}", e),
        }

        Ok(Self {
            browser,
            undo: UndoStack::new(),
            views,
            cache: DecodeCache::new(budget),
            focus: 0,
            background: if num_views > 1 {
                Background::LightGray
            } else {
                Background::White
            },
            show_fingerprint: false,
            alignment,
            message: None,
        })
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    pub fn views(&self) -> &ViewSet {
        &self.views
    }

    pub fn views_mut(&mut self) -> &mut ViewSet {
        &mut self.views
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    pub fn alignment(&self) -> &Alignment {
        &self.alignment
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn cached_images(&self) -> usize {
        self.cache.len()
    }

    pub fn current_path(&self) -> &Path {
        self.browser.get_path(None, None)
    }

    fn report(&mut self, err: ViewerError) {
        match err {
            ViewerError::EmptyUndo => log::info!("Nothing to undo"),
            other => {
                log::warn!("{}", other);
                self.message = Some(other.to_string());
            }
        }
    }

    /// Applies one user action. Returns true when the session should end.
    pub fn apply(&mut self, action: Action) -> bool {
        self.message = None;
        let focus = self.focus;
        match action {
            Action::Browse(step) => {
                self.browser.path_browse(step);
            }
            Action::First => self.browser.first(),
            Action::Last => self.browser.last(),
            Action::CompareFolders(step) => {
                self.browser.folder_browse(step);
            }
            Action::Triage { label, advance } => {
                if let Err(e) = self.triage(label, advance) {
                    self.report(e);
                }
            }
            Action::Undo => {
                if let Err(e) = self.undo() {
                    self.report(e);
                }
            }
            Action::ZoomIn(scale) => {
                self.views.zoom_in(focus, scale);
            }
            Action::ZoomOut(scale) => {
                self.views.zoom_out(focus, scale);
            }
            Action::ResetZoom => self.views.reset_zoom(),
            Action::AutoZoom => {
                if let Err(e) = self.auto_zoom() {
                    self.report(e);
                }
            }
            Action::CancelAutoZoom => self.views.cancel_auto_zoom(),
            Action::RotateCw => self.views.rotate_cw(focus),
            Action::RotateCcw => self.views.rotate_ccw(focus),
            Action::ToggleBackground => self.background = self.background.toggled(),
            Action::ToggleFingerprint => self.show_fingerprint = !self.show_fingerprint,
            Action::Rebuild => {
                self.update_path_list();
            }
            Action::Quit => return true,
        }
        false
    }

    pub fn add_folder(&mut self, path: &Path) -> Result<&Alignment> {
        self.alignment = self.browser.set_mut().add_folder(path)?;
        self.warn_if_misaligned();
        Ok(&self.alignment)
    }

    /// Rescans every folder and re-checks alignment.
    pub fn update_path_list(&mut self) -> &Alignment {
        self.alignment = self.browser.set_mut().rebuild();
        self.browser.rewrap();
        self.warn_if_misaligned();
        &self.alignment
    }

    fn warn_if_misaligned(&mut self) {
        if !self.alignment.aligned {
            let msg = format!(
                "Comparison folders have different numbers of images.\n{}",
                self.alignment.summary()
            );
            log::warn!("{}", msg);
            self.message = Some(msg);
        }
    }

    /// Moves the image under the cursor (what view 0 shows) into `label`'s
    /// subdirectory. The cursor only moves once the file has moved.
    /// A folder is never emptied: its last image stays put.
    pub fn triage(&mut self, label: Label, advance: bool) -> Result<PathBuf> {
        let path = self.current_path().to_path_buf();
        let set = self.browser.set();
        if set.folder(set.fidx()).len() < 2 {
            return Err(ViewerError::LastImage { path });
        }
        let before = self.browser.pidx();
        let moved = move_to_subdir(label, &path, before, &mut self.undo)?;
        self.cache.forget(&path);

        self.alignment = self.browser.set_mut().rebuild();
        // The next image slid into `before`.
        self.browser.goto(before);
        if !advance {
            self.browser.path_browse(-1);
        }
        Ok(moved)
    }

    /// Restores the most recently moved file and returns the cursor to where it was.
    pub fn undo(&mut self) -> Result<UndoRecord> {
        let record = self.undo.undo()?;
        self.cache.forget(&record.moved_path());
        self.alignment = self.browser.set_mut().rebuild();
        self.browser.goto(record.position);
        Ok(record)
    }

    /// Keeps the width view 0 shows the current image at, for every image after it.
    pub fn auto_zoom(&mut self) -> Result<u32> {
        let (width, _) = self.browser.get_shape(None, None)?;
        Ok(self.views.auto_zoom_from_current(width))
    }

    /// Comparison status text and whether it should be highlighted (on the main folder).
    /// Stays flagged for as long as the folders differ in length.
    pub fn comparison_status(&self) -> Option<(String, bool)> {
        if self.browser.mode() == BrowseMode::Interval {
            return None;
        }
        let mut text = self.alignment.summary();
        if !self.alignment.aligned {
            text.insert_str(0, "Folders differ! ");
        }
        Some((text, self.browser.set().is_main()))
    }

    /// Resolves and decodes what each view shows, re-fitting auto-zoom per image.
    pub fn frames(&mut self) -> Vec<ViewFrame> {
        let num_views = self.views.len();
        let single_folder_view =
            self.browser.mode() == BrowseMode::Folder && num_views == 1 && self.browser.set().is_main();
        let reference = if self.show_fingerprint {
            self.browser.get_fingerprint(None, None).ok().cloned()
        } else {
            None
        };

        let mut frames = Vec::with_capacity(num_views);
        for slot in self.browser.slots(num_views) {
            let entry = self.browser.entry(Some(slot.pidx), Some(slot.fidx));
            let mut overlay = Vec::new();
            let mut error = None;

            match entry.shape() {
                Ok((w, _)) => {
                    self.views.refresh_auto_zoom(slot.view, w);
                }
                Err(e) => error = Some(e.to_string()),
            }

            if self.show_fingerprint {
                match entry.fingerprint() {
                    Ok(fp) => {
                        overlay.push(fp.label());
                        if slot.view > 0 && reference.as_ref().is_some_and(|r| r.distance(fp) == 0) {
                            overlay.push("looks identical to view 1".to_string());
                        }
                    }
                    Err(e) => overlay.push(e.to_string()),
                }
            }

            let image = match self.cache.get(&slot.path) {
                Ok(img) => Some(img),
                Err(e) => {
                    log::warn!("{}", e);
                    error.get_or_insert_with(|| e.to_string());
                    None
                }
            };

            let name = entry.file_name();
            frames.push(ViewFrame {
                caption: format!("[{} / {}] {}", slot.shown_idx, self.browser.path_len(), name),
                shown_path: shown_path(&slot.path),
                image,
                error,
                overlay,
                highlight: if slot.view == self.focus {
                    Highlight::Focused
                } else {
                    Highlight::Unfocused
                },
                main_marker: single_folder_view,
                slot,
            });
        }
        frames
    }
}

/// `a/b/c/d.png` -> `c/d.png` is too short to tell folders apart; keep two
/// parent levels: `b/c/d.png`.
fn shown_path(path: &Path) -> String {
    let parts: Vec<_> = path.components().collect();
    let start = parts.len().saturating_sub(3);
    parts[start..]
        .iter()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    const BUDGET: u64 = 64 * 1024 * 1024;

    fn folder(widths: &[u32]) -> TempDir {
        let temp = tempdir().expect("tempdir");
        for (i, w) in widths.iter().enumerate() {
            RgbImage::new(*w, 10)
                .save(temp.path().join(format!("img{}.png", i)))
                .expect("save");
        }
        temp
    }

    fn open(dir: &TempDir, views: usize) -> Session {
        Session::open(dir.path(), NameFilter::default(), views, BUDGET).expect("open")
    }

    #[test]
    fn opens_at_seed_image() {
        let dir = folder(&[600, 600, 600]);
        let s = Session::open(&dir.path().join("img1.png"), NameFilter::default(), 1, BUDGET)
            .expect("open");
        assert_eq!(s.browser().pidx(), 1);
        assert_eq!(s.background, Background::White);
    }

    #[test]
    fn filtered_out_seed_falls_back_to_start() {
        let dir = folder(&[600, 600]);
        let filter = NameFilter {
            include: vec![],
            exclude: vec!["img1".into()],
        };
        let s = Session::open(&dir.path().join("img1.png"), filter, 1, BUDGET).expect("open");
        assert_eq!(s.browser().pidx(), 0);
        assert_eq!(s.browser().path_len(), 1);
    }

    #[test]
    fn narrow_first_image_starts_magnified() {
        let dir = folder(&[100]);
        let s = open(&dir, 1);
        assert_eq!(s.views().view(0).zoom(), 5.0);
    }

    #[test]
    fn multi_view_starts_gray_and_linked() {
        let dir = folder(&[600, 600]);
        let s = open(&dir, 2);
        assert_eq!(s.background, Background::LightGray);
        assert!(s.views().views().iter().all(|v| v.group == Some(0)));
    }

    #[test]
    fn triage_and_undo_round_trip() {
        let dir = folder(&[600, 601, 602, 603, 604]);
        let mut s = open(&dir, 1);
        s.apply(Action::Browse(2));
        let victim = s.current_path().to_path_buf();
        let hash_before = blake3::hash(&fs::read(&victim).expect("read"));

        s.apply(Action::Triage { label: Label::Deleted, advance: true });
        assert!(!victim.exists());
        assert!(dir.path().join("_deleted").join("img2.png").exists());
        assert_eq!(s.browser().path_len(), 4);
        assert_eq!(s.current_path().file_name(), dir.path().join("img3.png").file_name());
        assert_eq!(s.undo_stack().len(), 1);

        s.apply(Action::Browse(1));
        s.apply(Action::Undo);
        assert!(victim.exists());
        assert_eq!(s.browser().pidx(), 2);
        assert_eq!(s.current_path().file_name(), victim.file_name());
        assert!(s.undo_stack().is_empty());
        assert_eq!(blake3::hash(&fs::read(&victim).expect("read")), hash_before);
    }

    #[test]
    fn backward_triage_steps_back() {
        let dir = folder(&[600, 601, 602]);
        let mut s = open(&dir, 1);
        s.apply(Action::Browse(1));
        let label = Label::bucket('a').expect("label");
        s.apply(Action::Triage { label, advance: false });
        assert!(dir.path().join("_A").join("img1.png").exists());
        assert_eq!(s.browser().pidx(), 0);
    }

    #[test]
    fn failed_triage_leaves_state_alone() {
        let dir = folder(&[600, 601]);
        let mut s = open(&dir, 1);
        fs::remove_file(dir.path().join("img0.png")).expect("remove");

        assert!(!s.apply(Action::Triage { label: Label::Deleted, advance: true }));
        assert_eq!(s.browser().pidx(), 0);
        assert!(s.undo_stack().is_empty());
        assert!(s.message().is_some_and(|m| m.contains("img0.png")));
    }

    #[test]
    fn undo_with_empty_stack_is_quiet() {
        let dir = folder(&[600]);
        let mut s = open(&dir, 1);
        s.apply(Action::Undo);
        assert!(s.message().is_none());
    }

    #[test]
    fn misaligned_comparison_warns() {
        let main = folder(&[600, 600, 600]);
        let other = folder(&[600, 600]);
        let mut s = open(&main, 1);
        let alignment = s.add_folder(other.path()).expect("add").clone();
        assert!(!alignment.aligned);
        assert!(s.message().is_some());

        let (text, on_main) = s.comparison_status().expect("folder mode");
        assert!(text.contains('3') && text.contains('2'));
        assert!(on_main);
        s.apply(Action::CompareFolders(1));
        assert_eq!(s.comparison_status().map(|(_, m)| m), Some(false));
    }

    #[test]
    fn misalignment_flag_outlives_other_actions() {
        let main = folder(&[600, 600, 600]);
        let other = folder(&[600, 600]);
        let mut s = open(&main, 1);
        s.add_folder(other.path()).expect("add");

        s.apply(Action::Browse(1));
        s.apply(Action::ZoomIn(1.05));
        let (text, _) = s.comparison_status().expect("folder mode");
        assert!(text.starts_with("Folders differ!"), "{}", text);

        let aligned = folder(&[600, 600, 600]);
        let mut t = open(&main, 1);
        t.add_folder(aligned.path()).expect("add");
        let (text, _) = t.comparison_status().expect("folder mode");
        assert!(!text.contains("differ"));
    }

    #[test]
    fn last_image_in_folder_stays() {
        let dir = folder(&[600]);
        let only = dir.path().join("img0.png");
        let mut s = open(&dir, 1);

        let err = s.triage(Label::Deleted, true).expect_err("last image");
        assert!(matches!(err, ViewerError::LastImage { .. }));
        s.apply(Action::Triage { label: Label::Deleted, advance: true });
        assert!(only.exists());
        assert!(!dir.path().join("_deleted").exists());
        assert!(s.undo_stack().is_empty());
        assert!(s.message().is_some_and(|m| m.contains("last image")));
        assert!(s.frames()[0].error.is_none());
    }

    #[test]
    fn folder_mode_triage_moves_from_compared_folder() {
        let main = folder(&[600, 601, 602]);
        let other = folder(&[600, 601, 602]);
        let mut s = open(&main, 1);
        s.add_folder(other.path()).expect("add");
        s.apply(Action::Browse(1));
        s.apply(Action::CompareFolders(1));
        assert_eq!(s.current_path(), other.path().join("img1.png"));

        s.apply(Action::Triage { label: Label::Deleted, advance: true });
        assert!(other.path().join("_deleted").join("img1.png").exists());
        assert!(!other.path().join("img1.png").exists());
        assert!(main.path().join("img1.png").exists());
        assert!(!main.path().join("_deleted").exists());
        assert_eq!(s.alignment().lengths, [3, 2]);

        // Cursor stays on pidx 1, wrapped over folder 0, in the compared folder.
        assert_eq!(s.browser().pidx(), 1);
        assert_eq!(s.browser().fidx(), 1);
        assert_eq!(s.current_path(), other.path().join("img2.png"));

        s.apply(Action::First);
        s.apply(Action::Undo);
        assert!(other.path().join("img1.png").exists());
        assert_eq!(s.alignment().lengths, [3, 3]);
        assert_eq!(s.browser().pidx(), 1);
        assert_eq!(s.current_path(), other.path().join("img1.png"));
        assert!(s.undo_stack().is_empty());
    }

    #[test]
    fn frames_follow_interval_layout() {
        let dir = folder(&[600, 700, 800]);
        let mut s = open(&dir, 2);
        s.focus = 1;
        let frames = s.frames();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].caption, "[1 / 3] img0.png");
        assert_eq!(frames[1].caption, "[2 / 3] img1.png");
        assert_eq!(frames[0].highlight, Highlight::Unfocused);
        assert_eq!(frames[1].highlight, Highlight::Focused);
        assert_eq!(frames[1].image.as_ref().map(|i| i.width), Some(700));
        assert!(frames.iter().all(|f| !f.main_marker && f.error.is_none()));
    }

    #[test]
    fn main_folder_marked_in_single_view_comparison() {
        let main = folder(&[600]);
        let other = folder(&[600]);
        let mut s = open(&main, 1);
        s.add_folder(other.path()).expect("add");
        assert!(s.frames()[0].main_marker);

        s.apply(Action::CompareFolders(1));
        let frames = s.frames();
        assert!(!frames[0].main_marker);
        assert_eq!(frames[0].caption, "[1 / 1] img0.png");
    }

    #[test]
    fn auto_zoom_holds_width_across_images() {
        let dir = folder(&[500, 250]);
        let mut s = open(&dir, 1);
        s.views_mut().set_zoom(0, 2.0);
        s.apply(Action::AutoZoom);
        assert_eq!(s.views().target_width(), Some(1000));

        s.apply(Action::Browse(1));
        s.frames();
        assert_eq!(s.views().view(0).zoom(), 4.0);

        s.apply(Action::CancelAutoZoom);
        s.apply(Action::Browse(1));
        s.frames();
        assert_eq!(s.views().view(0).zoom(), 4.0);
    }

    #[test]
    fn fingerprints_flag_identical_views() {
        let dir = folder(&[600, 600]);
        let mut s = open(&dir, 2);
        s.apply(Action::ToggleFingerprint);
        let frames = s.frames();
        assert!(frames[0].overlay[0].starts_with("phash,blake3"));
        assert!(frames[1].overlay.iter().any(|l| l.contains("identical")));
    }

    #[test]
    fn broken_image_reports_error_in_frame() {
        let dir = folder(&[600]);
        fs::write(dir.path().join("img1.png"), b"junk").expect("write");
        let mut s = open(&dir, 1);
        s.apply(Action::Last);
        let frames = s.frames();
        assert!(frames[0].image.is_none());
        assert!(frames[0].error.is_some());
    }

    #[test]
    fn shown_path_keeps_two_parents() {
        assert_eq!(shown_path(Path::new("/a/b/c/d.png")), "b/c/d.png");
        assert_eq!(shown_path(Path::new("d.png")), "d.png");
    }

    #[test]
    fn quit_ends_session() {
        let dir = folder(&[600]);
        let mut s = open(&dir, 1);
        assert!(!s.apply(Action::ToggleBackground));
        assert_eq!(s.background, Background::LightGray);
        assert!(s.apply(Action::Quit));
    }
}
