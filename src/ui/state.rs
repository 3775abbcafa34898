use winit::keyboard::{Key, ModifiersState, NamedKey};

use crate::session::Action;
use crate::triage::Label;
use crate::ui::render::Rect;
use crate::zoom::KEY_ZOOM_STEP;

const SHIFT_STEP: isize = 10;

// ---------------------------------------------------------------------------
// Raw input state kept between window events
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: ModifiersState,
    pub mouse_pos: (f64, f64),
    /// Last cursor position while the left button is held.
    pub drag_last: Option<(f64, f64)>,
    pub is_fullscreen: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the view under the cursor.
    pub fn view_at(&self, rects: &[Rect]) -> Option<usize> {
        let (x, y) = self.mouse_pos;
        rects.iter().position(|r| r.contains(x, y))
    }

    pub fn start_drag(&mut self) {
        self.drag_last = Some(self.mouse_pos);
    }

    pub fn end_drag(&mut self) {
        self.drag_last = None;
    }

    /// Records a cursor move; returns the offset to pan by while dragging.
    pub fn move_to(&mut self, x: f64, y: f64) -> Option<(f32, f32)> {
        self.mouse_pos = (x, y);
        let (lx, ly) = self.drag_last?;
        self.drag_last = Some((x, y));
        Some(((x - lx) as f32, (y - ly) as f32))
    }
}

// ---------------------------------------------------------------------------
// Keymap
// ---------------------------------------------------------------------------

/// Maps a pressed key to the session action it stands for.
/// F11 is handled by the window itself and is not mapped here.
pub fn action_for_key(key: &Key, mods: ModifiersState) -> Option<Action> {
    let step = if mods.shift_key() { SHIFT_STEP } else { 1 };
    match key {
        Key::Named(named) => match named {
            NamedKey::Escape => Some(Action::Quit),
            NamedKey::ArrowRight | NamedKey::Space => Some(Action::Browse(step)),
            NamedKey::ArrowLeft => Some(Action::Browse(-step)),
            NamedKey::Home => Some(Action::First),
            NamedKey::End => Some(Action::Last),
            NamedKey::Tab if mods.shift_key() => Some(Action::CompareFolders(-1)),
            NamedKey::Tab => Some(Action::CompareFolders(1)),
            NamedKey::Delete => Some(Action::Triage {
                label: Label::Deleted,
                advance: true,
            }),
            NamedKey::Backspace => Some(Action::Triage {
                label: Label::Deleted,
                advance: false,
            }),
            NamedKey::ArrowUp => Some(Action::ZoomIn(KEY_ZOOM_STEP)),
            NamedKey::ArrowDown => Some(Action::ZoomOut(KEY_ZOOM_STEP)),
            NamedKey::F1 => Some(Action::ResetZoom),
            NamedKey::F2 => Some(Action::AutoZoom),
            NamedKey::F3 => Some(Action::CancelAutoZoom),
            NamedKey::F4 => Some(Action::ToggleFingerprint),
            NamedKey::F5 => Some(Action::Rebuild),
            NamedKey::F9 => Some(Action::ToggleBackground),
            _ => None,
        },
        Key::Character(s) => {
            let mut chars = s.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            if mods.control_key() {
                return c.eq_ignore_ascii_case(&'z').then_some(Action::Undo);
            }
            // Alt and Super chords belong to the window manager.
            if mods.alt_key() || mods.super_key() {
                return None;
            }
            match c {
                '[' => Some(Action::RotateCcw),
                ']' => Some(Action::RotateCw),
                c => Label::bucket(c).map(|label| Action::Triage {
                    label,
                    advance: true,
                }),
            }
        }
        _ => None,
    }
}
