//! Per-view zoom, rotation and scroll, with zoom linking between views.
//!
//! Views in the same group follow each other's zoom. A change on one view is
//! turned into one [`ZoomChanged`] message per sibling; receiving a message
//! updates the sibling only and never produces further messages, so a change
//! cannot bounce back to the view it came from.

/// Step for one mouse wheel notch.
pub const WHEEL_ZOOM_STEP: f64 = 1.05;
/// Step for the zoom keys.
pub const KEY_ZOOM_STEP: f64 = 1.2;
/// Images narrower than this start magnified.
const MIN_INITIAL_WIDTH: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        self.quarter_turns() * 90
    }

    /// Clockwise quarter turns, 0..4.
    pub fn quarter_turns(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }

    fn from_quarter_turns(q: u32) -> Self {
        match q % 4 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub fn cw(self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + 1)
    }

    pub fn ccw(self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + 3)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    zoom: f64,
    pub rotation: Rotation,
    pub scroll_x: f32,
    pub scroll_y: f32,
    /// Views sharing a group follow each other's zoom.
    pub group: Option<u32>,
    /// Bumped every time this view's zoom is written.
    revision: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            rotation: Rotation::Deg0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            group: None,
            revision: 0,
        }
    }
}

impl ViewState {
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn apply_zoom(&mut self, ratio: f64) {
        self.zoom = ratio;
        self.revision += 1;
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.scroll_x += dx;
        self.scroll_y += dy;
    }
}

/// Keeps a ratio strictly positive and finite. `None` for NaN.
fn clamp_ratio(ratio: f64) -> Option<f64> {
    if ratio.is_nan() {
        None
    } else {
        Some(ratio.clamp(f64::MIN_POSITIVE, f64::MAX))
    }
}

/// Zoom for a freshly opened image of the given width.
pub fn initial_zoom(width: u32) -> f64 {
    if width > 0 && width < MIN_INITIAL_WIDTH {
        (MIN_INITIAL_WIDTH / width) as f64
    } else {
        1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomChanged {
    pub origin: usize,
    pub target: usize,
    pub ratio: f64,
}

#[derive(Debug, Clone)]
pub struct ViewSet {
    views: Vec<ViewState>,
    /// Displayed width auto-zoom aims for, if enabled.
    target_width: Option<u32>,
}

impl ViewSet {
    /// `num_views` views; with more than one they share a zoom group.
    pub fn new(num_views: usize) -> Self {
        let group = (num_views > 1).then_some(0);
        let views = (0..num_views.max(1))
            .map(|_| ViewState {
                group,
                ..ViewState::default()
            })
            .collect();
        Self {
            views,
            target_width: None,
        }
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn view(&self, idx: usize) -> &ViewState {
        &self.views[idx]
    }

    pub fn view_mut(&mut self, idx: usize) -> &mut ViewState {
        &mut self.views[idx]
    }

    pub fn views(&self) -> &[ViewState] {
        &self.views
    }

    /// Sets the zoom of `view` and of every view linked to it.
    /// Returns the messages delivered to the siblings.
    pub fn set_zoom(&mut self, view: usize, ratio: f64) -> Vec<ZoomChanged> {
        let Some(ratio) = clamp_ratio(ratio) else {
            log::warn!("Ignoring NaN zoom for view {}", view);
            return Vec::new();
        };
        self.views[view].apply_zoom(ratio);

        let messages = self.broadcast(view, ratio);
        for msg in &messages {
            self.deliver(msg);
        }
        messages
    }

    fn broadcast(&self, origin: usize, ratio: f64) -> Vec<ZoomChanged> {
        let Some(group) = self.views[origin].group else {
            return Vec::new();
        };
        self.views
            .iter()
            .enumerate()
            .filter(|(i, v)| *i != origin && v.group == Some(group))
            .map(|(target, _)| ZoomChanged {
                origin,
                target,
                ratio,
            })
            .collect()
    }

    fn deliver(&mut self, msg: &ZoomChanged) {
        if msg.target == msg.origin {
            return;
        }
        self.views[msg.target].apply_zoom(msg.ratio);
    }

    pub fn zoom_in(&mut self, view: usize, scale: f64) -> Vec<ZoomChanged> {
        let ratio = self.views[view].zoom * scale;
        self.set_zoom(view, ratio)
    }

    pub fn zoom_out(&mut self, view: usize, scale: f64) -> Vec<ZoomChanged> {
        let ratio = self.views[view].zoom / scale;
        self.set_zoom(view, ratio)
    }

    /// Puts every view back to 1:1.
    pub fn reset_zoom(&mut self) {
        for v in &mut self.views {
            v.apply_zoom(1.0);
        }
    }

    pub fn target_width(&self) -> Option<u32> {
        self.target_width
    }

    /// Fits images to `target_width` displayed pixels from now on.
    pub fn auto_zoom_to_width(&mut self, target_width: u32) {
        self.target_width = (target_width > 0).then_some(target_width);
    }

    /// Keeps the width view 0 currently shows an image of `image_width` at.
    pub fn auto_zoom_from_current(&mut self, image_width: u32) -> u32 {
        let target = (image_width as f64 * self.views[0].zoom) as u32;
        self.auto_zoom_to_width(target);
        target
    }

    pub fn cancel_auto_zoom(&mut self) {
        self.target_width = None;
    }

    /// Re-fits `view` to the target width for an image of `image_width`.
    /// Only this view changes: siblings fit their own images.
    pub fn refresh_auto_zoom(&mut self, view: usize, image_width: u32) -> Option<f64> {
        let target = self.target_width?;
        if image_width == 0 {
            return None;
        }
        let ratio = clamp_ratio(target as f64 / image_width as f64)?;
        self.views[view].apply_zoom(ratio);
        Some(ratio)
    }

    pub fn rotate_cw(&mut self, view: usize) {
        let v = &mut self.views[view];
        v.rotation = v.rotation.cw();
    }

    pub fn rotate_ccw(&mut self, view: usize) {
        let v = &mut self.views[view];
        v.rotation = v.rotation.ccw();
    }
}
