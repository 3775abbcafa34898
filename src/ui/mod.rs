use std::num::NonZeroU32;
use std::sync::Arc;
use softbuffer::Surface;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::window::{Fullscreen, Window, WindowId};

use crate::session::{Action, Session, ViewFrame};
use crate::ui::state::{InputState, action_for_key};
use crate::zoom::WHEEL_ZOOM_STEP;

mod font;
pub mod render;
pub mod state;

// ---------------------------------------------------------------------------
// Application handler (winit 0.30 style)
// ---------------------------------------------------------------------------

pub struct App {
    pub session: Session,
    pub input: InputState,
    pub window: Option<Arc<Window>>,
    pub context: Option<softbuffer::Context<Arc<Window>>>,
    pub surface: Option<Surface<Arc<Window>, Arc<Window>>>,
}

impl App {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            input: InputState::new(),
            window: None,
            context: None,
            surface: None,
        }
    }

    fn request_redraw(&self) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }

    fn view_rects(&self) -> Vec<render::Rect> {
        let size = self
            .window
            .as_ref()
            .map(|w| w.inner_size())
            .unwrap_or(PhysicalSize::new(1, 1));
        render::view_rects(self.session.views().len(), size.width, size.height)
    }

    fn toggle_fullscreen(&mut self) {
        let Some(ref window) = self.window else { return };
        self.input.is_fullscreen = !self.input.is_fullscreen;
        if self.input.is_fullscreen {
            window.set_fullscreen(Some(Fullscreen::Borderless(None)));
        } else {
            window.set_fullscreen(None);
        }
    }

    fn redraw(&mut self) {
        let frames = self.session.frames();
        let (Some(window), Some(surface)) = (self.window.as_ref(), self.surface.as_mut()) else {
            return;
        };
        window.set_title(&window_title(&self.session, &frames));

        let size = window.inner_size();
        let (Some(w), Some(h)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) else {
            return;
        };
        if let Err(e) = surface.resize(w, h) {
            log::warn!("Resizing surface failed: {}", e);
            return;
        }
        match surface.buffer_mut() {
            Ok(mut buffer) => {
                render::render(&self.session, &frames, &mut buffer, w.get(), h.get());
                if let Err(e) = buffer.present() {
                    log::warn!("Presenting frame failed: {}", e);
                }
            }
            Err(e) => log::warn!("No frame buffer: {}", e),
        }
    }
}

/// Everything that has no room on the canvas goes into the title bar.
fn window_title(session: &Session, frames: &[ViewFrame]) -> String {
    let Some(focused) = frames.get(session.focus).or(frames.first()) else {
        return "hv".to_string();
    };
    let browser = session.browser();
    let (pidx, fidx) = (Some(focused.slot.pidx), Some(focused.slot.fidx));

    let mut parts = vec![format!("{} {}", focused.caption, focused.shown_path)];
    if let Some(img) = &focused.image {
        let kind = browser.get_color_type(pidx, fidx).unwrap_or("?");
        let kb = browser.get_file_size(pidx, fidx).unwrap_or(0) as f64 / 1024.0;
        let view = session.views().view(focused.slot.view);
        let mut info = format!(
            "{}x{} {} {:.1} KB {:.0}%",
            img.width,
            img.height,
            kind,
            kb,
            view.zoom() * 100.0
        );
        if view.rotation.degrees() != 0 {
            info.push_str(&format!(" rot {}", view.rotation.degrees()));
        }
        parts.push(info);
    }
    parts.extend(focused.overlay.iter().cloned());
    if let Some(err) = &focused.error {
        parts.push(err.clone());
    }
    if let Some((status, on_main)) = session.comparison_status() {
        let status = status.replace(['\n', '\t'], " ");
        parts.push(if on_main { format!("MAIN {}", status) } else { status });
    }
    if let Some(msg) = session.message() {
        parts.push(msg.replace('\n', " "));
    }
    if let Some(last) = session.undo_stack().peek() {
        parts.push(format!("undo {} ({})", last.subdir, session.undo_stack().len()));
    }
    parts.push(format!("cache {}", session.cached_images()));
    parts.join(" | ")
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title("hv")
            .with_inner_size(LogicalSize::new(1280u32, 720u32));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Could not create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        let context = match softbuffer::Context::new(Arc::clone(&window)) {
            Ok(c) => c,
            Err(e) => {
                log::error!("Could not create drawing context: {}", e);
                event_loop.exit();
                return;
            }
        };
        let surface = match Surface::new(&context, Arc::clone(&window)) {
            Ok(s) => s,
            Err(e) => {
                log::error!("Could not create surface: {}", e);
                event_loop.exit();
                return;
            }
        };

        window.request_redraw();
        self.window = Some(window);
        self.context = Some(context);
        self.surface = Some(surface);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(_) => self.request_redraw(),

            WindowEvent::ModifiersChanged(mods) => {
                self.input.modifiers = mods.state();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                if event.logical_key == Key::Named(NamedKey::F11) {
                    self.toggle_fullscreen();
                } else if let Some(action) = action_for_key(&event.logical_key, self.input.modifiers) {
                    log::debug!("{:?}", action);
                    if self.session.apply(action) {
                        event_loop.exit();
                        return;
                    }
                }
                self.request_redraw();
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    if state == ElementState::Pressed {
                        if let Some(view) = self.input.view_at(&self.view_rects()) {
                            self.session.focus = view;
                        }
                        self.input.start_drag();
                    } else {
                        self.input.end_drag();
                    }
                    self.request_redraw();
                }
            }

            WindowEvent::CursorMoved {
                position: PhysicalPosition { x, y },
                ..
            } => {
                if let Some((dx, dy)) = self.input.move_to(x, y) {
                    let focus = self.session.focus;
                    self.session.views_mut().view_mut(focus).pan(dx, dy);
                    self.request_redraw();
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y as f64,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => y,
                };
                let action = if y > 0.0 {
                    Action::ZoomIn(WHEEL_ZOOM_STEP)
                } else if y < 0.0 {
                    Action::ZoomOut(WHEEL_ZOOM_STEP)
                } else {
                    return;
                };
                self.session.apply(action);
                self.request_redraw();
            }

            WindowEvent::RedrawRequested => self.redraw(),

            _ => {}
        }
    }
}
