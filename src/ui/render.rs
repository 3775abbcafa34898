// Software rendering primitives for the softbuffer surface, plus the view
// layout. Pixels are u32 in 0x00RRGGBB.

use crate::session::{Session, ViewFrame};
use crate::ui::font;
use crate::zoom::{Rotation, ViewState};

const ERROR_TINT: (u8, u8, u8, u8) = (160, 30, 30, 90);
const TEXT_BAR: (u8, u8, u8, u8) = (0, 0, 0, 150);
const TEXT_COLOR: (u8, u8, u8, u8) = (255, 255, 255, 255);
const ERROR_TEXT_COLOR: (u8, u8, u8, u8) = (255, 80, 80, 255);
const TEXT_SCALE: u32 = 2;
const MAIN_MARKER_WIDTH: i32 = 5;
const HIGHLIGHT_WIDTH: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x as f64
            && py >= self.y as f64
            && px < (self.x + self.w as i32) as f64
            && py < (self.y + self.h as i32) as f64
    }
}

/// 1-3 views side by side, 4 views as a 2x2 grid.
pub fn view_rects(num_views: usize, fb_w: u32, fb_h: u32) -> Vec<Rect> {
    match num_views {
        4 => {
            let (w, h) = (fb_w / 2, fb_h / 2);
            (0..4)
                .map(|i| Rect {
                    x: ((i % 2) as u32 * w) as i32,
                    y: ((i / 2) as u32 * h) as i32,
                    w,
                    h,
                })
                .collect()
        }
        n => {
            let n = n.max(1) as u32;
            let w = fb_w / n;
            (0..n)
                .map(|i| Rect {
                    x: (i * w) as i32,
                    y: 0,
                    w,
                    h: fb_h,
                })
                .collect()
        }
    }
}

/// Pack RGB into softbuffer u32 format: 0x00RRGGBB.
pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

fn unpack_rgb(v: u32) -> (u8, u8, u8) {
    ((v >> 16) as u8, (v >> 8) as u8, v as u8)
}

fn blend(dst: u32, color: (u8, u8, u8, u8)) -> u32 {
    let a = color.3 as u32;
    let (dr, dg, db) = unpack_rgb(dst);
    let r = ((color.0 as u32 * a + dr as u32 * (255 - a)) / 255) as u8;
    let g = ((color.1 as u32 * a + dg as u32 * (255 - a)) / 255) as u8;
    let b = ((color.2 as u32 * a + db as u32 * (255 - a)) / 255) as u8;
    rgb(r, g, b)
}

/// Fill a rectangle with a color (with alpha blending), clipped to `clip`.
pub fn fill_rect(buf: &mut [u32], stride: u32, clip: Rect, r: Rect, color: (u8, u8, u8, u8)) {
    let x_start = r.x.max(clip.x).max(0);
    let y_start = r.y.max(clip.y).max(0);
    let x_end = (r.x + r.w as i32).min(clip.x + clip.w as i32).min(stride as i32);
    let y_end = (r.y + r.h as i32).min(clip.y + clip.h as i32);
    for y in y_start..y_end {
        for x in x_start..x_end {
            let off = (y as u32 * stride + x as u32) as usize;
            if let Some(px) = buf.get_mut(off) {
                *px = blend(*px, color);
            }
        }
    }
}

/// Hollow rectangle of `width` pixels just inside `r`.
pub fn stroke_rect(buf: &mut [u32], stride: u32, clip: Rect, r: Rect, width: i32, color: (u8, u8, u8)) {
    let c = (color.0, color.1, color.2, 255);
    let (w, h) = (r.w as i32, r.h as i32);
    let bar = |x, y, bw: i32, bh: i32| Rect {
        x,
        y,
        w: bw.max(0) as u32,
        h: bh.max(0) as u32,
    };
    fill_rect(buf, stride, clip, bar(r.x, r.y, w, width), c);
    fill_rect(buf, stride, clip, bar(r.x, r.y + h - width, w, width), c);
    fill_rect(buf, stride, clip, bar(r.x, r.y, width, h), c);
    fill_rect(buf, stride, clip, bar(r.x + w - width, r.y, width, h), c);
}

/// Draws `text` with its top-left corner at (px, py), clipped to `clip`.
/// Returns the x position after the last character.
pub fn draw_text(
    buf: &mut [u32], stride: u32, clip: Rect,
    text: &str, px: i32, py: i32, scale: u32,
    color: (u8, u8, u8, u8),
) -> i32 {
    let mut x = px;
    for ch in text.chars() {
        if let Some(glyph) = font::glyph(ch) {
            for (col, &bits) in (0u32..).zip(glyph) {
                for row in (0..font::GLYPH_H).filter(|&r| bits & (1 << r) != 0) {
                    let dot = Rect {
                        x: x + (col * scale) as i32,
                        y: py + (row * scale) as i32,
                        w: scale,
                        h: scale,
                    };
                    fill_rect(buf, stride, clip, dot, color);
                }
            }
        }
        x += (font::ADVANCE * scale) as i32;
    }
    x
}

/// Caption block drawn at the top of a view: caption, path, overlay, then the error.
fn text_lines(vf: &ViewFrame) -> Vec<(&str, (u8, u8, u8, u8))> {
    let mut lines = vec![(vf.caption.as_str(), TEXT_COLOR), (vf.shown_path.as_str(), TEXT_COLOR)];
    lines.extend(vf.overlay.iter().map(|l| (l.as_str(), TEXT_COLOR)));
    if let Some(err) = &vf.error {
        lines.push((err.as_str(), ERROR_TEXT_COLOR));
    }
    lines
}

fn draw_caption(frame: &mut [u32], fb_w: u32, rect: Rect, vf: &ViewFrame) {
    let lines = text_lines(vf);
    let line_h = (font::GLYPH_H * TEXT_SCALE + 4) as i32;
    let bar = Rect {
        x: rect.x,
        y: rect.y,
        w: rect.w,
        h: (line_h * lines.len() as i32 + 8) as u32,
    };
    fill_rect(frame, fb_w, rect, bar, TEXT_BAR);
    for (i, (line, color)) in lines.into_iter().enumerate() {
        draw_text(frame, fb_w, rect, line, rect.x + 8, rect.y + 4 + line_h * i as i32, TEXT_SCALE, color);
    }
}

/// Draws `src` (RGBA) scaled and turned clockwise by `rotation`, with its
/// top-left corner at (x0, y0), clipped to `clip`.
pub fn blit_scaled_rotated(
    dst: &mut [u32], dst_w: u32, clip: Rect,
    src: &[u8], src_w: u32, src_h: u32,
    x0: f32, y0: f32, scale: f32,
    rotation: Rotation,
) {
    if src_w == 0 || src_h == 0 || scale <= 0.0 {
        return;
    }
    let (draw_w, draw_h) = match rotation {
        Rotation::Deg90 | Rotation::Deg270 => (src_h as f32 * scale, src_w as f32 * scale),
        _ => (src_w as f32 * scale, src_h as f32 * scale),
    };

    let dx_start = x0.max(clip.x as f32).max(0.0) as i32;
    let dy_start = y0.max(clip.y as f32).max(0.0) as i32;
    let dx_end = ((x0 + draw_w).ceil() as i32).min(clip.x + clip.w as i32).min(dst_w as i32);
    let dy_end = ((y0 + draw_h).ceil() as i32).min(clip.y + clip.h as i32);

    let inv_scale = 1.0 / scale;

    for dy in dy_start..dy_end {
        let vy = ((dy as f32 - y0) * inv_scale) as u32;
        for dx in dx_start..dx_end {
            let vx = ((dx as f32 - x0) * inv_scale) as u32;

            let Some((sx, sy)) = source_pixel(rotation, vx, vy, src_w, src_h) else {
                continue;
            };

            let si = (sy as usize * src_w as usize + sx as usize) * 4;
            let di = dy as usize * dst_w as usize + dx as usize;
            let Some(px) = dst.get_mut(di) else { continue };
            let sa = src[si + 3];
            if sa == 255 {
                *px = rgb(src[si], src[si + 1], src[si + 2]);
            } else if sa > 0 {
                *px = blend(*px, (src[si], src[si + 1], src[si + 2], sa));
            }
        }
    }
}

/// Maps a pixel of the rotated image back to the source image.
fn source_pixel(rotation: Rotation, vx: u32, vy: u32, src_w: u32, src_h: u32) -> Option<(u32, u32)> {
    let (sx, sy) = match rotation {
        Rotation::Deg0 => (vx, vy),
        Rotation::Deg90 => (vy, (src_h - 1).checked_sub(vx)?),
        Rotation::Deg180 => ((src_w - 1).checked_sub(vx)?, (src_h - 1).checked_sub(vy)?),
        Rotation::Deg270 => ((src_w - 1).checked_sub(vy)?, vx),
    };
    (sx < src_w && sy < src_h).then_some((sx, sy))
}

fn draw_view(frame: &mut [u32], fb_w: u32, rect: Rect, vf: &ViewFrame, view: &ViewState, highlight: bool) {
    if let Some(img) = &vf.image {
        let (img_w, img_h) = match view.rotation {
            Rotation::Deg90 | Rotation::Deg270 => (img.height as f32, img.width as f32),
            _ => (img.width as f32, img.height as f32),
        };
        let scale = view.zoom() as f32;
        let draw_w = img_w * scale;
        let draw_h = img_h * scale;
        let x0 = rect.x as f32 + (rect.w as f32 - draw_w) / 2.0 + view.scroll_x;
        let y0 = rect.y as f32 + (rect.h as f32 - draw_h) / 2.0 + view.scroll_y;

        blit_scaled_rotated(
            frame, fb_w, rect,
            &img.rgba_bytes, img.width, img.height,
            x0, y0, scale,
            view.rotation,
        );

        if vf.main_marker {
            let drawn = Rect {
                x: x0 as i32,
                y: y0 as i32,
                w: draw_w as u32,
                h: draw_h as u32,
            };
            stroke_rect(frame, fb_w, rect, drawn, MAIN_MARKER_WIDTH, (220, 0, 0));
        }
    } else if vf.error.is_some() {
        fill_rect(frame, fb_w, rect, rect, ERROR_TINT);
    }

    draw_caption(frame, fb_w, rect, vf);

    if highlight {
        stroke_rect(frame, fb_w, rect, rect, HIGHLIGHT_WIDTH, vf.highlight.rgb());
    }
}

/// Render every view of the session into the framebuffer.
pub fn render(session: &Session, frames: &[ViewFrame], frame: &mut [u32], fb_w: u32, fb_h: u32) {
    let (r, g, b) = session.background.rgb();
    frame.fill(rgb(r, g, b));

    let rects = view_rects(frames.len(), fb_w, fb_h);
    let multi = frames.len() > 1;
    for (vf, rect) in frames.iter().zip(rects) {
        draw_view(frame, fb_w, rect, vf, session.views().view(vf.slot.view), multi);
    }
}
