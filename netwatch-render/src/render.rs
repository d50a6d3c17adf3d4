use ab_glyph::FontVec;
use anyhow::Result;
use bytemuck::{cast_slice, cast_slice_mut};
use netwatch_cache::{intern_text, resolve_text};
use netwatch_core::{InfoField, SessionState};
use netwatch_session::{PanelDirection, TrialSession};
use netwatch_timing::{FrameTimingStats, HighPrecisionTimer, Timer};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::layout::{Bounds, Button, ScreenLayout};
use crate::text::{box_blur, render_text_pixmap};

const BACKGROUND: [u8; 4] = [24, 24, 28, 255];
const GAME_AREA: [u8; 4] = [12, 28, 44, 255];
const PANEL: [u8; 4] = [40, 42, 48, 255];
const DOT: [u8; 4] = [0, 196, 255, 255];
const DOT_SELECTED: [u8; 4] = [255, 196, 0, 255];
const CENTER_MARKER: [u8; 4] = [235, 235, 235, 255];
const BUTTON: [u8; 4] = [70, 90, 120, 255];
const BUTTON_IDLE: [u8; 4] = [55, 58, 66, 255];
const OVERLAY: [u8; 4] = [0, 0, 0, 200];

fn color(c: [u8; 4]) -> Color {
    Color::from_rgba8(c[0], c[1], c[2], c[3])
}

fn paint(c: [u8; 4]) -> Paint<'static> {
    let mut p = Paint::default();
    p.set_color(color(c));
    p.anti_alias = true;
    p
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TextStyle {
    Body,
    Censored,
    Advice,
    Label,
    Notice,
}

impl TextStyle {
    fn size(&self, base: f32) -> f32 {
        match self {
            TextStyle::Body | TextStyle::Censored | TextStyle::Label => base,
            TextStyle::Advice => base * 0.9,
            TextStyle::Notice => base * 1.6,
        }
    }

    fn color(&self) -> Color {
        match self {
            TextStyle::Advice => Color::from_rgba8(255, 220, 140, 255),
            _ => Color::WHITE,
        }
    }
}

/// Rasterized panel strings keyed by intern id and style
struct TextCache {
    font: Option<FontVec>,
    base_px: f32,
    map: HashMap<(usize, TextStyle), Option<Arc<Pixmap>>>,
}

impl TextCache {
    fn new(font: Option<FontVec>, base_px: f32) -> Self {
        Self {
            font,
            base_px,
            map: HashMap::new(),
        }
    }

    fn rescale(&mut self, base_px: f32) {
        if (self.base_px - base_px).abs() > f32::EPSILON {
            self.base_px = base_px;
            self.map.clear();
        }
    }

    fn get_or_render(&mut self, text: &str, style: TextStyle) -> Option<Arc<Pixmap>> {
        let font = self.font.as_ref()?;
        let id = intern_text(text);
        if let Some(hit) = self.map.get(&(id, style)) {
            return hit.clone();
        }
        let atom = resolve_text(id)?;
        let rendered = render_text_pixmap(&atom, style.size(self.base_px), font, style.color())
            .map(|pm| match style {
                TextStyle::Censored => box_blur(&pm, (self.base_px / 4.0).max(2.0) as u32),
                _ => pm,
            })
            .map(Arc::new);
        self.map.insert((id, style), rendered.clone());
        rendered
    }
}

pub struct FrameStats {
    pub clear: Duration,
    pub scene: Duration,
    pub copy: Duration,
    pub total: Duration,
}

/// Draws one trial session into a frame.
pub trait SceneRenderer<T: Timer<Timestamp = u64>> {
    fn render_scene(&mut self, session: &TrialSession<T>, notice: Option<&str>) -> Result<()>;
}

pub struct SkiaRenderer {
    layout: ScreenLayout,
    direction: PanelDirection,
    text_cache: TextCache,
    canvas: Pixmap,
    component_timers: HashMap<&'static str, HighPrecisionTimer>,
}

impl SkiaRenderer {
    pub fn new(
        width: u32,
        height: u32,
        direction: PanelDirection,
        font: Option<FontVec>,
    ) -> Result<Self> {
        let layout = ScreenLayout::compute(width, height, direction);
        let canvas = Pixmap::new(width.max(1), height.max(1))
            .ok_or_else(|| anyhow::anyhow!("Failed to create {}x{} canvas", width, height))?;
        Ok(Self {
            text_cache: TextCache::new(font, layout.text_px),
            layout,
            direction,
            canvas,
            component_timers: ["clear", "scene", "copy", "total"]
                .iter()
                .map(|&k| (k, HighPrecisionTimer::new()))
                .collect(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.layout = ScreenLayout::compute(width, height, self.direction);
        self.canvas = Pixmap::new(width.max(1), height.max(1))
            .ok_or_else(|| anyhow::anyhow!("Failed to resize canvas to {}x{}", width, height))?;
        self.text_cache.rescale(self.layout.text_px);
        Ok(())
    }

    pub fn layout(&self) -> &ScreenLayout {
        &self.layout
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    pub fn component_stats(&self) -> Vec<(&'static str, FrameTimingStats)> {
        let mut stats: Vec<_> = self
            .component_timers
            .iter()
            .map(|(k, t)| (*k, t.frame_stats()))
            .collect();
        stats.sort_by_key(|(k, _)| *k);
        stats
    }

    pub fn render_frame<T, C>(
        &mut self,
        session: &TrialSession<T>,
        notice: Option<&str>,
        frame_buffer: &mut [u8],
        timer: &mut C,
    ) -> Result<FrameStats>
    where
        T: Timer<Timestamp = u64>,
        C: Timer<Timestamp = u64>,
    {
        if frame_buffer.len() != self.canvas.data().len() {
            anyhow::bail!(
                "Frame buffer holds {} bytes, canvas needs {}",
                frame_buffer.len(),
                self.canvas.data().len()
            );
        }

        let t_clear = {
            let t = timer.now();
            self.canvas.fill(color(BACKGROUND));
            timer.elapsed(t)
        };
        let t_scene = {
            let t = timer.now();
            self.render_scene(session, notice)?;
            timer.elapsed(t)
        };
        let t_copy = {
            let t = timer.now();
            frame_buffer.copy_from_slice(self.canvas.data());
            timer.elapsed(t)
        };

        let total = t_clear + t_scene + t_copy;
        for (key, d) in [
            ("clear", t_clear),
            ("scene", t_scene),
            ("copy", t_copy),
            ("total", total),
        ] {
            if let Some(component) = self.component_timers.get_mut(key) {
                component.record_frame(d);
            }
        }
        timer.record_frame(total);

        Ok(FrameStats {
            clear: t_clear,
            scene: t_scene,
            copy: t_copy,
            total,
        })
    }

    fn fill_bounds(&mut self, bounds: Bounds, c: [u8; 4]) {
        if let Some(rect) = bounds.to_rect() {
            self.canvas
                .fill_rect(rect, &paint(c), Transform::identity(), None);
        }
    }

    fn fill_circle(&mut self, (cx, cy): (f32, f32), radius: f32, c: [u8; 4]) {
        if let Some(path) = PathBuilder::from_circle(cx, cy, radius) {
            self.canvas.fill_path(
                &path,
                &paint(c),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    fn stroke_circle(&mut self, (cx, cy): (f32, f32), radius: f32, width: f32, c: [u8; 4]) {
        if let Some(path) = PathBuilder::from_circle(cx, cy, radius) {
            let stroke = Stroke {
                width,
                ..Stroke::default()
            };
            self.canvas
                .stroke_path(&path, &paint(c), &stroke, Transform::identity(), None);
        }
    }

    /// Draws `text` left-aligned and vertically centered in `bounds`.
    fn draw_text(&mut self, text: &str, style: TextStyle, bounds: Bounds, centered: bool) {
        if text.is_empty() {
            return;
        }
        let Some(pm) = self.text_cache.get_or_render(text, style) else {
            return;
        };
        let x = if centered {
            bounds.x + (bounds.w - pm.width() as f32) * 0.5
        } else {
            bounds.x
        };
        let y = bounds.y + (bounds.h - pm.height() as f32) * 0.5;
        self.blit_pixmap(&pm, x as i32, y as i32);
    }

    /// Premultiplied source-over copy of `pm` with its top-left at `(x, y)`.
    fn blit_pixmap(&mut self, pm: &Pixmap, x: i32, y: i32) {
        let (w, h) = (pm.width() as i32, pm.height() as i32);
        let (cw, ch) = (self.canvas.width() as i32, self.canvas.height() as i32);
        if x + w <= 0 || y + h <= 0 || x >= cw || y >= ch {
            return;
        }

        let dst_x = x.max(0) as usize;
        let dst_y = y.max(0) as usize;
        let src_x = (-x).max(0) as usize;
        let src_y = (-y).max(0) as usize;
        let copy_w = (w as usize - src_x).min(cw as usize - dst_x);
        let copy_h = (h as usize - src_y).min(ch as usize - dst_y);

        let src_u32: &[u32] = cast_slice(pm.data());
        let stride = pm.width() as usize;
        let canvas_stride = cw as usize;
        let dst_u32: &mut [u32] = cast_slice_mut(self.canvas.data_mut());

        for row in 0..copy_h {
            let s = (src_y + row) * stride + src_x;
            let d = (dst_y + row) * canvas_stride + dst_x;
            let src_row = &src_u32[s..s + copy_w];
            let dst_row = &mut dst_u32[d..d + copy_w];

            if src_row.iter().all(|p| p >> 24 == 0xFF) {
                dst_row.copy_from_slice(src_row);
                continue;
            }
            for (dp, &sp) in dst_row.iter_mut().zip(src_row) {
                let sa = sp >> 24;
                if sa == 0 {
                    continue;
                }
                let inv = 255 - sa;
                let dst = *dp;
                let blend = |shift: u32| {
                    let sc = (sp >> shift) & 0xFF;
                    let dc = (dst >> shift) & 0xFF;
                    (sc + (dc * inv + 127) / 255).min(255)
                };
                *dp = (blend(24) << 24) | (blend(16) << 16) | (blend(8) << 8) | blend(0);
            }
        }
    }
}

impl<T> SceneRenderer<T> for SkiaRenderer
where
    T: Timer<Timestamp = u64>,
{
    fn render_scene(&mut self, session: &TrialSession<T>, notice: Option<&str>) -> Result<()> {
        let layout = self.layout.clone();
        let rules = session.rules();
        let input_open = session.state().allows_input();

        // game area
        self.fill_bounds(layout.game, GAME_AREA);
        if session.center_marker_visible() {
            self.fill_circle(
                layout.to_screen(netwatch_session::CENTER),
                layout.dot_radius * 0.5,
                CENTER_MARKER,
            );
        }
        for slot in session.slots().iter().filter(|s| s.is_visible()) {
            let at = layout.to_screen(slot.position());
            self.fill_circle(at, layout.dot_radius, DOT);
            if slot.selected {
                self.stroke_circle(at, layout.dot_radius * 1.4, 3.0, DOT_SELECTED);
            }
        }

        // info panel
        self.fill_bounds(layout.panel, PANEL);
        let selected = session.selected_packet();
        for field in InfoField::ALL {
            let style = if rules.is_censored(field) {
                TextStyle::Censored
            } else {
                TextStyle::Body
            };
            self.draw_text(&field.display(selected), style, layout.info_row(field), false);
        }
        if let Some(advice) = session.advice_text() {
            self.draw_text(advice, TextStyle::Advice, layout.advice, false);
        }
        for (button, bounds) in layout.buttons {
            let label = match button {
                Button::Classify(kind) => kind.label(),
                Button::Accept if rules.accept_visible => "Accept",
                Button::Accept => continue,
            };
            let active = input_open && selected.is_some();
            self.fill_bounds(bounds, if active { BUTTON } else { BUTTON_IDLE });
            self.draw_text(label, TextStyle::Label, bounds, true);
        }

        if let Some(text) = notice.filter(|_| !input_open) {
            self.fill_bounds(layout.game, OVERLAY);
            self.draw_text(text, TextStyle::Notice, layout.game, true);
        } else if session.state() == SessionState::Rendering {
            self.fill_bounds(layout.game, OVERLAY);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netwatch_core::Packet;
    use netwatch_session::{Condition, TrialConfig};
    use netwatch_timing::ManualTimer;

    fn session(timer: &ManualTimer) -> TrialSession<ManualTimer> {
        let condition = Condition {
            group: "A".into(),
            condition_text: "advisor".into(),
            ..Condition::default()
        };
        let config = TrialConfig {
            trial_length: 1.0,
            packet_time_on_screen: 2.0,
            ..TrialConfig::default()
        };
        let mut s = TrialSession::new(config, &condition, timer.clone()).unwrap();
        s.setup(vec![Packet::new([25.0, 25.0], None)]).unwrap();
        s.start().unwrap();
        s
    }

    fn pixel(r: &SkiaRenderer, (x, y): (f32, f32)) -> [u8; 4] {
        let p = r.canvas().pixel(x as u32, y as u32).unwrap();
        [p.red(), p.green(), p.blue(), p.alpha()]
    }

    #[test]
    fn frame_copies_canvas() {
        let timer = ManualTimer::new();
        let s = session(&timer);
        let mut r = SkiaRenderer::new(320, 200, PanelDirection::Standard, None).unwrap();
        let mut fb = vec![0u8; 320 * 200 * 4];
        let mut clock = ManualTimer::new();
        r.render_frame(&s, None, &mut fb, &mut clock).unwrap();
        assert_eq!(fb.as_slice(), r.canvas().data());
        assert_eq!(clock.frame_stats().frames, 1);
    }

    #[test]
    fn mismatched_frame_buffer_is_an_error() {
        let timer = ManualTimer::new();
        let s = session(&timer);
        let mut r = SkiaRenderer::new(320, 200, PanelDirection::Standard, None).unwrap();
        let mut fb = vec![0u8; 16];
        assert!(r
            .render_frame(&s, None, &mut fb, &mut ManualTimer::new())
            .is_err());
    }

    #[test]
    fn visible_dot_is_drawn_at_its_position() {
        let timer = ManualTimer::new();
        let mut s = session(&timer);
        let mut r = SkiaRenderer::new(640, 400, PanelDirection::Standard, None).unwrap();
        let spot = r.layout().to_screen([25.0, 25.0]);

        r.render_scene(&s, None).unwrap();
        assert_eq!(pixel(&r, spot), GAME_AREA);

        timer.advance(Duration::from_secs(1));
        s.update();
        r.canvas.fill(color(BACKGROUND));
        r.render_scene(&s, None).unwrap();
        assert_eq!(pixel(&r, spot), DOT);
    }

    #[test]
    fn blit_blends_translucent_pixels() {
        let mut r = SkiaRenderer::new(4, 4, PanelDirection::Standard, None).unwrap();
        r.canvas.fill(Color::BLACK);
        let mut pm = Pixmap::new(2, 2).unwrap();
        pm.fill(Color::from_rgba8(255, 255, 255, 128));
        r.blit_pixmap(&pm, 3, 3);
        let p = r.canvas.pixel(3, 3).unwrap();
        assert_eq!(p.alpha(), 255);
        assert!(p.red() > 100 && p.red() < 160);
        // clipped part left untouched
        assert_eq!(r.canvas.pixel(2, 2).unwrap().red(), 0);
    }
}
