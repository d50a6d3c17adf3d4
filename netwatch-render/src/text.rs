use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use bytemuck::cast_slice_mut;
use std::path::{Path, PathBuf};
use tiny_skia::{Color, Pixmap, PixmapPaint, PremultipliedColorU8, Transform};

const FALLBACK_FONTS: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Loads the panel font from `path`, or the first system font found.
pub fn load_font(path: Option<&Path>) -> Option<FontVec> {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![p.to_path_buf()],
        None => FALLBACK_FONTS.iter().map(PathBuf::from).collect(),
    };
    for candidate in candidates {
        match std::fs::read(&candidate) {
            Ok(bytes) => match FontVec::try_from_vec(bytes) {
                Ok(font) => {
                    log::info!("Using font {}", candidate.display());
                    return Some(font);
                }
                Err(e) => log::warn!("Font {} unusable: {}", candidate.display(), e),
            },
            Err(e) if path.is_some() => {
                log::warn!("Cannot read font {}: {}", candidate.display(), e)
            }
            Err(_) => {}
        }
    }
    log::warn!("No font available, panel text will not be drawn");
    None
}

/// Rasterizes a single line of text into a tight, premultiplied pixmap.
/// `None` when nothing in `text` has an outline.
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: Color,
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for g in &glyphs {
        if let Some(out) = font.outline_glyph(g.clone()) {
            let b = out.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }
    }

    if min_x == f32::INFINITY {
        return None;
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;

    let stride = pm.width() as usize;
    let dst = pm.pixels_mut();
    let cu = color.to_color_u8();

    for g in &glyphs {
        if let Some(out) = font.outline_glyph(g.clone()) {
            let b = out.px_bounds();
            out.draw(|x, y, cov| {
                if cov <= f32::EPSILON {
                    return;
                }
                let ix = (x as f32 + b.min.x - min_x).floor() as i32;
                let iy = (y as f32 + b.min.y - min_y).floor() as i32;
                if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                    return;
                }
                let i = iy as usize * stride + ix as usize;

                let a_lin = (cov * cu.alpha() as f32 / 255.0).clamp(0.0, 1.0);
                let sa = (a_lin * 255.0) as u8;
                let sr = ((cu.red() as f32 * a_lin) as u8).min(sa);
                let sg = ((cu.green() as f32 * a_lin) as u8).min(sa);
                let sb = ((cu.blue() as f32 * a_lin) as u8).min(sa);

                // source over, premultiplied
                let bg = dst[i];
                let inv = 1.0 - (sa as f32 / 255.0);
                let a = sa.saturating_add((bg.alpha() as f32 * inv) as u8);
                let r = sr.saturating_add((bg.red() as f32 * inv) as u8).min(a);
                let g = sg.saturating_add((bg.green() as f32 * inv) as u8).min(a);
                let b = sb.saturating_add((bg.blue() as f32 * inv) as u8).min(a);
                if let Some(px) = PremultipliedColorU8::from_rgba(r, g, b, a) {
                    dst[i] = px;
                }
            });
        }
    }

    Some(pm)
}

/// Returns a copy of `src` padded by `radius` on every side and smeared
/// with a separable box blur, which is how censored panel rows are drawn.
pub fn box_blur(src: &Pixmap, radius: u32) -> Pixmap {
    let r = radius as usize;
    let w = src.width() as usize + r * 2;
    let h = src.height() as usize + r * 2;
    let Some(mut out) = Pixmap::new(w as u32, h as u32) else {
        return src.clone();
    };
    out.draw_pixmap(
        radius as i32,
        radius as i32,
        src.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    if r == 0 {
        return out;
    }

    let px: &mut [[u8; 4]] = cast_slice_mut(out.data_mut());
    let mut scratch = vec![[0u8; 4]; w.max(h)];
    let window = (r * 2 + 1) as u32;

    for y in 0..h {
        let row = &mut px[y * w..(y + 1) * w];
        blur_line(row.iter().copied(), w, r, window, &mut scratch);
        row.copy_from_slice(&scratch[..w]);
    }
    for x in 0..w {
        let column: Vec<[u8; 4]> = (0..h).map(|y| px[y * w + x]).collect();
        blur_line(column.into_iter(), h, r, window, &mut scratch);
        for y in 0..h {
            px[y * w + x] = scratch[y];
        }
    }
    out
}

fn blur_line<I>(line: I, len: usize, r: usize, window: u32, out: &mut [[u8; 4]])
where
    I: Iterator<Item = [u8; 4]>,
{
    let line: Vec<[u8; 4]> = line.collect();
    let at = |i: isize| -> [u32; 4] {
        if i < 0 || i as usize >= len {
            [0; 4]
        } else {
            line[i as usize].map(u32::from)
        }
    };
    let mut sum = [0u32; 4];
    for i in -(r as isize)..=(r as isize) {
        let p = at(i);
        for c in 0..4 {
            sum[c] += p[c];
        }
    }
    for i in 0..len {
        out[i] = sum.map(|s| (s / window) as u8);
        let add = at(i as isize + r as isize + 1);
        let sub = at(i as isize - r as isize);
        for c in 0..4 {
            sum[c] = sum[c] + add[c] - sub[c];
        }
    }
}
