// ============================================================================
// SOFTWARE SURFACE — deterministic RGBA raster target
// ============================================================================
//
// All core drawing (replay, tool overlays, crop blits) happens on these
// surfaces so that flatten/export is pixel-identical to the on-screen
// composite. No anti-aliasing anywhere: identical inputs produce
// byte-identical output.

use image::RgbaImage;
use rayon::prelude::*;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::geometry::Point;
use crate::session::CropBox;

// ============================================================================
// Color
// ============================================================================

/// Straight-alpha RGBA color. Serializes as `"#rrggbb"` / `"#rrggbbaa"` hex,
/// the same notation the session JSON files use for stroke colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Result<Self, String> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let parse = |s: &str| u8::from_str_radix(s, 16).map_err(|e| format!("bad hex '{hex}': {e}"));
        match digits.len() {
            3 => {
                let r = parse(&digits[0..1])?;
                let g = parse(&digits[1..2])?;
                let b = parse(&digits[2..3])?;
                Ok(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 | 8 => {
                let r = parse(&digits[0..2])?;
                let g = parse(&digits[2..4])?;
                let b = parse(&digits[4..6])?;
                let a = if digits.len() == 8 {
                    parse(&digits[6..8])?
                } else {
                    255
                };
                Ok(Self::rgba(r, g, b, a))
            }
            _ => Err(format!("bad hex color '{hex}'")),
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Serialize for Rgba8 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgba8 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(D::Error::custom)
    }
}

impl From<egui::Color32> for Rgba8 {
    fn from(c: egui::Color32) -> Self {
        Self::rgba(c.r(), c.g(), c.b(), c.a())
    }
}

impl From<Rgba8> for egui::Color32 {
    fn from(c: Rgba8) -> Self {
        egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
    }
}

// ============================================================================
// Surface
// ============================================================================

/// A plain CPU-side RGBA buffer with the raster primitives the editor needs.
#[derive(Clone, PartialEq)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Reallocate to new dimensions (contents are cleared). No-op when the
    /// size already matches.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            *self = Self::new(width, height);
        }
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        if x >= self.width || y >= self.height {
            return Rgba8::rgba(0, 0, 0, 0);
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Rgba8::rgba(self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3])
    }

    /// Source-over blend of `color` onto the pixel at `(x, y)`.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: Rgba8) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        if color.a == 255 {
            self.data[i] = color.r;
            self.data[i + 1] = color.g;
            self.data[i + 2] = color.b;
            self.data[i + 3] = 255;
            return;
        }
        if color.a == 0 {
            return;
        }
        let sa = color.a as u32;
        let da = self.data[i + 3] as u32;
        let out_a = sa + da * (255 - sa) / 255;
        if out_a == 0 {
            return;
        }
        let blend = |s: u8, d: u8| -> u8 {
            let s = s as u32;
            let d = d as u32;
            (((s * sa + d * da * (255 - sa) / 255) + out_a / 2) / out_a) as u8
        };
        self.data[i] = blend(color.r, self.data[i]);
        self.data[i + 1] = blend(color.g, self.data[i + 1]);
        self.data[i + 2] = blend(color.b, self.data[i + 2]);
        self.data[i + 3] = out_a as u8;
    }

    /// Copy a decoded image onto the surface at the origin, replacing pixels.
    pub fn blit_image(&mut self, image: &RgbaImage) {
        let w = self.width.min(image.width()) as usize;
        let h = self.height.min(image.height()) as usize;
        let src = image.as_raw();
        let src_stride = image.width() as usize * 4;
        let dst_stride = self.width as usize * 4;
        for y in 0..h {
            let s = y * src_stride;
            let d = y * dst_stride;
            self.data[d..d + w * 4].copy_from_slice(&src[s..s + w * 4]);
        }
    }

    /// Fill an axis-aligned rectangle (source-over). Coordinates are
    /// fractional; the filled region covers every pixel whose index lies in
    /// `[floor(min), ceil(max))`.
    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgba8) {
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let x0 = x.floor() as i64;
        let y0 = y.floor() as i64;
        let x1 = (x + w).ceil() as i64;
        let y1 = (y + h).ceil() as i64;
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px, py, color);
            }
        }
    }

    /// Outline an axis-aligned rectangle with a stroke centered on its
    /// border, optionally dashed (`dash = Some((on, off))` in pixels,
    /// measured along each edge independently).
    pub fn stroke_rect(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        line_width: f64,
        dash: Option<(f64, f64)>,
        color: Rgba8,
    ) {
        let half = line_width / 2.0;
        // Edges as (start, end, horizontal?) so dashes run along each edge.
        let edges = [
            (Point::new(x, y), Point::new(x + w, y), true),
            (Point::new(x, y + h), Point::new(x + w, y + h), true),
            (Point::new(x, y), Point::new(x, y + h), false),
            (Point::new(x + w, y), Point::new(x + w, y + h), false),
        ];
        for (start, end, horizontal) in edges {
            let len = if horizontal {
                end.x - start.x
            } else {
                end.y - start.y
            };
            let (on, period) = match dash {
                Some((on, off)) => (on, on + off),
                None => (len, len.max(1.0)),
            };
            let mut t = 0.0;
            while t < len {
                let seg = on.min(len - t);
                if horizontal {
                    self.fill_rect(start.x + t, start.y - half, seg, line_width, color);
                } else {
                    self.fill_rect(start.x - half, start.y + t, line_width, seg, color);
                }
                t += period;
            }
        }
    }

    /// Stroke a polyline with round caps and joins: each segment is drawn as
    /// a solid capsule of radius `width / 2`. A single point renders as a
    /// dot.
    pub fn stroke_polyline(&mut self, points: &[Point], width: f64, color: Rgba8) {
        if points.is_empty() {
            return;
        }
        if points.len() == 1 {
            self.fill_capsule(points[0], points[0], width / 2.0, color);
            return;
        }
        // Pixels already painted by a previous segment of the same stroke
        // must not blend twice (visible with translucent colors), so the
        // whole stroke is rasterized into a coverage mask first.
        let radius = width / 2.0;
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let x0 = ((min_x - radius).floor() as i64).max(0);
        let y0 = ((min_y - radius).floor() as i64).max(0);
        let x1 = ((max_x + radius).ceil() as i64 + 1).min(self.width as i64);
        let y1 = ((max_y + radius).ceil() as i64 + 1).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let r2 = radius * radius;
        for py in y0..y1 {
            for px in x0..x1 {
                let center = Point::new(px as f64 + 0.5, py as f64 + 0.5);
                let covered = points
                    .windows(2)
                    .any(|seg| dist_sq_to_segment(center, seg[0], seg[1]) <= r2);
                if covered {
                    self.blend_pixel(px, py, color);
                }
            }
        }
    }

    fn fill_capsule(&mut self, a: Point, b: Point, radius: f64, color: Rgba8) {
        let x0 = ((a.x.min(b.x) - radius).floor() as i64).max(0);
        let y0 = ((a.y.min(b.y) - radius).floor() as i64).max(0);
        let x1 = ((a.x.max(b.x) + radius).ceil() as i64 + 1).min(self.width as i64);
        let y1 = ((a.y.max(b.y) + radius).ceil() as i64 + 1).min(self.height as i64);
        let r2 = radius * radius;
        for py in y0..y1 {
            for px in x0..x1 {
                let center = Point::new(px as f64 + 0.5, py as f64 + 0.5);
                if dist_sq_to_segment(center, a, b) <= r2 {
                    self.blend_pixel(px, py, color);
                }
            }
        }
    }

    /// Nearest-neighbor blit of a sub-rectangle of `src` to this surface's
    /// full extent, scaling when the dimensions differ. Used both for the
    /// on-screen composite and for 1:1 export.
    pub fn blit_cropped(&mut self, src: &Surface, crop: &CropBox) {
        let dst_w = self.width as f64;
        let dst_h = self.height as f64;
        if dst_w == 0.0 || dst_h == 0.0 {
            return;
        }
        let sx = crop.width / dst_w;
        let sy = crop.height / dst_h;
        let width = self.width as usize;
        let src_ref = &*src;
        self.data
            .par_chunks_mut(width * 4)
            .enumerate()
            .for_each(|(py, row)| {
                for px in 0..width {
                    let ox = crop.x + (px as f64 + 0.5) * sx;
                    let oy = crop.y + (py as f64 + 0.5) * sy;
                    if ox < 0.0 || oy < 0.0 {
                        continue;
                    }
                    let p = src_ref.pixel(ox as u32, oy as u32);
                    let i = px * 4;
                    row[i] = p.r;
                    row[i + 1] = p.g;
                    row[i + 2] = p.b;
                    row[i + 3] = p.a;
                }
            });
    }

    /// Composite the cropped view of `src` through the view transform
    /// (translate then scale) onto this surface. Every destination pixel is
    /// inverse-mapped and nearest-sampled; rows run in parallel.
    pub fn blit_cropped_transformed(
        &mut self,
        src: &Surface,
        crop: &CropBox,
        translation: Point,
        scale: f64,
    ) {
        let width = self.width as usize;
        let src_ref = &*src;
        self.data
            .par_chunks_mut(width * 4)
            .enumerate()
            .for_each(|(py, row)| {
                for px in 0..width {
                    let cx = (px as f64 + 0.5 - translation.x) / scale;
                    let cy = (py as f64 + 0.5 - translation.y) / scale;
                    if cx < 0.0 || cy < 0.0 || cx >= crop.width || cy >= crop.height {
                        continue;
                    }
                    let p = src_ref.pixel((cx + crop.x) as u32, (cy + crop.y) as u32);
                    let i = px * 4;
                    row[i] = p.r;
                    row[i + 1] = p.g;
                    row[i + 2] = p.b;
                    row[i + 3] = p.a;
                }
            });
    }

    /// Extract a sub-rectangle as a standalone image (for clipboard copy).
    pub fn extract_region(&self, x: u32, y: u32, w: u32, h: u32) -> RgbaImage {
        let mut out = RgbaImage::new(w.max(1), h.max(1));
        for py in 0..h {
            for px in 0..w {
                let p = self.pixel(x + px, y + py);
                out.put_pixel(px, py, image::Rgba([p.r, p.g, p.b, p.a]));
            }
        }
        out
    }

    /// Convert the whole surface into an `RgbaImage` for encoding.
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbaImage::new(1, 1))
    }
}

/// Squared distance from `p` to the segment `a..b`.
fn dist_sq_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let apx = p.x - a.x;
    let apy = p.y - a.y;
    let len_sq = abx * abx + aby * aby;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        ((apx * abx + apy * aby) / len_sq).clamp(0.0, 1.0)
    };
    let dx = apx - t * abx;
    let dy = apy - t * aby;
    dx * dx + dy * dy
}
