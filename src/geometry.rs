// ============================================================================
// VIEW GEOMETRY — pan/zoom camera and coordinate mapping
// ============================================================================
//
// Coordinate spaces, outermost to innermost:
//   screen px  — raw pixels inside the canvas widget
//   canvas     — screen px put through the inverse view transform
//   original   — canvas plus the crop-box offset (owned by the session)
//
// The view transform is translate-then-scale, so panning is 1:1 with raw
// pixel deltas at any zoom level.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

/// Log-scale delta applied by a single zoom click.
pub const ZOOM_STEP: f64 = 0.5;
/// Log-scale per horizontal pixel of a zoom drag.
pub const ZOOM_DRAG_SENSITIVITY: f64 = 0.005;

/// A 2D point (or vector) in any of the coordinate spaces above.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Row-major 2D affine transform `[a c e; b d f]`, matching the layout of a
/// canvas/DOM matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    /// Translate by `t`, then scale by `s` (the view transform order).
    pub fn translate_scale(t: Point, s: f64) -> Self {
        Self {
            a: s,
            b: 0.0,
            c: 0.0,
            d: s,
            e: t.x,
            f: t.y,
        }
    }

    /// General affine inverse. The view transform always has `a*d - b*c > 0`
    /// because scale is clamped strictly positive.
    pub fn inverse(&self) -> Self {
        let det = self.a * self.d - self.b * self.c;
        let inv_det = 1.0 / det;
        Self {
            a: self.d * inv_det,
            b: -self.b * inv_det,
            c: -self.c * inv_det,
            d: self.a * inv_det,
            e: (self.c * self.f - self.d * self.e) * inv_det,
            f: (self.b * self.e - self.a * self.f) * inv_det,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point {
            x: p.x * self.a + p.y * self.c + self.e,
            y: p.x * self.b + p.y * self.d + self.f,
        }
    }
}

/// Memoized inverse transform, keyed on the camera parameters that feed it.
#[derive(Clone, Copy)]
struct CachedInverse {
    tx: f64,
    ty: f64,
    scale: f64,
    inverse: Affine,
}

/// Per-canvas pan/zoom state.
///
/// Zoom lives in log space: operations add a delta to `log_scale`, never set
/// the scale directly, so zooming is multiplicative and symmetric. The
/// inverse transform is recomputed lazily and only when `(translation,
/// scale)` changed since the last point mapping — it is consulted on every
/// pointer move.
#[derive(Clone)]
pub struct Camera {
    pub translation: Point,
    log_scale: f64,
    cached_inverse: Cell<Option<CachedInverse>>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            translation: Point::default(),
            log_scale: 0.0,
            cached_inverse: Cell::new(None),
        }
    }
}

impl Camera {
    pub fn min_log_scale() -> f64 {
        0.02f64.ln()
    }

    pub fn max_log_scale() -> f64 {
        128f64.ln()
    }

    pub fn log_scale(&self) -> f64 {
        self.log_scale
    }

    pub fn set_log_scale(&mut self, value: f64) {
        self.log_scale = value.clamp(Self::min_log_scale(), Self::max_log_scale());
    }

    pub fn add_log_scale(&mut self, delta: f64) {
        self.set_log_scale(self.log_scale + delta);
    }

    pub fn scale(&self) -> f64 {
        self.log_scale.exp()
    }

    /// Zoom by `delta` in log space while keeping `anchor` (a canvas-space
    /// point) visually fixed: the translation absorbs the scale change at
    /// the anchor.
    pub fn zoom_anchored(&mut self, delta: f64, anchor: Point) {
        let old_scale = self.scale();
        self.add_log_scale(delta);
        let new_scale = self.scale();

        self.translation.x -= (new_scale - old_scale) * anchor.x;
        self.translation.y -= (new_scale - old_scale) * anchor.y;
    }

    /// The forward view transform (translate, then scale).
    pub fn transform(&self) -> Affine {
        Affine::translate_scale(self.translation, self.scale())
    }

    /// The memoized inverse view transform, recomputed only when the camera
    /// parameters changed since the previous call.
    pub fn inverted_transform(&self) -> Affine {
        let scale = self.scale();
        if let Some(cached) = self.cached_inverse.get() {
            if cached.tx == self.translation.x
                && cached.ty == self.translation.y
                && cached.scale == scale
            {
                return cached.inverse;
            }
        }
        let inverse = self.transform().inverse();
        self.cached_inverse.set(Some(CachedInverse {
            tx: self.translation.x,
            ty: self.translation.y,
            scale,
            inverse,
        }));
        inverse
    }

    /// Map a raw screen-pixel point into canvas space.
    pub fn screen_to_canvas(&self, p: Point) -> Point {
        self.inverted_transform().apply(p)
    }

    /// Map a canvas-space point back to screen pixels.
    pub fn canvas_to_screen(&self, p: Point) -> Point {
        self.transform().apply(p)
    }
}

// ============================================================================
// Ruler tick spacing
// ============================================================================

/// Scale thresholds and the major-tick spacing (in canvas units) used once
/// the view is at least that zoomed in.
const TICK_SPACING_TABLE: &[(f64, f64)] = &[
    (0.03125, 1600.0),
    (0.0625, 800.0),
    (0.125, 400.0),
    (0.25, 150.0),
    (0.5, 50.0),
    (2.0, 25.0),
    (4.0, 10.0),
    (8.0, 5.0),
    (16.0, 2.5),
    (32.0, 1.25),
    (64.0, 0.625),
];

/// Major ruler tick spacing for the given zoom scale. Spacing shrinks as the
/// view zooms in so on-screen tick density stays roughly constant.
pub fn ruler_tick_spacing(scale: f64) -> f64 {
    let mut spacing = 3200.0;
    for &(threshold, value) in TICK_SPACING_TABLE {
        if scale >= threshold {
            spacing = value;
        }
    }
    spacing
}
