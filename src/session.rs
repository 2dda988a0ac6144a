// ============================================================================
// EDIT SESSION — non-destructive document model
// ============================================================================
//
// The decoded pixels of the opened image are never mutated. Every edit is a
// small value (a crop box change, a pushed drawing) replayed over the
// original each frame, so undo/redo is just stack discipline plus a replay.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::surface::{Rgba8, Surface};

/// Smallest crop box edge, in image pixels.
pub const MIN_CROP_SIZE: f64 = 20.0;

// ============================================================================
// Crop box
// ============================================================================

/// Axis-aligned sub-rectangle of the original image, in image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropBox {
    /// The crop box covering the whole image.
    pub fn full(image_width: u32, image_height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: image_width as f64,
            height: image_height as f64,
        }
    }

    /// Clamp into the image bounds with a minimum edge of [`MIN_CROP_SIZE`].
    /// Idempotent: clamping an already valid box returns it unchanged.
    pub fn clamped(self, image_width: f64, image_height: f64) -> Self {
        let x = self.x.clamp(0.0, (image_width - MIN_CROP_SIZE).max(0.0));
        let y = self.y.clamp(0.0, (image_height - MIN_CROP_SIZE).max(0.0));
        let width = self.width.clamp(MIN_CROP_SIZE, (image_width - x).max(MIN_CROP_SIZE));
        let height = self.height.clamp(MIN_CROP_SIZE, (image_height - y).max(MIN_CROP_SIZE));
        Self { x, y, width, height }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }
}

impl Default for CropBox {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }
}

// ============================================================================
// Drawings
// ============================================================================

/// A committed mark on the image, positioned in original-image pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Drawing {
    Stroke {
        color: Rgba8,
        width: f64,
        points: Vec<Point>,
    },
}

impl Drawing {
    fn render(&self, target: &mut Surface) {
        match self {
            Drawing::Stroke { color, width, points } => {
                target.stroke_polyline(points, *width, *color);
            }
        }
    }
}

// ============================================================================
// Undoable actions
// ============================================================================

/// One reversible edit. Each variant carries enough state to apply in either
/// direction without consulting anything outside the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditAction {
    SetCropBox { before: CropBox, after: CropBox },
    PushDrawing { value: Drawing },
}

impl EditAction {
    /// Short human-readable name for the history panel.
    pub fn label(&self) -> &'static str {
        match self {
            EditAction::SetCropBox { .. } => "Crop",
            EditAction::PushDrawing { .. } => "Pen stroke",
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// The per-document editing state. `original` stays untouched after
/// [`EditSession::init`]; everything else replays over it.
#[derive(Debug, Default)]
pub struct EditSession {
    original: Option<RgbaImage>,
    pub crop_box: CropBox,
    pub drawings: Vec<Drawing>,
    pub undo_stack: Vec<EditAction>,
    pub redo_stack: Vec<EditAction>,
    /// Bumped on every state change. Immediate-mode UI re-reads the session
    /// each frame; this counter is what "something changed" means (dirty
    /// tracking, repaint scheduling).
    revision: u64,
}

impl EditSession {
    /// Bind the decoded image. May only be called once per session.
    pub fn init(&mut self, image: RgbaImage) -> Result<(), String> {
        if self.original.is_some() {
            return Err("edit session is already initialized".into());
        }
        self.crop_box = CropBox::full(image.width(), image.height());
        self.original = Some(image);
        self.bump();
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.original.is_some()
    }

    pub fn original(&self) -> Option<&RgbaImage> {
        self.original.as_ref()
    }

    pub fn image_width(&self) -> u32 {
        self.original.as_ref().map_or(0, |i| i.width())
    }

    pub fn image_height(&self) -> u32 {
        self.original.as_ref().map_or(0, |i| i.height())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Translate a point in cropped-canvas space to original-image space.
    pub fn to_original_pos(&self, canvas_pos: Point) -> Point {
        Point::new(canvas_pos.x + self.crop_box.x, canvas_pos.y + self.crop_box.y)
    }

    // ------------------------------------------------------------------------
    // Undo / redo
    // ------------------------------------------------------------------------

    /// Apply `action`, push it onto the undo stack, and clear the redo stack.
    pub fn push_undoable(&mut self, action: EditAction) {
        self.apply(&action);
        self.undo_stack.push(action);
        self.redo_stack.clear();
        self.bump();
    }

    /// Record an action whose effect has already been applied directly (the
    /// pen pushes its drawing while the stroke finishes). Still clears the
    /// redo stack.
    pub fn record_pushed(&mut self, action: EditAction) {
        self.undo_stack.push(action);
        self.redo_stack.clear();
        self.bump();
    }

    /// Revert the most recent action. No-op when the undo stack is empty.
    pub fn undo(&mut self) {
        if let Some(action) = self.undo_stack.pop() {
            self.revert(&action);
            self.redo_stack.push(action);
            self.bump();
        }
    }

    /// Re-apply the most recently undone action. No-op when the redo stack
    /// is empty.
    pub fn redo(&mut self) {
        if let Some(action) = self.redo_stack.pop() {
            self.apply(&action);
            self.undo_stack.push(action);
            self.bump();
        }
    }

    fn apply(&mut self, action: &EditAction) {
        match action {
            EditAction::SetCropBox { after, .. } => self.crop_box = *after,
            EditAction::PushDrawing { value } => self.drawings.push(value.clone()),
        }
    }

    fn revert(&mut self, action: &EditAction) {
        match action {
            EditAction::SetCropBox { before, .. } => self.crop_box = *before,
            EditAction::PushDrawing { .. } => {
                self.drawings.pop();
            }
        }
    }

    // ------------------------------------------------------------------------
    // Replay
    // ------------------------------------------------------------------------

    /// Render the full uncropped composite: original pixels, then every
    /// committed drawing in insertion order. Deterministic; identical state
    /// yields byte-identical output.
    pub fn draw_to_canvas(&self, target: &mut Surface) {
        let Some(original) = &self.original else {
            return;
        };
        target.resize(original.width(), original.height());
        target.clear();
        target.blit_image(original);
        for drawing in &self.drawings {
            drawing.render(target);
        }
    }

    /// Copy the crop-box region of the composite to `dst`, which is resized
    /// to the crop dimensions (rounded to whole pixels).
    pub fn crop_to_canvas(&self, composite: &Surface, dst: &mut Surface) {
        let w = self.crop_box.width.round().max(1.0) as u32;
        let h = self.crop_box.height.round().max(1.0) as u32;
        dst.resize(w, h);
        dst.blit_cropped(composite, &self.crop_box);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_100x100() -> EditSession {
        let mut s = EditSession::default();
        s.init(RgbaImage::from_pixel(100, 100, image::Rgba([200, 200, 200, 255])))
            .unwrap();
        s
    }

    fn stroke(points: &[(f64, f64)]) -> Drawing {
        Drawing::Stroke {
            color: Rgba8::rgb(255, 0, 0),
            width: 5.0,
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        }
    }

    #[test]
    fn init_twice_fails() {
        let mut s = session_100x100();
        let err = s.init(RgbaImage::new(10, 10)).unwrap_err();
        assert!(err.contains("already initialized"));
    }

    #[test]
    fn crop_clamp_is_idempotent_and_enforces_minimum() {
        let tiny = CropBox {
            x: 95.0,
            y: -5.0,
            width: 3.0,
            height: 300.0,
        }
        .clamped(100.0, 100.0);
        assert_eq!(tiny.x, 80.0);
        assert_eq!(tiny.y, 0.0);
        assert_eq!(tiny.width, MIN_CROP_SIZE);
        assert_eq!(tiny.height, 100.0);
        assert_eq!(tiny.clamped(100.0, 100.0), tiny);
    }

    #[test]
    fn crop_undo_redo_round_trip() {
        let mut s = session_100x100();
        let before = s.crop_box;
        let after = CropBox {
            x: 10.0,
            y: 10.0,
            width: 50.0,
            height: 50.0,
        };
        s.push_undoable(EditAction::SetCropBox { before, after });
        assert_eq!(s.crop_box, after);
        assert_eq!(s.undo_stack.len(), 1);

        s.undo();
        assert_eq!(s.crop_box, before);
        assert_eq!(s.redo_stack.len(), 1);

        s.redo();
        assert_eq!(s.crop_box, after);
        assert!(s.redo_stack.is_empty());
    }

    #[test]
    fn push_clears_redo_stack() {
        let mut s = session_100x100();
        s.push_undoable(EditAction::PushDrawing {
            value: stroke(&[(10.0, 10.0), (20.0, 20.0)]),
        });
        s.undo();
        assert_eq!(s.redo_stack.len(), 1);
        s.push_undoable(EditAction::PushDrawing {
            value: stroke(&[(30.0, 30.0)]),
        });
        assert!(s.redo_stack.is_empty());
        assert_eq!(s.drawings.len(), 1);
    }

    #[test]
    fn undo_redo_on_empty_stacks_are_noops() {
        let mut s = session_100x100();
        let rev = s.revision();
        s.undo();
        s.redo();
        assert_eq!(s.revision(), rev);
        assert_eq!(s.drawings.len(), 0);
    }

    #[test]
    fn pen_record_matches_push_semantics() {
        let mut s = session_100x100();
        // The pen appends directly while finishing the stroke, then records.
        s.drawings.push(stroke(&[(5.0, 5.0), (6.0, 6.0), (7.0, 7.0)]));
        s.record_pushed(EditAction::PushDrawing {
            value: s.drawings.last().unwrap().clone(),
        });
        assert_eq!(s.drawings.len(), 1);
        s.undo();
        assert!(s.drawings.is_empty());
        s.redo();
        assert_eq!(s.drawings.len(), 1);
    }

    #[test]
    fn replay_is_deterministic() {
        let mut s = session_100x100();
        s.push_undoable(EditAction::PushDrawing {
            value: stroke(&[(10.0, 10.0), (40.0, 40.0)]),
        });
        let mut a = Surface::new(1, 1);
        let mut b = Surface::new(1, 1);
        s.draw_to_canvas(&mut a);
        s.draw_to_canvas(&mut b);
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn to_original_pos_offsets_by_crop() {
        let mut s = session_100x100();
        s.crop_box = CropBox {
            x: 10.0,
            y: 20.0,
            width: 50.0,
            height: 50.0,
        };
        let p = s.to_original_pos(Point::new(5.0, 5.0));
        assert_eq!((p.x, p.y), (15.0, 25.0));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn clamped_boxes_stay_in_bounds_and_are_stable(
                x in -200.0..300.0f64,
                y in -200.0..300.0f64,
                w in -50.0..400.0f64,
                h in -50.0..400.0f64,
            ) {
                let b = CropBox { x, y, width: w, height: h }.clamped(100.0, 100.0);
                prop_assert!(b.x >= 0.0 && b.y >= 0.0);
                prop_assert!(b.width >= MIN_CROP_SIZE && b.height >= MIN_CROP_SIZE);
                prop_assert!(b.x + b.width <= 100.0);
                prop_assert!(b.y + b.height <= 100.0);
                prop_assert_eq!(b.clamped(100.0, 100.0), b);
            }

            #[test]
            fn full_undo_then_redo_restores_the_session(
                boxes in proptest::collection::vec(
                    (0.0..60.0f64, 0.0..60.0f64, 20.0..100.0f64, 20.0..100.0f64),
                    1..8,
                ),
            ) {
                let mut s = session_100x100();
                for (i, &(x, y, w, h)) in boxes.iter().enumerate() {
                    let before = s.crop_box;
                    let after = CropBox { x, y, width: w, height: h }.clamped(100.0, 100.0);
                    s.push_undoable(EditAction::SetCropBox { before, after });
                    if i % 2 == 0 {
                        s.push_undoable(EditAction::PushDrawing {
                            value: stroke(&[(x, y), (x + 5.0, y + 5.0)]),
                        });
                    }
                }
                let crop = s.crop_box;
                let drawings = s.drawings.clone();
                let depth = s.undo_stack.len();

                for _ in 0..depth {
                    s.undo();
                }
                prop_assert_eq!(s.crop_box, CropBox::full(100, 100));
                prop_assert!(s.drawings.is_empty());

                for _ in 0..depth {
                    s.redo();
                }
                prop_assert_eq!(s.crop_box, crop);
                prop_assert_eq!(s.drawings, drawings);
                prop_assert!(s.redo_stack.is_empty());
            }

            #[test]
            fn undo_is_the_exact_inverse_of_a_crop_push(
                x in 0.0..80.0f64,
                y in 0.0..80.0f64,
                w in 20.0..100.0f64,
                h in 20.0..100.0f64,
            ) {
                let mut s = session_100x100();
                let before = s.crop_box;
                let after = CropBox { x, y, width: w, height: h }.clamped(100.0, 100.0);
                s.push_undoable(EditAction::SetCropBox { before, after });
                s.undo();
                prop_assert_eq!(s.crop_box, before);
                prop_assert!(s.undo_stack.is_empty());
            }
        }
    }

    #[test]
    fn crop_to_canvas_sizes_to_crop_box() {
        let mut s = session_100x100();
        s.crop_box = CropBox {
            x: 10.0,
            y: 10.0,
            width: 30.0,
            height: 40.0,
        };
        let mut composite = Surface::new(1, 1);
        s.draw_to_canvas(&mut composite);
        let mut out = Surface::new(1, 1);
        s.crop_to_canvas(&composite, &mut out);
        assert_eq!((out.width(), out.height()), (30, 40));
        assert_eq!(out.pixel(0, 0), Rgba8::rgb(200, 200, 200));
    }
}
