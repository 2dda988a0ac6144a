// ============================================================================
// POINTER EVENTS — normalized input stream for the tools
// ============================================================================

use crate::geometry::{Camera, Point};

/// Pointer input relative to the canvas widget, in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RawPointerEvent {
    Down(Point),
    Move(Point),
    Up,
    Leave,
}

/// Shared pointer state, updated before each event reaches the active tool.
/// Positions are tracked in both canvas space (image pixels, through the
/// inverse view transform) and raw screen pixels; pan wants raw deltas so
/// dragging stays 1:1 at any zoom.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointerState {
    pub is_dragging: bool,
    /// Canvas-space position, when the pointer is over the widget.
    pub mouse_pos: Option<Point>,
    pub last_mouse_pos: Option<Point>,
    /// Screen-space position.
    pub mouse_pos_px: Option<Point>,
    pub last_mouse_pos_px: Option<Point>,
}

impl PointerState {
    /// Fold one event into the state. Down starts a drag and seeds the
    /// current position without touching the last one (the first Move after
    /// a Down gets a well-defined delta of zero when the pointer has not
    /// traveled). Leave resets everything.
    pub fn apply(&mut self, event: &RawPointerEvent, camera: &Camera) {
        match event {
            RawPointerEvent::Down(pos) => {
                self.is_dragging = true;
                self.mouse_pos_px = Some(*pos);
                self.mouse_pos = Some(camera.screen_to_canvas(*pos));
                self.last_mouse_pos_px = self.mouse_pos_px;
                self.last_mouse_pos = self.mouse_pos;
            }
            RawPointerEvent::Move(pos) => {
                self.last_mouse_pos_px = self.mouse_pos_px;
                self.last_mouse_pos = self.mouse_pos;
                self.mouse_pos_px = Some(*pos);
                self.mouse_pos = Some(camera.screen_to_canvas(*pos));
            }
            RawPointerEvent::Up => {
                self.is_dragging = false;
            }
            RawPointerEvent::Leave => {
                *self = Self::default();
            }
        }
    }

    /// Screen-space delta of the latest Move, zero when unknown.
    pub fn drag_delta_px(&self) -> Point {
        match (self.mouse_pos_px, self.last_mouse_pos_px) {
            (Some(now), Some(prev)) => Point::new(now.x - prev.x, now.y - prev.y),
            _ => Point::new(0.0, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::default()
    }

    #[test]
    fn down_seeds_both_positions() {
        let mut p = PointerState::default();
        p.apply(&RawPointerEvent::Down(Point::new(10.0, 20.0)), &camera());
        assert!(p.is_dragging);
        assert_eq!(p.mouse_pos_px, Some(Point::new(10.0, 20.0)));
        assert_eq!(p.last_mouse_pos_px, Some(Point::new(10.0, 20.0)));
        assert_eq!(p.drag_delta_px(), Point::new(0.0, 0.0));
    }

    #[test]
    fn move_shifts_last_position() {
        let mut p = PointerState::default();
        p.apply(&RawPointerEvent::Down(Point::new(10.0, 10.0)), &camera());
        p.apply(&RawPointerEvent::Move(Point::new(13.0, 14.0)), &camera());
        assert_eq!(p.last_mouse_pos_px, Some(Point::new(10.0, 10.0)));
        assert_eq!(p.mouse_pos_px, Some(Point::new(13.0, 14.0)));
        assert_eq!(p.drag_delta_px(), Point::new(3.0, 4.0));
    }

    #[test]
    fn up_ends_drag_but_keeps_position() {
        let mut p = PointerState::default();
        p.apply(&RawPointerEvent::Down(Point::new(5.0, 5.0)), &camera());
        p.apply(&RawPointerEvent::Up, &camera());
        assert!(!p.is_dragging);
        assert!(p.mouse_pos_px.is_some());
    }

    #[test]
    fn leave_resets_everything() {
        let mut p = PointerState::default();
        p.apply(&RawPointerEvent::Down(Point::new(5.0, 5.0)), &camera());
        p.apply(&RawPointerEvent::Leave, &camera());
        assert!(!p.is_dragging);
        assert!(p.mouse_pos.is_none());
        assert!(p.mouse_pos_px.is_none());
    }

    #[test]
    fn canvas_position_goes_through_inverse_transform() {
        let mut cam = Camera::default();
        cam.translation = Point::new(100.0, 50.0);
        cam.set_log_scale(2.0f64.ln());
        let mut p = PointerState::default();
        p.apply(&RawPointerEvent::Move(Point::new(120.0, 70.0)), &cam);
        let pos = p.mouse_pos.unwrap();
        assert!((pos.x - 10.0).abs() < 1e-9);
        assert!((pos.y - 10.0).abs() < 1e-9);
    }
}
