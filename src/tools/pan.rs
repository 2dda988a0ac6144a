// ============================================================================
// PAN TOOL
// ============================================================================

use crate::events::RawPointerEvent;
use crate::session::EditSession;
use crate::surface::Surface;

use super::{EditTool, ToolCtx, ToolName};

/// Drag-to-pan. Deltas come from the raw screen-pixel positions, so the view
/// follows the pointer 1:1 regardless of zoom (translation is applied before
/// scale in the view transform).
#[derive(Default)]
pub struct PanTool;

impl EditTool for PanTool {
    fn name(&self) -> ToolName {
        ToolName::Pan
    }

    fn on_event(&mut self, event: &RawPointerEvent, ctx: &mut ToolCtx<'_>) {
        if let RawPointerEvent::Move(_) = event {
            if ctx.pointer.is_dragging {
                let delta = ctx.pointer.drag_delta_px();
                ctx.camera.translation.x += delta.x;
                ctx.camera.translation.y += delta.y;
            }
        }
    }

    fn draw(&self, _session: &EditSession, _target: &mut Surface) {}

    fn cursor(&self, ctx: &ToolCtx<'_>) -> egui::CursorIcon {
        if ctx.pointer.is_dragging {
            egui::CursorIcon::Grabbing
        } else {
            egui::CursorIcon::Grab
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PointerState;
    use crate::geometry::{Camera, Point};

    fn dispatch(tool: &mut PanTool, camera: &mut Camera, pointer: &mut PointerState, event: RawPointerEvent) {
        pointer.apply(&event, camera);
        let mut clipboard = None;
        let mut ctx = ToolCtx {
            camera,
            session: None,
            pointer,
            clipboard_request: &mut clipboard,
        };
        tool.on_event(&event, &mut ctx);
    }

    #[test]
    fn drag_moves_translation_one_to_one() {
        let mut camera = Camera::default();
        camera.set_log_scale(4.0f64.ln());
        let mut pointer = PointerState::default();
        let mut tool = PanTool::default();

        dispatch(&mut tool, &mut camera, &mut pointer, RawPointerEvent::Down(Point::new(50.0, 50.0)));
        dispatch(&mut tool, &mut camera, &mut pointer, RawPointerEvent::Move(Point::new(60.0, 45.0)));

        // 10 right, 5 up in screen pixels, regardless of the 4x zoom.
        assert_eq!(camera.translation, Point::new(10.0, -5.0));
    }

    #[test]
    fn move_without_drag_does_nothing() {
        let mut camera = Camera::default();
        let mut pointer = PointerState::default();
        let mut tool = PanTool::default();

        dispatch(&mut tool, &mut camera, &mut pointer, RawPointerEvent::Move(Point::new(10.0, 10.0)));
        dispatch(&mut tool, &mut camera, &mut pointer, RawPointerEvent::Move(Point::new(30.0, 30.0)));

        assert_eq!(camera.translation, Point::new(0.0, 0.0));
    }
}
