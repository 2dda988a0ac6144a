// ============================================================================
// SELECT TOOL
// ============================================================================
//
// Drag out a rectangle, then copy its composite pixels to the system
// clipboard. The rectangle lives in original-image space and is clamped to
// the crop box while dragging, so the selection never reaches pixels the
// crop has hidden.

use crate::events::RawPointerEvent;
use crate::geometry::Point;
use crate::session::{CropBox, EditSession};
use crate::surface::{Rgba8, Surface};

use super::{EditTool, ToolCtx, ToolMessage, ToolName};

#[derive(Default)]
pub struct SelectTool {
    start: Option<Point>,
    end: Option<Point>,
}

impl SelectTool {
    fn clamp_to_crop(session: &EditSession, p: Point) -> Point {
        let c = session.crop_box;
        Point::new(p.x.clamp(c.x, c.x + c.width), p.y.clamp(c.y, c.y + c.height))
    }

    /// The normalized selection rectangle in original-image space, if a drag
    /// has produced one with any area.
    pub fn selected_region(&self) -> Option<CropBox> {
        let (a, b) = (self.start?, self.end?);
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        let width = (a.x - b.x).abs();
        let height = (a.y - b.y).abs();
        if width < 1.0 || height < 1.0 {
            return None;
        }
        Some(CropBox { x, y, width, height })
    }
}

impl EditTool for SelectTool {
    fn name(&self) -> ToolName {
        ToolName::Select
    }

    fn on_event(&mut self, event: &RawPointerEvent, ctx: &mut ToolCtx<'_>) {
        let Some(session) = ctx.session.as_deref_mut() else {
            return;
        };
        match event {
            RawPointerEvent::Down(_) => {
                if let Some(pos) = ctx.pointer.mouse_pos {
                    let p = Self::clamp_to_crop(session, session.to_original_pos(pos));
                    self.start = Some(p);
                    self.end = Some(p);
                    session.bump();
                }
            }
            RawPointerEvent::Move(_) => {
                if ctx.pointer.is_dragging && self.start.is_some() {
                    if let Some(pos) = ctx.pointer.mouse_pos {
                        self.end = Some(Self::clamp_to_crop(session, session.to_original_pos(pos)));
                        session.bump();
                    }
                }
            }
            RawPointerEvent::Up | RawPointerEvent::Leave => {}
        }
    }

    fn draw(&self, _session: &EditSession, target: &mut Surface) {
        if let Some(region) = self.selected_region() {
            target.stroke_rect(
                region.x,
                region.y,
                region.width,
                region.height,
                1.0,
                Some((5.0, 5.0)),
                Rgba8::WHITE,
            );
        }
    }

    fn on_message(&mut self, message: &ToolMessage, ctx: &mut ToolCtx<'_>) {
        if *message == ToolMessage::SelectCopy {
            *ctx.clipboard_request = self.selected_region();
        }
    }

    fn cursor(&self, _ctx: &ToolCtx<'_>) -> egui::CursorIcon {
        egui::CursorIcon::Crosshair
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PointerState;
    use crate::geometry::Camera;
    use image::RgbaImage;

    fn session_100x100() -> EditSession {
        let mut s = EditSession::default();
        s.init(RgbaImage::new(100, 100)).unwrap();
        s
    }

    fn dispatch(
        tool: &mut SelectTool,
        session: &mut EditSession,
        camera: &mut Camera,
        pointer: &mut PointerState,
        event: RawPointerEvent,
    ) {
        pointer.apply(&event, camera);
        let mut clipboard = None;
        let mut ctx = ToolCtx {
            camera,
            session: Some(session),
            pointer,
            clipboard_request: &mut clipboard,
        };
        tool.on_event(&event, &mut ctx);
    }

    #[test]
    fn drag_produces_a_normalized_region() {
        let mut session = session_100x100();
        let mut camera = Camera::default();
        let mut pointer = PointerState::default();
        let mut tool = SelectTool::default();

        // Drag up-left; the region still normalizes to positive extents.
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Down(Point::new(60.0, 70.0)));
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Move(Point::new(20.0, 30.0)));
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Up);

        let region = tool.selected_region().unwrap();
        assert_eq!((region.x, region.y), (20.0, 30.0));
        assert_eq!((region.width, region.height), (40.0, 40.0));
    }

    #[test]
    fn selection_is_clamped_to_the_crop_box() {
        let mut session = session_100x100();
        session.crop_box = CropBox {
            x: 10.0,
            y: 10.0,
            width: 40.0,
            height: 40.0,
        };
        let mut camera = Camera::default();
        let mut pointer = PointerState::default();
        let mut tool = SelectTool::default();

        // Canvas coordinates are relative to the crop box origin.
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Down(Point::new(0.0, 0.0)));
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Move(Point::new(100.0, 100.0)));

        let region = tool.selected_region().unwrap();
        assert_eq!((region.x, region.y), (10.0, 10.0));
        assert_eq!((region.width, region.height), (40.0, 40.0));
    }

    #[test]
    fn copy_message_publishes_the_region() {
        let mut session = session_100x100();
        let mut camera = Camera::default();
        let mut pointer = PointerState::default();
        let mut tool = SelectTool::default();

        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Down(Point::new(5.0, 5.0)));
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Move(Point::new(25.0, 25.0)));

        let mut clipboard = None;
        let mut ctx = ToolCtx {
            camera: &mut camera,
            session: Some(&mut session),
            pointer: &pointer,
            clipboard_request: &mut clipboard,
        };
        tool.on_message(&ToolMessage::SelectCopy, &mut ctx);
        let region = clipboard.unwrap();
        assert_eq!((region.width, region.height), (20.0, 20.0));
    }

    #[test]
    fn empty_selection_copies_nothing() {
        let tool = SelectTool::default();
        assert!(tool.selected_region().is_none());
    }

    #[test]
    fn overlay_rectangle_is_drawn_in_white() {
        let mut session = session_100x100();
        let mut camera = Camera::default();
        let mut pointer = PointerState::default();
        let mut tool = SelectTool::default();

        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Down(Point::new(10.0, 10.0)));
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Move(Point::new(40.0, 40.0)));

        let mut target = Surface::new(100, 100);
        tool.draw(&session, &mut target);
        // Dashes start at the corner, so the first border pixel is painted.
        assert_eq!(target.pixel(10, 10), Rgba8::WHITE);
    }
}
