// ============================================================================
// PEN TOOL
// ============================================================================
//
// Points accumulate in original-image space while the button is held; the
// committed stroke therefore stays put if the crop box changes later. The
// in-progress stroke is overlay-only until Up commits it to the session.

use crate::events::RawPointerEvent;
use crate::geometry::Point;
use crate::session::{Drawing, EditAction, EditSession};
use crate::surface::Surface;

use super::{EditTool, PenStyle, ToolCtx, ToolMessage, ToolName};

pub struct PenTool {
    style: PenStyle,
    points: Vec<Point>,
}

impl PenTool {
    pub fn new(style: PenStyle) -> Self {
        Self {
            style,
            points: Vec::new(),
        }
    }

    fn commit(&mut self, session: &mut EditSession) {
        if self.points.is_empty() {
            return;
        }
        let drawing = Drawing::Stroke {
            color: self.style.color,
            width: self.style.width,
            points: std::mem::take(&mut self.points),
        };
        // The stroke was already visible as an overlay; append it and record
        // the action without re-applying.
        session.drawings.push(drawing.clone());
        session.record_pushed(EditAction::PushDrawing { value: drawing });
    }
}

impl EditTool for PenTool {
    fn name(&self) -> ToolName {
        ToolName::Pen
    }

    fn on_event(&mut self, event: &RawPointerEvent, ctx: &mut ToolCtx<'_>) {
        let Some(session) = ctx.session.as_deref_mut() else {
            return;
        };
        match event {
            RawPointerEvent::Down(_) => {
                if let Some(pos) = ctx.pointer.mouse_pos {
                    self.points.clear();
                    self.points.push(session.to_original_pos(pos));
                    session.bump();
                }
            }
            RawPointerEvent::Move(_) => {
                if ctx.pointer.is_dragging && !self.points.is_empty() {
                    if let Some(pos) = ctx.pointer.mouse_pos {
                        self.points.push(session.to_original_pos(pos));
                        session.bump();
                    }
                }
            }
            RawPointerEvent::Up => {
                self.commit(session);
            }
            RawPointerEvent::Leave => {
                // An interrupted stroke still commits what it has.
                self.commit(session);
            }
        }
    }

    fn draw(&self, _session: &EditSession, target: &mut Surface) {
        if !self.points.is_empty() {
            target.stroke_polyline(&self.points, self.style.width, self.style.color);
        }
    }

    fn on_message(&mut self, message: &ToolMessage, _ctx: &mut ToolCtx<'_>) {
        if let ToolMessage::PenStyle(style) = message {
            self.style = *style;
        }
    }

    fn deactivate(&mut self, ctx: &mut ToolCtx<'_>) {
        if let Some(session) = ctx.session.as_deref_mut() {
            self.commit(session);
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
    use crate::session::CropBox;
    use image::RgbaImage;

    fn session_100x100() -> EditSession {
        let mut s = EditSession::default();
        s.init(RgbaImage::new(100, 100)).unwrap();
        s
    }

    fn dispatch(
        tool: &mut PenTool,
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
    fn stroke_commits_on_release_and_undoes() {
        let mut session = session_100x100();
        let mut camera = Camera::default();
        let mut pointer = PointerState::default();
        let mut tool = PenTool::new(PenStyle::default());

        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Down(Point::new(10.0, 10.0)));
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Move(Point::new(20.0, 20.0)));
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Move(Point::new(30.0, 25.0)));
        assert!(session.drawings.is_empty());

        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Up);
        assert_eq!(session.drawings.len(), 1);
        assert_eq!(session.undo_stack.len(), 1);
        match &session.drawings[0] {
            Drawing::Stroke { points, .. } => assert_eq!(points.len(), 3),
        }

        session.undo();
        assert!(session.drawings.is_empty());
        session.redo();
        assert_eq!(session.drawings.len(), 1);
    }

    #[test]
    fn points_are_recorded_in_original_space() {
        let mut session = session_100x100();
        session.crop_box = CropBox {
            x: 30.0,
            y: 40.0,
            width: 50.0,
            height: 50.0,
        };
        let mut camera = Camera::default();
        let mut pointer = PointerState::default();
        let mut tool = PenTool::new(PenStyle::default());

        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Down(Point::new(5.0, 5.0)));
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Up);

        match &session.drawings[0] {
            Drawing::Stroke { points, .. } => {
                assert_eq!(points[0], Point::new(35.0, 45.0));
            }
        }
    }

    #[test]
    fn release_without_press_is_a_noop() {
        let mut session = session_100x100();
        let mut camera = Camera::default();
        let mut pointer = PointerState::default();
        let mut tool = PenTool::new(PenStyle::default());

        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Up);
        assert!(session.drawings.is_empty());
        assert!(session.undo_stack.is_empty());
    }
}
