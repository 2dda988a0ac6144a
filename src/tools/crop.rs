// ============================================================================
// CROP TOOL
// ============================================================================
//
// On activation the session's crop box expands to the whole image so the
// user sees everything, while the previous box becomes this tool's working
// rectangle. Dragging handles or the interior adjusts the working rectangle;
// only the Accept message commits it as an undoable action. Deactivating
// without accepting restores the snapshot.

use crate::events::RawPointerEvent;
use crate::geometry::Point;
use crate::session::{CropBox, EditAction, EditSession};
use crate::surface::{Rgba8, Surface};

use super::{EditTool, ToolCtx, ToolMessage, ToolName};

/// Side length of the square resize handles, in image pixels.
pub const HANDLE_SIZE: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleDir {
    NorthWest,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum DownPos {
    Handle(HandleDir),
    Inside,
    Outside,
}

#[derive(Default)]
pub struct CropTool {
    /// Crop box as it was before activation; restored unless accepted.
    snapshot: Option<CropBox>,
    working: Option<CropBox>,
    drag: Option<DownPos>,
    accepted: bool,
}

impl CropTool {
    fn image_size(session: &EditSession) -> (f64, f64) {
        (session.image_width() as f64, session.image_height() as f64)
    }

    /// Handle centers in image space, clockwise from the north-west corner.
    pub fn handle_positions(rect: &CropBox) -> [(HandleDir, Point); 8] {
        let cx = rect.x + rect.width / 2.0;
        let cy = rect.y + rect.height / 2.0;
        let r = rect.x + rect.width;
        let b = rect.y + rect.height;
        [
            (HandleDir::NorthWest, Point::new(rect.x, rect.y)),
            (HandleDir::North, Point::new(cx, rect.y)),
            (HandleDir::NorthEast, Point::new(r, rect.y)),
            (HandleDir::East, Point::new(r, cy)),
            (HandleDir::SouthEast, Point::new(r, b)),
            (HandleDir::South, Point::new(cx, b)),
            (HandleDir::SouthWest, Point::new(rect.x, b)),
            (HandleDir::West, Point::new(rect.x, cy)),
        ]
    }

    fn classify(rect: &CropBox, pos: Point) -> DownPos {
        let half = HANDLE_SIZE / 2.0;
        for (dir, center) in Self::handle_positions(rect) {
            if (pos.x - center.x).abs() <= half && (pos.y - center.y).abs() <= half {
                return DownPos::Handle(dir);
            }
        }
        if rect.contains(pos) {
            DownPos::Inside
        } else {
            DownPos::Outside
        }
    }

    fn adjust(rect: &mut CropBox, dir: HandleDir, dx: f64, dy: f64) {
        use HandleDir::*;
        let moves_left = matches!(dir, NorthWest | West | SouthWest);
        let moves_right = matches!(dir, NorthEast | East | SouthEast);
        let moves_top = matches!(dir, NorthWest | North | NorthEast);
        let moves_bottom = matches!(dir, SouthWest | South | SouthEast);
        if moves_left {
            rect.x += dx;
            rect.width -= dx;
        }
        if moves_right {
            rect.width += dx;
        }
        if moves_top {
            rect.y += dy;
            rect.height -= dy;
        }
        if moves_bottom {
            rect.height += dy;
        }
    }

    fn working_or_full(&self, session: &EditSession) -> CropBox {
        self.working
            .unwrap_or_else(|| CropBox::full(session.image_width(), session.image_height()))
    }
}

impl EditTool for CropTool {
    fn name(&self) -> ToolName {
        ToolName::Crop
    }

    fn activate(&mut self, ctx: &mut ToolCtx<'_>) {
        let Some(session) = ctx.session.as_deref_mut() else {
            return;
        };
        self.snapshot = Some(session.crop_box);
        self.working = Some(session.crop_box);
        session.crop_box = CropBox::full(session.image_width(), session.image_height());
        session.bump();
    }

    fn on_event(&mut self, event: &RawPointerEvent, ctx: &mut ToolCtx<'_>) {
        let Some(session) = ctx.session.as_deref_mut() else {
            return;
        };
        let (iw, ih) = Self::image_size(session);
        match event {
            RawPointerEvent::Down(_) => {
                let Some(pos) = ctx.pointer.mouse_pos else {
                    return;
                };
                let rect = self.working_or_full(session);
                let down = Self::classify(&rect, pos);
                if down == DownPos::Outside {
                    // Start a fresh box from the press point; the minimum
                    // size kicks in once the drag adjusts it.
                    self.working = Some(CropBox {
                        x: pos.x.clamp(0.0, iw),
                        y: pos.y.clamp(0.0, ih),
                        width: 0.0,
                        height: 0.0,
                    });
                    self.drag = Some(DownPos::Handle(HandleDir::SouthEast));
                } else {
                    self.drag = Some(down);
                }
                session.bump();
            }
            RawPointerEvent::Move(_) => {
                if !ctx.pointer.is_dragging {
                    return;
                }
                let Some(drag) = self.drag else {
                    return;
                };
                let (Some(now), Some(prev)) = (ctx.pointer.mouse_pos, ctx.pointer.last_mouse_pos)
                else {
                    return;
                };
                let dx = now.x - prev.x;
                let dy = now.y - prev.y;
                let mut rect = self.working_or_full(session);
                match drag {
                    DownPos::Inside => {
                        rect.x += dx;
                        rect.y += dy;
                    }
                    DownPos::Handle(dir) => Self::adjust(&mut rect, dir, dx, dy),
                    DownPos::Outside => {}
                }
                self.working = Some(rect.clamped(iw, ih));
                session.bump();
            }
            RawPointerEvent::Up | RawPointerEvent::Leave => {
                self.drag = None;
            }
        }
    }

    fn draw(&self, session: &EditSession, target: &mut Surface) {
        let rect = self.working_or_full(session);
        let (w, h) = (target.width() as f64, target.height() as f64);
        let dim = Rgba8::rgba(0, 0, 0, 128);

        // Dim everything outside the working rectangle.
        target.fill_rect(0.0, 0.0, w, rect.y, dim);
        target.fill_rect(0.0, rect.y + rect.height, w, h - rect.y - rect.height, dim);
        target.fill_rect(0.0, rect.y, rect.x, rect.height, dim);
        target.fill_rect(
            rect.x + rect.width,
            rect.y,
            w - rect.x - rect.width,
            rect.height,
            dim,
        );

        target.stroke_rect(
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            5.0,
            Some((7.0, 7.0)),
            Rgba8::WHITE,
        );

        for (_, center) in Self::handle_positions(&rect) {
            let half = HANDLE_SIZE / 2.0;
            target.fill_rect(center.x - half, center.y - half, HANDLE_SIZE, HANDLE_SIZE, Rgba8::WHITE);
            target.stroke_rect(
                center.x - half,
                center.y - half,
                HANDLE_SIZE,
                HANDLE_SIZE,
                1.0,
                None,
                Rgba8::BLACK,
            );
        }
    }

    fn on_message(&mut self, message: &ToolMessage, ctx: &mut ToolCtx<'_>) {
        if *message != ToolMessage::CropAccept {
            return;
        }
        let Some(session) = ctx.session.as_deref_mut() else {
            return;
        };
        let (Some(before), Some(after)) = (self.snapshot, self.working) else {
            return;
        };
        session.push_undoable(EditAction::SetCropBox { before, after });
        self.accepted = true;
    }

    fn deactivate(&mut self, ctx: &mut ToolCtx<'_>) {
        let Some(session) = ctx.session.as_deref_mut() else {
            return;
        };
        if !self.accepted {
            if let Some(snapshot) = self.snapshot {
                session.crop_box = snapshot;
                session.bump();
            }
        }
    }

    fn cursor(&self, ctx: &ToolCtx<'_>) -> egui::CursorIcon {
        use HandleDir::*;
        let hovered = ctx
            .session
            .as_deref()
            .zip(ctx.pointer.mouse_pos)
            .map(|(session, pos)| Self::classify(&self.working_or_full(session), pos));
        match self.drag.or(hovered) {
            Some(DownPos::Handle(NorthWest)) | Some(DownPos::Handle(SouthEast)) => {
                egui::CursorIcon::ResizeNwSe
            }
            Some(DownPos::Handle(NorthEast)) | Some(DownPos::Handle(SouthWest)) => {
                egui::CursorIcon::ResizeNeSw
            }
            Some(DownPos::Handle(North)) | Some(DownPos::Handle(South)) => {
                egui::CursorIcon::ResizeVertical
            }
            Some(DownPos::Handle(East)) | Some(DownPos::Handle(West)) => {
                egui::CursorIcon::ResizeHorizontal
            }
            Some(DownPos::Inside) => egui::CursorIcon::Move,
            _ => egui::CursorIcon::Crosshair,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PointerState;
    use crate::geometry::Camera;
    use image::RgbaImage;

    fn session_200x200() -> EditSession {
        let mut s = EditSession::default();
        s.init(RgbaImage::new(200, 200)).unwrap();
        s
    }

    fn dispatch(
        tool: &mut CropTool,
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

    fn message(tool: &mut CropTool, session: &mut EditSession, msg: ToolMessage) {
        let mut camera = Camera::default();
        let pointer = PointerState::default();
        let mut clipboard = None;
        let mut ctx = ToolCtx {
            camera: &mut camera,
            session: Some(session),
            pointer: &pointer,
            clipboard_request: &mut clipboard,
        };
        tool.on_message(&msg, &mut ctx);
    }

    fn activate(tool: &mut CropTool, session: &mut EditSession) {
        let mut camera = Camera::default();
        let pointer = PointerState::default();
        let mut clipboard = None;
        let mut ctx = ToolCtx {
            camera: &mut camera,
            session: Some(session),
            pointer: &pointer,
            clipboard_request: &mut clipboard,
        };
        tool.activate(&mut ctx);
    }

    fn deactivate(tool: &mut CropTool, session: &mut EditSession) {
        let mut camera = Camera::default();
        let pointer = PointerState::default();
        let mut clipboard = None;
        let mut ctx = ToolCtx {
            camera: &mut camera,
            session: Some(session),
            pointer: &pointer,
            clipboard_request: &mut clipboard,
        };
        tool.deactivate(&mut ctx);
    }

    #[test]
    fn activation_expands_crop_and_keeps_snapshot() {
        let mut session = session_200x200();
        session.crop_box = CropBox {
            x: 20.0,
            y: 20.0,
            width: 60.0,
            height: 60.0,
        };
        let mut tool = CropTool::default();
        activate(&mut tool, &mut session);
        assert_eq!(session.crop_box, CropBox::full(200, 200));
        assert_eq!(tool.working.unwrap().x, 20.0);
    }

    #[test]
    fn deactivate_without_accept_restores_snapshot() {
        let mut session = session_200x200();
        let original = CropBox {
            x: 20.0,
            y: 20.0,
            width: 60.0,
            height: 60.0,
        };
        session.crop_box = original;
        let mut tool = CropTool::default();
        activate(&mut tool, &mut session);
        deactivate(&mut tool, &mut session);
        assert_eq!(session.crop_box, original);
        assert!(session.undo_stack.is_empty());
    }

    #[test]
    fn accept_commits_an_undoable_action() {
        let mut session = session_200x200();
        let mut tool = CropTool::default();
        activate(&mut tool, &mut session);

        let mut camera = Camera::default();
        let mut pointer = PointerState::default();
        // Drag the south-east corner handle inward by 50 pixels.
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Down(Point::new(200.0, 200.0)));
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Move(Point::new(150.0, 150.0)));
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Up);

        message(&mut tool, &mut session, ToolMessage::CropAccept);
        assert_eq!(session.undo_stack.len(), 1);
        assert_eq!(session.crop_box.width, 150.0);
        assert_eq!(session.crop_box.height, 150.0);

        session.undo();
        assert_eq!(session.crop_box, CropBox::full(200, 200));
    }

    #[test]
    fn interior_drag_moves_the_box() {
        let mut session = session_200x200();
        session.crop_box = CropBox {
            x: 50.0,
            y: 50.0,
            width: 100.0,
            height: 100.0,
        };
        let mut tool = CropTool::default();
        activate(&mut tool, &mut session);

        let mut camera = Camera::default();
        let mut pointer = PointerState::default();
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Down(Point::new(100.0, 100.0)));
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Move(Point::new(110.0, 120.0)));

        let rect = tool.working.unwrap();
        assert_eq!((rect.x, rect.y), (60.0, 70.0));
        assert_eq!((rect.width, rect.height), (100.0, 100.0));
    }

    #[test]
    fn resize_never_violates_minimum_size() {
        let mut session = session_200x200();
        let mut tool = CropTool::default();
        activate(&mut tool, &mut session);

        let mut camera = Camera::default();
        let mut pointer = PointerState::default();
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Down(Point::new(200.0, 200.0)));
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Move(Point::new(-50.0, -50.0)));

        let rect = tool.working.unwrap();
        assert!(rect.width >= crate::session::MIN_CROP_SIZE);
        assert!(rect.height >= crate::session::MIN_CROP_SIZE);
    }

    #[test]
    fn outside_press_starts_a_new_box() {
        let mut session = session_200x200();
        session.crop_box = CropBox {
            x: 0.0,
            y: 0.0,
            width: 50.0,
            height: 50.0,
        };
        let mut tool = CropTool::default();
        activate(&mut tool, &mut session);

        let mut camera = Camera::default();
        let mut pointer = PointerState::default();
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Down(Point::new(100.0, 100.0)));
        dispatch(&mut tool, &mut session, &mut camera, &mut pointer, RawPointerEvent::Move(Point::new(160.0, 140.0)));

        let rect = tool.working.unwrap();
        assert_eq!((rect.x, rect.y), (100.0, 100.0));
        assert_eq!((rect.width, rect.height), (60.0, 40.0));
    }
}
