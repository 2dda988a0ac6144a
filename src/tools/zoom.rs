// ============================================================================
// ZOOM TOOL
// ============================================================================

use crate::events::RawPointerEvent;
use crate::geometry::{Point, ZOOM_DRAG_SENSITIVITY, ZOOM_STEP};

use super::{EditTool, ToolCtx, ToolMessage, ToolName, ZoomMode};

/// Click to step zoom, drag horizontally for continuous zoom. Both anchor on
/// the point under the cursor at press time so that point stays put on
/// screen.
pub struct ZoomTool {
    mode: ZoomMode,
    /// Canvas-space anchor captured on Down.
    anchor: Option<Point>,
    /// Set once a drag actually travels; suppresses the click step on Up.
    dragged: bool,
}

impl ZoomTool {
    pub fn new(mode: ZoomMode) -> Self {
        Self {
            mode,
            anchor: None,
            dragged: false,
        }
    }

    fn step_sign(&self) -> f64 {
        match self.mode {
            ZoomMode::In => 1.0,
            ZoomMode::Out => -1.0,
        }
    }
}

impl EditTool for ZoomTool {
    fn name(&self) -> ToolName {
        ToolName::Zoom
    }

    fn on_event(&mut self, event: &RawPointerEvent, ctx: &mut ToolCtx<'_>) {
        match event {
            RawPointerEvent::Down(_) => {
                self.anchor = ctx.pointer.mouse_pos;
                self.dragged = false;
            }
            RawPointerEvent::Move(_) => {
                if !ctx.pointer.is_dragging {
                    return;
                }
                let delta = ctx.pointer.drag_delta_px();
                if delta.x == 0.0 && delta.y == 0.0 {
                    return;
                }
                self.dragged = true;
                if let Some(anchor) = self.anchor {
                    ctx.camera.zoom_anchored(delta.x * ZOOM_DRAG_SENSITIVITY, anchor);
                }
            }
            RawPointerEvent::Up => {
                if !self.dragged {
                    if let Some(anchor) = self.anchor.take() {
                        ctx.camera.zoom_anchored(self.step_sign() * ZOOM_STEP, anchor);
                    }
                }
                self.anchor = None;
                self.dragged = false;
            }
            RawPointerEvent::Leave => {
                self.anchor = None;
                self.dragged = false;
            }
        }
    }

    fn on_message(&mut self, message: &ToolMessage, _ctx: &mut ToolCtx<'_>) {
        if let ToolMessage::ZoomMode(mode) = message {
            self.mode = *mode;
        }
    }

    fn cursor(&self, _ctx: &ToolCtx<'_>) -> egui::CursorIcon {
        match self.mode {
            ZoomMode::In => egui::CursorIcon::ZoomIn,
            ZoomMode::Out => egui::CursorIcon::ZoomOut,
        }
    }
}
