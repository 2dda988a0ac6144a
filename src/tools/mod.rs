// ============================================================================
// TOOLS — pluggable interaction state machines
// ============================================================================
//
// Exactly one tool is active at a time. A tool struct is its scratch state:
// constructed fresh on activation, dropped on deactivation, so no stale
// in-progress state ever survives a tool switch.

pub mod crop;
pub mod pan;
pub mod pen;
pub mod select;
pub mod zoom;

use serde::{Deserialize, Serialize};

use crate::events::{PointerState, RawPointerEvent};
use crate::geometry::Camera;
use crate::session::{CropBox, EditSession};
use crate::surface::{Rgba8, Surface};

pub use crop::CropTool;
pub use pan::PanTool;
pub use pen::PenTool;
pub use select::SelectTool;
pub use zoom::ZoomTool;

// ============================================================================
// Shared types
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolName {
    Pan,
    Zoom,
    Crop,
    Pen,
    Select,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::Pan,
        ToolName::Zoom,
        ToolName::Crop,
        ToolName::Pen,
        ToolName::Select,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ToolName::Pan => "Pan",
            ToolName::Zoom => "Zoom",
            ToolName::Crop => "Crop",
            ToolName::Pen => "Pen",
            ToolName::Select => "Select",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoomMode {
    In,
    Out,
}

/// Messages the UI chrome sends to the active tool. A tool ignores any
/// message it does not understand.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolMessage {
    ZoomMode(ZoomMode),
    CropAccept,
    PenStyle(PenStyle),
    SelectCopy,
}

/// Pen appearance, owned by the toolbar and handed to the pen on activation
/// and on change.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PenStyle {
    pub color: Rgba8,
    pub width: f64,
}

impl Default for PenStyle {
    fn default() -> Self {
        Self {
            color: Rgba8::rgb(255, 0, 0),
            width: 5.0,
        }
    }
}

/// Settings snapshot handed to [`make_tool`] at activation time.
#[derive(Clone, Copy, Debug, Default)]
pub struct ToolConfig {
    pub pen_style: PenStyle,
    pub zoom_mode: Option<ZoomMode>,
}

impl Default for ZoomMode {
    fn default() -> Self {
        ZoomMode::In
    }
}

/// Everything a tool may touch while handling an event or message. The
/// session is `None` until a document is open; tools that edit must tolerate
/// that.
pub struct ToolCtx<'a> {
    pub camera: &'a mut Camera,
    pub session: Option<&'a mut EditSession>,
    pub pointer: &'a PointerState,
    /// Set by the select tool to request a clipboard copy of this
    /// original-space region; the app extracts it from the composite and
    /// drains it after dispatch.
    pub clipboard_request: &'a mut Option<CropBox>,
}

// ============================================================================
// The tool contract
// ============================================================================

/// The four-phase tool lifecycle plus the pointer stream.
///
/// `activate` runs once right after construction and may mutate the session
/// (crop expands the crop box to the full image). `deactivate` runs exactly
/// once before the tool is dropped and must leave the session in a committed
/// state (crop restores its snapshot if the user never accepted).
pub trait EditTool {
    fn name(&self) -> ToolName;

    fn activate(&mut self, _ctx: &mut ToolCtx<'_>) {}

    fn on_event(&mut self, _event: &RawPointerEvent, _ctx: &mut ToolCtx<'_>) {}

    /// Paint the tool's transient overlay onto the cropped composite. Runs
    /// every frame between replay and the view blit; must not mutate the
    /// session.
    fn draw(&self, _session: &EditSession, _target: &mut Surface) {}

    fn on_message(&mut self, _message: &ToolMessage, _ctx: &mut ToolCtx<'_>) {}

    fn deactivate(&mut self, _ctx: &mut ToolCtx<'_>) {}

    /// Cursor to show while this tool is active over the canvas.
    fn cursor(&self, _ctx: &ToolCtx<'_>) -> egui::CursorIcon {
        egui::CursorIcon::Default
    }
}

/// Construct a fresh tool by name. The caller invokes `activate` afterwards.
pub fn make_tool(name: ToolName, config: &ToolConfig) -> Box<dyn EditTool> {
    match name {
        ToolName::Pan => Box::new(PanTool::default()),
        ToolName::Zoom => Box::new(ZoomTool::new(config.zoom_mode.unwrap_or_default())),
        ToolName::Crop => Box::new(CropTool::default()),
        ToolName::Pen => Box::new(PenTool::new(config.pen_style)),
        ToolName::Select => Box::new(SelectTool::default()),
    }
}
