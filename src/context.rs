// ============================================================================
// EDIT CONTEXT — per-document view state and tool dispatch
// ============================================================================
//
// Owns the camera, the pointer state, and the single active tool. Every
// pointer event updates the pointer state first, then reaches the tool, so a
// tool always observes current positions. The per-frame `compose` replays
// the session onto a CPU composite, lets the tool paint its overlay, and
// blits the cropped view through the camera transform.

use crate::events::{PointerState, RawPointerEvent};
use crate::geometry::{Camera, Point};
use crate::session::{CropBox, EditSession};
use crate::surface::{Rgba8, Surface};
use crate::tools::{make_tool, EditTool, ToolConfig, ToolCtx, ToolMessage, ToolName};

pub struct EditContext {
    pub camera: Camera,
    pub pointer: PointerState,
    pub config: ToolConfig,
    tool: Option<Box<dyn EditTool>>,
    /// Full-image replay target, reused across frames.
    composite: Surface,
    /// Viewport-sized output of the view blit.
    screen: Surface,
    /// True once a document has been framed; stays set across document
    /// switches so the camera survives re-pointing.
    centered: bool,
    clipboard_request: Option<CropBox>,
}

impl Default for EditContext {
    fn default() -> Self {
        Self {
            camera: Camera::default(),
            pointer: PointerState::default(),
            config: ToolConfig::default(),
            tool: None,
            composite: Surface::new(1, 1),
            screen: Surface::new(1, 1),
            centered: false,
            clipboard_request: None,
        }
    }
}

impl EditContext {
    pub fn active_tool_name(&self) -> Option<ToolName> {
        self.tool.as_ref().map(|t| t.name())
    }

    /// Center the bound image in the viewport. Runs once: re-pointing the
    /// context at another document keeps the camera where the user left it.
    pub fn frame_document(&mut self, viewport: (f32, f32), session: &EditSession) {
        if self.centered || !session.is_initialized() {
            return;
        }
        self.camera.translation = Point::new(
            viewport.0 as f64 / 2.0 - session.image_width() as f64 / 2.0,
            viewport.1 as f64 / 2.0 - session.image_height() as f64 / 2.0,
        );
        self.centered = true;
    }

    /// Forget the document binding. The next document framed after this gets
    /// centered again (nothing was on the canvas in between).
    pub fn unbind(&mut self) {
        self.centered = false;
    }

    /// Activate `name`, deactivating the current tool first. Selecting the
    /// already active tool toggles back to Pan; Pan itself cannot be toggled
    /// off.
    pub fn select_tool(&mut self, name: ToolName, session: Option<&mut EditSession>) {
        let target = if self.active_tool_name() == Some(name) && name != ToolName::Pan {
            ToolName::Pan
        } else {
            name
        };
        self.set_tool(target, session);
    }

    fn set_tool(&mut self, name: ToolName, mut session: Option<&mut EditSession>) {
        if let Some(mut old) = self.tool.take() {
            let mut ctx = ToolCtx {
                camera: &mut self.camera,
                session: session.as_deref_mut(),
                pointer: &self.pointer,
                clipboard_request: &mut self.clipboard_request,
            };
            old.deactivate(&mut ctx);
        }
        let mut tool = make_tool(name, &self.config);
        let mut ctx = ToolCtx {
            camera: &mut self.camera,
            session: session.as_deref_mut(),
            pointer: &self.pointer,
            clipboard_request: &mut self.clipboard_request,
        };
        tool.activate(&mut ctx);
        self.tool = Some(tool);
    }

    /// Ensure some tool is active; used when a document is first opened.
    pub fn ensure_tool(&mut self, session: Option<&mut EditSession>) {
        if self.tool.is_none() {
            self.set_tool(ToolName::Pan, session);
        }
    }

    /// Deactivate whatever tool is active and fall back to Pan.
    pub fn reset_to_pan(&mut self, session: Option<&mut EditSession>) {
        self.set_tool(ToolName::Pan, session);
    }

    pub fn message_tool(&mut self, message: &ToolMessage, mut session: Option<&mut EditSession>) {
        if let Some(mut tool) = self.tool.take() {
            let mut ctx = ToolCtx {
                camera: &mut self.camera,
                session: session.as_deref_mut(),
                pointer: &self.pointer,
                clipboard_request: &mut self.clipboard_request,
            };
            tool.on_message(message, &mut ctx);
            self.tool = Some(tool);
        }
    }

    /// Fold one pointer event: update the shared pointer state, then forward
    /// to the active tool.
    pub fn handle_event(&mut self, event: RawPointerEvent, mut session: Option<&mut EditSession>) {
        self.pointer.apply(&event, &self.camera);
        if let Some(mut tool) = self.tool.take() {
            let mut ctx = ToolCtx {
                camera: &mut self.camera,
                session: session.as_deref_mut(),
                pointer: &self.pointer,
                clipboard_request: &mut self.clipboard_request,
            };
            tool.on_event(&event, &mut ctx);
            self.tool = Some(tool);
        }
    }

    /// A select-tool copy request published during dispatch, rasterized from
    /// a fresh replay. The per-frame composite carries the tool overlay, so
    /// the copy replays the session into a scratch surface instead; copied
    /// pixels never contain selection chrome.
    pub fn take_clipboard_image(&mut self, session: &EditSession) -> Option<image::RgbaImage> {
        let region = self.clipboard_request.take()?;
        let mut scratch = Surface::new(1, 1);
        session.draw_to_canvas(&mut scratch);
        Some(scratch.extract_region(
            region.x.max(0.0) as u32,
            region.y.max(0.0) as u32,
            region.width.round().max(1.0) as u32,
            region.height.round().max(1.0) as u32,
        ))
    }

    /// Render one frame into the screen buffer: replay the session, let the
    /// tool overlay, then blit the crop-box view through the camera.
    pub fn compose(&mut self, viewport: (u32, u32), session: &EditSession) -> &Surface {
        session.draw_to_canvas(&mut self.composite);
        if let Some(tool) = &self.tool {
            tool.draw(session, &mut self.composite);
        }
        self.screen.resize(viewport.0, viewport.1);
        self.screen.clear();
        self.screen.blit_cropped_transformed(
            &self.composite,
            &session.crop_box,
            self.camera.translation,
            self.camera.scale(),
        );
        &self.screen
    }

    /// Composite color under the pointer, for the info bar.
    pub fn pixel_under_cursor(&self, session: &EditSession) -> Option<(Point, Rgba8)> {
        let pos = self.pointer.mouse_pos?;
        let orig = session.to_original_pos(pos);
        if orig.x < 0.0
            || orig.y < 0.0
            || orig.x >= session.image_width() as f64
            || orig.y >= session.image_height() as f64
        {
            return None;
        }
        Some((orig, self.composite.pixel(orig.x as u32, orig.y as u32)))
    }

    pub fn cursor_icon(&mut self, mut session: Option<&mut EditSession>) -> egui::CursorIcon {
        match &self.tool {
            Some(tool) => {
                let ctx = ToolCtx {
                    camera: &mut self.camera,
                    session: session.as_deref_mut(),
                    pointer: &self.pointer,
                    clipboard_request: &mut self.clipboard_request,
                };
                tool.cursor(&ctx)
            }
            None => egui::CursorIcon::Default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn session_100x100() -> EditSession {
        let mut s = EditSession::default();
        s.init(RgbaImage::from_pixel(100, 100, image::Rgba([1, 2, 3, 255])))
            .unwrap();
        s
    }

    #[test]
    fn toggle_active_tool_falls_back_to_pan() {
        let mut ctx = EditContext::default();
        let mut session = session_100x100();
        ctx.select_tool(ToolName::Pen, Some(&mut session));
        assert_eq!(ctx.active_tool_name(), Some(ToolName::Pen));
        ctx.select_tool(ToolName::Pen, Some(&mut session));
        assert_eq!(ctx.active_tool_name(), Some(ToolName::Pan));
    }

    #[test]
    fn pan_cannot_be_toggled_off() {
        let mut ctx = EditContext::default();
        let mut session = session_100x100();
        ctx.select_tool(ToolName::Pan, Some(&mut session));
        ctx.select_tool(ToolName::Pan, Some(&mut session));
        assert_eq!(ctx.active_tool_name(), Some(ToolName::Pan));
    }

    #[test]
    fn switching_away_from_crop_restores_the_box() {
        let mut ctx = EditContext::default();
        let mut session = session_100x100();
        let before = CropBox {
            x: 10.0,
            y: 10.0,
            width: 40.0,
            height: 40.0,
        };
        session.crop_box = before;
        ctx.select_tool(ToolName::Crop, Some(&mut session));
        assert_eq!(session.crop_box, CropBox::full(100, 100));
        ctx.select_tool(ToolName::Pen, Some(&mut session));
        assert_eq!(session.crop_box, before);
    }

    #[test]
    fn frame_document_centers_once() {
        let mut ctx = EditContext::default();
        let session = session_100x100();
        ctx.frame_document((300.0, 200.0), &session);
        assert_eq!(ctx.camera.translation, Point::new(100.0, 50.0));
        ctx.camera.translation = Point::new(0.0, 0.0);
        ctx.frame_document((300.0, 200.0), &session);
        assert_eq!(ctx.camera.translation, Point::new(0.0, 0.0));
    }

    #[test]
    fn compose_fills_the_viewport_with_the_cropped_view() {
        let mut ctx = EditContext::default();
        let mut session = session_100x100();
        ctx.ensure_tool(Some(&mut session));
        let screen = ctx.compose((50, 50), &session);
        assert_eq!((screen.width(), screen.height()), (50, 50));
        assert_eq!(screen.pixel(10, 10), Rgba8::rgb(1, 2, 3));
    }

    #[test]
    fn clipboard_copy_excludes_the_tool_overlay() {
        let mut ctx = EditContext::default();
        let mut session = session_100x100();
        ctx.select_tool(ToolName::Select, Some(&mut session));
        ctx.handle_event(RawPointerEvent::Down(Point::new(10.0, 10.0)), Some(&mut session));
        ctx.handle_event(RawPointerEvent::Move(Point::new(30.0, 30.0)), Some(&mut session));
        ctx.handle_event(RawPointerEvent::Up, Some(&mut session));
        // The composed frame bakes the dashed selection rectangle into the
        // composite; the copy must still see clean image pixels.
        ctx.compose((50, 50), &session);
        ctx.message_tool(&ToolMessage::SelectCopy, Some(&mut session));
        let img = ctx.take_clipboard_image(&session).unwrap();
        assert_eq!((img.width(), img.height()), (20, 20));
        for (x, y) in [(0, 0), (19, 0), (0, 19), (19, 19), (10, 10)] {
            assert_eq!(img.get_pixel(x, y).0, [1, 2, 3, 255], "at ({x}, {y})");
        }
    }

    #[test]
    fn camera_survives_re_pointing_until_unbound() {
        let mut ctx = EditContext::default();
        let first = session_100x100();
        ctx.frame_document((300.0, 200.0), &first);
        ctx.camera.translation = Point::new(-5.0, 7.0);

        let mut second = EditSession::default();
        second
            .init(RgbaImage::from_pixel(40, 40, image::Rgba([0, 0, 0, 255])))
            .unwrap();
        ctx.frame_document((300.0, 200.0), &second);
        assert_eq!(ctx.camera.translation, Point::new(-5.0, 7.0));

        // Once nothing is bound, the next document centers afresh.
        ctx.unbind();
        ctx.frame_document((300.0, 200.0), &second);
        assert_eq!(ctx.camera.translation, Point::new(130.0, 80.0));
    }
}
