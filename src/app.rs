use eframe::egui;
use egui::{Color32, ColorImage, Pos2, Rect, TextureFilter, TextureOptions, Vec2};
use std::path::PathBuf;
use uuid::Uuid;

use crate::clipboard;
use crate::context::EditContext;
use crate::events::RawPointerEvent;
use crate::geometry::{ruler_tick_spacing, Point};
use crate::io;
use crate::project::{Document, DocumentManager};
use crate::surface::Rgba8;
use crate::tools::{PenStyle, ToolMessage, ToolName, ZoomMode};
use crate::{log_err, log_info};

/// Width/height of the ruler strips along the canvas edges, in points.
const RULER_SIZE: f32 = 30.0;

pub struct InkmarkApp {
    documents: DocumentManager,

    /// Canvas-scoped view state: the camera and the active tool. There is one
    /// canvas, so switching documents re-points this context rather than
    /// swapping it out; the camera stays where the user left it.
    context: EditContext,

    /// The document the context was last pointed at. Compared against the
    /// active id each frame to detect switches.
    bound_document: Option<Uuid>,

    /// GPU texture holding the active document's composed frame.
    canvas_texture: Option<egui::TextureHandle>,

    /// Composite color under the cursor, captured during the canvas pass and
    /// shown in the info bar on the next frame.
    hover_info: Option<(Point, Rgba8)>,

    /// Last error surfaced to the user, shown in the info bar.
    status_error: Option<String>,

    /// Toolbar-owned tool settings, handed to tools on activation.
    pen_style: PenStyle,
    zoom_mode: ZoomMode,
}

impl InkmarkApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            documents: DocumentManager::default(),
            context: EditContext::default(),
            bound_document: None,
            canvas_texture: None,
            hover_info: None,
            status_error: None,
            pen_style: PenStyle::default(),
            zoom_mode: ZoomMode::In,
        }
    }

    fn report_err(&mut self, msg: String) {
        log_err!("{}", msg);
        self.status_error = Some(msg);
    }

    /// Re-point the canvas context whenever the active document changed. The
    /// outgoing document's tool is finished against its own session first, so
    /// a crop in progress restores its snapshot into the document it belongs
    /// to, never the incoming one. Once no document remains the context is
    /// unbound and the next document gets centered afresh.
    fn sync_active_document(&mut self) {
        let active = self.documents.active_id();
        if active == self.bound_document {
            return;
        }
        let previous = self.bound_document.and_then(|id| self.documents.get_mut(id));
        self.context.reset_to_pan(previous.map(|d| &mut d.session));
        if active.is_none() {
            self.context.unbind();
        }
        self.bound_document = active;
    }

    // ------------------------------------------------------------------------
    // File operations
    // ------------------------------------------------------------------------

    fn open_path(&mut self, path: PathBuf) {
        match io::load_session_or_image(&path) {
            Ok(session) => {
                log_info!(
                    "Opened {} ({}x{})",
                    path.display(),
                    session.image_width(),
                    session.image_height()
                );
                self.documents.add(Document::from_file(path, session));
                self.status_error = None;
            }
            Err(e) => self.report_err(e),
        }
    }

    fn handle_open(&mut self) {
        if let Some(path) = io::pick_open_path() {
            self.open_path(path);
        }
    }

    /// Paste a clipboard image as a fresh untitled document.
    fn handle_paste(&mut self) {
        let result = clipboard::paste_from_system_clipboard().and_then(|img| {
            let mut session = crate::session::EditSession::default();
            session.init(img)?;
            Ok(session)
        });
        match result {
            Ok(session) => {
                let n = self.documents.next_untitled();
                log_info!(
                    "Pasted a {}x{} clipboard image as Untitled-{}",
                    session.image_width(),
                    session.image_height(),
                    n
                );
                self.documents.add(Document::new_untitled(n, session));
                self.status_error = None;
            }
            Err(e) => self.report_err(e),
        }
    }

    fn handle_save_session(&mut self) {
        let result = {
            let Some(doc) = self.documents.active_mut() else {
                return;
            };
            let existing = doc
                .path
                .as_ref()
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(io::SESSION_EXTENSION))
                .cloned();
            let suggested = format!("{}.json", doc.name);
            let Some(path) = existing.or_else(|| io::pick_session_path(&suggested)) else {
                return;
            };
            io::save_session(&doc.session, &path).map(|()| {
                doc.path = Some(path);
                doc.update_name_from_path();
                doc.mark_saved();
                log_info!("Saved session '{}'", doc.name);
            })
        };
        if let Err(e) = result {
            self.report_err(e);
        }
    }

    fn handle_export(&mut self) {
        let result = {
            let Some(doc) = self.documents.active() else {
                return;
            };
            let stem = doc
                .path
                .as_ref()
                .and_then(|p| p.file_stem())
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| doc.name.clone());
            let Some(path) = io::pick_export_path(&format!("{}.png", stem)) else {
                return;
            };
            let flat = io::flatten(&doc.session);
            io::export_image(&flat, &path).map(|()| {
                log_info!("Exported {}", path.display());
            })
        };
        if let Err(e) = result {
            self.report_err(e);
        }
    }

    // ------------------------------------------------------------------------
    // Keyboard shortcuts
    // ------------------------------------------------------------------------

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (ctrl, shift) = ctx.input(|i| (i.modifiers.command, i.modifiers.shift));

        if ctrl && ctx.input(|i| i.key_pressed(egui::Key::O)) {
            self.handle_open();
        }
        if ctrl && ctx.input(|i| i.key_pressed(egui::Key::S)) {
            self.handle_save_session();
        }
        if ctrl && ctx.input(|i| i.key_pressed(egui::Key::E)) {
            self.handle_export();
        }
        if ctrl && ctx.input(|i| i.key_pressed(egui::Key::V)) {
            self.handle_paste();
        }

        let Some(doc) = self.documents.active_mut() else {
            return;
        };
        let session = &mut doc.session;

        // Undo/redo are commands, not tools: they act regardless of which
        // tool is active.
        if ctrl && ctx.input(|i| i.key_pressed(egui::Key::Z)) {
            if shift {
                session.redo();
            } else {
                session.undo();
            }
        }
        if ctrl && ctx.input(|i| i.key_pressed(egui::Key::Y)) {
            session.redo();
        }
        if ctrl && ctx.input(|i| i.key_pressed(egui::Key::C)) {
            self.context
                .message_tool(&ToolMessage::SelectCopy, Some(&mut *session));
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.context.reset_to_pan(Some(&mut *session));
        }

        let tool_keys = [
            (egui::Key::Num1, ToolName::Pan),
            (egui::Key::Num2, ToolName::Zoom),
            (egui::Key::Num3, ToolName::Crop),
            (egui::Key::Num4, ToolName::Pen),
            (egui::Key::Num5, ToolName::Select),
        ];
        for (key, name) in tool_keys {
            if ctrl && ctx.input(|i| i.key_pressed(key)) {
                self.context.select_tool(name, Some(&mut *session));
            }
        }
    }

    // ------------------------------------------------------------------------
    // Chrome
    // ------------------------------------------------------------------------

    fn show_menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open…").clicked() {
                        ui.close_menu();
                        self.handle_open();
                    }
                    if ui.button("Save Session").clicked() {
                        ui.close_menu();
                        self.handle_save_session();
                    }
                    if ui.button("Export Image…").clicked() {
                        ui.close_menu();
                        self.handle_export();
                    }
                    ui.separator();
                    if ui.button("Close Document").clicked() {
                        ui.close_menu();
                        if let Some(id) = self.documents.active_id() {
                            self.documents.remove(id);
                        }
                    }
                });
                ui.menu_button("Edit", |ui| {
                    let has_doc = self.documents.active().is_some();
                    if ui.add_enabled(has_doc, egui::Button::new("Undo")).clicked() {
                        ui.close_menu();
                        if let Some(doc) = self.documents.active_mut() {
                            doc.session.undo();
                        }
                    }
                    if ui.add_enabled(has_doc, egui::Button::new("Redo")).clicked() {
                        ui.close_menu();
                        if let Some(doc) = self.documents.active_mut() {
                            doc.session.redo();
                        }
                    }
                    if ui
                        .add_enabled(has_doc, egui::Button::new("Copy Selection"))
                        .clicked()
                    {
                        ui.close_menu();
                        if let Some(doc) = self.documents.active_mut() {
                            self.context
                                .message_tool(&ToolMessage::SelectCopy, Some(&mut doc.session));
                        }
                    }
                    if ui.button("Paste as New Document").clicked() {
                        ui.close_menu();
                        self.handle_paste();
                    }
                });
            });
        });
    }

    fn show_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let active = self.context.active_tool_name();

                let mut clicked: Option<ToolName> = None;
                for name in ToolName::ALL {
                    if ui
                        .selectable_label(active == Some(name), name.label())
                        .clicked()
                    {
                        clicked = Some(name);
                    }
                }
                if let Some(name) = clicked {
                    self.context.config.pen_style = self.pen_style;
                    self.context.config.zoom_mode = Some(self.zoom_mode);
                    let session = self.documents.active_mut().map(|d| &mut d.session);
                    self.context.select_tool(name, session);
                }

                ui.separator();
                match active {
                    Some(ToolName::Zoom) => self.zoom_controls(ui),
                    Some(ToolName::Crop) => self.crop_controls(ui),
                    Some(ToolName::Pen) => self.pen_controls(ui),
                    Some(ToolName::Select) => self.select_controls(ui),
                    _ => {}
                }
            });
        });
    }

    fn zoom_controls(&mut self, ui: &mut egui::Ui) {
        let mut changed = false;
        if ui
            .selectable_label(self.zoom_mode == ZoomMode::In, "Zoom in")
            .clicked()
        {
            self.zoom_mode = ZoomMode::In;
            changed = true;
        }
        if ui
            .selectable_label(self.zoom_mode == ZoomMode::Out, "Zoom out")
            .clicked()
        {
            self.zoom_mode = ZoomMode::Out;
            changed = true;
        }
        if changed {
            let mode = self.zoom_mode;
            self.context.config.zoom_mode = Some(mode);
            let session = self.documents.active_mut().map(|d| &mut d.session);
            self.context
                .message_tool(&ToolMessage::ZoomMode(mode), session);
        }
    }

    fn crop_controls(&mut self, ui: &mut egui::Ui) {
        if ui.button("Accept").clicked() {
            if let Some(doc) = self.documents.active_mut() {
                let session = &mut doc.session;
                self.context
                    .message_tool(&ToolMessage::CropAccept, Some(&mut *session));
                self.context.reset_to_pan(Some(&mut *session));
            }
        }
        if ui.button("Cancel").clicked() {
            if let Some(doc) = self.documents.active_mut() {
                self.context.reset_to_pan(Some(&mut doc.session));
            }
        }
    }

    fn pen_controls(&mut self, ui: &mut egui::Ui) {
        let mut color: Color32 = self.pen_style.color.into();
        let mut width = self.pen_style.width as f32;
        let color_changed = ui.color_edit_button_srgba(&mut color).changed();
        let width_changed = ui
            .add(egui::Slider::new(&mut width, 1.0..=64.0).text("Width"))
            .changed();
        if color_changed || width_changed {
            self.pen_style = PenStyle {
                color: color.into(),
                width: width as f64,
            };
            let style = self.pen_style;
            self.context.config.pen_style = style;
            let session = self.documents.active_mut().map(|d| &mut d.session);
            self.context
                .message_tool(&ToolMessage::PenStyle(style), session);
        }
    }

    fn select_controls(&mut self, ui: &mut egui::Ui) {
        if ui.button("Copy").clicked() {
            if let Some(doc) = self.documents.active_mut() {
                self.context
                    .message_tool(&ToolMessage::SelectCopy, Some(&mut doc.session));
            }
        }
    }

    fn show_documents_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("documents_panel")
            .default_width(180.0)
            .show(ctx, |ui| {
                ui.heading("Documents");
                ui.separator();
                if self.documents.is_empty() {
                    ui.weak("No documents open");
                }
                let active = self.documents.active_id();
                let mut select = None;
                let mut close = None;
                for doc in self.documents.iter() {
                    ui.horizontal(|ui| {
                        if ui
                            .selectable_label(active == Some(doc.id), doc.display_title())
                            .clicked()
                        {
                            select = Some(doc.id);
                        }
                        if ui.small_button("x").clicked() {
                            close = Some(doc.id);
                        }
                    });
                }
                if let Some(id) = select {
                    self.documents.select(id);
                }
                if let Some(id) = close {
                    self.documents.remove(id);
                }
                ui.separator();
                if ui.button("Open…").clicked() {
                    self.handle_open();
                }
            });
    }

    fn show_history_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("history_panel")
            .default_width(160.0)
            .show(ctx, |ui| {
                ui.heading("History");
                ui.separator();
                let Some(doc) = self.documents.active_mut() else {
                    ui.label("No document");
                    return;
                };
                let undo_len = doc.session.undo_stack.len();
                let redo_len = doc.session.redo_stack.len();
                for action in &doc.session.undo_stack {
                    ui.label(action.label());
                }
                // Undone actions, most recently undone first.
                for action in doc.session.redo_stack.iter().rev() {
                    ui.weak(action.label());
                }
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.add_enabled(undo_len > 0, egui::Button::new("Undo")).clicked() {
                        doc.session.undo();
                    }
                    if ui.add_enabled(redo_len > 0, egui::Button::new("Redo")).clicked() {
                        doc.session.redo();
                    }
                });
            });
    }

    fn show_info_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("info_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some((pos, color)) = self.hover_info {
                    ui.monospace(format!("x: {:.0}  y: {:.0}", pos.x, pos.y));
                    ui.separator();
                    ui.monospace(format!(
                        "rgba({}, {}, {}, {})",
                        color.r, color.g, color.b, color.a
                    ));
                }
                if self.documents.active().is_some() {
                    ui.separator();
                    ui.monospace(format!("{:.0}%", self.context.camera.scale() * 100.0));
                }
                if let Some(err) = &self.status_error {
                    ui.separator();
                    ui.colored_label(Color32::LIGHT_RED, err);
                }
            });
        });
    }

    // ------------------------------------------------------------------------
    // Canvas
    // ------------------------------------------------------------------------

    /// Translate egui's pointer stream into canvas-relative events, in the
    /// order egui recorded them.
    fn gather_pointer_events(ctx: &egui::Context, canvas_rect: Rect) -> Vec<RawPointerEvent> {
        let mut out = Vec::new();
        let to_canvas = |pos: Pos2| {
            Point::new(
                (pos.x - canvas_rect.min.x) as f64,
                (pos.y - canvas_rect.min.y) as f64,
            )
        };
        ctx.input(|i| {
            for event in &i.events {
                match event {
                    egui::Event::PointerButton {
                        pos,
                        button: egui::PointerButton::Primary,
                        pressed,
                        ..
                    } => {
                        if *pressed {
                            if canvas_rect.contains(*pos) {
                                out.push(RawPointerEvent::Down(to_canvas(*pos)));
                            }
                        } else {
                            out.push(RawPointerEvent::Up);
                        }
                    }
                    egui::Event::PointerMoved(pos) => {
                        out.push(RawPointerEvent::Move(to_canvas(*pos)));
                    }
                    egui::Event::PointerGone => {
                        out.push(RawPointerEvent::Leave);
                    }
                    _ => {}
                }
            }
        });
        out
    }

    fn show_canvas(&mut self, ctx: &egui::Context) {
        let mut clipboard_image = None;
        let mut hover_info = None;

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::from_gray(24)))
            .show(ctx, |ui| {
                let full_rect = ui.available_rect_before_wrap();
                // Rulers occupy fixed strips along the top and left edges.
                let canvas_rect = Rect::from_min_max(
                    Pos2::new(full_rect.min.x + RULER_SIZE, full_rect.min.y + RULER_SIZE),
                    full_rect.max,
                );
                let _ = ui.allocate_rect(full_rect, egui::Sense::drag());

                let Some(doc) = self.documents.active_mut() else {
                    ui.painter().text(
                        full_rect.center(),
                        egui::Align2::CENTER_CENTER,
                        "Open an image to start editing",
                        egui::FontId::proportional(16.0),
                        Color32::GRAY,
                    );
                    return;
                };
                let session = &mut doc.session;
                let context = &mut self.context;

                context.frame_document((canvas_rect.width(), canvas_rect.height()), session);
                context.config.pen_style = self.pen_style;
                context.config.zoom_mode = Some(self.zoom_mode);
                context.ensure_tool(Some(&mut *session));

                for event in Self::gather_pointer_events(ctx, canvas_rect) {
                    context.handle_event(event, Some(&mut *session));
                }

                let vw = canvas_rect.width().max(1.0) as u32;
                let vh = canvas_rect.height().max(1.0) as u32;
                let screen = context.compose((vw, vh), session);

                let color_image = ColorImage::from_rgba_unmultiplied(
                    [screen.width() as usize, screen.height() as usize],
                    screen.data(),
                );
                let options = TextureOptions {
                    magnification: TextureFilter::Nearest,
                    minification: TextureFilter::Nearest,
                    ..Default::default()
                };
                match &mut self.canvas_texture {
                    Some(tex) => tex.set(color_image, options),
                    None => {
                        self.canvas_texture =
                            Some(ctx.load_texture("canvas", color_image, options));
                    }
                }
                if let Some(tex) = &self.canvas_texture {
                    ui.painter().image(
                        tex.id(),
                        canvas_rect,
                        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                        Color32::WHITE,
                    );
                }

                Self::draw_rulers(ui.painter(), full_rect, canvas_rect, context);

                hover_info = context.pixel_under_cursor(session);
                clipboard_image = context.take_clipboard_image(session);

                if canvas_rect.contains(ctx.input(|i| i.pointer.hover_pos()).unwrap_or(Pos2::ZERO))
                {
                    ctx.set_cursor_icon(context.cursor_icon(Some(&mut *session)));
                }

                // Tools animate between input events (drag previews), so keep
                // painting while a document is bound.
                ctx.request_repaint();
            });

        self.hover_info = hover_info;
        if let Some(img) = clipboard_image {
            if let Err(e) = clipboard::copy_to_system_clipboard(&img) {
                self.report_err(e);
            }
        }
    }

    /// Tick marks and labels along the top and left edges, spaced by the
    /// zoom-dependent tick table so labels never crowd.
    fn draw_rulers(
        painter: &egui::Painter,
        full_rect: Rect,
        canvas_rect: Rect,
        context: &EditContext,
    ) {
        let bg = Color32::from_gray(40);
        let fg = Color32::from_gray(160);
        painter.rect_filled(
            Rect::from_min_max(
                full_rect.min,
                Pos2::new(full_rect.max.x, full_rect.min.y + RULER_SIZE),
            ),
            0.0,
            bg,
        );
        painter.rect_filled(
            Rect::from_min_max(
                full_rect.min,
                Pos2::new(full_rect.min.x + RULER_SIZE, full_rect.max.y),
            ),
            0.0,
            bg,
        );

        let scale = context.camera.scale();
        let spacing = ruler_tick_spacing(scale);
        let step_px = spacing * scale;
        let font = egui::FontId::proportional(10.0);
        let label = |value: f64| {
            if spacing < 1.0 {
                format!("{:.2}", value)
            } else {
                format!("{}", value as i64)
            }
        };

        // Five minor ticks per labeled major tick.
        let minor = spacing / 5.0;

        // Horizontal ruler.
        let first = (-context.camera.translation.x / scale / minor).floor() as i64;
        let mut tick = first;
        loop {
            let value = tick as f64 * minor;
            let x = canvas_rect.min.x + (value * scale + context.camera.translation.x) as f32;
            if x > canvas_rect.max.x {
                break;
            }
            if x >= canvas_rect.min.x {
                let major = tick.rem_euclid(5) == 0;
                let len = if major { 8.0 } else { 4.0 };
                painter.line_segment(
                    [
                        Pos2::new(x, full_rect.min.y + RULER_SIZE - len),
                        Pos2::new(x, full_rect.min.y + RULER_SIZE),
                    ],
                    egui::Stroke::new(1.0, fg),
                );
                if major {
                    painter.text(
                        Pos2::new(x + 2.0, full_rect.min.y + 2.0),
                        egui::Align2::LEFT_TOP,
                        label(value),
                        font.clone(),
                        fg,
                    );
                }
            }
            tick += 1;
            if step_px <= 0.0 {
                break;
            }
        }

        // Vertical ruler.
        let first = (-context.camera.translation.y / scale / minor).floor() as i64;
        let mut tick = first;
        loop {
            let value = tick as f64 * minor;
            let y = canvas_rect.min.y + (value * scale + context.camera.translation.y) as f32;
            if y > canvas_rect.max.y {
                break;
            }
            if y >= canvas_rect.min.y {
                let major = tick.rem_euclid(5) == 0;
                let len = if major { 8.0 } else { 4.0 };
                painter.line_segment(
                    [
                        Pos2::new(full_rect.min.x + RULER_SIZE - len, y),
                        Pos2::new(full_rect.min.x + RULER_SIZE, y),
                    ],
                    egui::Stroke::new(1.0, fg),
                );
                if major {
                    painter.text(
                        Pos2::new(full_rect.min.x + 2.0, y + 2.0),
                        egui::Align2::LEFT_TOP,
                        label(value),
                        font.clone(),
                        fg,
                    );
                }
            }
            tick += 1;
            if step_px <= 0.0 {
                break;
            }
        }

        // Corner square covers where the two strips overlap.
        painter.rect_filled(
            Rect::from_min_size(full_rect.min, Vec2::splat(RULER_SIZE)),
            0.0,
            bg,
        );
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<egui::DroppedFile> = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            if let Some(path) = file.path {
                self.open_path(path);
            }
        }
    }
}


impl eframe::App for InkmarkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);
        self.sync_active_document();
        self.handle_shortcuts(ctx);
        self.show_menu_bar(ctx);
        self.show_toolbar(ctx);
        self.show_documents_panel(ctx);
        self.show_history_panel(ctx);
        self.show_info_bar(ctx);
        // The panels above may have switched or closed documents; re-point
        // before dispatching canvas input.
        self.sync_active_document();
        self.show_canvas(ctx);
    }
}
