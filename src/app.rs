use std::path::PathBuf;
use std::time::Duration;

use eframe::egui;
use egui_commonmark::{CommonMarkCache, CommonMarkViewer};
use serde::{Deserialize, Serialize};

use crate::loader::{initial_file, pick_markdown_file, FileLoader};
use crate::navigation::{NavigationController, ScrollBehavior};
use crate::outline::{OutlineEntry, OutlinePanel};
use crate::render::RenderedDocument;
use crate::session::DocumentSession;
use crate::watcher::FileWatcher;

const APP_KEY: &str = "md-outline-viewer-state";
const APP_TITLE: &str = "Markdown Viewer";
const MAX_TITLE_CHARS: usize = 40;
const MIN_ZOOM: f32 = 0.5;
const MAX_ZOOM: f32 = 3.0;

/// Preferences saved between sessions. Outline visibility is deliberately absent.
#[derive(Serialize, Deserialize, Default)]
struct PersistedState {
    dark_mode: Option<bool>,
    zoom_level: Option<f32>,
}

/// Sidebar label for an outline entry, shortened to a fixed number of characters.
fn display_title(text: &str) -> String {
    if text.is_empty() {
        return "(untitled)".to_string();
    }
    if text.chars().count() > MAX_TITLE_CHARS {
        let head: String = text.chars().take(MAX_TITLE_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn window_title(file_name: Option<&str>) -> String {
    match file_name {
        Some(name) => format!("{} - {}", name, APP_TITLE),
        None => APP_TITLE.to_string(),
    }
}

/// Anchor of a fragment link clicked in the section just shown. Hooks are
/// reset by every `show`, so this must run after each section.
fn clicked_anchor_link(cache: &CommonMarkCache, links: &[String]) -> Option<String> {
    links
        .iter()
        .find(|link| cache.get_link_hook(link) == Some(true))
        .map(|link| link.trim_start_matches('#').to_string())
}

fn content_viewer<'f>() -> CommonMarkViewer<'f> {
    CommonMarkViewer::new()
        .max_image_width(Some(800))
        .indentation_spaces(2)
        .show_alt_text_on_hover(true)
        .syntax_theme_dark("base16-ocean.dark")
        .syntax_theme_light("base16-ocean.light")
}

pub struct ViewerApp {
    session: DocumentSession,
    loader: FileLoader,
    navigation: NavigationController,
    outline_panel: OutlinePanel,
    watcher: FileWatcher,
    cache: CommonMarkCache,
    anchor_links: Vec<String>,
    rendered_revision: u64,
    rendered_source: Option<PathBuf>,
    dark_mode: bool,
    zoom_level: f32,
}

impl ViewerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, file: Option<PathBuf>, watch: bool) -> Self {
        let persisted: PersistedState = cc
            .storage
            .and_then(|s| eframe::get_value(s, APP_KEY))
            .unwrap_or_default();

        let dark_mode = persisted
            .dark_mode
            .unwrap_or_else(|| cc.egui_ctx.style().visuals.dark_mode);
        let zoom_level = persisted.zoom_level.unwrap_or(1.0).clamp(MIN_ZOOM, MAX_ZOOM);

        let mut app = Self {
            session: DocumentSession::default(),
            loader: FileLoader::default(),
            navigation: NavigationController::default(),
            outline_panel: OutlinePanel::default(),
            watcher: FileWatcher::new(watch),
            cache: CommonMarkCache::default(),
            anchor_links: Vec::new(),
            rendered_revision: 0,
            rendered_source: None,
            dark_mode,
            zoom_level,
        };

        if let Some(path) = file {
            match initial_file(path) {
                Ok(path) => app.loader.request(path),
                Err(e) => log::warn!("Not opening startup file: {}", e),
            }
        }

        app
    }

    fn open_file_dialog(&mut self) {
        if let Some(path) = pick_markdown_file() {
            self.loader.request(path);
        }
    }

    /// Fold finished loads into the session and rebuild the view once per new revision.
    fn sync_document(&mut self) {
        for outcome in self.loader.poll() {
            self.session.apply(outcome);
        }

        if let Some(path) = self.watcher.poll() {
            log::info!("Reloading file: {:?}", path);
            self.loader.request(path);
        }

        if self.session.revision() == self.rendered_revision {
            return;
        }
        self.rendered_revision = self.session.revision();

        let text = self.session.raw_text().unwrap_or_default();
        let rendered = RenderedDocument::parse(text);
        log::debug!(
            "Rendered {} sections, {} anchored",
            rendered.sections().len(),
            rendered.anchor_ids().count()
        );
        self.anchor_links = rendered.fragment_links().to_vec();
        self.navigation.set_document(rendered);

        self.cache = CommonMarkCache::default();
        for link in &self.anchor_links {
            self.cache.add_link_hook(link);
        }

        // An error page has nothing on disk worth watching.
        match self.session.source() {
            Some(path) if !self.session.load_failed() => self.watcher.follow(path),
            _ => self.watcher.unfollow(),
        }

        let source = self.session.source().map(PathBuf::from);
        if source != self.rendered_source {
            self.navigation.reset_to_top();
            self.rendered_source = source;
        }
    }

    fn adjust_zoom(&mut self, delta: f32) {
        self.zoom_level = (self.zoom_level + delta).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    fn toggle_watch(&mut self) {
        if self.session.source().is_some() {
            let enable = !self.watcher.is_enabled();
            self.watcher.set_enabled(enable);
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let mut open_dialog = false;
        let mut toggle_watch = false;
        let mut toggle_dark = false;
        let mut toggle_outline = false;
        let mut quit_app = false;
        let mut zoom_delta: f32 = 0.0;

        ctx.input(|i| {
            if i.modifiers.ctrl && !i.modifiers.shift && i.key_pressed(egui::Key::O) {
                open_dialog = true;
            }
            if i.modifiers.ctrl && i.modifiers.shift && i.key_pressed(egui::Key::O) {
                toggle_outline = true;
            }
            if i.modifiers.ctrl && i.key_pressed(egui::Key::W) {
                toggle_watch = true;
            }
            if i.modifiers.ctrl && i.key_pressed(egui::Key::D) {
                toggle_dark = true;
            }
            if i.modifiers.ctrl && i.key_pressed(egui::Key::Q) {
                quit_app = true;
            }
            if i.modifiers.ctrl && (i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals)) {
                zoom_delta = 0.1;
            }
            if i.modifiers.ctrl && i.key_pressed(egui::Key::Minus) {
                zoom_delta = -0.1;
            }
            if i.modifiers.ctrl && i.key_pressed(egui::Key::Num0) {
                zoom_delta = 1.0 - self.zoom_level;
            }
        });

        if zoom_delta != 0.0 {
            self.adjust_zoom(zoom_delta);
        }
        if open_dialog {
            self.open_file_dialog();
        }
        if toggle_watch {
            self.toggle_watch();
        }
        if toggle_dark {
            self.dark_mode = !self.dark_mode;
        }
        if toggle_outline && OutlinePanel::toggle_available(self.session.outline()) {
            self.outline_panel.toggle();
        }
        if quit_app {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.add(egui::Button::new("Open...").shortcut_text("Ctrl+O")).clicked() {
                        self.open_file_dialog();
                        ui.close();
                    }

                    ui.separator();

                    let watch_text = if self.watcher.is_enabled() { "✓ Watch File" } else { "Watch File" };
                    let can_watch = self.session.source().is_some();
                    if ui
                        .add_enabled(can_watch, egui::Button::new(watch_text).shortcut_text("Ctrl+W"))
                        .clicked()
                    {
                        self.toggle_watch();
                        ui.close();
                    }

                    ui.separator();

                    if ui.add(egui::Button::new("Quit").shortcut_text("Ctrl+Q")).clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        ui.close();
                    }
                });

                ui.menu_button("View", |ui| {
                    let theme_text = if self.dark_mode { "☀ Light Mode" } else { "🌙 Dark Mode" };
                    if ui.add(egui::Button::new(theme_text).shortcut_text("Ctrl+D")).clicked() {
                        self.dark_mode = !self.dark_mode;
                        ui.close();
                    }

                    if OutlinePanel::toggle_available(self.session.outline()) {
                        let outline_text =
                            if self.outline_panel.is_open() { "✓ Show Contents" } else { "Show Contents" };
                        if ui
                            .add(egui::Button::new(outline_text).shortcut_text("Ctrl+Shift+O"))
                            .clicked()
                        {
                            self.outline_panel.toggle();
                            ui.close();
                        }
                    }

                    ui.separator();

                    if ui.add(egui::Button::new("Zoom In").shortcut_text("Ctrl++")).clicked() {
                        self.adjust_zoom(0.1);
                        ui.close();
                    }
                    if ui.add(egui::Button::new("Zoom Out").shortcut_text("Ctrl+-")).clicked() {
                        self.adjust_zoom(-0.1);
                        ui.close();
                    }
                    if ui.add(egui::Button::new("Reset Zoom").shortcut_text("Ctrl+0")).clicked() {
                        self.zoom_level = 1.0;
                        ui.close();
                    }
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if (self.zoom_level - 1.0).abs() > 0.01 {
                        ui.label(
                            egui::RichText::new(format!("{}%", (self.zoom_level * 100.0).round() as i32))
                                .small()
                                .color(ui.visuals().weak_text_color()),
                        );
                        ui.separator();
                    }

                    if self.watcher.is_active() {
                        ui.label(egui::RichText::new("● LIVE").color(egui::Color32::from_rgb(100, 200, 100)));
                        ui.separator();
                    }

                    if let Some(name) = self.session.file_name() {
                        ui.label(egui::RichText::new(name).color(ui.visuals().weak_text_color()));
                    }
                });
            });
        });
    }

    /// Returns the anchor of the entry clicked this frame.
    fn outline_sidebar(&self, ctx: &egui::Context) -> Option<String> {
        let entries: &[OutlineEntry] = self.session.outline();
        if !self.outline_panel.is_visible(entries) {
            return None;
        }

        // Ignore clicks while a pointer is held, e.g. when resizing the panel.
        let pointer_down = ctx.input(|i| i.pointer.any_down());
        let mut clicked = None;

        egui::SidePanel::left("outline")
            .resizable(true)
            .default_width(200.0)
            .min_width(120.0)
            .max_width(400.0)
            .show(ctx, |ui| {
                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    ui.add_space(6.0);
                    ui.heading("Contents");
                });
                ui.separator();
                egui::ScrollArea::vertical()
                    .id_salt("outline_scroll")
                    .show(ui, |ui| {
                        for entry in entries {
                            ui.horizontal(|ui| {
                                ui.add_space(entry.indent());
                                let response = ui
                                    .selectable_label(false, display_title(&entry.text))
                                    .on_hover_text(entry.text.as_str());
                                if !pointer_down && response.clicked() {
                                    clicked = Some(entry.anchor_id.clone());
                                }
                            });
                        }
                    });
            });

        clicked
    }

    fn empty_state(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() / 3.0);
            ui.heading(APP_TITLE);
            ui.label("Open a Markdown file to view its contents");
            ui.add_space(8.0);
            if ui.button("Open Markdown File").clicked() {
                self.open_file_dialog();
            }
            ui.add_space(8.0);
            ui.label(
                egui::RichText::new("You can also pass a .md file on the command line")
                    .small()
                    .color(ui.visuals().weak_text_color()),
            );
        });
    }

    /// Returns the anchor of an in-document link clicked this frame.
    fn content_panel(&mut self, ctx: &egui::Context) -> Option<String> {
        let mut clicked = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            if !self.session.is_loaded() {
                self.empty_state(ui);
                return;
            }

            let request = self.navigation.take_scroll_request();
            let document = self.navigation.document();
            let links = &self.anchor_links;
            let cache = &mut self.cache;

            egui::ScrollArea::vertical()
                .id_salt("content_scroll")
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for index in 0..document.sections().len() {
                        let shown = ui.push_id(index, |ui| {
                            content_viewer().show(ui, cache, document.section_text(index));
                        });
                        if clicked.is_none() {
                            clicked = clicked_anchor_link(cache, links);
                        }

                        let Some(request) = &request else { continue };
                        if request.section != index {
                            continue;
                        }
                        let rect = shown.response.rect;
                        match request.behavior {
                            ScrollBehavior::Smooth => ui.scroll_to_rect(rect, Some(egui::Align::TOP)),
                            ScrollBehavior::Instant => ui.scroll_to_rect_animation(
                                rect,
                                Some(egui::Align::TOP),
                                egui::style::ScrollAnimation::none(),
                            ),
                        }
                    }
                });
        });
        clicked
    }
}

impl eframe::App for ViewerApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let state = PersistedState {
            dark_mode: Some(self.dark_mode),
            zoom_level: Some(self.zoom_level),
        };
        eframe::set_value(storage, APP_KEY, &state);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_document();

        if self.loader.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(50));
        } else if self.watcher.is_active() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        ctx.set_visuals(if self.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });
        ctx.set_zoom_factor(self.zoom_level);
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(window_title(
            self.session.file_name().as_deref(),
        )));

        self.handle_shortcuts(ctx);
        self.menu_bar(ctx);

        if let Some(anchor) = self.outline_sidebar(ctx) {
            self.navigation.navigate_to(&anchor);
        }

        if let Some(anchor) = self.content_panel(ctx) {
            self.navigation.navigate_to(&anchor);
            ctx.request_repaint();
        }
    }
}
