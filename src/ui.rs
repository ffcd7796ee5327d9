use std::fmt::Write;
use std::path::PathBuf;
use std::time::Duration;

use eframe::egui;

use crate::{
    batch::Batch,
    components::{
        file_table::{file_table, RowAction},
        preview::{load_preview, preview_image},
        resize::resize_input,
    },
    file_list::{AddSummary, FileList},
    structs::{
        file_type::EncodingOptions,
        job::ConversionJob,
        settings::{ResizeOptions, Settings, Theme},
        update::{FailedFile, Outcome, Summary, Update},
    },
    types::{BatchState, Progress},
    util::files::{format_file_size, IMAGE_EXTENSIONS},
};

const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
const LOG_LENGTH: usize = 200;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(PartialEq, Clone, Copy)]
enum Page {
    Files,
    Encoding,
    Export,
    Resize,
    About,
}

enum Dialog {
    ConfirmClear,
    Preview {
        name: String,
        texture: egui::TextureHandle,
        info: String,
    },
    PreviewFailed {
        name: String,
        error: String,
    },
    Summary(Summary),
    Crashed(String),
}

pub struct App {
    settings: Settings,
    applied_theme: Option<Theme>,

    page: Page,
    files: FileList,

    // Communication
    batch: Option<Batch>,
    state: BatchState,
    progress: Progress,

    // Messages
    status: String,
    messages: Vec<String>,
    dialog: Option<Dialog>,
}

impl Default for App {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            applied_theme: None,

            page: Page::Files,
            files: FileList::default(),

            // Communication
            batch: None,
            state: BatchState::Idle,
            progress: Progress::default(),

            status: "Ready to convert images".to_string(),
            messages: Vec::new(),
            dialog: None,
        }
    }
}

impl App {
    fn is_running(&self) -> bool {
        self.state == BatchState::Running
    }

    fn add_files(&mut self, paths: Vec<PathBuf>) {
        if self.is_running() {
            return;
        }

        let summary = self.files.add_all(&paths);
        self.status = add_status(&summary, self.files.len());
        self.push_message(self.status.clone());
    }

    fn remove_file(&mut self, path: PathBuf) {
        if self.is_running() {
            return;
        }

        if self.files.remove(&path) {
            self.status = match self.files.len() {
                0 => "Ready to convert images".to_string(),
                n => format!("{} files ready for conversion", n),
            };
            self.progress = Progress::default();
        }
    }

    fn clear_files(&mut self, confirmed: bool) {
        if self.is_running() {
            return;
        }

        let removed = self.files.clear(confirmed);
        if removed > 0 {
            self.status = "Ready to convert images".to_string();
            self.progress = Progress::default();
            self.push_message(format!("Removed {} files from the list", removed));
        }
    }

    fn start_processing(&mut self) {
        if self.files.is_empty() {
            self.status = "Please select files to convert first.".to_string();
            return;
        }

        // The list is frozen for the whole run
        if matches!(self.dialog, Some(Dialog::ConfirmClear)) {
            self.dialog = None;
        }

        let jobs = ConversionJob::batch(self.files.list(), &self.settings);
        self.messages.clear();
        self.progress = Progress::new(jobs.len() as u32);
        self.state = BatchState::Running;
        self.batch = Some(Batch::start(jobs));
    }

    fn open_preview(&mut self, ctx: &egui::Context, path: PathBuf) {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.dialog = Some(match load_preview(&path) {
            Ok(preview) => Dialog::Preview {
                texture: ctx.load_texture(
                    format!("preview-{}", path.display()),
                    preview.image,
                    egui::TextureOptions::LINEAR,
                ),
                name,
                info: preview.info,
            },
            Err(e) => {
                log::warn!("Cannot preview '{}': {}", path.display(), e);
                Dialog::PreviewFailed {
                    name,
                    error: e.to_string(),
                }
            }
        });
    }

    fn stop_processing(&mut self) {
        if let Some(batch) = &self.batch {
            batch.cancel();
            self.status = "Stopping after the current file...".to_string();
        }
    }

    fn handle_messages(&mut self) {
        let Some(batch) = self.batch.as_mut() else {
            return;
        };

        let updates = batch.poll();
        let state = batch.state();

        for update in updates {
            let received = match update {
                Update::Started { total } => format!("Processing {} files...", total),
                Update::Processing { index, total, name } => {
                    self.status = format!("Converting {}... ({}/{})", name, index, total);
                    continue;
                }
                Update::Finished(event) => match event.outcome {
                    Outcome::Converted(output) => {
                        self.progress.increment_success();
                        let output_name = output
                            .file_name()
                            .map(|name| name.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        format!(
                            "[{}/{}] Converted '{}' to '{}' ({:#?})",
                            event.index, event.total, event.name, output_name, event.duration
                        )
                    }
                    Outcome::Failed(error) => {
                        self.progress.increment_failed();
                        format!(
                            "[{}/{}] Failed to convert '{}': {}",
                            event.index, event.total, event.name, error
                        )
                    }
                },
                Update::Completed(summary) => {
                    self.status = match summary.cancelled {
                        true => format!(
                            "Stopped: {}/{} converted",
                            summary.converted, summary.total
                        ),
                        false => format!(
                            "Conversion complete: {}/{} successful",
                            summary.converted, summary.total
                        ),
                    };
                    let message = format!("{} in {:#?}", self.status, summary.duration);
                    self.dialog = Some(Dialog::Summary(summary));
                    message
                }
                Update::Crashed(error) => {
                    self.status = "Conversion error".to_string();
                    self.dialog = Some(Dialog::Crashed(error.clone()));
                    format!("An error occurred during conversion: {}", error)
                }
            };

            self.push_message(received);
        }

        self.state = state;
        if state != BatchState::Running {
            self.batch = None;
        }
    }

    fn push_message(&mut self, message: String) {
        self.messages.push(message);

        if self.messages.len() > LOG_LENGTH {
            self.messages.remove(0);
        }
    }

    fn apply_theme(&mut self, ctx: &egui::Context) {
        if self.applied_theme == Some(self.settings.theme) {
            return;
        }

        ctx.set_visuals(match self.settings.theme {
            Theme::Dark => egui::Visuals::dark(),
            Theme::Light => egui::Visuals::light(),
        });
        self.applied_theme = Some(self.settings.theme);
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .collect()
        });

        if !dropped.is_empty() {
            self.add_files(dropped);
        }
    }

    fn browse_files(&mut self) {
        if let Some(paths) = rfd::FileDialog::new()
            .set_title("Select images")
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_files()
        {
            self.add_files(paths);
        }
    }

    // Pages
    fn files_page(&mut self, ui: &mut egui::Ui) {
        let running = self.is_running();
        let hovering = ui.ctx().input(|i| !i.raw.hovered_files.is_empty());

        ui.horizontal(|ui| {
            ui.heading("Files");
            ui.label(match self.files.len() {
                0 => "No files".to_string(),
                1 => "1 file".to_string(),
                n => format!("{} files", n),
            });

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(!running && !self.files.is_empty(), egui::Button::new("Clear"))
                    .clicked()
                {
                    self.dialog = Some(Dialog::ConfirmClear);
                }
                if ui.add_enabled(!running, egui::Button::new("Add files...")).clicked() {
                    self.browse_files();
                }
            });
        });

        if self.files.is_empty() {
            let text = match hovering {
                true => "Release to add the files",
                false => "Drag and drop images here, or use \"Add files...\"",
            };
            ui.add_space(24.0);
            ui.vertical_centered(|ui| {
                ui.label(text);
            });
            ui.add_space(24.0);
        } else {
            match file_table(ui, &self.files, !running) {
                Some(RowAction::Preview(path)) => self.open_preview(ui.ctx(), path),
                Some(RowAction::Remove(path)) => self.remove_file(path),
                None => {}
            }
            ui.label(format!(
                "Total size: {}",
                format_file_size(self.files.total_size())
            ));
        }

        ui.add_space(8.0);

        ui.heading("Summary");
        ui.label(self.summary_text());

        ui.add_space(8.0);

        ui.heading("Logs");
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                ui.label(self.messages.join("\n"));
            });
    }

    fn summary_text(&self) -> String {
        let mut summary = String::new();

        write!(
            summary,
            "Your images will be saved as {{name}}{}.{}",
            self.settings.name_extension.as_deref().unwrap_or(""),
            self.settings.encoding_options.extension()
        )
        .unwrap_or_default();

        match &self.settings.output_folder {
            Some(folder) => write!(summary, " in '{}'", folder.display()),
            None => write!(summary, " next to the originals"),
        }
        .unwrap_or_default();

        let resize_options = match self.settings.resize_options {
            ResizeOptions::None => "with their original resolution".to_string(),
            ResizeOptions::Fit { width, height } => match (width, height) {
                (Some(width), Some(height)) => {
                    format!("and will be scaled to fit {}px by {}px", width, height)
                }
                (Some(width), None) => format!("and will be scaled to {}px wide", width),
                (None, Some(height)) => format!("and will be scaled to {}px high", height),
                (None, None) => "with their original resolution".to_string(),
            },
            ResizeOptions::Largest(size) => {
                format!("and will be resized to {}px on the largest dimension", size)
            }
            ResizeOptions::Smallest(size) => {
                format!("and will be resized to {}px on the smallest dimension", size)
            }
            ResizeOptions::Exact(width, height) => {
                format!("and will be resized to {}px by {}px", width, height)
            }
        };

        write!(summary, ", {}.", resize_options).unwrap_or_default();
        summary
    }

    fn export_page(&mut self, ui: &mut egui::Ui) {
        ui.heading("Export options");

        ui.horizontal(|ui| {
            ui.label("Output folder");
            let folder = match &self.settings.output_folder {
                Some(folder) => folder.display().to_string(),
                None => "Same as input".to_string(),
            };
            ui.monospace(folder);
        });
        ui.horizontal(|ui| {
            if ui.button("Browse...").clicked() {
                if let Some(folder) = rfd::FileDialog::new()
                    .set_title("Select output folder")
                    .pick_folder()
                {
                    self.settings.output_folder = Some(folder);
                }
            }
            if ui
                .add_enabled(
                    self.settings.output_folder.is_some(),
                    egui::Button::new("Same as input"),
                )
                .clicked()
            {
                self.settings.output_folder = None;
            }
        });

        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.label("Name extension");
            ui.text_edit_singleline(self.settings.name_extension.get_or_insert_with(String::new));
        });

        // Remove forbidden characters
        if let Some(extension) = self.settings.name_extension.take() {
            self.settings.name_extension = clean_name_extension(&extension);
        }
    }

    fn encoding_page(&mut self, ui: &mut egui::Ui) {
        ui.vertical(|ui| {
            ui.heading("Encoding options");
            // Type
            egui::ComboBox::from_label("Choose export type")
                .selected_text(format!("{}", self.settings.encoding_options))
                .show_ui(ui, |ui| {
                    for options in EncodingOptions::all() {
                        let selected = self.settings.encoding_options.same_format(&options);
                        if ui.selectable_label(selected, options.to_string()).clicked() && !selected {
                            self.settings.encoding_options = options;
                        }
                    }
                });

            match &mut self.settings.encoding_options {
                EncodingOptions::Avif(settings) => {
                    // Quality
                    ui.add(egui::Slider::new(&mut settings.quality, 1..=100).text("Quality"));

                    // Speed
                    ui.add(egui::Slider::new(&mut settings.speed, 1..=10).text("Speed"));
                }
                EncodingOptions::WebP(settings) => {
                    // Lossless
                    ui.add(egui::Checkbox::new(&mut settings.lossless, "Lossless"));

                    // Quality
                    ui.add_enabled(
                        !settings.lossless,
                        egui::Slider::new(&mut settings.quality, 1..=100).text("Quality"),
                    );
                }
                EncodingOptions::Jpeg(settings) => {
                    // Quality
                    ui.add(egui::Slider::new(&mut settings.quality, 1..=100).text("Quality"));
                }
                EncodingOptions::Ico => {
                    ui.label("Icons larger than 256x256 are scaled down to fit.");
                }
                EncodingOptions::Png
                | EncodingOptions::Tiff
                | EncodingOptions::Bmp
                | EncodingOptions::Gif => {
                    ui.label("No options for this format.");
                }
            }

            if !self.settings.encoding_options.supports_alpha() {
                ui.label("Transparent areas will be filled with white.");
            }
        });
    }

    fn resize_page(&mut self, ui: &mut egui::Ui) {
        ui.heading("Resize options");
        resize_input(ui, &mut self.settings);
    }

    fn about_page(&mut self, ui: &mut egui::Ui) {
        ui.heading("About");
        ui.label("Bulk image converter and resizer written in Rust.");
        ui.label("Drop images onto the window, pick a format and press Run.");
    }

    fn show_dialog(&mut self, ctx: &egui::Context) {
        let Some(dialog) = &self.dialog else {
            return;
        };

        let mut close = false;
        let mut confirmed_clear = false;

        let title = match dialog {
            Dialog::ConfirmClear => "Clear files".to_string(),
            Dialog::Preview { name, .. } => format!("Preview - {}", name),
            Dialog::PreviewFailed { .. } => "Preview error".to_string(),
            Dialog::Summary(summary) if summary.failed.is_empty() => "Conversion complete".to_string(),
            Dialog::Summary(_) => "Conversion complete with errors".to_string(),
            Dialog::Crashed(_) => "Conversion error".to_string(),
        };

        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                match dialog {
                    Dialog::ConfirmClear => {
                        ui.label(format!(
                            "Are you sure you want to remove all {} files from the list?",
                            self.files.len()
                        ));
                        ui.horizontal(|ui| {
                            if ui.button("Yes").clicked() {
                                confirmed_clear = true;
                                close = true;
                            }
                            if ui.button("No").clicked() {
                                close = true;
                            }
                        });
                        return;
                    }
                    Dialog::Preview { texture, info, .. } => preview_image(ui, texture, info),
                    Dialog::PreviewFailed { name, error } => {
                        ui.label(format!("Could not show preview for {}:\n{}", name, error));
                    }
                    Dialog::Summary(summary) => summary_dialog(ui, summary),
                    Dialog::Crashed(error) => {
                        ui.label(format!("An error occurred during conversion:\n{}", error));
                    }
                }

                if ui.button("Close").clicked() {
                    close = true;
                }
            });

        if close {
            self.dialog = None;
            self.clear_files(confirmed_clear);
        }
    }
}

fn summary_dialog(ui: &mut egui::Ui, summary: &Summary) {
    if summary.cancelled {
        ui.label(format!(
            "Stopped after {} of {} files.",
            summary.attempted(),
            summary.total
        ));
    }

    if summary.failed.is_empty() {
        ui.label(format!(
            "Successfully converted all {} images!",
            summary.converted
        ));
        return;
    }

    ui.label(format!(
        "Successfully converted: {}\nFailed: {}",
        summary.converted,
        summary.failed.len()
    ));
    ui.add_space(4.0);
    ui.label("Failed files:");
    egui::ScrollArea::vertical().max_height(160.0).show(ui, |ui| {
        for FailedFile { name, error } in &summary.failed {
            ui.label(format!("{}: {}", name, error));
        }
    });
}

fn add_status(summary: &AddSummary, total: usize) -> String {
    if summary.added > 0 {
        format!(
            "{} files added, {} total files ready",
            summary.added, total
        )
    } else if summary.duplicates > 0 {
        format!("{} files were already in the list.", summary.duplicates)
    } else if summary.unsupported > 0 {
        format!(
            "{} files are not supported image formats.",
            summary.unsupported
        )
    } else {
        "No valid image files were selected.".to_string()
    }
}

fn clean_name_extension(extension: &str) -> Option<String> {
    let mut cleaned = extension.trim().to_string();
    cleaned.retain(|c| !FORBIDDEN_CHARS.contains(&c));

    match cleaned.is_empty() {
        true => None,
        false => Some(cleaned),
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // State
        self.apply_theme(ctx);
        self.handle_dropped_files(ctx);
        self.handle_messages();

        let running = self.is_running();
        let cancelling = self.batch.as_ref().is_some_and(Batch::is_cancelling);
        if running {
            ctx.request_repaint_after(POLL_INTERVAL);
        }

        let percentage = self.progress.fraction();

        // Render
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(4.0);

            // Nav
            ui.horizontal(|ui| {
                for page in &[
                    Page::Files,
                    Page::Resize,
                    Page::Encoding,
                    Page::Export,
                    Page::About,
                ] {
                    let label = match page {
                        Page::Files => "Files",
                        Page::Resize => "Resize",
                        Page::Encoding => "Encoding",
                        Page::Export => "Export",
                        Page::About => "About",
                    };

                    if ui.selectable_label(self.page == *page, label).clicked() {
                        self.page = *page;
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Max), |ui| {
                    ui.add_space(10.0);
                    match running {
                        true => {
                            // Stop button (disabled once a stop was requested)
                            ui.add_enabled_ui(!cancelling, |ui| {
                                if ui.button("Stop").clicked() {
                                    self.stop_processing();
                                }
                            });
                        }
                        false => {
                            if ui
                                .add_enabled(!self.files.is_empty(), egui::Button::new("Run"))
                                .clicked()
                            {
                                self.start_processing();
                            }
                        }
                    }

                    let mut dark = self.settings.theme == Theme::Dark;
                    if ui.checkbox(&mut dark, "Dark mode").changed() {
                        self.settings.theme = match dark {
                            true => Theme::Dark,
                            false => Theme::Light,
                        };
                    }

                    if self.progress.processed() > 0 {
                        ui.label(format!("{:.0}%", percentage * 100.0));
                    }
                });
            });

            ui.add_space(8.0);

            ui.add(egui::ProgressBar::new(percentage).desired_height(8.0));
            ui.label(&self.status);

            ui.add_space(8.0);

            // Content
            ui.add_enabled_ui(!running || self.page == Page::Files, |ui| match self.page {
                Page::Files => self.files_page(ui),
                Page::Encoding => self.encoding_page(ui),
                Page::Resize => self.resize_page(ui),
                Page::Export => self.export_page(ui),
                Page::About => self.about_page(ui),
            });
        });

        self.show_dialog(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn list_cannot_be_cleared_once_a_run_starts() {
        let dir = tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..20)
            .map(|i| {
                let path = dir.path().join(format!("img_{}.png", i));
                fs::write(&path, b"queued").unwrap();
                path
            })
            .collect();

        let mut app = App::default();
        app.add_files(paths);
        assert_eq!(app.files.len(), 20);

        // Confirmation left open, then Run pressed
        app.dialog = Some(Dialog::ConfirmClear);
        app.start_processing();
        assert!(app.is_running());
        assert!(app.dialog.is_none());

        app.clear_files(true);
        assert_eq!(app.files.len(), 20);

        app.stop_processing();
    }

    #[test]
    fn clear_works_again_when_idle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        fs::write(&path, b"queued").unwrap();

        let mut app = App::default();
        app.add_files(vec![path]);
        app.clear_files(false);
        assert_eq!(app.files.len(), 1);

        app.clear_files(true);
        assert!(app.files.is_empty());
    }

    #[test]
    fn name_extension_drops_path_characters() {
        assert_eq!(clean_name_extension(" _web/small? "), Some("_websmall".to_string()));
        assert_eq!(clean_name_extension("  "), None);
        assert_eq!(clean_name_extension("<>|"), None);
    }

    #[test]
    fn add_status_prefers_added_count() {
        let summary = AddSummary {
            added: 2,
            duplicates: 1,
            unsupported: 0,
            missing: 0,
        };
        assert_eq!(add_status(&summary, 5), "2 files added, 5 total files ready");

        let duplicates = AddSummary {
            duplicates: 3,
            ..Default::default()
        };
        assert_eq!(add_status(&duplicates, 3), "3 files were already in the list.");

        assert_eq!(
            add_status(&AddSummary::default(), 0),
            "No valid image files were selected."
        );
    }
}
