use std::path::PathBuf;

use egui::Ui;
use egui_extras::{Column, TableBuilder};

use crate::{file_list::FileList, util::files::format_file_size};

const ROW_HEIGHT: f32 = 20.0;

pub enum RowAction {
    Preview(PathBuf),
    Remove(PathBuf),
}

/// Lists queued files. Returns the row button clicked this frame, if any.
/// Removing is only offered while `editable`.
pub fn file_table(ui: &mut Ui, files: &FileList, editable: bool) -> Option<RowAction> {
    let mut action = None;

    TableBuilder::new(ui)
        .striped(true)
        .max_scroll_height(180.0)
        .column(Column::remainder().clip(true))
        .column(Column::auto().at_least(50.0))
        .column(Column::auto().at_least(70.0))
        .column(Column::exact(24.0))
        .column(Column::exact(24.0))
        .header(ROW_HEIGHT, |mut header| {
            header.col(|ui| {
                ui.strong("Name");
            });
            header.col(|ui| {
                ui.strong("Format");
            });
            header.col(|ui| {
                ui.strong("Size");
            });
            header.col(|_| {});
            header.col(|_| {});
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, files.len(), |mut row| {
                let entry = &files.list()[row.index()];
                row.col(|ui| {
                    ui.label(entry.name())
                        .on_hover_text(entry.path().display().to_string());
                });
                row.col(|ui| {
                    ui.label(entry.format());
                });
                row.col(|ui| {
                    ui.label(format_file_size(entry.size()));
                });
                row.col(|ui| {
                    if ui
                        .add(egui::Button::new("🔍").small())
                        .on_hover_text("Preview")
                        .clicked()
                    {
                        action = Some(RowAction::Preview(entry.path().to_path_buf()));
                    }
                });
                row.col(|ui| {
                    if ui
                        .add_enabled(editable, egui::Button::new("✖").small())
                        .on_hover_text("Remove")
                        .clicked()
                    {
                        action = Some(RowAction::Remove(entry.path().to_path_buf()));
                    }
                });
            });
        });

    action
}
