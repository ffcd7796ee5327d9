use egui::Ui;

use crate::structs::settings::{ResizeOptions, Settings, MAX_DIMENSION};

const DEFAULT_WIDTH: u32 = 1920;
const DEFAULT_HEIGHT: u32 = 1080;

pub fn resize_input(ui: &mut Ui, settings: &mut Settings) {
    egui::ComboBox::from_label("Resize options")
        .selected_text(match &settings.resize_options {
            ResizeOptions::None => "None",
            ResizeOptions::Fit { .. } => "Fit",
            ResizeOptions::Largest(_) => "Largest",
            ResizeOptions::Exact(_, _) => "Exact",
            ResizeOptions::Smallest(_) => "Smallest",
        })
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut settings.resize_options, ResizeOptions::None, "None");
            ui.selectable_value(
                &mut settings.resize_options,
                ResizeOptions::Fit {
                    width: Some(DEFAULT_WIDTH),
                    height: Some(DEFAULT_HEIGHT),
                },
                "Fit",
            );
            ui.selectable_value(
                &mut settings.resize_options,
                ResizeOptions::Largest(DEFAULT_WIDTH),
                "Largest",
            );
            ui.selectable_value(
                &mut settings.resize_options,
                ResizeOptions::Exact(DEFAULT_WIDTH, DEFAULT_HEIGHT),
                "Exact",
            );
            ui.selectable_value(
                &mut settings.resize_options,
                ResizeOptions::Smallest(DEFAULT_HEIGHT),
                "Smallest",
            );
        });

    match settings.resize_options {
        ResizeOptions::None => {}
        ResizeOptions::Fit { width, height } => {
            ui.label("Fit inside a box; leave a side unchecked to keep the aspect ratio");
            let width = optional_dimension(ui, "Width", width, DEFAULT_WIDTH);
            let height = optional_dimension(ui, "Height", height, DEFAULT_HEIGHT);
            settings.resize_options = ResizeOptions::Fit { width, height };
        }
        ResizeOptions::Largest(mut size) => {
            ui.label("Resize to largest side");
            ui.add(egui::Slider::new(&mut size, 16..=8000).text("Size"));
            settings.resize_options = ResizeOptions::Largest(size);
        }
        ResizeOptions::Exact(mut width, mut height) => {
            ui.label("Resize and crop to exact size");
            ui.horizontal(|ui| {
                ui.label("Width: ");
                ui.add(egui::DragValue::new(&mut width).range(1..=MAX_DIMENSION).suffix(" px"));
            });
            ui.horizontal(|ui| {
                ui.label("Height: ");
                ui.add(egui::DragValue::new(&mut height).range(1..=MAX_DIMENSION).suffix(" px"));
            });
            settings.resize_options = ResizeOptions::Exact(width, height);
        }
        ResizeOptions::Smallest(mut size) => {
            ui.label("Resize to smallest side");
            ui.add(
                egui::Slider::new(&mut size, 16..=8000)
                    .show_value(true)
                    .text("Size"),
            );
            settings.resize_options = ResizeOptions::Smallest(size);
        }
    }
}

fn optional_dimension(ui: &mut Ui, label: &str, value: Option<u32>, fallback: u32) -> Option<u32> {
    let mut enabled = value.is_some();
    let mut size = value.unwrap_or(fallback);

    ui.horizontal(|ui| {
        ui.checkbox(&mut enabled, label);
        ui.add_enabled(
            enabled,
            egui::DragValue::new(&mut size).range(1..=MAX_DIMENSION).suffix(" px"),
        );
    });

    enabled.then_some(size)
}
