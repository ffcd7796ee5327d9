#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use eframe::egui;

mod batch;
mod components;
mod error;
mod file_list;
mod process;
mod structs;
mod types;
mod ui;
mod util;

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = eframe::NativeOptions {
        centered: true,
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_min_inner_size([700.0, 600.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    log::info!("Starting image converter");

    eframe::run_native(
        "Image converter",
        options,
        Box::new(|_cc| Ok(Box::<ui::App>::default())),
    )
}
