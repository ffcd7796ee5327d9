use std::{fs, path::Path};

use egui::{ColorImage, TextureHandle, Ui};
use image::{imageops::FilterType, ColorType, ImageReader};

use crate::{
    error::ConvertError,
    process::get_image,
    structs::settings::ResizeOptions,
    util::files::format_file_size,
};

const PREVIEW_WIDTH: u32 = 600;
const PREVIEW_HEIGHT: u32 = 400;

/// A decoded image scaled to fit the preview box, with a one-line description
/// of the source file.
pub struct Preview {
    pub image: ColorImage,
    pub info: String,
}

pub fn load_preview(path: &Path) -> Result<Preview, ConvertError> {
    let read_error = |source| ConvertError::Read {
        path: path.to_path_buf(),
        source,
    };

    let format = ImageReader::open(path)
        .map_err(read_error)?
        .with_guessed_format()
        .map_err(read_error)?
        .format()
        .map(|format| format!("{:?}", format).to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string());
    let file_size = fs::metadata(path).map_err(read_error)?.len();

    let img = get_image(path)?;
    let (width, height) = (img.width(), img.height());

    let info = format!(
        "Format: {} | Size: {}x{} | Mode: {} | File Size: {}",
        format,
        width,
        height,
        color_mode(img.color()),
        format_file_size(file_size)
    );

    let fit = ResizeOptions::Fit {
        width: Some(PREVIEW_WIDTH),
        height: Some(PREVIEW_HEIGHT),
    };
    // Bounded by the preview box
    let img = match fit.target_dimensions(width, height) {
        Some((new_width, new_height)) => {
            img.resize_exact(new_width as u32, new_height as u32, FilterType::Lanczos3)
        }
        None => img,
    };

    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];

    Ok(Preview {
        image: ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()),
        info,
    })
}

fn color_mode(color: ColorType) -> String {
    match color {
        ColorType::L8 => "L".to_string(),
        ColorType::La8 => "LA".to_string(),
        ColorType::Rgb8 => "RGB".to_string(),
        ColorType::Rgba8 => "RGBA".to_string(),
        ColorType::L16 => "L;16".to_string(),
        ColorType::La16 => "LA;16".to_string(),
        ColorType::Rgb16 => "RGB;16".to_string(),
        ColorType::Rgba16 => "RGBA;16".to_string(),
        other => format!("{:?}", other),
    }
}

pub fn preview_image(ui: &mut Ui, texture: &TextureHandle, info: &str) {
    ui.vertical_centered(|ui| {
        ui.image((texture.id(), texture.size_vec2()));
        ui.add_space(8.0);
        ui.label(info);
    });
}
