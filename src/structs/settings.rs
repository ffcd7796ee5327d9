use std::path::PathBuf;

use super::file_type::EncodingOptions;

/// Largest side the encoders accept. A resize that lands above it fails the
/// file instead of being clamped, so the aspect ratio is never distorted.
pub const MAX_DIMENSION: u32 = 65535;

#[derive(Clone, Debug)]
pub struct Settings {
    pub encoding_options: EncodingOptions,
    pub resize_options: ResizeOptions,
    /// `None` writes each file next to its input.
    pub output_folder: Option<PathBuf>,
    pub name_extension: Option<String>,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            encoding_options: EncodingOptions::default(),
            resize_options: ResizeOptions::None,
            output_folder: None,
            name_extension: None,
            theme: Theme::Dark,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Theme {
    Dark,
    Light,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResizeOptions {
    None,
    /// Fits inside the given box. A missing side follows the aspect ratio.
    Fit {
        width: Option<u32>,
        height: Option<u32>,
    },
    Largest(u32),
    Exact(u32, u32),
    Smallest(u32),
}

impl ResizeOptions {
    /// Output dimensions for a `width` x `height` source, or `None` when the
    /// image is left alone. `Exact` is reported as-is and cropped to fill.
    /// Results are not capped at `MAX_DIMENSION`; callers reject oversize ones.
    pub fn target_dimensions(&self, width: u32, height: u32) -> Option<(u64, u64)> {
        if width == 0 || height == 0 {
            return None;
        }

        match *self {
            ResizeOptions::None => None,

            ResizeOptions::Fit {
                width: new_width,
                height: new_height,
            } => match (non_zero(new_width), non_zero(new_height)) {
                (None, None) => None,
                (Some(new_width), None) => Some((new_width, scale(height, new_width, width))),
                (None, Some(new_height)) => Some((scale(width, new_height, height), new_height)),
                (Some(new_width), Some(new_height)) => {
                    // Wider than the box: width is the limiting side
                    if width as u64 * new_height > height as u64 * new_width {
                        Some((new_width, scale(height, new_width, width)))
                    } else {
                        Some((scale(width, new_height, height), new_height))
                    }
                }
            },

            ResizeOptions::Largest(size) => {
                let size = non_zero(Some(size))?;
                if width >= height {
                    Some((size, scale(height, size, width)))
                } else {
                    Some((scale(width, size, height), size))
                }
            }

            ResizeOptions::Smallest(size) => {
                let size = non_zero(Some(size))?;
                if width <= height {
                    Some((size, scale(height, size, width)))
                } else {
                    Some((scale(width, size, height), size))
                }
            }

            ResizeOptions::Exact(new_width, new_height) => {
                Some((non_zero(Some(new_width))?, non_zero(Some(new_height))?))
            }
        }
    }
}

fn non_zero(value: Option<u32>) -> Option<u64> {
    value.filter(|&v| v > 0).map(u64::from)
}

/// `value * numerator / denominator`, rounded to nearest, at least 1.
fn scale(value: u32, numerator: u64, denominator: u32) -> u64 {
    let denominator = denominator as u64;
    ((value as u64 * numerator + denominator / 2) / denominator).max(1)
}
