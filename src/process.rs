use std::{
    io::Cursor,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
        Arc,
    },
    time::Instant,
};

use image::{
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType as PngFilterType, PngEncoder},
    },
    imageops::FilterType,
    DynamicImage, GenericImageView, ImageDecoder, ImageFormat, ImageReader, Rgb, RgbImage,
};
use rgb::FromSlice;

use crate::{
    error::ConvertError,
    structs::{
        file_type::{AvifSettings, EncodingOptions, WebpSettings},
        job::ConversionJob,
        settings::{ResizeOptions, MAX_DIMENSION},
        update::{FailedFile, Outcome, ProgressEvent, Summary, Update},
    },
    types::Progress,
    util::files::write_unique,
};

const ICO_MAX_SIZE: u32 = 256;

/// Runs every job in order, reporting through `sender`. A failing file is
/// reported and skipped; `stop_flag` is checked between files.
pub fn convert_images(sender: Sender<Update>, stop_flag: Arc<AtomicBool>, jobs: Vec<ConversionJob>) {
    run_batch(&jobs, &stop_flag, |update| notify(&sender, update));
}

fn run_batch(jobs: &[ConversionJob], stop_flag: &AtomicBool, mut report: impl FnMut(Update)) {
    let batch_start = Instant::now();
    let total = jobs.len();

    log::info!("Converting {} files", total);
    report(Update::Started { total });

    let mut progress = Progress::new(total as u32);
    let mut failed = Vec::new();
    let mut cancelled = false;

    for (position, job) in jobs.iter().enumerate() {
        if stop_flag.load(Ordering::Relaxed) {
            log::info!("Stopped after {} of {} files", position, total);
            cancelled = true;
            break;
        }

        let index = position + 1;
        let name = job.entry().name().to_string();
        report(Update::Processing {
            index,
            total,
            name: name.clone(),
        });

        let start_time = Instant::now();
        let outcome = match convert_guarded(job) {
            Ok(output) => {
                progress.increment_success();
                log::info!(
                    "Converted '{}' to '{}' in {:.2} seconds",
                    name,
                    output.display(),
                    start_time.elapsed().as_secs_f32()
                );
                Outcome::Converted(output)
            }
            Err(e) => {
                progress.increment_failed();
                log::warn!("Failed to convert '{}': {}", name, e);
                failed.push(FailedFile {
                    name: name.clone(),
                    error: e.to_string(),
                });
                Outcome::Failed(e.to_string())
            }
        };

        report(Update::Finished(ProgressEvent {
            index,
            total,
            name,
            outcome,
            duration: start_time.elapsed(),
        }));
    }

    let summary = Summary {
        total,
        converted: progress.success as usize,
        failed,
        cancelled,
        duration: batch_start.elapsed(),
    };

    log::info!(
        "Batch finished: {} converted, {} failed in {:#?}",
        summary.converted,
        summary.failed.len(),
        summary.duration
    );
    report(Update::Completed(summary));
}

fn notify(sender: &Sender<Update>, update: Update) {
    if sender.send(update).is_err() {
        log::debug!("Progress receiver dropped");
    }
}

/// Converts one file, turning a panic inside the codecs into an error.
fn convert_guarded(job: &ConversionJob) -> Result<PathBuf, ConvertError> {
    panic::catch_unwind(AssertUnwindSafe(|| convert_image(job))).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(ConvertError::Panicked(message))
    })
}

pub fn convert_image(job: &ConversionJob) -> Result<PathBuf, ConvertError> {
    let options = job.encoding_options();

    let img = get_image(job.entry().path())?;
    let img = resize_image(img, job.resize_options())?;
    let img = fit_icon(img, options);
    let img = prepare_pixels(img, options);
    let data = encode_image(&img, options)?;
    save_image(&data, job)
}

pub(crate) fn get_image(image_path: &Path) -> Result<DynamicImage, ConvertError> {
    let read_error = |source| ConvertError::Read {
        path: image_path.to_path_buf(),
        source,
    };
    let decode_error = |source| ConvertError::Decode {
        path: image_path.to_path_buf(),
        source,
    };

    let mut decoder = ImageReader::open(image_path)
        .map_err(read_error)?
        .with_guessed_format()
        .map_err(read_error)?
        .into_decoder()
        .map_err(decode_error)?;

    let orientation = decoder.orientation().map_err(decode_error)?;
    let mut img = DynamicImage::from_decoder(decoder).map_err(decode_error)?;
    img.apply_orientation(orientation);

    log::debug!(
        "Decoded '{}' ({}x{})",
        image_path.display(),
        img.width(),
        img.height()
    );
    Ok(img)
}

fn resize_image(img: DynamicImage, resize_options: ResizeOptions) -> Result<DynamicImage, ConvertError> {
    let (width, height) = img.dimensions();

    let Some((new_width, new_height)) = resize_options.target_dimensions(width, height) else {
        return Ok(img);
    };
    if new_width > MAX_DIMENSION as u64 || new_height > MAX_DIMENSION as u64 {
        return Err(ConvertError::TooLarge {
            width: new_width,
            height: new_height,
            max: MAX_DIMENSION,
        });
    }
    let (new_width, new_height) = (new_width as u32, new_height as u32);

    Ok(match resize_options {
        ResizeOptions::Exact(..) => img.resize_to_fill(new_width, new_height, FilterType::Lanczos3),
        _ if (new_width, new_height) == (width, height) => img,
        _ => img.resize_exact(new_width, new_height, FilterType::Lanczos3),
    })
}

fn fit_icon(img: DynamicImage, options: &EncodingOptions) -> DynamicImage {
    if *options == EncodingOptions::Ico
        && (img.width() > ICO_MAX_SIZE || img.height() > ICO_MAX_SIZE)
    {
        return img.resize(ICO_MAX_SIZE, ICO_MAX_SIZE, FilterType::Lanczos3);
    }
    img
}

/// Brings pixels into a layout the target encoder accepts. Formats without
/// alpha get transparent areas composited onto white.
fn prepare_pixels(img: DynamicImage, options: &EncodingOptions) -> DynamicImage {
    if !options.supports_alpha() {
        return if img.color().has_alpha() {
            DynamicImage::ImageRgb8(flatten_on_white(&img))
        } else if *options == EncodingOptions::Tiff {
            img
        } else {
            DynamicImage::ImageRgb8(img.to_rgb8())
        };
    }

    match options {
        EncodingOptions::Png => img,
        _ if img.color().has_alpha() => DynamicImage::ImageRgba8(img.to_rgba8()),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    }
}

fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |channel: u8| ((channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

fn encode_image(img: &DynamicImage, options: &EncodingOptions) -> Result<Vec<u8>, ConvertError> {
    let encode_error = |e: &dyn std::fmt::Display| ConvertError::Encode {
        format: options.to_string(),
        message: e.to_string(),
    };

    let data = match options {
        // Webp
        EncodingOptions::WebP(settings) => encode_webp(img, settings).map_err(|e| encode_error(&e))?,

        // Avif
        EncodingOptions::Avif(settings) => encode_avif(img, settings).map_err(|e| encode_error(&e))?,

        // Jpeg
        EncodingOptions::Jpeg(settings) => {
            let mut buf = Vec::new();
            img.write_with_encoder(JpegEncoder::new_with_quality(
                &mut buf,
                settings.quality.clamp(1, 100),
            ))
            .map_err(|e| encode_error(&e))?;
            buf
        }

        // Png
        EncodingOptions::Png => {
            let mut buf = Vec::new();
            img.write_with_encoder(PngEncoder::new_with_quality(
                &mut buf,
                CompressionType::Best,
                PngFilterType::Adaptive,
            ))
            .map_err(|e| encode_error(&e))?;
            buf
        }

        // Everything the image crate handles with stock settings
        EncodingOptions::Tiff | EncodingOptions::Bmp | EncodingOptions::Gif | EncodingOptions::Ico => {
            let format = match options {
                EncodingOptions::Tiff => ImageFormat::Tiff,
                EncodingOptions::Bmp => ImageFormat::Bmp,
                EncodingOptions::Gif => ImageFormat::Gif,
                _ => ImageFormat::Ico,
            };
            let mut cursor = Cursor::new(Vec::new());
            img.write_to(&mut cursor, format)
                .map_err(|e| encode_error(&e))?;
            cursor.into_inner()
        }
    };

    Ok(data)
}

fn encode_webp(img: &DynamicImage, settings: &WebpSettings) -> Result<Vec<u8>, String> {
    let encoder = webp::Encoder::from_image(img).map_err(|e| e.to_string())?;

    let memory = encoder
        .encode_simple(settings.lossless, settings.quality.clamp(1, 100) as f32)
        .map_err(|e| format!("{:?}", e))?;

    Ok(memory.to_vec())
}

fn encode_avif(img: &DynamicImage, settings: &AvifSettings) -> Result<Vec<u8>, ravif::Error> {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels = rgba.as_raw().as_rgba();

    let encoded = ravif::Encoder::new()
        .with_quality(settings.quality.clamp(1, 100) as f32)
        .with_speed(settings.speed.clamp(1, 10))
        .encode_rgba(ravif::Img::new(pixels, width as usize, height as usize))?;

    Ok(encoded.avif_file)
}

fn save_image(data: &[u8], job: &ConversionJob) -> Result<PathBuf, ConvertError> {
    let image_path = job.entry().path();
    let mut output_file_name = image_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    if let Some(name_extension) = job.name_extension() {
        output_file_name.push_str(name_extension);
    }

    let folder = job.output_folder();
    let extension = job.encoding_options().extension();

    write_unique(&folder, &output_file_name, extension, data)
        .map_err(|e| ConvertError::from_write(folder, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::{
        file_entry::FileEntry,
        file_type::{JpegSettings, WebpSettings},
        settings::Settings,
    };
    use image::{Rgba, RgbaImage};
    use std::{fs, sync::mpsc::channel};
    use tempfile::tempdir;

    fn write_png(path: &Path, width: u32, height: u32) {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x * 7) as u8, (y * 5) as u8, 90]))
            .save(path)
            .unwrap();
    }

    fn jobs_for(paths: &[PathBuf], settings: &Settings) -> Vec<ConversionJob> {
        paths
            .iter()
            .map(|path| ConversionJob::new(FileEntry::new(path.clone()).unwrap(), settings))
            .collect()
    }

    fn run(jobs: Vec<ConversionJob>, stop: bool) -> Vec<Update> {
        let (sender, receiver) = channel();
        convert_images(sender, Arc::new(AtomicBool::new(stop)), jobs);
        receiver.try_iter().collect()
    }

    fn summary(updates: &[Update]) -> &Summary {
        match updates.last() {
            Some(Update::Completed(summary)) => summary,
            other => panic!("batch did not complete: {:?}", other),
        }
    }

    #[test]
    fn converts_png_and_jpeg_to_webp() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.jpg");
        write_png(&a, 40, 30);
        RgbImage::from_pixel(20, 20, Rgb([200, 10, 10])).save(&b).unwrap();

        let settings = Settings {
            encoding_options: EncodingOptions::WebP(WebpSettings {
                quality: 80,
                lossless: false,
            }),
            output_folder: Some(out.clone()),
            ..Default::default()
        };
        let updates = run(jobs_for(&[a, b], &settings), false);

        assert_eq!(summary(&updates).converted, 2);
        let a_out = image::open(out.join("a.webp")).unwrap();
        let b_out = image::open(out.join("b.webp")).unwrap();
        assert_eq!(a_out.dimensions(), (40, 30));
        assert_eq!(b_out.dimensions(), (20, 20));
    }

    #[test]
    fn failures_are_counted_and_batch_continues() {
        let dir = tempdir().unwrap();
        let good_one = dir.path().join("one.png");
        let corrupt = dir.path().join("broken.png");
        let good_two = dir.path().join("two.png");
        let vanished = dir.path().join("gone.png");
        write_png(&good_one, 8, 8);
        fs::write(&corrupt, b"definitely not a png").unwrap();
        write_png(&good_two, 8, 8);
        write_png(&vanished, 8, 8);

        let settings = Settings {
            output_folder: Some(dir.path().join("out")),
            ..Default::default()
        };
        let jobs = jobs_for(&[good_one, corrupt, good_two, vanished.clone()], &settings);
        fs::remove_file(&vanished).unwrap();

        let updates = run(jobs, false);
        let summary = summary(&updates);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.converted, 2);
        assert_eq!(summary.failed.len(), 2);
        assert_eq!(summary.attempted(), 4);
        assert!(!summary.cancelled);

        let finished: Vec<&ProgressEvent> = updates
            .iter()
            .filter_map(|update| match update {
                Update::Finished(event) => Some(event),
                _ => None,
            })
            .collect();
        assert_eq!(finished.len(), 4);
        assert_eq!(
            finished.iter().map(|event| event.index).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert!(matches!(finished[1].outcome, Outcome::Failed(_)));
        assert_eq!(summary.failed[0].name, "broken.png");
        assert_eq!(summary.failed[1].name, "gone.png");
    }

    #[test]
    fn never_overwrites_existing_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("photo.png");
        write_png(&input, 10, 10);
        let existing = dir.path().join("photo.jpg");
        fs::write(&existing, b"keep me").unwrap();

        let settings = Settings {
            encoding_options: EncodingOptions::Jpeg(JpegSettings::default()),
            ..Default::default()
        };
        let updates = run(jobs_for(&[input.clone(), input], &settings), false);

        assert_eq!(summary(&updates).converted, 2);
        assert_eq!(fs::read(&existing).unwrap(), b"keep me");
        assert!(dir.path().join("photo_1.jpg").is_file());
        assert!(dir.path().join("photo_2.jpg").is_file());
    }

    #[test]
    fn name_extension_is_appended_to_stem() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("cat.png");
        write_png(&input, 4, 4);

        let settings = Settings {
            encoding_options: EncodingOptions::Bmp,
            name_extension: Some("_small".to_string()),
            ..Default::default()
        };
        let updates = run(jobs_for(&[input], &settings), false);

        assert_eq!(summary(&updates).converted, 1);
        assert!(dir.path().join("cat_small.bmp").is_file());
    }

    #[test]
    fn stop_flag_cancels_before_next_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.png");
        write_png(&input, 4, 4);

        let settings = Settings::default();
        let updates = run(jobs_for(&[input.clone(), input], &settings), true);
        let summary = summary(&updates);

        assert!(summary.cancelled);
        assert_eq!(summary.attempted(), 0);
        assert!(!updates.iter().any(|update| matches!(update, Update::Processing { .. })));
    }

    #[test]
    fn stop_during_a_file_finishes_it_and_skips_the_rest() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let first = dir.path().join("first.png");
        let second = dir.path().join("second.png");
        write_png(&first, 6, 6);
        write_png(&second, 6, 6);

        let settings = Settings {
            output_folder: Some(out.clone()),
            ..Default::default()
        };
        let jobs = jobs_for(&[first, second], &settings);
        let stop_flag = AtomicBool::new(false);
        let mut updates = Vec::new();

        run_batch(&jobs, &stop_flag, |update| {
            if matches!(update, Update::Processing { index: 1, .. }) {
                stop_flag.store(true, Ordering::Relaxed);
            }
            updates.push(update);
        });
        let summary = summary(&updates);

        assert!(summary.cancelled);
        assert_eq!(summary.converted, 1);
        assert_eq!(summary.attempted(), 1);
        assert!(out.join("first.png").is_file());
        assert!(!out.join("second.png").exists());
        assert!(!updates
            .iter()
            .any(|update| matches!(update, Update::Processing { index: 2, .. })));
    }

    #[test]
    fn oversize_resize_fails_the_file() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(1, 100));
        let resize = ResizeOptions::Fit {
            width: Some(1000),
            height: None,
        };

        match resize_image(img, resize) {
            Err(ConvertError::TooLarge { width, height, .. }) => {
                assert_eq!((width, height), (1000, 100_000));
            }
            other => panic!("expected TooLarge, got {:?}", other.map(|img| img.dimensions())),
        }
    }

    #[test]
    fn oversize_resize_is_reported_and_batch_continues() {
        let dir = tempdir().unwrap();
        let thin = dir.path().join("thin.png");
        write_png(&thin, 1, 100);

        let settings = Settings {
            resize_options: ResizeOptions::Fit {
                width: Some(1000),
                height: None,
            },
            output_folder: Some(dir.path().join("out")),
            ..Default::default()
        };
        let updates = run(jobs_for(&[thin], &settings), false);
        let summary = summary(&updates);

        assert_eq!(summary.converted, 0);
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.failed[0].error.contains("100000"));
    }

    #[test]
    fn webp_beyond_its_size_limit_is_an_encode_error() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(16384, 1));

        for lossless in [false, true] {
            let options = EncodingOptions::WebP(WebpSettings {
                quality: 80,
                lossless,
            });
            assert!(matches!(
                encode_image(&img, &options),
                Err(ConvertError::Encode { .. })
            ));
        }
    }

    #[test]
    fn resize_by_width_keeps_aspect_ratio() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("wide.png");
        write_png(&input, 300, 200);

        let settings = Settings {
            resize_options: ResizeOptions::Fit {
                width: Some(100),
                height: None,
            },
            output_folder: Some(dir.path().join("out")),
            ..Default::default()
        };
        run(jobs_for(&[input], &settings), false);

        let output = image::open(dir.path().join("out").join("wide.png")).unwrap();
        assert_eq!(output.dimensions(), (100, 67));
    }

    #[test]
    fn exact_resize_fills_requested_box() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(300, 100));
        let resized = resize_image(img, ResizeOptions::Exact(50, 50)).unwrap();
        assert_eq!(resized.dimensions(), (50, 50));
    }

    #[test]
    fn icons_are_capped_at_256() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(1024, 512));
        let fitted = fit_icon(img, &EncodingOptions::Ico);
        assert_eq!(fitted.dimensions(), (256, 128));

        let small = DynamicImage::ImageRgb8(RgbImage::new(64, 64));
        assert_eq!(fit_icon(small, &EncodingOptions::Ico).dimensions(), (64, 64));
    }

    #[test]
    fn transparency_becomes_white_for_flat_formats() {
        let mut rgba = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([10, 20, 30, 255]));
        let img = DynamicImage::ImageRgba8(rgba);

        let flat = prepare_pixels(img.clone(), &EncodingOptions::Jpeg(JpegSettings::default()));
        let flat = flat.as_rgb8().unwrap();
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(flat.get_pixel(1, 0).0, [10, 20, 30]);

        let kept = prepare_pixels(img, &EncodingOptions::WebP(WebpSettings::default()));
        assert!(kept.color().has_alpha());
    }

    #[test]
    fn every_output_format_encodes() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([30, 60, 90, 128])));

        for options in EncodingOptions::all() {
            if matches!(options, EncodingOptions::Avif(_)) {
                continue;
            }
            let prepared = prepare_pixels(img.clone(), &options);
            let data = encode_image(&prepared, &options)
                .unwrap_or_else(|e| panic!("{} failed: {}", options, e));
            let decoded = image::load_from_memory(&data)
                .unwrap_or_else(|e| panic!("{} output unreadable: {}", options, e));
            assert_eq!(decoded.dimensions(), (16, 16), "{}", options);
        }
    }

    #[test]
    fn avif_encoding_produces_data() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])));
        let data = encode_image(&img, &EncodingOptions::Avif(AvifSettings { quality: 50, speed: 10 }))
            .unwrap();
        assert!(!data.is_empty());
    }
}
