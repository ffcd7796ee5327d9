use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "avif", "ico", "ppm", "pgm", "pbm",
];

const SIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

pub fn format_file_size(size: u64) -> String {
    if size == 0 {
        return "0 B".to_string();
    }

    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", value, SIZE_UNITS[unit])
}

/// Writes `data` to `{stem}.{extension}` inside `folder`, falling back to
/// `{stem}_1.{extension}`, `{stem}_2.{extension}`... when the name is taken.
/// Existing files are never replaced. Returns the path that was written.
pub fn write_unique(folder: &Path, stem: &str, extension: &str, data: &[u8]) -> io::Result<PathBuf> {
    fs::create_dir_all(folder)?;

    let mut counter = 0u32;
    loop {
        let file_name = match counter {
            0 => format!("{}.{}", stem, extension),
            n => format!("{}_{}.{}", stem, n, extension),
        };
        let path = folder.join(file_name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(data).and_then(|_| file.flush()) {
                    drop(file);
                    let _ = fs::remove_file(&path);
                    return Err(e);
                }
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => counter += 1,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn recognises_image_extensions_case_insensitively() {
        assert!(is_image_file(Path::new("photo.JPG")));
        assert!(is_image_file(Path::new("scan.tif")));
        assert!(is_image_file(Path::new("dir/icon.Ico")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("png")));
    }

    #[test]
    fn formats_sizes_like_a_file_manager() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512.0 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024 * 1024), "3072.0 GB");
    }

    #[test]
    fn collisions_get_numeric_suffix() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("photo.webp"), b"existing").unwrap();
        fs::write(dir.path().join("photo_1.webp"), b"existing too").unwrap();

        let written = write_unique(dir.path(), "photo", "webp", b"new").unwrap();

        assert_eq!(written, dir.path().join("photo_2.webp"));
        assert_eq!(fs::read(dir.path().join("photo.webp")).unwrap(), b"existing");
        assert_eq!(fs::read(dir.path().join("photo_1.webp")).unwrap(), b"existing too");
        assert_eq!(fs::read(written).unwrap(), b"new");
    }

    #[test]
    fn creates_missing_output_folder() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("nested").join("out");

        let written = write_unique(&folder, "a", "png", b"data").unwrap();

        assert_eq!(written, folder.join("a.png"));
    }
}
