use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// One image waiting in the conversion list.
#[derive(Clone, Debug, PartialEq)]
pub struct FileEntry {
    path: PathBuf,
    name: String,
    format: String,
    size: u64,
}

impl FileEntry {
    pub fn new(path: PathBuf) -> io::Result<Self> {
        let metadata = fs::metadata(&path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{}' is not a file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let format = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_uppercase())
            .unwrap_or_default();

        Ok(Self {
            path,
            name,
            format,
            size: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}
