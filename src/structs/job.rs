use std::path::{Path, PathBuf};

use super::{
    file_entry::FileEntry,
    file_type::EncodingOptions,
    settings::{ResizeOptions, Settings},
};

/// Everything needed to convert one file, frozen when the batch starts.
#[derive(Clone, Debug)]
pub struct ConversionJob {
    entry: FileEntry,
    encoding_options: EncodingOptions,
    resize_options: ResizeOptions,
    output_folder: Option<PathBuf>,
    name_extension: Option<String>,
}

impl ConversionJob {
    pub fn new(entry: FileEntry, settings: &Settings) -> Self {
        Self {
            entry,
            encoding_options: settings.encoding_options.clone(),
            resize_options: settings.resize_options,
            output_folder: settings.output_folder.clone(),
            name_extension: settings.name_extension.clone(),
        }
    }

    /// One job per entry, all sharing the same settings snapshot.
    pub fn batch<'a>(entries: impl IntoIterator<Item = &'a FileEntry>, settings: &Settings) -> Vec<Self> {
        entries
            .into_iter()
            .map(|entry| Self::new(entry.clone(), settings))
            .collect()
    }

    pub fn entry(&self) -> &FileEntry {
        &self.entry
    }

    pub fn encoding_options(&self) -> &EncodingOptions {
        &self.encoding_options
    }

    pub fn resize_options(&self) -> ResizeOptions {
        self.resize_options
    }

    pub fn name_extension(&self) -> Option<&str> {
        self.name_extension.as_deref()
    }

    /// The configured folder, or the input file's own folder.
    pub fn output_folder(&self) -> PathBuf {
        match &self.output_folder {
            Some(folder) => folder.clone(),
            None => self
                .entry
                .path()
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}
