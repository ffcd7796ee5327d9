use std::{path::PathBuf, time::Duration};

/// Messages sent from the conversion worker to the interface.
#[derive(Debug)]
pub enum Update {
    Started { total: usize },
    Processing { index: usize, total: usize, name: String },
    Finished(ProgressEvent),
    Completed(Summary),
    /// The worker thread died before it could report completion.
    Crashed(String),
}

#[derive(Clone, Debug)]
pub struct ProgressEvent {
    /// 1-based position of the file in the batch.
    pub index: usize,
    pub total: usize,
    pub name: String,
    pub outcome: Outcome,
    pub duration: Duration,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Converted(PathBuf),
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FailedFile {
    pub name: String,
    pub error: String,
}

#[derive(Clone, Debug)]
pub struct Summary {
    pub total: usize,
    pub converted: usize,
    pub failed: Vec<FailedFile>,
    pub cancelled: bool,
    pub duration: Duration,
}

impl Summary {
    pub fn attempted(&self) -> usize {
        self.converted + self.failed.len()
    }
}
