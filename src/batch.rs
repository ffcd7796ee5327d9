use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{channel, Receiver, Sender, TryRecvError},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crate::{
    process::convert_images,
    structs::{job::ConversionJob, update::Update},
    types::BatchState,
};

/// A conversion run on a background thread, owned by the interface.
pub struct Batch {
    receiver: Receiver<Update>,
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    state: BatchState,
}

impl Batch {
    pub fn start(jobs: Vec<ConversionJob>) -> Self {
        Self::spawn(move |sender, stop_flag| convert_images(sender, stop_flag, jobs))
    }

    fn spawn<F>(worker: F) -> Self
    where
        F: FnOnce(Sender<Update>, Arc<AtomicBool>) + Send + 'static,
    {
        let (sender, receiver) = channel::<Update>();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let worker_flag = Arc::clone(&stop_flag);

        let handle = thread::spawn(move || worker(sender, worker_flag));

        Self {
            receiver,
            stop_flag,
            handle: Some(handle),
            state: BatchState::Running,
        }
    }

    /// Asks the worker to stop before its next file.
    pub fn cancel(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelling(&self) -> bool {
        self.state == BatchState::Running && self.stop_flag.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Drains every pending update without blocking.
    pub fn poll(&mut self) -> Vec<Update> {
        let mut updates = Vec::new();

        while self.state == BatchState::Running {
            match self.receiver.try_recv() {
                Ok(update) => {
                    if let Update::Completed(summary) = &update {
                        self.state = match summary.cancelled {
                            true => BatchState::Cancelled,
                            false => BatchState::Completed,
                        };
                        self.handle = None;
                    }
                    updates.push(update);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    let message = self.join_failure();
                    log::error!("Conversion worker stopped unexpectedly: {}", message);
                    self.state = BatchState::Completed;
                    updates.push(Update::Crashed(message));
                }
            }
        }

        updates
    }

    fn join_failure(&mut self) -> String {
        let Some(handle) = self.handle.take() else {
            return "worker thread is gone".to_string();
        };

        match handle.join() {
            Ok(()) => "worker exited without reporting completion".to_string(),
            Err(payload) => payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::{file_entry::FileEntry, settings::Settings};
    use image::{Rgb, RgbImage};
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn drain(batch: &mut Batch) -> Vec<Update> {
        let deadline = Instant::now() + Duration::from_secs(30);
        let mut updates = Vec::new();
        while batch.state() == BatchState::Running {
            assert!(Instant::now() < deadline, "batch did not finish in time");
            updates.extend(batch.poll());
            thread::sleep(Duration::from_millis(5));
        }
        updates
    }

    #[test]
    fn runs_to_completion_in_background() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.png");
        RgbImage::from_pixel(6, 6, Rgb([1, 2, 3])).save(&input).unwrap();

        let settings = Settings {
            output_folder: Some(dir.path().join("out")),
            ..Default::default()
        };
        let jobs = vec![ConversionJob::new(FileEntry::new(input).unwrap(), &settings)];

        let mut batch = Batch::start(jobs);
        assert_eq!(batch.state(), BatchState::Running);

        let updates = drain(&mut batch);

        assert_eq!(batch.state(), BatchState::Completed);
        assert!(matches!(updates.first(), Some(Update::Started { total: 1 })));
        assert!(matches!(updates.last(), Some(Update::Completed(s)) if s.converted == 1));
        assert!(dir.path().join("out").join("a.png").is_file());
        assert!(batch.poll().is_empty());
    }

    #[test]
    fn cancelled_batch_ends_cancelled() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.png");
        RgbImage::from_pixel(2, 2, Rgb([0, 0, 0])).save(&input).unwrap();
        let jobs = vec![ConversionJob::new(
            FileEntry::new(input).unwrap(),
            &Settings::default(),
        )];

        // Holds the worker until the stop request is in
        let mut batch = Batch::spawn(move |sender, stop_flag| {
            while !stop_flag.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(1));
            }
            convert_images(sender, stop_flag, jobs);
        });

        batch.cancel();
        assert!(batch.is_cancelling());
        let updates = drain(&mut batch);

        assert_eq!(batch.state(), BatchState::Cancelled);
        assert!(!batch.is_cancelling());
        assert!(matches!(updates.last(), Some(Update::Completed(s)) if s.attempted() == 0));
        assert!(!dir.path().join("a_1.png").exists());
    }

    #[test]
    fn worker_panic_is_reported_as_crash() {
        let mut batch = Batch::spawn(|sender, _| {
            sender.send(Update::Started { total: 3 }).unwrap();
            panic!("decoder exploded");
        });

        let updates = drain(&mut batch);

        assert_eq!(batch.state(), BatchState::Completed);
        match updates.last() {
            Some(Update::Crashed(message)) => assert_eq!(message, "decoder exploded"),
            other => panic!("expected crash, got {:?}", other),
        }
    }
}
