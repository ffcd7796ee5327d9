#[derive(Clone, Debug, Default)]
pub struct Progress {
    pub success: u32,
    pub failed: u32,
    pub total: u32,
}

impl Progress {
    pub fn new(total: u32) -> Self {
        Self {
            success: 0,
            failed: 0,
            total,
        }
    }

    pub fn increment_success(&mut self) {
        self.success += 1;
    }

    pub fn increment_failed(&mut self) {
        self.failed += 1;
    }

    pub fn processed(&self) -> u32 {
        self.success + self.failed
    }

    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.processed() as f32 / self.total as f32
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Cancelled,
}
