/// Upper bound on progress reports per upload.
const MAX_REPORTS: u64 = 100;

/// Decides which blocks of an upload emit a progress report.
///
/// Reports every `max(1, total / 100)` blocks and always on the last one, so
/// a one-block upload still reports completion and a huge upload does not
/// flood the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressCadence {
    total: u64,
    step: u64,
}

impl ProgressCadence {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            step: (total / MAX_REPORTS).max(1),
        }
    }

    /// `done` counts blocks completed so far (1-based).
    pub fn should_report(&self, done: u64) -> bool {
        done > 0 && (done == self.total || done % self.step == 0)
    }

    pub fn step(&self) -> u64 {
        self.step
    }
}
