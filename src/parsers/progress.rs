use tracing::trace;

/// Turns a running byte count into whole-percent progress callbacks.
///
/// Emitted values never decrease and are never repeated. The first value (0)
/// is emitted by [`start`](Self::start) before any byte is consumed and the
/// last one is always 100, emitted by [`finish`](Self::finish) if it has not
/// been reached already.
pub struct ProgressReporter<F: FnMut(u8)> {
    total_bytes: u64,
    bytes_read: u64,
    last_reported: Option<u8>,
    callback: F,
}

impl<F: FnMut(u8)> ProgressReporter<F> {
    pub fn new(total_bytes: u64, callback: F) -> Self {
        Self {
            total_bytes,
            bytes_read: 0,
            last_reported: None,
            callback,
        }
    }

    /// Emit the starting value (0)
    pub fn start(&mut self) {
        self.report(0);
    }

    /// Account for `bytes` more bytes consumed. Returns `true` when a new
    /// percentage was emitted, in which case the caller should yield.
    pub fn advance(&mut self, bytes: u64) -> bool {
        self.bytes_read = self.bytes_read.saturating_add(bytes);

        // an empty declared size means "done" as soon as we are finished, never a division
        if self.total_bytes == 0 {
            return false;
        }

        let percent = (self.bytes_read.saturating_mul(100) / self.total_bytes).min(100) as u8;
        self.report(percent)
    }

    /// Emit 100 unless it was already emitted
    pub fn finish(&mut self) {
        self.report(100);
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn last_reported(&self) -> Option<u8> {
        self.last_reported
    }

    fn report(&mut self, percent: u8) -> bool {
        if self.last_reported.is_some_and(|last| percent <= last) {
            return false;
        }

        trace!("Progress {}% ({} of {} bytes)", percent, self.bytes_read, self.total_bytes);
        self.last_reported = Some(percent);
        (self.callback)(percent);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(total: u64, chunks: &[u64]) -> Vec<u8> {
        let mut seen = Vec::new();
        let mut reporter = ProgressReporter::new(total, |p| seen.push(p));
        reporter.start();
        for &chunk in chunks {
            reporter.advance(chunk);
        }
        reporter.finish();
        seen
    }

    #[test]
    fn test_reports_only_on_change() {
        assert_eq!(run(1000, &[1, 1, 8, 490, 500]), vec![0, 1, 50, 100]);
    }

    #[test]
    fn test_rounding_short_of_100_is_forced() {
        // 299 / 300 floors to 99
        assert_eq!(run(300, &[299]), vec![0, 99, 100]);
    }

    #[test]
    fn test_zero_total_never_divides() {
        assert_eq!(run(0, &[]), vec![0, 100]);
        assert_eq!(run(0, &[10, 20]), vec![0, 100]);
    }

    #[test]
    fn test_overrun_is_clamped() {
        assert_eq!(run(10, &[5, 50]), vec![0, 50, 100]);
    }

    #[test]
    fn test_chunking_does_not_change_endpoints() {
        for chunks in [vec![100u64], vec![1; 100], vec![33, 33, 34], vec![99, 1]] {
            let seen = run(100, &chunks);
            assert_eq!(seen.first(), Some(&0));
            assert_eq!(seen.last(), Some(&100));
            assert!(seen.windows(2).all(|w| w[0] < w[1]), "{seen:?}");
        }
    }

    #[test]
    fn test_advance_signals_yield() {
        let mut reporter = ProgressReporter::new(200, |_| {});
        reporter.start();
        assert!(!reporter.advance(1));
        assert!(reporter.advance(1));
        assert_eq!(reporter.last_reported(), Some(1));
        assert_eq!(reporter.bytes_read(), 2);
    }
}
