use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_REQUIRED_TAPS: u32 = 3;
pub const DEFAULT_TAP_WINDOW: Duration = Duration::from_millis(500);

/// Hidden multi-tap gesture that opens the admin entry flow.
///
/// Each tap must land within `window` of the previous one. Reaching the
/// required count fires once and resets; a slow tap restarts the count at 1.
#[derive(Debug, Clone)]
pub struct TapSequence {
    required: u32,
    window: Duration,
    count: u32,
    last_tap: Option<Instant>,
}

impl Default for TapSequence {
    fn default() -> Self {
        Self::new(DEFAULT_REQUIRED_TAPS, DEFAULT_TAP_WINDOW)
    }
}

impl TapSequence {
    #[must_use]
    pub fn new(required: u32, window: Duration) -> Self {
        Self {
            required: required.max(1),
            window,
            count: 0,
            last_tap: None,
        }
    }

    /// Returns `true` when this tap completes the sequence.
    pub fn register_tap(&mut self, at: Instant) -> bool {
        let in_window = self
            .last_tap
            .is_some_and(|last| at.saturating_duration_since(last) <= self.window);
        self.count = if in_window { self.count + 1 } else { 1 };
        self.last_tap = Some(at);

        if self.count >= self.required {
            self.reset();
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.last_tap = None;
    }

    #[must_use]
    pub fn pending_taps(&self) -> u32 {
        self.count
    }
}
