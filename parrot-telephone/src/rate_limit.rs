//! Fixed-bucket rate window for relayed messages.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Counts messages in a sliding window; the call ends when a channel
/// exceeds its budget.
#[derive(Debug)]
pub struct MessageWindow {
    max_messages: u32,
    window: Duration,
    stamps: VecDeque<Instant>,
}

impl MessageWindow {
    /// Creates a window allowing `max_messages` per `window`.
    pub fn new(max_messages: u32, window: Duration) -> Self {
        Self {
            max_messages,
            window,
            stamps: VecDeque::with_capacity(max_messages as usize),
        }
    }

    /// Records a message at `now` and reports whether it fits the budget.
    pub fn allow(&mut self, now: Instant) -> bool {
        while let Some(&front) = self.stamps.front() {
            if now.duration_since(front) >= self.window {
                self.stamps.pop_front();
            } else {
                break;
            }
        }

        if self.stamps.len() as u32 >= self.max_messages {
            return false;
        }

        self.stamps.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_budget() {
        let mut window = MessageWindow::new(5, Duration::from_secs(5));
        let now = Instant::now();
        for _ in 0..5 {
            assert!(window.allow(now));
        }
        // Sixth message within the window trips the limit
        assert!(!window.allow(now));
    }

    #[test]
    fn test_expired_stamps_free_budget() {
        let mut window = MessageWindow::new(2, Duration::from_millis(50));
        let start = Instant::now();
        assert!(window.allow(start));
        assert!(window.allow(start));
        assert!(!window.allow(start));

        let later = start + Duration::from_millis(60);
        assert!(window.allow(later));
    }

    #[test]
    fn test_denied_message_still_counts_nothing() {
        let mut window = MessageWindow::new(1, Duration::from_secs(5));
        let now = Instant::now();
        assert!(window.allow(now));
        assert!(!window.allow(now));
        // Denial does not extend the window
        let later = now + Duration::from_secs(6);
        assert!(window.allow(later));
    }
}
