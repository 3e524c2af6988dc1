//! Window position arithmetic for history browsing.
//!
//! Once a server response has reported the dataset size, every mutation
//! re-establishes `0 <= position <= max_position <= total_count` with
//! `max_position = total_count - window_size` (saturating). Out-of-range
//! inputs are clamped, never rejected.
//!
//! Before that the total is unknown, or only a hint from the session listing
//! that may be stale for a session still recording. Positions are then sent
//! as asked and the server's answer does the clamping.

use vitalscope_protocol::WindowSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Start,
    Prev,
    Next,
    End,
}

impl Direction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "start" | "home" | "first" => Some(Direction::Start),
            "prev" | "previous" | "back" => Some(Direction::Prev),
            "next" | "forward" => Some(Direction::Next),
            "end" | "last" => Some(Direction::End),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowCursor {
    position: u64,
    window_size: u64,
    total_count: u64,
    max_position: u64,
    /// Follows `total_count` on every update while set.
    full: bool,
    /// A response has reported `total_count`.
    total_known: bool,
}

impl WindowCursor {
    pub fn new(size: WindowSize) -> Self {
        let mut cursor = Self {
            position: 0,
            window_size: 1,
            total_count: 0,
            max_position: 0,
            full: false,
            total_known: false,
        };
        cursor.resize(size);
        cursor
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn max_position(&self) -> u64 {
        self.max_position
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn is_total_known(&self) -> bool {
        self.total_known
    }

    /// Size to put on the wire for the current window.
    pub fn requested_size(&self) -> WindowSize {
        if self.full {
            WindowSize::Full
        } else {
            WindowSize::Samples(self.window_size)
        }
    }

    /// Samples actually covered: the window, cut at the end of the dataset
    /// when its size is known.
    pub fn window_len(&self) -> u64 {
        if !self.total_known {
            return self.window_size;
        }
        self.window_size
            .min(self.total_count.saturating_sub(self.position))
    }

    /// Exclusive end index of the current window.
    pub fn window_end(&self) -> u64 {
        self.position.saturating_add(self.window_len())
    }

    /// Dataset size as reported by the server.
    pub fn set_total(&mut self, total_count: u64) {
        self.total_known = true;
        self.apply_total(total_count);
    }

    /// Dataset size from a listing. Sizes a full window and gives `End` a
    /// target, but never pulls a position back. Ignored once the server has
    /// reported a total.
    pub fn hint_total(&mut self, total_count: u64) {
        if !self.total_known {
            self.apply_total(total_count);
        }
    }

    fn apply_total(&mut self, total_count: u64) {
        self.total_count = total_count;
        if self.full {
            self.window_size = total_count.max(1);
            self.position = 0;
        }
        self.reclamp();
    }

    pub fn resize(&mut self, size: WindowSize) {
        match size {
            WindowSize::Full => {
                self.full = true;
                self.window_size = self.total_count.max(1);
                self.position = 0;
            }
            WindowSize::Samples(count) => {
                self.full = false;
                self.window_size = count.max(1);
                // Keep the window whole instead of truncating at the tail.
                if self.total_known
                    && self.position.saturating_add(self.window_size) > self.total_count
                {
                    self.position = self.total_count.saturating_sub(self.window_size);
                }
            }
        }
        self.reclamp();
    }

    /// Moves by half a window (overlapping pages) or jumps to either end.
    pub fn navigate(&mut self, direction: Direction) {
        let step = (self.window_size / 2).max(1);
        self.position = match direction {
            Direction::Start => 0,
            Direction::End => self.max_position,
            Direction::Prev => self.position.saturating_sub(step),
            Direction::Next => self.position.saturating_add(step),
        };
        self.reclamp();
    }

    pub fn set_position(&mut self, position: u64) {
        self.position = position;
        self.reclamp();
    }

    fn reclamp(&mut self) {
        self.max_position = self.total_count.saturating_sub(self.window_size);
        if self.total_known {
            self.position = self.position.min(self.max_position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(total: u64, size: u64) -> WindowCursor {
        let mut cursor = WindowCursor::new(WindowSize::Samples(size));
        cursor.set_total(total);
        cursor
    }

    fn assert_invariant(cursor: &WindowCursor) {
        assert_eq!(
            cursor.max_position(),
            cursor.total_count().saturating_sub(cursor.window_size())
        );
        assert!(cursor.position() <= cursor.max_position());
        assert!(cursor.max_position() <= cursor.total_count());
        if cursor.window_size() < cursor.total_count() {
            assert!(cursor.position() + cursor.window_size() <= cursor.total_count());
        } else {
            assert_eq!(cursor.position(), 0);
        }
    }

    #[test]
    fn test_next_past_the_end_clamps_to_max_position() {
        let mut cursor = cursor(10_000, 1_000);
        cursor.set_position(9_500);
        cursor.navigate(Direction::Next);
        assert_eq!(cursor.position(), 9_000);
        assert_eq!(cursor.max_position(), 9_000);
    }

    #[test]
    fn test_end_then_next_is_idempotent() {
        let mut cursor = cursor(7_321, 1_000);
        cursor.navigate(Direction::End);
        let at_end = cursor.position();
        cursor.navigate(Direction::Next);
        assert_eq!(cursor.position(), at_end);
    }

    #[test]
    fn test_steps_are_half_a_window() {
        let mut cursor = cursor(10_000, 1_000);
        cursor.navigate(Direction::Next);
        assert_eq!(cursor.position(), 500);
        cursor.navigate(Direction::Next);
        assert_eq!(cursor.position(), 1_000);
        cursor.navigate(Direction::Prev);
        assert_eq!(cursor.position(), 500);
        cursor.navigate(Direction::Start);
        assert_eq!(cursor.position(), 0);
        cursor.navigate(Direction::Prev);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_full_sentinel_covers_dataset() {
        let mut cursor = cursor(5_000, 1_000);
        cursor.set_position(2_000);
        cursor.resize(WindowSize::from_raw(-1));
        assert_eq!(cursor.window_size(), 5_000);
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.requested_size(), WindowSize::Full);
    }

    #[test]
    fn test_full_window_follows_later_totals() {
        let mut cursor = WindowCursor::new(WindowSize::Full);
        cursor.set_total(1_234);
        assert_eq!(cursor.window_size(), 1_234);
        cursor.set_total(2_000);
        assert_eq!(cursor.window_size(), 2_000);
        assert_eq!(cursor.max_position(), 0);
    }

    #[test]
    fn test_growing_window_pulls_position_back_inside() {
        let mut cursor = cursor(10_000, 1_000);
        cursor.navigate(Direction::End);
        cursor.resize(WindowSize::Samples(4_000));
        assert_eq!(cursor.position(), 6_000);
        assert_eq!(cursor.window_end(), 10_000);
    }

    #[test]
    fn test_shrinking_total_clamps_position() {
        let mut cursor = cursor(10_000, 1_000);
        cursor.set_position(8_000);
        cursor.set_total(3_000);
        assert_eq!(cursor.position(), 2_000);
    }

    #[test]
    fn test_window_larger_than_dataset_pins_to_zero() {
        let mut cursor = cursor(300, 1_000);
        cursor.set_position(50);
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.window_len(), 300);
    }

    #[test]
    fn test_empty_dataset_full_window_stays_positive() {
        let cursor = {
            let mut cursor = WindowCursor::new(WindowSize::Full);
            cursor.set_total(0);
            cursor
        };
        assert_eq!(cursor.window_size(), 1);
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.window_len(), 0);
    }

    #[test]
    fn test_unknown_total_sends_position_as_asked() {
        let mut cursor = WindowCursor::new(WindowSize::Samples(1_000));
        cursor.set_position(5_000);
        assert_eq!(cursor.position(), 5_000);
        assert_eq!(cursor.window_len(), 1_000);
        assert_eq!(cursor.window_end(), 6_000);
        cursor.navigate(Direction::Next);
        assert_eq!(cursor.position(), 5_500);

        cursor.set_total(3_000);
        assert!(cursor.is_total_known());
        assert_eq!(cursor.position(), 2_000);
    }

    #[test]
    fn test_listing_hint_does_not_bound_positions() {
        let mut cursor = WindowCursor::new(WindowSize::Samples(1_000));
        cursor.hint_total(4_000);
        assert!(!cursor.is_total_known());
        cursor.set_position(7_500);
        assert_eq!(cursor.position(), 7_500);
        cursor.navigate(Direction::End);
        assert_eq!(cursor.position(), 3_000);

        cursor.set_total(10_000);
        cursor.hint_total(10);
        assert_eq!(cursor.total_count(), 10_000);
    }

    #[test]
    fn test_hint_sizes_full_window() {
        let mut cursor = WindowCursor::new(WindowSize::Full);
        cursor.hint_total(37);
        assert_eq!(cursor.window_size(), 37);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_invariant_holds_across_operation_sequences() {
        let totals = [0, 1, 99, 100, 101, 1_000, 9_999, 10_000, 123_457];
        let sizes = [1, 2, 100, 999, 1_000, 50_000];
        let positions = [0, 1, 500, 9_500, 200_000];

        for &total in &totals {
            for &size in &sizes {
                let mut cursor = cursor(total, size);
                assert_invariant(&cursor);
                for &position in &positions {
                    cursor.set_position(position);
                    assert_invariant(&cursor);
                    for direction in [
                        Direction::Next,
                        Direction::Next,
                        Direction::Prev,
                        Direction::End,
                        Direction::Start,
                    ] {
                        cursor.navigate(direction);
                        assert_invariant(&cursor);
                    }
                    cursor.resize(WindowSize::Samples(size * 3));
                    assert_invariant(&cursor);
                    cursor.resize(WindowSize::Full);
                    assert_invariant(&cursor);
                    cursor.resize(WindowSize::Samples(size));
                    assert_invariant(&cursor);
                }
            }
        }
    }
}
