use quiz_core::countdown::format_remaining;

/// Aggregated view of attempt progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining_unanswered: usize,
    /// 1-based position of the question on screen.
    pub current_position: usize,
    pub remaining_seconds: u32,
    pub low_time: bool,
}

impl SessionProgress {
    /// Remaining time as `m:ss`.
    #[must_use]
    pub fn clock_label(&self) -> String {
        format_remaining(self.remaining_seconds)
    }

    #[must_use]
    pub fn is_fully_answered(&self) -> bool {
        self.total > 0 && self.remaining_unanswered == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_label_formats_remaining_time() {
        let progress = SessionProgress {
            total: 5,
            answered: 5,
            remaining_unanswered: 0,
            current_position: 5,
            remaining_seconds: 65,
            low_time: false,
        };
        assert_eq!(progress.clock_label(), "1:05");
        assert!(progress.is_fully_answered());
    }
}
