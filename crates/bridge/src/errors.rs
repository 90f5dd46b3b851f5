use thiserror::Error;

/// Outcomes of queue operations that are not a plain success.
///
/// `Full` and `Empty` are ordinary control flow for the producer and the
/// consumer respectively. The other variants only come out of invalid
/// construction or read parameters.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue is full")]
    Full,

    #[error("Not enough frames queued yet")]
    Empty,

    #[error("Queue capacity must be at least 1")]
    InvalidCapacity,

    #[error("Window of {window} frames is invalid for capacity {capacity}")]
    InvalidWindow { window: usize, capacity: usize },
}

impl QueueError {
    /// True for the outcomes a caller is expected to branch on rather than report.
    pub fn is_expected(&self) -> bool {
        matches!(self, QueueError::Full | QueueError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        assert_eq!(
            QueueError::Full.to_string(),
            "Queue is full",
            "Full should display correct message"
        );

        assert_eq!(
            QueueError::Empty.to_string(),
            "Not enough frames queued yet",
            "Empty should display correct message"
        );

        assert_eq!(
            QueueError::InvalidCapacity.to_string(),
            "Queue capacity must be at least 1",
            "InvalidCapacity should display correct message"
        );

        let err = QueueError::InvalidWindow {
            window: 8,
            capacity: 3,
        };
        assert_eq!(
            err.to_string(),
            "Window of 8 frames is invalid for capacity 3",
            "InvalidWindow should include window and capacity"
        );
    }

    #[test]
    fn test_expected_outcomes() {
        assert!(QueueError::Full.is_expected());
        assert!(QueueError::Empty.is_expected());
        assert!(!QueueError::InvalidCapacity.is_expected());
        assert!(
            !QueueError::InvalidWindow {
                window: 0,
                capacity: 1
            }
            .is_expected()
        );
    }
}
