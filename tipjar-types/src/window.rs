use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Optional time range outside of which donations are refused.
///
/// When `enabled` is false, `start` and `end` carry no meaning.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationWindow {
    pub enabled: bool,
    pub start: Timestamp,
    pub end: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    Unrestricted,
    Open,
    NotYetOpen,
    Closed,
}

impl DonationWindow {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new<T: Into<Timestamp>>(start: T, end: T) -> Self {
        Self {
            enabled: true,
            start: start.into(),
            end: end.into(),
        }
    }

    /// Both bounds are inclusive. An enabled window whose start lies after
    /// its end admits nothing.
    pub fn status(&self, now: Timestamp) -> WindowStatus {
        if !self.enabled {
            return WindowStatus::Unrestricted;
        }
        if now < self.start {
            WindowStatus::NotYetOpen
        } else if now > self.end {
            WindowStatus::Closed
        } else {
            WindowStatus::Open
        }
    }

    pub fn admits(&self, now: Timestamp) -> bool {
        matches!(
            self.status(now),
            WindowStatus::Unrestricted | WindowStatus::Open
        )
    }

    pub fn is_inverted(&self) -> bool {
        self.enabled && self.start > self.end
    }
}
