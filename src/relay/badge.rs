//! Badge states and the observer that displays them.

use tracing::info;

/// Visual status marker for the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    InProgress,
    Success,
    Error,
}

impl Badge {
    pub fn text(self) -> &'static str {
        match self {
            Badge::InProgress => "...",
            Badge::Success => "✓",
            Badge::Error => "ERR",
        }
    }

    /// Background color as a hex string.
    pub fn color(self) -> &'static str {
        match self {
            Badge::InProgress => "#FF9800",
            Badge::Success => "#4CAF50",
            Badge::Error => "#F44336",
        }
    }
}

/// Receives the relay's user-visible side effects.
pub trait RelayObserver: Send + Sync {
    /// Show `badge`.
    fn set_badge(&self, badge: Badge);

    /// Ask the UI surface to open after a successful cycle.
    fn open_surface(&self) {}
}

/// Observer that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl RelayObserver for LogObserver {
    fn set_badge(&self, badge: Badge) {
        info!(badge = badge.text(), color = badge.color(), "badge updated");
    }
}
