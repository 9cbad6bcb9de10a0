/// Asset state definitions for tracking download progress
///
/// This module defines the lifecycle of a single mirrored asset.
use std::fmt;

/// Represents the current download state of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetState {
    /// Asset has been created but no download was attempted yet
    Pending,

    /// A download is in flight
    Downloading,

    /// The last download attempt succeeded
    Downloaded,

    /// The last download attempt failed (network error, HTTP error or timeout)
    Failed,
}

impl AssetState {
    /// Returns true if no download is running and none will start on its own
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Downloaded | Self::Failed)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Downloaded)
    }

    /// Returns true if this represents a failed download
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Short lowercase label used in log lines and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Downloaded => "downloaded",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible asset states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Downloading,
            Self::Downloaded,
            Self::Failed,
        ]
    }
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
