use serde::{Deserialize, Serialize};

/// Outcome of one independent check on an event.
///
/// `NotVerified` means there was nothing to check against (no proof, no
/// signature, verification disabled, root unavailable). `Failed` means
/// material was present and rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    /// No material to verify against.
    #[default]
    NotVerified,
    /// Material was present and verified.
    Success,
    /// Material was present and did not verify.
    Failed,
}

impl Verification {
    /// Maps a completed check to `Success` or `Failed`.
    pub fn from_outcome(ok: bool) -> Self {
        if ok {
            Self::Success
        } else {
            Self::Failed
        }
    }

    /// True for [`Verification::Success`].
    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// True for [`Verification::Failed`].
    pub fn is_failed(self) -> bool {
        self == Self::Failed
    }
}
