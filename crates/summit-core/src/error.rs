use thiserror::Error;

/// Protocol-wide error types for the Summit Protocol.
#[derive(Debug, Error)]
pub enum SummitError {
    /// Pool does not exist, is not live, or sits at a reserved elevation.
    #[error("Pool unavailable: {0}")]
    PoolUnavailable(String),

    /// Withdrawal exceeds the user's staked amount.
    #[error("Bad withdrawal: {0}")]
    BadWithdrawal(String),

    /// Elevation is locked: not yet unlocked, round not ended, or inside
    /// the pre-rollover lockout window.
    #[error("Elevation locked: {0}")]
    ElevationLocked(String),

    /// Rollover attempted before the randomness source resolved a seed
    /// covering the closing round.
    #[error("Round not seeded: {0}")]
    RoundNotSeeded(String),

    /// A sealed seed is already pending for the current cycle.
    #[error("Seed already sealed")]
    AlreadySealed,

    /// Unsealed seed submitted before the committed future marker.
    #[error("Future marker not reached: {0}")]
    FutureMarkerNotReached(String),

    /// Unsealed seed does not hash to the previously sealed value.
    #[error("Unsealed seed mismatch")]
    UnsealedMismatch,

    /// Tax configuration outside the permitted band.
    #[error("Invalid fee bounds: {0}")]
    InvalidFeeBounds(String),

    /// Totem index out of range, not selected, or an implicit switch attempt.
    #[error("Invalid totem: {0}")]
    InvalidTotem(String),

    /// Caller lacks the owner or trusted-seeder role.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid state transition or violated internal invariant.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SummitError {
    fn from(e: serde_json::Error) -> Self {
        SummitError::Serialization(e.to_string())
    }
}
