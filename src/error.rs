//! Error type shared by every layer.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("bucket capacity must be greater than zero")]
    ZeroBucketCapacity,

    #[error("global depth {requested} is out of range, expected 1..={max}")]
    InvalidGlobalDepth { requested: u8, max: u8 },

    /// A full bucket and the incoming key share all 32 hash bits, so no
    /// split can separate them. Reported before anything is mutated.
    #[error("{capacity} stored keys and the new key all hash to {hash:#010x}; no split can separate them")]
    HashSaturated { hash: u32, capacity: usize },

    /// Reported by `validate()` only.
    #[error("directory slot {slot} is inconsistent: {reason}")]
    InvariantViolation { slot: usize, reason: String },
}
