//! Status codes for navigation mesh operations.
//!
//! A status is a packed bitmask: one base outcome bit combined orthogonally
//! with detail bits. Failures travel through `Result` as the error value;
//! operations that can partially succeed (path search, straight-path
//! extraction) return their status alongside the payload so callers can
//! observe `SUCCESS | PARTIAL_RESULT` style combinations.

use std::fmt;

/// Result type for navigation mesh operations
pub type Result<T> = std::result::Result<T, Status>;

/// Packed status value: base outcome bits plus orthogonal detail bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub u32);

impl Status {
    /// Operation failed
    pub const FAILURE: u32 = 1 << 31;
    /// Operation succeeded
    pub const SUCCESS: u32 = 1 << 30;
    /// Operation still in progress. Reserved; the synchronous query core
    /// never produces it.
    pub const IN_PROGRESS: u32 = 1 << 29;

    /// Mask covering all detail bits
    pub const DETAIL_MASK: u32 = 0x0fff_ffff;
    /// Input data is not recognized
    pub const WRONG_MAGIC: u32 = 1 << 0;
    /// Input data is in the wrong version
    pub const WRONG_VERSION: u32 = 1 << 1;
    /// Operation ran out of memory (tile slots, node pool allocation)
    pub const OUT_OF_MEMORY: u32 = 1 << 2;
    /// An input parameter was invalid (stale handle, bad buffer, bad index)
    pub const INVALID_PARAM: u32 = 1 << 3;
    /// Result buffer was too small; the output was truncated, not overflowed
    pub const BUFFER_TOO_SMALL: u32 = 1 << 4;
    /// Search ran out of nodes before resolving
    pub const OUT_OF_NODES: u32 = 1 << 5;
    /// Search did not reach the requested end, returning the best prefix
    pub const PARTIAL_RESULT: u32 = 1 << 6;
    /// A tile already occupies the given grid location
    pub const ALREADY_OCCUPIED: u32 = 1 << 7;

    /// Creates a status from raw flags
    pub const fn new(flags: u32) -> Self {
        Self(flags)
    }

    /// Plain success
    pub const fn success() -> Self {
        Self(Self::SUCCESS)
    }

    /// Plain failure
    pub const fn failure() -> Self {
        Self(Self::FAILURE)
    }

    /// Failure with detail bits
    pub const fn failure_detail(detail: u32) -> Self {
        Self(Self::FAILURE | detail)
    }

    /// Success with detail bits
    pub const fn success_detail(detail: u32) -> Self {
        Self(Self::SUCCESS | detail)
    }

    /// Failure with the invalid-parameter detail
    pub const fn invalid_param() -> Self {
        Self(Self::FAILURE | Self::INVALID_PARAM)
    }

    /// Failure with the out-of-memory detail
    pub const fn out_of_memory() -> Self {
        Self(Self::FAILURE | Self::OUT_OF_MEMORY)
    }

    /// Returns true if the base outcome is success
    pub const fn is_success(&self) -> bool {
        (self.0 & Self::SUCCESS) != 0
    }

    /// Returns true if the base outcome is failure
    pub const fn is_failure(&self) -> bool {
        (self.0 & Self::FAILURE) != 0
    }

    /// Returns true if the base outcome is in-progress
    pub const fn is_in_progress(&self) -> bool {
        (self.0 & Self::IN_PROGRESS) != 0
    }

    /// Returns true if the given detail bit is set
    pub const fn has_detail(&self, detail: u32) -> bool {
        (self.0 & detail) != 0
    }

    /// Returns the detail bits
    pub const fn detail(&self) -> u32 {
        self.0 & Self::DETAIL_MASK
    }

    /// Adds detail bits, keeping the base outcome
    pub const fn with_detail(self, detail: u32) -> Self {
        Self(self.0 | (detail & Self::DETAIL_MASK))
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::success()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            write!(f, "Success")?;
        } else if self.is_failure() {
            write!(f, "Failure")?;
        } else if self.is_in_progress() {
            write!(f, "In Progress")?;
        } else {
            write!(f, "Unknown")?;
        }

        let mut details = Vec::new();
        if self.has_detail(Self::WRONG_MAGIC) {
            details.push("Wrong Magic");
        }
        if self.has_detail(Self::WRONG_VERSION) {
            details.push("Wrong Version");
        }
        if self.has_detail(Self::OUT_OF_MEMORY) {
            details.push("Out of Memory");
        }
        if self.has_detail(Self::INVALID_PARAM) {
            details.push("Invalid Param");
        }
        if self.has_detail(Self::BUFFER_TOO_SMALL) {
            details.push("Buffer Too Small");
        }
        if self.has_detail(Self::OUT_OF_NODES) {
            details.push("Out of Nodes");
        }
        if self.has_detail(Self::PARTIAL_RESULT) {
            details.push("Partial Result");
        }
        if self.has_detail(Self::ALREADY_OCCUPIED) {
            details.push("Already Occupied");
        }

        if !details.is_empty() {
            write!(f, " ({})", details.join(", "))?;
        }

        Ok(())
    }
}

impl std::error::Error for Status {}

impl From<std::io::Error> for Status {
    // Only reachable from cursor reads on pre-validated buffers, so a
    // truncated read maps to the deserialization failure taxonomy.
    fn from(_: std::io::Error) -> Self {
        Status::invalid_param()
    }
}
