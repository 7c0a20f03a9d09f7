//! Newtype identifier wrappers.
//!
//! Workers name themselves with their own OS pid at JOIN time, and the
//! control channel addresses replies by the requester's pid. Both are plain
//! `u32` values on the wire, but they identify different things and must
//! never be mixed, so each gets its own newtype.

use serde::{Deserialize, Serialize};

/// Identifier of one worker (animal) process.
///
/// Assigned by the worker itself, which reports its OS pid in its JOIN
/// request, and used by the environment as the registry key, the wait-set
/// member, and the process-termination target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerId(u32);

impl WorkerId {
    /// Wrap a raw pid value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Return the raw pid value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reply address of one control-channel client.
///
/// The administrative protocol prefixes every request with the requester's
/// pid; the environment routes the reply back using that value. Requesters
/// are not workers and never appear in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequesterId(u32);

impl RequesterId {
    /// Wrap a raw pid value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Return the raw pid value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for RequesterId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
