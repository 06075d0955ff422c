//! Strongly typed identifier wrappers.
//!
//! Graph identifiers are zero-cost `u32` newtypes usable as direct indexes
//! into the store's SoA `Vec`s via `.index()`.  Agent identifiers are short
//! human-readable names (`"hazard"`, `"router"`, …) because they double as
//! message-bus queue names and appear in logs and mission records.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID" — equivalent to the type's MAX.
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

typed_id! {
    /// Dense index of a road-network node.
    pub struct NodeId(u32);
}

typed_id! {
    /// Dense index of a directed road-network edge (CSR position).
    pub struct EdgeId(u32);
}

// ── EdgeKey ───────────────────────────────────────────────────────────────────

/// Identity of one directed segment among parallel segments: `(u, v, k)`.
///
/// `k` is the parallel key — 0 for the first `u → v` segment loaded, 1 for
/// the second, and so on.  Two roads connecting the same pair of junctions
/// (e.g. a flyover and the road beneath it) get distinct keys.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeKey {
    pub u: NodeId,
    pub v: NodeId,
    pub k: u8,
}

impl EdgeKey {
    #[inline]
    pub fn new(u: NodeId, v: NodeId, k: u8) -> Self {
        Self { u, v, k }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.u.0, self.v.0, self.k)
    }
}

// ── AgentId ───────────────────────────────────────────────────────────────────

/// Name of an agent, used as its message-bus queue name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentId(String);

impl AgentId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
