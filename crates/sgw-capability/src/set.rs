//! Capability sets parsed from `allow` strings

use crate::capability::Capability;
use crate::error::CapabilityError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable set of capabilities held by one worklet
///
/// Built once from the worklet's `allow` string. There are no mutating
/// methods; a different permission set means a different worklet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<Capability>", from = "Vec<Capability>")]
pub struct CapabilitySet {
    bits: u8,
}

impl CapabilitySet {
    /// Set with no capabilities
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Set with every known capability
    #[must_use]
    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    /// Parse an `allow` string, ignoring tokens that are not recognised
    ///
    /// Tokens may be separated by `;`, `,` or whitespace. Unknown tokens are
    /// skipped so newer permission strings keep working on older hosts.
    #[must_use]
    pub fn parse(allow: &str) -> Self {
        let mut bits = 0;
        for token in tokens(allow) {
            match Capability::from_token(token) {
                Some(cap) => bits |= cap.bit(),
                None => tracing::debug!(token, "ignoring unknown capability token"),
            }
        }
        Self { bits }
    }

    /// Parse an `allow` string, rejecting the first unknown token
    ///
    /// # Errors
    /// - `CapabilityError::UnknownToken` if any token is not recognised
    pub fn parse_strict(allow: &str) -> Result<Self, CapabilityError> {
        tokens(allow)
            .map(str::parse::<Capability>)
            .collect::<Result<Self, _>>()
    }

    /// Check membership
    #[inline]
    #[must_use]
    pub const fn contains(&self, capability: Capability) -> bool {
        self.bits & capability.bit() != 0
    }

    /// Number of capabilities held
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// True if no capability is held
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Iterate in canonical order
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL
            .into_iter()
            .filter(move |cap| self.contains(*cap))
    }
}

fn tokens(allow: &str) -> impl Iterator<Item = &str> {
    allow
        .split(|c: char| c == ';' || c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let bits = iter.into_iter().fold(0, |acc, cap| acc | cap.bit());
        Self { bits }
    }
}

impl From<Vec<Capability>> for CapabilitySet {
    fn from(value: Vec<Capability>) -> Self {
        value.into_iter().collect()
    }
}

impl From<CapabilitySet> for Vec<Capability> {
    fn from(value: CapabilitySet) -> Self {
        value.iter().collect()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cap) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            f.write_str(cap.token())?;
        }
        Ok(())
    }
}
