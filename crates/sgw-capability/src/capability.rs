//! Capability tokens

use crate::error::CapabilityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named permission unlocking one category of sandbox operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Write access to material factors (base color, metallic, roughness)
    MaterialProperties,
    /// Write access to texture sources
    Textures,
    /// Sandbox-initiated messages to the host application
    Messaging,
}

impl Capability {
    /// Every known capability, in canonical order
    pub const ALL: [Capability; 3] = [
        Capability::MaterialProperties,
        Capability::Textures,
        Capability::Messaging,
    ];

    /// Token used in `allow` strings
    #[inline]
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Capability::MaterialProperties => "material-properties",
            Capability::Textures => "textures",
            Capability::Messaging => "messaging",
        }
    }

    /// Look up a capability by token (case-insensitive, surrounding whitespace ignored)
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|cap| cap.token().eq_ignore_ascii_case(token))
    }

    /// Bit used by [`crate::CapabilitySet`]
    #[inline]
    pub(crate) const fn bit(self) -> u8 {
        match self {
            Capability::MaterialProperties => 0b001,
            Capability::Textures => 0b010,
            Capability::Messaging => 0b100,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Capability {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| CapabilityError::UnknownToken(s.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_lookup_is_case_insensitive() {
        assert_eq!(
            Capability::from_token(" Material-Properties "),
            Some(Capability::MaterialProperties)
        );
        assert_eq!(Capability::from_token("TEXTURES"), Some(Capability::Textures));
        assert_eq!(Capability::from_token("fetch"), None);
    }

    #[test]
    fn from_str_reports_unknown_token() {
        let err = "camera".parse::<Capability>().unwrap_err();
        assert_eq!(err, CapabilityError::UnknownToken("camera".to_string()));
    }

    #[test]
    fn serde_uses_tokens() {
        let json = serde_json::to_string(&Capability::MaterialProperties).unwrap();
        assert_eq!(json, "\"material-properties\"");
        let back: Capability = serde_json::from_str("\"messaging\"").unwrap();
        assert_eq!(back, Capability::Messaging);
    }

    #[test]
    fn bits_are_distinct() {
        let mut seen = 0u8;
        for cap in Capability::ALL {
            assert_eq!(seen & cap.bit(), 0);
            seen |= cap.bit();
        }
    }
}
