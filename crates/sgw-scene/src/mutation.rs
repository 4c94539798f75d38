//! Writes a worklet may request

use crate::error::SceneError;
use crate::graph::NodeKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single proxy write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Mutation {
    /// Replace a material's base color factor (RGBA, each in `[0, 1]`)
    SetBaseColorFactor([f64; 4]),
    /// Replace a material's metallic factor (`[0, 1]`)
    SetMetallicFactor(f64),
    /// Replace a material's roughness factor (`[0, 1]`)
    SetRoughnessFactor(f64),
    /// Point an image (texture source) at a new URI
    SetImageUri(String),
}

impl Mutation {
    /// Operation name, as seen in logs and errors
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetBaseColorFactor(_) => "set_base_color_factor",
            Self::SetMetallicFactor(_) => "set_metallic_factor",
            Self::SetRoughnessFactor(_) => "set_roughness_factor",
            Self::SetImageUri(_) => "set_uri",
        }
    }

    /// Kind of node this mutation applies to
    #[must_use]
    pub const fn target_kind(&self) -> NodeKind {
        match self {
            Self::SetBaseColorFactor(_) | Self::SetMetallicFactor(_) | Self::SetRoughnessFactor(_) => {
                NodeKind::Material
            }
            Self::SetImageUri(_) => NodeKind::Image,
        }
    }

    /// Check arguments without touching any model
    ///
    /// # Errors
    /// - `SceneError::InvalidArgument` for non-finite or out-of-range factors,
    ///   or an empty / control-character URI
    pub fn validate(&self) -> Result<(), SceneError> {
        match self {
            Self::SetBaseColorFactor(rgba) => {
                for (channel, value) in rgba.iter().enumerate() {
                    check_unit(self.name(), *value).map_err(|_| {
                        SceneError::InvalidArgument(format!(
                            "{}: channel {channel} is {value}, expected a number in [0, 1]",
                            self.name()
                        ))
                    })?;
                }
                Ok(())
            }
            Self::SetMetallicFactor(value) | Self::SetRoughnessFactor(value) => {
                check_unit(self.name(), *value)
            }
            Self::SetImageUri(uri) => {
                if uri.trim().is_empty() {
                    return Err(SceneError::InvalidArgument(format!("{}: empty URI", self.name())));
                }
                if uri.chars().any(char::is_control) {
                    return Err(SceneError::InvalidArgument(format!(
                        "{}: URI contains control characters",
                        self.name()
                    )));
                }
                Ok(())
            }
        }
    }
}

fn check_unit(op: &str, value: f64) -> Result<(), SceneError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SceneError::InvalidArgument(format!(
            "{op}: {value} is not a number in [0, 1]"
        )))
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetBaseColorFactor(rgba) => write!(f, "{}({rgba:?})", self.name()),
            Self::SetMetallicFactor(v) | Self::SetRoughnessFactor(v) => {
                write!(f, "{}({v})", self.name())
            }
            Self::SetImageUri(uri) => write!(f, "{}({uri:?})", self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_range_is_enforced() {
        assert!(Mutation::SetBaseColorFactor([0.0, 0.5, 1.0, 1.0]).validate().is_ok());
        assert!(Mutation::SetBaseColorFactor([0.0, 0.5, 1.5, 1.0]).validate().is_err());
        assert!(Mutation::SetMetallicFactor(f64::NAN).validate().is_err());
        assert!(Mutation::SetRoughnessFactor(-0.1).validate().is_err());
        assert!(Mutation::SetRoughnessFactor(0.25).validate().is_ok());
    }

    #[test]
    fn uri_must_be_meaningful() {
        assert!(Mutation::SetImageUri("textures/wood.png".into()).validate().is_ok());
        assert!(Mutation::SetImageUri("   ".into()).validate().is_err());
        assert!(Mutation::SetImageUri("a\nb".into()).validate().is_err());
    }

    #[test]
    fn target_kinds() {
        assert_eq!(Mutation::SetMetallicFactor(0.0).target_kind(), NodeKind::Material);
        assert_eq!(Mutation::SetImageUri("x".into()).target_kind(), NodeKind::Image);
    }

    #[test]
    fn wire_shape() {
        let json = serde_json::to_value(Mutation::SetImageUri("a.png".into())).unwrap();
        assert_eq!(json, serde_json::json!({ "op": "set_image_uri", "value": "a.png" }));
    }
}
