//! Script attachment surface

use serde::{Deserialize, Serialize};

/// `type` marking a script element as a scene-graph worklet
pub const WORKLET_SCRIPT_TYPE: &str = "experimental-scene-graph-worklet";

/// A script element attached to the host
///
/// Mirrors `<script type=... src=... allow=...>body</script>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptElement {
    #[serde(rename = "type")]
    pub script_type: String,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub allow: String,
}

/// Where a worklet's code comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// Code embedded in the element body
    Inline(String),
    /// Code fetched from a URL
    Url(String),
}

impl ScriptElement {
    /// Worklet element with an inline body
    #[must_use]
    pub fn inline(allow: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            script_type: WORKLET_SCRIPT_TYPE.to_string(),
            src: None,
            text: text.into(),
            allow: allow.into(),
        }
    }

    /// Worklet element loading its code from `src`
    #[must_use]
    pub fn external(allow: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            script_type: WORKLET_SCRIPT_TYPE.to_string(),
            src: Some(src.into()),
            text: String::new(),
            allow: allow.into(),
        }
    }

    /// True if this element should spawn a worklet
    #[inline]
    #[must_use]
    pub fn is_worklet(&self) -> bool {
        self.script_type.trim() == WORKLET_SCRIPT_TYPE
    }

    /// `src` wins over the inline body when both are present
    #[must_use]
    pub fn source(&self) -> ScriptSource {
        match self.src.as_deref().map(str::trim) {
            Some(src) if !src.is_empty() => ScriptSource::Url(src.to_string()),
            _ => ScriptSource::Inline(self.text.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifies_only_worklet_type() {
        assert!(ScriptElement::inline("", "").is_worklet());
        let plain = ScriptElement {
            script_type: "text/javascript".into(),
            ..ScriptElement::default()
        };
        assert!(!plain.is_worklet());
    }

    #[test]
    fn src_takes_precedence() {
        let mut element = ScriptElement::external("messaging", "worklet.rhai");
        element.text = "print(1);".into();
        assert_eq!(element.source(), ScriptSource::Url("worklet.rhai".into()));

        element.src = Some("  ".into());
        assert_eq!(element.source(), ScriptSource::Inline("print(1);".into()));
    }
}
