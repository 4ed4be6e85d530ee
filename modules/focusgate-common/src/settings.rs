use serde::{Deserialize, Serialize};

use crate::error::FocusError;

/// Decision policy applied when the heuristic is inconclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// Only confirmed-productive content gets through. Fails closed.
    #[serde(alias = "STRICTEST")]
    Strict,
    /// Weighs both lists plus general judgment. Fails open.
    #[default]
    Lenient,
}

/// Minimum ratio one keyword category must beat the other by.
///
/// Always >= 1.0. [`TryFrom<f64>`] rejects invalid input; deserialising
/// stored settings falls back to the default instead.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "StoredRatio", into = "f64")]
pub struct DominanceRatio(f64);

impl DominanceRatio {
    pub const DEFAULT: f64 = 2.0;
    pub const MIN: f64 = 1.0;

    /// Accept a user-entered value, replacing anything invalid with the default.
    pub fn from_user_input(value: f64) -> Self {
        Self::try_from(value).unwrap_or_default()
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for DominanceRatio {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<f64> for DominanceRatio {
    type Error = FocusError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value < Self::MIN {
            return Err(FocusError::Validation(format!(
                "dominance ratio must be a finite number >= {}, got {value}",
                Self::MIN
            )));
        }
        Ok(Self(value))
    }
}

#[derive(Deserialize)]
#[serde(transparent)]
struct StoredRatio(f64);

impl From<StoredRatio> for DominanceRatio {
    fn from(stored: StoredRatio) -> Self {
        Self::from_user_input(stored.0)
    }
}

impl From<DominanceRatio> for f64 {
    fn from(ratio: DominanceRatio) -> Self {
        ratio.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHomepages {
    #[serde(default)]
    pub video_site: bool,
    #[serde(default)]
    pub forum_site: bool,
}

/// URL rules evaluated before any identity-based state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRules {
    /// Matched by exact string equality.
    #[serde(default)]
    pub exact: Vec<String>,
    /// `scheme://` prefixes, or `host[/path-prefix]` patterns.
    #[serde(default)]
    pub prefix: Vec<String>,
}

impl UrlRules {
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefix.is_empty()
    }

    /// Add an exact rule. Returns false if it was blank or already present.
    pub fn add_exact(&mut self, rule: &str) -> bool {
        push_unique(&mut self.exact, rule)
    }

    /// Add a prefix rule. Returns false if it was blank or already present.
    pub fn add_prefix(&mut self, rule: &str) -> bool {
        push_unique(&mut self.prefix, rule)
    }
}

fn push_unique(list: &mut Vec<String>, rule: &str) -> bool {
    let rule = rule.trim();
    if rule.is_empty() || list.iter().any(|r| r == rule) {
        return false;
    }
    list.push(rule.to_string());
    true
}

/// Everything the settings surface writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub productive_content: String,
    #[serde(default)]
    pub unwanted_content: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub block_homepages: BlockHomepages,
    #[serde(default)]
    pub url_rules: UrlRules,
    #[serde(default)]
    pub dominance_ratio: DominanceRatio,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_below_one_is_rejected() {
        assert!(DominanceRatio::try_from(0.5).is_err());
        assert!(DominanceRatio::try_from(f64::NAN).is_err());
        assert_eq!(DominanceRatio::try_from(1.0).unwrap().value(), 1.0);
    }

    #[test]
    fn user_input_falls_back_to_default() {
        assert_eq!(DominanceRatio::from_user_input(0.2).value(), 2.0);
        assert_eq!(DominanceRatio::from_user_input(3.5).value(), 3.5);
    }

    #[test]
    fn stored_invalid_ratio_is_clamped_on_load() {
        let settings: Settings = serde_json::from_str(r#"{"dominance_ratio": 0.3}"#).unwrap();
        assert_eq!(settings.dominance_ratio.value(), DominanceRatio::DEFAULT);
    }

    #[test]
    fn legacy_strictest_mode_maps_to_strict() {
        let mode: Mode = serde_json::from_str(r#""STRICTEST""#).unwrap();
        assert_eq!(mode, Mode::Strict);
        let mode: Mode = serde_json::from_str(r#""LENIENT""#).unwrap();
        assert_eq!(mode, Mode::Lenient);
    }

    #[test]
    fn empty_settings_use_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.mode, Mode::Lenient);
        assert_eq!(settings.dominance_ratio.value(), 2.0);
        assert!(settings.url_rules.is_empty());
        assert!(!settings.block_homepages.video_site);
    }

    #[test]
    fn url_rules_skip_blank_and_duplicate() {
        let mut rules = UrlRules::default();
        assert!(rules.add_prefix(" reddit.com/r/funny "));
        assert!(!rules.add_prefix("reddit.com/r/funny"));
        assert!(!rules.add_exact("   "));
        assert_eq!(rules.prefix, vec!["reddit.com/r/funny"]);
    }
}
