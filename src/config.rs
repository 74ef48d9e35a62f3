//! Configuration handling.
//!
//! Two layers live here: [`WidgetConfig`], the three column references the
//! host config store persists (and the gate over them), and the
//! `.verdictboard.toml` file the CLI shell reads for local runs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The widget's persisted column selection.
///
/// Each reference is either unset or a stable column id in the active table.
/// Aggregation only runs when all three are set; see [`is_complete`].
///
/// [`is_complete`]: WidgetConfig::is_complete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Column holding the behavior category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior_field_id: Option<String>,
    /// Column holding the AI verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_field_id: Option<String>,
    /// Column holding the reviewer verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_field_id: Option<String>,
}

impl WidgetConfig {
    /// The configuration gate: true only when all three column references
    /// are set to non-empty ids. While false, the engine publishes an
    /// incomplete-configuration state instead of running accessors.
    pub fn is_complete(&self) -> bool {
        [
            &self.behavior_field_id,
            &self.ai_field_id,
            &self.reviewer_field_id,
        ]
        .iter()
        .all(|id| id.as_deref().map(|s| !s.is_empty()).unwrap_or(false))
    }

    /// The three ids in (behavior, ai, reviewer) order, once the gate holds.
    ///
    /// Returns `None` when the configuration is incomplete.
    pub fn column_ids(&self) -> Option<(&str, &str, &str)> {
        match (
            self.behavior_field_id.as_deref(),
            self.ai_field_id.as_deref(),
            self.reviewer_field_id.as_deref(),
        ) {
            (Some(b), Some(a), Some(r)) if !b.is_empty() && !a.is_empty() && !r.is_empty() => {
                Some((b, a, r))
            }
            _ => None,
        }
    }
}

/// The canonical verdict strings matched against normalized cell text.
///
/// Matching is exact-string, so hosts that localize their verdict options
/// override these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictLabels {
    /// Canonical "normal" verdict.
    #[serde(default = "default_normal_label")]
    pub normal: String,
    /// Canonical "violation" verdict.
    #[serde(default = "default_violation_label")]
    pub violation: String,
}

impl Default for VerdictLabels {
    fn default() -> Self {
        Self {
            normal: default_normal_label(),
            violation: default_violation_label(),
        }
    }
}

fn default_normal_label() -> String {
    "正常".to_string()
}

fn default_violation_label() -> String {
    "违规".to_string()
}

/// Root of the `.verdictboard.toml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Column selection.
    #[serde(default)]
    pub columns: WidgetConfig,

    /// Verdict label overrides.
    #[serde(default)]
    pub labels: VerdictLabels,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Default output format ("table" or "json").
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            format: default_format(),
        }
    }
}

fn default_format() -> String {
    "table".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but
    /// can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".verdictboard.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings; only
    /// explicitly provided values override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref id) = args.behavior_field {
            self.columns.behavior_field_id = Some(id.clone());
        }
        if let Some(ref id) = args.ai_field {
            self.columns.ai_field_id = Some(id.clone());
        }
        if let Some(ref id) = args.reviewer_field {
            self.columns.reviewer_field_id = Some(id.clone());
        }

        if let Some(ref label) = args.normal_label {
            self.labels.normal = label.clone();
        }
        if let Some(ref label) = args.violation_label {
            self.labels.violation = label.clone();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_config() -> WidgetConfig {
        WidgetConfig {
            behavior_field_id: Some("fld_b".to_string()),
            ai_field_id: Some("fld_a".to_string()),
            reviewer_field_id: Some("fld_r".to_string()),
        }
    }

    #[test]
    fn test_gate_requires_all_three() {
        assert!(complete_config().is_complete());

        let mut config = complete_config();
        config.reviewer_field_id = None;
        assert!(!config.is_complete());

        // Empty string counts as unset.
        let mut config = complete_config();
        config.ai_field_id = Some(String::new());
        assert!(!config.is_complete());
        assert!(config.column_ids().is_none());

        assert!(!WidgetConfig::default().is_complete());
    }

    #[test]
    fn test_column_ids_order() {
        let config = complete_config();
        assert_eq!(config.column_ids(), Some(("fld_b", "fld_a", "fld_r")));
    }

    #[test]
    fn test_default_labels() {
        let labels = VerdictLabels::default();
        assert_eq!(labels.normal, "正常");
        assert_eq!(labels.violation, "违规");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true
format = "json"

[columns]
behavior_field_id = "fld_b"
ai_field_id = "fld_a"

[labels]
normal = "normal"
violation = "violation"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.general.format, "json");
        assert_eq!(config.columns.behavior_field_id.as_deref(), Some("fld_b"));
        assert!(config.columns.reviewer_field_id.is_none());
        assert!(!config.columns.is_complete());
        assert_eq!(config.labels.normal, "normal");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[labels]"));
    }
}
