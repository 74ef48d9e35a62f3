//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Verdictboard - compare AI and reviewer moderation verdicts per category
///
/// Aggregate a table snapshot into per-category verdict counts: how often
/// the AI and the human reviewer each judged records of a behavior category
/// as normal or as a violation.
///
/// Examples:
///   verdictboard --table table.json --behavior-field fld_b --ai-field fld_a --reviewer-field fld_r
///   verdictboard --table table.json --list-fields
///   verdictboard --table table.json --format json
///   verdictboard --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the table snapshot (JSON)
    ///
    /// Not required when using --init-config.
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub table: Option<PathBuf>,

    /// Column id holding the behavior category
    ///
    /// Overrides the [columns] section of .verdictboard.toml.
    #[arg(long, value_name = "FIELD_ID")]
    pub behavior_field: Option<String>,

    /// Column id holding the AI verdict
    #[arg(long, value_name = "FIELD_ID")]
    pub ai_field: Option<String>,

    /// Column id holding the reviewer verdict
    #[arg(long, value_name = "FIELD_ID")]
    pub reviewer_field: Option<String>,

    /// Canonical "normal" verdict string
    ///
    /// Matching is exact; defaults to 正常 unless overridden here or in config.
    #[arg(long, value_name = "LABEL", env = "VERDICTBOARD_NORMAL_LABEL")]
    pub normal_label: Option<String>,

    /// Canonical "violation" verdict string
    ///
    /// Matching is exact; defaults to 违规 unless overridden here or in config.
    #[arg(long, value_name = "LABEL", env = "VERDICTBOARD_VIOLATION_LABEL")]
    pub violation_label: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .verdictboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// List the snapshot's columns and exit (no aggregation)
    #[arg(long)]
    pub list_fields: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .verdictboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the aggregated series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref table) = self.table {
            if !table.exists() {
                return Err(format!("Table snapshot does not exist: {}", table.display()));
            }
        }

        if let Some(ref label) = self.normal_label {
            if label.is_empty() {
                return Err("Normal label must not be empty".to_string());
            }
        }
        if let Some(ref label) = self.violation_label {
            if label.is_empty() {
                return Err("Violation label must not be empty".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            table: None,
            behavior_field: Some("fld_b".to_string()),
            ai_field: Some("fld_a".to_string()),
            reviewer_field: Some("fld_r".to_string()),
            normal_label: None,
            violation_label: None,
            config: None,
            format: None,
            list_fields: false,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_missing_snapshot() {
        let mut args = make_args();
        args.table = Some(PathBuf::from("/nonexistent/table.json"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_empty_label() {
        let mut args = make_args();
        args.normal_label = Some(String::new());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
