use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ManifestError, Result};
use crate::models::{AgeRange, DomainPolicy, FilterSpec, PassengerTable, Selection};

/// Default time-to-live of the cached record set, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

/// Longest accepted cache time-to-live, in seconds.
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// Default table queried on the hosted database.
pub const DEFAULT_TABLE: &str = "Passengers";

/// Column the hosted table is paged by unless `--order-by` says otherwise.
pub const DEFAULT_ORDER_COLUMN: &str = "id";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Explore a passenger manifest: filter it and summarise the result
#[derive(Parser, Debug, Clone)]
#[command(
    name = "manifest-view",
    about = "Explore a passenger manifest: filter it and summarise the result",
    version
)]
pub struct Settings {
    /// Where the records come from
    #[arg(long, default_value = "file", value_parser = ["file", "postgrest"])]
    pub source: String,

    /// JSON / JSONL file or directory used by the file source
    #[arg(long, env = "MANIFEST_DATA_PATH")]
    pub data_path: Option<PathBuf>,

    /// Base URL of the hosted database REST endpoint
    #[arg(long, env = "SUPABASE_URL", hide_env_values = true)]
    pub url: Option<String>,

    /// API key for the hosted database
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Table to query
    #[arg(long, default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Unique column used to page through the table
    #[arg(long, default_value = DEFAULT_ORDER_COLUMN)]
    pub order_by: String,

    /// Seconds a loaded record set stays cached (0-86400)
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL_SECS, value_parser = clap::value_parser!(u64).range(0..=MAX_CACHE_TTL_SECS))]
    pub cache_ttl: u64,

    /// Drop rows with an out-of-domain class or survival value instead of coercing them
    #[arg(long)]
    pub strict: bool,

    /// Initial class filter ("All" or 1-3)
    #[arg(long, default_value = "All")]
    pub class: String,

    /// Initial gender filter ("All", "male", "female", ...)
    #[arg(long, default_value = "All")]
    pub gender: String,

    /// Initial lower age bound (defaults to the youngest passenger)
    #[arg(long)]
    pub min_age: Option<f64>,

    /// Initial upper age bound (defaults to the oldest passenger)
    #[arg(long)]
    pub max_age: Option<f64>,

    /// View mode
    #[arg(long, default_value = "dashboard", value_parser = ["dashboard", "summary"])]
    pub view: String,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.manifest-view/last_used.json`.
///
/// Credentials are never part of this file.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl LastUsedParams {
    /// Uses `~/.manifest-view/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".manifest-view").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with an explicit argument
    /// list and config path, so tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::apply_debug_flag(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. clap stores the arg id using the field name.
        if !is_arg_explicitly_set(&matches, "source") {
            if let Some(v) = last.source {
                settings.source = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "data_path") && settings.data_path.is_none() {
            settings.data_path = last.data_path;
        }
        if !is_arg_explicitly_set(&matches, "table") {
            if let Some(v) = last.table {
                settings.table = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "order_by") {
            if let Some(v) = last.order_by {
                settings.order_by = v;
            }
        }
        // The file may have been edited by hand; out-of-range values are ignored.
        if !is_arg_explicitly_set(&matches, "cache_ttl") {
            if let Some(v) = last.cache_ttl.filter(|v| *v <= MAX_CACHE_TTL_SECS) {
                settings.cache_ttl = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = last.view {
                settings.view = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }

        settings = Self::apply_debug_flag(settings);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// `--debug` overrides the log level.
    fn apply_debug_flag(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Check that the chosen source has everything it needs.
    pub fn validate(&self) -> Result<()> {
        match self.source.as_str() {
            "postgrest" => {
                if self.url.as_deref().map_or(true, |u| u.trim().is_empty()) {
                    return Err(ManifestError::Config(
                        "postgrest source needs --url or SUPABASE_URL".to_string(),
                    ));
                }
                if self.key.as_deref().map_or(true, |k| k.trim().is_empty()) {
                    return Err(ManifestError::Config(
                        "postgrest source needs --key or SUPABASE_KEY".to_string(),
                    ));
                }
            }
            "file" => {
                if self.data_path.is_none() {
                    return Err(ManifestError::Config(
                        "file source needs --data-path or MANIFEST_DATA_PATH".to_string(),
                    ));
                }
            }
            other => {
                return Err(ManifestError::Config(format!("unknown source '{}'", other)));
            }
        }
        Ok(())
    }

    pub fn domain_policy(&self) -> DomainPolicy {
        if self.strict {
            DomainPolicy::Drop
        } else {
            DomainPolicy::Coerce
        }
    }

    /// Build the starting filter for `table`: the requested categories and
    /// age bounds, with unspecified bounds taken from the observed ages.
    pub fn initial_filter(&self, table: &PassengerTable) -> Result<FilterSpec> {
        let class: Selection<u8> = self.class.parse()?;
        let gender: Selection<String> = self.gender.parse()?;

        let age_range = match (table.age_bounds(), self.min_age, self.max_age) {
            (_, Some(lo), Some(hi)) => Some(AgeRange::new(lo, hi)?),
            (Some((observed_lo, observed_hi)), lo, hi) => Some(AgeRange::new(
                lo.unwrap_or(observed_lo),
                hi.unwrap_or(observed_hi),
            )?),
            (None, Some(lo), None) => Some(AgeRange::new(lo, f64::MAX)?),
            (None, None, Some(hi)) => Some(AgeRange::new(f64::MIN, hi)?),
            (None, None, None) => None,
        };

        Ok(FilterSpec::all()
            .with_class(class)
            .with_gender(gender)
            .with_age_range(age_range))
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            source: Some(s.source.clone()),
            data_path: s.data_path.clone(),
            table: Some(s.table.clone()),
            order_by: Some(s.order_by.clone()),
            cache_ttl: Some(s.cache_ttl),
            view: Some(s.view.clone()),
            theme: Some(s.theme.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnSet, Passenger};
    use tempfile::TempDir;

    fn args(list: &[&str]) -> Vec<std::ffi::OsString> {
        list.iter().map(|s| s.into()).collect()
    }

    fn table_with_ages(ages: &[f64]) -> PassengerTable {
        let rows = ages
            .iter()
            .map(|&age| Passenger {
                survived: 0,
                pclass: 3,
                age: Some(age),
                fare: None,
                sex: "male".to_string(),
                embarked: None,
                extra: serde_json::Map::new(),
            })
            .collect();
        PassengerTable::new(ColumnSet::default(), rows)
    }

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        let params = LastUsedParams {
            source: Some("postgrest".to_string()),
            data_path: None,
            table: Some("passengers_2024".to_string()),
            order_by: Some("PassengerId".to_string()),
            cache_ttl: Some(300),
            view: Some("summary".to_string()),
            theme: Some("dark".to_string()),
        };
        params.save_to(&path).expect("save");

        let loaded = LastUsedParams::load_from(&path);
        assert_eq!(loaded.source.as_deref(), Some("postgrest"));
        assert_eq!(loaded.table.as_deref(), Some("passengers_2024"));
        assert_eq!(loaded.cache_ttl, Some(300));
        assert_eq!(loaded.view.as_deref(), Some("summary"));
        assert_eq!(loaded.theme.as_deref(), Some("dark"));
    }

    #[test]
    fn test_last_used_params_never_contains_key() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        let settings = Settings::parse_from([
            "manifest-view",
            "--source",
            "postgrest",
            "--url",
            "https://db.example.co",
            "--key",
            "very-secret",
        ]);
        LastUsedParams::from(&settings).save_to(&path).expect("save");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("very-secret"));
        assert!(!content.contains("db.example.co"));
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        LastUsedParams::default().save_to(&path).expect("save");
        assert!(path.exists());

        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists());
    }

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["manifest-view"]);
        assert_eq!(settings.source, "file");
        assert_eq!(settings.table, "Passengers");
        assert_eq!(settings.cache_ttl, 600);
        assert_eq!(settings.class, "All");
        assert_eq!(settings.gender, "All");
        assert_eq!(settings.view, "dashboard");
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.strict);
        assert_eq!(settings.domain_policy(), DomainPolicy::Coerce);
    }

    #[test]
    fn test_strict_flag_selects_drop_policy() {
        let settings = Settings::parse_from(["manifest-view", "--strict"]);
        assert_eq!(settings.domain_policy(), DomainPolicy::Drop);
    }

    #[test]
    fn test_last_used_merge_cli_wins() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        LastUsedParams {
            view: Some("summary".to_string()),
            table: Some("Archive".to_string()),
            ..Default::default()
        }
        .save_to(&path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            args(&["manifest-view", "--view", "dashboard"]),
            &path,
        );
        assert_eq!(settings.view, "dashboard");
        assert_eq!(settings.table, "Archive");
    }

    #[test]
    fn test_out_of_range_saved_cache_ttl_is_ignored() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"cache_ttl": 18446744073709551615, "order_by": "PassengerId"}"#)
            .unwrap();

        let settings = Settings::load_with_last_used_impl(args(&["manifest-view"]), &path);
        assert_eq!(settings.cache_ttl, DEFAULT_CACHE_TTL_SECS);
        assert_eq!(settings.order_by, "PassengerId");

        // The sanitised value is what gets persisted again.
        assert_eq!(LastUsedParams::load_from(&path).cache_ttl, Some(DEFAULT_CACHE_TTL_SECS));
    }

    #[test]
    fn test_saved_cache_ttl_within_range_is_used() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        LastUsedParams {
            cache_ttl: Some(MAX_CACHE_TTL_SECS),
            ..Default::default()
        }
        .save_to(&path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(args(&["manifest-view"]), &path);
        assert_eq!(settings.cache_ttl, MAX_CACHE_TTL_SECS);
    }

    #[test]
    fn test_clear_removes_saved_file_and_skips_merge() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        LastUsedParams {
            table: Some("Archive".to_string()),
            ..Default::default()
        }
        .save_to(&path)
        .expect("save");

        let settings =
            Settings::load_with_last_used_impl(args(&["manifest-view", "--clear"]), &path);
        assert_eq!(settings.table, "Passengers");
        assert!(!path.exists());
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        let settings =
            Settings::load_with_last_used_impl(args(&["manifest-view", "--debug"]), &path);
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_validate_postgrest_requires_credentials() {
        let settings = Settings::parse_from([
            "manifest-view",
            "--source",
            "postgrest",
            "--url",
            "https://db.example.co",
        ]);
        // The environment may carry a key; only assert when it does not.
        if settings.key.is_none() {
            assert!(matches!(settings.validate(), Err(ManifestError::Config(_))));
        }
    }

    #[test]
    fn test_validate_file_source() {
        let ok = Settings::parse_from(["manifest-view", "--data-path", "passengers.jsonl"]);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_initial_filter_defaults_to_observed_range() {
        let settings = Settings::parse_from(["manifest-view"]);
        let spec = settings
            .initial_filter(&table_with_ages(&[4.0, 62.0, 30.0]))
            .unwrap();
        assert_eq!(spec, FilterSpec::full_range(&table_with_ages(&[4.0, 62.0])));
    }

    #[test]
    fn test_initial_filter_applies_cli_values() {
        let settings = Settings::parse_from([
            "manifest-view",
            "--class",
            "1",
            "--gender",
            "Female",
            "--min-age",
            "18",
        ]);
        let spec = settings
            .initial_filter(&table_with_ages(&[4.0, 62.0]))
            .unwrap();
        assert_eq!(spec.class_filter, Selection::Only(1));
        assert_eq!(spec.gender_filter, Selection::Only("female".to_string()));
        let range = spec.age_range.unwrap();
        assert_eq!(range.min(), 18.0);
        assert_eq!(range.max(), 62.0);
    }

    #[test]
    fn test_initial_filter_rejects_inverted_range() {
        let settings =
            Settings::parse_from(["manifest-view", "--min-age", "50", "--max-age", "10"]);
        let result = settings.initial_filter(&table_with_ages(&[4.0, 62.0]));
        assert!(matches!(result, Err(ManifestError::InvalidFilter(_))));
    }

    #[test]
    fn test_initial_filter_rejects_bad_class() {
        let settings = Settings::parse_from(["manifest-view", "--class", "first"]);
        let result = settings.initial_filter(&table_with_ages(&[4.0]));
        assert!(matches!(result, Err(ManifestError::InvalidFilter(_))));
    }
}
