use std::path::PathBuf;
use thiserror::Error;

/// Problems with the shape of a loaded record set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A column the dashboard depends on is absent from every row.
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    /// The record source returned no rows at all.
    #[error("table is empty")]
    EmptyTable,
}

/// All errors produced by the manifest crates.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The record source could not be reached or rejected the request.
    #[error("Connection to {source_name} failed: {message}")]
    Connection { source_name: String, message: String },

    /// The loaded records do not have the expected shape.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A filter value is out of range or could not be parsed.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A row in a record file is not a JSON object.
    #[error("Malformed record in {path} at line {line}: {message}")]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The configured data file or directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// An error originating from the terminal / TUI layer.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ManifestError {
    /// Shorthand for a [`ManifestError::Connection`].
    pub fn connection(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the manifest crates.
pub type Result<T> = std::result::Result<T, ManifestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_connection() {
        let err = ManifestError::connection("postgrest:Passengers", "HTTP 401: invalid key");
        assert_eq!(
            err.to_string(),
            "Connection to postgrest:Passengers failed: HTTP 401: invalid key"
        );
    }

    #[test]
    fn test_error_display_missing_column() {
        let err: ManifestError = SchemaError::MissingColumn("pclass".to_string()).into();
        assert_eq!(err.to_string(), "Schema error: missing required column 'pclass'");
    }

    #[test]
    fn test_error_display_empty_table() {
        let err: ManifestError = SchemaError::EmptyTable.into();
        assert_eq!(err.to_string(), "Schema error: table is empty");
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ManifestError::FileRead {
            path: PathBuf::from("/data/passengers.jsonl"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/passengers.jsonl"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_malformed_record() {
        let err = ManifestError::MalformedRecord {
            path: PathBuf::from("rows.jsonl"),
            line: 7,
            message: "expected an object".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed record in rows.jsonl at line 7: expected an object"
        );
    }

    #[test]
    fn test_error_display_invalid_filter() {
        let err = ManifestError::InvalidFilter("min age 40 is above max age 20".to_string());
        assert_eq!(err.to_string(), "Invalid filter: min age 40 is above max age 20");
    }

    #[test]
    fn test_error_display_data_path_not_found() {
        let err = ManifestError::DataPathNotFound(PathBuf::from("/missing/dir"));
        assert_eq!(err.to_string(), "Data path not found: /missing/dir");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ManifestError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: ManifestError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
