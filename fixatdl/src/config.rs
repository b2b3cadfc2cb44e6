// fixatdl/src/config.rs
//! Configuration for loading strategy documents and encoding FIX fields.
//!
//! All fields have defaults, so a config file only needs the keys it changes:
//!
//! ```json
//! { "strategy_dir": "/opt/algos", "fix_delimiter": "|" }
//! ```

use crate::base::AtdlError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// FIX field separator (SOH).
pub const SOH: &str = "\u{1}";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtdlConfig {
  /// Directory scanned for strategy documents (default: current directory)
  pub strategy_dir: PathBuf,
  /// Glob pattern, relative to `strategy_dir`, selecting document files (default: `*.xml`)
  pub file_pattern: String,
  /// Separator written after each `tag=value` field (default: SOH)
  pub fix_delimiter: String,
}

impl Default for AtdlConfig {
  fn default() -> Self {
    Self {
      strategy_dir: PathBuf::from("."),
      file_pattern: "*.xml".to_string(),
      fix_delimiter: SOH.to_string(),
    }
  }
}

impl AtdlConfig {
  /// Reads a JSON config file. Missing keys take their default values.
  pub fn from_file(path: &Path) -> Result<Self, AtdlError> {
    let text = std::fs::read_to_string(path)
      .map_err(|e| AtdlError::ConfigurationError(format!("Cannot read {}: {}", path.display(), e)))?;
    Self::from_json(&text)
  }

  pub fn from_json(text: &str) -> Result<Self, AtdlError> {
    let config: AtdlConfig = serde_json::from_str(text)
      .map_err(|e| AtdlError::ConfigurationError(format!("Invalid config: {}", e)))?;
    config.validate()?;
    debug!("Loaded config: {:?}", config);
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), AtdlError> {
    if self.file_pattern.trim().is_empty() {
      return Err(AtdlError::ConfigurationError("file_pattern must not be empty".to_string()));
    }
    if self.fix_delimiter.is_empty() {
      return Err(AtdlError::ConfigurationError("fix_delimiter must not be empty".to_string()));
    }
    Ok(())
  }

  /// Full glob pattern for strategy documents.
  pub fn document_glob(&self) -> String {
    self.strategy_dir.join(&self.file_pattern).to_string_lossy().into_owned()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_partial_json_uses_defaults() {
    let config = AtdlConfig::from_json(r#"{ "fix_delimiter": "|" }"#).unwrap();
    assert_eq!(config.fix_delimiter, "|");
    assert_eq!(config.file_pattern, "*.xml");
    assert_eq!(config.strategy_dir, PathBuf::from("."));
  }

  #[test]
  fn test_invalid_config_rejected() {
    assert!(matches!(
      AtdlConfig::from_json(r#"{ "file_pattern": "" }"#),
      Err(AtdlError::ConfigurationError(_))
    ));
    assert!(matches!(AtdlConfig::from_json("not json"), Err(AtdlError::ConfigurationError(_))));
  }

  #[test]
  fn test_document_glob() {
    let config = AtdlConfig { strategy_dir: PathBuf::from("algos"), ..Default::default() };
    assert_eq!(config.document_glob(), Path::new("algos").join("*.xml").to_string_lossy());
  }
}
