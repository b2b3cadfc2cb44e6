// fixatdl/src/base.rs
// Error definitions shared by the parser, form engine and encoder

use thiserror::Error;

/// Errors that can occur while loading, parsing or encoding strategy documents.
///
/// Validation failures are not errors: `StrategyForm::validate` returns them as data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AtdlError {
  #[error("XML parse error: {0}")]
  ParseError(String),

  #[error("Document has no <Strategy> element")]
  MissingStrategyElement,

  #[error("Strategy not found: {0}")]
  NotFound(String),

  #[error("Invalid parameter: {0}")]
  InvalidParameter(String),

  #[error("Configuration error: {0}")]
  ConfigurationError(String),

  #[error("I/O error: {0}")]
  IoError(String),
}

impl From<std::io::Error> for AtdlError {
  fn from(e: std::io::Error) -> Self {
    AtdlError::IoError(e.to_string())
  }
}

impl From<quick_xml::Error> for AtdlError {
  fn from(e: quick_xml::Error) -> Self {
    AtdlError::ParseError(e.to_string())
  }
}
