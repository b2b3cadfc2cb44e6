// fixatdl/src/strategy_repository.rs
// Owned collection of raw strategy documents with a per-name model cache

use crate::atdl_parser::{extract_strategy_name, parse_named_strategy};
use crate::base::AtdlError;
use crate::config::AtdlConfig;
use crate::model::StrategyModel;
use crate::strategy_form::StrategyForm;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Holds every available strategy document as raw XML text.
///
/// Models are built on first request and cached by strategy name. Cached models
/// are immutable, so one repository can serve many forms at once.
#[derive(Debug, Default)]
pub struct StrategyRepository {
  documents: Vec<String>,
  models: RwLock<HashMap<String, Arc<StrategyModel>>>,
}

impl StrategyRepository {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_documents(documents: Vec<String>) -> Self {
    Self { documents, models: RwLock::new(HashMap::new()) }
  }

  /// Builds a repository from the files matched by the config's glob pattern.
  pub fn from_config(config: &AtdlConfig) -> Result<Self, AtdlError> {
    let mut repo = Self::new();
    repo.load_dir(config)?;
    Ok(repo)
  }

  pub fn add_document(&mut self, xml: String) {
    self.documents.push(xml);
  }

  /// Adds every document matched by the config's glob pattern.
  ///
  /// Files that cannot be read are logged and skipped. Returns how many were added.
  pub fn load_dir(&mut self, config: &AtdlConfig) -> Result<usize, AtdlError> {
    let pattern = config.document_glob();
    let paths = glob::glob(&pattern)
      .map_err(|e| AtdlError::ConfigurationError(format!("Bad pattern {}: {}", pattern, e)))?;

    let mut loaded = 0;
    for entry in paths {
      let path = match entry {
        Ok(p) => p,
        Err(e) => {
          warn!("Skipping unreadable path: {}", e);
          continue;
        }
      };
      match std::fs::read_to_string(&path) {
        Ok(xml) => {
          debug!("Loaded strategy document {}", path.display());
          self.documents.push(xml);
          loaded += 1;
        }
        Err(e) => warn!("Failed to read {}: {}", path.display(), e),
      }
    }
    info!("Loaded {} strategy document(s) from {}", loaded, pattern);
    Ok(loaded)
  }

  /// Drops all documents and cached models, then loads from the config again.
  pub fn reload(&mut self, config: &AtdlConfig) -> Result<usize, AtdlError> {
    self.clear();
    self.load_dir(config)
  }

  pub fn clear(&mut self) {
    self.documents.clear();
    self.models.write().clear();
  }

  pub fn len(&self) -> usize {
    self.documents.len()
  }

  pub fn is_empty(&self) -> bool {
    self.documents.is_empty()
  }

  pub fn documents(&self) -> &[String] {
    &self.documents
  }

  /// Finds the raw document declaring `name="<strategy_name>"`.
  ///
  /// This is a text match and does not parse the candidates.
  pub fn find_document(&self, strategy_name: &str) -> Option<&str> {
    self.candidate_documents(strategy_name).next()
  }

  /// Every raw document containing `name="<strategy_name>"`, in load order.
  fn candidate_documents<'a>(&'a self, strategy_name: &str) -> impl Iterator<Item = &'a str> + 'a {
    let needle = format!("name=\"{}\"", strategy_name);
    self.documents.iter()
      .filter(move |doc| doc.contains(&needle))
      .map(String::as_str)
  }

  /// Names of all strategies, in document order. Documents that are malformed
  /// or have no `<Strategy>` element are skipped.
  pub fn strategy_names(&self) -> Vec<String> {
    self.documents.iter()
      .enumerate()
      .filter_map(|(idx, doc)| match extract_strategy_name(doc) {
        Ok(Some(name)) => Some(name),
        Ok(None) => {
          warn!("Document #{} has no <Strategy> element, skipping", idx);
          None
        }
        Err(e) => {
          warn!("Document #{} could not be read: {}", idx, e);
          None
        }
      })
      .collect()
  }

  /// Returns the model for `strategy_name`, parsing it on first use.
  pub fn model(&self, strategy_name: &str) -> Result<Arc<StrategyModel>, AtdlError> {
    if let Some(model) = self.models.read().get(strategy_name) {
      return Ok(Arc::clone(model));
    }

    // The text match may hit other elements (e.g. a <Parameter> of the same
    // name), so keep trying candidates until one declares the strategy.
    let mut parse_error = None;
    let mut model = None;
    for xml in self.candidate_documents(strategy_name) {
      match parse_named_strategy(xml, strategy_name) {
        Ok(m) => {
          model = Some(Arc::new(m));
          break;
        }
        Err(AtdlError::MissingStrategyElement) => continue,
        Err(e) => {
          warn!("Failed to parse strategy '{}': {}", strategy_name, e);
          parse_error.get_or_insert(e);
        }
      }
    }
    let model = match (model, parse_error) {
      (Some(m), _) => m,
      (None, Some(e)) => return Err(e),
      (None, None) => return Err(AtdlError::NotFound(strategy_name.to_string())),
    };

    let mut models = self.models.write();
    let cached = models.entry(strategy_name.to_string()).or_insert(model);
    Ok(Arc::clone(cached))
  }

  /// New form with empty state for `strategy_name`.
  pub fn form(&self, strategy_name: &str) -> Result<StrategyForm, AtdlError> {
    self.model(strategy_name).map(StrategyForm::new)
  }

  pub fn cached_models(&self) -> usize {
    self.models.read().len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::PathBuf;

  const VWAP: &str = r#"<Strategies><Strategy name="VWAP"><Parameter name="p" fixTag="6000"/></Strategy></Strategies>"#;
  const POV: &str = r#"<Strategy name="POV"><Parameter name="rate"/></Strategy>"#;

  #[test]
  fn test_model_is_cached_by_name() {
    let repo = StrategyRepository::from_documents(vec![VWAP.to_string(), POV.to_string()]);
    assert_eq!(repo.cached_models(), 0);
    let first = repo.model("POV").unwrap();
    let second = repo.model("POV").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.parameters[0].name, "rate");
    assert_eq!(repo.cached_models(), 1);
  }

  #[test]
  fn test_unknown_and_broken_documents() {
    let repo = StrategyRepository::from_documents(vec![
      "<Root/>".to_string(),
      "<Strategy name=\"BAD\"><Oops></Strategy>".to_string(),
      r#"<Strategies><Parameter name="GHOST"/></Strategies>"#.to_string(),
      POV.to_string(),
    ]);
    // The name scan stops at the <Strategy> tag, before BAD's syntax error.
    assert_eq!(repo.strategy_names(), vec!["BAD".to_string(), "POV".to_string()]);
    assert_eq!(repo.model("IS"), Err(AtdlError::NotFound("IS".to_string())));
    assert!(matches!(repo.model("BAD"), Err(AtdlError::ParseError(_))));
    assert_eq!(repo.model("GHOST"), Err(AtdlError::NotFound("GHOST".to_string())));
    assert_eq!(repo.cached_models(), 0);
  }

  #[test]
  fn test_model_skips_documents_matching_other_elements() {
    let repo = StrategyRepository::from_documents(vec![
      r#"<Strategy name="TWAP"><Parameter name="POV"/></Strategy>"#.to_string(),
      POV.to_string(),
    ]);
    assert_eq!(repo.strategy_names(), vec!["TWAP".to_string(), "POV".to_string()]);
    let model = repo.model("POV").unwrap();
    assert_eq!(model.strategy_name, "POV");
    assert_eq!(model.parameters[0].name, "rate");
    assert!(repo.form("POV").is_ok());
  }

  #[test]
  fn test_forms_do_not_share_state() {
    let repo = StrategyRepository::from_documents(vec![POV.to_string()]);
    let mut a = repo.form("POV").unwrap();
    let b = repo.form("POV").unwrap();
    a.set_value("rate", "10");
    assert!(a.value("rate").is_some());
    assert!(b.value("rate").is_none());
  }

  #[test]
  fn test_load_and_reload_from_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("vwap.xml"), VWAP).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    let config = AtdlConfig { strategy_dir: PathBuf::from(dir.path()), ..Default::default() };

    let mut repo = StrategyRepository::from_config(&config).unwrap();
    assert_eq!(repo.len(), 1);
    assert!(repo.model("VWAP").is_ok());

    std::fs::write(dir.path().join("pov.xml"), POV).unwrap();
    assert_eq!(repo.reload(&config).unwrap(), 2);
    assert_eq!(repo.cached_models(), 0);
    let mut names = repo.strategy_names();
    names.sort();
    assert_eq!(names, vec!["POV".to_string(), "VWAP".to_string()]);

    repo.clear();
    assert!(repo.is_empty());
    assert!(repo.find_document("VWAP").is_none());
  }
}
