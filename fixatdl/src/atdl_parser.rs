// fixatdl/src/atdl_parser.rs
// Builds a StrategyModel from FIX ATDL strategy XML

use crate::base::AtdlError;
use crate::model::{
  ControlBinding, ControlKind, EditCondition, EditOperator, EnumPair, ListItem,
  ParameterDefinition, ParameterUse, StrategyModel, ValidationRule,
};
use log::{debug, trace};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

// Helper to extract attribute value. Matches on the local part of the key, so
// `xsi:type` is found with `b"type"`.
fn get_attr_value(e: &BytesStart, key: &[u8]) -> Result<Option<String>, AtdlError> {
  for attr_result in e.attributes() {
    let attr = attr_result.map_err(|err| {
      AtdlError::ParseError(format!("XML attribute parsing error: {}", err))
    })?;
    if attr.key.local_name().as_ref() == key {
      let unescaped_value_cow = attr.unescape_value().map_err(|err| {
        AtdlError::ParseError(format!("Attribute value unescape error: {}", err))
      })?;
      return Ok(Some(unescaped_value_cow.into_owned()));
    }
  }
  Ok(None)
}

// Helper to parse f64 from Option<String>
fn parse_optional_f64(opt_str: Option<String>) -> Option<f64> {
  opt_str.as_deref().and_then(|s| s.trim().parse::<f64>().ok())
}

/// Parses the first `<Strategy>` of an ATDL document into a `StrategyModel`.
///
/// Fails with `ParseError` on malformed XML and `MissingStrategyElement` when the
/// document is well-formed but has no `<Strategy>` element.
pub fn parse_strategy_document(xml_data: &str) -> Result<StrategyModel, AtdlError> {
  parse_document(xml_data, None)
}

/// Like `parse_strategy_document`, but selects the `<Strategy>` whose `name`
/// attribute equals `strategy_name`. Used for documents bundling several strategies.
pub fn parse_named_strategy(xml_data: &str, strategy_name: &str) -> Result<StrategyModel, AtdlError> {
  parse_document(xml_data, Some(strategy_name))
}

/// Returns the `name` of the first `<Strategy>` element without building a model.
///
/// Stops reading at that element. Returns `Ok(None)` when the document has no
/// `<Strategy>` element; a missing `name` attribute gives an empty string.
pub fn extract_strategy_name(xml_data: &str) -> Result<Option<String>, AtdlError> {
  let mut reader = Reader::from_str(xml_data);
  reader.config_mut().trim_text(true);

  loop {
    match reader.read_event() {
      Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
        if e.local_name().as_ref() == b"Strategy" {
          return Ok(Some(get_attr_value(&e, b"name")?.unwrap_or_default()));
        }
      }
      Ok(Event::Eof) => return Ok(None),
      Err(err) => {
        return Err(AtdlError::ParseError(format!(
          "XML parsing error at position {}: {}", reader.buffer_position(), err
        )));
      }
      _ => (),
    }
  }
}

/// Tracks which part of the document the reader is inside.
#[derive(Default)]
struct BuildState {
  model: StrategyModel,
  strategy_found: bool,
  /// Depth of the selected `<Strategy>` while it is open.
  strategy_depth: Option<usize>,
  /// Identifier tag of the `<Strategies>` currently open, if any.
  pending_identifier_tag: Option<String>,
  open_parameters: Vec<(usize, usize)>,
  open_rules: Vec<(usize, usize)>,
  open_controls: Vec<(usize, usize)>,
  panel_depth: Option<usize>,
  panel_done: bool,
}

impl BuildState {
  fn in_strategy(&self) -> bool {
    self.strategy_depth.is_some()
  }

  fn in_panel(&self) -> bool {
    self.panel_depth.is_some()
  }

  fn open_element(&mut self, e: &BytesStart, depth: usize, target: Option<&str>) -> Result<(), AtdlError> {
    let local = e.local_name();
    let name = local.as_ref();

    if !self.in_strategy() {
      match name {
        b"Strategies" => {
          self.pending_identifier_tag = get_attr_value(e, b"strategyIdentifierTag")?;
        }
        b"Strategy" if !self.strategy_found => {
          let strategy_name = get_attr_value(e, b"name")?.unwrap_or_default();
          if target.map_or(true, |t| t == strategy_name) {
            debug!("Building model for strategy '{}'", strategy_name);
            self.strategy_found = true;
            self.strategy_depth = Some(depth);
            self.model.strategy_name = strategy_name;
            self.model.wire_value = get_attr_value(e, b"wireValue")?;
            self.model.ui_rep = get_attr_value(e, b"uiRep")?;
            self.model.version = get_attr_value(e, b"version")?;
            self.model.strategy_identifier_tag = self.pending_identifier_tag.clone();
          } else {
            trace!("Skipping strategy '{}'", strategy_name);
          }
        }
        _ => {}
      }
      return Ok(());
    }

    match name {
      b"Parameter" => {
        let parameter = ParameterDefinition {
          name: get_attr_value(e, b"name")?.unwrap_or_default(),
          param_type: get_attr_value(e, b"type")?,
          fix_tag: get_attr_value(e, b"fixTag")?,
          usage: ParameterUse::from_attr(get_attr_value(e, b"use")?.as_deref()),
          min_value: parse_optional_f64(get_attr_value(e, b"minValue")?),
          max_value: parse_optional_f64(get_attr_value(e, b"maxValue")?),
          const_value: get_attr_value(e, b"constValue")?,
          enum_pairs: Vec::new(),
        };
        trace!("Parameter '{}' ({:?})", parameter.name, parameter.param_type);
        self.model.parameters.push(parameter);
        self.open_parameters.push((self.model.parameters.len() - 1, depth));
      }
      b"EnumPair" => {
        let pair = EnumPair {
          enum_id: get_attr_value(e, b"enumID")?.unwrap_or_default(),
          wire_value: get_attr_value(e, b"wireValue")?.unwrap_or_default(),
        };
        for &(idx, _) in &self.open_parameters {
          self.model.parameters[idx].enum_pairs.push(pair.clone());
        }
      }
      b"StrategyEdit" => {
        self.model.validation_rules.push(ValidationRule {
          error_message: get_attr_value(e, b"errorMessage")?.unwrap_or_default(),
          conditions: Vec::new(),
        });
        self.open_rules.push((self.model.validation_rules.len() - 1, depth));
      }
      b"Edit" => {
        let condition = EditCondition {
          field: get_attr_value(e, b"field")?.unwrap_or_default(),
          operator: EditOperator::from_attr(get_attr_value(e, b"operator")?.as_deref()),
          value: get_attr_value(e, b"value")?,
          field2: get_attr_value(e, b"field2")?,
        };
        for &(idx, _) in &self.open_rules {
          self.model.validation_rules[idx].conditions.push(condition.clone());
        }
      }
      b"StrategyPanel" if !self.in_panel() && !self.panel_done => {
        self.panel_depth = Some(depth);
      }
      b"Control" if self.in_panel() => {
        let control = ControlBinding {
          id: get_attr_value(e, b"ID")?.unwrap_or_default(),
          kind: get_attr_value(e, b"type")?
            .map(|t| ControlKind::from_type_tag(&t))
            .unwrap_or_default(),
          label: get_attr_value(e, b"label")?.unwrap_or_default(),
          parameter_ref: get_attr_value(e, b"parameterRef")?,
          init_value: get_attr_value(e, b"initValue")?,
          list_items: Vec::new(),
        };
        self.model.controls.push(control);
        self.open_controls.push((self.model.controls.len() - 1, depth));
      }
      b"ListItem" => {
        let item = ListItem {
          enum_id: get_attr_value(e, b"enumID")?.unwrap_or_default(),
          ui_rep: get_attr_value(e, b"uiRep")?.unwrap_or_default(),
        };
        for &(idx, _) in &self.open_controls {
          self.model.controls[idx].list_items.push(item.clone());
        }
      }
      _ => {}
    }
    Ok(())
  }

  fn close_element(&mut self, name: &[u8], depth: usize) {
    let at_depth = |open: &Option<usize>| *open == Some(depth);
    match name {
      b"Parameter" => { self.open_parameters.retain(|&(_, d)| d != depth); }
      b"StrategyEdit" => { self.open_rules.retain(|&(_, d)| d != depth); }
      b"Control" => { self.open_controls.retain(|&(_, d)| d != depth); }
      b"StrategyPanel" if at_depth(&self.panel_depth) => {
        self.panel_depth = None;
        self.panel_done = true;
      }
      b"Strategy" if at_depth(&self.strategy_depth) => {
        self.strategy_depth = None;
      }
      b"Strategies" => { self.pending_identifier_tag = None; }
      _ => {}
    }
  }
}

fn parse_document(xml_data: &str, target: Option<&str>) -> Result<StrategyModel, AtdlError> {
  let mut reader = Reader::from_str(xml_data);
  reader.config_mut().trim_text(true);

  let mut state = BuildState::default();
  let mut depth: usize = 0;
  let mut saw_root = false;

  loop {
    match reader.read_event() {
      Ok(Event::Start(e)) => {
        saw_root = true;
        depth += 1;
        state.open_element(&e, depth, target)?;
      }
      Ok(Event::Empty(e)) => {
        saw_root = true;
        // Self-closing: open and close at the same depth.
        state.open_element(&e, depth + 1, target)?;
        state.close_element(e.local_name().as_ref(), depth + 1);
      }
      Ok(Event::End(e)) => {
        state.close_element(e.local_name().as_ref(), depth);
        depth = depth.saturating_sub(1);
      }
      Ok(Event::Eof) => break,
      Err(err) => {
        return Err(AtdlError::ParseError(format!(
          "XML parsing error at position {}: {}", reader.buffer_position(), err
        )));
      }
      _ => (),
    }
  }

  if !saw_root {
    return Err(AtdlError::ParseError("Document has no root element".to_string()));
  }
  if depth != 0 {
    return Err(AtdlError::ParseError(format!("Unexpected end of document with {} unclosed element(s)", depth)));
  }
  if !state.strategy_found {
    return Err(AtdlError::MissingStrategyElement);
  }

  let model = state.model;
  debug!(
    "Parsed strategy '{}': {} parameters, {} validation rules, {} controls",
    model.strategy_name, model.parameters.len(), model.validation_rules.len(), model.controls.len()
  );
  Ok(model)
}
