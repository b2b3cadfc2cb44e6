// fixatdl/src/fix_encoder.rs
// Encodes a filled strategy form as textual FIX tag=value fields

use crate::base::AtdlError;
use crate::config::{AtdlConfig, SOH};
use crate::strategy_form::{FormValue, StrategyForm};
use log::{trace, warn};
use std::io::{Cursor, Write};

fn parse_tag(raw: &str, owner: &str) -> Result<u32, AtdlError> {
  raw.trim().parse::<u32>().map_err(|_| {
    AtdlError::InvalidParameter(format!("{} has non-numeric fixTag '{}'", owner, raw))
  })
}

/// Wire text for a form value: booleans as `Y`/`N`, whole numbers without a fraction.
/// Empty text, NaN and infinities produce nothing.
fn format_value(value: &FormValue) -> Option<String> {
  match value {
    FormValue::Text(s) if s.is_empty() => None,
    FormValue::Text(s) => Some(s.clone()),
    FormValue::Bool(b) => Some(if *b { "Y" } else { "N" }.to_string()),
    FormValue::Number(n) if !n.is_finite() => {
      warn!("Not encoding non-finite value {}", n);
      None
    }
    FormValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
    FormValue::Number(n) => Some(n.to_string()),
  }
}

/// Ordered `(tag, value)` pairs for a form.
///
/// The strategy identifier comes first when the document declares both its tag
/// and a wire value. Then each parameter with a `fixTag` follows in declaration
/// order: its `constValue` if it has one, otherwise its current non-empty value.
pub fn tag_values(form: &StrategyForm) -> Result<Vec<(u32, String)>, AtdlError> {
  let model = form.model();
  let mut pairs = Vec::new();

  if let (Some(tag), Some(wire)) = (model.strategy_identifier_tag.as_deref(), model.wire_value.as_deref()) {
    pairs.push((parse_tag(tag, "Strategies")?, wire.to_string()));
  }

  for parameter in &model.parameters {
    let Some(raw_tag) = parameter.fix_tag.as_deref() else {
      continue;
    };
    let tag = parse_tag(raw_tag, &format!("Parameter '{}'", parameter.name))?;
    let value = match &parameter.const_value {
      Some(c) => Some(c.clone()),
      None => form.value(&parameter.name).and_then(format_value),
    };
    if let Some(v) = value {
      trace!("{}={} ({})", tag, v, parameter.name);
      pairs.push((tag, v));
    }
  }
  Ok(pairs)
}

/// Joins pairs as `tag=value` fields, each followed by `delimiter`.
pub fn encode(pairs: &[(u32, String)], delimiter: &str) -> Result<String, AtdlError> {
  let mut cursor = Cursor::new(Vec::new());
  for (tag, value) in pairs {
    write!(cursor, "{}={}{}", tag, value, delimiter)
      .map_err(|e| AtdlError::IoError(format!("Buffer write failed: {}", e)))?;
  }
  String::from_utf8(cursor.into_inner())
    .map_err(|e| AtdlError::IoError(format!("Encoded fields are not UTF-8: {}", e)))
}

/// Encoder bound to a field delimiter.
#[derive(Debug, Clone)]
pub struct FixTagValueEncoder {
  delimiter: String,
}

impl Default for FixTagValueEncoder {
  fn default() -> Self {
    Self { delimiter: SOH.to_string() }
  }
}

impl FixTagValueEncoder {
  pub fn new(delimiter: &str) -> Self {
    Self { delimiter: delimiter.to_string() }
  }

  pub fn from_config(config: &AtdlConfig) -> Self {
    Self::new(&config.fix_delimiter)
  }

  pub fn delimiter(&self) -> &str {
    &self.delimiter
  }

  pub fn encode_form(&self, form: &StrategyForm) -> Result<String, AtdlError> {
    encode(&tag_values(form)?, &self.delimiter)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::atdl_parser::parse_strategy_document;
  use std::sync::Arc;

  const XML: &str = r#"<Strategies strategyIdentifierTag="847" xmlns:lay="l" xmlns:xsi="x">
  <Strategy name="POV" wireValue="POV1">
    <Parameter name="rate" fixTag="6064"/>
    <Parameter name="aggressive" fixTag="6065"/>
    <Parameter name="start" fixTag="6066"/>
    <Parameter name="venue" fixTag="6067" constValue="XNAS"/>
    <Parameter name="note"/>
    <lay:StrategyPanel>
      <lay:Control ID="a" xsi:type="lay:CheckBox_t" parameterRef="aggressive"/>
    </lay:StrategyPanel>
  </Strategy>
</Strategies>"#;

  fn form() -> StrategyForm {
    StrategyForm::new(Arc::new(parse_strategy_document(XML).unwrap()))
  }

  #[test]
  fn test_tag_values_order_and_formatting() {
    let mut form = form();
    form.set_value("start", "");
    form.set_value("note", "ignored");
    form.set_value("aggressive", true);
    form.set_value("rate", 15.0);

    let pairs = tag_values(&form).unwrap();
    assert_eq!(pairs, vec![
      (847, "POV1".to_string()),
      (6064, "15".to_string()),
      (6065, "Y".to_string()),
      (6067, "XNAS".to_string()),
    ]);
  }

  #[test]
  fn test_encode_with_delimiter() {
    let mut form = form();
    form.set_value("rate", 12.5);
    let encoder = FixTagValueEncoder::new("|");
    assert_eq!(encoder.encode_form(&form).unwrap(), "847=POV1|6064=12.5|6067=XNAS|");
    assert_eq!(FixTagValueEncoder::default().delimiter(), "\u{1}");
  }

  #[test]
  fn test_non_finite_numbers_are_skipped() {
    let mut form = form();
    form.set_value("rate", f64::INFINITY);
    form.set_value("start", f64::NAN);
    let pairs = tag_values(&form).unwrap();
    assert_eq!(pairs, vec![(847, "POV1".to_string()), (6067, "XNAS".to_string())]);
  }

  #[test]
  fn test_bad_fix_tag() {
    let xml = r#"<Strategy name="S"><Parameter name="p" fixTag="abc"/></Strategy>"#;
    let form = StrategyForm::new(Arc::new(parse_strategy_document(xml).unwrap()));
    assert!(matches!(tag_values(&form), Err(AtdlError::InvalidParameter(_))));
  }
}
