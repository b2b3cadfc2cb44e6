// fixatdl/src/model.rs
// Strategy document model: parameters, validation rules and layout controls

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Whether a parameter must be filled in before the order can be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParameterUse {
  Required,
  #[default]
  Optional,
}

impl ParameterUse {
  /// Anything other than `required` (including a missing attribute) is optional.
  pub fn from_attr(value: Option<&str>) -> Self {
    match value {
      Some("required") => ParameterUse::Required,
      _ => ParameterUse::Optional,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumPair {
  /// Label shown to the user.
  pub enum_id: String,
  /// Value transmitted on the wire.
  pub wire_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
  pub name: String,
  /// Declared `xsi:type`, e.g. `Int_t` or `String_t`.
  pub param_type: Option<String>,
  pub fix_tag: Option<String>,
  pub usage: ParameterUse,
  pub min_value: Option<f64>,
  pub max_value: Option<f64>,
  pub const_value: Option<String>,
  /// In document order; this is also display order.
  pub enum_pairs: Vec<EnumPair>,
}

impl ParameterDefinition {
  pub fn is_required(&self) -> bool {
    self.usage == ParameterUse::Required
  }

  /// Looks up the wire value for a display label.
  pub fn wire_value_for(&self, enum_id: &str) -> Option<&str> {
    self.enum_pairs.iter()
      .find(|p| p.enum_id == enum_id)
      .map(|p| p.wire_value.as_str())
  }
}

/// Relationship an `<Edit>` condition checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditOperator {
  /// Field must be less than `field2`.
  Lt,
  /// Field must be greater than `field2`.
  Gt,
  /// Field must exist.
  Nx,
  /// Field must equal `value`.
  Eq,
  /// Any other operator tag. Never fires.
  Unsupported(String),
}

impl EditOperator {
  pub fn from_attr(value: Option<&str>) -> Self {
    match value {
      Some("LT") => EditOperator::Lt,
      Some("GT") => EditOperator::Gt,
      Some("NX") => EditOperator::Nx,
      Some("EQ") => EditOperator::Eq,
      Some(other) => EditOperator::Unsupported(other.to_string()),
      None => EditOperator::Unsupported(String::new()),
    }
  }
}

impl fmt::Display for EditOperator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EditOperator::Lt => write!(f, "LT"),
      EditOperator::Gt => write!(f, "GT"),
      EditOperator::Nx => write!(f, "NX"),
      EditOperator::Eq => write!(f, "EQ"),
      EditOperator::Unsupported(s) => write!(f, "{}", s),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditCondition {
  pub field: String,
  pub operator: EditOperator,
  pub value: Option<String>,
  pub field2: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
  pub error_message: String,
  /// OR-combined: the rule fails if any condition fires.
  pub conditions: Vec<EditCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
  pub enum_id: String,
  pub ui_rep: String,
}

/// Kind of layout control, decoded from the control's `xsi:type`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControlKind {
  CheckBox,
  DropDownList,
  Clock,
  SingleSpinner,
  #[default]
  TextField,
  /// A control tag this crate has no dedicated widget for. Rendered as free text.
  Unrecognized(String),
}

static CONTROL_KIND_MAP: Lazy<HashMap<&'static str, ControlKind>> = Lazy::new(|| {
  let mut m = HashMap::new();
  m.insert("CheckBox_t", ControlKind::CheckBox);
  m.insert("DropDownList_t", ControlKind::DropDownList);
  m.insert("Clock_t", ControlKind::Clock);
  m.insert("SingleSpinner_t", ControlKind::SingleSpinner);
  m.insert("TextField_t", ControlKind::TextField);
  m
});

impl ControlKind {
  /// Decodes an `xsi:type` value such as `lay:CheckBox_t`. The namespace prefix is ignored.
  pub fn from_type_tag(tag: &str) -> Self {
    let local = tag.rsplit(':').next().unwrap_or(tag);
    CONTROL_KIND_MAP.get(local)
      .cloned()
      .unwrap_or_else(|| ControlKind::Unrecognized(tag.to_string()))
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlBinding {
  pub id: String,
  pub kind: ControlKind,
  pub label: String,
  /// Name of the bound parameter. May not match any parameter.
  pub parameter_ref: Option<String>,
  pub init_value: Option<String>,
  pub list_items: Vec<ListItem>,
}

/// Immutable result of parsing one strategy document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyModel {
  /// Empty when the `<Strategy>` element has no `name` attribute.
  pub strategy_name: String,
  pub wire_value: Option<String>,
  pub ui_rep: Option<String>,
  pub version: Option<String>,
  /// FIX tag carrying the strategy's wire value, from the enclosing `<Strategies>`.
  pub strategy_identifier_tag: Option<String>,
  pub parameters: Vec<ParameterDefinition>,
  pub validation_rules: Vec<ValidationRule>,
  pub controls: Vec<ControlBinding>,
}

impl StrategyModel {
  pub fn parameter(&self, name: &str) -> Option<&ParameterDefinition> {
    self.parameters.iter().find(|p| p.name == name)
  }

  /// First control bound to the given parameter.
  pub fn control_for(&self, parameter_name: &str) -> Option<&ControlBinding> {
    self.controls.iter()
      .find(|c| c.parameter_ref.as_deref() == Some(parameter_name))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_control_kind_ignores_prefix() {
    assert_eq!(ControlKind::from_type_tag("lay:CheckBox_t"), ControlKind::CheckBox);
    assert_eq!(ControlKind::from_type_tag("Clock_t"), ControlKind::Clock);
    assert_eq!(ControlKind::from_type_tag("lay:SingleSpinner_t"), ControlKind::SingleSpinner);
    assert_eq!(
      ControlKind::from_type_tag("lay:Slider_t"),
      ControlKind::Unrecognized("lay:Slider_t".to_string())
    );
  }

  #[test]
  fn test_operator_and_use_attrs() {
    assert_eq!(EditOperator::from_attr(Some("LT")), EditOperator::Lt);
    assert_eq!(EditOperator::from_attr(Some("GE")), EditOperator::Unsupported("GE".into()));
    assert_eq!(ParameterUse::from_attr(Some("required")), ParameterUse::Required);
    assert_eq!(ParameterUse::from_attr(Some("bogus")), ParameterUse::Optional);
    assert_eq!(ParameterUse::from_attr(None), ParameterUse::Optional);
  }
}
