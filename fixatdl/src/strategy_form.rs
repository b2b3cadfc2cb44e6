// fixatdl/src/strategy_form.rs
// Form engine driven by a StrategyModel: control descriptions, form state and validation

use crate::model::{
  ControlBinding, ControlKind, EditCondition, EditOperator, ParameterDefinition, StrategyModel,
};
use chrono::NaiveTime;
use log::{debug, trace};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Lowest value an integer stepper accepts.
pub const SPINNER_MIN: i64 = 0;
/// Increment of an integer stepper.
pub const SPINNER_STEP: i64 = 1;
/// Maximum length of a free-text control.
pub const FREE_TEXT_MAX_LENGTH: usize = 1;
/// Format of values produced by clock controls.
pub const CLOCK_FORMAT: &str = "%H:%M";

/// A value entered into the form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FormValue {
  Text(String),
  Bool(bool),
  Number(f64),
}

impl FormValue {
  /// Numeric reading of the value, following JavaScript `parseFloat` rules.
  /// Unparsable values give NaN.
  pub fn as_number(&self) -> f64 {
    match self {
      FormValue::Number(n) => *n,
      FormValue::Text(s) => parse_float(s),
      FormValue::Bool(_) => f64::NAN,
    }
  }

  /// Boolean reading used for checkbox controls.
  pub fn as_bool(&self) -> bool {
    match self {
      FormValue::Bool(b) => *b,
      FormValue::Number(n) => *n != 0.0 && !n.is_nan(),
      FormValue::Text(s) => {
        let s = s.trim();
        s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("y") || s == "1"
      }
    }
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, FormValue::Text(s) if s.is_empty())
  }
}

impl fmt::Display for FormValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FormValue::Text(s) => write!(f, "{}", s),
      FormValue::Bool(b) => write!(f, "{}", b),
      FormValue::Number(n) => write!(f, "{}", n),
    }
  }
}

impl From<&str> for FormValue {
  fn from(s: &str) -> Self { FormValue::Text(s.to_string()) }
}

impl From<String> for FormValue {
  fn from(s: String) -> Self { FormValue::Text(s) }
}

impl From<bool> for FormValue {
  fn from(b: bool) -> Self { FormValue::Bool(b) }
}

impl From<f64> for FormValue {
  fn from(n: f64) -> Self { FormValue::Number(n) }
}

impl From<i64> for FormValue {
  fn from(n: i64) -> Self { FormValue::Number(n as f64) }
}

/// Parses the longest numeric prefix of `input` the way JavaScript `parseFloat` does.
///
/// Leading whitespace is skipped, `Infinity` is recognized, and anything without
/// a leading number is NaN.
pub fn parse_float(input: &str) -> f64 {
  let s = input.trim_start();
  let bytes = s.as_bytes();
  let mut end = 0;

  if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
    end += 1;
  }
  if s[end..].starts_with("Infinity") {
    return if bytes.first() == Some(&b'-') { f64::NEG_INFINITY } else { f64::INFINITY };
  }

  let mut digits = 0;
  while end < bytes.len() && bytes[end].is_ascii_digit() {
    end += 1;
    digits += 1;
  }
  if end < bytes.len() && bytes[end] == b'.' {
    end += 1;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
      end += 1;
      digits += 1;
    }
  }
  if digits == 0 {
    return f64::NAN;
  }

  // Exponent only counts when followed by at least one digit.
  if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
    let mut exp_end = end + 1;
    if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
      exp_end += 1;
    }
    let exp_digits_start = exp_end;
    while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
      exp_end += 1;
    }
    if exp_end > exp_digits_start {
      end = exp_end;
    }
  }

  s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

/// Live values of one strategy form, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormState {
  values: HashMap<String, FormValue>,
}

impl FormState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, parameter_name: &str) -> Option<&FormValue> {
    self.values.get(parameter_name)
  }

  pub fn insert(&mut self, parameter_name: &str, value: FormValue) {
    self.values.insert(parameter_name.to_string(), value);
  }

  pub fn remove(&mut self, parameter_name: &str) -> Option<FormValue> {
    self.values.remove(parameter_name)
  }

  pub fn clear(&mut self) {
    self.values.clear();
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &FormValue)> {
    self.values.iter()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
  pub label: String,
  pub value: String,
}

/// How a control is presented and what values it produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Widget {
  /// Boolean toggle.
  Toggle,
  /// Single choice; the stored value is the option's wire value.
  SingleSelect { options: Vec<SelectOption> },
  /// Time of day, stored as `HH:MM`.
  TimePicker,
  IntegerStepper { min: i64, step: i64 },
  FreeText { max_length: usize },
}

/// One layout control paired with the parameter it edits.
#[derive(Debug, Clone, Serialize)]
pub struct ControlDescriptor<'a> {
  pub control: &'a ControlBinding,
  /// `None` when `parameter_ref` does not name any parameter.
  pub parameter: Option<&'a ParameterDefinition>,
  pub widget: Widget,
  pub required: bool,
}

fn select_options(control: &ControlBinding, parameter: &ParameterDefinition) -> Vec<SelectOption> {
  if !parameter.enum_pairs.is_empty() {
    return parameter.enum_pairs.iter()
      .map(|p| SelectOption { label: p.enum_id.clone(), value: p.wire_value.clone() })
      .collect();
  }
  control.list_items.iter()
    .map(|item| SelectOption {
      label: item.ui_rep.clone(),
      value: parameter.wire_value_for(&item.enum_id).unwrap_or(&item.enum_id).to_string(),
    })
    .collect()
}

fn widget_for(control: &ControlBinding, parameter: Option<&ParameterDefinition>) -> Widget {
  let parameter = match parameter {
    Some(p) => p,
    None => return Widget::FreeText { max_length: FREE_TEXT_MAX_LENGTH },
  };
  match &control.kind {
    ControlKind::CheckBox => Widget::Toggle,
    ControlKind::DropDownList => Widget::SingleSelect { options: select_options(control, parameter) },
    ControlKind::Clock => Widget::TimePicker,
    ControlKind::SingleSpinner => Widget::IntegerStepper { min: SPINNER_MIN, step: SPINNER_STEP },
    ControlKind::TextField => Widget::FreeText { max_length: FREE_TEXT_MAX_LENGTH },
    ControlKind::Unrecognized(tag) => {
      trace!("Control '{}' has unrecognized type '{}', using free text", control.id, tag);
      Widget::FreeText { max_length: FREE_TEXT_MAX_LENGTH }
    }
  }
}

/// Form engine for one on-screen strategy form.
///
/// The model is shared read-only; the form state belongs to this instance alone.
#[derive(Debug, Clone)]
pub struct StrategyForm {
  model: Arc<StrategyModel>,
  state: FormState,
}

impl StrategyForm {
  pub fn new(model: Arc<StrategyModel>) -> Self {
    Self { model, state: FormState::new() }
  }

  pub fn model(&self) -> &StrategyModel {
    &self.model
  }

  pub fn state(&self) -> &FormState {
    &self.state
  }

  pub fn value(&self, parameter_name: &str) -> Option<&FormValue> {
    self.state.get(parameter_name)
  }

  /// Pairs every layout control with its parameter, in declaration order.
  pub fn describe_controls(&self) -> Vec<ControlDescriptor<'_>> {
    self.model.controls.iter()
      .map(|control| {
        let parameter = control.parameter_ref.as_deref()
          .and_then(|name| self.model.parameter(name));
        ControlDescriptor {
          control,
          parameter,
          widget: widget_for(control, parameter),
          required: parameter.map_or(false, |p| p.is_required()),
        }
      })
      .collect()
  }

  /// Stores a value for a parameter, overwriting any previous one.
  ///
  /// Values for checkbox-bound parameters are stored as booleans; everything
  /// else is stored as given. Nothing is validated here.
  pub fn set_value(&mut self, parameter_name: &str, raw: impl Into<FormValue>) {
    let raw = raw.into();
    let is_checkbox = self.model.control_for(parameter_name)
      .map_or(false, |c| c.kind == ControlKind::CheckBox);
    let value = if is_checkbox { FormValue::Bool(raw.as_bool()) } else { raw };
    trace!("set {} = {:?}", parameter_name, value);
    self.state.insert(parameter_name, value);
  }

  /// Stores a clock value as `HH:MM`.
  pub fn set_time(&mut self, parameter_name: &str, time: NaiveTime) {
    self.set_value(parameter_name, time.format(CLOCK_FORMAT).to_string());
  }

  pub fn clear_value(&mut self, parameter_name: &str) -> Option<FormValue> {
    self.state.remove(parameter_name)
  }

  /// Empties the form, then applies each bound control's `initValue`.
  pub fn reset(&mut self) {
    self.state.clear();
    let model = Arc::clone(&self.model);
    for control in &model.controls {
      let (Some(name), Some(init)) = (control.parameter_ref.as_deref(), control.init_value.as_deref()) else {
        continue;
      };
      let value = match (&control.kind, model.parameter(name)) {
        (ControlKind::DropDownList, Some(p)) => {
          FormValue::Text(p.wire_value_for(init).unwrap_or(init).to_string())
        }
        (ControlKind::SingleSpinner, _) => match init.trim().parse::<f64>() {
          Ok(n) => FormValue::Number(n),
          Err(_) => FormValue::Text(init.to_string()),
        },
        _ => FormValue::Text(init.to_string()),
      };
      self.set_value(name, value);
    }
    debug!("Form for '{}' reset with {} initial value(s)", model.strategy_name, self.state.len());
  }

  fn condition_fires(&self, condition: &EditCondition) -> bool {
    let current = self.state.get(&condition.field);
    let field_number = || current.map_or(f64::NAN, FormValue::as_number);
    let bound = || parse_float(condition.field2.as_deref().unwrap_or(""));
    match &condition.operator {
      // NaN on either side never fires.
      EditOperator::Lt => field_number() >= bound(),
      EditOperator::Gt => field_number() <= bound(),
      EditOperator::Nx => current.map_or(true, FormValue::is_empty),
      EditOperator::Eq => match (current, condition.value.as_deref()) {
        (None, None) => false,
        (Some(FormValue::Text(s)), Some(expected)) => s != expected,
        _ => true,
      },
      EditOperator::Unsupported(op) => {
        trace!("Operator '{}' on field '{}' is not evaluated", op, condition.field);
        false
      }
    }
  }

  /// Evaluates every validation rule against the current values.
  ///
  /// A rule's message is included once when any of its conditions fires.
  /// An empty result means the form is valid.
  pub fn validate(&self) -> Vec<String> {
    let errors: Vec<String> = self.model.validation_rules.iter()
      .filter(|rule| rule.conditions.iter().any(|c| self.condition_fires(c)))
      .map(|rule| rule.error_message.clone())
      .collect();
    debug!("Validated '{}': {} failure(s)", self.model.strategy_name, errors.len());
    errors
  }
}
