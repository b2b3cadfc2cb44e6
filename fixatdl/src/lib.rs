// fixatdl/src/lib.rs
// Main entry point for the FIX ATDL library

//! # fixatdl
//!
//! Reads FIX ATDL strategy definitions and drives order-entry forms from them:
//!
//! - Parse strategy XML into an immutable `StrategyModel`
//! - Describe the form controls and hold the values a user enters
//! - Validate the values against the document's `StrategyEdit` rules
//! - Encode the values as FIX `tag=value` fields
//!
//! ```
//! use std::sync::Arc;
//! use fixatdl::{parse_strategy_document, StrategyForm};
//!
//! let xml = r#"<Strategy name="TWAP">
//!   <Parameter name="maxParticipation" use="required"/>
//!   <StrategyEdit errorMessage="Participation too high">
//!     <Edit field="maxParticipation" operator="LT" field2="100"/>
//!   </StrategyEdit>
//! </Strategy>"#;
//! let mut form = StrategyForm::new(Arc::new(parse_strategy_document(xml).unwrap()));
//! form.set_value("maxParticipation", "150");
//! assert_eq!(form.validate(), vec!["Participation too high".to_string()]);
//! ```

mod base;
mod atdl_parser;
pub mod model;
pub mod config;
pub mod strategy_form;
pub mod strategy_repository;
pub mod fix_encoder;

pub use base::AtdlError;
pub use atdl_parser::{extract_strategy_name, parse_named_strategy, parse_strategy_document};
pub use config::AtdlConfig;
pub use model::StrategyModel;
pub use strategy_form::{FormState, FormValue, StrategyForm};
pub use strategy_repository::StrategyRepository;
pub use fix_encoder::FixTagValueEncoder;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
