//! FAB Templates - Template Normalizer and Validator
//!
//! # Guarantees
//! 1. The id always matches the file name
//! 2. Legacy locations are migrated forward
//! 3. Rule values are strings
//! 4. Output is canonical and byte-stable
//! 5. Checks never mutate
//! 6. One bad file never stops a batch

pub mod coerce;
pub mod location;
pub mod templates;
pub mod canonical;
pub mod validation;
pub mod filenames;
pub mod report;
pub mod pipeline;

pub use coerce::coerce;
pub use location::{migrate, LocationFix, LocationFormat, LocationGroup, Migration, Rule};
pub use templates::{normalize, normalize_file, Change, Document, Normalization, TemplateError, TemplateId};
pub use canonical::{encode, encode_document};
pub use validation::{ValidationResult, ValidationRule, Validator, Violation};
pub use report::{BatchReport, FileOutcome, FileReport, Mode, Summary};
pub use pipeline::{process_file, Command, FixOptions, PipelineError, TemplateBatch};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
