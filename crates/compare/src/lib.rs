//! `concord-compare`: cross-dataset comparison engine.
//!
//! Pure engine crate: receives extracted entities through [`AspectSource`],
//! returns measures, findings and new correspondences. The CSV source is the
//! only IO it performs.

pub mod aspect;
pub mod attribute;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod finding;
pub mod mapping;
pub mod measure;
pub mod model;
pub mod population;
pub mod source;

pub use aspect::{Aspect, AspectSource};
pub use config::CompareConfig;
pub use decimal::Decimal;
pub use engine::{run, run_files};
pub use error::CompareError;
pub use finding::{Finding, FindingKind, Findings, KnownWrongValues, WrongValue};
pub use measure::{Measure, MeasureValue, Measurement};
pub use model::{CompareResult, CompareSummary, PriorState};
pub use source::{CsvSource, MemorySource};
