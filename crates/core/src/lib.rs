//! `concord-core`: identifiers, attribute values and the correspondence
//! relation shared by every comparison step.
//!
//! No IO. The compare crate feeds extracted data in and reads the closed
//! relation back out.

pub mod correspondence;
pub mod equivalence;
pub mod language;
pub mod number;
pub mod resource;
pub mod value;

pub use correspondence::{CorrespondenceEdge, CorrespondenceSnapshot, CorrespondenceStore};
pub use equivalence::{EquivalenceConfig, ValueEquivalence};
pub use language::{InvalidLanguagePattern, LanguagePattern};
pub use resource::{Dataset, DatasetPair, Resource};
pub use value::{Datatype, Literal, TermError, Value};
