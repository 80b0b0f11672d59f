pub mod errors;
mod expressions;
mod model;
mod objects;
mod pvariables;
mod values;

pub use expressions::*;
pub use model::*;
pub use objects::*;
pub use pvariables::*;
pub use values::*;

pub use errors::{PpdlError, Res};

/// Identifier appearing in a program: a type, an object, a pvariable or a
/// grounded fluent name. Grounded names are formed by joining the base name
/// with its object arguments and are globally unique.
pub type Name = compact_str::CompactString;
