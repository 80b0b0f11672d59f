pub mod bounds;
mod env;
mod eval;
mod fuzzy;
mod grounded;
mod grounder;
mod simulator;

pub use env::*;
pub use eval::{eval, Subs};
pub use fuzzy::*;
pub use grounded::*;
pub use grounder::{ground, grounded_name};
pub use simulator::*;
