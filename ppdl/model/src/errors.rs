use thiserror::Error;

use crate::Name;

pub type Res<T> = Result<T, PpdlError>;

/// Errors raised while grounding or simulating a program.
///
/// Grounding errors are fatal: no partial model is exposed. Runtime errors
/// propagate out of `step` and leave the simulator in an intermediate state
/// that must be `reset` before further use.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PpdlError {
    #[error("reference to undeclared name <{0}>")]
    UndefinedVariable(Name),

    #[error("fluent <{0}> is missing a valid CPF definition")]
    MissingCpfDefinition(Name),

    #[error("<{name}> takes {expected} arguments but {got} were supplied")]
    InvalidNumberOfArguments { name: Name, expected: usize, got: usize },

    #[error("malformed expression: {0}")]
    InvalidExpression(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("value out of range: {0}")]
    ValueOutOfRange(String),

    #[error("state invariant violated: {0}")]
    InvariantViolated(String),

    #[error("action precondition violated: {0}")]
    PreconditionViolated(String),

    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("arithmetic error: {0}")]
    Arithmetic(String),
}
