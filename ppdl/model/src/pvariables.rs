use derive_more::Display;

use crate::{Expr, Name, Range, Value};

/// The class of a pvariable, driving how it is grounded and when its CPF is
/// evaluated within a step.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum FluentKind {
    #[display("non-fluent")]
    NonFluent,
    #[display("state-fluent")]
    State,
    #[display("action-fluent")]
    Action,
    #[display("derived-fluent")]
    Derived,
    #[display("interm-fluent")]
    Interm,
    #[display("observ-fluent")]
    Observ,
}

/// A parameterized variable declaration.
#[derive(Clone, Debug)]
pub struct Pvariable {
    pub name: Name,
    /// Ordered parameter types; empty for scalar variables.
    pub param_types: Vec<Name>,
    pub range: Range,
    pub kind: FluentKind,
    pub default: Value,
    /// Stratification level, only meaningful for derived/interm fluents.
    pub level: Option<u32>,
}

impl Pvariable {
    pub fn new(
        name: impl Into<Name>,
        param_types: Vec<Name>,
        range: Range,
        kind: FluentKind,
        default: Value,
    ) -> Self {
        Pvariable {
            name: name.into(),
            param_types,
            range,
            kind,
            default,
            level: None,
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn arity(&self) -> usize {
        self.param_types.len()
    }

    pub fn is_non_fluent(&self) -> bool {
        self.kind == FluentKind::NonFluent
    }

    pub fn is_state_fluent(&self) -> bool {
        self.kind == FluentKind::State
    }

    /// Derived/interm fluents without an explicit level sit at level 1.
    pub fn level_or_default(&self) -> u32 {
        self.level.unwrap_or(1)
    }
}

/// A conditional probability function: the expression defining the next value
/// of its head fluent. State-fluent heads carry the primed name.
#[derive(Clone, Debug)]
pub struct Cpf {
    pub head: Name,
    /// Parameter names of the head, `None` for scalar heads and for
    /// already-grounded CPFs.
    pub args: Option<Vec<Name>>,
    pub expr: Expr,
}

impl Cpf {
    pub fn new<A: Into<Name>>(
        head: impl Into<Name>,
        args: impl IntoIterator<Item = A>,
        expr: Expr,
    ) -> Self {
        let args: Vec<Name> = args.into_iter().map(|a| a.into()).collect();
        Cpf {
            head: head.into(),
            args: if args.is_empty() { None } else { Some(args) },
            expr,
        }
    }

    pub fn scalar(head: impl Into<Name>, expr: Expr) -> Self {
        Cpf {
            head: head.into(),
            args: None,
            expr,
        }
    }
}
