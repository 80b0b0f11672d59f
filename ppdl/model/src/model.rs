use std::fmt::{Display, Formatter};

use crate::{Cpf, Expr, Name, Pvariable, Value};

/// Declared bound on the number of non-default actions per step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MaxActions {
    Limit(u64),
    /// The literal `pos-inf`: every declared action may be set.
    PosInf,
}

/// The domain block: declarations and dynamics, parameterized over types.
#[derive(Clone, Debug)]
pub struct Domain {
    pub name: Name,
    pub pvariables: Vec<Pvariable>,
    /// CPFs for state fluents; heads carry the primed name.
    pub cpfs: Vec<Cpf>,
    pub derived_cpfs: Vec<Cpf>,
    pub intermediate_cpfs: Vec<Cpf>,
    pub observation_cpfs: Vec<Cpf>,
    pub reward: Expr,
    pub preconditions: Vec<Expr>,
    pub invariants: Vec<Expr>,
    pub terminals: Vec<Expr>,
    /// Legacy state-action constraint block; ignored with a warning.
    pub constraints: Vec<Expr>,
}

impl Domain {
    pub fn new(name: impl Into<Name>, reward: Expr) -> Self {
        Domain {
            name: name.into(),
            pvariables: Vec::new(),
            cpfs: Vec::new(),
            derived_cpfs: Vec::new(),
            intermediate_cpfs: Vec::new(),
            observation_cpfs: Vec::new(),
            reward,
            preconditions: Vec::new(),
            invariants: Vec::new(),
            terminals: Vec::new(),
            constraints: Vec::new(),
        }
    }
}

/// One `(name, args) = value` entry of an init-state or non-fluents block.
#[derive(Clone, Debug)]
pub struct InitEntry {
    pub name: Name,
    pub args: Vec<Name>,
    pub value: Value,
}

impl InitEntry {
    pub fn new<A: Into<Name>>(
        name: impl Into<Name>,
        args: impl IntoIterator<Item = A>,
        value: Value,
    ) -> Self {
        InitEntry {
            name: name.into(),
            args: args.into_iter().map(|a| a.into()).collect(),
            value,
        }
    }
}

/// The instance block: roll-out parameters and the initial state.
#[derive(Clone, Debug)]
pub struct Instance {
    pub name: Name,
    pub horizon: i64,
    pub discount: f64,
    pub max_nondef_actions: MaxActions,
    pub init_state: Vec<InitEntry>,
}

impl Instance {
    pub fn new(name: impl Into<Name>, horizon: i64, discount: f64) -> Self {
        Instance {
            name: name.into(),
            horizon,
            discount,
            max_nondef_actions: MaxActions::PosInf,
            init_state: Vec::new(),
        }
    }
}

/// The non-fluents block: the object universe and constant initializations.
#[derive(Clone, Debug, Default)]
pub struct NonFluents {
    pub objects: Vec<(Name, Vec<Name>)>,
    pub init: Vec<InitEntry>,
}

/// A parsed program, still parameterized over object types. This is the
/// contract delivered by the parser and consumed by the grounder.
#[derive(Clone, Debug)]
pub struct LiftedModel {
    pub domain: Domain,
    pub instance: Instance,
    pub non_fluents: NonFluents,
}

impl Display for LiftedModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "domain {} {{", self.domain.name)?;
        for pvar in &self.domain.pvariables {
            writeln!(
                f,
                "  {}({}): {} {} default {};",
                pvar.name,
                pvar.param_types.join(", "),
                pvar.kind,
                pvar.range,
                pvar.default
            )?;
        }
        writeln!(f, "  reward = {};", self.domain.reward)?;
        writeln!(f, "}}")?;
        writeln!(
            f,
            "instance {} {{ horizon = {}; discount = {}; }}",
            self.instance.name, self.instance.horizon, self.instance.discount
        )
    }
}
