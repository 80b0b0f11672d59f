use std::collections::BTreeMap;

use hashbrown::HashMap;
use ppdl::{Expr, Name, Objects, Range, Value};

/// A fully grounded program: every parameterized variable has been expanded
/// over its object arguments and every expression references grounded names
/// only. Built once by the grounder and immutable afterwards.
#[derive(Clone, Debug)]
pub struct GroundedModel {
    pub objects: Objects,

    /// Constants of the instance, by grounded name.
    pub non_fluents: HashMap<Name, Value>,

    /// Default value of each state fluent.
    pub states: HashMap<Name, Value>,
    pub state_ranges: HashMap<Name, Range>,

    /// Default value of each action fluent.
    pub actions: HashMap<Name, Value>,
    pub action_ranges: HashMap<Name, Range>,

    pub derived: HashMap<Name, Value>,
    pub interm: HashMap<Name, Value>,

    pub observ: HashMap<Name, Value>,
    pub observ_ranges: HashMap<Name, Range>,

    /// CPF expressions. State dynamics are keyed by the primed name,
    /// derived/interm/observation fluents by their own name.
    pub cpfs: HashMap<Name, Expr>,

    /// Evaluation strata: level -> grounded names in evaluation order.
    /// State and observation fluents live at level 0, derived/interm at
    /// their declared level.
    pub cpf_order: BTreeMap<u32, Vec<Name>>,

    /// Bijection between state fluents and their primed next-state names.
    pub next_state: HashMap<Name, Name>,
    pub prev_state: HashMap<Name, Name>,

    pub init_state: HashMap<Name, Value>,

    pub reward: Expr,
    pub preconditions: Vec<Expr>,
    pub invariants: Vec<Expr>,
    pub terminals: Vec<Expr>,

    pub max_allowed_actions: usize,
    pub horizon: u64,
    pub discount: f64,

    /// Back-mapping from a grounded name to the pvariable it instantiates.
    pub gvar_to_pvar: HashMap<Name, Name>,
    /// Object arguments the grounded name was generated from.
    pub gvar_args: HashMap<Name, Vec<Name>>,
    /// Range of every grounded name, primed names included.
    pub gvar_ranges: HashMap<Name, Range>,
}

impl GroundedModel {
    /// True iff the program declares observation fluents: the agent then
    /// sees observations rather than the raw state.
    pub fn is_pomdp(&self) -> bool {
        !self.observ.is_empty()
    }

    pub fn range_of(&self, gvar: &str) -> Option<&Range> {
        self.gvar_ranges.get(gvar)
    }
}
