use std::sync::Arc;

use hashbrown::HashMap;
use itertools::Itertools;
use ppdl::{Name, PpdlError, Range, Res, Value};

use crate::eval::Subs;
use crate::grounded::GroundedModel;
use crate::simulator::Simulator;

/// Range descriptor of a single fluent in an action or observation space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Space {
    /// `n` consecutive integer values starting at `start`. Booleans are
    /// `Discrete { n: 2, start: 0 }`.
    Discrete { n: i64, start: i64 },
    /// A real interval.
    Box { low: f64, high: f64 },
}

#[derive(Copy, Clone, Debug)]
pub struct EnvOptions {
    pub enforce_action_constraints: bool,
    pub seed: u64,
}

impl Default for EnvOptions {
    fn default() -> Self {
        EnvOptions {
            enforce_action_constraints: false,
            seed: 0,
        }
    }
}

impl EnvOptions {
    pub fn enforce_action_constraints(mut self, enforce: bool) -> Self {
        self.enforce_action_constraints = enforce;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Rendering collaborator, called opportunistically after every transition.
pub trait Visualizer {
    fn render(&mut self, state: &Subs) -> Option<String>;
}

/// Default visualizer: does nothing.
pub struct NoopVisualizer;

impl Visualizer for NoopVisualizer {
    fn render(&mut self, _state: &Subs) -> Option<String> {
        None
    }
}

/// Renders the state as one sorted `name = value` line per fluent.
pub struct TextVisualizer;

impl Visualizer for TextVisualizer {
    fn render(&mut self, state: &Subs) -> Option<String> {
        let text = state
            .iter()
            .map(|(k, v)| format!("{k} = {v}"))
            .sorted()
            .join("\n");
        Some(text)
    }
}

/// RL-style wrapper around the simulator: space descriptors, default-merged
/// actions, horizon bookkeeping and constraint enforcement.
pub struct Environment {
    model: Arc<GroundedModel>,
    sampler: Simulator,
    enforce_action_constraints: bool,
    action_space: HashMap<Name, Space>,
    observation_space: HashMap<Name, Space>,
    current_h: u64,
    done: bool,
    last_obs: Subs,
    visualizer: Box<dyn Visualizer>,
}

impl Environment {
    pub fn new(model: GroundedModel, options: EnvOptions) -> Res<Self> {
        let model = Arc::new(model);
        let sampler = Simulator::new(model.clone(), options.seed);
        let bounds = sampler.bounds();

        let mut action_space = HashMap::with_capacity(model.actions.len());
        for (name, range) in &model.action_ranges {
            action_space.insert(name.clone(), space_for(name, range, &bounds)?);
        }

        // the agent sees observations when the program declares any,
        // the raw state otherwise
        let observed: Vec<(&Name, &Range)> = if model.is_pomdp() {
            model.observ_ranges.iter().collect()
        } else {
            model.state_ranges.iter().collect()
        };
        let mut observation_space = HashMap::with_capacity(observed.len());
        for (name, range) in observed {
            observation_space.insert(name.clone(), space_for(name, range, &bounds)?);
        }

        Ok(Environment {
            model,
            sampler,
            enforce_action_constraints: options.enforce_action_constraints,
            action_space,
            observation_space,
            current_h: 0,
            done: false,
            last_obs: Subs::new(),
            visualizer: Box::new(NoopVisualizer),
        })
    }

    pub fn set_visualizer(&mut self, visualizer: Box<dyn Visualizer>) {
        self.visualizer = visualizer;
    }

    pub fn reset(&mut self) -> Res<Subs> {
        self.current_h = 0;
        let (obs, done) = self.sampler.reset()?;
        self.done = done;
        self.last_obs = obs.clone();
        if let Some(frame) = self.visualizer.render(self.sampler.states()) {
            tracing::debug!("{frame}");
        }
        Ok(obs)
    }

    pub fn step(&mut self, actions: &Subs) -> Res<(Subs, f64, bool, HashMap<Name, Value>)> {
        let info = HashMap::new();
        if self.done {
            return Ok((self.last_obs.clone(), 0.0, true, info));
        }
        if actions.len() > self.model.max_allowed_actions {
            return Err(PpdlError::InvalidNumberOfArguments {
                name: "actions".into(),
                expected: self.model.max_allowed_actions,
                got: actions.len(),
            });
        }

        // full action vector: defaults overlaid with the supplied values,
        // booleans coerced from their Discrete(2) encoding
        let mut clipped = self.model.actions.clone();
        for (name, value) in actions {
            let space = self
                .action_space
                .get(name)
                .ok_or_else(|| PpdlError::UndefinedVariable(name.clone()))?;
            let value = match (space, self.model.action_ranges.get(name)) {
                (Space::Discrete { n: 2, start: 0 }, Some(Range::Bool)) => {
                    Value::Bool(truthy(value)?)
                }
                _ => value.clone(),
            };
            clipped.insert(name.clone(), value);
        }

        if self.enforce_action_constraints {
            self.sampler.check_action_preconditions(&clipped)?;
        }

        let (obs, reward, done) = self.sampler.step(&clipped)?;
        self.done = done;
        if !self.done {
            self.sampler.check_state_invariants()?;
        }
        self.current_h += 1;
        if self.current_h == self.model.horizon {
            self.done = true;
        }

        if let Some(frame) = self.visualizer.render(self.sampler.states()) {
            tracing::debug!("{frame}");
        }
        self.last_obs = obs.clone();
        Ok((obs, reward, self.done, info))
    }

    pub fn render(&mut self) -> Option<String> {
        self.visualizer.render(self.sampler.states())
    }

    /// The raw state snapshot, regardless of partial observability.
    pub fn state(&self) -> &Subs {
        self.sampler.states()
    }

    pub fn action_space(&self) -> &HashMap<Name, Space> {
        &self.action_space
    }

    pub fn observation_space(&self) -> &HashMap<Name, Space> {
        &self.observation_space
    }

    pub fn horizon(&self) -> u64 {
        self.model.horizon
    }

    pub fn discount(&self) -> f64 {
        self.model.discount
    }

    pub fn num_concurrent_actions(&self) -> usize {
        self.model.max_allowed_actions
    }

    pub fn non_fluents(&self) -> &HashMap<Name, Value> {
        &self.model.non_fluents
    }

    pub fn model(&self) -> &GroundedModel {
        &self.model
    }
}

fn space_for(name: &Name, range: &Range, bounds: &HashMap<Name, (f64, f64)>) -> Res<Space> {
    let (low, high) = bounds.get(name).copied().unwrap_or((f64::NEG_INFINITY, f64::INFINITY));
    match range {
        Range::Real => Ok(Space::Box { low, high }),
        Range::Bool => Ok(Space::Discrete { n: 2, start: 0 }),
        Range::Int => {
            // unbounded sides default to the 32-bit integer extremes
            let low = if low.is_finite() { low as i64 } else { i32::MIN as i64 };
            let high = if high.is_finite() { high as i64 } else { i32::MAX as i64 };
            Ok(Space::Discrete {
                n: high - low + 1,
                start: low,
            })
        }
        Range::Enum(tpe) => Err(PpdlError::TypeMismatch(format!(
            "unsupported range <{tpe}> for fluent <{name}> in environment space"
        ))),
    }
}

fn truthy(value: &Value) -> Res<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(i) => Ok(*i != 0),
        Value::Real(r) => Ok(*r != 0.0),
        Value::Enum(e) => Err(PpdlError::TypeMismatch(format!(
            "cannot coerce <{e}> to a boolean action"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grounder::ground;
    use ppdl::{CmpOp, Cpf, Domain, Expr, FluentKind, Instance, LiftedModel, NonFluents, Pvariable};

    fn ranged_model() -> LiftedModel {
        let mut domain = Domain::new("spaces", Expr::real(0.0));
        domain.pvariables.push(Pvariable::new(
            "s",
            vec![],
            Range::Bool,
            FluentKind::State,
            Value::Bool(false),
        ));
        domain.cpfs.push(Cpf::scalar("s'", Expr::var("s")));
        domain.pvariables.push(Pvariable::new(
            "flip",
            vec![],
            Range::Bool,
            FluentKind::Action,
            Value::Bool(false),
        ));
        domain.pvariables.push(Pvariable::new(
            "amount",
            vec![],
            Range::Int,
            FluentKind::Action,
            Value::Int(0),
        ));
        domain.pvariables.push(Pvariable::new(
            "rate",
            vec![],
            Range::Real,
            FluentKind::Action,
            Value::Real(0.0),
        ));
        domain.preconditions.push(Expr::Logic(
            ppdl::LogicOp::And,
            vec![
                Expr::cmp(CmpOp::Geq, Expr::var("amount"), Expr::int(0)),
                Expr::cmp(CmpOp::Leq, Expr::var("amount"), Expr::int(5)),
            ],
        ));
        LiftedModel {
            domain,
            instance: Instance::new("i1", 10, 1.0),
            non_fluents: NonFluents::default(),
        }
    }

    fn environment(ast: &LiftedModel) -> Environment {
        Environment::new(ground(ast).unwrap(), EnvOptions::default()).unwrap()
    }

    #[test]
    fn space_descriptors() {
        let env = environment(&ranged_model());
        assert_eq!(env.action_space()["flip"], Space::Discrete { n: 2, start: 0 });
        assert_eq!(env.action_space()["amount"], Space::Discrete { n: 6, start: 0 });
        assert_eq!(
            env.action_space()["rate"],
            Space::Box {
                low: f64::NEG_INFINITY,
                high: f64::INFINITY
            }
        );
        assert_eq!(env.observation_space()["s"], Space::Discrete { n: 2, start: 0 });
    }

    #[test]
    fn unbounded_int_spans_i32() {
        let mut ast = ranged_model();
        ast.domain.preconditions.clear();
        let env = environment(&ast);
        assert_eq!(
            env.action_space()["amount"],
            Space::Discrete {
                n: i32::MAX as i64 - i32::MIN as i64 + 1,
                start: i32::MIN as i64
            }
        );
    }

    #[test]
    fn discrete_two_coerces_booleans() {
        let mut env = environment(&ranged_model());
        env.reset().unwrap();
        let mut actions = Subs::new();
        actions.insert("flip".into(), Value::Int(1));
        let (_, _, done, _) = env.step(&actions).unwrap();
        assert!(!done);
    }

    #[test]
    fn too_many_actions_is_rejected() {
        let mut ast = ranged_model();
        ast.instance.max_nondef_actions = ppdl::MaxActions::Limit(1);
        let mut env = environment(&ast);
        env.reset().unwrap();
        let mut actions = Subs::new();
        actions.insert("flip".into(), Value::Bool(true));
        actions.insert("amount".into(), Value::Int(1));
        assert!(matches!(
            env.step(&actions),
            Err(PpdlError::InvalidNumberOfArguments { .. })
        ));
    }
}
