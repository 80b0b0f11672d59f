use std::sync::Arc;

use hashbrown::HashMap;
use ppdl::{Name, PpdlError, Res};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::bounds;
use crate::eval::{coerce, eval, Subs};
use crate::grounded::GroundedModel;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Fresh,
    Ready,
    Done,
}

/// Steps a grounded model stochastically.
///
/// Owns the single PRNG stream and the mutable state snapshot; all other
/// model data is immutable and shared. A failed `step` leaves the snapshot in
/// an intermediate form: `reset` before further use.
pub struct Simulator {
    model: Arc<GroundedModel>,
    states: Subs,
    rng: SmallRng,
    step_count: u64,
    phase: Phase,
}

impl Simulator {
    pub fn new(model: Arc<GroundedModel>, seed: u64) -> Self {
        let states = model.init_state.clone();
        Simulator {
            model,
            states,
            rng: SmallRng::seed_from_u64(seed),
            step_count: 0,
            phase: Phase::Fresh,
        }
    }

    pub fn model(&self) -> &GroundedModel {
        &self.model
    }

    /// The current state snapshot. Observation fluents are projected out:
    /// they only appear in the values returned by `reset`/`step`.
    pub fn states(&self) -> &Subs {
        &self.states
    }

    pub fn is_pomdp(&self) -> bool {
        self.model.is_pomdp()
    }

    /// Value bounds of every action and state fluent, derived from the
    /// preconditions and invariants.
    pub fn bounds(&self) -> HashMap<Name, (f64, f64)> {
        bounds::derive(&self.model)
    }

    pub fn reset(&mut self) -> Res<(Subs, bool)> {
        self.states = self.model.init_state.clone();
        self.step_count = 0;
        self.phase = Phase::Ready;
        let obs = if self.model.is_pomdp() {
            let subs = self.base_subs();
            self.observe(&subs)?
        } else {
            self.states.clone()
        };
        Ok((obs, false))
    }

    /// Samples one transition. Actions not mentioned take their defaults.
    pub fn step(&mut self, actions: &Subs) -> Res<(Subs, f64, bool)> {
        match self.phase {
            Phase::Fresh => {
                return Err(PpdlError::InvalidExpression(
                    "step() called before reset()".to_string(),
                ))
            }
            Phase::Done => return Ok((self.states.clone(), 0.0, true)),
            Phase::Ready => {}
        }
        if self.model.horizon == 0 {
            self.phase = Phase::Done;
            return Ok((self.states.clone(), 0.0, true));
        }

        let merged = self.merge_actions(actions)?;
        let mut subs = self.base_subs();
        subs.extend(merged);

        // stratified evaluation: all level-0 next-state CPFs, then each
        // declared level in ascending order
        for g in &self.model.cpf_order[&0] {
            if let Some(next) = self.model.next_state.get(g) {
                let v = eval(&self.model.cpfs[next], &subs, &mut self.rng)?;
                subs.insert(next.clone(), coerce(v, &self.model.state_ranges[g])?);
            }
        }
        for (_, names) in self.model.cpf_order.range(1..) {
            for g in names {
                let v = eval(&self.model.cpfs[g], &subs, &mut self.rng)?;
                subs.insert(g.clone(), coerce(v, &self.model.gvar_ranges[g])?);
            }
        }

        // reward reads the pre-collapse snapshot: primed names resolve to
        // the freshly sampled next state, unprimed to the pre-step values
        let reward = eval(&self.model.reward, &subs, &mut self.rng)?.as_real()?;

        // collapse state[x] <- state[x']
        for (state, next) in &self.model.next_state {
            if let Some(v) = subs.remove(next) {
                self.states.insert(state.clone(), v.clone());
                subs.insert(state.clone(), v);
            }
        }

        let obs = if self.model.is_pomdp() {
            self.observe(&subs)?
        } else {
            self.states.clone()
        };

        let mut done = false;
        for terminal in &self.model.terminals {
            if eval(terminal, &subs, &mut self.rng)?.as_bool()? {
                done = true;
                break;
            }
        }
        self.step_count += 1;
        if self.step_count == self.model.horizon {
            done = true;
        }
        if done {
            self.phase = Phase::Done;
        }
        Ok((obs, reward, done))
    }

    /// Evaluates every action precondition under the merged actions.
    pub fn check_action_preconditions(&mut self, actions: &Subs) -> Res<()> {
        let merged = self.merge_actions(actions)?;
        let mut subs = self.base_subs();
        subs.extend(merged);
        for precondition in &self.model.preconditions {
            if !eval(precondition, &subs, &mut self.rng)?.as_bool()? {
                return Err(PpdlError::PreconditionViolated(precondition.to_string()));
            }
        }
        Ok(())
    }

    /// Evaluates every state invariant against the current snapshot.
    pub fn check_state_invariants(&mut self) -> Res<()> {
        let subs = self.base_subs();
        for invariant in &self.model.invariants {
            if !eval(invariant, &subs, &mut self.rng)?.as_bool()? {
                return Err(PpdlError::InvariantViolated(invariant.to_string()));
            }
        }
        Ok(())
    }

    fn observe(&mut self, subs: &Subs) -> Res<Subs> {
        let mut obs = Subs::with_capacity(self.model.observ.len());
        for g in &self.model.cpf_order[&0] {
            if self.model.observ.contains_key(g) {
                let v = eval(&self.model.cpfs[g], subs, &mut self.rng)?;
                obs.insert(g.clone(), coerce(v, &self.model.observ_ranges[g])?);
            }
        }
        Ok(obs)
    }

    /// Substitution holding everything a CPF may read before this step's
    /// primed values exist: constants, the state snapshot, action defaults
    /// and the declared defaults of derived/interm fluents.
    fn base_subs(&self) -> Subs {
        let model = &self.model;
        let mut subs = Subs::with_capacity(
            model.non_fluents.len()
                + self.states.len()
                + model.actions.len()
                + model.derived.len()
                + model.interm.len(),
        );
        for (k, v) in &model.non_fluents {
            subs.insert(k.clone(), v.clone());
        }
        for (k, v) in &self.states {
            subs.insert(k.clone(), v.clone());
        }
        for (k, v) in &model.actions {
            subs.insert(k.clone(), v.clone());
        }
        for (k, v) in &model.derived {
            subs.insert(k.clone(), v.clone());
        }
        for (k, v) in &model.interm {
            subs.insert(k.clone(), v.clone());
        }
        subs
    }

    fn merge_actions(&self, actions: &Subs) -> Res<Subs> {
        let mut merged = self.model.actions.clone();
        for (name, value) in actions {
            let range = self
                .model
                .action_ranges
                .get(name)
                .ok_or_else(|| PpdlError::UndefinedVariable(name.clone()))?;
            merged.insert(name.clone(), coerce(value.clone(), range)?);
        }
        Ok(merged)
    }
}
