//! Small builder for assembling lifted programs in tests.

use ppdl::{
    Cpf, Domain, Expr, FluentKind, InitEntry, Instance, LiftedModel, MaxActions, Name, NonFluents,
    Pvariable, Range, Value,
};
use ppdl_sim::Subs;

pub struct ModelBuilder {
    domain: Domain,
    instance: Instance,
    non_fluents: NonFluents,
}

#[allow(dead_code)]
impl ModelBuilder {
    pub fn new(name: &str) -> Self {
        ModelBuilder {
            domain: Domain::new(name, Expr::real(0.0)),
            instance: Instance::new("test_instance", 10, 1.0),
            non_fluents: NonFluents::default(),
        }
    }

    pub fn objects(mut self, tpe: &str, objs: &[&str]) -> Self {
        self.non_fluents
            .objects
            .push((tpe.into(), objs.iter().map(|&o| Name::from(o)).collect()));
        self
    }

    fn pvariable(
        mut self,
        name: &str,
        params: &[&str],
        range: Range,
        kind: FluentKind,
        default: Value,
    ) -> Self {
        self.domain.pvariables.push(Pvariable::new(
            name,
            params.iter().map(|&p| Name::from(p)).collect(),
            range,
            kind,
            default,
        ));
        self
    }

    pub fn state(self, name: &str, params: &[&str], range: Range, default: Value) -> Self {
        self.pvariable(name, params, range, FluentKind::State, default)
    }

    pub fn action(self, name: &str, params: &[&str], range: Range, default: Value) -> Self {
        self.pvariable(name, params, range, FluentKind::Action, default)
    }

    pub fn non_fluent(self, name: &str, params: &[&str], range: Range, default: Value) -> Self {
        self.pvariable(name, params, range, FluentKind::NonFluent, default)
    }

    pub fn observ(self, name: &str, params: &[&str], range: Range, default: Value) -> Self {
        self.pvariable(name, params, range, FluentKind::Observ, default)
    }

    pub fn interm(mut self, name: &str, range: Range, default: Value, level: u32) -> Self {
        self.domain.pvariables.push(
            Pvariable::new(name, vec![], range, FluentKind::Interm, default).with_level(level),
        );
        self
    }

    pub fn cpf(mut self, head: &str, args: &[&str], expr: Expr) -> Self {
        self.domain.cpfs.push(Cpf::new(head, args.iter().copied(), expr));
        self
    }

    pub fn interm_cpf(mut self, head: &str, expr: Expr) -> Self {
        self.domain.intermediate_cpfs.push(Cpf::scalar(head, expr));
        self
    }

    pub fn observ_cpf(mut self, head: &str, args: &[&str], expr: Expr) -> Self {
        self.domain
            .observation_cpfs
            .push(Cpf::new(head, args.iter().copied(), expr));
        self
    }

    pub fn reward(mut self, expr: Expr) -> Self {
        self.domain.reward = expr;
        self
    }

    pub fn precondition(mut self, expr: Expr) -> Self {
        self.domain.preconditions.push(expr);
        self
    }

    pub fn invariant(mut self, expr: Expr) -> Self {
        self.domain.invariants.push(expr);
        self
    }

    pub fn terminal(mut self, expr: Expr) -> Self {
        self.domain.terminals.push(expr);
        self
    }

    pub fn horizon(mut self, horizon: i64) -> Self {
        self.instance.horizon = horizon;
        self
    }

    pub fn max_actions(mut self, max: MaxActions) -> Self {
        self.instance.max_nondef_actions = max;
        self
    }

    pub fn init_state(mut self, name: &str, args: &[&str], value: Value) -> Self {
        self.instance
            .init_state
            .push(InitEntry::new(name, args.iter().copied(), value));
        self
    }

    pub fn init_non_fluent(mut self, name: &str, args: &[&str], value: Value) -> Self {
        self.non_fluents
            .init
            .push(InitEntry::new(name, args.iter().copied(), value));
        self
    }

    pub fn build(self) -> LiftedModel {
        LiftedModel {
            domain: self.domain,
            instance: self.instance,
            non_fluents: self.non_fluents,
        }
    }
}

pub fn actions(pairs: &[(&str, Value)]) -> Subs {
    pairs
        .iter()
        .map(|(name, value)| (Name::from(*name), value.clone()))
        .collect()
}
