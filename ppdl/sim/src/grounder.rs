use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};
use ppdl::{
    AggOp, ArithOp, Cpf, Expr, FluentKind, LiftedModel, LogicOp, MathFn, MaxActions, Name, Objects,
    PpdlError, Pvariable, Res, Value,
};

use crate::eval::coerce;
use crate::grounded::GroundedModel;

pub const PRIME: char = '\'';

/// Binding environment mapping parameter names to object identifiers.
type Bindings = HashMap<Name, Name>;

/// Joins a base name with its object arguments. A trailing prime on the base
/// is preserved after the joined arguments: `p'` over `(o1)` becomes `p_o1'`.
pub fn grounded_name(base: &str, args: &[Name]) -> Name {
    let (stem, primed) = match base.strip_suffix(PRIME) {
        Some(stem) => (stem, true),
        None => (base, false),
    };
    if args.is_empty() {
        return Name::from(base);
    }
    let mut name = String::with_capacity(stem.len() + args.iter().map(|a| a.len() + 1).sum::<usize>());
    name.push_str(stem);
    for arg in args {
        name.push('_');
        name.push_str(arg);
    }
    if primed {
        name.push(PRIME);
    }
    Name::from(name)
}

fn primed(name: &str) -> Name {
    let mut p = String::with_capacity(name.len() + 1);
    p.push_str(name);
    p.push(PRIME);
    Name::from(p)
}

/// Grounds a lifted program into a closed model. Fatal on any error: no
/// partial model is ever exposed.
pub fn ground(ast: &LiftedModel) -> Res<GroundedModel> {
    Grounder::new(ast).run()
}

struct Grounder<'a> {
    ast: &'a LiftedModel,
    objects: Objects,
    decls: HashMap<Name, &'a Pvariable>,

    non_fluents: HashMap<Name, Value>,
    states: HashMap<Name, Value>,
    state_ranges: HashMap<Name, ppdl::Range>,
    actions: HashMap<Name, Value>,
    action_ranges: HashMap<Name, ppdl::Range>,
    derived: HashMap<Name, Value>,
    interm: HashMap<Name, Value>,
    observ: HashMap<Name, Value>,
    observ_ranges: HashMap<Name, ppdl::Range>,
    cpfs: HashMap<Name, Expr>,
    cpf_order: BTreeMap<u32, Vec<Name>>,
    next_state: HashMap<Name, Name>,
    prev_state: HashMap<Name, Name>,
    gvar_to_pvar: HashMap<Name, Name>,
    gvar_args: HashMap<Name, Vec<Name>>,
    gvar_ranges: HashMap<Name, ppdl::Range>,
}

impl<'a> Grounder<'a> {
    fn new(ast: &'a LiftedModel) -> Self {
        let decls = ast
            .domain
            .pvariables
            .iter()
            .map(|pvar| (pvar.name.clone(), pvar))
            .collect();
        Grounder {
            ast,
            objects: Objects::new(),
            decls,
            non_fluents: Default::default(),
            states: Default::default(),
            state_ranges: Default::default(),
            actions: Default::default(),
            action_ranges: Default::default(),
            derived: Default::default(),
            interm: Default::default(),
            observ: Default::default(),
            observ_ranges: Default::default(),
            cpfs: Default::default(),
            cpf_order: BTreeMap::from([(0, Vec::new())]),
            next_state: Default::default(),
            prev_state: Default::default(),
            gvar_to_pvar: Default::default(),
            gvar_args: Default::default(),
            gvar_ranges: Default::default(),
        }
    }

    fn run(mut self) -> Res<GroundedModel> {
        self.extract_objects();
        self.ground_non_fluents()?;
        self.ground_pvariables_and_cpfs()?;
        self.check_level_cycles()?;
        let reward = self.ground_expr(&self.ast.domain.reward, &Bindings::new())?;
        let (terminals, preconditions, invariants) = self.ground_constraints()?;
        let init_state = self.ground_init_state()?;
        let horizon = self.ground_horizon()?;
        let discount = self.ground_discount()?;
        let max_allowed_actions = self.ground_max_actions();

        Ok(GroundedModel {
            objects: self.objects,
            non_fluents: self.non_fluents,
            states: self.states,
            state_ranges: self.state_ranges,
            actions: self.actions,
            action_ranges: self.action_ranges,
            derived: self.derived,
            interm: self.interm,
            observ: self.observ,
            observ_ranges: self.observ_ranges,
            cpfs: self.cpfs,
            cpf_order: self.cpf_order,
            next_state: self.next_state,
            prev_state: self.prev_state,
            init_state,
            reward,
            preconditions,
            invariants,
            terminals,
            max_allowed_actions,
            horizon,
            discount,
            gvar_to_pvar: self.gvar_to_pvar,
            gvar_args: self.gvar_args,
            gvar_ranges: self.gvar_ranges,
        })
    }

    fn extract_objects(&mut self) {
        for (tpe, objs) in &self.ast.non_fluents.objects {
            self.objects.add_type(tpe.clone(), objs.clone());
        }
    }

    fn ground_non_fluents(&mut self) -> Res<()> {
        for entry in &self.ast.non_fluents.init {
            let gname = grounded_name(&entry.name, &entry.args);
            match self.decls.get(entry.name.as_str()) {
                Some(decl) if decl.is_non_fluent() => {
                    if !entry.value.matches(&decl.range) {
                        return Err(PpdlError::TypeMismatch(format!(
                            "non-fluent <{gname}> declared {} but initialized with <{}>",
                            decl.range, entry.value
                        )));
                    }
                    let value = coerce(entry.value.clone(), &decl.range)?;
                    self.gvar_ranges.insert(gname.clone(), decl.range.clone());
                    self.non_fluents.insert(gname.clone(), value);
                }
                _ => {
                    tracing::warn!(
                        "non-fluents block initializes an undefined pvariable <{}>",
                        entry.name
                    );
                    self.non_fluents.insert(gname.clone(), entry.value.clone());
                }
            }
            self.gvar_to_pvar.insert(gname.clone(), entry.name.clone());
            self.gvar_args.insert(gname, entry.args.clone());
        }
        Ok(())
    }

    fn ground_pvariables_and_cpfs(&mut self) -> Res<()> {
        for pvar in &self.ast.domain.pvariables {
            let tuples = self.objects.tuples(&pvar.param_types)?;
            for args in tuples {
                let gname = grounded_name(&pvar.name, &args);
                self.gvar_to_pvar.insert(gname.clone(), pvar.name.clone());
                self.gvar_args.insert(gname.clone(), args.clone());
                self.gvar_ranges.insert(gname.clone(), pvar.range.clone());
                match pvar.kind {
                    FluentKind::NonFluent => {
                        if !self.non_fluents.contains_key(&gname) {
                            self.non_fluents.insert(gname, pvar.default.clone());
                        }
                    }
                    FluentKind::Action => {
                        self.actions.insert(gname.clone(), pvar.default.clone());
                        self.action_ranges.insert(gname, pvar.range.clone());
                    }
                    FluentKind::State => self.ground_state_fluent(pvar, gname, &args)?,
                    FluentKind::Derived => self.ground_leveled_fluent(pvar, gname, &args, true)?,
                    FluentKind::Interm => self.ground_leveled_fluent(pvar, gname, &args, false)?,
                    FluentKind::Observ => self.ground_observ_fluent(pvar, gname, &args)?,
                }
            }
        }
        Ok(())
    }

    fn ground_state_fluent(&mut self, pvar: &Pvariable, gname: Name, args: &[Name]) -> Res<()> {
        let head = primed(&pvar.name);
        let cpf = find_cpf(&self.ast.domain.cpfs, &head)
            .ok_or_else(|| PpdlError::MissingCpfDefinition(pvar.name.clone()))?;
        let expr = self.ground_cpf(cpf, &gname, args)?;
        let next = primed(&gname);
        self.states.insert(gname.clone(), pvar.default.clone());
        self.state_ranges.insert(gname.clone(), pvar.range.clone());
        self.next_state.insert(gname.clone(), next.clone());
        self.prev_state.insert(next.clone(), gname.clone());
        self.cpfs.insert(next.clone(), expr);
        self.cpf_order.entry(0).or_default().push(gname.clone());
        self.gvar_to_pvar.insert(next.clone(), pvar.name.clone());
        self.gvar_args.insert(next.clone(), args.to_vec());
        self.gvar_ranges.insert(next, pvar.range.clone());
        Ok(())
    }

    fn ground_leveled_fluent(
        &mut self,
        pvar: &Pvariable,
        gname: Name,
        args: &[Name],
        derived: bool,
    ) -> Res<()> {
        let pool = if derived {
            &self.ast.domain.derived_cpfs
        } else {
            &self.ast.domain.intermediate_cpfs
        };
        let cpf = find_cpf(pool, &pvar.name)
            .ok_or_else(|| PpdlError::MissingCpfDefinition(pvar.name.clone()))?;
        let expr = self.ground_cpf(cpf, &gname, args)?;
        if derived {
            self.derived.insert(gname.clone(), pvar.default.clone());
        } else {
            self.interm.insert(gname.clone(), pvar.default.clone());
        }
        self.cpfs.insert(gname.clone(), expr);
        self.cpf_order
            .entry(pvar.level_or_default())
            .or_default()
            .push(gname);
        Ok(())
    }

    fn ground_observ_fluent(&mut self, pvar: &Pvariable, gname: Name, args: &[Name]) -> Res<()> {
        let cpf = find_cpf(&self.ast.domain.observation_cpfs, &pvar.name)
            .ok_or_else(|| PpdlError::MissingCpfDefinition(pvar.name.clone()))?;
        let expr = self.ground_cpf(cpf, &gname, args)?;
        self.observ.insert(gname.clone(), pvar.default.clone());
        self.observ_ranges.insert(gname.clone(), pvar.range.clone());
        self.cpfs.insert(gname.clone(), expr);
        self.cpf_order.entry(0).or_default().push(gname);
        Ok(())
    }

    /// Clones the CPF prototype and rewrites its body under the binding of
    /// the head parameters to this instance's objects.
    fn ground_cpf(&self, cpf: &Cpf, gname: &Name, args: &[Name]) -> Res<Expr> {
        match &cpf.args {
            None => {
                if !args.is_empty() {
                    return Err(PpdlError::InvalidNumberOfArguments {
                        name: gname.clone(),
                        expected: 0,
                        got: args.len(),
                    });
                }
                self.ground_expr(&cpf.expr, &Bindings::new())
            }
            Some(params) => {
                if params.len() != args.len() {
                    return Err(PpdlError::InvalidNumberOfArguments {
                        name: gname.clone(),
                        expected: params.len(),
                        got: args.len(),
                    });
                }
                let dic = params.iter().cloned().zip(args.iter().cloned()).collect();
                self.ground_expr(&cpf.expr, &dic)
            }
        }
    }

    /// Recursive rewrite of an expression into its closed form under `dic`.
    fn ground_expr(&self, expr: &Expr, dic: &Bindings) -> Res<Expr> {
        match expr {
            Expr::Const(_) => Ok(expr.clone()),
            Expr::Var { name, args } => self.ground_var(name, args.as_deref(), dic),
            Expr::Arith(op, children) => Ok(Expr::Arith(*op, self.ground_all(children, dic)?)),
            Expr::Logic(op, children) => Ok(Expr::Logic(*op, self.ground_all(children, dic)?)),
            Expr::Cmp(op, lhs, rhs) => Ok(Expr::cmp(
                *op,
                self.ground_expr(lhs, dic)?,
                self.ground_expr(rhs, dic)?,
            )),
            Expr::If { cond, then, orelse } => Ok(Expr::ite(
                self.ground_expr(cond, dic)?,
                self.ground_expr(then, dic)?,
                self.ground_expr(orelse, dic)?,
            )),
            Expr::Apply(fun, children) => Ok(Expr::Apply(*fun, self.ground_all(children, dic)?)),
            Expr::Random(dist, children) => Ok(Expr::Random(*dist, self.ground_all(children, dic)?)),
            Expr::Aggregate(op, params, body) => self.ground_aggregate(*op, params, body, dic),
        }
    }

    fn ground_all(&self, children: &[Expr], dic: &Bindings) -> Res<Vec<Expr>> {
        children.iter().map(|c| self.ground_expr(c, dic)).collect()
    }

    fn ground_var(&self, name: &Name, args: Option<&[Name]>, dic: &Bindings) -> Res<Expr> {
        let args = match args {
            None | Some([]) => {
                // A bare name: a bound parameter used as a value, a declared
                // object literal, or a zero-arity variable reference.
                if let Some(obj) = dic.get(name) {
                    return Ok(Expr::Const(Value::Enum(obj.clone())));
                }
                if self.objects.contains_object(name) {
                    return Ok(Expr::Const(Value::Enum(name.clone())));
                }
                return Ok(Expr::var(name.clone()));
            }
            Some(args) => args,
        };
        let base = name.strip_suffix(PRIME).unwrap_or(name);
        match self.decls.get(base) {
            Some(decl) if decl.arity() != args.len() => {
                return Err(PpdlError::InvalidNumberOfArguments {
                    name: name.clone(),
                    expected: decl.arity(),
                    got: args.len(),
                })
            }
            Some(_) => {}
            None => return Err(PpdlError::UndefinedVariable(name.clone())),
        }
        let mut objs = Vec::with_capacity(args.len());
        for arg in args {
            if let Some(obj) = dic.get(arg) {
                objs.push(obj.clone());
            } else if self.objects.contains_object(arg) {
                objs.push(arg.clone());
            } else {
                return Err(PpdlError::UndefinedVariable(arg.clone()));
            }
        }
        Ok(Expr::var(grounded_name(name, &objs)))
    }

    /// Expands an aggregation over the Cartesian product of its bindings and
    /// combines the instances with the reduction of the aggregation kind.
    fn ground_aggregate(
        &self,
        op: AggOp,
        params: &[ppdl::TypedParam],
        body: &Expr,
        dic: &Bindings,
    ) -> Res<Expr> {
        let types: Vec<Name> = params.iter().map(|p| p.tpe.clone()).collect();
        let tuples = self.objects.tuples(&types)?;
        let count = tuples.len();
        let mut children = Vec::with_capacity(count);
        for tuple in &tuples {
            let mut extended = dic.clone();
            for (param, obj) in params.iter().zip(tuple) {
                extended.insert(param.name.clone(), obj.clone());
            }
            children.push(self.ground_expr(body, &extended)?);
        }
        Ok(reduce_aggregate(op, children, count))
    }

    fn ground_constraints(&self) -> Res<(Vec<Expr>, Vec<Expr>, Vec<Expr>)> {
        let empty = Bindings::new();
        let terminals = self
            .ast
            .domain
            .terminals
            .iter()
            .map(|t| self.ground_expr(t, &empty))
            .collect::<Res<Vec<_>>>()?;
        let preconditions = self
            .ast
            .domain
            .preconditions
            .iter()
            .map(|p| self.ground_expr(p, &empty))
            .collect::<Res<Vec<_>>>()?;
        if !self.ast.domain.constraints.is_empty() {
            tracing::warn!("state-action constraints are not supported and will be ignored");
        }
        let invariants = self
            .ast
            .domain
            .invariants
            .iter()
            .map(|i| self.ground_expr(i, &empty))
            .collect::<Res<Vec<_>>>()?;
        Ok((terminals, preconditions, invariants))
    }

    fn ground_init_state(&self) -> Res<HashMap<Name, Value>> {
        let mut init = self.states.clone();
        for entry in &self.ast.instance.init_state {
            let gname = grounded_name(&entry.name, &entry.args);
            match self.state_ranges.get(&gname) {
                Some(range) => {
                    if !entry.value.matches(range) {
                        return Err(PpdlError::TypeMismatch(format!(
                            "init-state entry <{gname}> declared {range} but initialized with <{}>",
                            entry.value
                        )));
                    }
                    init.insert(gname, coerce(entry.value.clone(), range)?);
                }
                None => {
                    tracing::warn!("init-state block initializes an undefined state fluent <{gname}>");
                }
            }
        }
        Ok(init)
    }

    fn ground_horizon(&self) -> Res<u64> {
        let horizon = self.ast.instance.horizon;
        if horizon < 0 {
            return Err(PpdlError::ValueOutOfRange(format!(
                "rollout horizon {horizon} in the instance is not >= 0"
            )));
        }
        Ok(horizon as u64)
    }

    fn ground_discount(&self) -> Res<f64> {
        let discount = self.ast.instance.discount;
        if !(0.0..=1.0).contains(&discount) {
            return Err(PpdlError::ValueOutOfRange(format!(
                "discount factor {discount} in the instance is not in [0, 1]"
            )));
        }
        Ok(discount)
    }

    fn ground_max_actions(&self) -> usize {
        match self.ast.instance.max_nondef_actions {
            MaxActions::Limit(n) => n as usize,
            MaxActions::PosInf => self.actions.len(),
        }
    }

    /// Rejects cyclic reads among derived/interm fluents of the same level
    /// and reorders each level so dependencies evaluate first.
    fn check_level_cycles(&mut self) -> Res<()> {
        let mut reordered: Vec<(u32, Vec<Name>)> = Vec::new();
        for (&level, names) in self.cpf_order.iter().filter(|&(&l, _)| l > 0) {
            let members: HashSet<&Name> = names.iter().collect();
            let mut deps: HashMap<&Name, Vec<&Name>> = HashMap::new();
            for name in names {
                let mut reads = HashSet::new();
                collect_vars(&self.cpfs[name], &mut reads);
                let same_level: Vec<&Name> = names
                    .iter()
                    .filter(|other| reads.contains(other.as_str()) && members.contains(other))
                    .collect();
                deps.insert(name, same_level);
            }
            let mut order: Vec<Name> = Vec::with_capacity(names.len());
            let mut placed: HashSet<&Name> = HashSet::new();
            while order.len() < names.len() {
                let mut progress = false;
                for name in names {
                    if placed.contains(name) {
                        continue;
                    }
                    if deps[name].iter().all(|d| placed.contains(*d) || *d == name) {
                        if deps[name].contains(&name) {
                            return Err(PpdlError::InvalidExpression(format!(
                                "fluent <{name}> at level {level} depends on itself"
                            )));
                        }
                        placed.insert(name);
                        order.push(name.clone());
                        progress = true;
                    }
                }
                if !progress {
                    return Err(PpdlError::InvalidExpression(format!(
                        "cyclic dependency among level-{level} fluents"
                    )));
                }
            }
            reordered.push((level, order));
        }
        for (level, order) in reordered {
            self.cpf_order.insert(level, order);
        }
        Ok(())
    }
}

fn find_cpf<'c>(pool: &'c [Cpf], head: &str) -> Option<&'c Cpf> {
    pool.iter().find(|cpf| cpf.head == head)
}

/// Reduction table of the aggregation kinds. Empty enumerations reduce to
/// the identity of the reduction; an empty average grounds to a division
/// that fails at evaluation time.
fn reduce_aggregate(op: AggOp, mut children: Vec<Expr>, count: usize) -> Expr {
    if count == 0 {
        return match op {
            AggOp::Sum => Expr::int(0),
            AggOp::Prod => Expr::int(1),
            AggOp::Avg => Expr::Arith(ArithOp::Div, vec![Expr::int(0), Expr::int(0)]),
            AggOp::Min => Expr::real(f64::INFINITY),
            AggOp::Max => Expr::real(f64::NEG_INFINITY),
            AggOp::Forall => Expr::bool(true),
            AggOp::Exists => Expr::bool(false),
        };
    }
    if count == 1 && op != AggOp::Avg {
        return children.pop().unwrap();
    }
    match op {
        AggOp::Sum => Expr::Arith(ArithOp::Add, children),
        AggOp::Prod => Expr::Arith(ArithOp::Mul, children),
        AggOp::Avg => Expr::Arith(
            ArithOp::Div,
            vec![Expr::Arith(ArithOp::Add, children), Expr::int(count as i64)],
        ),
        AggOp::Min => Expr::Apply(MathFn::Min, children),
        AggOp::Max => Expr::Apply(MathFn::Max, children),
        AggOp::Forall => Expr::Logic(LogicOp::And, children),
        AggOp::Exists => Expr::Logic(LogicOp::Or, children),
    }
}

/// Collects every variable name read by the expression.
pub(crate) fn collect_vars(expr: &Expr, out: &mut HashSet<Name>) {
    match expr {
        Expr::Const(_) => {}
        Expr::Var { name, .. } => {
            out.insert(name.clone());
        }
        Expr::Arith(_, children) | Expr::Logic(_, children) | Expr::Apply(_, children)
        | Expr::Random(_, children) => {
            for c in children {
                collect_vars(c, out);
            }
        }
        Expr::Cmp(_, lhs, rhs) => {
            collect_vars(lhs, out);
            collect_vars(rhs, out);
        }
        Expr::If { cond, then, orelse } => {
            collect_vars(cond, out);
            collect_vars(then, out);
            collect_vars(orelse, out);
        }
        Expr::Aggregate(_, _, body) => collect_vars(body, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppdl::{CmpOp, Domain, Instance, LiftedModel, NonFluents, Range, TypedParam};

    fn toggle_model() -> LiftedModel {
        let mut domain = Domain::new("toggle", Expr::real(0.0));
        domain.pvariables.push(Pvariable::new(
            "p",
            vec!["obj".into()],
            Range::Bool,
            FluentKind::State,
            Value::Bool(false),
        ));
        domain
            .cpfs
            .push(Cpf::new("p'", ["?x"], Expr::not(Expr::pvar("p", ["?x"]))));
        let mut non_fluents = NonFluents::default();
        non_fluents.objects.push(("obj".into(), vec!["o1".into(), "o2".into()]));
        LiftedModel {
            domain,
            instance: Instance::new("i1", 3, 1.0),
            non_fluents,
        }
    }

    #[test]
    fn grounded_names() {
        assert_eq!(grounded_name("p", &["o1".into(), "o2".into()]), "p_o1_o2");
        assert_eq!(grounded_name("p'", &["o1".into()]), "p_o1'");
        assert_eq!(grounded_name("c", &[]), "c");
    }

    #[test]
    fn state_bijection() {
        let model = ground(&toggle_model()).unwrap();
        assert_eq!(model.states.len(), 2);
        for (state, next) in &model.next_state {
            assert_eq!(&model.prev_state[next], state);
        }
        for (next, state) in &model.prev_state {
            assert_eq!(&model.next_state[state], next);
        }
    }

    #[test]
    fn back_mapping() {
        let model = ground(&toggle_model()).unwrap();
        for gname in model.states.keys() {
            assert_eq!(model.gvar_to_pvar[gname], "p");
            let args = &model.gvar_args[gname];
            assert_eq!(*gname, grounded_name("p", args));
        }
    }

    #[test]
    fn cpf_bodies_are_closed() {
        let model = ground(&toggle_model()).unwrap();
        assert_eq!(
            model.cpfs["p_o1'"],
            Expr::not(Expr::var("p_o1"))
        );
        assert_eq!(
            model.cpfs["p_o2'"],
            Expr::not(Expr::var("p_o2"))
        );
    }

    #[test]
    fn missing_cpf() {
        let mut ast = toggle_model();
        ast.domain.cpfs.clear();
        assert!(matches!(
            ground(&ast),
            Err(PpdlError::MissingCpfDefinition(name)) if name == "p"
        ));
    }

    #[test]
    fn head_arity_mismatch() {
        let mut ast = toggle_model();
        ast.domain.cpfs[0].args = Some(vec!["?x".into(), "?y".into()]);
        assert!(matches!(
            ground(&ast),
            Err(PpdlError::InvalidNumberOfArguments { .. })
        ));
    }

    #[test]
    fn undefined_aggregation_parameter() {
        let mut ast = toggle_model();
        ast.domain.cpfs[0].expr = Expr::pvar("p", ["?z"]);
        assert!(matches!(
            ground(&ast),
            Err(PpdlError::UndefinedVariable(name)) if name == "?z"
        ));
    }

    #[test]
    fn aggregation_expansion() {
        let mut ast = toggle_model();
        ast.domain.reward = Expr::Aggregate(
            AggOp::Sum,
            vec![TypedParam::new("?x", "obj")],
            Box::new(Expr::pvar("p", ["?x"])),
        );
        let model = ground(&ast).unwrap();
        assert_eq!(
            model.reward,
            Expr::Arith(ArithOp::Add, vec![Expr::var("p_o1"), Expr::var("p_o2")])
        );
    }

    #[test]
    fn average_divides_by_count() {
        let mut ast = toggle_model();
        ast.domain.reward = Expr::Aggregate(
            AggOp::Avg,
            vec![TypedParam::new("?x", "obj")],
            Box::new(Expr::pvar("p", ["?x"])),
        );
        let model = ground(&ast).unwrap();
        assert_eq!(
            model.reward,
            Expr::Arith(
                ArithOp::Div,
                vec![
                    Expr::Arith(ArithOp::Add, vec![Expr::var("p_o1"), Expr::var("p_o2")]),
                    Expr::int(2)
                ]
            )
        );
    }

    #[test]
    fn empty_enumeration_identities() {
        let mut ast = toggle_model();
        ast.non_fluents.objects.push(("ghost".into(), vec![]));
        let body = Box::new(Expr::pvar("p", ["?g"]));
        let params = vec![TypedParam::new("?g", "ghost")];
        for (op, expected) in [
            (AggOp::Sum, Expr::int(0)),
            (AggOp::Prod, Expr::int(1)),
            (AggOp::Min, Expr::real(f64::INFINITY)),
            (AggOp::Max, Expr::real(f64::NEG_INFINITY)),
            (AggOp::Forall, Expr::bool(true)),
            (AggOp::Exists, Expr::bool(false)),
        ] {
            ast.domain.reward = Expr::Aggregate(op, params.clone(), body.clone());
            let model = ground(&ast).unwrap();
            assert_eq!(model.reward, expected, "identity for {op}");
        }
    }

    #[test]
    fn horizon_and_discount_validation() {
        let mut ast = toggle_model();
        ast.instance.horizon = -1;
        assert!(matches!(ground(&ast), Err(PpdlError::ValueOutOfRange(_))));
        let mut ast = toggle_model();
        ast.instance.discount = 1.5;
        assert!(matches!(ground(&ast), Err(PpdlError::ValueOutOfRange(_))));
    }

    #[test]
    fn pos_inf_maps_to_action_count() {
        let mut ast = toggle_model();
        ast.domain.pvariables.push(Pvariable::new(
            "a",
            vec!["obj".into()],
            Range::Bool,
            FluentKind::Action,
            Value::Bool(false),
        ));
        ast.instance.max_nondef_actions = MaxActions::PosInf;
        let model = ground(&ast).unwrap();
        assert_eq!(model.max_allowed_actions, 2);
    }

    #[test]
    fn undeclared_non_fluent_init_is_kept_but_unreachable() {
        let mut ast = toggle_model();
        ast.non_fluents
            .init
            .push(ppdl::InitEntry::new("q", ["o1"], Value::Int(3)));
        let model = ground(&ast).unwrap();
        assert_eq!(model.non_fluents["q_o1"], Value::Int(3));
        let mut reads = HashSet::new();
        for cpf in model.cpfs.values() {
            collect_vars(cpf, &mut reads);
        }
        assert!(!reads.contains("q_o1"));
    }

    #[test]
    fn same_level_cycle_is_rejected() {
        let mut ast = toggle_model();
        for name in ["d", "e"] {
            ast.domain.pvariables.push(
                Pvariable::new(name, vec![], Range::Bool, FluentKind::Derived, Value::Bool(false))
                    .with_level(1),
            );
        }
        ast.domain.derived_cpfs.push(Cpf::scalar("d", Expr::var("e")));
        ast.domain.derived_cpfs.push(Cpf::scalar("e", Expr::var("d")));
        assert!(matches!(ground(&ast), Err(PpdlError::InvalidExpression(_))));
    }

    #[test]
    fn same_level_reads_are_topologically_ordered() {
        let mut ast = toggle_model();
        // declared out of dependency order: d reads e
        for name in ["d", "e"] {
            ast.domain.pvariables.push(
                Pvariable::new(name, vec![], Range::Bool, FluentKind::Derived, Value::Bool(false))
                    .with_level(1),
            );
        }
        ast.domain.derived_cpfs.push(Cpf::scalar("d", Expr::var("e")));
        ast.domain
            .derived_cpfs
            .push(Cpf::scalar("e", Expr::var("p_o1")));
        let model = ground(&ast).unwrap();
        let level1 = &model.cpf_order[&1];
        assert_eq!(level1, &vec![Name::from("e"), Name::from("d")]);
    }

    #[test]
    fn enum_comparison_substitutes_parameter() {
        let mut ast = toggle_model();
        ast.domain.cpfs[0].expr = Expr::cmp(CmpOp::Eq, Expr::var("?x"), Expr::var("o1"));
        let model = ground(&ast).unwrap();
        assert_eq!(
            model.cpfs["p_o1'"],
            Expr::cmp(
                CmpOp::Eq,
                Expr::Const(Value::Enum("o1".into())),
                Expr::Const(Value::Enum("o1".into()))
            )
        );
    }
}
