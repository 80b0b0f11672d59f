use ppdl::{ArithOp, CmpOp, Distribution, Expr, LogicOp, MathFn, Name, PpdlError, Range, Res, Value};
use rand::distr::weighted::WeightedIndex;
use rand::rngs::SmallRng;
use rand::Rng;
use rand_distr::{Distribution as _, Exp};

/// Substitution from grounded names to their current values.
pub type Subs = hashbrown::HashMap<Name, Value>;

/// Normalizes a value to the declared range of its fluent, widening numerics
/// where the declaration asks for it.
pub fn coerce(value: Value, range: &Range) -> Res<Value> {
    match range {
        Range::Bool => Ok(Value::Bool(value.as_bool()?)),
        Range::Int => Ok(Value::Int(value.as_int()?)),
        Range::Real => Ok(Value::Real(value.as_real()?)),
        Range::Enum(tpe) => match value {
            Value::Enum(_) => Ok(value),
            other => Err(PpdlError::TypeMismatch(format!(
                "expected a value of <{tpe}>, got <{other}>"
            ))),
        },
    }
}

/// Interprets a grounded expression against a substitution, drawing from the
/// simulator's PRNG for random variables. Boolean connectives evaluate all
/// of their children; only `if` is lazy in its branches.
pub fn eval(expr: &Expr, subs: &Subs, rng: &mut SmallRng) -> Res<Value> {
    match expr {
        Expr::Const(v) => Ok(v.clone()),
        Expr::Var { name, args: None } => subs
            .get(name)
            .cloned()
            .ok_or_else(|| PpdlError::UndefinedVariable(name.clone())),
        Expr::Var { name, args: Some(_) } => Err(PpdlError::InvalidExpression(format!(
            "ungrounded reference <{name}> reached the evaluator"
        ))),
        Expr::Arith(op, children) => {
            let values = eval_all(children, subs, rng)?;
            arith(*op, values)
        }
        Expr::Logic(op, children) => {
            let values = eval_all(children, subs, rng)?;
            logic(*op, &values)
        }
        Expr::Cmp(op, lhs, rhs) => {
            let lhs = eval(lhs, subs, rng)?;
            let rhs = eval(rhs, subs, rng)?;
            compare(*op, &lhs, &rhs)
        }
        Expr::If { cond, then, orelse } => {
            if eval(cond, subs, rng)?.as_bool()? {
                eval(then, subs, rng)
            } else {
                eval(orelse, subs, rng)
            }
        }
        Expr::Apply(fun, children) => {
            let values = eval_all(children, subs, rng)?;
            apply(*fun, values)
        }
        Expr::Random(dist, children) => {
            let values = eval_all(children, subs, rng)?;
            sample(*dist, &values, rng)
        }
        Expr::Aggregate(op, _, _) => Err(PpdlError::InvalidExpression(format!(
            "unexpanded {op} aggregation reached the evaluator"
        ))),
    }
}

fn eval_all(children: &[Expr], subs: &Subs, rng: &mut SmallRng) -> Res<Vec<Value>> {
    children.iter().map(|c| eval(c, subs, rng)).collect()
}

fn both_integral(a: &Value, b: &Value) -> bool {
    matches!(a, Value::Int(_) | Value::Bool(_)) && matches!(b, Value::Int(_) | Value::Bool(_))
}

fn checked(op: &str, r: Option<i64>) -> Res<Value> {
    r.map(Value::Int)
        .ok_or_else(|| PpdlError::Arithmetic(format!("integer overflow in {op}")))
}

fn add(a: &Value, b: &Value) -> Res<Value> {
    if both_integral(a, b) {
        checked("+", a.as_int()?.checked_add(b.as_int()?))
    } else {
        Ok(Value::Real(a.as_real()? + b.as_real()?))
    }
}

fn sub(a: &Value, b: &Value) -> Res<Value> {
    if both_integral(a, b) {
        checked("-", a.as_int()?.checked_sub(b.as_int()?))
    } else {
        Ok(Value::Real(a.as_real()? - b.as_real()?))
    }
}

fn mul(a: &Value, b: &Value) -> Res<Value> {
    if both_integral(a, b) {
        checked("*", a.as_int()?.checked_mul(b.as_int()?))
    } else {
        Ok(Value::Real(a.as_real()? * b.as_real()?))
    }
}

fn arith(op: ArithOp, values: Vec<Value>) -> Res<Value> {
    match op {
        ArithOp::Add | ArithOp::Mul => {
            let combine = if op == ArithOp::Add { add } else { mul };
            let mut values = values.into_iter();
            let mut acc = values
                .next()
                .ok_or_else(|| PpdlError::InvalidExpression(format!("{op} without operands")))?;
            for v in values {
                acc = combine(&acc, &v)?;
            }
            Ok(acc)
        }
        ArithOp::Sub => match values.as_slice() {
            [single] => sub(&Value::Int(0), single),
            [lhs, rhs] => sub(lhs, rhs),
            _ => Err(PpdlError::InvalidExpression(format!(
                "- takes one or two operands, got {}",
                values.len()
            ))),
        },
        ArithOp::Div => match values.as_slice() {
            [lhs, rhs] => {
                let denom = rhs.as_real()?;
                if denom == 0.0 {
                    return Err(PpdlError::Arithmetic("division by zero".to_string()));
                }
                Ok(Value::Real(lhs.as_real()? / denom))
            }
            _ => Err(PpdlError::InvalidExpression(format!(
                "/ takes two operands, got {}",
                values.len()
            ))),
        },
    }
}

fn logic(op: LogicOp, values: &[Value]) -> Res<Value> {
    let bools = values.iter().map(|v| v.as_bool()).collect::<Res<Vec<bool>>>()?;
    let result = match (op, bools.as_slice()) {
        (LogicOp::And, _) => bools.iter().all(|&b| b),
        (LogicOp::Or, _) => bools.iter().any(|&b| b),
        (LogicOp::Not, [x]) => !x,
        (LogicOp::Implies, [a, b]) => !a | b,
        (LogicOp::Equiv, [a, b]) => a == b,
        (LogicOp::Xor, [a, b]) => a != b,
        _ => {
            return Err(PpdlError::InvalidExpression(format!(
                "{op} applied to {} operands",
                bools.len()
            )))
        }
    };
    Ok(Value::Bool(result))
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Res<Value> {
    let result = match op {
        CmpOp::Eq => lhs.value_eq(rhs)?,
        CmpOp::Neq => !lhs.value_eq(rhs)?,
        CmpOp::Lt => lhs.as_real()? < rhs.as_real()?,
        CmpOp::Leq => lhs.as_real()? <= rhs.as_real()?,
        CmpOp::Gt => lhs.as_real()? > rhs.as_real()?,
        CmpOp::Geq => lhs.as_real()? >= rhs.as_real()?,
    };
    Ok(Value::Bool(result))
}

fn arity(fun: &dyn std::fmt::Display, expected: usize, got: usize) -> PpdlError {
    PpdlError::InvalidNumberOfArguments {
        name: Name::from(fun.to_string()),
        expected,
        got,
    }
}

fn apply(fun: MathFn, values: Vec<Value>) -> Res<Value> {
    use MathFn::*;
    match fun {
        Min | Max => {
            let mut values = values.into_iter();
            let mut acc = values
                .next()
                .ok_or_else(|| PpdlError::InvalidExpression(format!("{fun} without operands")))?;
            for v in values {
                let keep_acc = match fun {
                    Min => acc.as_real()? <= v.as_real()?,
                    _ => acc.as_real()? >= v.as_real()?,
                };
                if !keep_acc {
                    acc = v;
                }
            }
            Ok(acc)
        }
        Abs => match values.as_slice() {
            [Value::Int(i)] => checked("abs", i.checked_abs()),
            [v] => Ok(Value::Real(v.as_real()?.abs())),
            _ => Err(arity(&fun, 1, values.len())),
        },
        Sgn => match values.as_slice() {
            [v] => Ok(Value::Int(match v.as_real()?.partial_cmp(&0.0) {
                Some(std::cmp::Ordering::Less) => -1,
                Some(std::cmp::Ordering::Greater) => 1,
                _ => 0,
            })),
            _ => Err(arity(&fun, 1, values.len())),
        },
        Round | Floor | Ceil => match values.as_slice() {
            [v] => {
                let x = v.as_real()?;
                let rounded = match fun {
                    Round => x.round(),
                    Floor => x.floor(),
                    _ => x.ceil(),
                };
                if !rounded.is_finite() {
                    return Err(PpdlError::Arithmetic(format!("{fun} of non-finite value {x}")));
                }
                Ok(Value::Int(rounded as i64))
            }
            _ => Err(arity(&fun, 1, values.len())),
        },
        Sqrt => unary_real(fun, &values, |x| {
            if x < 0.0 {
                Err(PpdlError::Arithmetic(format!("sqrt of negative value {x}")))
            } else {
                Ok(x.sqrt())
            }
        }),
        Exp => unary_real(fun, &values, |x| Ok(x.exp())),
        Ln => unary_real(fun, &values, |x| {
            if x <= 0.0 {
                Err(PpdlError::Arithmetic(format!("ln of non-positive value {x}")))
            } else {
                Ok(x.ln())
            }
        }),
        Cos => unary_real(fun, &values, |x| Ok(x.cos())),
        Sin => unary_real(fun, &values, |x| Ok(x.sin())),
        Tan => unary_real(fun, &values, |x| Ok(x.tan())),
        Pow => match values.as_slice() {
            [base, exponent] => Ok(Value::Real(base.as_real()?.powf(exponent.as_real()?))),
            _ => Err(arity(&fun, 2, values.len())),
        },
        Log => match values.as_slice() {
            [x, base] => {
                let (x, base) = (x.as_real()?, base.as_real()?);
                if x <= 0.0 || base <= 0.0 {
                    return Err(PpdlError::Arithmetic("log of non-positive operand".to_string()));
                }
                Ok(Value::Real(x.ln() / base.ln()))
            }
            _ => Err(arity(&fun, 2, values.len())),
        },
    }
}

fn unary_real(fun: MathFn, values: &[Value], f: impl FnOnce(f64) -> Res<f64>) -> Res<Value> {
    match values {
        [v] => Ok(Value::Real(f(v.as_real()?)?)),
        _ => Err(arity(&fun, 1, values.len())),
    }
}

fn invalid_distr<E: std::fmt::Display>(dist: Distribution) -> impl FnOnce(E) -> PpdlError {
    move |e| PpdlError::InvalidDistribution(format!("{dist}: {e}"))
}

fn sample(dist: Distribution, args: &[Value], rng: &mut SmallRng) -> Res<Value> {
    use Distribution::*;
    match dist {
        // Delta distributions evaluate to their argument.
        KronDelta | DiracDelta => match args {
            [v] => Ok(v.clone()),
            _ => Err(arity(&dist, 1, args.len())),
        },
        Bernoulli => match args {
            [p] => {
                let p = p.as_real()?;
                if !(0.0..=1.0).contains(&p) {
                    return Err(PpdlError::InvalidDistribution(format!(
                        "Bernoulli probability {p} is not in [0, 1]"
                    )));
                }
                Ok(Value::Bool(rng.random::<f64>() < p))
            }
            _ => Err(arity(&dist, 1, args.len())),
        },
        Normal => match args {
            [mean, var] => {
                let (mean, var) = (mean.as_real()?, var.as_real()?);
                if var < 0.0 {
                    return Err(PpdlError::InvalidDistribution(format!(
                        "Normal variance {var} is negative"
                    )));
                }
                let d = rand_distr::Normal::new(mean, var.sqrt()).map_err(invalid_distr(dist))?;
                Ok(Value::Real(d.sample(rng)))
            }
            _ => Err(arity(&dist, 2, args.len())),
        },
        Uniform => match args {
            [low, high] => {
                let d = rand::distr::Uniform::new_inclusive(low.as_real()?, high.as_real()?)
                    .map_err(invalid_distr(dist))?;
                Ok(Value::Real(d.sample(rng)))
            }
            _ => Err(arity(&dist, 2, args.len())),
        },
        Exponential => match args {
            [rate] => {
                let d = Exp::new(rate.as_real()?).map_err(invalid_distr(dist))?;
                Ok(Value::Real(d.sample(rng)))
            }
            _ => Err(arity(&dist, 1, args.len())),
        },
        Poisson => match args {
            [lambda] => {
                let d = rand_distr::Poisson::new(lambda.as_real()?).map_err(invalid_distr(dist))?;
                let drawn: f64 = d.sample(rng);
                Ok(Value::Int(drawn as i64))
            }
            _ => Err(arity(&dist, 1, args.len())),
        },
        Gamma => match args {
            [shape, scale] => {
                let d = rand_distr::Gamma::new(shape.as_real()?, scale.as_real()?)
                    .map_err(invalid_distr(dist))?;
                Ok(Value::Real(d.sample(rng)))
            }
            _ => Err(arity(&dist, 2, args.len())),
        },
        Discrete => {
            if args.is_empty() {
                return Err(arity(&dist, 1, args.len()));
            }
            let weights = args.iter().map(|w| w.as_real()).collect::<Res<Vec<f64>>>()?;
            if let Some(w) = weights.iter().find(|&&w| w < 0.0) {
                return Err(PpdlError::InvalidDistribution(format!(
                    "Discrete weight {w} is negative"
                )));
            }
            let d = WeightedIndex::new(&weights).map_err(invalid_distr(dist))?;
            Ok(Value::Int(d.sample(rng) as i64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppdl::Expr;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    fn eval_closed(e: &Expr) -> Res<Value> {
        eval(e, &Subs::new(), &mut rng())
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        let e = Expr::Arith(ArithOp::Add, vec![Expr::int(2), Expr::int(3), Expr::bool(true)]);
        assert_eq!(eval_closed(&e).unwrap(), Value::Int(6));
    }

    #[test]
    fn division_promotes_and_checks_zero() {
        let e = Expr::Arith(ArithOp::Div, vec![Expr::int(3), Expr::int(2)]);
        assert_eq!(eval_closed(&e).unwrap(), Value::Real(1.5));
        let e = Expr::Arith(ArithOp::Div, vec![Expr::int(1), Expr::int(0)]);
        assert!(matches!(eval_closed(&e), Err(PpdlError::Arithmetic(_))));
    }

    #[test]
    fn unary_minus() {
        let e = Expr::Arith(ArithOp::Sub, vec![Expr::int(4)]);
        assert_eq!(eval_closed(&e).unwrap(), Value::Int(-4));
    }

    #[test]
    fn overflow_is_reported() {
        let e = Expr::Arith(ArithOp::Mul, vec![Expr::int(i64::MAX), Expr::int(2)]);
        assert!(matches!(eval_closed(&e), Err(PpdlError::Arithmetic(_))));
    }

    #[test]
    fn strict_connectives() {
        let e = Expr::Logic(LogicOp::Implies, vec![Expr::bool(false), Expr::bool(false)]);
        assert_eq!(eval_closed(&e).unwrap(), Value::Bool(true));
        let e = Expr::Logic(LogicOp::Xor, vec![Expr::bool(true), Expr::bool(true)]);
        assert_eq!(eval_closed(&e).unwrap(), Value::Bool(false));
    }

    #[test]
    fn delta_distributions_pass_through() {
        let e = Expr::Random(Distribution::KronDelta, vec![Expr::bool(true)]);
        assert_eq!(eval_closed(&e).unwrap(), Value::Bool(true));
        let e = Expr::Random(Distribution::DiracDelta, vec![Expr::real(2.5)]);
        assert_eq!(eval_closed(&e).unwrap(), Value::Real(2.5));
    }

    #[test]
    fn bernoulli_extremes() {
        let mut r = rng();
        for _ in 0..32 {
            let zero = sample(Distribution::Bernoulli, &[Value::Real(0.0)], &mut r).unwrap();
            assert_eq!(zero, Value::Bool(false));
            let one = sample(Distribution::Bernoulli, &[Value::Real(1.0)], &mut r).unwrap();
            assert_eq!(one, Value::Bool(true));
        }
        assert!(matches!(
            sample(Distribution::Bernoulli, &[Value::Real(1.5)], &mut r),
            Err(PpdlError::InvalidDistribution(_))
        ));
    }

    #[test]
    fn discrete_rejects_negative_weights() {
        let weights = [Value::Real(0.5), Value::Real(-0.1)];
        assert!(matches!(
            sample(Distribution::Discrete, &weights, &mut rng()),
            Err(PpdlError::InvalidDistribution(_))
        ));
    }

    #[test]
    fn discrete_respects_point_mass() {
        let weights = [Value::Real(0.0), Value::Real(3.0), Value::Real(0.0)];
        let mut r = rng();
        for _ in 0..16 {
            assert_eq!(sample(Distribution::Discrete, &weights, &mut r).unwrap(), Value::Int(1));
        }
    }

    #[test]
    fn lazy_branches() {
        // the untaken branch would divide by zero
        let e = Expr::ite(
            Expr::bool(true),
            Expr::int(1),
            Expr::Arith(ArithOp::Div, vec![Expr::int(1), Expr::int(0)]),
        );
        assert_eq!(eval_closed(&e).unwrap(), Value::Int(1));
    }

    #[test]
    fn normal_with_zero_variance_is_deterministic() {
        let v = sample(
            Distribution::Normal,
            &[Value::Real(3.0), Value::Real(0.0)],
            &mut rng(),
        )
        .unwrap();
        assert_eq!(v, Value::Real(3.0));
    }
}
