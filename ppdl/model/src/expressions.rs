use std::fmt::{Display, Formatter};

use itertools::Itertools;
use smallvec::SmallVec;

use crate::{Name, Value};

/// Object arguments of a variable reference. Most fluents have arity <= 2.
pub type ObjArgs = SmallVec<[Name; 2]>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Not,
    Implies,
    Equiv,
    Xor,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AggOp {
    Sum,
    Prod,
    Avg,
    Min,
    Max,
    Forall,
    Exists,
}

/// Deterministic functions usable in expressions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MathFn {
    Abs,
    Sgn,
    Round,
    Floor,
    Ceil,
    Sqrt,
    Exp,
    Ln,
    Pow,
    Log,
    Min,
    Max,
    Cos,
    Sin,
    Tan,
}

/// Random-variable families usable in expressions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Distribution {
    KronDelta,
    DiracDelta,
    Bernoulli,
    Normal,
    Uniform,
    Exponential,
    Poisson,
    Gamma,
    Discrete,
}

/// A `?x : type` binding introduced by an aggregation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedParam {
    pub name: Name,
    pub tpe: Name,
}

impl TypedParam {
    pub fn new(name: impl Into<Name>, tpe: impl Into<Name>) -> Self {
        TypedParam {
            name: name.into(),
            tpe: tpe.into(),
        }
    }
}

/// Expression tree of a CPF, reward or constraint.
///
/// Lifted expressions reference pvariables with parameter arguments; after
/// grounding, every `Var` carries a grounded name and `args` is `None`.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Const(Value),
    Var {
        name: Name,
        args: Option<ObjArgs>,
    },
    Arith(ArithOp, Vec<Expr>),
    Logic(LogicOp, Vec<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    Aggregate(AggOp, Vec<TypedParam>, Box<Expr>),
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        orelse: Box<Expr>,
    },
    Apply(MathFn, Vec<Expr>),
    Random(Distribution, Vec<Expr>),
}

impl Expr {
    pub fn bool(b: bool) -> Expr {
        Expr::Const(Value::Bool(b))
    }
    pub fn int(i: i64) -> Expr {
        Expr::Const(Value::Int(i))
    }
    pub fn real(r: f64) -> Expr {
        Expr::Const(Value::Real(r))
    }

    /// A reference to a zero-arity variable (or to an already grounded name).
    pub fn var(name: impl Into<Name>) -> Expr {
        Expr::Var {
            name: name.into(),
            args: None,
        }
    }

    /// A lifted reference `name(?a, ?b, ...)`.
    pub fn pvar<A: Into<Name>>(name: impl Into<Name>, args: impl IntoIterator<Item = A>) -> Expr {
        Expr::Var {
            name: name.into(),
            args: Some(args.into_iter().map(|a| a.into()).collect()),
        }
    }

    pub fn not(e: Expr) -> Expr {
        Expr::Logic(LogicOp::Not, vec![e])
    }

    pub fn ite(cond: Expr, then: Expr, orelse: Expr) -> Expr {
        Expr::If {
            cond: Box::new(cond),
            then: Box::new(then),
            orelse: Box::new(orelse),
        }
    }

    pub fn cmp(op: CmpOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Cmp(op, Box::new(lhs), Box::new(rhs))
    }
}

impl Display for ArithOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        };
        write!(f, "{s}")
    }
}

impl Display for LogicOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogicOp::And => "^",
            LogicOp::Or => "|",
            LogicOp::Not => "~",
            LogicOp::Implies => "=>",
            LogicOp::Equiv => "<=>",
            LogicOp::Xor => "xor",
        };
        write!(f, "{s}")
    }
}

impl Display for CmpOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Neq => "!=",
            CmpOp::Lt => "<",
            CmpOp::Leq => "<=",
            CmpOp::Gt => ">",
            CmpOp::Geq => ">=",
        };
        write!(f, "{s}")
    }
}

impl Display for AggOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AggOp::Sum => "sum",
            AggOp::Prod => "prod",
            AggOp::Avg => "avg",
            AggOp::Min => "minimum",
            AggOp::Max => "maximum",
            AggOp::Forall => "forall",
            AggOp::Exists => "exists",
        };
        write!(f, "{s}")
    }
}

impl Display for MathFn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MathFn::Abs => "abs",
            MathFn::Sgn => "sgn",
            MathFn::Round => "round",
            MathFn::Floor => "floor",
            MathFn::Ceil => "ceil",
            MathFn::Sqrt => "sqrt",
            MathFn::Exp => "exp",
            MathFn::Ln => "ln",
            MathFn::Pow => "pow",
            MathFn::Log => "log",
            MathFn::Min => "min",
            MathFn::Max => "max",
            MathFn::Cos => "cos",
            MathFn::Sin => "sin",
            MathFn::Tan => "tan",
        };
        write!(f, "{s}")
    }
}

impl Display for Distribution {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Const(v) => write!(f, "{v}"),
            Expr::Var { name, args: None } => write!(f, "{name}"),
            Expr::Var {
                name,
                args: Some(args),
            } => write!(f, "{name}({})", args.iter().format(", ")),
            Expr::Arith(op, children) => match children.as_slice() {
                [single] => write!(f, "({op}{single})"),
                _ => {
                    let sep = format!(" {op} ");
                    write!(f, "({})", children.iter().format(&sep))
                }
            },
            Expr::Logic(op, children) => match children.as_slice() {
                [single] => write!(f, "({op}{single})"),
                _ => {
                    let sep = format!(" {op} ");
                    write!(f, "({})", children.iter().format(&sep))
                }
            },
            Expr::Cmp(op, lhs, rhs) => write!(f, "({lhs} {op} {rhs})"),
            Expr::Aggregate(op, params, body) => {
                let params = params
                    .iter()
                    .format_with(", ", |p, g| g(&format_args!("{}: {}", p.name, p.tpe)));
                write!(f, "{op}_{{{params}}} {body}")
            }
            Expr::If { cond, then, orelse } => {
                write!(f, "if ({cond}) then ({then}) else ({orelse})")
            }
            Expr::Apply(fun, args) => write!(f, "{fun}[{}]", args.iter().format(", ")),
            Expr::Random(dist, args) => write!(f, "{dist}({})", args.iter().format(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendering() {
        let e = Expr::ite(
            Expr::cmp(CmpOp::Geq, Expr::pvar("lvl", ["?r"]), Expr::int(2)),
            Expr::Random(Distribution::Bernoulli, vec![Expr::real(0.3)]),
            Expr::not(Expr::var("raining")),
        );
        assert_eq!(
            e.to_string(),
            "if ((lvl(?r) >= 2)) then (Bernoulli(0.3)) else ((~raining))"
        );
    }
}
