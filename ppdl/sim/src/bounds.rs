use hashbrown::HashMap;
use ppdl::{CmpOp, Expr, LogicOp, Name, Range};

use crate::grounded::GroundedModel;

/// Derives `(low, high)` bounds for every action and state fluent from the
/// preconditions and invariants. Only conjunctions of direct comparisons
/// between a fluent and a constant are recognized; anything else leaves the
/// fluent unbounded. Booleans are always `(0, 1)`.
pub fn derive(model: &GroundedModel) -> HashMap<Name, (f64, f64)> {
    let mut bounds: HashMap<Name, (f64, f64)> = HashMap::new();
    for (name, range) in model.action_ranges.iter().chain(model.state_ranges.iter()) {
        let initial = match range {
            Range::Bool => (0.0, 1.0),
            _ => (f64::NEG_INFINITY, f64::INFINITY),
        };
        bounds.insert(name.clone(), initial);
    }
    for constraint in model.preconditions.iter().chain(model.invariants.iter()) {
        scan(constraint, &mut bounds);
    }
    bounds
}

fn scan(expr: &Expr, bounds: &mut HashMap<Name, (f64, f64)>) {
    match expr {
        Expr::Logic(LogicOp::And, children) => {
            for child in children {
                scan(child, bounds);
            }
        }
        Expr::Cmp(op, lhs, rhs) => match (lhs.as_ref(), rhs.as_ref()) {
            (Expr::Var { name, args: None }, Expr::Const(c)) => {
                if let Ok(c) = c.as_real() {
                    tighten(bounds, name, *op, c);
                }
            }
            (Expr::Const(c), Expr::Var { name, args: None }) => {
                if let Ok(c) = c.as_real() {
                    tighten(bounds, name, mirror(*op), c);
                }
            }
            _ => {}
        },
        _ => {}
    }
}

fn mirror(op: CmpOp) -> CmpOp {
    match op {
        CmpOp::Lt => CmpOp::Gt,
        CmpOp::Leq => CmpOp::Geq,
        CmpOp::Gt => CmpOp::Lt,
        CmpOp::Geq => CmpOp::Leq,
        other => other,
    }
}

fn tighten(bounds: &mut HashMap<Name, (f64, f64)>, name: &str, op: CmpOp, c: f64) {
    let Some((low, high)) = bounds.get_mut(name) else {
        return;
    };
    match op {
        CmpOp::Leq | CmpOp::Lt => *high = high.min(c),
        CmpOp::Geq | CmpOp::Gt => *low = low.max(c),
        CmpOp::Eq => {
            *low = low.max(c);
            *high = high.min(c);
        }
        CmpOp::Neq => {}
    }
}
