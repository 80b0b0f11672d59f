use derive_more::Display;

use crate::{Name, PpdlError, Res};

/// Range tag of a pvariable, as declared in the program.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum Range {
    #[display("bool")]
    Bool,
    #[display("int")]
    Int,
    #[display("real")]
    Real,
    /// An enumerated/object-valued range, naming the declared type.
    #[display("{_0}")]
    Enum(Name),
}

/// A runtime value of one of the declared ranges.
///
/// Numeric promotion is bool -> int -> real; reading a value at an
/// incompatible range is a `TypeMismatch`.
#[derive(Clone, Debug, PartialEq, Display)]
pub enum Value {
    #[display("{_0}")]
    Bool(bool),
    #[display("{_0}")]
    Int(i64),
    #[display("{_0}")]
    Real(f64),
    #[display("{_0}")]
    Enum(Name),
}

impl Value {
    pub fn as_bool(&self) -> Res<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(PpdlError::TypeMismatch(format!("expected a bool, got <{other}>"))),
        }
    }

    pub fn as_int(&self) -> Res<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Bool(b) => Ok(*b as i64),
            other => Err(PpdlError::TypeMismatch(format!("expected an int, got <{other}>"))),
        }
    }

    pub fn as_real(&self) -> Res<f64> {
        match self {
            Value::Real(r) => Ok(*r),
            Value::Int(i) => Ok(*i as f64),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            other => Err(PpdlError::TypeMismatch(format!("expected a real, got <{other}>"))),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Bool(_) | Value::Int(_) | Value::Real(_))
    }

    /// True when this literal is acceptable for a declaration of the given
    /// range. Numeric widening (bool into int, int into real) is accepted.
    pub fn matches(&self, range: &Range) -> bool {
        match (self, range) {
            (Value::Bool(_), Range::Bool) => true,
            (Value::Bool(_) | Value::Int(_), Range::Int) => true,
            (Value::Bool(_) | Value::Int(_) | Value::Real(_), Range::Real) => true,
            (Value::Enum(_), Range::Enum(_)) => true,
            _ => false,
        }
    }

    /// Equality as used by the `==` operator: numeric values compare by
    /// magnitude, enum values by identifier.
    pub fn value_eq(&self, other: &Value) -> Res<bool> {
        match (self, other) {
            (Value::Enum(a), Value::Enum(b)) => Ok(a == b),
            (Value::Enum(_), _) | (_, Value::Enum(_)) => Err(PpdlError::TypeMismatch(format!(
                "cannot compare <{self}> with <{other}>"
            ))),
            (Value::Int(a), Value::Int(b)) => Ok(a == b),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            _ => Ok(self.as_real()? == other.as_real()?),
        }
    }
}

impl Range {
    /// The implicit default carried by a declaration that omits one.
    pub fn zero(&self) -> Res<Value> {
        match self {
            Range::Bool => Ok(Value::Bool(false)),
            Range::Int => Ok(Value::Int(0)),
            Range::Real => Ok(Value::Real(0.0)),
            Range::Enum(tpe) => Err(PpdlError::TypeMismatch(format!(
                "enum range <{tpe}> has no implicit default"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion() {
        assert_eq!(Value::Bool(true).as_int().unwrap(), 1);
        assert_eq!(Value::Int(3).as_real().unwrap(), 3.0);
        assert!(Value::Real(0.5).as_int().is_err());
        assert!(Value::Int(1).as_bool().is_err());
    }

    #[test]
    fn range_compatibility() {
        assert!(Value::Int(2).matches(&Range::Real));
        assert!(!Value::Real(2.0).matches(&Range::Int));
        assert!(Value::Enum("low".into()).matches(&Range::Enum("level".into())));
    }

    #[test]
    fn mixed_equality() {
        assert!(Value::Int(2).value_eq(&Value::Real(2.0)).unwrap());
        assert!(!Value::Bool(false).value_eq(&Value::Real(1.0)).unwrap());
        assert!(Value::Enum("a".into()).value_eq(&Value::Int(0)).is_err());
    }
}
