//! Runtime values of the reference evaluator.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use rustc_hash::FxHashMap;

use crate::operation::Constant;

/// Shared, mutable property map.
pub type ObjectRef = Rc<RefCell<FxHashMap<String, Value>>>;

/// A value of the reference language.
#[derive(Debug, Clone)]
pub enum Value {
    /// null
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit integer
    Long(i64),
    /// Integer beyond 64 bits
    BigNumber(BigInt),
    /// String
    String(String),
    /// Object reference
    Object(ObjectRef),
    /// Reference to a function by name
    Function(String),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::BigNumber(a), Value::BigNumber(b)) => a == b,
            (Value::Long(a), Value::BigNumber(b)) | (Value::BigNumber(b), Value::Long(a)) => {
                BigInt::from(*a) == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Creates an empty object.
    pub fn new_object() -> Self {
        Value::Object(Rc::new(RefCell::new(FxHashMap::default())))
    }

    /// Wraps an integer, narrowing to `Long` when it fits.
    pub fn from_bigint(n: BigInt) -> Self {
        match n.to_i64() {
            Some(n) => Value::Long(n),
            None => Value::BigNumber(n),
        }
    }

    /// Truthiness.
    ///
    /// Only `null`, `false`, zero and the empty string are falsy.
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Long(n) => *n != 0,
            Value::BigNumber(n) => !n.is_zero(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// The value as an arbitrary-precision integer, if it is a number.
    pub fn to_bigint(&self) -> Option<BigInt> {
        match self {
            Value::Long(n) => Some(BigInt::from(*n)),
            Value::BigNumber(n) => Some(n.clone()),
            _ => None,
        }
    }

    /// The property key this value stands for.
    pub fn to_property_key(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Long(_) | Value::BigNumber(_) | Value::Bool(_) => Some(self.to_string()),
            _ => None,
        }
    }

    /// Name of the value's type for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Long(_) | Value::BigNumber(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }
}

impl From<&Constant> for Value {
    fn from(constant: &Constant) -> Self {
        match constant {
            Constant::Null => Value::Null,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Long(n) => Value::Long(*n),
            Constant::BigNumber(n) => Value::BigNumber(n.clone()),
            Constant::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Long(n) => write!(f, "{}", n),
            Value::BigNumber(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(_) => write!(f, "Object"),
            Value::Function(name) => write!(f, "{}", name),
        }
    }
}
