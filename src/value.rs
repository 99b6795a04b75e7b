//! # value
//!
//! runtime values seen by the engine
//!

use std::fmt;
use std::rc::Rc;

use crate::exception::{Exception, ExceptionKind, Traceback};
use crate::gen_impl::Generator;

/// host object protocol
///
/// the engine only needs the few capabilities below, everything else about
/// the object model belongs to the surrounding runtime
pub trait Object {
    /// type name used in error messages
    fn type_name(&self) -> &str;

    /// the `__await__` capability, `None` when the object has none
    fn await_(&self) -> Option<Result<Value, Exception>> {
        None
    }

    /// whether the object satisfies the iterator contract
    fn is_iterator(&self) -> bool {
        false
    }

    /// pull the next item, exhaustion is reported as `StopIteration`
    fn next(&self) -> Result<Value, Exception> {
        Err(Exception::new(
            ExceptionKind::TypeError,
            format!("'{}' object is not an iterator", self.type_name()),
        ))
    }

    /// `close()` if the object has one, returns `false` otherwise
    fn close(&self) -> Result<bool, Exception> {
        Ok(false)
    }
}

/// runtime value
#[derive(Clone)]
pub enum Value {
    /// `None`, also the "no value" sentinel of `send`
    None,
    /// boolean
    Bool(bool),
    /// integer
    Int(i64),
    /// float
    Float(f64),
    /// string
    Str(Rc<str>),
    /// tuple
    Tuple(Rc<[Value]>),
    /// an exception class
    ExceptionType(ExceptionKind),
    /// an exception instance
    Exception(Box<Exception>),
    /// a traceback object
    Traceback(Traceback),
    /// generator, coroutine or async generator
    Generator(Generator),
    /// any other host object
    Object(Rc<dyn Object>),
}

impl Value {
    /// build a string value
    pub fn str(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    /// build a tuple value
    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::from(items))
    }

    /// is this the `None` sentinel
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// the runtime type name
    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::ExceptionType(_) => "type",
            Value::Exception(e) => e.kind().name(),
            Value::Traceback(_) => "traceback",
            Value::Generator(g) => g.kind().type_name(),
            Value::Object(o) => o.type_name(),
        }
    }

    /// the generator behind this value, if any
    pub fn as_generator(&self) -> Option<&Generator> {
        match self {
            Value::Generator(g) => Some(g),
            _ => None,
        }
    }

    /// `repr()` of the value
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("'{s}'"),
            Value::Tuple(items) => {
                let inner: Vec<String> = items.iter().map(Value::repr).collect();
                if inner.len() == 1 {
                    format!("({},)", inner[0])
                } else {
                    format!("({})", inner.join(", "))
                }
            }
            Value::Exception(e) => e.repr(),
            other => other.to_string(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::None
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::ExceptionType(a), Value::ExceptionType(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => {
                a.kind() == b.kind() && a.args() == b.args()
            }
            (Value::Traceback(a), Value::Traceback(b)) => a == b,
            (Value::Generator(a), Value::Generator(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::str(v)
    }
}

impl From<Exception> for Value {
    fn from(e: Exception) -> Self {
        Value::Exception(Box::new(e))
    }
}

impl From<Generator> for Value {
    fn from(g: Generator) -> Self {
        Value::Generator(g)
    }
}

// `str()` of the value
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Tuple(_) => write!(f, "{}", self.repr()),
            Value::ExceptionType(k) => write!(f, "<class '{}'>", k.name()),
            Value::Exception(e) => write!(f, "{}", e.message()),
            Value::Traceback(_) => write!(f, "<traceback object>"),
            Value::Generator(g) => write!(f, "{g}"),
            Value::Object(o) => write!(f, "<{} object>", o.type_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Exception(e) => write!(f, "{e:?}"),
            Value::Traceback(tb) => write!(f, "{tb:?}"),
            _ => write!(f, "{}", self.repr()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_repr() {
        assert_eq!(Value::str("done").repr(), "'done'");
        assert_eq!(Value::tuple(vec![Value::Int(1)]).repr(), "(1,)");
        assert_eq!(
            Value::tuple(vec![Value::Int(1), Value::None]).repr(),
            "(1, None)"
        );
        assert_eq!(Value::Bool(true).to_string(), "True");
    }

    #[test]
    fn test_eq() {
        assert_eq!(Value::None, Value::default());
        assert_ne!(Value::Int(1), Value::str("1"));
        assert_eq!(Value::from("a"), Value::str("a"));
    }
}
