use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The value stored in a property of a [`State`](crate::State).
///
/// Equality is strict and shallow: numbers compare numerically across `Integer` and `Float`,
/// `NaN` is never equal to itself, and `Object` compares by reference identity only.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Object(ObjectRef),
}

/// A shared reference to an arbitrary structured value. Two `ObjectRef`s are equal only if they
/// point at the same allocation.
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn Any + Send + Sync>);

impl ObjectRef {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self { Self(Arc::new(value)) }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> { self.0.downcast_ref::<T>() }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "ObjectRef({:p})", Arc::as_ptr(&self.0)) }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => integer_equals_float(*a, *b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

/// Exact comparison: the float must be integral and hold the very same number. `as f64` alone
/// rounds integers past 2^53.
fn integer_equals_float(integer: i64, float: f64) -> bool { float.fract() == 0.0 && float as i128 == integer as i128 }

impl Value {
    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Object(o) => write!(f, "{o:?}"),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self { Value::Null }
}
impl From<bool> for Value {
    fn from(value: bool) -> Self { Value::Bool(value) }
}
impl From<i32> for Value {
    fn from(value: i32) -> Self { Value::Integer(value as i64) }
}
impl From<u32> for Value {
    fn from(value: u32) -> Self { Value::Integer(value as i64) }
}
impl From<i64> for Value {
    fn from(value: i64) -> Self { Value::Integer(value) }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self { Value::Float(value) }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self { Value::String(value.to_string()) }
}
impl From<String> for Value {
    fn from(value: String) -> Self { Value::String(value) }
}
impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self { Value::Object(value) }
}

// Comparisons against plain Rust values keep assertions readable
impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool { self.as_str() == Some(*other) }
}
impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool { *self == Value::Integer(*other) }
}
impl PartialEq<i32> for Value {
    fn eq(&self, other: &i32) -> bool { *self == Value::Integer(*other as i64) }
}
