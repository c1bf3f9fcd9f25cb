//! The OSC argument value: a tagged union over the five supported kinds.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use crate::error::TypeMismatch;
use crate::pool::{ArrayPool, PooledBytes};

/// Discriminant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Invalid,
    Int,
    Float,
    String,
    Bool,
    Blob,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Invalid => "invalid",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Bool => "bool",
            ValueKind::Blob => "blob",
        };
        f.write_str(name)
    }
}

/// One OSC argument.
///
/// `Invalid` stands for a type tag this crate does not understand and is
/// also what a disposed blob turns into.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Invalid,
    Int(i32),
    Float(f32),
    String(String),
    Bool(bool),
    Blob(Blob),
}

#[track_caller]
fn mismatch(expected: ValueKind, found: ValueKind) -> ! {
    panic!("{}", TypeMismatch { expected, found })
}

impl Value {
    /// Blob that copies `data` into a buffer rented from the byte pool.
    pub fn blob_copy(data: &[u8]) -> Self {
        Value::Blob(Blob::copy_from(data))
    }

    /// Blob that aliases caller-owned bytes without copying.
    pub fn blob_shared(data: Arc<[u8]>) -> Self {
        Value::Blob(Blob::shared(data))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Invalid => ValueKind::Invalid,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Bool(_) => ValueKind::Bool,
            Value::Blob(_) => ValueKind::Blob,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Value::Invalid)
    }

    /// The OSC type tag for this value, `None` for `Invalid`.
    pub fn type_tag(&self) -> Option<u8> {
        match self {
            Value::Invalid => None,
            Value::Int(_) => Some(b'i'),
            Value::Float(_) => Some(b'f'),
            Value::String(_) => Some(b's'),
            Value::Bool(true) => Some(b'T'),
            Value::Bool(false) => Some(b'F'),
            Value::Blob(_) => Some(b'b'),
        }
    }

    /// # Panics
    /// If the value is not an `Int`.
    #[track_caller]
    pub fn as_int(&self) -> i32 {
        match self {
            Value::Int(v) => *v,
            other => mismatch(ValueKind::Int, other.kind()),
        }
    }

    /// # Panics
    /// If the value is not a `Float`.
    #[track_caller]
    pub fn as_float(&self) -> f32 {
        match self {
            Value::Float(v) => *v,
            other => mismatch(ValueKind::Float, other.kind()),
        }
    }

    /// # Panics
    /// If the value is not a `String`.
    #[track_caller]
    pub fn as_str(&self) -> &str {
        match self {
            Value::String(v) => v,
            other => mismatch(ValueKind::String, other.kind()),
        }
    }

    /// # Panics
    /// If the value is not a `Bool`.
    #[track_caller]
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(v) => *v,
            other => mismatch(ValueKind::Bool, other.kind()),
        }
    }

    /// # Panics
    /// If the value is not a `Blob`.
    #[track_caller]
    pub fn as_blob(&self) -> &[u8] {
        match self {
            Value::Blob(v) => v.as_bytes(),
            other => mismatch(ValueKind::Blob, other.kind()),
        }
    }

    pub fn try_int(&self) -> Result<i32, TypeMismatch> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(other.mismatch(ValueKind::Int)),
        }
    }

    pub fn try_float(&self) -> Result<f32, TypeMismatch> {
        match self {
            Value::Float(v) => Ok(*v),
            other => Err(other.mismatch(ValueKind::Float)),
        }
    }

    pub fn try_str(&self) -> Result<&str, TypeMismatch> {
        match self {
            Value::String(v) => Ok(v),
            other => Err(other.mismatch(ValueKind::String)),
        }
    }

    pub fn try_bool(&self) -> Result<bool, TypeMismatch> {
        match self {
            Value::Bool(v) => Ok(*v),
            other => Err(other.mismatch(ValueKind::Bool)),
        }
    }

    pub fn try_blob(&self) -> Result<&[u8], TypeMismatch> {
        match self {
            Value::Blob(v) => Ok(v.as_bytes()),
            other => Err(other.mismatch(ValueKind::Blob)),
        }
    }

    /// Release an owned blob buffer back to the byte pool.
    ///
    /// The value becomes `Invalid`. Aliasing blobs and all other variants are
    /// left untouched.
    pub fn dispose(&mut self) {
        if let Value::Blob(blob) = self {
            if blob.owns_buffer() {
                *self = Value::Invalid;
            }
        }
    }

    fn mismatch(&self, expected: ValueKind) -> TypeMismatch {
        TypeMismatch {
            expected,
            found: self.kind(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Invalid, Value::Invalid) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Blob(a), Value::Blob(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Value::Invalid => {}
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::String(v) => v.hash(state),
            Value::Bool(v) => v.hash(state),
            Value::Blob(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Invalid => f.write_str("!INVALID"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Blob(v) => write!(f, "blob[{}]", v.len()),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::blob_copy(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::blob_copy(&v)
    }
}

impl From<Arc<[u8]>> for Value {
    fn from(v: Arc<[u8]>) -> Self {
        Value::blob_shared(v)
    }
}

impl TryFrom<&Value> for i32 {
    type Error = TypeMismatch;

    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        v.try_int()
    }
}

impl TryFrom<&Value> for f32 {
    type Error = TypeMismatch;

    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        v.try_float()
    }
}

impl TryFrom<&Value> for bool {
    type Error = TypeMismatch;

    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        v.try_bool()
    }
}

impl<'a> TryFrom<&'a Value> for &'a str {
    type Error = TypeMismatch;

    fn try_from(v: &'a Value) -> Result<Self, Self::Error> {
        v.try_str()
    }
}

impl<'a> TryFrom<&'a Value> for &'a [u8] {
    type Error = TypeMismatch;

    fn try_from(v: &'a Value) -> Result<Self, Self::Error> {
        v.try_blob()
    }
}

impl TryFrom<Value> for String {
    type Error = TypeMismatch;

    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::String(s) => Ok(s),
            other => Err(other.mismatch(ValueKind::String)),
        }
    }
}

/// Blob payload, either copied into pooled storage or aliasing shared bytes.
#[derive(Clone)]
pub struct Blob {
    data: BlobData,
}

#[derive(Clone)]
enum BlobData {
    Pooled(PooledBytes),
    Shared(Arc<[u8]>),
}

impl Blob {
    pub fn copy_from(data: &[u8]) -> Self {
        Self {
            data: BlobData::Pooled(PooledBytes::copy_from(data)),
        }
    }

    /// Copy into a buffer rented from `pool` instead of the process-wide one.
    pub fn copy_in(pool: &'static ArrayPool<u8>, data: &[u8]) -> Self {
        Self {
            data: BlobData::Pooled(PooledBytes::copy_in(pool, data)),
        }
    }

    pub fn shared(data: Arc<[u8]>) -> Self {
        Self {
            data: BlobData::Shared(data),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            BlobData::Pooled(bytes) => bytes.as_slice(),
            BlobData::Shared(bytes) => bytes,
        }
    }

    /// Whether the blob returns its buffer to the byte pool when released.
    pub fn owns_buffer(&self) -> bool {
        matches!(self.data, BlobData::Pooled(_))
    }
}

impl Deref for Blob {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Blob {}

impl Hash for Blob {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("len", &self.len())
            .field("owned", &self.owns_buffer())
            .finish()
    }
}
