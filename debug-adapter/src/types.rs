// Adapter reference and value types
//
// Opaque identifiers and mirrored values produced by a wire backend.

use serde::{Deserialize, Serialize};
use std::fmt;

// Object ids are 64-bit and unique for the lifetime of the target
pub type ObjectId = u64;
pub type ThreadId = ObjectId;
pub type RequestId = u64;

/// A thread in the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRef {
    pub id: ThreadId,
    pub name: String,
}

/// A code position. `line <= 0` means native or synthetic code.
///
/// Equality over every field is the adapter's location equality; the
/// broker relies on it when matching breakpoint hits back to records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub type_name: String,
    pub method_name: String,
    pub method_signature: String,
    pub line: i32,
    pub code_index: u64,
}

impl Location {
    pub fn is_native(&self) -> bool {
        self.line <= 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.type_name, self.method_name, self.line)
    }
}

/// A loaded reference type (class, interface or array type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub id: u64,
    pub name: String,
    pub signature: String,
}

/// A field of a reference type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub id: u64,
    pub name: String,
    pub type_name: String,
    pub declaring_type: String,
    pub is_static: bool,
}

/// A method of a reference type.
///
/// `arg_type_names` drives invocation marshalling and the broker's coarse
/// arity-based overload resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRef {
    pub id: u64,
    pub name: String,
    pub signature: String,
    pub declaring_type: String,
    pub arg_type_names: Vec<String>,
    pub return_type_name: String,
    pub is_static: bool,
}

/// A stack frame of a suspended thread. `index` 0 is the top frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRef {
    pub thread_id: ThreadId,
    pub frame_id: u64,
    pub index: usize,
    pub location: Location,
}

/// A named binding visible in a frame (local or argument).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalVariable {
    pub name: String,
    pub type_name: String,
}

/// An object or array living in the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: ObjectId,
    pub type_name: String,
}

/// A mirrored value.
///
/// Host-side scalars embed directly; objects and arrays are carried by
/// reference and read through the target's accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Str(String),
    Object(ObjectRef),
    Array(ObjectRef),
}

impl Value {
    /// Scalar type name as the target names it.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Char(_) => "char",
            Value::Str(_) => "java.lang.String",
            Value::Object(o) | Value::Array(o) => &o.type_name,
        }
    }

    /// Annotated rendering for variable listings.
    pub fn format(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Boolean(v) => format!("(boolean) {}", v),
            Value::Byte(v) => format!("(byte) {}", v),
            Value::Short(v) => format!("(short) {}", v),
            Value::Int(v) => format!("(int) {}", v),
            Value::Long(v) => format!("(long) {}", v),
            Value::Float(v) => format!("(float) {}", v),
            Value::Double(v) => format!("(double) {}", v),
            Value::Char(v) => format!("(char) '{}'", v),
            Value::Str(v) => format!("(String) \"{}\"", v),
            Value::Object(o) => format!("({}) @{}", o.type_name, o.id),
            Value::Array(o) => format!("({}) @{}", o.type_name, o.id),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) | Value::Array(o) => Some(o),
            _ => None,
        }
    }
}

// Bare rendering, used for stop-reason detail maps and assignments
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "'{}'", v),
            Value::Str(v) => write!(f, "\"{}\"", v),
            Value::Object(o) | Value::Array(o) => write!(f, "@{}", o.id),
        }
    }
}

/// Result of invoking a method in the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InvokeOutcome {
    Returned(Value),
    Thrown {
        exception_type: String,
        exception_id: ObjectId,
    },
}

/// Suspend policy attached to an event request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuspendPolicy {
    None,
    EventThread,
    All,
}

/// Step direction. Granularity is always one source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepDepth {
    Into,
    Over,
    Out,
}

/// Handle to an event request created in the target.
///
/// State changes (enable/disable/delete) go through the target; the
/// broker keeps its own handle-to-record maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestHandle(pub RequestId);

/// Capabilities a target may or may not advertise.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VmCapabilities {
    pub monitor_events: bool,
}

/// Static description of the connected target VM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmDescription {
    pub name: String,
    pub version: String,
    pub description: String,
    pub capabilities: VmCapabilities,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_format_annotates_scalars() {
        assert_eq!(Value::Int(42).format(), "(int) 42");
        assert_eq!(Value::Boolean(true).format(), "(boolean) true");
        assert_eq!(Value::Null.format(), "null");
    }

    #[test]
    fn value_display_is_bare() {
        assert_eq!(Value::Int(1).to_string(), "1");
        assert_eq!(Value::Str("hi".into()).to_string(), "\"hi\"");
        let obj = Value::Object(ObjectRef {
            id: 77,
            type_name: "com.example.Order".into(),
        });
        assert_eq!(obj.to_string(), "@77");
    }

    #[test]
    fn location_equality_covers_all_fields() {
        let a = Location {
            type_name: "C".into(),
            method_name: "run".into(),
            method_signature: "()V".into(),
            line: 15,
            code_index: 8,
        };
        let mut b = a.clone();
        assert_eq!(a, b);
        b.code_index = 9;
        assert_ne!(a, b);
    }
}
