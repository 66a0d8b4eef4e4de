use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// Data types
// ============================================================================

/// A fully resolved data type.
///
/// Scalar variants carry the attribute values they were instantiated with;
/// `Struct`/`Union` carry a composite definition. Resolved types are shared
/// behind `Arc`: an alias, a field, and a route payload that refer to the same
/// declaration all point at the same allocation.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Boolean,
    Int32 {
        min_value: Option<i64>,
        max_value: Option<i64>,
    },
    Int64 {
        min_value: Option<i64>,
        max_value: Option<i64>,
    },
    UInt32 {
        min_value: Option<u64>,
        max_value: Option<u64>,
    },
    UInt64 {
        min_value: Option<u64>,
        max_value: Option<u64>,
    },
    Float32,
    Float64,
    String {
        min_length: Option<u64>,
        max_length: Option<u64>,
        pattern: Option<String>,
    },
    Binary,
    /// Timestamps carry their strftime-style wire format.
    Timestamp { format: String },
    List {
        item: Arc<DataType>,
        min_items: Option<u64>,
        max_items: Option<u64>,
    },
    /// A type with no fields; the payload of routes that carry no body.
    Empty,
    /// The null value's type; only meaningful as a nullable field's default.
    Null,
    Struct(CompositeType),
    Union(CompositeType),
}

/// The shared shape of struct and union definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeType {
    pub name: String,
    pub doc: String,
    pub fields: Vec<Field>,
    /// Single-inheritance parent; always a resolved `Struct`.
    pub super_type: Option<Arc<DataType>>,
    /// Documented examples, keyed by label.
    pub examples: HashMap<String, Example>,
}

/// A documented example attached to a composite type.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub text: String,
    pub values: HashMap<String, Value>,
}

/// A resolved field of a struct or union.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// A bare tag with no payload, used to enumerate union variants.
    Symbol {
        name: String,
        doc: String,
    },
    Typed {
        name: String,
        doc: String,
        data_type: Arc<DataType>,
        nullable: bool,
        optional: bool,
        deprecated: bool,
        /// Validated against `data_type` unless the field is nullable and
        /// the default is null.
        default: Option<Value>,
    },
}

impl Field {
    pub fn name(&self) -> &str {
        match self {
            Field::Symbol { name, .. } => name,
            Field::Typed { name, .. } => name,
        }
    }
}

impl DataType {
    /// The catalog name of this type's constructor.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Boolean => "Boolean",
            DataType::Int32 { .. } => "Int32",
            DataType::Int64 { .. } => "Int64",
            DataType::UInt32 { .. } => "UInt32",
            DataType::UInt64 { .. } => "UInt64",
            DataType::Float32 => "Float32",
            DataType::Float64 => "Float64",
            DataType::String { .. } => "String",
            DataType::Binary => "Binary",
            DataType::Timestamp { .. } => "Timestamp",
            DataType::List { .. } => "List",
            DataType::Empty => "Empty",
            DataType::Null => "Null",
            DataType::Struct(_) => "Struct",
            DataType::Union(_) => "Union",
        }
    }

    /// The name this type was declared under, for composites.
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            DataType::Struct(c) | DataType::Union(c) => Some(&c.name),
            _ => None,
        }
    }

    /// Validate a raw literal against this type.
    ///
    /// Only scalar types admit literals; lists and composites are built from
    /// declarations, never written as literal values.
    pub fn check_value(&self, value: &Value) -> Result<(), ValueError> {
        match self {
            DataType::Boolean => match value {
                Value::Bool(_) => Ok(()),
                other => Err(wrong_kind("boolean", other)),
            },
            DataType::Int32 {
                min_value,
                max_value,
            } => {
                let n = as_signed(value)?;
                check_signed_range(n, i32::MIN as i64, i32::MAX as i64, "Int32")?;
                check_signed_bounds(n, *min_value, *max_value, "Int32")
            }
            DataType::Int64 {
                min_value,
                max_value,
            } => {
                let n = as_signed(value)?;
                check_signed_bounds(n, *min_value, *max_value, "Int64")
            }
            DataType::UInt32 {
                min_value,
                max_value,
            } => {
                let n = as_unsigned(value)?;
                check_unsigned_range(n, u32::MAX as u64, "UInt32")?;
                check_unsigned_bounds(n, *min_value, *max_value, "UInt32")
            }
            DataType::UInt64 {
                min_value,
                max_value,
            } => {
                let n = as_unsigned(value)?;
                check_unsigned_bounds(n, *min_value, *max_value, "UInt64")
            }
            DataType::Float32 | DataType::Float64 => match value {
                Value::Number(n) if n.as_f64().is_some() => Ok(()),
                other => Err(wrong_kind("number", other)),
            },
            DataType::String {
                min_length,
                max_length,
                pattern,
            } => {
                let s = match value {
                    Value::String(s) => s,
                    other => return Err(wrong_kind("string", other)),
                };
                let length = s.chars().count() as u64;
                if min_length.map_or(false, |min| length < min)
                    || max_length.map_or(false, |max| length > max)
                {
                    return Err(ValueError::LengthOutOfBounds { length });
                }
                if let Some(pattern) = pattern {
                    let re = regex::Regex::new(pattern).map_err(|e| ValueError::BadPattern {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    })?;
                    if !re.is_match(s) {
                        return Err(ValueError::PatternMismatch {
                            pattern: pattern.clone(),
                        });
                    }
                }
                Ok(())
            }
            DataType::Binary => match value {
                Value::String(_) => Ok(()),
                other => Err(wrong_kind("string", other)),
            },
            DataType::Timestamp { format } => {
                let s = match value {
                    Value::String(s) => s,
                    other => return Err(wrong_kind("string", other)),
                };
                // strptime semantics: a date-only format still parses.
                let ok = chrono::NaiveDateTime::parse_from_str(s, format).is_ok()
                    || chrono::NaiveDate::parse_from_str(s, format).is_ok();
                if ok {
                    Ok(())
                } else {
                    Err(ValueError::BadTimestamp {
                        value: s.clone(),
                        format: format.clone(),
                    })
                }
            }
            DataType::Null => match value {
                Value::Null => Ok(()),
                other => Err(wrong_kind("null", other)),
            },
            DataType::List { .. }
            | DataType::Empty
            | DataType::Struct(_)
            | DataType::Union(_) => Err(ValueError::NotLiteral {
                type_name: self.name(),
            }),
        }
    }
}

/// A literal value that does not fit its data type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("expected a {expected} value, got {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },
    #[error("{value} is out of range for {type_name}")]
    OutOfRange {
        value: String,
        type_name: &'static str,
    },
    #[error("string length {length} is outside the allowed bounds")]
    LengthOutOfBounds { length: u64 },
    #[error("string does not match pattern '{pattern}'")]
    PatternMismatch { pattern: String },
    #[error("invalid pattern '{pattern}': {reason}")]
    BadPattern {
        pattern: String,
        reason: String,
    },
    #[error("'{value}' does not match timestamp format '{format}'")]
    BadTimestamp {
        value: String,
        format: String,
    },
    #[error("{type_name} values cannot be written as literals")]
    NotLiteral { type_name: &'static str },
}

fn wrong_kind(expected: &'static str, found: &Value) -> ValueError {
    ValueError::WrongKind {
        expected,
        found: value_kind(found),
    }
}

/// Human-readable kind of a JSON value, for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn as_signed(value: &Value) -> Result<i64, ValueError> {
    match value {
        Value::Number(n) if n.is_f64() => Err(ValueError::WrongKind {
            expected: "integer",
            found: "float",
        }),
        Value::Number(n) => n.as_i64().ok_or(ValueError::OutOfRange {
            value: n.to_string(),
            type_name: "Int64",
        }),
        other => Err(wrong_kind("integer", other)),
    }
}

fn as_unsigned(value: &Value) -> Result<u64, ValueError> {
    match value {
        Value::Number(n) if n.is_f64() => Err(ValueError::WrongKind {
            expected: "integer",
            found: "float",
        }),
        Value::Number(n) => n.as_u64().ok_or(ValueError::OutOfRange {
            value: n.to_string(),
            type_name: "UInt64",
        }),
        other => Err(wrong_kind("integer", other)),
    }
}

fn check_signed_range(
    n: i64,
    min: i64,
    max: i64,
    type_name: &'static str,
) -> Result<(), ValueError> {
    if n < min || n > max {
        return Err(ValueError::OutOfRange {
            value: n.to_string(),
            type_name,
        });
    }
    Ok(())
}

fn check_signed_bounds(
    n: i64,
    min_value: Option<i64>,
    max_value: Option<i64>,
    type_name: &'static str,
) -> Result<(), ValueError> {
    if min_value.map_or(false, |min| n < min) || max_value.map_or(false, |max| n > max) {
        return Err(ValueError::OutOfRange {
            value: n.to_string(),
            type_name,
        });
    }
    Ok(())
}

fn check_unsigned_range(n: u64, max: u64, type_name: &'static str) -> Result<(), ValueError> {
    if n > max {
        return Err(ValueError::OutOfRange {
            value: n.to_string(),
            type_name,
        });
    }
    Ok(())
}

fn check_unsigned_bounds(
    n: u64,
    min_value: Option<u64>,
    max_value: Option<u64>,
    type_name: &'static str,
) -> Result<(), ValueError> {
    if min_value.map_or(false, |min| n < min) || max_value.map_or(false, |max| n > max) {
        return Err(ValueError::OutOfRange {
            value: n.to_string(),
            type_name,
        });
    }
    Ok(())
}

// ============================================================================
// Routes
// ============================================================================

/// A resolved API route with typed payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub name: String,
    /// URL path; defaults to the lower-cased route name.
    pub path: String,
    pub doc: String,
    pub request: Option<Arc<DataType>>,
    pub response: Option<Arc<DataType>>,
    pub error: Option<Arc<DataType>>,
    /// Free-form attributes, carried through unvalidated.
    pub attrs: HashMap<String, Value>,
}

// ============================================================================
// Namespaces and the Api aggregate
// ============================================================================

/// A namespace's declared types and routes, in declaration order.
///
/// Downstream generators depend on the insertion order of `types` and
/// `routes`, so both are plain vectors, not sorted maps.
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    pub name: String,
    pub types: Vec<Arc<DataType>>,
    pub routes: Vec<Route>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Look up a registered type by its declared name.
    pub fn data_type(&self, name: &str) -> Option<&Arc<DataType>> {
        self.types
            .iter()
            .find(|t| t.declared_name() == Some(name))
    }

    /// Look up a registered route by name.
    pub fn route(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name == name)
    }

    pub fn add_data_type(&mut self, data_type: Arc<DataType>) {
        self.types.push(data_type);
    }

    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }
}

/// The resolved schema: a version plus all namespaces, in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct Api {
    pub version: String,
    pub namespaces: Vec<Namespace>,
}

impl Api {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            namespaces: Vec::new(),
        }
    }

    /// Fetch the namespace with the given name, creating it on first use.
    ///
    /// Two documents declaring the same namespace accumulate into one
    /// `Namespace` instance.
    pub fn ensure_namespace(&mut self, name: &str) -> &mut Namespace {
        if let Some(idx) = self.namespaces.iter().position(|n| n.name == name) {
            &mut self.namespaces[idx]
        } else {
            self.namespaces.push(Namespace::new(name));
            self.namespaces.last_mut().expect("just pushed")
        }
    }

    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.iter().find(|n| n.name == name)
    }
}
