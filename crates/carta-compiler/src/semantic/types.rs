use std::sync::Arc;

use serde_json::Value;

use carta_common::schema::{value_kind, DataType};

use super::env::{EnvEntry, Environment};
use crate::ast::nodes::{RawAttr, RawValue};
use crate::error::ResolveError;

/// An uninstantiated, attribute-accepting type constructor from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeConstructor {
    Boolean,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    Binary,
    Timestamp,
    List,
    Struct,
    Union,
}

impl TypeConstructor {
    pub const ALL: &'static [TypeConstructor] = &[
        TypeConstructor::Boolean,
        TypeConstructor::Int32,
        TypeConstructor::Int64,
        TypeConstructor::UInt32,
        TypeConstructor::UInt64,
        TypeConstructor::Float32,
        TypeConstructor::Float64,
        TypeConstructor::String,
        TypeConstructor::Binary,
        TypeConstructor::Timestamp,
        TypeConstructor::List,
        TypeConstructor::Struct,
        TypeConstructor::Union,
    ];

    /// The name this constructor is bound under in the catalog.
    pub fn name(&self) -> &'static str {
        match self {
            TypeConstructor::Boolean => "Boolean",
            TypeConstructor::Int32 => "Int32",
            TypeConstructor::Int64 => "Int64",
            TypeConstructor::UInt32 => "UInt32",
            TypeConstructor::UInt64 => "UInt64",
            TypeConstructor::Float32 => "Float32",
            TypeConstructor::Float64 => "Float64",
            TypeConstructor::String => "String",
            TypeConstructor::Binary => "Binary",
            TypeConstructor::Timestamp => "Timestamp",
            TypeConstructor::List => "List",
            TypeConstructor::Struct => "Struct",
            TypeConstructor::Union => "Union",
        }
    }

    /// Apply resolved attributes as named parameters, producing an instance.
    ///
    /// Struct and Union reserve their catalog names but are only ever built
    /// from type definitions, never instantiated through attributes.
    pub fn instantiate(
        self,
        attrs: Vec<(String, AttrValue)>,
    ) -> Result<Arc<DataType>, ResolveError> {
        let mut attrs = Attrs::new(self.name(), attrs);
        let data_type = match self {
            TypeConstructor::Boolean => DataType::Boolean,
            TypeConstructor::Int32 => DataType::Int32 {
                min_value: attrs.take_i64("min_value")?,
                max_value: attrs.take_i64("max_value")?,
            },
            TypeConstructor::Int64 => DataType::Int64 {
                min_value: attrs.take_i64("min_value")?,
                max_value: attrs.take_i64("max_value")?,
            },
            TypeConstructor::UInt32 => DataType::UInt32 {
                min_value: attrs.take_u64("min_value")?,
                max_value: attrs.take_u64("max_value")?,
            },
            TypeConstructor::UInt64 => DataType::UInt64 {
                min_value: attrs.take_u64("min_value")?,
                max_value: attrs.take_u64("max_value")?,
            },
            TypeConstructor::Float32 => DataType::Float32,
            TypeConstructor::Float64 => DataType::Float64,
            TypeConstructor::String => DataType::String {
                min_length: attrs.take_u64("min_length")?,
                max_length: attrs.take_u64("max_length")?,
                pattern: attrs.take_string("pattern")?,
            },
            TypeConstructor::Binary => DataType::Binary,
            TypeConstructor::Timestamp => DataType::Timestamp {
                format: attrs.take_required_string("format")?,
            },
            TypeConstructor::List => DataType::List {
                item: attrs.take_required_type("data_type")?,
                min_items: attrs.take_u64("min_items")?,
                max_items: attrs.take_u64("max_items")?,
            },
            TypeConstructor::Struct | TypeConstructor::Union => {
                return Err(ResolveError::CompositeInstantiation(self.name()))
            }
        };
        attrs.finish()?;
        Ok(Arc::new(data_type))
    }
}

/// An attribute value after symbol substitution.
#[derive(Debug, Clone)]
pub enum AttrValue {
    Literal(Value),
    Type(Arc<DataType>),
}

/// Resolve the type referenced by `name`, applying `attrs`.
///
/// A constructor is instantiated with its attributes resolved first; an
/// instance is returned as-is, shared, and rejects attributes.
pub fn resolve_type(
    env: &Environment,
    name: &str,
    attrs: &[RawAttr],
) -> Result<Arc<DataType>, ResolveError> {
    match env.lookup(name) {
        None => Err(ResolveError::UndefinedSymbol(name.to_string())),
        Some(EnvEntry::Constructor(ctor)) => {
            let ctor = *ctor;
            let resolved = resolve_attrs(env, attrs)?;
            ctor.instantiate(resolved)
        }
        Some(EnvEntry::Instance(instance)) => {
            if !attrs.is_empty() {
                return Err(ResolveError::AttributesOnInstance(name.to_string()));
            }
            Ok(instance.clone())
        }
    }
}

/// Substitute symbol references in attribute values with resolved types.
fn resolve_attrs(
    env: &Environment,
    attrs: &[RawAttr],
) -> Result<Vec<(String, AttrValue)>, ResolveError> {
    attrs
        .iter()
        .map(|attr| {
            let value = match &attr.value {
                RawValue::Symbol(symbol) => {
                    if !env.contains(symbol) {
                        return Err(ResolveError::UndefinedSymbol(symbol.clone()));
                    }
                    AttrValue::Type(resolve_type(env, symbol, &[])?)
                }
                RawValue::Literal(value) => AttrValue::Literal(value.clone()),
            };
            Ok((attr.name.clone(), value))
        })
        .collect()
}

/// Named-parameter extraction over a constructor's attribute list.
struct Attrs {
    type_name: &'static str,
    entries: Vec<(String, AttrValue)>,
}

impl Attrs {
    fn new(type_name: &'static str, entries: Vec<(String, AttrValue)>) -> Self {
        Self { type_name, entries }
    }

    fn take(&mut self, name: &str) -> Option<AttrValue> {
        let idx = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(idx).1)
    }

    fn invalid(&self, attr: &str, reason: impl Into<String>) -> ResolveError {
        ResolveError::InvalidAttribute {
            type_name: self.type_name.to_string(),
            attr: attr.to_string(),
            reason: reason.into(),
        }
    }

    fn take_i64(&mut self, name: &str) -> Result<Option<i64>, ResolveError> {
        match self.take(name) {
            None => Ok(None),
            Some(AttrValue::Literal(Value::Number(n))) => match n.as_i64() {
                Some(v) => Ok(Some(v)),
                None => Err(self.invalid(name, format!("{} is not a valid integer", n))),
            },
            Some(AttrValue::Literal(other)) => {
                Err(self.invalid(name, format!("expected an integer, got {}", value_kind(&other))))
            }
            Some(AttrValue::Type(_)) => {
                Err(self.invalid(name, "expected an integer, got a type reference"))
            }
        }
    }

    fn take_u64(&mut self, name: &str) -> Result<Option<u64>, ResolveError> {
        match self.take(name) {
            None => Ok(None),
            Some(AttrValue::Literal(Value::Number(n))) => match n.as_u64() {
                Some(v) => Ok(Some(v)),
                None => Err(self.invalid(name, format!("{} is not a valid unsigned integer", n))),
            },
            Some(AttrValue::Literal(other)) => {
                Err(self.invalid(name, format!("expected an integer, got {}", value_kind(&other))))
            }
            Some(AttrValue::Type(_)) => {
                Err(self.invalid(name, "expected an integer, got a type reference"))
            }
        }
    }

    fn take_string(&mut self, name: &str) -> Result<Option<String>, ResolveError> {
        match self.take(name) {
            None => Ok(None),
            Some(AttrValue::Literal(Value::String(s))) => Ok(Some(s)),
            Some(AttrValue::Literal(other)) => {
                Err(self.invalid(name, format!("expected a string, got {}", value_kind(&other))))
            }
            Some(AttrValue::Type(_)) => {
                Err(self.invalid(name, "expected a string, got a type reference"))
            }
        }
    }

    fn take_required_string(&mut self, name: &str) -> Result<String, ResolveError> {
        self.take_string(name)?
            .ok_or_else(|| ResolveError::MissingAttribute {
                type_name: self.type_name.to_string(),
                attr: name.to_string(),
            })
    }

    fn take_required_type(&mut self, name: &str) -> Result<Arc<DataType>, ResolveError> {
        match self.take(name) {
            Some(AttrValue::Type(data_type)) => Ok(data_type),
            Some(AttrValue::Literal(other)) => Err(self.invalid(
                name,
                format!("expected a type reference, got {}", value_kind(&other)),
            )),
            None => Err(ResolveError::MissingAttribute {
                type_name: self.type_name.to_string(),
                attr: name.to_string(),
            }),
        }
    }

    /// Reject any attributes left after extraction.
    fn finish(self) -> Result<(), ResolveError> {
        if let Some((name, _)) = self.entries.into_iter().next() {
            return Err(ResolveError::InvalidAttribute {
                type_name: self.type_name.to_string(),
                attr: name,
                reason: "not a recognized attribute".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn literal(name: &str, value: Value) -> RawAttr {
        RawAttr {
            name: name.to_string(),
            value: RawValue::Literal(value),
        }
    }

    fn symbol(name: &str, target: &str) -> RawAttr {
        RawAttr {
            name: name.to_string(),
            value: RawValue::Symbol(target.to_string()),
        }
    }

    #[test]
    fn constructor_with_attributes() {
        let env = Environment::for_document();
        let t = resolve_type(
            &env,
            "Int32",
            &[literal("min_value", json!(0)), literal("max_value", json!(10))],
        )
        .unwrap();
        assert_eq!(
            *t,
            DataType::Int32 {
                min_value: Some(0),
                max_value: Some(10),
            }
        );
    }

    #[test]
    fn distinct_attribute_sets_yield_distinct_types() {
        let env = Environment::for_document();
        let narrow = resolve_type(&env, "Int32", &[literal("max_value", json!(10))]).unwrap();
        let wide = resolve_type(&env, "Int32", &[]).unwrap();
        assert_ne!(*narrow, *wide);
    }

    #[test]
    fn unknown_attribute_is_rejected() {
        let env = Environment::for_document();
        let err = resolve_type(&env, "Int32", &[literal("bogus", json!(1))]).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidAttribute { .. }));
    }

    #[test]
    fn timestamp_requires_format() {
        let env = Environment::for_document();
        let err = resolve_type(&env, "Timestamp", &[]).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::MissingAttribute { ref attr, .. } if attr == "format"
        ));
    }

    #[test]
    fn list_requires_an_element_type() {
        let env = Environment::for_document();
        let err = resolve_type(&env, "List", &[]).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::MissingAttribute { ref attr, .. } if attr == "data_type"
        ));

        let t = resolve_type(&env, "List", &[symbol("data_type", "String")]).unwrap();
        match &*t {
            DataType::List { item, .. } => assert!(matches!(**item, DataType::String { .. })),
            other => panic!("expected a list, got {}", other.name()),
        }
    }

    #[test]
    fn attribute_symbols_must_be_bound() {
        let env = Environment::for_document();
        let err = resolve_type(&env, "List", &[symbol("data_type", "Missing")]).unwrap_err();
        assert!(matches!(err, ResolveError::UndefinedSymbol(ref s) if s == "Missing"));
    }

    #[test]
    fn instances_reject_attributes() {
        let env = Environment::for_document();
        let err = resolve_type(&env, "Empty", &[literal("min_value", json!(0))]).unwrap_err();
        assert!(matches!(err, ResolveError::AttributesOnInstance(ref s) if s == "Empty"));
    }

    #[test]
    fn instances_are_shared_not_copied() {
        let env = Environment::for_document();
        let first = resolve_type(&env, "Empty", &[]).unwrap();
        let second = resolve_type(&env, "Empty", &[]).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn composite_constructors_cannot_be_instantiated() {
        let env = Environment::for_document();
        let err = resolve_type(&env, "Struct", &[]).unwrap_err();
        assert!(matches!(err, ResolveError::CompositeInstantiation("Struct")));
    }

    #[test]
    fn undefined_symbol() {
        let env = Environment::for_document();
        let err = resolve_type(&env, "Missing", &[]).unwrap_err();
        assert!(matches!(err, ResolveError::UndefinedSymbol(_)));
    }
}
