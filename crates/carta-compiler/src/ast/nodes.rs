use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Declarations
// ============================================================================

/// A top-level declaration, as produced by the concrete-syntax parser.
///
/// The resolver consumes these in source order; it never sees raw source
/// text except when re-entering the parser for an included header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    Namespace(NamespaceDecl),
    Include(IncludeDecl),
    Alias(AliasDecl),
    TypeDef(TypeDefDecl),
    RouteDef(RouteDefDecl),
}

impl Declaration {
    /// The declaration's kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Declaration::Namespace(_) => "namespace",
            Declaration::Include(_) => "include",
            Declaration::Alias(_) => "alias",
            Declaration::TypeDef(_) => "type_def",
            Declaration::RouteDef(_) => "route_def",
        }
    }
}

/// `namespace files`; must be the first declaration of every document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceDecl {
    pub name: String,
}

/// `include common`; pulls a sibling header's definitions into scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncludeDecl {
    pub target: String,
}

/// `alias Name = Type(attrs)`; binds a new name to a type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasDecl {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub attrs: Vec<RawAttr>,
}

/// A struct or union definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDefDecl {
    pub name: String,
    /// `"struct"` or `"union"`; kept open so the resolver owns the rejection
    /// of anything else.
    pub composite: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub fields: Vec<RawField>,
    #[serde(default)]
    pub examples: Vec<RawExample>,
}

/// A route definition with optional request/response/error payload names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDefDecl {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    /// Explicit URL path; defaults to the lower-cased route name.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub request: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// Free-form route attributes, carried through unvalidated.
    #[serde(default)]
    pub attrs: HashMap<String, Value>,
}

// ============================================================================
// Fields
// ============================================================================

/// A raw field of a type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawField {
    /// A bare tag with no payload (union variant enumeration).
    Symbol(SymbolFieldDecl),
    /// The catch-all placeholder marker; never becomes a resolved field.
    CatchAll,
    Typed(TypedFieldDecl),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolFieldDecl {
    pub name: String,
    #[serde(default)]
    pub doc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedFieldDecl {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    pub type_name: String,
    #[serde(default)]
    pub attrs: Vec<RawAttr>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub deprecated: bool,
    /// Defaults are flagged separately so a `null` default is representable.
    #[serde(default)]
    pub has_default: bool,
    #[serde(default)]
    pub default: Value,
}

// ============================================================================
// Attributes and examples
// ============================================================================

/// A named attribute with a raw value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAttr {
    pub name: String,
    pub value: RawValue,
}

/// An attribute value before resolution: a literal or a symbol reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawValue {
    Symbol(String),
    Literal(Value),
}

/// A documented example attached to a type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawExample {
    pub label: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub values: HashMap<String, Value>,
}
