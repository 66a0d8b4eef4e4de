use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use carta_common::schema::{Api, CompositeType, DataType, Example, Field, Route};

use super::env::{EnvEntry, Environment};
use super::types::{resolve_type, AttrValue};
use crate::ast::nodes::{
    AliasDecl, Declaration, RawAttr, RawField, RawValue, RouteDefDecl, TypeDefDecl, TypedFieldDecl,
};
use crate::error::{AssembleError, ResolveError};
use crate::parser::DocumentParser;

/// File suffix for included headers.
const HEADER_SUFFIX: &str = "cartah";

/// Resolves parsed documents into an [`Api`], one document at a time.
///
/// Declarations are processed strictly in source order: a declaration may
/// reference only names bound by earlier declarations (or the catalog), and
/// never the reverse. Each document gets its own environment, seeded from
/// the base catalog and discarded when the document is done; the `Api`
/// accumulates the registered namespaces across documents.
pub struct Resolver<'p> {
    api: Api,
    parser: &'p dyn DocumentParser,
}

impl<'p> Resolver<'p> {
    pub fn new(version: impl Into<String>, parser: &'p dyn DocumentParser) -> Self {
        Self {
            api: Api::new(version),
            parser,
        }
    }

    /// Resolve one document and register its contents on its namespace.
    ///
    /// On error nothing is registered for this document; the namespace (and
    /// anything earlier documents put there) is left untouched.
    pub fn add_document(
        &mut self,
        path: &Path,
        declarations: Vec<Declaration>,
    ) -> Result<(), AssembleError> {
        if declarations.is_empty() {
            warn!(path = %path.display(), "document has no declarations");
            return Ok(());
        }

        let mut decls = declarations.into_iter();
        let namespace_name = match decls.next() {
            Some(Declaration::Namespace(ns)) => ns.name,
            _ => {
                return Err(AssembleError::MissingNamespace {
                    path: path.to_path_buf(),
                })
            }
        };
        debug!(namespace = %namespace_name, path = %path.display(), "resolving document");

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut env = Environment::for_document();
        let mut types: Vec<Arc<DataType>> = Vec::new();
        let mut routes: Vec<Route> = Vec::new();

        for decl in decls {
            match decl {
                Declaration::Include(include) => {
                    include_header(self.parser, &mut env, &base_dir, &include.target)?;
                }
                Declaration::Alias(alias) => create_alias(&mut env, &alias)?,
                Declaration::TypeDef(typedef) => {
                    types.push(create_type(&mut env, &typedef)?);
                }
                Declaration::RouteDef(routedef) => {
                    let route = create_route(&env, &routedef)?;
                    if routes.iter().any(|r| r.name == route.name) {
                        return Err(ResolveError::AlreadyDefined(route.name).into());
                    }
                    routes.push(route);
                }
                other => {
                    return Err(ResolveError::UnknownDeclaration {
                        kind: other.kind_name(),
                        context: "a document body",
                    }
                    .into())
                }
            }
        }

        // The whole document resolved; only now touch the namespace.
        let namespace = self.api.ensure_namespace(&namespace_name);
        for data_type in &types {
            if let Some(name) = data_type.declared_name() {
                if namespace.data_type(name).is_some() {
                    return Err(ResolveError::AlreadyDefined(name.to_string()).into());
                }
            }
        }
        for route in &routes {
            if namespace.route(&route.name).is_some() {
                return Err(ResolveError::AlreadyDefined(route.name.clone()).into());
            }
        }
        for data_type in types {
            namespace.add_data_type(data_type);
        }
        for route in routes {
            namespace.add_route(route);
        }
        Ok(())
    }

    /// The accumulated schema.
    pub fn into_api(self) -> Api {
        self.api
    }
}

// ============================================================================
// Include resolution
// ============================================================================

/// Load `<target>.cartah` from `base_dir` and process its declarations into
/// the including document's environment.
///
/// Headers admit only includes, aliases, and type definitions. Types bound
/// here become visible to the including document but are not registered on
/// its namespace.
fn include_header(
    parser: &dyn DocumentParser,
    env: &mut Environment,
    base_dir: &Path,
    target: &str,
) -> Result<(), ResolveError> {
    let header_path = base_dir.join(format!("{}.{}", target, HEADER_SUFFIX));
    if !header_path.is_file() {
        return Err(ResolveError::HeaderNotFound(header_path));
    }
    debug!(header = %header_path.display(), "including header");

    let source = fs::read_to_string(&header_path)?;
    let declarations = parser.parse(&source)?;

    // Nested includes resolve relative to the header's own directory.
    let header_dir = header_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    for decl in declarations {
        match decl {
            Declaration::Include(include) => {
                include_header(parser, env, &header_dir, &include.target)?;
            }
            Declaration::Alias(alias) => create_alias(env, &alias)?,
            Declaration::TypeDef(typedef) => {
                create_type(env, &typedef)?;
            }
            other => {
                return Err(ResolveError::UnknownDeclaration {
                    kind: other.kind_name(),
                    context: "an included header",
                })
            }
        }
    }
    Ok(())
}

// ============================================================================
// Aliases
// ============================================================================

/// Bind an alias name to an existing instance or a fresh instantiation.
fn create_alias(env: &mut Environment, alias: &AliasDecl) -> Result<(), ResolveError> {
    if env.contains(&alias.name) {
        return Err(ResolveError::AlreadyDefined(alias.name.clone()));
    }
    let entry = match env.lookup(&alias.type_name) {
        None => return Err(ResolveError::UndefinedSymbol(alias.type_name.clone())),
        Some(EnvEntry::Constructor(ctor)) => {
            let ctor = *ctor;
            // Aliases apply their attributes without symbol substitution.
            let attrs = literal_attrs(ctor.name(), &alias.attrs)?;
            EnvEntry::Instance(ctor.instantiate(attrs)?)
        }
        Some(EnvEntry::Instance(instance)) => {
            if !alias.attrs.is_empty() {
                return Err(ResolveError::AttributesOnInstance(alias.type_name.clone()));
            }
            // Share the instance, don't copy it.
            EnvEntry::Instance(instance.clone())
        }
    };
    env.bind(&alias.name, entry)
}

/// Pass alias attributes through as literals. A symbol-valued attribute
/// could never instantiate correctly without substitution, so it is
/// rejected outright.
fn literal_attrs(
    type_name: &str,
    attrs: &[RawAttr],
) -> Result<Vec<(String, AttrValue)>, ResolveError> {
    attrs
        .iter()
        .map(|attr| match &attr.value {
            RawValue::Literal(value) => Ok((attr.name.clone(), AttrValue::Literal(value.clone()))),
            RawValue::Symbol(symbol) => Err(ResolveError::InvalidAttribute {
                type_name: type_name.to_string(),
                attr: attr.name.clone(),
                reason: format!("symbol '{}' is not substituted in aliases", symbol),
            }),
        })
        .collect()
}

// ============================================================================
// Type definitions
// ============================================================================

enum CompositeKind {
    Struct,
    Union,
}

/// Build a struct or union from a type definition and bind it into `env`,
/// making it visible to subsequent declarations (but not to its own fields).
fn create_type(env: &mut Environment, typedef: &TypeDefDecl) -> Result<Arc<DataType>, ResolveError> {
    let kind = match typedef.composite.as_str() {
        "struct" => CompositeKind::Struct,
        "union" => CompositeKind::Union,
        other => return Err(ResolveError::UnknownCompositeKind(other.to_string())),
    };

    let super_type = match (&kind, &typedef.extends) {
        (CompositeKind::Struct, Some(parent)) => Some(lookup_super_type(env, parent)?),
        _ => None,
    };

    let mut fields = Vec::new();
    let mut saw_catch_all = false;
    for raw_field in &typedef.fields {
        match raw_field {
            RawField::CatchAll => {
                if saw_catch_all {
                    return Err(ResolveError::DuplicateCatchAll(typedef.name.clone()));
                }
                saw_catch_all = true;
            }
            RawField::Symbol(symbol) => fields.push(Field::Symbol {
                name: symbol.name.clone(),
                doc: symbol.doc.clone(),
            }),
            RawField::Typed(typed) => fields.push(create_field(env, typed)?),
        }
    }

    let mut examples = HashMap::new();
    for example in &typedef.examples {
        examples.insert(
            example.label.clone(),
            Example {
                text: example.text.clone(),
                values: example.values.clone(),
            },
        );
    }

    let composite = CompositeType {
        name: typedef.name.clone(),
        doc: typedef.doc.clone(),
        fields,
        super_type,
        examples,
    };
    let data_type = Arc::new(match kind {
        CompositeKind::Struct => DataType::Struct(composite),
        CompositeKind::Union => DataType::Union(composite),
    });
    env.bind(&typedef.name, EnvEntry::Instance(data_type.clone()))?;
    Ok(data_type)
}

/// An `extends` target must already be a resolved struct in scope.
fn lookup_super_type(env: &Environment, name: &str) -> Result<Arc<DataType>, ResolveError> {
    match env.lookup(name) {
        None => Err(ResolveError::UndefinedSymbol(name.to_string())),
        Some(EnvEntry::Instance(instance)) if matches!(**instance, DataType::Struct(_)) => {
            Ok(instance.clone())
        }
        Some(_) => Err(ResolveError::InvalidSupertype(name.to_string())),
    }
}

// ============================================================================
// Fields
// ============================================================================

/// Resolve a typed raw field: its data type, flags, and validated default.
fn create_field(env: &Environment, field: &TypedFieldDecl) -> Result<Field, ResolveError> {
    if !env.contains(&field.type_name) {
        return Err(ResolveError::UndefinedSymbol(field.type_name.clone()));
    }
    let data_type = resolve_type(env, &field.type_name, &field.attrs)?;

    let default = if field.has_default {
        // A null default on a nullable field bypasses the value check.
        if !(field.nullable && field.default.is_null()) {
            data_type
                .check_value(&field.default)
                .map_err(|source| ResolveError::InvalidDefault {
                    field: field.name.clone(),
                    source,
                })?;
        }
        Some(field.default.clone())
    } else {
        None
    };

    Ok(Field::Typed {
        name: field.name.clone(),
        doc: field.doc.clone(),
        data_type,
        nullable: field.nullable,
        optional: field.optional,
        deprecated: field.deprecated,
        default,
    })
}

// ============================================================================
// Routes
// ============================================================================

/// Resolve a route's payload types and path.
fn create_route(env: &Environment, routedef: &RouteDefDecl) -> Result<Route, ResolveError> {
    let request = resolve_payload(env, routedef.request.as_deref())?;
    let response = resolve_payload(env, routedef.response.as_deref())?;
    let error = resolve_payload(env, routedef.error.as_deref())?;

    let path = match &routedef.path {
        Some(path) => path.trim_start_matches('/').to_string(),
        None => routedef.name.to_lowercase(),
    };

    Ok(Route {
        name: routedef.name.clone(),
        path,
        doc: routedef.doc.clone(),
        request,
        response,
        error,
        attrs: routedef.attrs.clone(),
    })
}

/// Resolve-or-absent: an empty or missing payload name means no payload; a
/// non-empty name must be bound.
fn resolve_payload(
    env: &Environment,
    name: Option<&str>,
) -> Result<Option<Arc<DataType>>, ResolveError> {
    match name {
        None | Some("") => Ok(None),
        Some(name) => Ok(Some(resolve_type(env, name, &[])?)),
    }
}
