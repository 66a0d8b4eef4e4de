use std::path::PathBuf;

use thiserror::Error;

use carta_common::schema::ValueError;

use crate::parser::ParseError;

/// Errors raised while resolving a document's declarations.
///
/// All of these abort the current document; none of them is fatal to the
/// run as a whole. See [`AssembleError`] for the one fatal case.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("symbol '{0}' is already defined")]
    AlreadyDefined(String),

    #[error("symbol '{0}' is undefined")]
    UndefinedSymbol(String),

    #[error("attributes cannot be specified for instantiated type '{0}'")]
    AttributesOnInstance(String),

    #[error("invalid default for field '{field}': {source}")]
    InvalidDefault {
        field: String,
        source: ValueError,
    },

    #[error("unknown composite kind '{0}' (expected 'struct' or 'union')")]
    UnknownCompositeKind(String),

    #[error("declaration kind '{kind}' is not allowed in {context}")]
    UnknownDeclaration {
        kind: &'static str,
        context: &'static str,
    },

    #[error("header '{0}' does not exist")]
    HeaderNotFound(PathBuf),

    #[error("invalid attribute '{attr}' for {type_name}: {reason}")]
    InvalidAttribute {
        type_name: String,
        attr: String,
        reason: String,
    },

    #[error("type {type_name} requires attribute '{attr}'")]
    MissingAttribute {
        type_name: String,
        attr: String,
    },

    #[error("composite constructor '{0}' can only be used by a type definition")]
    CompositeInstantiation(&'static str),

    #[error("type '{0}' cannot be extended (a supertype must be a struct)")]
    InvalidSupertype(String),

    #[error("type '{0}' declares more than one catch-all field")]
    DuplicateCatchAll(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to read header: {0}")]
    Io(#[from] std::io::Error),
}

/// A whole-document failure surfaced to the driver.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// Fatal: without a leading namespace declaration there is nothing to
    /// attach the document's contents to, so the run cannot continue.
    #[error("first declaration in '{path}' must be a namespace")]
    MissingNamespace { path: PathBuf },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
