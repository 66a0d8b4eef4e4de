use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;

use carta_common::schema::DataType;

use super::types::TypeConstructor;
use crate::error::ResolveError;

/// An environment binding: an uninstantiated constructor from the catalog,
/// or an already-resolved type instance.
#[derive(Debug, Clone)]
pub enum EnvEntry {
    Constructor(TypeConstructor),
    Instance(Arc<DataType>),
}

/// The per-document symbol table mapping names to type entries.
///
/// Bindings are append-only: rebinding an existing name is an error and
/// nothing is ever removed. Each document starts from a copy of the base
/// catalog; included headers extend the including document's environment.
#[derive(Debug, Clone)]
pub struct Environment {
    entries: HashMap<String, EnvEntry>,
}

lazy_static! {
    /// The immutable base catalog every document environment is copied from.
    static ref BASE: Environment = {
        let mut entries = HashMap::new();
        for ctor in TypeConstructor::ALL {
            entries.insert(ctor.name().to_string(), EnvEntry::Constructor(*ctor));
        }
        entries.insert(
            "Empty".to_string(),
            EnvEntry::Instance(Arc::new(DataType::Empty)),
        );
        entries.insert(
            "Null".to_string(),
            EnvEntry::Instance(Arc::new(DataType::Null)),
        );
        Environment { entries }
    };
}

impl Environment {
    /// A fresh environment seeded from the base catalog.
    pub fn for_document() -> Self {
        BASE.clone()
    }

    pub fn lookup(&self, name: &str) -> Option<&EnvEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Bind a new name. Rebinding an existing name fails.
    pub fn bind(&mut self, name: &str, entry: EnvEntry) -> Result<(), ResolveError> {
        if self.entries.contains_key(name) {
            return Err(ResolveError::AlreadyDefined(name.to_string()));
        }
        self.entries.insert(name.to_string(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_catalog_binds_constructors_and_instances() {
        let env = Environment::for_document();
        assert!(matches!(env.lookup("Int32"), Some(EnvEntry::Constructor(_))));
        assert!(matches!(env.lookup("List"), Some(EnvEntry::Constructor(_))));
        assert!(matches!(env.lookup("Empty"), Some(EnvEntry::Instance(_))));
        assert!(matches!(env.lookup("Null"), Some(EnvEntry::Instance(_))));
        assert!(env.lookup("Metadata").is_none());
    }

    #[test]
    fn rebinding_fails() {
        let mut env = Environment::for_document();
        env.bind("Custom", EnvEntry::Instance(Arc::new(DataType::Boolean)))
            .unwrap();
        let err = env
            .bind("Custom", EnvEntry::Instance(Arc::new(DataType::Boolean)))
            .unwrap_err();
        assert!(matches!(err, ResolveError::AlreadyDefined(name) if name == "Custom"));
    }

    #[test]
    fn catalog_names_cannot_be_rebound() {
        let mut env = Environment::for_document();
        let err = env
            .bind("String", EnvEntry::Instance(Arc::new(DataType::Boolean)))
            .unwrap_err();
        assert!(matches!(err, ResolveError::AlreadyDefined(_)));
    }

    #[test]
    fn document_environments_are_independent() {
        let mut first = Environment::for_document();
        first
            .bind("Custom", EnvEntry::Instance(Arc::new(DataType::Boolean)))
            .unwrap();
        let second = Environment::for_document();
        assert!(second.lookup("Custom").is_none());
    }
}
