pub mod manifest;
pub mod schema;

pub use manifest::{CartaManifest, ManifestError};
pub use schema::{Api, CompositeType, DataType, Example, Field, Namespace, Route, ValueError};
