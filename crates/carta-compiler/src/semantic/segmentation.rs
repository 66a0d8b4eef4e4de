use std::sync::Arc;

use carta_common::schema::DataType;

use super::env::Environment;
use super::types::resolve_type;
use crate::ast::nodes::{RawValue, TypedFieldDecl};
use crate::error::ResolveError;

/// Type name marking a field as a run of repeated path segments.
const SEGMENT_LIST: &str = "SList";

/// One segment of a route's path template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// A single typed segment.
    Single {
        name: String,
        data_type: Arc<DataType>,
    },
    /// A repeated run of segments sharing one element type.
    Repeated {
        name: String,
        data_type: Arc<DataType>,
    },
}

/// An ordered decomposition of a route's path template.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub segments: Vec<Segment>,
}

/// Convert a route's path-template fields into ordered segments.
///
/// A field of type `SList` becomes a repeated segment of its `data_type`
/// attribute's element type; anything else becomes a single segment of the
/// field's own type.
pub fn segment_fields(
    env: &Environment,
    fields: &[TypedFieldDecl],
) -> Result<Segmentation, ResolveError> {
    let mut segments = Vec::new();
    for field in fields {
        let segment = if field.type_name == SEGMENT_LIST {
            let element = element_type_name(field)?;
            Segment::Repeated {
                name: field.name.clone(),
                data_type: resolve_type(env, element, &[])?,
            }
        } else {
            Segment::Single {
                name: field.name.clone(),
                data_type: resolve_type(env, &field.type_name, &[])?,
            }
        };
        segments.push(segment);
    }
    Ok(Segmentation { segments })
}

/// The element type of a repeated-segment field, named by its `data_type`
/// attribute.
fn element_type_name(field: &TypedFieldDecl) -> Result<&str, ResolveError> {
    field
        .attrs
        .iter()
        .find_map(|attr| match (&*attr.name, &attr.value) {
            ("data_type", RawValue::Symbol(symbol)) => Some(symbol.as_str()),
            _ => None,
        })
        .ok_or_else(|| ResolveError::MissingAttribute {
            type_name: SEGMENT_LIST.to_string(),
            attr: "data_type".to_string(),
        })
}
