//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_form_surface;
mod in_memory_preview_document;
mod json_file_form_schema_source;

pub use in_memory_form_surface::{FieldSnapshot, FormControl, GroupItem, InMemoryFormSurface};
pub use in_memory_preview_document::InMemoryPreviewDocument;
pub use json_file_form_schema_source::JsonFileFormSchemaSource;
