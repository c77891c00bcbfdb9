//! Output validation against a restricted JSON-schema grammar.
//!
//! [`schema::compile`] turns a schema document into a [`schema::SchemaNode`]
//! tree; [`validator::OutputValidator`] checks generated output against it.

pub mod schema;
pub mod validator;
