//! Logic-less prompt templating.
//!
//! A small mustache dialect: `{{var}}` (HTML-escaped), `{{{var}}}` and
//! `{{& var}}` (raw), `{{#section}}`, `{{^inverted}}`, `{{! comments }}`.
//! Partials parse but render nothing. Delimiter changes are rejected.
//!
//! Templates are parsed into an explicit AST ([`ast`]) which is shared by the
//! renderer ([`render`]) and the missing-variable scanner ([`scan`]).
//! [`renderer::PromptRenderer`] combines both with defaults merging.

pub mod ast;
pub mod lookup;
pub mod render;
pub mod renderer;
pub mod scan;
