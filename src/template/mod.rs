//! Variable substitution for templated configuration values.
//!
//! Stack names, parameter values and tag values may reference variables with
//! `{{ name }}` placeholders and optional filter chains. This is deliberately
//! not a general templating language: substitution and a few filters only.

mod renderer;

pub use renderer::{render, Variables};
