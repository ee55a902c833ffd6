//! Configuration loading and resolution.
//!
//! A configuration file is a multi-document YAML file. One document may use
//! the reserved environment name `all` to provide inherited defaults; every
//! other document describes a deployable environment/region pair. Resolution
//! merges the base into the selected entry, substitutes variables into the
//! templated fields and applies command-line overrides, producing an
//! immutable [`DeploymentDescriptor`].

mod loader;
mod resolver;
mod spec;

pub use loader::{load_source, parse_source, ConfigSource};
pub use resolver::{resolve, DeploymentDescriptor, Overrides, ParameterValue};
pub use spec::{RawDocument, BASE_ENVIRONMENT};
