//! File transfer and artifact packaging.
//!
//! Uploads local files (typically templates or function archives) to remote
//! storage, and packages function source directories into deployable
//! archives.

mod packager;
mod uploader;

pub use packager::{build_lambda, supported_runtimes};
pub use uploader::Uploader;
