//! Lambda function packaging.
//!
//! Packages a function source directory into a compressed archive ready
//! for upload. The runtime determines which dependency manifest must be
//! present; the source tree including that manifest is archived as-is.

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::error::{Result, StackpilotError, TransferError};
use crate::report;

/// Manifest file names accepted for a runtime, in preference order.
struct RuntimeConfig {
    runtime: &'static str,
    manifests: &'static [&'static str],
}

const JAVA_MANIFESTS: &[&str] = &["pom.xml", "build.gradle", "build.gradle.kts"];

const RUNTIMES: &[RuntimeConfig] = &[
    RuntimeConfig {
        runtime: "python3.9",
        manifests: &["requirements.txt"],
    },
    RuntimeConfig {
        runtime: "python3.10",
        manifests: &["requirements.txt"],
    },
    RuntimeConfig {
        runtime: "python3.11",
        manifests: &["requirements.txt"],
    },
    RuntimeConfig {
        runtime: "python3.12",
        manifests: &["requirements.txt"],
    },
    RuntimeConfig {
        runtime: "nodejs18.x",
        manifests: &["package.json"],
    },
    RuntimeConfig {
        runtime: "nodejs20.x",
        manifests: &["package.json"],
    },
    RuntimeConfig {
        runtime: "ruby3.2",
        manifests: &["Gemfile"],
    },
    RuntimeConfig {
        runtime: "java11",
        manifests: JAVA_MANIFESTS,
    },
    RuntimeConfig {
        runtime: "java17",
        manifests: JAVA_MANIFESTS,
    },
    RuntimeConfig {
        runtime: "java21",
        manifests: JAVA_MANIFESTS,
    },
    RuntimeConfig {
        runtime: "go1.x",
        manifests: &["go.mod"],
    },
    RuntimeConfig {
        runtime: "dotnet6",
        manifests: &[".csproj"],
    },
    RuntimeConfig {
        runtime: "dotnet8",
        manifests: &[".csproj"],
    },
];

/// Runtimes accepted by [`build_lambda`].
#[must_use]
pub fn supported_runtimes() -> Vec<&'static str> {
    RUNTIMES.iter().map(|c| c.runtime).collect()
}

/// Packages `source_dir` into `output_dir` as a `.tar.gz` archive.
///
/// `archive_name` defaults to the source directory's name. The path to the
/// created archive is returned.
///
/// # Errors
///
/// Returns [`TransferError::Packaging`] for an unsupported runtime or a
/// source directory without the runtime's dependency manifest, and IO
/// errors from archive creation.
pub fn build_lambda(
    source_dir: &Path,
    output_dir: &Path,
    runtime: &str,
    archive_name: Option<&str>,
) -> Result<PathBuf> {
    let config = RUNTIMES
        .iter()
        .find(|c| c.runtime == runtime)
        .ok_or_else(|| packaging_error(format!("Unsupported runtime {runtime}")))?;

    let manifest = find_manifest(source_dir, config)?;
    debug!("Using manifest {} for runtime {runtime}", manifest.display());

    let archive_name = match archive_name {
        Some(name) => name.to_string(),
        None => source_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| packaging_error("Cannot derive archive name from source directory"))?,
    };

    std::fs::create_dir_all(output_dir)?;
    let archive_path = output_dir.join(format!("{archive_name}.tar.gz"));

    report::info(&format!(
        "Building {runtime} archive from {}",
        source_dir.display()
    ));

    let file = File::create(&archive_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all("", source_dir)?;
    builder.into_inner()?.finish()?;

    report::success(&format!("Built archive {}", archive_path.display()));
    Ok(archive_path)
}

/// Finds the first manifest for the runtime present in the source tree.
///
/// Manifest names starting with a dot match by extension, covering project
/// files named after the project.
fn find_manifest(source_dir: &Path, config: &RuntimeConfig) -> Result<PathBuf> {
    for manifest in config.manifests {
        if let Some(extension) = manifest.strip_prefix('.') {
            let found = std::fs::read_dir(source_dir)?
                .filter_map(std::result::Result::ok)
                .map(|entry| entry.path())
                .find(|path| {
                    path.extension()
                        .is_some_and(|e| e.to_string_lossy() == extension)
                });
            if let Some(path) = found {
                return Ok(path);
            }
        } else {
            let path = source_dir.join(manifest);
            if path.is_file() {
                return Ok(path);
            }
        }
    }
    Err(packaging_error(format!(
        "Cannot find suitable manifest for runtime {} in {}",
        config.runtime,
        source_dir.display()
    )))
}

fn packaging_error(message: impl Into<String>) -> StackpilotError {
    StackpilotError::Transfer(TransferError::Packaging {
        message: message.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn source_with(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            let mut file = File::create(dir.path().join(name)).unwrap();
            writeln!(file, "# {name}").unwrap();
        }
        dir
    }

    #[test]
    fn test_unsupported_runtime() {
        let source = source_with(&["requirements.txt"]);
        let output = tempfile::tempdir().unwrap();
        let result = build_lambda(source.path(), output.path(), "cobol85", None);
        match result {
            Err(StackpilotError::Transfer(TransferError::Packaging { message })) => {
                assert!(message.contains("cobol85"));
            }
            other => panic!("Expected Packaging error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_manifest() {
        let source = source_with(&["handler.py"]);
        let output = tempfile::tempdir().unwrap();
        let result = build_lambda(source.path(), output.path(), "python3.12", None);
        assert!(matches!(
            result,
            Err(StackpilotError::Transfer(TransferError::Packaging { .. }))
        ));
    }

    #[test]
    fn test_builds_python_archive() {
        let source = source_with(&["requirements.txt", "handler.py"]);
        let output = tempfile::tempdir().unwrap();

        let archive = build_lambda(source.path(), output.path(), "python3.12", Some("function"))
            .unwrap();

        assert_eq!(archive, output.path().join("function.tar.gz"));
        assert!(archive.is_file());
        assert!(std::fs::metadata(&archive).unwrap().len() > 0);
    }

    #[test]
    fn test_archive_name_defaults_to_directory_name() {
        let source = source_with(&["package.json"]);
        let output = tempfile::tempdir().unwrap();

        let archive = build_lambda(source.path(), output.path(), "nodejs20.x", None).unwrap();

        let dir_name = source.path().file_name().unwrap().to_string_lossy();
        assert_eq!(archive, output.path().join(format!("{dir_name}.tar.gz")));
    }

    #[test]
    fn test_java_manifest_preference() {
        let source = source_with(&["build.gradle"]);
        let found = find_manifest(
            source.path(),
            RUNTIMES.iter().find(|c| c.runtime == "java17").unwrap(),
        )
        .unwrap();
        assert!(found.ends_with("build.gradle"));
    }

    #[test]
    fn test_dotnet_manifest_matches_by_extension() {
        let source = source_with(&["MyFunction.csproj"]);
        let found = find_manifest(
            source.path(),
            RUNTIMES.iter().find(|c| c.runtime == "dotnet8").unwrap(),
        )
        .unwrap();
        assert!(found.to_string_lossy().ends_with("MyFunction.csproj"));
    }
}
