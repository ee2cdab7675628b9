//! Error types for a utilitool run
//!
//! Every error is fatal: the first one stops the run.

use crate::config::ConfigError;
use crate::imports::ParseError;
use crate::manifest::ManifestError;
use crate::naming::NamingError;
use crate::partition::DependencyConflict;
use crate::splice::SpliceError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UtilitoolError {
    /// Configuration file missing or unreadable
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Naming(#[from] NamingError),

    /// A listed source file cannot be read or is empty
    #[error("Cannot read source file {}: {reason}", .path.display())]
    UnreadableSource { path: PathBuf, reason: String },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Failed to resolve request \"{specifier}\" from \"{}\"", .file.display())]
    Resolution { specifier: String, file: PathBuf },

    /// The resolved target is owned by zero or several packages
    #[error(
        "Request \"{specifier}\" from \"{}\" resolves to \"{}\", which is owned by {}",
        .file.display(),
        .target.display(),
        describe_owners(.owners)
    )]
    PartitionConflict {
        specifier: String,
        file: PathBuf,
        target: PathBuf,
        owners: Vec<String>,
    },

    #[error(transparent)]
    DependencyVersionConflict(#[from] DependencyConflict),

    /// An owned file would be overwritten by the generated entry point
    #[error("Package \"{package}\" owns {}, which collides with its generated entry point", .path.display())]
    ReservedPath { package: String, path: PathBuf },

    #[error("{} is outside the project directory {}", .path.display(), .project.display())]
    OutsideProject { path: PathBuf, project: PathBuf },

    #[error("Build command `{command}` failed: {reason}")]
    BuildSubprocess {
        command: String,
        code: Option<i32>,
        reason: String,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Splice(#[from] SpliceError),
}

impl UtilitoolError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UtilitoolError::Io {
            path: path.into(),
            source,
        }
    }

    /// Exit status a command-line front end should use for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            UtilitoolError::BuildSubprocess {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn describe_owners(owners: &[String]) -> String {
    match owners {
        [] => "no package".to_string(),
        _ => format!("several packages: {}", owners.join(", ")),
    }
}
