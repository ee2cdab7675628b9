//! Run options

use crate::version::VersionBump;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default output directory, relative to the project
pub const DEFAULT_OUT_DIR: &str = "utilitool-packages";

/// Default build command, run inside the output directory
pub const DEFAULT_BUILD_COMMAND: &str = "tsc";

/// How much a run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    #[default]
    Verbose,
    Warn,
    Error,
    Silent,
}

impl LogLevel {
    /// Equivalent `tracing` filter directive
    pub fn filter_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Silent => "off",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "verbose" | "info" => Ok(LogLevel::Verbose),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "silent" => Ok(LogLevel::Silent),
            other => Err(format!(
                "Invalid log level: {}. Expected debug, verbose, warn, error or silent",
                other
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "verbose",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Silent => "silent",
        };
        f.write_str(name)
    }
}

/// Everything a run needs besides the project itself
#[derive(Debug, Clone, PartialEq)]
pub struct UtilitoolOptions {
    /// Directory to start looking for `tsconfig.json` and `package.json`
    pub project: PathBuf,
    /// Output directory, relative to the project directory unless absolute
    pub out_dir: PathBuf,
    pub log_level: LogLevel,
    /// Run `build_command` over the generated packages
    pub build: bool,
    /// Remove the output directory before writing
    pub clean: bool,
    pub build_command: String,
    /// Copy the project's license file into every package
    pub copy_license: bool,
    /// Version change applied to the root manifest in memory
    pub bump: Option<VersionBump>,
}

impl Default for UtilitoolOptions {
    fn default() -> Self {
        Self {
            project: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            log_level: LogLevel::default(),
            build: true,
            clean: true,
            build_command: DEFAULT_BUILD_COMMAND.to_string(),
            copy_license: true,
            bump: None,
        }
    }
}

impl UtilitoolOptions {
    /// Defaults for `project`
    pub fn for_project(project: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            ..Self::default()
        }
    }
}
