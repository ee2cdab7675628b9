//! utilitool command-line interface
//!
//! Splits the TypeScript project found at `--project` into one npm package
//! per source file name and optionally builds them.

mod output;

use anyhow::Context;
use clap::Parser;
use output::{resolve_color_choice, ColorMode, StyledOutput};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use utilitool::options::{DEFAULT_BUILD_COMMAND, DEFAULT_OUT_DIR};
use utilitool::{parse_version, LogLevel, UtilitoolError, UtilitoolOptions, Version, VersionBump};

#[derive(Parser)]
#[command(name = "utilitool")]
#[command(about = "Split a TypeScript project into per-file npm packages", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory of the project
    #[arg(short, long, default_value = ".")]
    project: PathBuf,

    /// Output directory, relative to the project
    #[arg(short, long, default_value = DEFAULT_OUT_DIR)]
    out_dir: PathBuf,

    /// debug, verbose, warn, error or silent
    #[arg(long, value_enum, default_value_t = LogLevel::Verbose)]
    log_level: LogLevel,

    /// Skip building the generated packages
    #[arg(long)]
    no_build: bool,

    /// Keep the existing output directory
    #[arg(long)]
    no_clean: bool,

    /// Don't copy the project's license into the packages
    #[arg(long)]
    no_license: bool,

    /// Command run inside the output directory after emission
    #[arg(long, default_value = DEFAULT_BUILD_COMMAND)]
    build_command: String,

    /// Bump the version before deriving packages (major, minor or patch)
    #[arg(long, conflicts_with = "set_version")]
    bump: Option<VersionBump>,

    /// Use this version instead of the one in package.json
    #[arg(long, value_parser = parse_version)]
    set_version: Option<Version>,

    /// When to use colors
    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    color: ColorMode,

    /// Don't print the intro banner
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn options(&self) -> UtilitoolOptions {
        let bump = match (&self.bump, &self.set_version) {
            (_, Some(version)) => Some(VersionBump::Set(version.clone())),
            (Some(bump), None) => Some(bump.clone()),
            (None, None) => None,
        };
        UtilitoolOptions {
            project: self.project.clone(),
            out_dir: self.out_dir.clone(),
            log_level: self.log_level,
            build: !self.no_build,
            clean: !self.no_clean,
            build_command: self.build_command.clone(),
            copy_license: !self.no_license,
            bump,
        }
    }
}

/// Install the log subscriber. `RUST_LOG` overrides `--log-level`.
fn init_logging(level: LogLevel, color: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(color)
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();
    let choice = resolve_color_choice(cli.color);
    let mut out = StyledOutput::new(choice);
    init_logging(cli.log_level, choice != termcolor::ColorChoice::Never);

    if !cli.quiet && cli.log_level != LogLevel::Silent {
        out.intro();
    }

    let options = cli.options();
    match run(&options) {
        Ok(report) => {
            if options.log_level != LogLevel::Silent {
                out.summary(&report);
            }
        }
        Err(error) => {
            let code = error
                .downcast_ref::<UtilitoolError>()
                .map_or(1, UtilitoolError::exit_code);
            out.error_chain(&error);
            std::process::exit(code);
        }
    }
}

fn run(options: &UtilitoolOptions) -> anyhow::Result<utilitool::RunReport> {
    let report = utilitool::utilitool(options)
        .with_context(|| format!("utilitool failed for {}", options.project.display()))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["utilitool"]);
        let options = cli.options();
        assert_eq!(options.project, PathBuf::from("."));
        assert_eq!(options.out_dir, PathBuf::from("utilitool-packages"));
        assert_eq!(options.log_level, LogLevel::Verbose);
        assert!(options.build && options.clean && options.copy_license);
        assert_eq!(options.build_command, "tsc");
        assert!(options.bump.is_none());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "utilitool",
            "-p",
            "/work/utils",
            "--out-dir",
            "packages",
            "--log-level",
            "debug",
            "--no-build",
            "--no-clean",
            "--no-license",
            "--bump",
            "minor",
        ]);
        let options = cli.options();
        assert_eq!(options.project, PathBuf::from("/work/utils"));
        assert_eq!(options.out_dir, PathBuf::from("packages"));
        assert_eq!(options.log_level, LogLevel::Debug);
        assert!(!options.build && !options.clean && !options.copy_license);
        assert_eq!(options.bump, Some(VersionBump::Minor));
    }

    #[test]
    fn test_set_version() {
        let cli = Cli::parse_from(["utilitool", "--set-version", "3.0.0-beta.1"]);
        let version = parse_version("3.0.0-beta.1").unwrap();
        assert_eq!(cli.options().bump, Some(VersionBump::Set(version)));
    }

    #[test]
    fn test_bump_conflicts_with_set_version() {
        assert!(Cli::try_parse_from(["utilitool", "--bump", "major", "--set-version", "1.0.0"]).is_err());
        assert!(Cli::try_parse_from(["utilitool", "--bump", "huge"]).is_err());
        assert!(Cli::try_parse_from(["utilitool", "--log-level", "loud"]).is_err());
    }
}
