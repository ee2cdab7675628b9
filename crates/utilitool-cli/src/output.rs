//! Colored terminal output for the CLI.
//!
//! Uses `termcolor` for cross-platform colored terminal output.
//! Respects `NO_COLOR` environment variable and `--color` flag.

use clap::ValueEnum;
use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use utilitool::RunReport;

/// `--color` flag values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Resolve `ColorChoice` from CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(mode: ColorMode) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match mode {
        ColorMode::Always => ColorChoice::Always,
        ColorMode::Never => ColorChoice::Never,
        ColorMode::Auto => ColorChoice::Auto,
    }
}

/// Styled output writer for terminal.
pub struct StyledOutput {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl StyledOutput {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }

    /// Write text with a specific color and style.
    fn write_styled(&mut self, text: &str, color: Option<Color>, bold: bool) {
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        let _ = self.stdout.set_color(&spec);
        let _ = write!(self.stdout, "{}", text);
        let _ = self.stdout.reset();
    }

    pub fn success(&mut self, text: &str) {
        self.write_styled(text, Some(Color::Green), true);
    }

    pub fn info(&mut self, text: &str) {
        self.write_styled(text, Some(Color::Cyan), false);
    }

    pub fn bold(&mut self, text: &str) {
        self.write_styled(text, None, true);
    }

    pub fn plain(&mut self, text: &str) {
        let _ = write!(self.stdout, "{}", text);
    }

    pub fn newline(&mut self) {
        let _ = writeln!(self.stdout);
    }

    pub fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    /// Banner printed before a run
    pub fn intro(&mut self) {
        self.bold("utilitool");
        self.info(&format!(" v{}", env!("CARGO_PKG_VERSION")));
        self.newline();
        self.newline();
        self.flush();
    }

    /// One line per generated package
    pub fn summary(&mut self, report: &RunReport) {
        self.newline();
        for package in &report.packages {
            self.success("  ✓ ");
            self.bold(&package.name);
            self.plain(&format!(
                "  {} file{}, {} dependenc{}",
                package.files.len(),
                if package.files.len() == 1 { "" } else { "s" },
                package.dependencies.len(),
                if package.dependencies.len() == 1 { "y" } else { "ies" },
            ));
            self.newline();
        }
        self.newline();
        self.plain(&format!(
            "{} package{} written to ",
            report.packages.len(),
            if report.packages.len() == 1 { "" } else { "s" }
        ));
        self.info(&report.out_dir.display().to_string());
        self.newline();
        self.flush();
    }

    /// Error and its causes to stderr, in red.
    pub fn error_chain(&mut self, error: &anyhow::Error) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Red)).set_bold(true);
        let _ = self.stderr.set_color(&spec);
        let _ = write!(self.stderr, "error:");
        let _ = self.stderr.reset();
        let _ = writeln!(self.stderr, " {}", error);
        for cause in error.chain().skip(1) {
            let _ = writeln!(self.stderr, "  caused by: {}", cause);
        }
        let _ = self.stderr.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_mode() {
        assert_eq!(resolve_color_choice(ColorMode::Never), ColorChoice::Never);
    }
}
