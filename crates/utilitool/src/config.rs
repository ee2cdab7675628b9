//! Project configuration
//!
//! Locates `tsconfig.json` and `package.json` for a project directory and
//! expands the compiler configuration into the list of source files plus the
//! options module resolution needs.

use crate::path::{find_config_file, normalize, to_posix};
use crate::resolver::ResolutionOptions;
use glob::{MatchOptions, Pattern};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TSCONFIG_FILE: &str = "tsconfig.json";
pub const MANIFEST_FILE: &str = "package.json";

/// Directories never searched for sources
const PRUNED_DIRS: &[&str] = &["node_modules", "bower_components", "jspm_packages"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Errors that can occur while locating or reading project configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file in the directory or any ancestor
    #[error("Unable to find {file} from {}", .start.display())]
    NotFound { file: &'static str, start: PathBuf },

    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse \"{}\": {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid pattern \"{pattern}\" in {}: {message}", .path.display())]
    Pattern {
        path: PathBuf,
        pattern: String,
        message: String,
    },

    #[error("Missing raw tsconfig compilerOptions in {}", .path.display())]
    MissingCompilerOptions { path: PathBuf },
}

/// The configuration files governing a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub tsconfig_path: PathBuf,
    pub package_json_path: PathBuf,
}

impl ProjectConfig {
    /// Directory the project's files are laid out relative to
    pub fn project_dir(&self) -> &Path {
        self.tsconfig_path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Find the nearest `tsconfig.json` and `package.json`, each independently
pub fn locate(dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let package_json_path =
        find_config_file(dir, MANIFEST_FILE).ok_or_else(|| ConfigError::NotFound {
            file: MANIFEST_FILE,
            start: dir.to_path_buf(),
        })?;
    let tsconfig_path = find_config_file(dir, TSCONFIG_FILE).ok_or_else(|| ConfigError::NotFound {
        file: TSCONFIG_FILE,
        start: dir.to_path_buf(),
    })?;

    tracing::debug!(
        "using {} and {}",
        tsconfig_path.display(),
        package_json_path.display()
    );
    Ok(ProjectConfig {
        tsconfig_path,
        package_json_path,
    })
}

/// An expanded `tsconfig.json`
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub path: PathBuf,
    /// Absolute, normalized and sorted source files
    pub file_names: Vec<PathBuf>,
    pub options: ResolutionOptions,
    /// `compilerOptions` exactly as written
    pub raw_compiler_options: Option<Map<String, Value>>,
}

impl CompilerConfig {
    /// Read and expand the configuration at `path`. Files under any of
    /// `excluded_dirs` are left out of the file list.
    pub fn load(path: &Path, excluded_dirs: &[PathBuf]) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content, path, excluded_dirs)
    }

    /// Expand configuration `content` as if it were read from `path`
    pub fn from_str(
        content: &str,
        path: &Path,
        excluded_dirs: &[PathBuf],
    ) -> Result<Self, ConfigError> {
        let config = match parse_jsonc(content) {
            Ok(Value::Object(config)) => config,
            Ok(_) => {
                return Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: "expected a JSON object".to_string(),
                })
            }
            Err(e) => {
                return Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };

        let path = normalize(path);
        let config_dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        let raw_compiler_options = config
            .get("compilerOptions")
            .and_then(Value::as_object)
            .cloned();
        let options = resolution_options(raw_compiler_options.as_ref(), &config_dir);

        let mut excluded: Vec<PathBuf> = excluded_dirs.iter().map(|dir| normalize(dir)).collect();
        if let Some(out_dir) = raw_compiler_options
            .as_ref()
            .and_then(|options| options.get("outDir"))
            .and_then(Value::as_str)
        {
            excluded.push(normalize(&config_dir.join(out_dir)));
        }

        let files = string_list(&config, "files");
        let include = match string_list(&config, "include") {
            Some(include) => include,
            None if files.is_some() => Vec::new(),
            None => vec!["**/*".to_string()],
        };
        let exclude = string_list(&config, "exclude").unwrap_or_default();

        let walker = FileWalker {
            config_path: &path,
            config_dir: &config_dir,
            include: compile_specs(&include, &path, &config_dir)?,
            exclude: compile_specs(&exclude, &path, &config_dir)?,
            excluded_dirs: excluded,
            allow_js: options.allow_js,
        };

        let mut file_names: Vec<PathBuf> = files
            .unwrap_or_default()
            .iter()
            .map(|file| normalize(&config_dir.join(file)))
            .collect();
        walker.walk(&config_dir, &mut file_names);
        file_names.sort();
        file_names.dedup();

        tracing::debug!("{} source files listed by {}", file_names.len(), path.display());
        Ok(Self {
            path,
            file_names,
            options,
            raw_compiler_options,
        })
    }

    /// `compilerOptions`, required when emitting the shared configuration
    pub fn compiler_options(&self) -> Result<&Map<String, Value>, ConfigError> {
        self.raw_compiler_options
            .as_ref()
            .ok_or_else(|| ConfigError::MissingCompilerOptions {
                path: self.path.clone(),
            })
    }
}

fn string_list(config: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let list = config.get(key)?.as_array()?;
    Some(
        list.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

fn resolution_options(raw: Option<&Map<String, Value>>, config_dir: &Path) -> ResolutionOptions {
    let raw = match raw {
        Some(raw) => raw,
        None => return ResolutionOptions::default(),
    };
    let flag = |key: &str| raw.get(key).and_then(Value::as_bool).unwrap_or(false);

    let base_url = raw
        .get("baseUrl")
        .and_then(Value::as_str)
        .map(|base| normalize(&config_dir.join(base)));

    let paths: Vec<(String, Vec<String>)> = raw
        .get("paths")
        .and_then(Value::as_object)
        .map(|paths| {
            paths
                .iter()
                .map(|(pattern, targets)| {
                    let targets = targets
                        .as_array()
                        .map(|targets| {
                            targets
                                .iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default();
                    (pattern.clone(), targets)
                })
                .collect()
        })
        .unwrap_or_default();

    let paths_base = if paths.is_empty() {
        None
    } else {
        Some(base_url.clone().unwrap_or_else(|| config_dir.to_path_buf()))
    };

    ResolutionOptions {
        base_url,
        paths,
        paths_base,
        allow_js: flag("allowJs"),
        resolve_json_module: flag("resolveJsonModule"),
    }
}

/// Turn `include`/`exclude` entries into patterns relative to the config
/// directory. An entry without wildcards or extension names a directory.
fn compile_specs(
    specs: &[String],
    config_path: &Path,
    config_dir: &Path,
) -> Result<Vec<Pattern>, ConfigError> {
    let mut patterns = Vec::new();
    for spec in specs {
        let absolute = normalize(&config_dir.join(spec));
        let relative = match absolute.strip_prefix(config_dir) {
            Ok(relative) => to_posix(relative),
            // Outside the project, nothing can match
            Err(_) => continue,
        };

        let has_wildcard = relative.contains(['*', '?']);
        let is_directory = !has_wildcard && Path::new(&relative).extension().is_none();
        let sources = if relative.is_empty() {
            vec!["**/*".to_string()]
        } else if is_directory {
            let literal = Pattern::escape(&relative);
            vec![literal.clone(), format!("{}/**/*", literal)]
        } else {
            vec![relative]
        };

        for source in sources {
            let pattern = Pattern::new(&source).map_err(|e| ConfigError::Pattern {
                path: config_path.to_path_buf(),
                pattern: spec.clone(),
                message: e.msg.to_string(),
            })?;
            patterns.push(pattern);
        }
    }
    Ok(patterns)
}

struct FileWalker<'a> {
    config_path: &'a Path,
    config_dir: &'a Path,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    excluded_dirs: Vec<PathBuf>,
    allow_js: bool,
}

impl FileWalker<'_> {
    fn walk(&self, dir: &Path, out: &mut Vec<PathBuf>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("skipping unreadable directory {}: {}", dir.display(), e);
                return;
            }
        };

        let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
        paths.sort();

        for path in paths {
            let relative = match path.strip_prefix(self.config_dir) {
                Ok(relative) => to_posix(relative),
                Err(_) => continue,
            };
            if path.is_dir() {
                if self.is_pruned(&path, &relative) {
                    continue;
                }
                self.walk(&path, out);
            } else if self.is_source(&path)
                && self.matches(&self.include, &relative)
                && !self.matches(&self.exclude, &relative)
            {
                out.push(path);
            }
        }
    }

    fn is_pruned(&self, dir: &Path, relative: &str) -> bool {
        let name = dir.file_name().map(|name| name.to_string_lossy());
        if name.map_or(false, |name| PRUNED_DIRS.iter().any(|pruned| *pruned == name)) {
            return true;
        }
        if self.excluded_dirs.iter().any(|excluded| dir.starts_with(excluded)) {
            tracing::debug!("not searching {} for {}", dir.display(), self.config_path.display());
            return true;
        }
        self.matches(&self.exclude, relative)
    }

    fn is_source(&self, path: &Path) -> bool {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => return false,
        };
        if name.ends_with(".ts") || name.ends_with(".tsx") {
            return true;
        }
        self.allow_js && (name.ends_with(".js") || name.ends_with(".jsx"))
    }

    fn matches(&self, patterns: &[Pattern], relative: &str) -> bool {
        patterns
            .iter()
            .any(|pattern| pattern.matches_with(relative, MATCH_OPTIONS))
    }
}

/// Parse JSON that may contain `//` and `/* */` comments and trailing commas
pub fn parse_jsonc(content: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(&strip_trailing_commas(&strip_comments(content)))
}

/// Replace comments with whitespace, keeping line breaks so that parse errors
/// still point at the right line
fn strip_comments(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                    }
                    if previous == '*' && skipped == '/' {
                        break;
                    }
                    previous = skipped;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn strip_trailing_commas(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut out = String::with_capacity(content.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if !matches!(next, Some('}') | Some(']')) {
                out.push(c);
            }
        } else {
            out.push(c);
        }
        i += 1;
    }
    out
}
