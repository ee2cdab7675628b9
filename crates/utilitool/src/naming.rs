//! Package naming
//!
//! Every source file maps to a package named `<root-name>-<file-stem>`. Names
//! are checked against the npm rules for new packages.

use std::path::Path;
use thiserror::Error;

/// Maximum length of a package name accepted by the registry
pub const MAX_NAME_LENGTH: usize = 214;

const BLACKLIST: &[&str] = &["node_modules", "favicon.ico"];

const SPECIAL_CHARACTERS: &[char] = &['~', '\'', '!', '(', ')', '*'];

/// Node.js builtin modules; new packages may not shadow them
const CORE_MODULES: &[&str] = &[
    "assert", "async_hooks", "buffer", "child_process", "cluster", "console", "constants",
    "crypto", "dgram", "diagnostics_channel", "dns", "domain", "events", "fs", "http", "http2",
    "https", "inspector", "module", "net", "os", "path", "perf_hooks", "process", "punycode",
    "querystring", "readline", "repl", "stream", "string_decoder", "sys", "timers", "tls",
    "trace_events", "tty", "url", "util", "v8", "vm", "wasi", "worker_threads", "zlib",
];

/// A derived package name failed validation
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid package name \"{name}\" derived from {file}:\n{}", .messages.join("\n"))]
pub struct NamingError {
    pub name: String,
    pub file: String,
    pub messages: Vec<String>,
}

/// Outcome of checking a name against the registry rules
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NameValidation {
    /// Problems that make the name unusable anywhere
    pub errors: Vec<String>,
    /// Problems that only forbid the name for newly published packages
    pub warnings: Vec<String>,
}

impl NameValidation {
    pub fn valid_for_new_packages(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    fn into_messages(self) -> Vec<String> {
        self.errors.into_iter().chain(self.warnings).collect()
    }
}

/// Check `name` against the npm package naming rules
pub fn validate_package_name(name: &str) -> NameValidation {
    let mut result = NameValidation::default();

    if name.is_empty() {
        result
            .errors
            .push("name length must be greater than zero".to_string());
        return result;
    }
    if name.starts_with('.') {
        result.errors.push("name cannot start with a period".to_string());
    }
    if name.starts_with('_') {
        result
            .errors
            .push("name cannot start with an underscore".to_string());
    }
    if name.trim() != name {
        result
            .errors
            .push("name cannot contain leading or trailing spaces".to_string());
    }
    for blacklisted in BLACKLIST {
        if name.eq_ignore_ascii_case(blacklisted) {
            result
                .errors
                .push(format!("{} is a blacklisted name", blacklisted));
        }
    }

    let lowercase = name.to_ascii_lowercase();
    if CORE_MODULES.iter().any(|core| *core == lowercase) {
        result
            .warnings
            .push(format!("{} is a core module name", name));
    }
    if name.len() > MAX_NAME_LENGTH {
        result.warnings.push(format!(
            "name can no longer contain more than {} characters",
            MAX_NAME_LENGTH
        ));
    }
    if name.to_lowercase() != name {
        result
            .warnings
            .push("name can no longer contain capital letters".to_string());
    }
    let last_segment = name.rsplit('/').next().unwrap_or(name);
    if last_segment.contains(SPECIAL_CHARACTERS) {
        result.warnings.push(
            "name can no longer contain special characters (\"~'!()*\")".to_string(),
        );
    }

    if !is_url_friendly(name) {
        let scoped_ok = name
            .strip_prefix('@')
            .and_then(|rest| rest.split_once('/'))
            .map_or(false, |(scope, package)| {
                is_url_friendly(scope) && is_url_friendly(package)
            });
        if !scoped_ok {
            result
                .errors
                .push("name can only contain URL-friendly characters".to_string());
        }
    }

    result
}

/// Characters left untouched by percent-encoding a URI component
fn is_url_friendly(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, '-' | '_' | '.' | '!' | '~' | '*' | '\'' | '(' | ')')
        })
}

/// File name without directory and extension. Declaration files lose the
/// whole `.d.ts` suffix so that `a.d.ts` and `a.ts` share a stem.
pub fn file_stem(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    for declaration in [".d.ts", ".d.mts", ".d.cts"] {
        if let Some(stem) = file_name.strip_suffix(declaration) {
            return stem.to_string();
        }
    }
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => file_name[..dot].to_string(),
        _ => file_name,
    }
}

/// Derives package names from file paths
#[derive(Debug, Clone)]
pub struct PackageNamer {
    root_name: String,
}

impl PackageNamer {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
        }
    }

    /// Name of the package that owns `file_path`
    pub fn name(&self, file_path: &Path) -> Result<String, NamingError> {
        package_name(file_path, &self.root_name)
    }
}

/// Derive `<root_name>-<stem>` for `file_path`, validating both the stem and
/// the full name
pub fn package_name(file_path: &Path, root_name: &str) -> Result<String, NamingError> {
    let stem = file_stem(file_path);
    let full_name = format!("{}-{}", root_name, stem);

    let mut messages = Vec::new();
    let stem_check = validate_package_name(&stem);
    if !stem_check.valid_for_new_packages() {
        messages.extend(stem_check.into_messages());
    }
    let full_check = validate_package_name(&full_name);
    if !full_check.valid_for_new_packages() {
        for message in full_check.into_messages() {
            if !messages.contains(&message) {
                messages.push(message);
            }
        }
    }

    if messages.is_empty() {
        Ok(full_name)
    } else {
        Err(NamingError {
            name: full_name,
            file: file_path.display().to_string(),
            messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_name_from_file() {
        let name = package_name(Path::new("/project/src/doit.ts"), "utils").unwrap();
        assert_eq!(name, "utils-doit");
    }

    #[test]
    fn test_name_is_idempotent() {
        let path = PathBuf::from("/project/src/format-date.tsx");
        let namer = PackageNamer::new("utils");
        assert_eq!(namer.name(&path).unwrap(), namer.name(&path).unwrap());
        assert_eq!(namer.name(&path).unwrap(), "utils-format-date");
    }

    #[test]
    fn test_scoped_root() {
        let name = package_name(Path::new("a/b/parse.ts"), "@acme/utils").unwrap();
        assert_eq!(name, "@acme/utils-parse");
    }

    #[test]
    fn test_declaration_file_stem() {
        assert_eq!(file_stem(Path::new("src/types.d.ts")), "types");
        assert_eq!(file_stem(Path::new("src/a.b.ts")), "a.b");
        assert_eq!(file_stem(Path::new("src/.hidden")), ".hidden");
    }

    #[test]
    fn test_capital_letters_rejected() {
        let err = package_name(Path::new("src/DoIt.ts"), "utils").unwrap_err();
        assert_eq!(err.name, "utils-DoIt");
        assert_eq!(
            err.messages,
            vec!["name can no longer contain capital letters".to_string()]
        );
    }

    #[test]
    fn test_leading_period_rejected() {
        let err = package_name(Path::new("src/.config.ts"), "utils").unwrap_err();
        assert!(err
            .messages
            .contains(&"name cannot start with a period".to_string()));
    }

    #[test]
    fn test_validate_rules() {
        assert!(validate_package_name("some-package").valid_for_new_packages());
        assert!(validate_package_name("@scope/pkg").valid_for_new_packages());
        assert!(!validate_package_name("").valid_for_new_packages());
        assert!(!validate_package_name("_private").valid_for_new_packages());
        assert!(!validate_package_name("node_modules").valid_for_new_packages());
        assert!(!validate_package_name("fs").valid_for_new_packages());
        assert!(!validate_package_name("with space").valid_for_new_packages());
        assert!(!validate_package_name("crazy!").valid_for_new_packages());
        assert!(!validate_package_name(&"a".repeat(215)).valid_for_new_packages());
        assert!(validate_package_name(&"a".repeat(214)).valid_for_new_packages());
    }

    #[test]
    fn test_error_message_lists_reasons() {
        let err = package_name(Path::new("src/Bad Name.ts"), "utils").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("utils-Bad Name"));
        assert!(message.contains("URL-friendly"));
        assert!(message.contains("capital letters"));
    }
}
