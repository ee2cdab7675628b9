//! Module resolution
//!
//! Classifies each specifier as an installed dependency, a project file, or
//! unresolved. The lookup itself sits behind [`ModuleResolver`] so callers can
//! plug in another resolution algorithm; [`NodeModuleResolver`] follows the
//! node/TypeScript rules (relative files, `paths`, `baseUrl`, `node_modules`).

use crate::path::{in_node_modules, normalize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Settings taken from `compilerOptions` that affect resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionOptions {
    /// Absolute `baseUrl`, if configured
    pub base_url: Option<PathBuf>,
    /// `paths` patterns in declaration order
    pub paths: Vec<(String, Vec<String>)>,
    /// Directory that `paths` substitutions are relative to
    pub paths_base: Option<PathBuf>,
    pub allow_js: bool,
    pub resolve_json_module: bool,
}

/// Identity of an installed package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageId {
    pub name: String,
    pub sub_module_name: String,
    pub version: String,
}

/// Raw answer from a module resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub resolved_file_name: PathBuf,
    pub is_external_library_import: bool,
    pub package_id: Option<PackageId>,
}

/// Resolution algorithm used to look up specifiers
pub trait ModuleResolver {
    fn resolve_module(
        &self,
        specifier: &str,
        containing_file: &Path,
        options: &ResolutionOptions,
    ) -> Option<ResolvedModule>;
}

/// Classification of one specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
    /// Satisfied by an installed dependency
    External { package_name: String, version: String },
    /// Points at a file, normalized to match partition keys
    Internal { resolved_path: PathBuf },
    Unresolved,
}

/// Resolve `specifier` from `from_file` and classify the answer
pub fn resolve(
    resolver: &dyn ModuleResolver,
    specifier: &str,
    from_file: &Path,
    options: &ResolutionOptions,
) -> ResolutionResult {
    match resolver.resolve_module(specifier, from_file, options) {
        Some(ResolvedModule {
            is_external_library_import: true,
            package_id: Some(package_id),
            ..
        }) => ResolutionResult::External {
            package_name: package_id.name,
            version: package_id.version,
        },
        Some(resolved) => ResolutionResult::Internal {
            resolved_path: normalize(&resolved.resolved_file_name),
        },
        None => ResolutionResult::Unresolved,
    }
}

const TS_EXTENSIONS: &[&str] = &["ts", "tsx", "d.ts"];
const JS_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs"];

/// Node-style resolver working against the real filesystem
#[derive(Debug, Clone, Default)]
pub struct NodeModuleResolver;

impl NodeModuleResolver {
    pub fn new() -> Self {
        Self
    }

    fn extensions(options: &ResolutionOptions, external: bool) -> Vec<&'static str> {
        let mut extensions = TS_EXTENSIONS.to_vec();
        // Installed packages without typings still resolve to their JavaScript
        if options.allow_js || external {
            extensions.extend_from_slice(JS_EXTENSIONS);
        }
        extensions
    }

    /// Try `path` as a file: with an implied extension, with `.js` swapped
    /// for its TypeScript source, or as written
    fn try_file(&self, path: &Path, options: &ResolutionOptions, external: bool) -> Option<PathBuf> {
        let extensions = Self::extensions(options, external);
        let file_name = path.file_name()?.to_string_lossy().into_owned();

        for ext in &extensions {
            let candidate = path.with_file_name(format!("{}.{}", file_name, ext));
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if let Some((stem, ext)) = file_name.rsplit_once('.') {
            let sources: &[&str] = match ext {
                "js" => &["ts", "tsx", "d.ts"],
                "jsx" => &["tsx", "d.ts"],
                "mjs" => &["mts", "d.mts"],
                "cjs" => &["cts", "d.cts"],
                _ => &[],
            };
            for source in sources {
                let candidate = path.with_file_name(format!("{}.{}", stem, source));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }

            let explicit = extensions.iter().any(|known| *known == ext)
                || matches!(ext, "mts" | "cts")
                || (ext == "json" && options.resolve_json_module);
            if explicit && path.is_file() {
                return Some(path.to_path_buf());
            }
        }

        None
    }

    /// Try `path` as a directory: manifest entry fields, then `index`
    fn try_directory(&self, path: &Path, options: &ResolutionOptions, external: bool) -> Option<PathBuf> {
        if !path.is_dir() {
            return None;
        }

        if let Some(manifest) = read_package_json(&path.join("package.json")) {
            for field in ["types", "typings", "main"] {
                if let Some(entry) = manifest.get(field).and_then(Value::as_str) {
                    let entry_path = normalize(&path.join(entry));
                    if let Some(resolved) = self.try_file(&entry_path, options, external) {
                        return Some(resolved);
                    }
                    if entry_path.is_file() {
                        return Some(entry_path);
                    }
                    if let Some(resolved) = self.try_index(&entry_path, options, external) {
                        return Some(resolved);
                    }
                }
            }
        }

        self.try_index(path, options, external)
    }

    fn try_index(&self, dir: &Path, options: &ResolutionOptions, external: bool) -> Option<PathBuf> {
        if dir.is_dir() {
            self.try_file(&dir.join("index"), options, external)
        } else {
            None
        }
    }

    fn try_file_or_directory(&self, path: &Path, options: &ResolutionOptions, external: bool) -> Option<PathBuf> {
        self.try_file(path, options, external)
            .or_else(|| self.try_directory(path, options, external))
    }

    /// Apply `paths` patterns; the pattern with the longest prefix wins
    fn try_path_mappings(&self, specifier: &str, options: &ResolutionOptions) -> Option<PathBuf> {
        let base = options.paths_base.as_ref().or(options.base_url.as_ref())?;

        let mut best: Option<(usize, &str, &[String])> = None;
        for (pattern, substitutions) in &options.paths {
            let matched = match pattern.split_once('*') {
                Some((prefix, suffix)) => specifier.len() >= prefix.len() + suffix.len()
                    && specifier.starts_with(prefix)
                    && specifier.ends_with(suffix),
                None => pattern == specifier,
            };
            if !matched {
                continue;
            }
            let prefix_len = pattern.find('*').unwrap_or(pattern.len());
            if best.map_or(true, |(len, _, _)| prefix_len > len) {
                best = Some((prefix_len, pattern.as_str(), substitutions.as_slice()));
            }
        }

        let (_, pattern, substitutions) = best?;
        let captured = match pattern.split_once('*') {
            Some((prefix, suffix)) => &specifier[prefix.len()..specifier.len() - suffix.len()],
            None => "",
        };

        substitutions.iter().find_map(|substitution| {
            let target = substitution.replacen('*', captured, 1);
            let candidate = normalize(&base.join(target));
            self.try_file_or_directory(&candidate, options, false)
        })
    }

    fn resolve_bare_specifier(
        &self,
        specifier: &str,
        containing_dir: &Path,
        options: &ResolutionOptions,
    ) -> Option<ResolvedModule> {
        let (package_name, subpath) = parse_package_specifier(specifier);

        for dir in containing_dir.ancestors() {
            let node_modules = dir.join("node_modules");
            if !node_modules.is_dir() {
                continue;
            }

            let candidates = [package_name.clone(), types_package_name(&package_name)];
            for candidate in candidates.iter() {
                let package_dir = node_modules.join(candidate);
                if !package_dir.is_dir() {
                    continue;
                }
                let resolved = match subpath {
                    Some(ref subpath) => {
                        self.try_file_or_directory(&package_dir.join(subpath), options, true)
                    }
                    None => self.try_directory(&package_dir, options, true),
                };
                if let Some(resolved_file_name) = resolved {
                    let package_id =
                        package_identity(&package_dir, &resolved_file_name);
                    return Some(ResolvedModule {
                        resolved_file_name,
                        is_external_library_import: true,
                        package_id,
                    });
                }
            }

            // node_modules/<name>.d.ts and friends
            if subpath.is_none() {
                if let Some(resolved_file_name) =
                    self.try_file(&node_modules.join(&package_name), options, true)
                {
                    return Some(ResolvedModule {
                        resolved_file_name,
                        is_external_library_import: true,
                        package_id: None,
                    });
                }
            }
        }

        None
    }
}

impl ModuleResolver for NodeModuleResolver {
    fn resolve_module(
        &self,
        specifier: &str,
        containing_file: &Path,
        options: &ResolutionOptions,
    ) -> Option<ResolvedModule> {
        let containing_dir = containing_file.parent()?;

        if is_relative(specifier) || Path::new(specifier).is_absolute() {
            let candidate = normalize(&containing_dir.join(specifier));
            let external = in_node_modules(&candidate);
            return self
                .try_file_or_directory(&candidate, options, external)
                .map(|resolved_file_name| ResolvedModule {
                    resolved_file_name,
                    is_external_library_import: false,
                    package_id: None,
                });
        }

        let mapped = self.try_path_mappings(specifier, options).or_else(|| {
            let base_url = options.base_url.as_ref()?;
            self.try_file_or_directory(&normalize(&base_url.join(specifier)), options, false)
        });
        if let Some(resolved_file_name) = mapped {
            return Some(ResolvedModule {
                resolved_file_name,
                is_external_library_import: false,
                package_id: None,
            });
        }

        self.resolve_bare_specifier(specifier, containing_dir, options)
    }
}

/// `./x`, `../x`, `.` and `..`
pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Split `@scope/name/sub/path` or `name/sub/path` into package name and subpath
pub fn parse_package_specifier(specifier: &str) -> (String, Option<String>) {
    let name_segments = if specifier.starts_with('@') { 2 } else { 1 };
    let mut parts = specifier.splitn(name_segments + 1, '/');
    let name: Vec<&str> = parts.by_ref().take(name_segments).collect();
    let subpath = parts.next().filter(|rest| !rest.is_empty());
    (name.join("/"), subpath.map(str::to_string))
}

/// `foo` → `@types/foo`, `@scope/foo` → `@types/scope__foo`
fn types_package_name(package_name: &str) -> String {
    match package_name.strip_prefix('@') {
        Some(scoped) => format!("@types/{}", scoped.replacen('/', "__", 1)),
        None => format!("@types/{}", package_name),
    }
}

fn read_package_json(path: &Path) -> Option<serde_json::Map<String, Value>> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(Value::Object(map)) => Some(map),
        _ => {
            tracing::debug!("ignoring unreadable package manifest {}", path.display());
            None
        }
    }
}

/// Name and version from the installed package's manifest, when both exist
fn package_identity(package_dir: &Path, resolved_file_name: &Path) -> Option<PackageId> {
    let manifest = read_package_json(&package_dir.join("package.json"))?;
    let name = manifest.get("name")?.as_str()?.to_string();
    let version = manifest.get("version")?.as_str()?.to_string();
    let sub_module_name = resolved_file_name
        .strip_prefix(package_dir)
        .map(crate::path::to_posix)
        .unwrap_or_default();
    Some(PackageId {
        name,
        sub_module_name,
        version,
    })
}
