//! Generated package artifacts
//!
//! Builds the aggregate entry point and manifest of each package, and the
//! `tsconfig.json` shared by all of them.

use crate::compiler_options::COMPILER_OPTIONS_COPY_LIST;
use crate::error::UtilitoolError;
use crate::manifest::{PackageManifest, RootManifest};
use crate::naming::file_stem;
use crate::partition::{DependencyRef, Package, Partition};
use crate::path::to_posix;
use indexmap::IndexSet;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of each package's aggregate entry point
pub const ENTRY_FILE: &str = "index.ts";

/// Version pinned for internal dependencies when the root manifest has none
pub const PLACEHOLDER_VERSION: &str = "0.0.0";

/// Path of `file` relative to `project_dir`
pub fn project_relative(file: &Path, project_dir: &Path) -> Result<PathBuf, UtilitoolError> {
    file.strip_prefix(project_dir)
        .map(Path::to_path_buf)
        .map_err(|_| UtilitoolError::OutsideProject {
            path: file.to_path_buf(),
            project: project_dir.to_path_buf(),
        })
}

/// Reject packages owning a root file the entry point would overwrite or
/// shadow: any `index.*` next to the generated `index.ts`
pub fn check_reserved_paths(package: &Package, project_dir: &Path) -> Result<(), UtilitoolError> {
    let entry_stem = file_stem(Path::new(ENTRY_FILE));
    for file in &package.files {
        let relative = project_relative(file, project_dir)?;
        let at_root = relative
            .parent()
            .map_or(true, |parent| parent.as_os_str().is_empty());
        if at_root && file_stem(&relative) == entry_stem {
            return Err(UtilitoolError::ReservedPath {
                package: package.name.clone(),
                path: file.clone(),
            });
        }
    }
    Ok(())
}

/// Entry point re-exporting every file of `package`, in ownership order.
///
/// A declaration file next to its implementation maps to the same module and
/// is exported once.
pub fn aggregate_entry(package: &Package, project_dir: &Path) -> Result<String, UtilitoolError> {
    let mut lines = IndexSet::new();
    for file in &package.files {
        let relative = project_relative(file, project_dir)?;
        let module = relative.with_file_name(file_stem(&relative));
        lines.insert(format!("export * from \"./{}\"\n", to_posix(&module)));
    }
    Ok(lines.into_iter().collect())
}

/// Version string written for each recorded dependency.
///
/// Installed packages use the range the root manifest declares for them, or
/// a caret range of the installed version. Sibling packages are pinned to
/// `internal_version`.
pub fn resolve_dependency_versions(
    package: &Package,
    root: &RootManifest,
    internal_version: &str,
) -> BTreeMap<String, String> {
    package
        .dependencies
        .iter()
        .map(|(name, dependency)| {
            let version = match dependency {
                DependencyRef::External { version } => root
                    .declared_range(name)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("^{}", version)),
                DependencyRef::Internal => internal_version.to_string(),
            };
            (name.clone(), version)
        })
        .collect()
}

/// Version shared by all generated packages
pub fn internal_version(root: &RootManifest) -> &str {
    root.version().unwrap_or(PLACEHOLDER_VERSION)
}

pub fn package_manifest(package: &Package, root: &RootManifest) -> PackageManifest {
    let dependencies = resolve_dependency_versions(package, root, internal_version(root));
    PackageManifest::derive(&package.name, dependencies, root)
}

/// `tsconfig.json` for the output directory: every package mapped to its
/// entry point, plus the portable subset of the project's compiler options
pub fn shared_tsconfig(partition: &Partition, compiler_options: &Map<String, Value>) -> Value {
    let mut paths = Map::new();
    for package in partition.packages() {
        paths.insert(
            package.name.clone(),
            json!([format!("./{}/{}", package.name, ENTRY_FILE)]),
        );
    }

    let mut options = Map::new();
    options.insert("baseUrl".to_string(), json!("./"));
    options.insert("paths".to_string(), Value::Object(paths));
    for key in COMPILER_OPTIONS_COPY_LIST {
        if let Some(value) = compiler_options.get(*key).filter(|value| !value.is_null()) {
            options.insert(key.to_string(), value.clone());
        }
    }

    json!({ "compilerOptions": options })
}

/// Serialize with 4-space indentation and a trailing newline
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    // serde_json only emits UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::PackageNamer;

    fn root(json: &str) -> RootManifest {
        RootManifest::from_str(json, "/p/package.json").unwrap()
    }

    #[test]
    fn test_aggregate_entry() {
        let files: Vec<PathBuf> = ["/p/src/format.ts", "/p/lib/format.d.ts", "/p/format.tsx"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let partition = Partition::build(&files, &PackageNamer::new("utils"), "/out").unwrap();

        let entry = aggregate_entry(partition.package(0), Path::new("/p")).unwrap();
        assert_eq!(
            entry,
            "export * from \"./src/format\"\nexport * from \"./lib/format\"\nexport * from \"./format\"\n"
        );
    }

    #[test]
    fn test_file_outside_project() {
        let files = vec![PathBuf::from("/elsewhere/a.ts")];
        let partition = Partition::build(&files, &PackageNamer::new("utils"), "/out").unwrap();
        let err = aggregate_entry(partition.package(0), Path::new("/p")).unwrap_err();
        assert!(matches!(err, UtilitoolError::OutsideProject { .. }));
    }

    #[test]
    fn test_reserved_entry_path() {
        let files = vec![PathBuf::from("/p/index.ts"), PathBuf::from("/p/lib/index.ts")];
        let partition = Partition::build(&files, &PackageNamer::new("utils"), "/out").unwrap();
        let err = check_reserved_paths(partition.package(0), Path::new("/p")).unwrap_err();
        assert!(matches!(err, UtilitoolError::ReservedPath { .. }));

        let nested = vec![PathBuf::from("/p/lib/index.ts")];
        let partition = Partition::build(&nested, &PackageNamer::new("utils"), "/out").unwrap();
        assert!(check_reserved_paths(partition.package(0), Path::new("/p")).is_ok());

        for name in ["index.tsx", "index.d.ts", "index.js"] {
            let files = vec![PathBuf::from("/p").join(name)];
            let partition = Partition::build(&files, &PackageNamer::new("utils"), "/out").unwrap();
            let err = check_reserved_paths(partition.package(0), Path::new("/p")).unwrap_err();
            assert!(
                matches!(err, UtilitoolError::ReservedPath { ref path, .. } if path == &files[0]),
                "{name} should be reserved"
            );
        }
    }

    #[test]
    fn test_aggregate_entry_skips_duplicate_modules() {
        let files: Vec<PathBuf> = ["/p/src/format.ts", "/p/src/format.d.ts", "/p/format.ts"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let partition = Partition::build(&files, &PackageNamer::new("utils"), "/out").unwrap();

        let entry = aggregate_entry(partition.package(0), Path::new("/p")).unwrap();
        assert_eq!(entry, "export * from \"./src/format\"\nexport * from \"./format\"\n");
    }

    #[test]
    fn test_dependency_versions() {
        let mut partition = Partition::new("/out");
        let id = partition.assign(Path::new("/p/a.ts"), "utils-a");
        let package = partition.package_mut(id);
        package
            .record_dependency("lodash", DependencyRef::External { version: "4.17.21".into() })
            .unwrap();
        package
            .record_dependency("chalk", DependencyRef::External { version: "5.3.0".into() })
            .unwrap();
        package.record_dependency("utils-b", DependencyRef::Internal).unwrap();

        let root = root(r#"{ "name": "utils", "version": "1.2.0", "dependencies": { "lodash": "^4.17.0" } }"#);
        let versions = resolve_dependency_versions(partition.package(id), &root, internal_version(&root));

        let expected: BTreeMap<String, String> = [
            ("chalk", "^5.3.0"),
            ("lodash", "^4.17.0"),
            ("utils-b", "1.2.0"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(versions, expected);
    }

    #[test]
    fn test_internal_version_placeholder() {
        assert_eq!(internal_version(&root(r#"{ "name": "utils" }"#)), "0.0.0");
    }

    #[test]
    fn test_shared_tsconfig() {
        let files = vec![PathBuf::from("/p/doit.ts"), PathBuf::from("/p/dothat.ts")];
        let partition = Partition::build(&files, &PackageNamer::new("utils"), "/out").unwrap();
        let compiler_options = serde_json::from_str::<Map<String, Value>>(
            r#"{ "outDir": "dist", "strict": true, "target": "es2019", "baseUrl": "src", "sourceMap": null }"#,
        )
        .unwrap();

        let tsconfig = shared_tsconfig(&partition, &compiler_options);
        let options = tsconfig["compilerOptions"].as_object().unwrap();
        let keys: Vec<&String> = options.keys().collect();
        assert_eq!(keys, vec!["baseUrl", "paths", "strict", "target"]);
        assert_eq!(options["baseUrl"], "./");
        assert_eq!(options["paths"]["utils-doit"][0], "./utils-doit/index.ts");
        assert_eq!(options["paths"]["utils-dothat"][0], "./utils-dothat/index.ts");
    }

    #[test]
    fn test_pretty_json() {
        let value = json!({ "name": "utils-doit", "dependencies": {} });
        assert_eq!(
            to_pretty_json(&value).unwrap(),
            "{\n    \"name\": \"utils-doit\",\n    \"dependencies\": {}\n}\n"
        );
    }
}
