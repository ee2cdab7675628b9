//! Integration tests for cross-reference rewriting with an in-memory resolver

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use utilitool::assemble::{internal_version, resolve_dependency_versions};
use utilitool::resolver::PackageId as InstalledPackage;
use utilitool::{
    rewrite_file, DependencyRef, ModuleResolver, PackageNamer, Partition, ResolutionOptions,
    ResolvedModule, RootManifest, SourceFile, UtilitoolError,
};

/// Answers lookups from a fixed table keyed by (containing file, specifier)
#[derive(Default)]
struct InMemoryResolver {
    table: HashMap<(PathBuf, String), ResolvedModule>,
}

impl InMemoryResolver {
    fn internal(mut self, from: &str, specifier: &str, target: &str) -> Self {
        self.table.insert(
            (PathBuf::from(from), specifier.to_string()),
            ResolvedModule {
                resolved_file_name: PathBuf::from(target),
                is_external_library_import: false,
                package_id: None,
            },
        );
        self
    }

    fn external(mut self, from: &str, specifier: &str, name: &str, version: &str) -> Self {
        self.table.insert(
            (PathBuf::from(from), specifier.to_string()),
            ResolvedModule {
                resolved_file_name: PathBuf::from(format!("/project/node_modules/{}/index.d.ts", name)),
                is_external_library_import: true,
                package_id: Some(InstalledPackage {
                    name: name.to_string(),
                    sub_module_name: "index.d.ts".to_string(),
                    version: version.to_string(),
                }),
            },
        );
        self
    }
}

impl ModuleResolver for InMemoryResolver {
    fn resolve_module(
        &self,
        specifier: &str,
        containing_file: &Path,
        _options: &ResolutionOptions,
    ) -> Option<ResolvedModule> {
        self.table
            .get(&(containing_file.to_path_buf(), specifier.to_string()))
            .cloned()
    }
}

fn build(files: &[&str]) -> Partition {
    let files: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();
    Partition::build(&files, &PackageNamer::new("utils"), "/project/out").unwrap()
}

fn rewrite_and_record(
    partition: &mut Partition,
    source: &SourceFile,
    owner: &str,
    resolver: &InMemoryResolver,
) -> Result<String, UtilitoolError> {
    let id = partition.id_of(owner).unwrap();
    let rewrite = rewrite_file(source, id, partition, resolver, &ResolutionOptions::default())?;
    for (name, dependency) in rewrite.dependencies {
        partition.package_mut(id).record_dependency(&name, dependency)?;
    }
    Ok(rewrite.text)
}

#[test]
fn test_dependency_aggregation() {
    let mut partition = build(&["/project/a/p1.ts", "/project/b/p1.ts", "/project/p2.ts"]);
    let resolver = InMemoryResolver::default()
        .external("/project/a/p1.ts", "lodash", "lodash", "4.17.21")
        .internal("/project/b/p1.ts", "../p2", "/project/p2.ts");

    let a = SourceFile::parse("/project/a/p1.ts", "import _ from 'lodash';\nexport const a = _;\n").unwrap();
    let b = SourceFile::parse("/project/b/p1.ts", "export { p2 } from '../p2';\n").unwrap();

    rewrite_and_record(&mut partition, &a, "utils-p1", &resolver).unwrap();
    let b_text = rewrite_and_record(&mut partition, &b, "utils-p1", &resolver).unwrap();
    assert_eq!(b_text, "export { p2 } from 'utils-p2';\n");

    let root = RootManifest::from_str(
        r#"{ "name": "utils", "version": "1.0.0", "dependencies": { "lodash": "^4.17.0" } }"#,
        "/project/package.json",
    )
    .unwrap();
    let p1 = partition.get("utils-p1").unwrap();
    let versions = resolve_dependency_versions(p1, &root, internal_version(&root));

    let expected: BTreeMap<String, String> = [
        ("lodash".to_string(), "^4.17.0".to_string()),
        ("utils-p2".to_string(), "1.0.0".to_string()),
    ]
    .into_iter()
    .collect();
    assert_eq!(versions, expected);
    assert!(partition.get("utils-p2").unwrap().dependencies.is_empty());
}

#[test]
fn test_partition_conflict_on_shared_target() {
    let mut partition = Partition::new("/project/out");
    let shared = Path::new("/project/shared.ts");
    partition.assign(Path::new("/project/user.ts"), "utils-user");
    partition.assign(shared, "utils-one");
    partition.assign(shared, "utils-two");

    let resolver = InMemoryResolver::default().internal("/project/user.ts", "./shared", "/project/shared.ts");
    let source = SourceFile::parse("/project/user.ts", "import { s } from './shared';\n").unwrap();

    let err = rewrite_and_record(&mut partition, &source, "utils-user", &resolver).unwrap_err();
    match err {
        UtilitoolError::PartitionConflict {
            specifier,
            file,
            target,
            owners,
        } => {
            assert_eq!(specifier, "./shared");
            assert_eq!(file, PathBuf::from("/project/user.ts"));
            assert_eq!(target, PathBuf::from("/project/shared.ts"));
            assert_eq!(owners, vec!["utils-one".to_string(), "utils-two".to_string()]);
        }
        other => panic!("expected a partition conflict, got {other}"),
    }
    assert!(partition.get("utils-user").unwrap().dependencies.is_empty());
}

#[test]
fn test_external_only_file_is_unchanged_and_stable() {
    let partition = build(&["/project/a.ts"]);
    let resolver = InMemoryResolver::default()
        .external("/project/a.ts", "react", "react", "18.2.0")
        .external("/project/a.ts", "react-dom/client", "react-dom", "18.2.0");
    let text = "import React from \"react\";\nimport { createRoot } from \"react-dom/client\";\nexport const x = () => import(\"react\");\n";
    let source = SourceFile::parse("/project/a.ts", text).unwrap();

    let first = rewrite_file(&source, 0, &partition, &resolver, &ResolutionOptions::default()).unwrap();
    let second = rewrite_file(&source, 0, &partition, &resolver, &ResolutionOptions::default()).unwrap();

    assert_eq!(first.text, text);
    assert_eq!(first, second);
    let names: Vec<&str> = first.dependencies.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["react", "react-dom", "react"]);
}

#[test]
fn test_multiple_internal_references_in_one_file() {
    let partition = build(&["/project/main.ts", "/project/a.ts", "/project/nested/bee.ts"]);
    let resolver = InMemoryResolver::default()
        .internal("/project/main.ts", "./a", "/project/a.ts")
        .internal("/project/main.ts", "./nested/bee", "/project/nested/bee.ts")
        .internal("/project/main.ts", "./nested/../a", "/project/nested/../a.ts");
    let text = "import { a } from './a';\nimport { b } from \"./nested/bee\";\nconst lazy = () => import('./nested/../a');\n";
    let source = SourceFile::parse("/project/main.ts", text).unwrap();

    let owner = partition.id_of("utils-main").unwrap();
    let result = rewrite_file(&source, owner, &partition, &resolver, &ResolutionOptions::default()).unwrap();

    assert_eq!(
        result.text,
        "import { a } from 'utils-a';\nimport { b } from \"utils-bee\";\nconst lazy = () => import('utils-a');\n"
    );
    assert_eq!(result.rewritten, 3);
    assert!(result
        .dependencies
        .iter()
        .all(|(_, dependency)| *dependency == DependencyRef::Internal));
}

#[test]
fn test_conflicting_external_versions() {
    let mut partition = build(&["/project/a/x.ts", "/project/b/x.ts"]);
    let resolver = InMemoryResolver::default()
        .external("/project/a/x.ts", "lodash", "lodash", "4.17.21")
        .external("/project/b/x.ts", "lodash", "lodash", "3.10.1");

    let a = SourceFile::parse("/project/a/x.ts", "import 'lodash';").unwrap();
    let b = SourceFile::parse("/project/b/x.ts", "import 'lodash';").unwrap();

    rewrite_and_record(&mut partition, &a, "utils-x", &resolver).unwrap();
    let err = rewrite_and_record(&mut partition, &b, "utils-x", &resolver).unwrap_err();
    assert!(matches!(err, UtilitoolError::DependencyVersionConflict(_)));
}
