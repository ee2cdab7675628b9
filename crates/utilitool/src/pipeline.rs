//! A complete utilitool run
//!
//! Phase 1 reads and parses every source file and builds the partition.
//! Phase 2 walks the packages and rewrites their files against that
//! partition. Emission of entry points, manifests and the shared
//! `tsconfig.json` follows, then the optional build.

use crate::assemble::{
    aggregate_entry, check_reserved_paths, package_manifest, project_relative, shared_tsconfig,
    to_pretty_json, ENTRY_FILE,
};
use crate::config::{self, CompilerConfig, MANIFEST_FILE, TSCONFIG_FILE};
use crate::error::UtilitoolError;
use crate::imports::SourceFile;
use crate::manifest::RootManifest;
use crate::naming::PackageNamer;
use crate::options::UtilitoolOptions;
use crate::partition::{PackageId, Partition};
use crate::path::normalize;
use crate::resolver::{ModuleResolver, NodeModuleResolver};
use crate::rewrite::rewrite_file;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, info_span};

/// License file names, by preference. Matched case-insensitively.
pub const LICENSE_FILES: &[&str] = &["LICENSE", "LICENSE.md", "LICENSE.txt", "LICENCE"];

/// What a run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub out_dir: PathBuf,
    pub packages: Vec<PackageReport>,
    /// License file copied into every package, if any
    pub license: Option<PathBuf>,
    /// Whether the build command ran
    pub built: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    pub name: String,
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
    /// Dependencies as written to the manifest
    pub dependencies: BTreeMap<String, String>,
}

/// Parsed sources and the partition built from them
#[derive(Debug)]
pub struct Inventory {
    pub sources: HashMap<PathBuf, SourceFile>,
    pub partition: Partition,
}

impl Inventory {
    /// Read and parse every file, then partition them all
    pub fn build(
        files: &[PathBuf],
        namer: &PackageNamer,
        out_dir: &Path,
    ) -> Result<Self, UtilitoolError> {
        let mut sources = HashMap::with_capacity(files.len());
        for file in files {
            sources.insert(file.clone(), read_source(file)?);
        }
        let partition = Partition::build(files, namer, out_dir)?;
        Ok(Self { sources, partition })
    }
}

fn read_source(path: &Path) -> Result<SourceFile, UtilitoolError> {
    let text = fs::read_to_string(path).map_err(|e| UtilitoolError::UnreadableSource {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if text.is_empty() {
        return Err(UtilitoolError::UnreadableSource {
            path: path.to_path_buf(),
            reason: "file is empty".to_string(),
        });
    }
    Ok(SourceFile::parse(path, text)?)
}

/// Run with the node-style resolver
pub fn utilitool(options: &UtilitoolOptions) -> Result<RunReport, UtilitoolError> {
    utilitool_with_resolver(options, &NodeModuleResolver::new())
}

/// Run with a caller-provided module resolver
pub fn utilitool_with_resolver(
    options: &UtilitoolOptions,
    resolver: &dyn ModuleResolver,
) -> Result<RunReport, UtilitoolError> {
    let project = absolute(&options.project)?;
    info!("utilitool is running on: \"{}\"", project.display());

    let located = config::locate(&project)?;
    let out_dir = normalize(&project.join(&options.out_dir));

    let mut root = RootManifest::from_file(&located.package_json_path)?;
    root.validate(options.bump.is_some())?;
    if let Some(bump) = &options.bump {
        let version = root.bump_version(bump)?;
        info!("version set to {} ({})", version, bump);
    }
    let namer = PackageNamer::new(root.name().unwrap_or_default());

    let compiler = CompilerConfig::load(&located.tsconfig_path, std::slice::from_ref(&out_dir))?;
    let Inventory {
        sources,
        mut partition,
    } = Inventory::build(&compiler.file_names, &namer, &out_dir)?;
    debug!(
        "packages: {:?}",
        partition.packages().iter().map(|p| p.name.as_str()).collect::<Vec<_>>()
    );

    if options.clean {
        clean_out_dir(&out_dir)?;
    }

    let license = if options.copy_license {
        find_license(&project)?
    } else {
        None
    };

    let mut reports = Vec::with_capacity(partition.len());
    for id in partition.ids() {
        let span = info_span!("package", name = %partition.package(id).name);
        let _enter = span.enter();
        info!("init package processing");

        process_package(id, &mut partition, &sources, &project, resolver, &compiler)?;
        reports.push(emit_package(id, &partition, &root, &project, license.as_deref())?);
    }

    info!("writing shared {}", TSCONFIG_FILE);
    let tsconfig = shared_tsconfig(&partition, compiler.compiler_options()?);
    write_json(&out_dir.join(TSCONFIG_FILE), &tsconfig)?;

    if options.build {
        info!("building newly created projects");
        run_build(&options.build_command, &out_dir)?;
    }

    Ok(RunReport {
        out_dir,
        packages: reports,
        license,
        built: options.build,
    })
}

/// Rewrite and write every file of package `id`, recording its dependencies
fn process_package(
    id: PackageId,
    partition: &mut Partition,
    sources: &HashMap<PathBuf, SourceFile>,
    project: &Path,
    resolver: &dyn ModuleResolver,
    compiler: &CompilerConfig,
) -> Result<(), UtilitoolError> {
    let package = partition.package(id);
    check_reserved_paths(package, project)?;
    let files: Vec<PathBuf> = package.files.iter().cloned().collect();
    let directory = package.directory.clone();

    for file in &files {
        let source = sources
            .get(file)
            .ok_or_else(|| UtilitoolError::UnreadableSource {
                path: file.clone(),
                reason: "not part of the inventory".to_string(),
            })?;

        let rewrite = rewrite_file(source, id, partition, resolver, &compiler.options)?;
        for (name, dependency) in rewrite.dependencies {
            partition.package_mut(id).record_dependency(&name, dependency)?;
        }

        let relative = project_relative(file, project)?;
        write_file(&directory.join(&relative), &rewrite.text)?;
        info!("writing file \"{}\"", relative.display());
    }
    Ok(())
}

/// Write the entry point, manifest and license of package `id`
fn emit_package(
    id: PackageId,
    partition: &Partition,
    root: &RootManifest,
    project: &Path,
    license: Option<&Path>,
) -> Result<PackageReport, UtilitoolError> {
    let package = partition.package(id);

    info!("writing \"{}\" {}", package.name, ENTRY_FILE);
    write_file(
        &package.directory.join(ENTRY_FILE),
        &aggregate_entry(package, project)?,
    )?;

    info!("writing \"{}\" {}", package.name, MANIFEST_FILE);
    let manifest = package_manifest(package, root);
    write_json(&package.directory.join(MANIFEST_FILE), &manifest)?;

    if let Some(license) = license {
        if let Some(file_name) = license.file_name() {
            let target = package.directory.join(file_name);
            fs::copy(license, &target).map_err(|e| UtilitoolError::io(&target, e))?;
            debug!("copied {}", license.display());
        }
    }

    Ok(PackageReport {
        name: package.name.clone(),
        directory: package.directory.clone(),
        files: package.files.iter().cloned().collect(),
        dependencies: manifest.dependencies,
    })
}

fn absolute(path: &Path) -> Result<PathBuf, UtilitoolError> {
    if path.is_absolute() {
        return Ok(normalize(path));
    }
    let cwd = std::env::current_dir().map_err(|e| UtilitoolError::io(path, e))?;
    Ok(normalize(&cwd.join(path)))
}

/// Remove `out_dir` and everything in it
pub fn clean_out_dir(out_dir: &Path) -> Result<(), UtilitoolError> {
    if out_dir.exists() {
        info!("cleaning output directory \"{}\"", out_dir.display());
        fs::remove_dir_all(out_dir).map_err(|e| UtilitoolError::io(out_dir, e))?;
    }
    Ok(())
}

/// The project's license file, preferring the earlier names of [`LICENSE_FILES`]
pub fn find_license(project: &Path) -> Result<Option<PathBuf>, UtilitoolError> {
    let entries = fs::read_dir(project).map_err(|e| UtilitoolError::io(project, e))?;
    let mut candidates: Vec<(usize, PathBuf)> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(rank) = LICENSE_FILES
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(&name))
        {
            candidates.push((rank, path));
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next().map(|(_, path)| path))
}

fn write_file(path: &Path, content: &str) -> Result<(), UtilitoolError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| UtilitoolError::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| UtilitoolError::io(path, e))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), UtilitoolError> {
    let content = to_pretty_json(value).map_err(|e| UtilitoolError::io(path, e.into()))?;
    write_file(path, &content)
}

/// Run `command` inside `out_dir`, inheriting stdio
pub fn run_build(command: &str, out_dir: &Path) -> Result<(), UtilitoolError> {
    let mut parts = command.split_whitespace();
    let program = parts.next().ok_or_else(|| UtilitoolError::BuildSubprocess {
        command: command.to_string(),
        code: None,
        reason: "empty command".to_string(),
    })?;

    let status = Command::new(program)
        .args(parts)
        .current_dir(out_dir)
        .status()
        .map_err(|e| UtilitoolError::BuildSubprocess {
            command: command.to_string(),
            code: None,
            reason: e.to_string(),
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(UtilitoolError::BuildSubprocess {
            command: command.to_string(),
            code: status.code(),
            reason: format!("exited with {}", status),
        })
    }
}
