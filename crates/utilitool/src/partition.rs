//! Package partitioning
//!
//! Groups the project's files into packages and keeps the reverse index from
//! file to owning packages. The partition is built completely before any
//! cross-reference is resolved against it.

use crate::naming::{NamingError, PackageNamer};
use indexmap::IndexSet;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Index of a package inside its [`Partition`]
pub type PackageId = usize;

/// Where a recorded dependency comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyRef {
    /// An installed package at the version found on disk
    External { version: String },
    /// Another package of the same partition
    Internal,
}

impl fmt::Display for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyRef::External { version } => write!(f, "installed version {}", version),
            DependencyRef::Internal => write!(f, "a sibling package"),
        }
    }
}

/// A package recorded the same dependency with two different sources
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Package \"{package}\" depends on \"{dependency}\" as both {existing} and {incoming}")]
pub struct DependencyConflict {
    pub package: String,
    pub dependency: String,
    pub existing: DependencyRef,
    pub incoming: DependencyRef,
}

/// One output package
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    /// Output directory, `<out_dir>/<name>`
    pub directory: PathBuf,
    /// Owned files in first-seen order
    pub files: IndexSet<PathBuf>,
    pub dependencies: BTreeMap<String, DependencyRef>,
}

impl Package {
    fn new(name: String, out_dir: &Path) -> Self {
        Self {
            directory: out_dir.join(&name),
            name,
            files: IndexSet::new(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Add a dependency, refusing to overwrite a different earlier entry
    pub fn record_dependency(
        &mut self,
        name: &str,
        dependency: DependencyRef,
    ) -> Result<(), DependencyConflict> {
        match self.dependencies.get(name) {
            Some(existing) if *existing != dependency => Err(DependencyConflict {
                package: self.name.clone(),
                dependency: name.to_string(),
                existing: existing.clone(),
                incoming: dependency,
            }),
            Some(_) => Ok(()),
            None => {
                self.dependencies.insert(name.to_string(), dependency);
                Ok(())
            }
        }
    }
}

/// File path → packages claiming it. More than one owner is a naming collision.
#[derive(Debug, Clone, Default)]
pub struct ReverseIndex {
    owners: HashMap<PathBuf, BTreeSet<PackageId>>,
}

impl ReverseIndex {
    pub fn owners(&self, path: &Path) -> Option<&BTreeSet<PackageId>> {
        self.owners.get(path)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &BTreeSet<PackageId>)> {
        self.owners.iter()
    }

    fn insert(&mut self, path: PathBuf, package: PackageId) {
        self.owners.entry(path).or_default().insert(package);
    }
}

/// All packages of one run plus the reverse index
#[derive(Debug, Clone)]
pub struct Partition {
    out_dir: PathBuf,
    packages: Vec<Package>,
    by_name: HashMap<String, PackageId>,
    index: ReverseIndex,
}

impl Partition {
    /// An empty partition whose packages live under `out_dir`
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            packages: Vec::new(),
            by_name: HashMap::new(),
            index: ReverseIndex::default(),
        }
    }

    /// Partition `files` by the names `namer` derives for them
    pub fn build(
        files: &[PathBuf],
        namer: &PackageNamer,
        out_dir: impl Into<PathBuf>,
    ) -> Result<Self, NamingError> {
        let mut partition = Self::new(out_dir);
        for file in files {
            let name = namer.name(file)?;
            partition.assign(file, &name);
        }
        Ok(partition)
    }

    /// Put `file` into the package called `name`, creating it on first sight
    pub fn assign(&mut self, file: &Path, name: &str) -> PackageId {
        let id = match self.by_name.get(name) {
            Some(&id) => id,
            None => {
                let id = self.packages.len();
                self.packages
                    .push(Package::new(name.to_string(), &self.out_dir));
                self.by_name.insert(name.to_string(), id);
                id
            }
        };
        self.packages[id].files.insert(file.to_path_buf());
        self.index.insert(file.to_path_buf(), id);
        id
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id]
    }

    pub fn package_mut(&mut self, id: PackageId) -> &mut Package {
        &mut self.packages[id]
    }

    pub fn get(&self, name: &str) -> Option<&Package> {
        self.by_name.get(name).map(|&id| &self.packages[id])
    }

    pub fn id_of(&self, name: &str) -> Option<PackageId> {
        self.by_name.get(name).copied()
    }

    /// Packages in creation order
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn ids(&self) -> std::ops::Range<PackageId> {
        0..self.packages.len()
    }

    pub fn owners(&self, path: &Path) -> Option<&BTreeSet<PackageId>> {
        self.index.owners(path)
    }

    pub fn reverse_index(&self) -> &ReverseIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
