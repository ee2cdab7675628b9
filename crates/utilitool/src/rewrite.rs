//! Cross-reference rewriting
//!
//! Resolves every specifier of a file against the partition and produces the
//! file's new text plus the dependencies its package picks up. References to
//! files of another package are replaced by that package's name. References
//! to installed packages, and relative references inside the same package,
//! are left as written; other same-package references (resolved through
//! `baseUrl` or `paths`) become relative, since the output tsconfig only maps
//! package names.

use crate::error::UtilitoolError;
use crate::imports::SourceFile;
use crate::naming::file_stem;
use crate::partition::{DependencyRef, PackageId, Partition};
use crate::path::{relative_to, to_posix};
use crate::resolver::{is_relative, resolve, ModuleResolver, ResolutionOptions, ResolutionResult};
use crate::splice::{splice, Edit};
use std::path::Path;

/// Result of rewriting one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRewrite {
    pub text: String,
    /// Dependencies in the order their specifiers appear
    pub dependencies: Vec<(String, DependencyRef)>,
    /// Number of specifiers replaced
    pub rewritten: usize,
}

/// Rewrite `source`, owned by package `owner`.
///
/// Every specifier is resolved before the text is touched; the edits are then
/// applied in a single pass.
pub fn rewrite_file(
    source: &SourceFile,
    owner: PackageId,
    partition: &Partition,
    resolver: &dyn ModuleResolver,
    options: &ResolutionOptions,
) -> Result<FileRewrite, UtilitoolError> {
    let mut edits = Vec::new();
    let mut dependencies = Vec::new();

    for range in &source.reference_ranges {
        let specifier = range.literal_text.as_str();
        match resolve(resolver, specifier, &source.path, options) {
            ResolutionResult::External {
                package_name,
                version,
            } => {
                tracing::debug!("\"{}\" is {}@{}", specifier, package_name, version);
                dependencies.push((package_name, DependencyRef::External { version }));
            }
            ResolutionResult::Internal { resolved_path } => {
                let owners: Vec<PackageId> = partition
                    .owners(&resolved_path)
                    .map(|owners| owners.iter().copied().collect())
                    .unwrap_or_default();

                let target = match owners.as_slice() {
                    [only] => *only,
                    _ => {
                        return Err(UtilitoolError::PartitionConflict {
                            specifier: specifier.to_string(),
                            file: source.path.clone(),
                            target: resolved_path,
                            owners: owners
                                .iter()
                                .map(|&id| partition.package(id).name.clone())
                                .collect(),
                        })
                    }
                };

                if target == owner {
                    if !is_relative(specifier) {
                        let relative = relative_specifier(&source.path, &resolved_path);
                        tracing::debug!("\"{}\" → \"{}\"", specifier, relative);
                        edits.push(Edit::new(range.start, range.end, relative));
                    }
                    continue;
                }

                let name = &partition.package(target).name;
                tracing::debug!("\"{}\" → \"{}\"", specifier, name);
                dependencies.push((name.clone(), DependencyRef::Internal));
                edits.push(Edit::new(range.start, range.end, name.as_str()));
            }
            ResolutionResult::Unresolved => {
                return Err(UtilitoolError::Resolution {
                    specifier: specifier.to_string(),
                    file: source.path.clone(),
                })
            }
        }
    }

    let text = splice(&source.text, &edits)?;
    Ok(FileRewrite {
        text,
        dependencies,
        rewritten: edits.len(),
    })
}

/// `./`-style specifier for `target` from the file `from`, without extension
fn relative_specifier(from: &Path, target: &Path) -> String {
    let base = from.parent().unwrap_or(Path::new(""));
    let relative = relative_to(target, base);
    let module = to_posix(&relative.with_file_name(file_stem(&relative)));
    if module.starts_with("../") {
        module
    } else {
        format!("./{}", module)
    }
}
