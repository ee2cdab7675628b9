//! Utilitool library
//!
//! Splits one TypeScript project into a package per source file name:
//! - Locating and expanding `tsconfig.json` and `package.json`
//! - Finding module specifiers with tree-sitter
//! - Naming packages and partitioning files between them
//! - Resolving specifiers node-style and rewriting cross-package references
//! - Emitting entry points, manifests and a shared `tsconfig.json`

pub mod assemble;
pub mod compiler_options;
pub mod config;
pub mod error;
pub mod imports;
pub mod manifest;
pub mod naming;
pub mod options;
pub mod partition;
pub mod path;
pub mod pipeline;
pub mod resolver;
pub mod rewrite;
pub mod splice;
pub mod version;

pub use config::{locate, CompilerConfig, ConfigError, ProjectConfig};
pub use error::UtilitoolError;
pub use imports::{find_import_ranges, ParseError, SourceFile, TextRange};
pub use manifest::{ManifestError, PackageManifest, RootManifest};
pub use naming::{package_name, NamingError, PackageNamer};
pub use options::{LogLevel, UtilitoolOptions};
pub use partition::{DependencyConflict, DependencyRef, Package, PackageId, Partition, ReverseIndex};
pub use pipeline::{utilitool, utilitool_with_resolver, Inventory, PackageReport, RunReport};
pub use resolver::{
    resolve, ModuleResolver, NodeModuleResolver, ResolutionOptions, ResolutionResult,
    ResolvedModule,
};
pub use rewrite::{rewrite_file, FileRewrite};
pub use splice::{splice, Edit, SpliceError};
pub use version::{parse_version, Version, VersionBump, VersionError};
