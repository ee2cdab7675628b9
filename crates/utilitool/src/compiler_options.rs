//! Compiler options carried into the shared `tsconfig.json`
//!
//! Only options that mean the same thing for every generated package are
//! listed. Path-shaped options (`baseUrl`, `paths`, `outDir`, `rootDir`,
//! `declarationDir`, `typeRoots`, ...) are project specific and stay behind.

pub const COMPILER_OPTIONS_COPY_LIST: &[&str] = &[
    "allowJs",
    "allowSyntheticDefaultImports",
    "allowUmdGlobalAccess",
    "allowUnreachableCode",
    "allowUnusedLabels",
    "alwaysStrict",
    "charset",
    "checkJs",
    "declaration",
    "declarationMap",
    "emitDeclarationOnly",
    "disableSizeLimit",
    "disableSourceOfProjectReferenceRedirect",
    "disableSolutionSearching",
    "downlevelIteration",
    "emitBOM",
    "emitDecoratorMetadata",
    "experimentalDecorators",
    "forceConsistentCasingInFileNames",
    "importHelpers",
    "importsNotUsedAsValues",
    "inlineSourceMap",
    "inlineSources",
    "isolatedModules",
    "jsx",
    "keyofStringsOnly",
    "locale",
    "maxNodeModuleJsDepth",
    "module",
    "moduleResolution",
    "newLine",
    "noEmitHelpers",
    "noEmitOnError",
    "noErrorTruncation",
    "noFallthroughCasesInSwitch",
    "noImplicitAny",
    "noImplicitReturns",
    "noImplicitThis",
    "noStrictGenericChecks",
    "noUnusedLocals",
    "noUnusedParameters",
    "noImplicitUseStrict",
    "noLib",
    "noResolve",
    "preserveConstEnums",
    "reactNamespace",
    "jsxFactory",
    "removeComments",
    "skipLibCheck",
    "skipDefaultLibCheck",
    "sourceMap",
    "strict",
    "strictFunctionTypes",
    "strictBindCallApply",
    "strictNullChecks",
    "strictPropertyInitialization",
    "stripInternal",
    "suppressExcessPropertyErrors",
    "suppressImplicitAnyIndexErrors",
    "target",
    "resolveJsonModule",
    "esModuleInterop",
    "useDefineForClassFields",
];

/// Whether `option` is forwarded to the generated packages
pub fn is_copied(option: &str) -> bool {
    COMPILER_OPTIONS_COPY_LIST.iter().any(|copied| *copied == option)
}
