//! Projects: identity, sources and the mutator chain that configures them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use derivative::Derivative;
use globset::{Glob, GlobSet, GlobSetBuilder};
use mg_ore::iter::ExtendUnique;
use mg_target::{RootPaths, Target, TargetMatrix, TargetPattern};

use crate::configuration::{OutputKind, Visibility};
use crate::error::ResolveError;
use crate::listing::FileListing;
use crate::mutator::MutatorChain;

/// Extensions listed for every project, build step rules may add more.
pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &["h", "hpp", "c", "cpp", "inl"];

/// A dependency declared on the project itself, only applied to the targets it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub project: CompactString,
    pub visibility: Visibility,
    pub filter: TargetPattern,
}

/// A file found while listing a project's sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// `false` for files that are listed in the project but excluded from the build.
    pub compiled: bool,
}

/// A buildable unit, constructed once and shared read-only by every resolution.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Project {
    name: CompactString,
    kind: OutputKind,
    guid: String,

    source_root: Option<PathBuf>,
    additional_source_roots: Vec<PathBuf>,
    source_files: Vec<PathBuf>,
    resource_files: Vec<PathBuf>,
    source_extensions: Vec<CompactString>,

    patterns: Vec<String>,
    #[derivative(Debug = "ignore")]
    include: Option<GlobSet>,
    #[derivative(Debug = "ignore")]
    exclude: GlobSet,
    #[derivative(Debug = "ignore")]
    build_exclude: GlobSet,

    targets: TargetMatrix,
    dependencies: Vec<DependencyEdge>,
    chain: MutatorChain,
}

impl Project {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    /// Deterministic project GUID, derived from the project name.
    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn source_root(&self) -> Option<&Path> {
        self.source_root.as_deref()
    }

    pub fn resource_files(&self) -> &[PathBuf] {
        &self.resource_files
    }

    /// Whether this project supports `target`.
    pub fn supports(&self, target: &Target) -> bool {
        self.targets.contains(target)
    }

    pub fn targets(&self) -> &TargetMatrix {
        &self.targets
    }

    pub fn dependencies(&self) -> &[DependencyEdge] {
        &self.dependencies
    }

    pub fn chain(&self) -> &MutatorChain {
        &self.chain
    }

    /// Lists and classifies the sources of this project.
    ///
    /// Every source root is listed for our source extensions plus `extra_extensions`. Include
    /// and exclude patterns are matched against the path relative to the workspace root.
    /// Explicit source files are always part of the result. The result is sorted by path.
    pub fn list_sources(
        &self,
        roots: &RootPaths,
        listing: &dyn FileListing,
        extra_extensions: &[&str],
    ) -> Result<Vec<SourceFile>, ResolveError> {
        let mut extensions: Vec<&str> = self.source_extensions.iter().map(|ext| ext.as_str()).collect();
        extensions.extend_unique(extra_extensions.iter().copied());

        let mut found: BTreeMap<PathBuf, bool> = BTreeMap::new();
        for root in self.source_root.iter().chain(&self.additional_source_roots) {
            let files = listing
                .list(root, &extensions)
                .map_err(|source| ResolveError::Listing {
                    owner: self.name.clone(),
                    root: root.clone(),
                    source,
                })?;

            for file in files {
                let matched = match_path(roots, &file);
                let included = self
                    .include
                    .as_ref()
                    .map_or(true, |include| include.is_match(&matched));
                if included && !self.exclude.is_match(&matched) {
                    let compiled = !self.build_exclude.is_match(&matched);
                    found.insert(file, compiled);
                }
            }
        }

        for file in &self.source_files {
            let compiled = !self.build_exclude.is_match(match_path(roots, file));
            found.insert(file.clone(), compiled);
        }

        tracing::debug!(project = %self.name, count = found.len(), "listed sources");
        Ok(found
            .into_iter()
            .map(|(path, compiled)| SourceFile { path, compiled })
            .collect())
    }
}

fn match_path(roots: &RootPaths, path: &Path) -> String {
    let relative = roots.relative(path).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

fn guid_for(name: &str) -> String {
    let hash = blake3::hash(name.as_bytes());
    let bytes = hash.as_bytes();
    let hex = |range: std::ops::Range<usize>| {
        bytes[range]
            .iter()
            .map(|byte| format!("{byte:02X}"))
            .collect::<String>()
    };
    format!(
        "{}-{}-{}-{}-{}",
        hex(0..4),
        hex(4..6),
        hex(6..8),
        hex(8..10),
        hex(10..16)
    )
}

/// Builds a [`Project`], paths are relative to the workspace root unless absolute.
#[derive(Debug, Clone)]
pub struct ProjectBuilder {
    name: CompactString,
    kind: OutputKind,
    source_root: Option<PathBuf>,
    additional_source_roots: Vec<PathBuf>,
    source_files: Vec<PathBuf>,
    resource_files: Vec<PathBuf>,
    source_extensions: Vec<CompactString>,
    include: Vec<String>,
    exclude: Vec<String>,
    build_exclude: Vec<String>,
    targets: Vec<TargetPattern>,
    dependencies: Vec<DependencyEdge>,
}

impl ProjectBuilder {
    pub fn new(name: impl Into<CompactString>, kind: OutputKind) -> Self {
        ProjectBuilder {
            name: name.into(),
            kind,
            source_root: None,
            additional_source_roots: Vec::new(),
            source_files: Vec::new(),
            resource_files: Vec::new(),
            source_extensions: DEFAULT_SOURCE_EXTENSIONS
                .iter()
                .map(|ext| CompactString::from(*ext))
                .collect(),
            include: Vec::new(),
            exclude: Vec::new(),
            build_exclude: Vec::new(),
            targets: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = Some(root.into());
        self
    }

    pub fn additional_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.additional_source_roots.push(root.into());
        self
    }

    pub fn source_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.source_files.push(file.into());
        self
    }

    pub fn resource_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.resource_files.push(file.into());
        self
    }

    pub fn source_extension(mut self, extension: &str) -> Self {
        let extension = CompactString::from(extension.trim_start_matches('.'));
        self.source_extensions.extend_unique([extension]);
        self
    }

    /// Only list files matching one of the include patterns, when any are declared.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include.push(pattern.into());
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    /// List matching files in the project but never compile them.
    pub fn build_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.build_exclude.push(pattern.into());
        self
    }

    /// Targets this project supports, every target when never called.
    pub fn targets(mut self, patterns: Vec<TargetPattern>) -> Self {
        self.targets = patterns;
        self
    }

    pub fn dependency(
        mut self,
        project: impl Into<CompactString>,
        visibility: Visibility,
        filter: TargetPattern,
    ) -> Self {
        self.dependencies.push(DependencyEdge {
            project: project.into(),
            visibility,
            filter,
        });
        self
    }

    pub fn build(self, roots: &RootPaths, chain: MutatorChain) -> Result<Project, ResolveError> {
        let globs = |patterns: &[String]| -> Result<GlobSet, ResolveError> {
            let mut builder = GlobSetBuilder::new();
            for pattern in patterns {
                let glob = Glob::new(pattern).map_err(|source| ResolveError::InvalidPattern {
                    owner: self.name.clone(),
                    pattern: pattern.clone(),
                    source,
                })?;
                builder.add(glob);
            }
            builder.build().map_err(|source| ResolveError::InvalidPattern {
                owner: self.name.clone(),
                pattern: patterns.join(", "),
                source,
            })
        };

        let include = if self.include.is_empty() {
            None
        } else {
            Some(globs(&self.include)?)
        };
        let exclude = globs(&self.exclude)?;
        let build_exclude = globs(&self.build_exclude)?;

        let anchor = |paths: Vec<PathBuf>| -> Vec<PathBuf> {
            paths.into_iter().map(|path| roots.join(path)).collect()
        };
        let targets = if self.targets.is_empty() {
            TargetMatrix::full(TargetPattern::any())
        } else {
            TargetMatrix::curated(self.targets)
        };
        let patterns = self
            .include
            .iter()
            .map(|pattern| format!("+{pattern}"))
            .chain(self.exclude.iter().map(|pattern| format!("-{pattern}")))
            .chain(self.build_exclude.iter().map(|pattern| format!("!{pattern}")))
            .collect();

        Ok(Project {
            guid: guid_for(&self.name),
            name: self.name,
            kind: self.kind,
            source_root: self.source_root.map(|root| roots.join(root)),
            additional_source_roots: anchor(self.additional_source_roots),
            source_files: anchor(self.source_files),
            resource_files: anchor(self.resource_files),
            source_extensions: self.source_extensions,
            patterns,
            include,
            exclude,
            build_exclude,
            targets,
            dependencies: self.dependencies,
            chain,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mg_target::{Compiler, DevEnv, Optimization, Platform};

    use super::*;
    use crate::listing::MemoryListing;
    use crate::mutator::{BaseLayer, BasePaths};

    fn chain(roots: &RootPaths) -> MutatorChain {
        let templates = crate::templates(roots.clone());
        let base = BaseLayer::compile(&templates, &BasePaths::default()).unwrap();
        MutatorChain::new(Arc::new(base))
    }

    #[test]
    fn smoketest_list_sources() {
        let roots = RootPaths::new("/ws", "_generated");
        let listing = MemoryListing::new([
            "/ws/Code/ServerApp/Source/main.cpp",
            "/ws/Code/ServerApp/Source/Fonts/Roboto.cpp",
            "/ws/Code/ServerApp/Source/Shaders/BlitVS.hlsl",
            "/ws/Code/ServerApp/readme.txt",
            "/ws/Code/ThirdParty/DearImgui/backends/imgui_impl_dx11.cpp",
            "/ws/Code/ThirdParty/DearImgui/imgui.cpp",
        ]);

        let project = ProjectBuilder::new("NetImguiServer", OutputKind::Executable)
            .source_root("Code/ServerApp")
            .additional_source_root("Code/ThirdParty/DearImgui/backends")
            .source_file("Code/ThirdParty/DearImgui/imgui.cpp")
            .build_exclude("Code/ServerApp/Source/Fonts/**")
            .build_exclude("**/backends/**")
            .build(&roots, chain(&roots))
            .unwrap();

        let sources = project.list_sources(&roots, &listing, &["hlsl"]).unwrap();
        let summary: Vec<_> = sources
            .iter()
            .map(|file| (file.path.to_str().unwrap(), file.compiled))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("/ws/Code/ServerApp/Source/Fonts/Roboto.cpp", false),
                ("/ws/Code/ServerApp/Source/Shaders/BlitVS.hlsl", true),
                ("/ws/Code/ServerApp/Source/main.cpp", true),
                ("/ws/Code/ThirdParty/DearImgui/backends/imgui_impl_dx11.cpp", false),
                ("/ws/Code/ThirdParty/DearImgui/imgui.cpp", true),
            ]
        );
    }

    #[test]
    fn smoketest_include_exclude() {
        let roots = RootPaths::new("/ws", "_generated");
        let listing = MemoryListing::new([
            "/ws/Code/ThirdParty/DearImgui/imgui.cpp",
            "/ws/Code/ThirdParty/DearImgui/imgui.h",
            "/ws/Code/ThirdParty/DearImgui/backends/imgui_impl_win32.cpp",
            "/ws/Code/ThirdParty/DearImgui/misc/fonts/binary_to_compressed_c.cpp",
        ]);
        let project = ProjectBuilder::new("DearImguiIndex16Lib", OutputKind::Library)
            .source_root("Code/ThirdParty/DearImgui")
            .exclude("**/backends/**")
            .include("Code/ThirdParty/DearImgui/*")
            .build(&roots, chain(&roots))
            .unwrap();

        let sources = project.list_sources(&roots, &listing, &[]).unwrap();
        let paths: Vec<_> = sources.iter().map(|file| file.path.clone()).collect();
        // `*` crosses separators, so `misc/fonts` is included too.
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/ws/Code/ThirdParty/DearImgui/imgui.cpp"),
                PathBuf::from("/ws/Code/ThirdParty/DearImgui/imgui.h"),
                PathBuf::from("/ws/Code/ThirdParty/DearImgui/misc/fonts/binary_to_compressed_c.cpp"),
            ]
        );
    }

    #[test]
    fn smoketest_invalid_pattern() {
        let roots = RootPaths::new("/ws", "_generated");
        let err = ProjectBuilder::new("Broken", OutputKind::Library)
            .exclude("Code/{unclosed")
            .build(&roots, chain(&roots))
            .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidPattern { ref pattern, .. } if pattern == "Code/{unclosed"));
    }

    #[test]
    fn smoketest_guid_and_targets() {
        let roots = RootPaths::new("/ws", "_generated");
        let release = TargetPattern {
            optimization: Optimization::RELEASE,
            ..TargetPattern::default()
        };
        let a = ProjectBuilder::new("SampleBasic", OutputKind::Executable)
            .targets(vec![release])
            .build(&roots, chain(&roots))
            .unwrap();
        let b = ProjectBuilder::new("SampleBasic", OutputKind::Executable)
            .build(&roots, chain(&roots))
            .unwrap();

        assert_eq!(a.guid(), b.guid());
        assert_eq!(a.guid().len(), 36);

        let debug = Target::new(DevEnv::VS2019, Platform::WIN64, Compiler::MSBUILD, Optimization::DEBUG).unwrap();
        assert!(!a.supports(&debug));
        assert!(b.supports(&debug));
    }
}
