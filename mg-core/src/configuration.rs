//! The resolved build settings of one (project, target) pair.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use mg_ore::iter::ExtendUnique;
use mg_target::{Platform, Target};
use serde::{Deserialize, Serialize};

/// What a project produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Executable,
    Library,
}

impl OutputKind {
    pub fn name(self) -> &'static str {
        match self {
            OutputKind::Executable => "executable",
            OutputKind::Library => "library",
        }
    }

    /// File extension of the binary this kind produces on `platform`.
    pub fn extension(self, platform: Platform) -> &'static str {
        match (self, platform == Platform::MAC) {
            (OutputKind::Executable, false) => "exe",
            (OutputKind::Executable, true) => "",
            (OutputKind::Library, false) => "lib",
            (OutputKind::Library, true) => "a",
        }
    }
}

/// Whether a dependency's contribution keeps propagating to our own dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// A dependency declared by a Configuration, resolved against the same target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Dependency {
    pub project: CompactString,
    pub visibility: Visibility,
}

/// Settings a Configuration exports to the projects that depend on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Contribution {
    pub include_paths: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub library_files: Vec<String>,
    pub library_paths: Vec<PathBuf>,
}

impl Contribution {
    /// Merge `other` into `self`, values already present are kept once.
    pub fn merge_unique(&mut self, other: &Contribution) {
        self.include_paths
            .extend_unique(other.include_paths.iter().cloned());
        self.defines.extend_unique(other.defines.iter().cloned());
        self.library_files
            .extend_unique(other.library_files.iter().cloned());
        self.library_paths
            .extend_unique(other.library_paths.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.include_paths.is_empty()
            && self.defines.is_empty()
            && self.library_files.is_empty()
            && self.library_paths.is_empty()
    }
}

/// How a source input takes part in the build of one Configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRole {
    /// Compiled directly.
    Compiled,
    /// Listed in the project, never compiled.
    Listed,
    /// Routed through a generated build step.
    Claimed,
    /// Output of a generated build step.
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInput {
    pub path: PathBuf,
    pub role: SourceRole,
}

/// A generated compilation step attached to a Configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStep {
    pub input: PathBuf,
    pub output: PathBuf,
    pub tool: CompactString,
    pub profile: CompactString,
    pub entry_point: CompactString,
    pub arguments: Vec<String>,
    pub description: String,
    pub variable: String,
}

/// Resolved build settings for one (project, target) pair.
///
/// Mutators can only append to or overwrite fields, there is no API to remove an entry that an
/// earlier mutator contributed. Negating a default goes through [`Configuration::override_define`]
/// or by overwriting a named option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    project: CompactString,
    name: Option<String>,
    project_file_name: Option<String>,
    project_path: Option<PathBuf>,
    target_path: Option<PathBuf>,
    target_file_suffix: String,
    intermediate_path: Option<PathBuf>,
    output: Option<OutputKind>,
    binary_path: Option<PathBuf>,

    defines: Vec<String>,
    include_paths: Vec<PathBuf>,
    library_files: Vec<String>,
    library_paths: Vec<PathBuf>,
    compiler_options: Vec<String>,
    linker_options: Vec<String>,
    post_build: Vec<String>,

    target: Target,
    options: BTreeMap<String, String>,
    public: Contribution,
    dependencies: Vec<Dependency>,
    sources: Vec<SourceInput>,
    build_steps: Vec<BuildStep>,
}

impl Configuration {
    pub fn new(project: impl Into<CompactString>, target: Target) -> Self {
        Configuration {
            project: project.into(),
            name: None,
            project_file_name: None,
            project_path: None,
            target_path: None,
            target_file_suffix: String::new(),
            intermediate_path: None,
            output: None,
            binary_path: None,
            defines: Vec::new(),
            include_paths: Vec::new(),
            library_files: Vec::new(),
            library_paths: Vec::new(),
            compiler_options: Vec::new(),
            linker_options: Vec::new(),
            post_build: Vec::new(),
            target,
            options: BTreeMap::new(),
            public: Contribution::default(),
            dependencies: Vec::new(),
            sources: Vec::new(),
            build_steps: Vec::new(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    // ---- named fields, overwritten ----

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_project_file_name(&mut self, name: impl Into<String>) {
        self.project_file_name = Some(name.into());
    }

    pub fn project_file_name(&self) -> Option<&str> {
        self.project_file_name.as_deref()
    }

    /// Directory the project file is written to.
    pub fn set_project_path(&mut self, path: impl Into<PathBuf>) {
        self.project_path = Some(path.into());
    }

    pub fn project_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    /// Directory the output binary is written to.
    pub fn set_target_path(&mut self, path: impl Into<PathBuf>) {
        self.target_path = Some(path.into());
    }

    pub fn target_path(&self) -> Option<&Path> {
        self.target_path.as_deref()
    }

    pub fn set_target_file_suffix(&mut self, suffix: impl Into<String>) {
        self.target_file_suffix = suffix.into();
    }

    pub fn target_file_suffix(&self) -> &str {
        &self.target_file_suffix
    }

    pub fn set_intermediate_path(&mut self, path: impl Into<PathBuf>) {
        self.intermediate_path = Some(path.into());
    }

    pub fn intermediate_path(&self) -> Option<&Path> {
        self.intermediate_path.as_deref()
    }

    pub fn set_output(&mut self, kind: OutputKind) {
        self.output = Some(kind);
    }

    pub fn output(&self) -> Option<OutputKind> {
        self.output
    }

    /// Path of the project file, `project_path/project_file_name`, without the extension of the
    /// format it is eventually written in.
    pub fn project_file(&self) -> Option<PathBuf> {
        Some(self.project_path.as_ref()?.join(self.project_file_name.as_ref()?))
    }

    /// Path of the output binary, only known once the Configuration has been resolved.
    pub fn binary_path(&self) -> Option<&Path> {
        self.binary_path.as_deref()
    }

    /// Sets or overwrites the named option `key`, e.g. `PlatformToolset`.
    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    // ---- ordered lists, appended ----

    pub fn add_define(&mut self, define: impl Into<String>) {
        self.defines.push(define.into());
    }

    /// Adds a define for this Configuration and everything that depends on it.
    pub fn add_public_define(&mut self, define: impl Into<String>) {
        let define = define.into();
        self.public.defines.push(define.clone());
        self.defines.push(define);
    }

    /// Rewrites the value of every `key` or `key=...` define in place, appends `key=value` if
    /// there is none.
    pub fn override_define(&mut self, key: &str, value: &str) {
        let replacement = format!("{key}={value}");
        let mut found = false;
        for define in self.defines.iter_mut().chain(self.public.defines.iter_mut()) {
            if define_key(define) == key {
                define.clone_from(&replacement);
                found = true;
            }
        }
        if !found {
            self.defines.push(replacement);
        }
    }

    pub fn defines(&self) -> &[String] {
        &self.defines
    }

    pub fn add_include_path(&mut self, path: impl Into<PathBuf>) {
        self.include_paths.push(path.into());
    }

    pub fn add_public_include_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.public.include_paths.push(path.clone());
        self.include_paths.push(path);
    }

    pub fn include_paths(&self) -> &[PathBuf] {
        &self.include_paths
    }

    pub fn add_library_file(&mut self, library: impl Into<String>) {
        self.library_files.push(library.into());
    }

    pub fn add_public_library_file(&mut self, library: impl Into<String>) {
        let library = library.into();
        self.public.library_files.push(library.clone());
        self.library_files.push(library);
    }

    pub fn library_files(&self) -> &[String] {
        &self.library_files
    }

    pub fn add_library_path(&mut self, path: impl Into<PathBuf>) {
        self.library_paths.push(path.into());
    }

    pub fn add_public_library_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.public.library_paths.push(path.clone());
        self.library_paths.push(path);
    }

    pub fn library_paths(&self) -> &[PathBuf] {
        &self.library_paths
    }

    pub fn add_compiler_option(&mut self, option: impl Into<String>) {
        self.compiler_options.push(option.into());
    }

    pub fn compiler_options(&self) -> &[String] {
        &self.compiler_options
    }

    pub fn add_linker_option(&mut self, option: impl Into<String>) {
        self.linker_options.push(option.into());
    }

    pub fn linker_options(&self) -> &[String] {
        &self.linker_options
    }

    pub fn add_post_build(&mut self, action: impl Into<String>) {
        self.post_build.push(action.into());
    }

    pub fn post_build(&self) -> &[String] {
        &self.post_build
    }

    /// What this Configuration exports to its dependents.
    pub fn public(&self) -> &Contribution {
        &self.public
    }

    pub fn add_public_dependency(&mut self, project: impl Into<CompactString>) {
        self.add_dependency(project.into(), Visibility::Public);
    }

    pub fn add_private_dependency(&mut self, project: impl Into<CompactString>) {
        self.add_dependency(project.into(), Visibility::Private);
    }

    /// Declares a dependency, a repeated declaration keeps the widest visibility.
    pub fn add_dependency(&mut self, project: CompactString, visibility: Visibility) {
        match self.dependencies.iter_mut().find(|dep| dep.project == project) {
            Some(existing) => {
                if visibility == Visibility::Public {
                    existing.visibility = Visibility::Public;
                }
            }
            None => self.dependencies.push(Dependency {
                project,
                visibility,
            }),
        }
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn sources(&self) -> &[SourceInput] {
        &self.sources
    }

    pub fn build_steps(&self) -> &[BuildStep] {
        &self.build_steps
    }

    // ---- resolution internals ----

    pub(crate) fn sources_mut(&mut self) -> &mut Vec<SourceInput> {
        &mut self.sources
    }

    pub(crate) fn push_build_step(&mut self, step: BuildStep) {
        self.build_steps.push(step);
    }

    pub(crate) fn set_binary_path(&mut self, path: PathBuf) {
        self.binary_path = Some(path);
    }

    pub(crate) fn export_library(&mut self, library: String) {
        self.public.library_files.push(library);
    }

    /// Merges what our dependencies export, skipping values we already have.
    pub(crate) fn inherit(&mut self, inherited: &Contribution) {
        self.include_paths
            .extend_unique(inherited.include_paths.iter().cloned());
        self.defines.extend_unique(inherited.defines.iter().cloned());
        self.library_files
            .extend_unique(inherited.library_files.iter().cloned());
        self.library_paths
            .extend_unique(inherited.library_paths.iter().cloned());
    }
}

fn define_key(define: &str) -> &str {
    define.split_once('=').map_or(define, |(key, _)| key)
}
