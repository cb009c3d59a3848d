//! Declarative definition of a workspace, parsed from [`WORKSPACE_FILENAME`].

use std::collections::BTreeMap;

use mg_cfg::Config;
use mg_target::{
    Compiler, DevEnv, Dimension, Optimization, Platform, TargetError, TargetPattern,
};
use serde::Deserialize;

use crate::configuration::{OutputKind, Visibility};

pub static WORKSPACE_FILENAME: Config<&'static str> = Config::new(
    "workspace_filename",
    "The filename of the workspace definition, at the root of the workspace.",
    "WORKSPACE.mg.toml",
);

/// Definition of a [`Workspace`].
///
/// [`Workspace`]: crate::workspace::Workspace
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceSpec {
    /// Overrides for generator settings, by name.
    #[serde(default)]
    pub settings: BTreeMap<String, toml::Value>,
    #[serde(default)]
    pub targets: TargetsSpec,
    /// Install directories checked when discovering targets, keyed by environment label.
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentSpec>,
    #[serde(default)]
    pub defaults: DefaultsSpec,
    /// Reusable layers that projects (and other profiles) extend.
    #[serde(default)]
    pub profiles: BTreeMap<String, LayerSpec>,
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectSpec>,
    #[serde(default)]
    pub build_steps: BuildStepsSpec,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub solutions: BTreeMap<String, SolutionSpec>,
    /// Mode name to the solutions it generates.
    #[serde(default)]
    pub modes: BTreeMap<String, Vec<String>>,
}

impl WorkspaceSpec {
    pub fn from_toml(raw: &str) -> Result<Self, anyhow::Error> {
        let workspace = toml::from_str(raw)?;
        Ok(workspace)
    }

    /// Our `[settings]` as `(name, value)` pairs, ready for a `ConfigSet`.
    pub fn setting_overrides(&self) -> Vec<(&str, String)> {
        self.settings
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    toml::Value::String(value) => value.clone(),
                    other => other.to_string(),
                };
                (name.as_str(), value)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetsSpec {
    /// Probe the host for installed environments instead of using `patterns` as-is.
    #[serde(default)]
    pub discover: bool,
    /// Environments to probe for, in order.
    #[serde(default)]
    pub candidates: Vec<String>,
    /// Unset dimensions take the value of the default pattern.
    #[serde(default)]
    pub patterns: Vec<PatternSpec>,
}

/// Labels per dimension, e.g. `platform = ["win32", "win64"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternSpec {
    #[serde(default)]
    pub dev_env: Vec<String>,
    #[serde(default)]
    pub platform: Vec<String>,
    #[serde(default)]
    pub compiler: Vec<String>,
    #[serde(default)]
    pub optimization: Vec<String>,
}

impl PatternSpec {
    /// Parse into a [`TargetPattern`], dimensions without labels are taken from `fallback`.
    pub fn to_pattern(&self, fallback: &TargetPattern) -> Result<TargetPattern, TargetError> {
        fn parse<D>(labels: &[String], fallback: D) -> Result<D, TargetError>
        where
            D: Dimension + std::ops::BitOr<Output = D>,
        {
            if labels.is_empty() {
                Ok(fallback)
            } else {
                TargetPattern::parse_dimension(labels)
            }
        }

        Ok(TargetPattern {
            dev_env: parse::<DevEnv>(&self.dev_env, fallback.dev_env)?,
            platform: parse::<Platform>(&self.platform, fallback.platform)?,
            compiler: parse::<Compiler>(&self.compiler, fallback.compiler)?,
            optimization: parse::<Optimization>(&self.optimization, fallback.optimization)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentSpec {
    pub install_dir: String,
    #[serde(default)]
    pub llvm_dir: Option<String>,
}

/// The base layer every project starts from. Unset templates keep their built-in default, an
/// empty string leaves the field unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultsSpec {
    pub name: Option<String>,
    pub project_file_name: Option<String>,
    pub target_file_suffix: Option<String>,
    pub project_path: Option<String>,
    pub executable_path: Option<String>,
    pub library_path: Option<String>,
    pub intermediate_path: Option<String>,

    pub solution_name: Option<String>,
    pub solution_file_name: Option<String>,
    pub solution_path: Option<String>,

    #[serde(flatten)]
    pub layer: LayerSpec,
}

/// Settings appended to a Configuration, every string may contain placeholders.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayerSpec {
    /// Profiles applied before this layer, outermost first.
    #[serde(default)]
    pub extends: Vec<String>,

    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub public_defines: Vec<String>,
    /// `KEY = "value"`, rewrites an earlier `KEY=...` define.
    #[serde(default)]
    pub define_overrides: BTreeMap<String, String>,
    #[serde(default)]
    pub include_paths: Vec<String>,
    #[serde(default)]
    pub public_include_paths: Vec<String>,
    #[serde(default)]
    pub library_files: Vec<String>,
    #[serde(default)]
    pub public_library_files: Vec<String>,
    #[serde(default)]
    pub library_paths: Vec<String>,
    #[serde(default)]
    pub public_library_paths: Vec<String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default)]
    pub compiler_options: Vec<String>,
    #[serde(default)]
    pub linker_options: Vec<String>,
    #[serde(default)]
    pub post_build: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,

    /// Layers only applied to the targets they match.
    #[serde(default)]
    pub when: Vec<WhenSpec>,

    /// Keys nothing else claimed. `deny_unknown_fields` doesn't work through `flatten`, so
    /// these are rejected when the layer is compiled.
    #[serde(flatten)]
    pub unknown: BTreeMap<String, toml::Value>,
}

/// The filter has to come first, it takes the dimension keys before the layer sees the rest.
#[derive(Debug, Clone, Deserialize)]
pub struct WhenSpec {
    #[serde(flatten)]
    pub filter: PatternSpec,
    #[serde(flatten)]
    pub layer: LayerSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencySpec {
    pub project: String,
    #[serde(default)]
    pub visibility: Visibility,
    /// Only depend on `project` for the targets this matches.
    #[serde(default)]
    pub when: Option<PatternSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSpec {
    pub kind: OutputKind,
    pub source_root: Option<String>,
    #[serde(default)]
    pub additional_source_roots: Vec<String>,
    #[serde(default)]
    pub source_files: Vec<String>,
    #[serde(default)]
    pub resource_files: Vec<String>,
    #[serde(default)]
    pub source_extensions: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub build_exclude: Vec<String>,
    /// Narrows the workspace targets this project supports.
    pub targets: Option<PatternSpec>,

    #[serde(flatten)]
    pub layer: LayerSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildStepsSpec {
    /// Relative to the generated directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Dimensions that keep the outputs of different Configurations apart.
    #[serde(default = "default_discriminator")]
    pub discriminator: Vec<String>,
}

impl Default for BuildStepsSpec {
    fn default() -> Self {
        BuildStepsSpec {
            output_dir: default_output_dir(),
            discriminator: default_discriminator(),
        }
    }
}

fn default_output_dir() -> String {
    "Shaders".to_string()
}

fn default_discriminator() -> Vec<String> {
    ["DevEnv", "Platform", "Compiler", "Optimization"]
        .map(String::from)
        .to_vec()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub suffix: String,
    pub profile: String,
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    #[serde(default = "default_tool")]
    pub tool: String,
    #[serde(default = "default_arguments")]
    pub arguments: Vec<String>,
    #[serde(default = "default_output_extension")]
    pub output_extension: String,
}

fn default_entry_point() -> String {
    "main".to_string()
}

fn default_tool() -> String {
    "fxc".to_string()
}

fn default_arguments() -> Vec<String> {
    ["/Zi", "/nologo", "/O2"].map(String::from).to_vec()
}

fn default_output_extension() -> String {
    "h".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolutionSpec {
    /// Narrows the workspace targets this solution is realised for.
    #[serde(default)]
    pub targets: Option<PatternSpec>,
    /// Solutions whose projects are listed before ours.
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub projects: Vec<SolutionProjectSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SolutionProjectSpec {
    Name(String),
    Entry {
        project: String,
        #[serde(default)]
        folder: Option<String>,
    },
}

impl SolutionProjectSpec {
    pub fn project(&self) -> &str {
        match self {
            SolutionProjectSpec::Name(project) | SolutionProjectSpec::Entry { project, .. } => {
                project
            }
        }
    }

    pub fn folder(&self) -> Option<&str> {
        match self {
            SolutionProjectSpec::Name(_) => None,
            SolutionProjectSpec::Entry { folder, .. } => folder.as_deref(),
        }
    }
}
