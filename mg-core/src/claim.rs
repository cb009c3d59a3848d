//! Claiming sources by naming convention and routing them through generated build steps.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use compact_str::CompactString;
use mg_ore::iter::ExtendUnique;
use mg_target::{DimensionKind, Target};
use smallvec::SmallVec;

use crate::configuration::{BuildStep, Configuration, SourceInput, SourceRole};
use crate::error::ResolveError;
use crate::project::{Project, SourceFile};

/// Claims every source whose file name ends with `suffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStepRule {
    pub suffix: CompactString,
    pub tool: CompactString,
    pub profile: CompactString,
    pub entry_point: CompactString,
    pub arguments: Vec<String>,
    /// Extension of the generated output, without the dot.
    pub output_extension: CompactString,
}

impl BuildStepRule {
    /// A shader compilation rule, e.g. `VS.hlsl` compiled with the `vs_5_0` profile.
    pub fn shader(suffix: &str, profile: &str) -> Self {
        BuildStepRule {
            suffix: suffix.into(),
            tool: "fxc".into(),
            profile: profile.into(),
            entry_point: "main".into(),
            arguments: vec!["/Zi".to_string(), "/nologo".to_string(), "/O2".to_string()],
            output_extension: "h".into(),
        }
    }

    /// Extension of the files this rule claims, so they get listed in the first place.
    pub fn source_extension(&self) -> Option<&str> {
        Path::new(self.suffix.as_str())
            .extension()
            .and_then(|ext| ext.to_str())
    }

    fn claims(&self, file_name: &str, case_sensitive: bool) -> bool {
        if case_sensitive {
            return file_name.ends_with(self.suffix.as_str());
        }
        let (name, suffix) = (file_name.as_bytes(), self.suffix.as_bytes());
        name.len() >= suffix.len() && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
    }
}

/// The part of a [`Target`] that keeps generated outputs of one project apart.
#[derive(Clone)]
pub enum Discriminator {
    /// Labels of these dimensions joined with `_`.
    Dimensions(SmallVec<[DimensionKind; 4]>),
    /// Caller supplied.
    Custom(Arc<dyn Fn(&Target) -> String + Send + Sync>),
}

impl Discriminator {
    /// A discriminator over `dimensions`, at least one is required.
    pub fn dimensions<I>(dimensions: I) -> Result<Self, ResolveError>
    where
        I: IntoIterator<Item = DimensionKind>,
    {
        let mut unique: Vec<DimensionKind> = Vec::new();
        unique.extend_unique(dimensions);
        if unique.is_empty() {
            return Err(ResolveError::invalid_workspace(
                "a build step discriminator needs at least one dimension",
            ));
        }
        Ok(Discriminator::Dimensions(unique.into_iter().collect()))
    }

    pub fn optimization() -> Self {
        Discriminator::Dimensions(smallvec::smallvec![DimensionKind::Optimization])
    }

    pub fn custom<F>(discriminate: F) -> Self
    where
        F: Fn(&Target) -> String + Send + Sync + 'static,
    {
        Discriminator::Custom(Arc::new(discriminate))
    }

    pub fn apply(&self, target: &Target) -> String {
        match self {
            Discriminator::Dimensions(dimensions) => dimensions
                .iter()
                .map(|kind| target.label(*kind))
                .collect::<Vec<_>>()
                .join("_"),
            Discriminator::Custom(discriminate) => discriminate(target),
        }
    }
}

impl fmt::Debug for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discriminator::Dimensions(dimensions) => {
                f.debug_tuple("Dimensions").field(dimensions).finish()
            }
            Discriminator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Applies [`BuildStepRule`]s to the Configurations of a project.
#[derive(Debug, Clone)]
pub struct BuildStepClaimer {
    output_root: PathBuf,
    discriminator: Discriminator,
    rules: Vec<BuildStepRule>,
    case_sensitive: bool,
}

impl BuildStepClaimer {
    /// Generated outputs land in `output_root/<project>_<discriminator>/`.
    pub fn new(output_root: PathBuf, discriminator: Discriminator, rules: Vec<BuildStepRule>) -> Self {
        BuildStepClaimer {
            output_root,
            discriminator,
            rules,
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn rules(&self) -> &[BuildStepRule] {
        &self.rules
    }

    /// Extensions our rules need listed, e.g. `hlsl`.
    pub fn source_extensions(&self) -> Vec<&str> {
        let mut extensions = Vec::new();
        extensions.extend_unique(self.rules.iter().filter_map(BuildStepRule::source_extension));
        extensions
    }

    /// Directory generated outputs of `project` for `target` are written to.
    pub fn output_dir(&self, project: &str, target: &Target) -> PathBuf {
        self.output_root
            .join(format!("{project}_{}", self.discriminator.apply(target)))
    }

    /// Claims matching `sources` for every Configuration of `project`.
    ///
    /// Each Configuration gets its sources set from `sources`, one [`BuildStep`] per claimed
    /// file and the generated outputs as additional inputs. Returns the number of claimed files.
    pub fn claim(
        &self,
        project: &Project,
        sources: &[SourceFile],
        configs: &mut [&mut Configuration],
    ) -> Result<usize, ResolveError> {
        let mut claimed: Vec<(&SourceFile, &BuildStepRule)> = Vec::new();
        for source in sources {
            let file_name = source
                .path
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default();
            let matching: Vec<&BuildStepRule> = self
                .rules
                .iter()
                .filter(|rule| rule.claims(&file_name, self.case_sensitive))
                .collect();

            match matching.as_slice() {
                [] => (),
                [rule] => claimed.push((source, *rule)),
                rules => {
                    let rules = rules
                        .iter()
                        .map(|rule| rule.suffix.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    return Err(ResolveError::AmbiguousBuildStepClaim {
                        project: project.name().into(),
                        file: source.path.clone(),
                        rules,
                    });
                }
            }
        }

        let mut outputs: BTreeMap<PathBuf, Target> = BTreeMap::new();
        for conf in configs.iter_mut() {
            let target = *conf.target();
            let mut inputs: Vec<SourceInput> = sources
                .iter()
                .map(|source| SourceInput {
                    path: source.path.clone(),
                    role: if source.compiled {
                        SourceRole::Compiled
                    } else {
                        SourceRole::Listed
                    },
                })
                .collect();

            if !claimed.is_empty() {
                let output_dir = self.output_dir(project.name(), &target);
                conf.add_include_path(output_dir.clone());

                for (source, rule) in &claimed {
                    let step = self.build_step(&output_dir, source, rule);
                    if let Some(first) = outputs.insert(step.output.clone(), target) {
                        return Err(ResolveError::OutputPathCollision {
                            path: step.output,
                            first: project.name().into(),
                            first_target: first,
                            second: project.name().into(),
                            second_target: target,
                        });
                    }
                    if let Some(input) = inputs.iter_mut().find(|input| input.path == source.path) {
                        input.role = SourceRole::Claimed;
                    }
                    inputs.push(SourceInput {
                        path: step.output.clone(),
                        role: SourceRole::Generated,
                    });
                    conf.push_build_step(step);
                }
            }

            conf.sources_mut().extend(inputs);
        }

        if !claimed.is_empty() {
            tracing::debug!(project = project.name(), claimed = claimed.len(), "claimed sources");
        }
        Ok(claimed.len())
    }

    fn build_step(&self, output_dir: &Path, source: &SourceFile, rule: &BuildStepRule) -> BuildStep {
        let stem = source
            .path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = output_dir.join(format!("{stem}.{}", rule.output_extension));
        let variable = format!("gpShader_{stem}");

        let mut arguments = rule.arguments.clone();
        arguments.extend([
            format!("/E\"{}\"", rule.entry_point),
            format!("/T {}", rule.profile),
            format!("/Fh\"{}\"", output.display()),
            format!("/Vn\"{variable}\""),
            format!("\"{}\"", source.path.display()),
        ]);

        BuildStep {
            input: source.path.clone(),
            description: format!("Shader ({}) : {}", rule.profile, source.path.display()),
            output,
            tool: rule.tool.clone(),
            profile: rule.profile.clone(),
            entry_point: rule.entry_point.clone(),
            arguments,
            variable,
        }
    }
}
