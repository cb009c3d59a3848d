//! Ordered composition of configuration mutators.
//!
//! A [`MutatorChain`] always starts with a [`BaseLayer`], more specific declarations append
//! further mutators that run after everything before them.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use compact_str::CompactString;
use mg_target::Target;
use mg_template::{Bindings, Template};

use crate::configuration::{Configuration, OutputKind};
use crate::error::ResolveError;
use crate::project::Project;
use crate::Templates;

/// A single mutator, only a function of the Configuration built so far and its scope.
pub type MutatorFn =
    dyn Fn(&mut Configuration, &MutatorScope<'_>) -> Result<(), ResolveError> + Send + Sync;

/// What a mutator may read while it runs.
pub struct MutatorScope<'a> {
    project: &'a Project,
    target: &'a Target,
    templates: &'a Templates,
}

impl<'a> MutatorScope<'a> {
    pub fn new(project: &'a Project, target: &'a Target, templates: &'a Templates) -> Self {
        MutatorScope {
            project,
            target,
            templates,
        }
    }

    pub fn project(&self) -> &Project {
        self.project
    }

    pub fn target(&self) -> &Target {
        self.target
    }

    pub fn templates(&self) -> &Templates {
        self.templates
    }

    /// Render a compiled template, `field` names the Configuration field it is for.
    pub fn render(&self, field: &str, template: &Template) -> Result<String, ResolveError> {
        self.templates
            .render(template, &self.bindings())
            .map_err(|source| self.placeholder_error(field, source))
    }

    /// Render a compiled template into a path anchored at the workspace root.
    pub fn render_path(&self, field: &str, template: &Template) -> Result<PathBuf, ResolveError> {
        self.templates
            .render_path(template, &self.bindings())
            .map_err(|source| self.placeholder_error(field, source))
    }

    /// Compile and render `raw` in one go, for mutators written directly in Rust.
    pub fn resolve(&self, field: &str, raw: &str) -> Result<String, ResolveError> {
        self.templates
            .resolve(raw, &self.bindings())
            .map_err(|source| self.placeholder_error(field, source))
    }

    /// Like [`MutatorScope::resolve`], anchored at the workspace root.
    pub fn resolve_path(&self, field: &str, raw: &str) -> Result<PathBuf, ResolveError> {
        let rendered = self.resolve(field, raw)?;
        Ok(self.templates.roots().join(rendered))
    }

    fn bindings(&self) -> Bindings<'_, Project, crate::solution::Solution> {
        Bindings::new().project(self.project).target(self.target)
    }

    fn placeholder_error(&self, field: &str, source: mg_template::TemplateError) -> ResolveError {
        ResolveError::UnresolvedPlaceholder {
            owner: self.project.name().into(),
            target: Some(*self.target),
            field: field.into(),
            source,
        }
    }
}

/// Raw templates for the fields every Configuration must end up with.
///
/// A field left at `None` (or empty) is never set by the base, some later mutator has to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePaths {
    pub name: Option<String>,
    /// Without extension, the emitter appends the one of the format it writes.
    pub project_file_name: Option<String>,
    pub target_file_suffix: Option<String>,
    pub project_path: Option<String>,
    pub executable_path: Option<String>,
    pub library_path: Option<String>,
    pub intermediate_path: Option<String>,
}

impl Default for BasePaths {
    fn default() -> Self {
        let some = |raw: &str| Some(raw.to_string());
        BasePaths {
            name: some("[target.Compiler]_[target.Optimization]"),
            project_file_name: some("[project.Name]"),
            target_file_suffix: some("_[target.Optimization]"),
            project_path: some("_projects/[target.DevEnv]"),
            executable_path: some("_Bin/[target.DevEnv]_[target.Compiler]_[target.Platform]"),
            library_path: some("_generated/Libs/[target.DevEnv]_[target.Compiler]_[target.Platform]"),
            intermediate_path: some(
                "_intermediate/[target.DevEnv]_[target.Compiler]_[target.Platform]_[target.Optimization]/[project.Name]",
            ),
        }
    }
}

/// The first mutator of every chain, sets output locations and the output kind.
#[derive(Debug, Clone)]
pub struct BaseLayer {
    name: Option<Template>,
    project_file_name: Option<Template>,
    target_file_suffix: Option<Template>,
    project_path: Option<Template>,
    executable_path: Option<Template>,
    library_path: Option<Template>,
    intermediate_path: Option<Template>,
}

impl BaseLayer {
    /// Compile every template of `paths`, an unknown placeholder fails here rather than during
    /// resolution.
    pub fn compile(templates: &Templates, paths: &BasePaths) -> Result<Self, ResolveError> {
        let compile = |field: &str, raw: &Option<String>| -> Result<Option<Template>, ResolveError> {
            let Some(raw) = raw.as_deref().filter(|raw| !raw.is_empty()) else {
                return Ok(None);
            };
            templates
                .compile(raw)
                .map(Some)
                .map_err(|source| ResolveError::UnresolvedPlaceholder {
                    owner: "defaults".into(),
                    target: None,
                    field: field.into(),
                    source,
                })
        };

        Ok(BaseLayer {
            name: compile("name", &paths.name)?,
            project_file_name: compile("project_file_name", &paths.project_file_name)?,
            target_file_suffix: compile("target_file_suffix", &paths.target_file_suffix)?,
            project_path: compile("project_path", &paths.project_path)?,
            executable_path: compile("executable_path", &paths.executable_path)?,
            library_path: compile("library_path", &paths.library_path)?,
            intermediate_path: compile("intermediate_path", &paths.intermediate_path)?,
        })
    }

    fn apply(&self, conf: &mut Configuration, scope: &MutatorScope<'_>) -> Result<(), ResolveError> {
        let kind = scope.project().kind();

        if let Some(name) = &self.name {
            conf.set_name(scope.render("name", name)?);
        }
        if let Some(file_name) = &self.project_file_name {
            conf.set_project_file_name(scope.render("project_file_name", file_name)?);
        }
        if let Some(suffix) = &self.target_file_suffix {
            conf.set_target_file_suffix(scope.render("target_file_suffix", suffix)?);
        }
        if let Some(path) = &self.project_path {
            conf.set_project_path(scope.render_path("project_path", path)?);
        }
        let target_path = match kind {
            OutputKind::Executable => &self.executable_path,
            OutputKind::Library => &self.library_path,
        };
        if let Some(path) = target_path {
            conf.set_target_path(scope.render_path("target_path", path)?);
        }
        if let Some(path) = &self.intermediate_path {
            conf.set_intermediate_path(scope.render_path("intermediate_path", path)?);
        }
        conf.set_output(kind);

        Ok(())
    }
}

/// An ordered list of mutators, run first to last for every (project, target) pair.
#[derive(Clone)]
pub struct MutatorChain {
    base: Arc<BaseLayer>,
    steps: Vec<(CompactString, Arc<MutatorFn>)>,
}

impl MutatorChain {
    pub fn new(base: Arc<BaseLayer>) -> Self {
        MutatorChain {
            base,
            steps: Vec::new(),
        }
    }

    /// Appends a mutator that runs after every mutator already in the chain.
    pub fn then<F>(mut self, label: impl Into<CompactString>, mutator: F) -> Self
    where
        F: Fn(&mut Configuration, &MutatorScope<'_>) -> Result<(), ResolveError>
            + Send
            + Sync
            + 'static,
    {
        self.steps.push((label.into(), Arc::new(mutator)));
        self
    }

    /// Appends an already shared mutator.
    pub fn then_shared(mut self, label: impl Into<CompactString>, mutator: Arc<MutatorFn>) -> Self {
        self.steps.push((label.into(), mutator));
        self
    }

    /// Labels of the mutators after the base, in the order they run.
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.steps.iter().map(|(label, _)| label.as_str())
    }

    /// Runs the base and then every mutator in order.
    pub fn apply(&self, conf: &mut Configuration, scope: &MutatorScope<'_>) -> Result<(), ResolveError> {
        self.base.apply(conf, scope)?;
        for (label, mutator) in &self.steps {
            tracing::trace!(project = scope.project().name(), %label, "applying mutator");
            mutator(conf, scope)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MutatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entry(&"base")
            .entries(self.labels())
            .finish()
    }
}
