//! A workspace: projects, solutions and modes over one target matrix.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use compact_str::CompactString;
use mg_target::{
    DevEnv, Dimension, DimensionKind, EnvironmentProbe, Target, TargetError, TargetMatrix,
    TargetPattern,
};
use mg_template::Template;

use crate::claim::{BuildStepClaimer, BuildStepRule, Discriminator};
use crate::configuration::{Configuration, Visibility};
use crate::defs::{LayerSpec, PatternSpec, ProjectSpec, WorkspaceSpec};
use crate::error::ResolveError;
use crate::mutator::{BaseLayer, BasePaths, MutatorChain, MutatorScope};
use crate::project::{Project, ProjectBuilder};
use crate::solution::{Solution, SolutionBuilder, SolutionPaths};
use crate::Templates;

/// Environments probed when discovering targets without explicit candidates.
const DEFAULT_CANDIDATES: DevEnv = DevEnv::VS2017.union(DevEnv::VS2019).union(DevEnv::VS2022);

#[derive(Debug)]
pub struct Workspace {
    templates: Templates,
    matrix: TargetMatrix,
    claimer: BuildStepClaimer,
    projects: BTreeMap<CompactString, Project>,
    solutions: BTreeMap<CompactString, Solution>,
    modes: BTreeMap<CompactString, Vec<CompactString>>,
}

impl Workspace {
    pub fn new(templates: Templates, matrix: TargetMatrix, claimer: BuildStepClaimer) -> Self {
        Workspace {
            templates,
            matrix,
            claimer,
            projects: BTreeMap::new(),
            solutions: BTreeMap::new(),
            modes: BTreeMap::new(),
        }
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    pub fn matrix(&self) -> &TargetMatrix {
        &self.matrix
    }

    pub fn claimer(&self) -> &BuildStepClaimer {
        &self.claimer
    }

    pub fn projects(&self) -> &BTreeMap<CompactString, Project> {
        &self.projects
    }

    pub fn solutions(&self) -> &BTreeMap<CompactString, Solution> {
        &self.solutions
    }

    pub fn modes(&self) -> &BTreeMap<CompactString, Vec<CompactString>> {
        &self.modes
    }

    pub fn project(&self, name: &str) -> Result<&Project, ResolveError> {
        self.projects
            .get(name)
            .ok_or_else(|| ResolveError::UnknownProject {
                name: name.into(),
                referenced_by: "workspace".into(),
            })
    }

    pub fn solution(&self, name: &str) -> Result<&Solution, ResolveError> {
        self.solutions
            .get(name)
            .ok_or_else(|| ResolveError::UnknownSolution { name: name.into() })
    }

    /// The solutions generated by `mode`.
    ///
    /// Without any declared modes `all` selects every solution.
    pub fn mode(&self, name: &str) -> Result<Vec<&Solution>, ResolveError> {
        if self.modes.is_empty() && name == "all" {
            return Ok(self.solutions.values().collect());
        }
        let solutions = self.modes.get(name).ok_or_else(|| {
            let mut known: Vec<&str> = self.modes.keys().map(|mode| mode.as_str()).collect();
            if known.is_empty() {
                known.push("all");
            }
            ResolveError::UnknownMode {
                name: name.into(),
                known: known.join(", "),
            }
        })?;
        solutions.iter().map(|solution| self.solution(solution)).collect()
    }

    pub fn add_project(&mut self, project: Project) -> Result<(), ResolveError> {
        let name = CompactString::from(project.name());
        if self.projects.contains_key(&name) {
            return Err(ResolveError::invalid_workspace(format!(
                "project '{name}' is declared more than once"
            )));
        }
        self.projects.insert(name, project);
        Ok(())
    }

    /// Builds and adds a solution, every project it lists must already be added.
    pub fn add_solution(&mut self, builder: SolutionBuilder) -> Result<(), ResolveError> {
        let solution = builder.build(&self.templates, &self.projects)?;
        self.solutions
            .insert(CompactString::from(solution.name()), solution);
        Ok(())
    }

    pub fn add_mode<I, S>(&mut self, name: impl Into<CompactString>, solutions: I) -> Result<(), ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        let solutions: Vec<CompactString> = solutions.into_iter().map(Into::into).collect();
        for solution in &solutions {
            self.solution(solution)?;
        }
        self.modes.insert(name.into(), solutions);
        Ok(())
    }

    /// Checks every dependency edge of every project names a known project.
    pub fn validate(&self) -> Result<(), ResolveError> {
        for project in self.projects.values() {
            for edge in project.dependencies() {
                if !self.projects.contains_key(&edge.project) {
                    return Err(ResolveError::UnknownProject {
                        name: edge.project.clone(),
                        referenced_by: project.name().into(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Compiles a declarative [`WorkspaceSpec`].
    ///
    /// Every template is compiled here, so unknown placeholders, patterns, labels and
    /// references fail before anything is resolved.
    pub fn from_spec(
        spec: &WorkspaceSpec,
        templates: Templates,
        probe: &dyn EnvironmentProbe,
        case_sensitive_claims: bool,
    ) -> Result<Self, ResolveError> {
        let matrix = matrix_from_spec(spec, probe)?;
        let claimer = claimer_from_spec(spec, &templates)?.case_sensitive(case_sensitive_claims);
        let mut workspace = Workspace::new(templates, matrix, claimer);

        let defaults = &spec.defaults;
        if !defaults.layer.extends.is_empty() {
            return Err(ResolveError::invalid_workspace(
                "'defaults' cannot extend profiles",
            ));
        }
        let builtin = BasePaths::default();
        let pick = |value: &Option<String>, builtin: Option<String>| value.clone().or(builtin);
        let base_paths = BasePaths {
            name: pick(&defaults.name, builtin.name),
            project_file_name: pick(&defaults.project_file_name, builtin.project_file_name),
            target_file_suffix: pick(&defaults.target_file_suffix, builtin.target_file_suffix),
            project_path: pick(&defaults.project_path, builtin.project_path),
            executable_path: pick(&defaults.executable_path, builtin.executable_path),
            library_path: pick(&defaults.library_path, builtin.library_path),
            intermediate_path: pick(&defaults.intermediate_path, builtin.intermediate_path),
        };
        let base = Arc::new(BaseLayer::compile(&workspace.templates, &base_paths)?);
        let default_layer = Arc::new(Layer::compile("defaults", &defaults.layer, &workspace.templates)?);

        let mut profiles: BTreeMap<&str, Arc<Layer>> = BTreeMap::new();
        for (name, profile) in &spec.profiles {
            let layer = Layer::compile(name, profile, &workspace.templates)?;
            profiles.insert(name.as_str(), Arc::new(layer));
        }

        for (name, project_spec) in &spec.projects {
            let mut chain = MutatorChain::new(Arc::clone(&base)).then_shared(
                "defaults",
                default_layer.clone().into_mutator(),
            );
            for profile in profile_chain(spec, name, &project_spec.layer.extends)? {
                let layer = &profiles[profile];
                chain = chain.then_shared(format!("profile:{profile}"), layer.clone().into_mutator());
            }
            let own = Arc::new(Layer::compile(name, &project_spec.layer, &workspace.templates)?);
            chain = chain.then_shared(name.as_str(), own.into_mutator());

            let project = project_from_spec(name, project_spec)?
                .build(workspace.templates.roots(), chain)?;
            workspace.add_project(project)?;
        }

        // Dependencies declared in layers only surface during resolution, check them now.
        let layers = std::iter::once(("defaults", &defaults.layer))
            .chain(spec.profiles.iter().map(|(name, layer)| (name.as_str(), layer)))
            .chain(spec.projects.iter().map(|(name, project)| (name.as_str(), &project.layer)));
        for (owner, layer) in layers {
            check_dependencies(owner, layer, &workspace.projects)?;
        }

        let solution_paths = SolutionPaths {
            name: defaults.solution_name.clone().unwrap_or_else(|| SolutionPaths::default().name),
            file_name: defaults
                .solution_file_name
                .clone()
                .unwrap_or_else(|| SolutionPaths::default().file_name),
            path: defaults.solution_path.clone().unwrap_or_else(|| SolutionPaths::default().path),
        };
        for (name, solution) in &spec.solutions {
            let targets = match &solution.targets {
                Some(filter) => filter.to_pattern(&TargetPattern::any())?,
                None => TargetPattern::any(),
            };
            let mut builder = SolutionBuilder::new(name.as_str())
                .targets(targets)
                .paths(solution_paths.clone());
            for (project, folder) in solution_entries(spec, name.as_str(), &mut Vec::new())? {
                builder = builder.project(project, folder);
            }
            workspace.add_solution(builder)?;
        }

        for (mode, solutions) in &spec.modes {
            workspace.add_mode(mode.as_str(), solutions.iter().map(String::as_str))?;
        }

        workspace.validate()?;
        tracing::info!(
            projects = workspace.projects.len(),
            solutions = workspace.solutions.len(),
            targets = workspace.matrix.targets().len(),
            "loaded workspace"
        );
        Ok(workspace)
    }

    /// Every target of the matrix that `project` supports.
    pub fn targets_of(&self, project: &Project) -> Vec<Target> {
        self.matrix
            .targets()
            .into_iter()
            .filter(|target| project.supports(target))
            .collect()
    }
}

fn matrix_from_spec(spec: &WorkspaceSpec, probe: &dyn EnvironmentProbe) -> Result<TargetMatrix, ResolveError> {
    let fallback = TargetPattern::default();
    let patterns = spec
        .targets
        .patterns
        .iter()
        .map(|pattern| pattern.to_pattern(&fallback))
        .collect::<Result<Vec<_>, _>>()?;

    if spec.targets.discover {
        let candidates = if spec.targets.candidates.is_empty() {
            DEFAULT_CANDIDATES
        } else {
            TargetPattern::parse_dimension::<DevEnv, _>(&spec.targets.candidates)?
        };
        let base = patterns.first().copied().unwrap_or(fallback);
        return Ok(TargetMatrix::discover(probe, candidates, base));
    }

    if patterns.is_empty() {
        Ok(TargetMatrix::full(fallback))
    } else {
        Ok(TargetMatrix::curated(patterns))
    }
}

fn claimer_from_spec(spec: &WorkspaceSpec, templates: &Templates) -> Result<BuildStepClaimer, ResolveError> {
    let dimensions = spec
        .build_steps
        .discriminator
        .iter()
        .map(|name| {
            DimensionKind::from_name(name).ok_or_else(|| {
                ResolveError::invalid_workspace(format!("unknown discriminator dimension '{name}'"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let discriminator = Discriminator::dimensions(dimensions)?;

    let rules = spec
        .rules
        .iter()
        .map(|rule| BuildStepRule {
            suffix: rule.suffix.as_str().into(),
            tool: rule.tool.as_str().into(),
            profile: rule.profile.as_str().into(),
            entry_point: rule.entry_point.as_str().into(),
            arguments: rule.arguments.clone(),
            output_extension: rule.output_extension.trim_start_matches('.').into(),
        })
        .collect();

    let output_root = templates.roots().generated().join(&spec.build_steps.output_dir);
    Ok(BuildStepClaimer::new(output_root, discriminator, rules))
}

fn project_from_spec(name: &str, spec: &ProjectSpec) -> Result<ProjectBuilder, ResolveError> {
    let mut builder = ProjectBuilder::new(name, spec.kind);
    if let Some(root) = &spec.source_root {
        builder = builder.source_root(root);
    }
    for root in &spec.additional_source_roots {
        builder = builder.additional_source_root(root);
    }
    for file in &spec.source_files {
        builder = builder.source_file(file);
    }
    for file in &spec.resource_files {
        builder = builder.resource_file(file);
    }
    for extension in &spec.source_extensions {
        builder = builder.source_extension(extension);
    }
    for pattern in &spec.include {
        builder = builder.include(pattern.as_str());
    }
    for pattern in &spec.exclude {
        builder = builder.exclude(pattern.as_str());
    }
    for pattern in &spec.build_exclude {
        builder = builder.build_exclude(pattern.as_str());
    }
    if let Some(targets) = &spec.targets {
        builder = builder.targets(vec![targets.to_pattern(&TargetPattern::any())?]);
    }
    Ok(builder)
}

/// Profiles `extends` expands to, outermost first and each at most once.
fn profile_chain<'s>(
    spec: &'s WorkspaceSpec,
    owner: &str,
    extends: &'s [String],
) -> Result<Vec<&'s str>, ResolveError> {
    fn visit<'s>(
        spec: &'s WorkspaceSpec,
        owner: &str,
        name: &'s str,
        stack: &mut Vec<&'s str>,
        out: &mut Vec<&'s str>,
    ) -> Result<(), ResolveError> {
        if stack.contains(&name) {
            return Err(ResolveError::invalid_workspace(format!(
                "profile cycle: {} -> {name}",
                stack.join(" -> ")
            )));
        }
        if out.contains(&name) {
            return Ok(());
        }
        let profile = spec.profiles.get(name).ok_or_else(|| {
            ResolveError::invalid_workspace(format!("'{owner}' extends unknown profile '{name}'"))
        })?;

        stack.push(name);
        for parent in &profile.extends {
            visit(spec, name, parent, stack, out)?;
        }
        stack.pop();
        out.push(name);
        Ok(())
    }

    let mut out = Vec::new();
    for name in extends {
        visit(spec, owner, name, &mut Vec::new(), &mut out)?;
    }
    Ok(out)
}

/// Entries of solution `name`, those of included solutions first.
fn solution_entries<'s>(
    spec: &'s WorkspaceSpec,
    name: &'s str,
    stack: &mut Vec<&'s str>,
) -> Result<Vec<(&'s str, Option<&'s str>)>, ResolveError> {
    if stack.contains(&name) {
        return Err(ResolveError::invalid_workspace(format!(
            "solution include cycle: {} -> {name}",
            stack.join(" -> ")
        )));
    }
    let solution = spec
        .solutions
        .get(name)
        .ok_or_else(|| ResolveError::UnknownSolution { name: name.into() })?;

    stack.push(name);
    let mut entries = Vec::new();
    for included in &solution.include {
        entries.extend(solution_entries(spec, included, stack)?);
    }
    stack.pop();

    entries.extend(
        solution
            .projects
            .iter()
            .map(|entry| (entry.project(), entry.folder())),
    );
    Ok(entries)
}

fn check_dependencies(
    owner: &str,
    layer: &LayerSpec,
    projects: &BTreeMap<CompactString, Project>,
) -> Result<(), ResolveError> {
    for dependency in &layer.dependencies {
        if !projects.contains_key(dependency.project.as_str()) {
            return Err(ResolveError::UnknownProject {
                name: dependency.project.as_str().into(),
                referenced_by: owner.into(),
            });
        }
    }
    for when in &layer.when {
        check_dependencies(owner, &when.layer, projects)?;
    }
    Ok(())
}

/// A declarative layer with its templates compiled, applied as one mutator.
#[derive(Debug)]
struct Layer {
    defines: Vec<Template>,
    public_defines: Vec<Template>,
    define_overrides: Vec<(String, Template)>,
    include_paths: Vec<Template>,
    public_include_paths: Vec<Template>,
    library_files: Vec<Template>,
    public_library_files: Vec<Template>,
    library_paths: Vec<Template>,
    public_library_paths: Vec<Template>,
    options: Vec<(String, Template)>,
    compiler_options: Vec<Template>,
    linker_options: Vec<Template>,
    post_build: Vec<Template>,
    dependencies: Vec<(CompactString, Visibility, TargetPattern)>,
    when: Vec<(TargetPattern, Layer)>,
}

impl Layer {
    fn compile(owner: &str, spec: &LayerSpec, templates: &Templates) -> Result<Self, ResolveError> {
        if let Some(key) = spec.unknown.keys().next() {
            return Err(ResolveError::invalid_workspace(format!(
                "'{owner}' has unknown key '{key}'"
            )));
        }
        let compile = |field: &str, raw: &str| {
            templates
                .compile(raw)
                .map_err(|source| ResolveError::UnresolvedPlaceholder {
                    owner: owner.into(),
                    target: None,
                    field: field.into(),
                    source,
                })
        };
        let all = |field: &str, raws: &[String]| -> Result<Vec<Template>, ResolveError> {
            raws.iter().map(|raw| compile(field, raw)).collect()
        };
        let keyed = |field: &str, raws: &BTreeMap<String, String>| -> Result<Vec<(String, Template)>, ResolveError> {
            raws.iter()
                .map(|(key, raw)| compile(field, raw).map(|template| (key.clone(), template)))
                .collect()
        };
        let filter = |pattern: &PatternSpec| pattern.to_pattern(&TargetPattern::any());

        let mut dependencies = Vec::with_capacity(spec.dependencies.len());
        for dep in &spec.dependencies {
            let filter = match &dep.when {
                Some(when) => filter(when)?,
                None => TargetPattern::any(),
            };
            dependencies.push((CompactString::from(dep.project.as_str()), dep.visibility, filter));
        }

        let mut when = Vec::with_capacity(spec.when.len());
        for block in &spec.when {
            if !block.layer.extends.is_empty() {
                return Err(ResolveError::invalid_workspace(format!(
                    "'{owner}' uses 'extends' inside a 'when' block"
                )));
            }
            when.push((filter(&block.filter)?, Layer::compile(owner, &block.layer, templates)?));
        }

        Ok(Layer {
            defines: all("defines", &spec.defines)?,
            public_defines: all("public_defines", &spec.public_defines)?,
            define_overrides: keyed("define_overrides", &spec.define_overrides)?,
            include_paths: all("include_paths", &spec.include_paths)?,
            public_include_paths: all("public_include_paths", &spec.public_include_paths)?,
            library_files: all("library_files", &spec.library_files)?,
            public_library_files: all("public_library_files", &spec.public_library_files)?,
            library_paths: all("library_paths", &spec.library_paths)?,
            public_library_paths: all("public_library_paths", &spec.public_library_paths)?,
            options: keyed("options", &spec.options)?,
            compiler_options: all("compiler_options", &spec.compiler_options)?,
            linker_options: all("linker_options", &spec.linker_options)?,
            post_build: all("post_build", &spec.post_build)?,
            dependencies,
            when,
        })
    }

    fn apply(&self, conf: &mut Configuration, scope: &MutatorScope<'_>) -> Result<(), ResolveError> {
        for define in &self.defines {
            conf.add_define(scope.render("defines", define)?);
        }
        for define in &self.public_defines {
            conf.add_public_define(scope.render("public_defines", define)?);
        }
        for (key, value) in &self.define_overrides {
            conf.override_define(key, &scope.render("define_overrides", value)?);
        }
        for path in &self.include_paths {
            conf.add_include_path(scope.render_path("include_paths", path)?);
        }
        for path in &self.public_include_paths {
            conf.add_public_include_path(scope.render_path("public_include_paths", path)?);
        }
        for library in &self.library_files {
            conf.add_library_file(scope.render("library_files", library)?);
        }
        for library in &self.public_library_files {
            conf.add_public_library_file(scope.render("public_library_files", library)?);
        }
        for path in &self.library_paths {
            conf.add_library_path(scope.render_path("library_paths", path)?);
        }
        for path in &self.public_library_paths {
            conf.add_public_library_path(scope.render_path("public_library_paths", path)?);
        }
        for (key, value) in &self.options {
            conf.set_option(key.as_str(), scope.render("options", value)?);
        }
        for option in &self.compiler_options {
            conf.add_compiler_option(scope.render("compiler_options", option)?);
        }
        for option in &self.linker_options {
            conf.add_linker_option(scope.render("linker_options", option)?);
        }
        for action in &self.post_build {
            conf.add_post_build(scope.render("post_build", action)?);
        }
        for (project, visibility, filter) in &self.dependencies {
            if filter.matches(scope.target()) {
                conf.add_dependency(project.clone(), *visibility);
            }
        }

        for (filter, layer) in &self.when {
            if filter.matches(scope.target()) {
                layer.apply(conf, scope)?;
            }
        }
        Ok(())
    }

    fn into_mutator(self: Arc<Self>) -> Arc<crate::mutator::MutatorFn> {
        Arc::new(move |conf: &mut Configuration, scope: &MutatorScope<'_>| self.apply(conf, scope))
    }
}

/// The `[environments]` of `spec` as input for a [`mg_target::DirectoryProbe`].
pub fn environments_from_spec(
    spec: &WorkspaceSpec,
) -> Result<Vec<(DevEnv, PathBuf, Option<PathBuf>)>, ResolveError> {
    let mut environments = Vec::with_capacity(spec.environments.len());
    for (label, env) in &spec.environments {
        let dev_env = DevEnv::from_label(label).ok_or_else(|| TargetError::UnknownLabel {
            dimension: DevEnv::NAME,
            label: label.clone(),
        })?;
        environments.push((
            dev_env,
            PathBuf::from(&env.install_dir),
            env.llvm_dir.as_ref().map(PathBuf::from),
        ));
    }
    Ok(environments)
}

#[cfg(test)]
mod tests {
    use mg_target::{Compiler, Optimization, Platform, RootPaths, StaticProbe};

    use super::*;

    fn load(raw: &str, probe: &StaticProbe) -> Result<Workspace, ResolveError> {
        let spec = WorkspaceSpec::from_toml(raw).unwrap();
        let templates = crate::templates(RootPaths::new("/ws", "_generated"));
        Workspace::from_spec(&spec, templates, probe, false)
    }

    const WORKSPACE: &str = r#"
[targets]
discover = true

[defaults]
defines = ["_HAS_EXCEPTIONS=0"]

[[defaults.when]]
compiler = ["Clang"]
options = { PlatformToolset = "ClangCL" }

[profiles.imgui]
public_include_paths = ["Code/ThirdParty/DearImgui"]

[profiles.index32]
extends = ["imgui"]
public_defines = ["ImDrawIdx=unsigned int"]

[projects.DearImguiIndex32Lib]
kind = "library"
extends = ["index32"]

[projects.SampleIndex32Bits]
kind = "executable"
extends = ["index32"]
dependencies = [{ project = "DearImguiIndex32Lib" }]

[solutions.netImgui_Sample]
projects = [{ project = "SampleIndex32Bits", folder = "Samples" }]

[solutions.netImgui_All]
include = ["netImgui_Sample"]

[modes]
all = ["netImgui_All", "netImgui_Sample"]
samples = ["netImgui_Sample"]
"#;

    #[test]
    fn smoketest_from_spec() {
        let probe = StaticProbe::new(DevEnv::VS2019 | DevEnv::VS2022, DevEnv::VS2022);
        let workspace = load(WORKSPACE, &probe).unwrap();

        assert_eq!(workspace.matrix().targets().len(), 12);
        assert_eq!(workspace.projects().len(), 2);
        let chain = format!("{:?}", workspace.project("SampleIndex32Bits").unwrap().chain());
        assert_eq!(
            chain,
            r#"["base", "defaults", "profile:imgui", "profile:index32", "SampleIndex32Bits"]"#
        );

        let all = workspace.solution("netImgui_All").unwrap();
        assert_eq!(all.entries().len(), 1);
        assert_eq!(all.entries()[0].folder.as_deref(), Some("Samples"));

        let names: Vec<_> = workspace.mode("all").unwrap().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["netImgui_All", "netImgui_Sample"]);
        assert!(matches!(
            workspace.mode("server"),
            Err(ResolveError::UnknownMode { ref known, .. }) if known == "all, samples"
        ));
    }

    #[test]
    fn smoketest_layers_apply_in_order() {
        let probe = StaticProbe::new(DevEnv::VS2022, DevEnv::VS2022);
        let workspace = load(WORKSPACE, &probe).unwrap();
        let project = workspace.project("SampleIndex32Bits").unwrap();
        let target = Target::new(DevEnv::VS2022, Platform::WIN32, Compiler::CLANG, Optimization::DEBUG).unwrap();

        let conf = crate::resolver::Resolver::new(workspace.templates())
            .resolve(project, &target)
            .unwrap();
        assert_eq!(conf.defines(), ["_HAS_EXCEPTIONS=0", "ImDrawIdx=unsigned int"]);
        assert_eq!(conf.option("PlatformToolset"), Some("ClangCL"));
        assert_eq!(
            conf.include_paths(),
            [PathBuf::from("/ws/Code/ThirdParty/DearImgui")]
        );
        assert_eq!(conf.dependencies()[0].project, "DearImguiIndex32Lib");
    }

    #[test]
    fn smoketest_invalid_references() {
        let probe = StaticProbe::new(DevEnv::VS2019, DevEnv::empty());

        let raw = "[projects.App]\nkind = \"executable\"\nextends = [\"missing\"]\n";
        let err = load(raw, &probe).unwrap_err();
        assert_eq!(err.to_string(), "invalid workspace: 'App' extends unknown profile 'missing'");

        let raw = "[profiles.a]\nextends = [\"b\"]\n[profiles.b]\nextends = [\"a\"]\n[projects.App]\nkind = \"executable\"\nextends = [\"a\"]\n";
        let err = load(raw, &probe).unwrap_err();
        assert_eq!(err.to_string(), "invalid workspace: profile cycle: a -> b -> a");

        let raw = "[projects.App]\nkind = \"executable\"\ndependencies = [{ project = \"Lib\" }]\n";
        let err = load(raw, &probe).unwrap_err();
        assert_eq!(err.to_string(), "'App' references unknown project 'Lib'");

        let raw = "[projects.App]\nkind = \"executable\"\ndefines = [\"[project.Nmae]\"]\n";
        let err = load(raw, &probe).unwrap_err();
        assert!(matches!(err, ResolveError::UnresolvedPlaceholder { ref field, .. } if field == "defines"));

        let raw = "[build_steps]\ndiscriminator = []\n";
        assert!(load(raw, &probe).is_err());
    }

    #[test]
    fn smoketest_unknown_keys() {
        let probe = StaticProbe::new(DevEnv::VS2019, DevEnv::empty());

        let raw = "[projects.App]\nkind = \"executable\"\nsource_rot = \"Code/App\"\n";
        let err = load(raw, &probe).unwrap_err();
        assert_eq!(err.to_string(), "invalid workspace: 'App' has unknown key 'source_rot'");

        let raw = "[projects.App]\nkind = \"executable\"\ndependecies = [{ project = \"Lib\" }]\n";
        let err = load(raw, &probe).unwrap_err();
        assert_eq!(err.to_string(), "invalid workspace: 'App' has unknown key 'dependecies'");

        let raw = "[profiles.exe]\npublic_define = [\"EXE=1\"]\n";
        let err = load(raw, &probe).unwrap_err();
        assert_eq!(err.to_string(), "invalid workspace: 'exe' has unknown key 'public_define'");

        let raw = "[defaults]\nproject_pat = \"_projects\"\n";
        let err = load(raw, &probe).unwrap_err();
        assert_eq!(err.to_string(), "invalid workspace: 'defaults' has unknown key 'project_pat'");

        let raw = "[projects.App]\nkind = \"executable\"\n[[projects.App.when]]\nplatfrom = [\"win32\"]\ndefines = [\"A=1\"]\n";
        let err = load(raw, &probe).unwrap_err();
        assert_eq!(err.to_string(), "invalid workspace: 'App' has unknown key 'platfrom'");
    }
}
