//! The generation pass of the `mg` generator.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use compact_str::CompactString;
use derivative::Derivative;
use mg_cfg::{Config, ConfigSet};
use mg_target::{DirectoryProbe, EnvironmentProbe, RootPaths, Target};
use rayon::prelude::*;

use crate::configuration::Configuration;
use crate::defs::{WorkspaceSpec, WORKSPACE_FILENAME};
use crate::error::ResolveError;
use crate::graph;
use crate::listing::FileListing;
use crate::model::ResolvedModel;
use crate::project::{Project, SourceFile};
use crate::resolver::Resolver;
use crate::solution::Solution;
use crate::workspace::{self, Workspace};

pub static GENERATED_DIR: Config<&'static str> = Config::new(
    "generated_dir",
    "Directory generated files are written to, relative to the workspace root.",
    "_generated",
);

pub static EMIT_DIR: Config<&'static str> = Config::new(
    "emit_dir",
    "Directory resolved solutions are emitted to, relative to the workspace root.",
    "_projects",
);

pub static RESOLVE_THREADS: Config<u64> = Config::new(
    "resolve_threads",
    "Number of threads used to resolve Configurations, 0 picks one per core.",
    0,
);

pub static CASE_SENSITIVE_CLAIMS: Config<bool> = Config::new(
    "case_sensitive_claims",
    "Whether build step rules match file name suffixes case sensitively.",
    false,
);

/// Configuration for creating an [`Engine`].
pub struct EngineConfig {
    /// Root directory of the workspace, where the user's files live.
    pub workspace_dir: PathBuf,
    /// Generator settings, see [`crate::cfgs::all_cfgs`].
    pub configs: ConfigSet,
    /// Setting overrides applied after the `[settings]` of the workspace file.
    pub overrides: Vec<(String, String)>,
    /// Lists the sources of every project.
    pub listing: Arc<dyn FileListing>,
    /// Answers target discovery, defaults to probing the `[environments]` of the workspace.
    pub probe: Option<Arc<dyn EnvironmentProbe>>,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Engine {
    /// Root directory of the workspace, where the user's files live.
    workspace_dir: PathBuf,
    /// The compiled workspace.
    workspace: Workspace,
    /// Generator settings.
    configs: ConfigSet,

    #[derivative(Debug = "ignore")]
    listing: Arc<dyn FileListing>,
    /// Dedicated pool when `resolve_threads` is set, the global rayon pool otherwise.
    #[derivative(Debug = "ignore")]
    pool: Option<rayon::ThreadPool>,
}

impl Engine {
    /// Reads the workspace file from `workspace_dir` and compiles it.
    pub fn new(config: EngineConfig) -> Result<Self, anyhow::Error> {
        let spec = {
            let filename = WORKSPACE_FILENAME.read(&config.configs);
            let path = config.workspace_dir.join(filename.as_str());
            tracing::info!(?path, "reading Workspace spec");
            let buffer = std::fs::read_to_string(&path)?;
            WorkspaceSpec::from_toml(&buffer)?
        };
        Engine::from_spec(config, &spec)
    }

    /// Compiles an already parsed workspace definition.
    pub fn from_spec(config: EngineConfig, spec: &WorkspaceSpec) -> Result<Self, anyhow::Error> {
        let EngineConfig {
            workspace_dir,
            configs,
            overrides,
            listing,
            probe,
        } = config;

        // Settings from the workspace file first, so the command line always wins.
        let settings = spec.setting_overrides();
        configs.apply_overrides(settings.iter().map(|(name, value)| (*name, value.as_str())))?;
        configs.apply_overrides(overrides.iter().map(|(name, value)| (name.as_str(), value.as_str())))?;

        let roots = RootPaths::new(workspace_dir.clone(), GENERATED_DIR.read(&configs).as_str());
        let probe: Arc<dyn EnvironmentProbe> = match probe {
            Some(probe) => probe,
            None => Arc::new(DirectoryProbe::new(
                &roots,
                workspace::environments_from_spec(spec)?,
            )),
        };
        let workspace = Workspace::from_spec(
            spec,
            crate::templates(roots),
            probe.as_ref(),
            CASE_SENSITIVE_CLAIMS.read(&configs),
        )?;

        let pool = match RESOLVE_THREADS.read(&configs) {
            0 => None,
            threads => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(usize::try_from(threads)?)
                    .thread_name(|idx| format!("mg-resolve-{idx}"))
                    .build()?;
                Some(pool)
            }
        };

        Ok(Engine {
            workspace_dir,
            workspace,
            configs,
            listing,
            pool,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn configs(&self) -> &ConfigSet {
        &self.configs
    }

    /// Directory emitters should write to.
    pub fn emit_dir(&self) -> PathBuf {
        self.workspace_dir.join(EMIT_DIR.read(&self.configs).as_str())
    }

    /// Runs a generation pass for every solution of `mode`.
    pub fn generate(&self, mode: &str) -> Result<ResolvedModel, ResolveError> {
        let solutions = self.workspace.mode(mode)?;
        tracing::info!(mode, solutions = solutions.len(), "generating");
        self.generate_solutions(&solutions)
    }

    /// Runs a generation pass for `solutions`.
    pub fn generate_solutions(&self, solutions: &[&Solution]) -> Result<ResolvedModel, ResolveError> {
        match &self.pool {
            Some(pool) => pool.install(|| generate(&self.workspace, self.listing.as_ref(), solutions)),
            None => generate(&self.workspace, self.listing.as_ref(), solutions),
        }
    }
}

/// A full generation pass, all or nothing.
///
/// 1. Every project listed in `solutions` is resolved for every workspace target it and the
///    solution support, dependencies are pulled in for the targets that need them.
/// 2. Sources are listed and build step rules claim theirs.
/// 3. Public contributions propagate along the dependency graph of each target.
/// 4. Solutions are assembled and artifact paths checked for collisions.
pub fn generate(
    workspace: &Workspace,
    listing: &dyn FileListing,
    solutions: &[&Solution],
) -> Result<ResolvedModel, ResolveError> {
    let targets = workspace.matrix().targets();
    if targets.is_empty() {
        tracing::warn!("target matrix is empty, nothing to resolve");
    }

    let mut pending: BTreeSet<(CompactString, Target)> = BTreeSet::new();
    for solution in solutions {
        for target in targets.iter().filter(|target| solution.targets().matches(target)) {
            for entry in solution.entries() {
                if workspace.project(&entry.project)?.supports(target) {
                    pending.insert((entry.project.clone(), *target));
                } else {
                    tracing::warn!(
                        solution = solution.name(),
                        project = %entry.project,
                        %target,
                        "project does not support target"
                    );
                }
            }
        }
    }

    let configs = resolve_all(workspace, pending)?;
    let mut configs = claim_sources(workspace, listing, configs)?;

    configs
        .par_iter_mut()
        .try_for_each(|(target, configs)| graph::propagate(*target, configs))?;

    let solutions = solutions
        .iter()
        .map(|solution| solution.assemble(&targets, &configs, workspace.templates()))
        .collect::<Result<Vec<_>, _>>()?;

    let model = ResolvedModel::new(configs, solutions)?;
    tracing::info!(
        configurations = model.configurations().len(),
        solutions = model.solutions().len(),
        "resolved model"
    );
    Ok(model)
}

type ByTarget = BTreeMap<Target, BTreeMap<CompactString, Configuration>>;

/// Resolves `pending` and, wave by wave, the dependencies they name.
fn resolve_all(
    workspace: &Workspace,
    mut pending: BTreeSet<(CompactString, Target)>,
) -> Result<ByTarget, ResolveError> {
    let resolver = Resolver::new(workspace.templates());
    let mut resolved = ByTarget::new();

    while !pending.is_empty() {
        let wave: Vec<(CompactString, Target)> = std::mem::take(&mut pending).into_iter().collect();
        let confs = wave
            .par_iter()
            .map(|(name, target)| resolver.resolve(workspace.project(name)?, target))
            .collect::<Result<Vec<_>, _>>()?;
        for conf in confs {
            resolved
                .entry(*conf.target())
                .or_default()
                .insert(conf.project().into(), conf);
        }

        for (name, target) in &wave {
            let conf = &resolved[target][name];
            for dep in conf.dependencies() {
                let project = workspace.projects().get(&dep.project).ok_or_else(|| {
                    ResolveError::UnknownProject {
                        name: dep.project.clone(),
                        referenced_by: name.clone(),
                    }
                })?;
                if !project.supports(target) {
                    return Err(ResolveError::UnresolvedDependency {
                        project: name.clone(),
                        target: *target,
                        dependency: dep.project.clone(),
                    });
                }
                if !resolved[target].contains_key(&dep.project) {
                    pending.insert((dep.project.clone(), *target));
                }
            }
        }
    }

    Ok(resolved)
}

/// Lists the sources of every resolved project and lets the build step rules claim theirs.
fn claim_sources(
    workspace: &Workspace,
    listing: &dyn FileListing,
    mut configs: ByTarget,
) -> Result<ByTarget, ResolveError> {
    let names: BTreeSet<&CompactString> = configs.values().flat_map(BTreeMap::keys).collect();
    let projects = names
        .into_iter()
        .map(|name| workspace.project(name))
        .collect::<Result<Vec<&Project>, _>>()?;

    let claimer = workspace.claimer();
    let extensions = claimer.source_extensions();
    let roots = workspace.templates().roots();
    let listed: Vec<(&Project, Vec<SourceFile>)> = projects
        .into_par_iter()
        .map(|project| {
            let sources = project.list_sources(roots, listing, &extensions)?;
            Ok::<_, ResolveError>((project, sources))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (project, sources) in &listed {
        let mut confs: Vec<&mut Configuration> = configs
            .values_mut()
            .filter_map(|by_name| by_name.get_mut(project.name()))
            .collect();
        claimer.claim(project, sources, &mut confs)?;
    }
    Ok(configs)
}

#[cfg(test)]
mod tests {
    use mg_target::StaticProbe;
    use mg_target::DevEnv;

    use super::*;
    use crate::listing::MemoryListing;

    fn engine(raw: &str, files: &[&str]) -> Engine {
        let spec = WorkspaceSpec::from_toml(raw).unwrap();
        let mut builder = ConfigSet::builder();
        crate::cfgs::all_cfgs(&mut builder);
        let config = EngineConfig {
            workspace_dir: PathBuf::from("/ws"),
            configs: builder.build(),
            overrides: Vec::new(),
            listing: Arc::new(MemoryListing::new(files.iter().copied())),
            probe: Some(Arc::new(StaticProbe::new(DevEnv::VS2019, DevEnv::VS2019))),
        };
        Engine::from_spec(config, &spec).unwrap()
    }

    #[test]
    fn smoketest_engine_settings() {
        let raw = "[settings]\nresolve_threads = 2\ngenerated_dir = \"gen\"\n";
        let engine = engine(raw, &[]);
        assert_eq!(RESOLVE_THREADS.read(engine.configs()), 2);
        assert_eq!(engine.workspace().templates().roots().generated(), PathBuf::from("/ws/gen"));
        assert_eq!(engine.emit_dir(), PathBuf::from("/ws/_projects"));
    }

    #[test]
    fn smoketest_generate_pulls_in_dependencies() {
        let raw = r#"
[projects.Lib]
kind = "library"
source_root = "Code/Lib"
public_defines = ["LIB=1"]

[projects.App]
kind = "executable"
source_root = "Code/App"
dependencies = [{ project = "Lib" }]

[solutions.Only]
targets = { optimization = ["Release"], platform = ["win64"], compiler = ["MSBuild"] }
projects = [{ project = "App", folder = "Apps" }]
"#;
        let engine = engine(raw, &["/ws/Code/App/main.cpp", "/ws/Code/Lib/lib.cpp"]);
        let model = engine.generate("all").unwrap();

        assert_eq!(model.configurations().len(), 2);
        let app = &model.configurations()[0];
        assert_eq!(app.project(), "App");
        assert!(app.defines().iter().any(|define| define == "LIB=1"));
        assert_eq!(app.sources()[0].path, PathBuf::from("/ws/Code/App/main.cpp"));

        let solution = model.solution("Only").unwrap();
        assert_eq!(solution.configurations.len(), 1);
        let projects: Vec<_> = solution.configurations[0]
            .projects
            .iter()
            .map(|project| (project.name.as_str(), project.folder.as_deref()))
            .collect();
        assert_eq!(projects, [("App", Some("Apps")), ("Lib", None)]);
    }

    #[test]
    fn smoketest_generate_is_all_or_nothing() {
        let raw = r#"
[projects.Lib]
kind = "library"
targets = { platform = ["win32"] }

[projects.App]
kind = "executable"
dependencies = [{ project = "Lib" }]

[solutions.Only]
projects = ["App"]
"#;
        let engine = engine(raw, &[]);
        let err = engine.generate("all").unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UnresolvedDependency { ref project, ref dependency, target }
                if project == "App" && dependency == "Lib" && target.platform() == mg_target::Platform::WIN64
        ));
    }
}
