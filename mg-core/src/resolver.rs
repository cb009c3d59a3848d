//! Resolving a single (project, target) pair into a [`Configuration`].

use mg_target::Target;

use crate::configuration::{Configuration, OutputKind};
use crate::error::ResolveError;
use crate::mutator::MutatorScope;
use crate::project::Project;
use crate::Templates;

/// Runs mutator chains, stateless apart from the shared [`Templates`].
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    templates: &'a Templates,
}

impl<'a> Resolver<'a> {
    pub fn new(templates: &'a Templates) -> Self {
        Resolver { templates }
    }

    /// Resolves `project` for `target`.
    ///
    /// Runs the full mutator chain, applies the project level dependency edges that match
    /// `target` and checks every required field ended up set.
    pub fn resolve(&self, project: &Project, target: &Target) -> Result<Configuration, ResolveError> {
        let mut conf = Configuration::new(project.name(), *target);
        let scope = MutatorScope::new(project, target, self.templates);
        project.chain().apply(&mut conf, &scope)?;

        for edge in project.dependencies() {
            if edge.filter.matches(target) {
                conf.add_dependency(edge.project.clone(), edge.visibility);
            }
        }

        let missing = |field| ResolveError::MissingRequiredField {
            project: project.name().into(),
            target: *target,
            field,
        };
        let file_name = conf
            .project_file_name()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| missing("project_file_name"))?;
        conf.name()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| missing("name"))?;
        conf.project_path().ok_or_else(|| missing("project_path"))?;
        conf.intermediate_path()
            .ok_or_else(|| missing("intermediate_path"))?;
        let kind = conf.output().ok_or_else(|| missing("output"))?;
        let target_path = conf.target_path().ok_or_else(|| missing("target_path"))?;

        let mut binary = format!("{}{}", file_name, conf.target_file_suffix());
        let extension = kind.extension(target.platform());
        if !extension.is_empty() {
            binary.push('.');
            binary.push_str(extension);
        }
        let binary_path = target_path.join(binary);

        if kind == OutputKind::Library {
            conf.export_library(binary_path.to_string_lossy().into_owned());
        }
        conf.set_binary_path(binary_path);

        tracing::debug!(project = project.name(), %target, "resolved configuration");
        Ok(conf)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use mg_target::{Compiler, DevEnv, Optimization, Platform, RootPaths, TargetPattern};

    use super::*;
    use crate::configuration::Visibility;
    use crate::mutator::{BaseLayer, BasePaths, MutatorChain};
    use crate::project::ProjectBuilder;

    fn target(platform: Platform, optimization: Optimization) -> Target {
        Target::new(DevEnv::VS2019, platform, Compiler::MSBUILD, optimization).unwrap()
    }

    #[test]
    fn smoketest_resolve_library() {
        let templates = crate::templates(RootPaths::new("/ws", "_generated"));
        let base = Arc::new(BaseLayer::compile(&templates, &BasePaths::default()).unwrap());
        let chain = MutatorChain::new(base).then("index32", |conf, _| {
            conf.add_public_define("ImDrawIdx=unsigned int");
            Ok(())
        });
        let win32 = TargetPattern {
            platform: Platform::WIN32,
            ..TargetPattern::any()
        };
        let project = ProjectBuilder::new("DearImguiIndex32Lib", OutputKind::Library)
            .dependency("Win32Only", Visibility::Private, win32)
            .build(templates.roots(), chain)
            .unwrap();
        let resolver = Resolver::new(&templates);

        let conf = resolver
            .resolve(&project, &target(Platform::WIN64, Optimization::DEBUG))
            .unwrap();
        assert_eq!(
            conf.binary_path(),
            Some(Path::new(
                "/ws/_generated/Libs/vs2019_MSBuild_win64/DearImguiIndex32Lib_Debug.lib"
            ))
        );
        assert_eq!(
            conf.project_file(),
            Some(Path::new("/ws/_projects/vs2019/DearImguiIndex32Lib").to_path_buf())
        );
        assert_eq!(
            conf.public().library_files,
            ["/ws/_generated/Libs/vs2019_MSBuild_win64/DearImguiIndex32Lib_Debug.lib"]
        );
        assert!(conf.dependencies().is_empty());

        let conf = resolver
            .resolve(&project, &target(Platform::WIN32, Optimization::RELEASE))
            .unwrap();
        assert_eq!(conf.dependencies().len(), 1);
        assert_eq!(conf.dependencies()[0].project, "Win32Only");
    }

    #[test]
    fn smoketest_missing_required_field() {
        let templates = crate::templates(RootPaths::new("/ws", "_generated"));
        let paths = BasePaths {
            intermediate_path: None,
            ..BasePaths::default()
        };
        let base = Arc::new(BaseLayer::compile(&templates, &paths).unwrap());
        let project = ProjectBuilder::new("SampleBasic", OutputKind::Executable)
            .build(templates.roots(), MutatorChain::new(base))
            .unwrap();

        let err = Resolver::new(&templates)
            .resolve(&project, &target(Platform::WIN64, Optimization::RELEASE))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "project 'SampleBasic' (vs2019|win64|MSBuild|Release) is missing required field 'intermediate_path'"
        );
    }

    #[test]
    fn smoketest_resolution_is_deterministic() {
        let templates = crate::templates(RootPaths::new("/ws", "_generated"));
        let base = Arc::new(BaseLayer::compile(&templates, &BasePaths::default()).unwrap());
        let project = ProjectBuilder::new("SampleBasic", OutputKind::Executable)
            .build(templates.roots(), MutatorChain::new(base))
            .unwrap();
        let resolver = Resolver::new(&templates);
        let target = target(Platform::WIN32, Optimization::DEBUG);

        let a = resolver.resolve(&project, &target).unwrap();
        let b = resolver.resolve(&project, &target).unwrap();
        assert_eq!(a, b);
        assert_eq!(format!("{a:?}"), format!("{b:?}"));
    }
}
