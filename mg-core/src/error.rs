//! Errors that abort a generation pass.

use std::path::PathBuf;

use compact_str::CompactString;
use mg_target::{Target, TargetError};
use mg_template::TemplateError;

/// Every error is fatal to a generation pass, there is no partial success.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A template referenced a scope or field that doesn't exist, or could not be resolved.
    #[error("unresolved placeholder in '{owner}'{} field '{field}': {source}", at(.target))]
    UnresolvedPlaceholder {
        owner: CompactString,
        target: Option<Target>,
        field: CompactString,
        source: TemplateError,
    },
    /// The dependency relation has a cycle for some target.
    #[error("cyclic dependency for target {target}: {cycle}")]
    CyclicDependency { target: Target, cycle: String },
    /// Two Configurations computed the same artifact path.
    #[error(
        "output path collision on '{}': '{first}' ({first_target}) and '{second}' ({second_target})",
        .path.display()
    )]
    OutputPathCollision {
        path: PathBuf,
        first: CompactString,
        first_target: Target,
        second: CompactString,
        second_target: Target,
    },
    /// A Configuration still lacks a required field after its full mutator chain ran.
    #[error("project '{project}' ({target}) is missing required field '{field}'")]
    MissingRequiredField {
        project: CompactString,
        target: Target,
        field: &'static str,
    },
    /// A source file matched more than one build step rule.
    #[error(
        "source '{}' of project '{project}' is claimed by more than one build step rule: {rules}",
        .file.display()
    )]
    AmbiguousBuildStepClaim {
        project: CompactString,
        file: PathBuf,
        rules: String,
    },
    #[error("project '{project}' ({target}) depends on '{dependency}' which is not resolved for that target")]
    UnresolvedDependency {
        project: CompactString,
        target: Target,
        dependency: CompactString,
    },
    #[error("'{referenced_by}' references unknown project '{name}'")]
    UnknownProject {
        name: CompactString,
        referenced_by: CompactString,
    },
    #[error("unknown solution '{name}'")]
    UnknownSolution { name: CompactString },
    #[error("unknown mode '{name}', expected one of: {known}")]
    UnknownMode { name: CompactString, known: String },
    #[error("invalid pattern '{pattern}' in '{owner}': {source}")]
    InvalidPattern {
        owner: CompactString,
        pattern: String,
        source: globset::Error,
    },
    #[error("failed to list sources of '{owner}' under '{}': {source}", .root.display())]
    Listing {
        owner: CompactString,
        root: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid workspace: {message}")]
    InvalidWorkspace { message: String },
    #[error(transparent)]
    Target(#[from] TargetError),
}

impl ResolveError {
    pub(crate) fn invalid_workspace(message: impl Into<String>) -> Self {
        ResolveError::InvalidWorkspace {
            message: message.into(),
        }
    }
}

fn at(target: &Option<Target>) -> String {
    match target {
        Some(target) => format!(" ({target})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use mg_target::{Compiler, DevEnv, Optimization, Platform};

    use super::*;

    #[test]
    fn smoketest_messages_name_project_target_and_field() {
        let target = Target::new(
            DevEnv::VS2022,
            Platform::WIN32,
            Compiler::CLANG,
            Optimization::DEBUG,
        )
        .unwrap();

        let err = ResolveError::MissingRequiredField {
            project: "SampleBasic".into(),
            target,
            field: "target_path",
        };
        assert_eq!(
            err.to_string(),
            "project 'SampleBasic' (vs2022|win32|Clang|Debug) is missing required field 'target_path'"
        );

        let err = ResolveError::UnresolvedPlaceholder {
            owner: "SampleBasic".into(),
            target: None,
            field: "intermediate_path".into(),
            source: TemplateError::UnknownScope {
                template: "[foo.Name]".to_string(),
                scope: "foo".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "unresolved placeholder in 'SampleBasic' field 'intermediate_path': unknown placeholder scope 'foo' in '[foo.Name]'"
        );
    }
}
