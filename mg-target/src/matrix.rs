//! Enumerating the [`Target`]s a generation pass resolves.

use std::collections::BTreeSet;

use crate::dimension::{Compiler, DevEnv, Dimension};
use crate::probe::EnvironmentProbe;
use crate::target::{Target, TargetPattern};

/// An ordered list of [`TargetPattern`]s, the declared target space of a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMatrix {
    patterns: Vec<TargetPattern>,
}

impl TargetMatrix {
    /// Full cross product of a single pattern.
    pub fn full(pattern: TargetPattern) -> Self {
        TargetMatrix {
            patterns: vec![pattern],
        }
    }

    /// A caller curated list of patterns, expanded in the order provided.
    pub fn curated(patterns: Vec<TargetPattern>) -> Self {
        TargetMatrix { patterns }
    }

    /// Curated enumeration narrowed by probing the host.
    ///
    /// For each of the `candidates` development environments, in declaration order, that the
    /// probe reports as installed we add `base` restricted to that environment and to the
    /// compilers of `base` available within it. Environments without any available compiler are
    /// skipped.
    pub fn discover(probe: &dyn EnvironmentProbe, candidates: DevEnv, base: TargetPattern) -> Self {
        let mut patterns = Vec::new();
        for dev_env in candidates.singles() {
            if !probe.dev_env_installed(dev_env) {
                continue;
            }

            let compiler = base
                .compiler
                .singles()
                .filter(|compiler| probe.compiler_installed(dev_env, *compiler))
                .fold(Compiler::empty(), |acc, compiler| acc | compiler);
            if compiler.is_empty() {
                tracing::warn!(?dev_env, "environment installed but no compiler found");
                continue;
            }

            patterns.push(TargetPattern {
                dev_env,
                compiler,
                ..base
            });
        }

        if patterns.is_empty() {
            tracing::warn!(?candidates, "no development environment discovered");
        }
        TargetMatrix { patterns }
    }

    pub fn patterns(&self) -> &[TargetPattern] {
        &self.patterns
    }

    /// Every [`Target`] in this matrix.
    ///
    /// Patterns expand in order and a target that appears in more than one pattern is only
    /// yielded the first time, so identical inputs always produce identical output.
    pub fn targets(&self) -> Vec<Target> {
        let mut seen = BTreeSet::new();
        let mut targets = Vec::new();
        for pattern in &self.patterns {
            if pattern.is_empty() {
                tracing::warn!(%pattern, "target pattern has an empty dimension");
            }
            for target in pattern.expand() {
                if seen.insert(target) {
                    targets.push(target);
                }
            }
        }
        targets
    }

    /// The [`Target`]s of this matrix that also match `filter`.
    pub fn narrowed(&self, filter: &TargetPattern) -> Vec<Target> {
        self.targets()
            .into_iter()
            .filter(|target| filter.matches(target))
            .collect()
    }

    /// Whether `target` is part of this matrix.
    pub fn contains(&self, target: &Target) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(target))
    }
}
