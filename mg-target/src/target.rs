//! Concrete targets and the patterns that expand into them.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::dimension::{Compiler, DevEnv, Dimension, DimensionKind, Optimization, Platform};

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// A [`Target`] must have exactly one flag per dimension.
    #[error("target dimension '{dimension}' must hold exactly one flag, found {count}")]
    NotSingle {
        dimension: &'static str,
        count: usize,
    },
    #[error("unknown {dimension} '{label}'")]
    UnknownLabel {
        dimension: &'static str,
        label: String,
    },
}

/// One concrete point in the target matrix.
///
/// Every dimension holds exactly one flag. [`Target`]s are small immutable values, every
/// Configuration resolved for the same point compares equal on its [`Target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target {
    dev_env: DevEnv,
    platform: Platform,
    compiler: Compiler,
    optimization: Optimization,
}

impl Target {
    /// Create a new [`Target`].
    ///
    /// # Errors
    ///
    /// * If any of the provided dimensions does not hold exactly one flag.
    pub fn new(
        dev_env: DevEnv,
        platform: Platform,
        compiler: Compiler,
        optimization: Optimization,
    ) -> Result<Self, TargetError> {
        fn single<D: Dimension>(value: D) -> Result<D, TargetError> {
            match value.count() {
                1 => Ok(value),
                count => Err(TargetError::NotSingle {
                    dimension: D::NAME,
                    count,
                }),
            }
        }

        Ok(Target {
            dev_env: single(dev_env)?,
            platform: single(platform)?,
            compiler: single(compiler)?,
            optimization: single(optimization)?,
        })
    }

    pub fn dev_env(&self) -> DevEnv {
        self.dev_env
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn compiler(&self) -> Compiler {
        self.compiler
    }

    pub fn optimization(&self) -> Optimization {
        self.optimization
    }

    /// Label of the flag this target holds for `kind`.
    pub fn label(&self, kind: DimensionKind) -> &'static str {
        // Targets only hold single flags so every label exists.
        let label = match kind {
            DimensionKind::DevEnv => self.dev_env.label(),
            DimensionKind::Platform => self.platform.label(),
            DimensionKind::Compiler => self.compiler.label(),
            DimensionKind::Optimization => self.optimization.label(),
        };
        label.unwrap_or("?")
    }

    /// A [`TargetPattern`] that matches exactly this target.
    pub fn as_pattern(&self) -> TargetPattern {
        TargetPattern {
            dev_env: self.dev_env,
            platform: self.platform,
            compiler: self.compiler,
            optimization: self.optimization,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.label(DimensionKind::DevEnv),
            self.label(DimensionKind::Platform),
            self.label(DimensionKind::Compiler),
            self.label(DimensionKind::Optimization),
        )
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Target", 4)?;
        state.serialize_field("dev_env", self.label(DimensionKind::DevEnv))?;
        state.serialize_field("platform", self.label(DimensionKind::Platform))?;
        state.serialize_field("compiler", self.label(DimensionKind::Compiler))?;
        state.serialize_field("optimization", self.label(DimensionKind::Optimization))?;
        state.end()
    }
}

/// Any combination of flags per dimension.
///
/// A pattern both _expands_ into the cross product of its flags and _matches_ any [`Target`]
/// whose flags it contains, which makes it double as a target filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetPattern {
    pub dev_env: DevEnv,
    pub platform: Platform,
    pub compiler: Compiler,
    pub optimization: Optimization,
}

impl Default for TargetPattern {
    fn default() -> Self {
        TargetPattern {
            dev_env: DevEnv::VS2019,
            platform: Platform::WIN64 | Platform::WIN32,
            compiler: Compiler::MSBUILD | Compiler::CLANG,
            optimization: Optimization::DEBUG | Optimization::RELEASE,
        }
    }
}

impl TargetPattern {
    /// A pattern holding every flag of every dimension.
    pub fn any() -> Self {
        TargetPattern {
            dev_env: DevEnv::all(),
            platform: Platform::all(),
            compiler: Compiler::all(),
            optimization: Optimization::all(),
        }
    }

    /// Returns whether `target` is one of the points this pattern expands to.
    pub fn matches(&self, target: &Target) -> bool {
        self.dev_env.contains(target.dev_env)
            && self.platform.contains(target.platform)
            && self.compiler.contains(target.compiler)
            && self.optimization.contains(target.optimization)
    }

    /// Number of [`Target`]s this pattern expands into.
    pub fn len(&self) -> usize {
        self.dev_env.count()
            * self.platform.count()
            * self.compiler.count()
            * self.optimization.count()
    }

    /// Whether this pattern expands into no [`Target`]s at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expands this pattern into the full cross product of its flags.
    ///
    /// The order is deterministic: dimensions nest as environment, platform, compiler,
    /// optimization (outermost first) and flags follow their declaration order.
    pub fn expand(&self) -> Vec<Target> {
        let mut targets = Vec::with_capacity(self.len());
        for dev_env in self.dev_env.singles() {
            for platform in self.platform.singles() {
                for compiler in self.compiler.singles() {
                    for optimization in self.optimization.singles() {
                        targets.push(Target {
                            dev_env,
                            platform,
                            compiler,
                            optimization,
                        });
                    }
                }
            }
        }
        targets
    }

    /// Parses a combination of labels for a single dimension.
    ///
    /// An empty list means "every flag", so filters only need to name the dimensions they
    /// narrow.
    pub fn parse_dimension<D, S>(labels: &[S]) -> Result<D, TargetError>
    where
        D: Dimension + std::ops::BitOr<Output = D>,
        S: AsRef<str>,
    {
        if labels.is_empty() {
            return Ok(D::ALL);
        }

        let mut flags = D::EMPTY;
        for label in labels {
            let label = label.as_ref();
            let flag = D::from_label(label).ok_or_else(|| TargetError::UnknownLabel {
                dimension: D::NAME,
                label: label.to_string(),
            })?;
            flags = flags | flag;
        }
        Ok(flags)
    }
}

impl fmt::Display for TargetPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn labels<D: Dimension>(value: D) -> String {
            let labels: Vec<_> = value.singles().filter_map(|flag| flag.label()).collect();
            labels.join("+")
        }
        write!(
            f,
            "{}|{}|{}|{}",
            labels(self.dev_env),
            labels(self.platform),
            labels(self.compiler),
            labels(self.optimization)
        )
    }
}
