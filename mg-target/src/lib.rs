//! The Target Matrix.
//!
//! A [`Target`] is one concrete point in the cross product of our build dimensions
//! (environment × platform × compiler × optimization). Dimensions are flag sets, a
//! [`TargetPattern`] holds any combination of flags per dimension and expands into the
//! [`Target`]s it describes.

mod dimension;
mod matrix;
mod probe;
mod roots;
mod target;

pub use dimension::{Compiler, DevEnv, Dimension, DimensionKind, Optimization, Platform};
pub use matrix::TargetMatrix;
pub use probe::{DirectoryProbe, EnvironmentProbe, StaticProbe};
pub use roots::RootPaths;
pub use target::{Target, TargetError, TargetPattern};
