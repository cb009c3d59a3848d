//! Probing the host for installed development environments.
//!
//! Probing is an external concern, target discovery only ever talks to an
//! [`EnvironmentProbe`] so the answers can be pinned down in tests and on the command line.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::dimension::{Compiler, DevEnv, Dimension};
use crate::roots::RootPaths;

/// Answers questions about what is installed on the host.
pub trait EnvironmentProbe: Send + Sync {
    /// Whether the development environment `dev_env` is installed.
    fn dev_env_installed(&self, dev_env: DevEnv) -> bool;

    /// Whether `compiler` is usable from within `dev_env`.
    fn compiler_installed(&self, dev_env: DevEnv, compiler: Compiler) -> bool;
}

/// An [`EnvironmentProbe`] with fixed answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticProbe {
    /// Development environments reported as installed.
    pub installed: DevEnv,
    /// Development environments that also ship Clang.
    pub clang: DevEnv,
}

impl StaticProbe {
    pub fn new(installed: DevEnv, clang: DevEnv) -> Self {
        StaticProbe { installed, clang }
    }
}

impl EnvironmentProbe for StaticProbe {
    fn dev_env_installed(&self, dev_env: DevEnv) -> bool {
        self.installed.contains(dev_env)
    }

    fn compiler_installed(&self, dev_env: DevEnv, compiler: Compiler) -> bool {
        if !self.dev_env_installed(dev_env) {
            return false;
        }
        if compiler == Compiler::CLANG {
            self.clang.contains(dev_env)
        } else {
            true
        }
    }
}

/// An [`EnvironmentProbe`] that checks for install directories on disk.
#[derive(Debug, Clone)]
pub struct DirectoryProbe {
    /// Install directory of each development environment we know about.
    installs: BTreeMap<DevEnv, PathBuf>,
    /// LLVM directory embedded in each development environment, if any.
    llvm: BTreeMap<DevEnv, PathBuf>,
}

impl DirectoryProbe {
    /// Create a new [`DirectoryProbe`], relative directories are anchored to `roots`.
    pub fn new<I>(roots: &RootPaths, environments: I) -> Self
    where
        I: IntoIterator<Item = (DevEnv, PathBuf, Option<PathBuf>)>,
    {
        let mut installs = BTreeMap::new();
        let mut llvm = BTreeMap::new();
        for (dev_env, install_dir, llvm_dir) in environments {
            installs.insert(dev_env, roots.join(install_dir));
            if let Some(llvm_dir) = llvm_dir {
                llvm.insert(dev_env, roots.join(llvm_dir));
            }
        }
        DirectoryProbe { installs, llvm }
    }
}

impl EnvironmentProbe for DirectoryProbe {
    fn dev_env_installed(&self, dev_env: DevEnv) -> bool {
        let installed = self
            .installs
            .get(&dev_env)
            .is_some_and(|dir| dir.is_dir());
        tracing::debug!(?dev_env, installed, "probed environment");
        installed
    }

    fn compiler_installed(&self, dev_env: DevEnv, compiler: Compiler) -> bool {
        if !self.dev_env_installed(dev_env) {
            return false;
        }
        if compiler != Compiler::CLANG {
            return true;
        }
        let Some(llvm_dir) = self.llvm.get(&dev_env) else {
            return false;
        };
        let bin = llvm_dir.join("bin");
        bin.join("clang.exe").is_file() || bin.join("clang").is_file()
    }
}
