//! Handing a [`ResolvedModel`] to whatever writes the native project files.

use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;

use crate::configuration::Configuration;
use crate::model::ResolvedModel;
use crate::solution::ResolvedSolution;

/// Consumes a fully resolved model.
pub trait ModelEmitter {
    /// Emits `model`, returning the files that were written.
    fn emit(&self, model: &ResolvedModel) -> Result<Vec<PathBuf>, anyhow::Error>;
}

/// Writes one `<solution>.resolved.toml` per solution into `out_dir`.
#[derive(Debug, Clone)]
pub struct TomlEmitter {
    out_dir: PathBuf,
}

#[derive(Serialize)]
struct SolutionDocument<'m> {
    solution: &'m ResolvedSolution,
    configurations: Vec<&'m Configuration>,
}

impl TomlEmitter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        TomlEmitter {
            out_dir: out_dir.into(),
        }
    }

    /// Renders the document for `solution` without writing it.
    pub fn render(&self, model: &ResolvedModel, solution: &ResolvedSolution) -> Result<String, anyhow::Error> {
        let document = SolutionDocument {
            solution,
            configurations: model.configurations_of(solution),
        };
        let rendered = toml::to_string_pretty(&document)
            .with_context(|| format!("serializing solution '{}'", solution.name))?;
        Ok(rendered)
    }
}

impl ModelEmitter for TomlEmitter {
    fn emit(&self, model: &ResolvedModel) -> Result<Vec<PathBuf>, anyhow::Error> {
        // Render everything first so a failure never leaves half the files behind.
        let mut documents = Vec::with_capacity(model.solutions().len());
        for solution in model.solutions() {
            let path = self.out_dir.join(format!("{}.resolved.toml", solution.name));
            documents.push((path, self.render(model, solution)?));
        }

        std::fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("creating {}", self.out_dir.display()))?;
        let mut written = Vec::with_capacity(documents.len());
        for (path, document) in documents {
            std::fs::write(&path, document).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(?path, "wrote resolved solution");
            written.push(path);
        }
        Ok(written)
    }
}
