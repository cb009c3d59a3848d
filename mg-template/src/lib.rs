//! Template substitution for `[scope.field]` placeholders.
//!
//! Placeholders are checked against a typed [`FieldTable`] per scope when a template is
//! _compiled_, so a typo such as `[project.Nmae]` fails as soon as the template is registered.
//! Rendering can then only fail when the scope itself is absent, e.g. a `[solution.Name]`
//! placeholder rendered for a project.
//!
//! ```ignore
//! let subst = Substitutor::new(roots, project_table, solution_table);
//! let template = subst.compile("_intermediate/[target.Platform]/[project.Name]")?;
//! let path = subst.render_path(&template, &Bindings::new().project(&project).target(&target))?;
//! ```

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;

use mg_target::{DimensionKind, RootPaths, Target};
use smallvec::SmallVec;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown placeholder scope '{scope}' in '{template}'")]
    UnknownScope { template: String, scope: String },
    #[error("unknown field '[{scope}.{field}]' in '{template}'")]
    UnknownField {
        template: String,
        scope: Scope,
        field: String,
    },
    #[error("placeholder '[{scope}.{field}]' in '{template}' has no {scope} to resolve against")]
    UnresolvedPlaceholder {
        template: String,
        scope: Scope,
        field: &'static str,
    },
}

/// The instance a placeholder reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Project,
    Target,
    Solution,
}

impl Scope {
    pub fn name(self) -> &'static str {
        match self {
            Scope::Project => "project",
            Scope::Target => "target",
            Scope::Solution => "solution",
        }
    }

    pub fn from_name(name: &str) -> Option<Scope> {
        match name {
            "project" => Some(Scope::Project),
            "target" => Some(Scope::Target),
            "solution" => Some(Scope::Solution),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reads a single field from an instance of `T`.
pub type Getter<T> = for<'a> fn(&'a T) -> Cow<'a, str>;

/// The fields of one scope that placeholders are allowed to reference.
pub struct FieldTable<T: 'static> {
    fields: Vec<(&'static str, Getter<T>)>,
}

impl<T: 'static> FieldTable<T> {
    pub fn new() -> Self {
        FieldTable { fields: Vec::new() }
    }

    /// Register a field named `name`.
    ///
    /// # Panics
    ///
    /// * If a field named `name` was already registered.
    pub fn field(mut self, name: &'static str, getter: Getter<T>) -> Self {
        assert!(
            self.slot(name).is_none(),
            "field '{name}' registered more than once"
        );
        self.fields.push((name, getter));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    fn slot(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(field, _)| *field == name)
    }

    fn read<'a>(&self, slot: usize, value: &'a T) -> Cow<'a, str> {
        (self.fields[slot].1)(value)
    }
}

impl<T: 'static> Default for FieldTable<T> {
    fn default() -> Self {
        FieldTable::new()
    }
}

impl<T: 'static> fmt::Debug for FieldTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// The fields of a [`Target`], one per dimension.
pub fn target_fields() -> FieldTable<Target> {
    FieldTable::new()
        .field(DimensionKind::DevEnv.name(), |t: &Target| {
            Cow::Borrowed(t.label(DimensionKind::DevEnv))
        })
        .field(DimensionKind::Platform.name(), |t: &Target| {
            Cow::Borrowed(t.label(DimensionKind::Platform))
        })
        .field(DimensionKind::Compiler.name(), |t: &Target| {
            Cow::Borrowed(t.label(DimensionKind::Compiler))
        })
        .field(DimensionKind::Optimization.name(), |t: &Target| {
            Cow::Borrowed(t.label(DimensionKind::Optimization))
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field {
        scope: Scope,
        field: &'static str,
        slot: usize,
    },
}

/// A template whose placeholders have all been checked against a [`Substitutor`].
///
/// A [`Template`] must be rendered by the same [`Substitutor`] that compiled it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    segments: SmallVec<[Segment; 4]>,
}

impl Template {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether this template contains no placeholders at all.
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)))
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The instances placeholders resolve against.
pub struct Bindings<'a, P, S> {
    project: Option<&'a P>,
    target: Option<&'a Target>,
    solution: Option<&'a S>,
}

impl<'a, P, S> Bindings<'a, P, S> {
    pub fn new() -> Self {
        Bindings {
            project: None,
            target: None,
            solution: None,
        }
    }

    pub fn project(mut self, project: &'a P) -> Self {
        self.project = Some(project);
        self
    }

    pub fn target(mut self, target: &'a Target) -> Self {
        self.target = Some(target);
        self
    }

    pub fn solution(mut self, solution: &'a S) -> Self {
        self.solution = Some(solution);
        self
    }
}

impl<P, S> Default for Bindings<'_, P, S> {
    fn default() -> Self {
        Bindings::new()
    }
}

/// Compiles and renders templates for projects of type `P` and solutions of type `S`.
#[derive(Debug)]
pub struct Substitutor<P: 'static, S: 'static> {
    roots: RootPaths,
    project: FieldTable<P>,
    target: FieldTable<Target>,
    solution: FieldTable<S>,
}

impl<P: 'static, S: 'static> Substitutor<P, S> {
    pub fn new(roots: RootPaths, project: FieldTable<P>, solution: FieldTable<S>) -> Self {
        Substitutor {
            roots,
            project,
            target: target_fields(),
            solution,
        }
    }

    pub fn roots(&self) -> &RootPaths {
        &self.roots
    }

    /// Compile `raw` checking every placeholder against our field tables.
    ///
    /// Only `[ident.ident]` is treated as a placeholder, any other bracketed text is kept
    /// literally.
    pub fn compile(&self, raw: &str) -> Result<Template, TemplateError> {
        let mut segments: SmallVec<[Segment; 4]> = SmallVec::new();
        let mut literal = String::new();
        let mut rest = raw;

        while let Some(open) = rest.find('[') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let placeholder = after
                .find(']')
                .map(|close| &after[..close])
                .and_then(|inner| inner.split_once('.'))
                .filter(|(scope, field)| is_ident(scope) && is_ident(field));

            let Some((scope_name, field_name)) = placeholder else {
                literal.push('[');
                rest = after;
                continue;
            };

            let scope = Scope::from_name(scope_name).ok_or_else(|| TemplateError::UnknownScope {
                template: raw.to_string(),
                scope: scope_name.to_string(),
            })?;
            let (field, slot) =
                self.lookup(scope, field_name)
                    .ok_or_else(|| TemplateError::UnknownField {
                        template: raw.to_string(),
                        scope,
                        field: field_name.to_string(),
                    })?;

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Field { scope, field, slot });
            // Skip "scope.field]".
            rest = &after[scope_name.len() + 1 + field_name.len() + 1..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Template {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Render `template`, either every placeholder resolves or an error is returned.
    pub fn render(
        &self,
        template: &Template,
        bindings: &Bindings<'_, P, S>,
    ) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(template.raw.len());
        for segment in &template.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field { scope, field, slot } => {
                    let value = self.read(*scope, *slot, bindings).ok_or_else(|| {
                        TemplateError::UnresolvedPlaceholder {
                            template: template.raw.clone(),
                            scope: *scope,
                            field: *field,
                        }
                    })?;
                    out.push_str(&value);
                }
            }
        }
        Ok(out)
    }

    /// Render `template` into a path anchored at the workspace root.
    pub fn render_path(
        &self,
        template: &Template,
        bindings: &Bindings<'_, P, S>,
    ) -> Result<PathBuf, TemplateError> {
        let rendered = self.render(template, bindings)?;
        Ok(self.roots.join(rendered))
    }

    /// Compile and render `raw` in one step.
    ///
    /// Rendering again is a no-op unless a field value itself spells a placeholder, values are
    /// inserted verbatim and never re-scanned.
    pub fn resolve(&self, raw: &str, bindings: &Bindings<'_, P, S>) -> Result<String, TemplateError> {
        let template = self.compile(raw)?;
        self.render(&template, bindings)
    }

    fn lookup(&self, scope: Scope, name: &str) -> Option<(&'static str, usize)> {
        fn find<T: 'static>(table: &FieldTable<T>, name: &str) -> Option<(&'static str, usize)> {
            table.slot(name).map(|slot| (table.fields[slot].0, slot))
        }
        match scope {
            Scope::Project => find(&self.project, name),
            Scope::Target => find(&self.target, name),
            Scope::Solution => find(&self.solution, name),
        }
    }

    fn read<'a>(
        &self,
        scope: Scope,
        slot: usize,
        bindings: &Bindings<'a, P, S>,
    ) -> Option<Cow<'a, str>> {
        match scope {
            Scope::Project => bindings.project.map(|p| self.project.read(slot, p)),
            Scope::Target => bindings.target.map(|t| self.target.read(slot, t)),
            Scope::Solution => bindings.solution.map(|s| self.solution.read(slot, s)),
        }
    }
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use mg_target::{Compiler, DevEnv, Optimization, Platform};

    use super::*;

    struct TestProject {
        name: String,
    }

    struct TestSolution {
        name: &'static str,
    }

    fn substitutor() -> Substitutor<TestProject, TestSolution> {
        let project = FieldTable::new().field("Name", |p: &TestProject| Cow::Borrowed(&p.name));
        let solution = FieldTable::new().field("Name", |s: &TestSolution| Cow::Borrowed(s.name));
        Substitutor::new(RootPaths::new("/ws", "_generated"), project, solution)
    }

    fn target() -> Target {
        Target::new(
            DevEnv::VS2019,
            Platform::WIN64,
            Compiler::MSBUILD,
            Optimization::DEBUG,
        )
        .unwrap()
    }

    #[test]
    fn smoketest_render() {
        let subst = substitutor();
        let project = TestProject {
            name: "SampleBasic".to_string(),
        };
        let target = target();
        let bindings = Bindings::new().project(&project).target(&target);

        let template = subst
            .compile("_intermediate/[target.DevEnv]_[target.Compiler]_[target.Platform]_[target.Optimization]/[project.Name]")
            .unwrap();
        assert!(!template.is_literal());
        assert_eq!(
            subst.render(&template, &bindings).unwrap(),
            "_intermediate/vs2019_MSBuild_win64_Debug/SampleBasic"
        );
        assert_eq!(
            subst.render_path(&template, &bindings).unwrap(),
            PathBuf::from("/ws/_intermediate/vs2019_MSBuild_win64_Debug/SampleBasic")
        );
    }

    #[test]
    fn smoketest_unknown_names_fail_at_compile() {
        let subst = substitutor();

        let err = subst.compile("[project.Nmae]").unwrap_err();
        assert!(matches!(err, TemplateError::UnknownField { scope: Scope::Project, .. }));

        let err = subst.compile("out/[workspace.Name]").unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnknownScope {
                template: "out/[workspace.Name]".to_string(),
                scope: "workspace".to_string(),
            }
        );
    }

    #[test]
    fn smoketest_missing_scope_fails_whole_render() {
        let subst = substitutor();
        let target = target();
        let bindings: Bindings<'_, TestProject, TestSolution> = Bindings::new().target(&target);

        let err = subst
            .resolve("[target.DevEnv]_[solution.Name]", &bindings)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "placeholder '[solution.Name]' in '[target.DevEnv]_[solution.Name]' has no solution to resolve against"
        );
    }

    #[test]
    fn smoketest_non_placeholder_brackets_are_literal() {
        let subst = substitutor();
        let bindings: Bindings<'_, TestProject, TestSolution> = Bindings::new();

        for raw in ["[abc]", "a[b", "x]y", "[1.2]", "[a.b.c]", "[]", "[.]"] {
            let template = subst.compile(raw).unwrap();
            assert!(template.is_literal(), "{raw}");
            assert_eq!(subst.render(&template, &bindings).unwrap(), raw);
        }
    }

    #[test]
    fn smoketest_idempotent() {
        let subst = substitutor();
        let project = TestProject {
            name: "NetImgui32Lib".to_string(),
        };
        let solution = TestSolution { name: "netImgui_All" };
        let target = target();
        let bindings = Bindings::new()
            .project(&project)
            .target(&target)
            .solution(&solution);

        for raw in [
            "[target.DevEnv]_[solution.Name]",
            "_projects/[target.DevEnv]/[project.Name].vcxproj",
            "[not a placeholder] [project.Name]",
            "plain/path",
        ] {
            let once = subst.resolve(raw, &bindings).unwrap();
            let twice = subst.resolve(&once, &bindings).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn smoketest_bracketed_values() {
        let subst = substitutor();
        let target = target();

        let project = TestProject {
            name: "Arr[0]".to_string(),
        };
        let bindings: Bindings<'_, TestProject, TestSolution> =
            Bindings::new().project(&project).target(&target);
        for (raw, expected) in [
            ("ARR=[0]", "ARR=[0]"),
            ("NAME=[project.Name]", "NAME=Arr[0]"),
            ("[project.Name][target.Platform]", "Arr[0]win64"),
        ] {
            let once = subst.resolve(raw, &bindings).unwrap();
            assert_eq!(once, expected);
            assert_eq!(subst.resolve(&once, &bindings).unwrap(), once);
        }

        // Values are inserted verbatim, a value spelling a placeholder expands again on a
        // second pass.
        let project = TestProject {
            name: "[target.Platform]".to_string(),
        };
        let bindings: Bindings<'_, TestProject, TestSolution> =
            Bindings::new().project(&project).target(&target);
        let once = subst.resolve("[project.Name]", &bindings).unwrap();
        assert_eq!(once, "[target.Platform]");
        assert_eq!(subst.resolve(&once, &bindings).unwrap(), "win64");
    }

    #[test]
    #[should_panic(expected = "registered more than once")]
    fn smoketest_duplicate_field() {
        let _ = FieldTable::<TestProject>::new()
            .field("Name", |p| Cow::Borrowed(&p.name))
            .field("Name", |p| Cow::Borrowed(&p.name));
    }
}
