//! Loading a workspace from disk and emitting the resolved model.

use std::sync::Arc;

use mg_cfg::ConfigSet;
use mg_core::emit::{ModelEmitter, TomlEmitter};
use mg_core::listing::DiskListing;
use mg_core::{Engine, EngineConfig};
use mg_target::{DevEnv, StaticProbe};

const WORKSPACE: &str = r#"
[settings]
emit_dir = "out"

[targets]
discover = true
patterns = [{ optimization = ["Release"], platform = ["win64"] }]

[projects.Hello]
kind = "executable"
source_root = "Code/Hello"
exclude = ["**/skip/**"]

[solutions.Hello]
projects = [{ project = "Hello", folder = "Apps" }]
"#;

fn setup() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("WORKSPACE.mg.toml"), WORKSPACE).unwrap();
    let code = dir.path().join("Code/Hello");
    std::fs::create_dir_all(code.join("skip")).unwrap();
    std::fs::write(code.join("main.cpp"), "int main() {}").unwrap();
    std::fs::write(code.join("skip/ignored.cpp"), "").unwrap();
    std::fs::write(code.join("notes.txt"), "").unwrap();
    dir
}

fn engine(dir: &tempfile::TempDir) -> Engine {
    let mut builder = ConfigSet::builder();
    mg_core::cfgs::all_cfgs(&mut builder);
    Engine::new(EngineConfig {
        workspace_dir: dir.path().to_path_buf(),
        configs: builder.build(),
        overrides: vec![("resolve_threads".to_string(), "2".to_string())],
        listing: Arc::new(DiskListing),
        probe: Some(Arc::new(StaticProbe::new(DevEnv::VS2019, DevEnv::empty()))),
    })
    .unwrap()
}

#[test]
fn smoketest_load_and_emit() {
    let dir = setup();
    let engine = engine(&dir);
    assert_eq!(engine.emit_dir(), dir.path().join("out"));

    let model = engine.generate("all").unwrap();
    // Clang isn't installed, leaving only MSBuild.
    assert_eq!(model.configurations().len(), 1);
    let conf = &model.configurations()[0];
    let sources: Vec<_> = conf.sources().iter().map(|source| source.path.clone()).collect();
    assert_eq!(sources, [dir.path().join("Code/Hello/main.cpp")]);

    let written = TomlEmitter::new(engine.emit_dir()).emit(&model).unwrap();
    assert_eq!(written, [dir.path().join("out/Hello.resolved.toml")]);

    let raw = std::fs::read_to_string(&written[0]).unwrap();
    let document: toml::Value = toml::from_str(&raw).unwrap();
    assert_eq!(document["solution"]["name"].as_str(), Some("Hello"));
    let project = &document["solution"]["configurations"][0]["projects"][0];
    assert_eq!(project["folder"].as_str(), Some("Apps"));
    assert_eq!(document["configurations"][0]["project"].as_str(), Some("Hello"));
}

#[test]
fn smoketest_missing_workspace_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = ConfigSet::builder();
    mg_core::cfgs::all_cfgs(&mut builder);
    let result = Engine::new(EngineConfig {
        workspace_dir: dir.path().to_path_buf(),
        configs: builder.build(),
        overrides: Vec::new(),
        listing: Arc::new(DiskListing),
        probe: None,
    });
    assert!(result.is_err());
}

#[test]
fn smoketest_netimgui_demo_compiles() {
    let raw = include_str!("../../demos/netimgui/WORKSPACE.mg.toml");
    let spec = mg_core::defs::WorkspaceSpec::from_toml(raw).unwrap();
    let mut builder = ConfigSet::builder();
    mg_core::cfgs::all_cfgs(&mut builder);
    let engine = Engine::from_spec(
        EngineConfig {
            workspace_dir: std::path::PathBuf::from("netimgui"),
            configs: builder.build(),
            overrides: Vec::new(),
            listing: Arc::new(mg_core::listing::MemoryListing::default()),
            probe: Some(Arc::new(StaticProbe::new(DevEnv::VS2022, DevEnv::VS2022))),
        },
        &spec,
    )
    .unwrap();

    let workspace = engine.workspace();
    assert!(workspace.project("NetImguiServer").is_ok());
    let server: Vec<_> = workspace.mode("server").unwrap().iter().map(|s| s.name().to_string()).collect();
    assert_eq!(server, ["netImgui_Server"]);
    assert_eq!(workspace.mode("all").unwrap().len(), 3);
    assert!(workspace.mode("nope").is_err());
}
