//! Single interface for registering all of the [`Config`]s for the generator.
//!
//! [`Config`]: mg_cfg::Config

use mg_cfg::ConfigSetBuilder;

pub fn all_cfgs(builder: &mut ConfigSetBuilder) {
    builder
        .register(&crate::defs::WORKSPACE_FILENAME)
        .register(&crate::engine::GENERATED_DIR)
        .register(&crate::engine::EMIT_DIR)
        .register(&crate::engine::RESOLVE_THREADS)
        .register(&crate::engine::CASE_SENSITIVE_CLAIMS);
}

#[cfg(test)]
mod tests {
    use mg_cfg::ConfigSet;

    use super::*;
    use crate::engine::{CASE_SENSITIVE_CLAIMS, RESOLVE_THREADS};

    #[test]
    fn smoketest_all_cfgs() {
        let mut builder = ConfigSet::builder();
        all_cfgs(&mut builder);
        let configs = builder.build();

        let names: Vec<_> = configs.names().collect();
        assert_eq!(
            names,
            [
                "case_sensitive_claims",
                "emit_dir",
                "generated_dir",
                "resolve_threads",
                "workspace_filename"
            ]
        );

        configs
            .apply_overrides([("resolve_threads", "4"), ("case_sensitive_claims", "true")])
            .unwrap();
        assert_eq!(RESOLVE_THREADS.read(&configs), 4);
        assert!(CASE_SENSITIVE_CLAIMS.read(&configs));
    }
}
