#![allow(
    clippy::expect_used,
    reason = "integration tests prefer expect for expressive failures"
)]

//! Tests for the regeneration rules and the environment snapshot.

use maki::config::GeneratorConfig;
use maki::dep::DepGraph;
use maki::ninja_gen::{NinjaGenerator, NinjaOutput};
use rstest::{fixture, rstest};
use test_support::{add_target, StubEvaluator, StubMakefileCache};

fn generate(
    graph: &DepGraph,
    ev: &mut StubEvaluator,
    cache: &StubMakefileCache,
    config: &GeneratorConfig,
) -> NinjaOutput {
    NinjaGenerator::new(graph, ev, cache, config)
        .generate(false, "maki -f Makefile")
        .expect("generate ninja output")
}

#[fixture]
fn ev() -> StubEvaluator {
    let mut ev = StubEvaluator::new();
    ev.set_var("SHELL", "/bin/sh");
    ev
}

#[fixture]
fn graph() -> DepGraph {
    let mut graph = DepGraph::new();
    add_target(&mut graph, "out", &["touch out"]);
    graph
}

fn regen_config() -> GeneratorConfig {
    GeneratorConfig {
        gen_regen_rule: true,
        ..GeneratorConfig::default()
    }
}

#[rstest]
fn no_regen_rules_by_default(mut ev: StubEvaluator, graph: DepGraph) {
    let cache = StubMakefileCache::with_files(&["Makefile"]);
    let output = generate(&graph, &mut ev, &cache, &GeneratorConfig::default());
    assert!(!output.ninja.contains("regen_ninja"));
    assert!(!output.ninja.contains("regen_envlist"));
}

#[rstest]
fn regen_rule_reruns_the_original_invocation(mut ev: StubEvaluator, graph: DepGraph) {
    let cache = StubMakefileCache::with_files(&["Makefile"]);
    let output = generate(&graph, &mut ev, &cache, &regen_config());
    assert!(output.ninja.contains(
        "rule regen_ninja\n command = maki -f Makefile\n generator = 1\n"
    ));
    assert!(output
        .ninja
        .contains("build ./build.ninja: regen_ninja Makefile\n"));
    assert!(!output.ninja.contains("regen_envlist"));
    assert_eq!(output.envlist, None);
}

#[rstest]
fn makefile_inputs_are_sorted(mut ev: StubEvaluator, graph: DepGraph) {
    let cache = StubMakefileCache::with_files(&["rules/b.mk", "Makefile", "rules/a.mk"]);
    let output = generate(&graph, &mut ev, &cache, &regen_config());
    assert!(output.ninja.contains(
        "build ./build.ninja: regen_ninja Makefile rules/a.mk rules/b.mk\n"
    ));
}

#[rstest]
fn strict_mode_fails_the_build_on_env_change(mut ev: StubEvaluator, graph: DepGraph) {
    ev.use_env("V", "1");
    let cache = StubMakefileCache::with_files(&["Makefile"]);
    let config = GeneratorConfig {
        error_on_env_change: true,
        ..regen_config()
    };

    let output = generate(&graph, &mut ev, &cache, &config);
    assert!(output.ninja.contains("# Environment variables used:\n# V=1\n"));
    assert!(output
        .ninja
        .contains("build ./build.ninja: regen_ninja Makefile ./.kati_env\n"));
    assert!(output.ninja.contains("build .always_build: phony\n"));
    assert!(output.ninja.contains(
        "rule regen_envlist\n command = rm -f $out.tmp && echo V=$$V >> $out.tmp \
         && (diff $out.tmp $out || (echo Environment variable changes are detected && false))\n \
         restat = 1\n generator = 1\n description = Check $out\n"
    ));
    assert!(output
        .ninja
        .contains("build ./.kati_env: regen_envlist .always_build\n"));
    assert_eq!(output.envlist.as_deref(), Some("V=1\n"));
}

#[rstest]
fn forgiving_mode_refreshes_the_snapshot(mut ev: StubEvaluator, graph: DepGraph) {
    ev.use_env("V", "1");
    let cache = StubMakefileCache::with_files(&["Makefile"]);

    let output = generate(&graph, &mut ev, &cache, &regen_config());
    assert!(output
        .ninja
        .contains(" && (diff $out.tmp $out || mv $out.tmp $out)\n"));
    assert!(!output.ninja.contains("Environment variable changes are detected"));
}

#[rstest]
fn used_envs_are_listed_lexicographically(mut ev: StubEvaluator, graph: DepGraph) {
    ev.use_env("ZED", "26");
    ev.use_env("ALPHA", "1");
    let cache = StubMakefileCache::with_files(&["Makefile"]);

    let output = generate(&graph, &mut ev, &cache, &regen_config());
    assert_eq!(output.envlist.as_deref(), Some("ALPHA=1\nZED=26\n"));
    assert!(output.ninja.contains(
        " command = rm -f $out.tmp && echo ALPHA=$$ALPHA >> $out.tmp \
         && echo ZED=$$ZED >> $out.tmp && (diff"
    ));
    assert!(output
        .ninja
        .contains("# Environment variables used:\n# ALPHA=1\n# ZED=26\n"));
}
