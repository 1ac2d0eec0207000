#![allow(dead_code)]

use hfdatasets::hf::RepoMeta;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Hub-style repo name: letters, digits, `-` and `_`, mixed case.
pub fn arb_repo_name() -> BoxedStrategy<String> {
    "[A-Za-z0-9_-]{1,16}".boxed()
}

pub fn arb_tag() -> BoxedStrategy<String> {
    "[a-z_:<>0-9 éü]{0,24}".boxed()
}

pub fn arb_repo_meta() -> BoxedStrategy<RepoMeta> {
    (
        "[a-z]{1,8}",
        arb_repo_name(),
        any::<u32>(),
        prop::collection::vec(arb_tag(), 0..5),
    )
        .prop_map(|(owner, name, downloads, tags)| RepoMeta {
            id: format!("{owner}/{name}"),
            last_modified: None,
            downloads: u64::from(downloads),
            tags,
        })
        .boxed()
}

pub fn arb_repo_metas(max: usize) -> BoxedStrategy<Vec<RepoMeta>> {
    prop::collection::vec(arb_repo_meta(), 0..=max).boxed()
}
