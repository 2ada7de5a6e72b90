#![forbid(unsafe_code)]

//! Push tests, rules and first-match rule tables

mod builtin;
mod combinators;
mod predicate;
mod registry;
mod rule;
mod table;

pub use builtin::{
    any_push, branch_matches, from_atomist, has_atomist_build_file, has_cloud_foundry_manifest,
    has_dockerfile, has_file, has_file_matching, has_k8s_spec, has_spring_boot_application_class,
    has_travis_file, is_deploy_enabled, is_java, is_lein, is_maven, is_node,
    material_change_to_java_repo, material_change_to_node_repo, named_seed_repo,
    to_default_branch, to_public_repo,
};
pub use combinators::{all_of, any_of, not};
pub use predicate::{PredicateFn, PushTest, push_test, simple_push_test};
pub use registry::PushTestRegistry;
pub use rule::{LabeledRule, Outcome, Rule, RuleBuilder, when_push_satisfies};
pub use table::{EvaluationResult, Match, RuleTable};
