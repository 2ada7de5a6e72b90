#![forbid(unsafe_code)]

//! Registry of named push tests
//!
//! Rules loaded from `machine.toml` refer to push tests by name. The registry
//! resolves those names, including the negation and argument forms:
//!
//! - `is-maven` - a registered push test
//! - `!is-node` - negation of a registered push test
//! - `has-file:Dockerfile` - a push test constructed from an argument

use crate::error::ConfigError;
use crate::rules::builtin;
use crate::rules::combinators::not;
use crate::rules::predicate::PredicateFn;
use std::collections::BTreeMap;

/// Constructs a push test from the argument after the `:`
pub type PushTestFactory = fn(&str) -> Result<PredicateFn, ConfigError>;

#[derive(Clone)]
enum Entry {
    Fixed(PredicateFn),
    WithArgument(PushTestFactory),
}

/// Name-to-push-test lookup used when building rules from configuration
#[derive(Clone, Default)]
pub struct PushTestRegistry {
    tests: BTreeMap<String, Entry>,
}

impl PushTestRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in push test
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let fixed = [
            builtin::is_maven(),
            builtin::is_node(),
            builtin::is_lein(),
            builtin::is_java(),
            builtin::has_dockerfile(),
            builtin::has_travis_file(),
            builtin::has_cloud_foundry_manifest(),
            builtin::has_k8s_spec(),
            builtin::has_atomist_build_file(),
            builtin::has_spring_boot_application_class(),
            builtin::to_default_branch(),
            builtin::to_public_repo(),
            builtin::from_atomist(),
            builtin::is_deploy_enabled(),
            builtin::named_seed_repo(),
            builtin::material_change_to_java_repo(),
            builtin::material_change_to_node_repo(),
            builtin::any_push(),
        ];
        for test in fixed {
            registry
                .tests
                .insert(test.name().to_string(), Entry::Fixed(test));
        }
        registry.tests.insert(
            "has-file".to_string(),
            Entry::WithArgument(|path| Ok(builtin::has_file(path))),
        );
        registry.tests.insert(
            "has-file-matching".to_string(),
            Entry::WithArgument(builtin::has_file_matching),
        );
        registry.tests.insert(
            "branch-matches".to_string(),
            Entry::WithArgument(builtin::branch_matches),
        );
        registry
    }

    /// Register a push test under its own name
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the name is already taken.
    pub fn register(&mut self, test: PredicateFn) -> Result<&mut Self, ConfigError> {
        let name = test.name().to_string();
        self.insert(name, Entry::Fixed(test))
    }

    /// Register a push test that takes an argument (`name:argument`)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the name is already taken.
    pub fn register_with_argument(
        &mut self,
        name: &str,
        factory: PushTestFactory,
    ) -> Result<&mut Self, ConfigError> {
        self.insert(name.to_string(), Entry::WithArgument(factory))
    }

    fn insert(&mut self, name: String, entry: Entry) -> Result<&mut Self, ConfigError> {
        if name.is_empty() || name.contains([':', '!']) || name.contains(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "Invalid push test name '{}'",
                name
            )));
        }
        if self.tests.contains_key(&name) {
            return Err(ConfigError::Validation(format!(
                "Duplicate push test '{}'",
                name
            )));
        }
        self.tests.insert(name, entry);
        Ok(self)
    }

    /// Resolve a push test spec string
    ///
    /// # Errors
    ///
    /// - `ConfigError::UnknownPushTest` if the name is not registered
    /// - `ConfigError::Validation` if an argument is missing or unexpected
    /// - Whatever the argument factory reports (invalid glob or regex)
    pub fn resolve(&self, spec: &str) -> Result<PredicateFn, ConfigError> {
        let spec = spec.trim();
        if let Some(inner) = spec.strip_prefix('!') {
            return Ok(not(self.resolve(inner)?));
        }

        let (name, argument) = match spec.split_once(':') {
            Some((name, argument)) => (name.trim(), Some(argument)),
            None => (spec, None),
        };

        let entry = self
            .tests
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPushTest(name.to_string()))?;

        match (entry, argument) {
            (Entry::Fixed(test), None) => Ok(test.clone()),
            (Entry::Fixed(_), Some(_)) => Err(ConfigError::Validation(format!(
                "Push test '{}' takes no argument",
                name
            ))),
            (Entry::WithArgument(factory), Some(argument)) if !argument.is_empty() => {
                factory(argument)
            }
            (Entry::WithArgument(_), _) => Err(ConfigError::Validation(format!(
                "Push test '{}' requires an argument ('{}:<value>')",
                name, name
            ))),
        }
    }

    /// Resolve every spec in order
    ///
    /// # Errors
    ///
    /// Returns the first resolution error.
    pub fn resolve_all<S: AsRef<str>>(&self, specs: &[S]) -> Result<Vec<PredicateFn>, ConfigError> {
        specs.iter().map(|spec| self.resolve(spec.as_ref())).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tests.contains_key(name)
    }

    /// Registered names, sorted; argument-taking tests are shown as `name:<arg>`
    pub fn names(&self) -> Vec<String> {
        self.tests
            .iter()
            .map(|(name, entry)| match entry {
                Entry::Fixed(_) => name.clone(),
                Entry::WithArgument(_) => format!("{}:<arg>", name),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

impl std::fmt::Debug for PushTestRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushTestRegistry")
            .field("tests", &self.tests.keys().collect::<Vec<_>>())
            .finish()
    }
}
