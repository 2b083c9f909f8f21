//! `TestExecutionContext` (spec.md §4.D Test family): the seam `When` uses to
//! look up a named feature set, fork a child context seeded with the
//! caller's current bindings, run it, and hand back its response.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::context::{ExecutionContext, Response};
use crate::descriptors::FeatureSet;
use crate::error::{ActionError, Result};
use crate::executor::FeatureSetExecutor;
use crate::value::TypedValue;

/// One `Then`/`Assert` outcome, as spec.md §8 scenario 1 names it:
/// `{variable, expected, actual, passed}`.
#[derive(Debug, Clone)]
pub struct AssertionRecord {
    pub variable: String,
    pub expected: TypedValue,
    pub actual: TypedValue,
    pub passed: bool,
}

#[async_trait::async_trait]
pub trait TestExecutionContext: Send + Sync {
    /// Forks `parent` (bindings copied, not shared), runs the named feature
    /// set to completion, and returns the response it captured.
    async fn run_feature_set(&self, name: &str, parent: &mut ExecutionContext) -> Result<Response>;

    /// `Then`/`Assert` call this regardless of outcome, pass or fail.
    fn record_assertion(&self, record: AssertionRecord);
}

/// Backed by an in-process map from feature-set name to body, registered by
/// whatever loads `.feature` sources (out of scope here, spec.md §1).
pub struct InMemoryTestExecutionContext {
    feature_sets: RwLock<HashMap<String, Arc<FeatureSet>>>,
    executor: Arc<FeatureSetExecutor>,
    assertions: RwLock<Vec<AssertionRecord>>,
}

impl InMemoryTestExecutionContext {
    pub fn new(executor: Arc<FeatureSetExecutor>) -> Self {
        Self {
            feature_sets: RwLock::new(HashMap::new()),
            executor,
            assertions: RwLock::new(Vec::new()),
        }
    }

    pub fn register_feature_set(&self, feature_set: FeatureSet) {
        self.feature_sets
            .write()
            .unwrap()
            .insert(feature_set.name.clone(), Arc::new(feature_set));
    }

    pub fn assertions(&self) -> Vec<AssertionRecord> {
        self.assertions.read().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TestExecutionContext for InMemoryTestExecutionContext {
    async fn run_feature_set(&self, name: &str, parent: &mut ExecutionContext) -> Result<Response> {
        let feature_set = self
            .feature_sets
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ActionError::runtime(format!("no feature set registered named `{name}`")))?;

        let mut child = parent.fork_child(feature_set.name.clone());
        self.executor.run(&feature_set, &mut child).await?;
        Ok(child.take_response().unwrap_or(Response {
            status: "completed".to_string(),
            reason: String::new(),
            data: Default::default(),
        }))
    }

    fn record_assertion(&self, record: AssertionRecord) {
        self.assertions.write().unwrap().push(record);
    }
}
