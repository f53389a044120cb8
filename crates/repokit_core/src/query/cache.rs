//! Process-wide cache of compiled plans keyed by query name.
//!
//! Plans are immutable once inserted. Concurrent compilation of the same name
//! is harmless: the first insert wins and later callers receive that plan.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug)]
pub struct PlanCache<P> {
    plans: RwLock<HashMap<String, Arc<P>>>,
}

impl<P> Default for PlanCache<P> {
    fn default() -> Self {
        Self {
            plans: RwLock::new(HashMap::new()),
        }
    }
}

impl<P> PlanCache<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<P>> {
        self.plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Stores `plan` unless `name` is already cached; returns the cached plan.
    pub fn insert(&self, name: &str, plan: P) -> Arc<P> {
        let mut plans = self.plans.write().unwrap_or_else(PoisonError::into_inner);
        plans
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(plan))
            .clone()
    }

    /// Returns the cached plan for `name`, compiling it on first use.
    pub fn get_or_try_insert<E>(
        &self,
        name: &str,
        compile: impl FnOnce() -> Result<P, E>,
    ) -> Result<Arc<P>, E> {
        if let Some(plan) = self.get(name) {
            return Ok(plan);
        }
        let plan = compile()?;
        Ok(self.insert(name, plan))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
