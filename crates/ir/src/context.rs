//! Contexts: typed tags grouping nodes.

use crate::Value;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// A typed, named tag such as `pipeline=custom1` or `node=custom1.Trainer`.
///
/// Two contexts are equal iff both the type and the name are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Context {
    /// Context type, e.g. `"pipeline"` or `"node"`.
    #[serde(rename = "type")]
    pub context_type: String,
    /// Context name.
    pub name: Value,
}

impl Context {
    /// Create a new context.
    #[must_use]
    pub fn new(context_type: impl Into<String>, name: impl Into<Value>) -> Self {
        Self {
            context_type: context_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.context_type, self.name)
    }
}

/// Check that every filter matches a distinct declared context.
///
/// Equality covers both type and name, so repeated filters collapse into one
/// requirement and the check reduces to set containment.
pub fn contexts_match<'a, I>(declared: I, filters: &[Context]) -> bool
where
    I: IntoIterator<Item = &'a Context>,
{
    if filters.is_empty() {
        return true;
    }
    let declared: HashSet<&Context> = declared.into_iter().collect();
    filters.iter().all(|filter| declared.contains(filter))
}

/// Deduplicates context declarations into shared instances.
#[derive(Debug, Default)]
pub struct ContextInterner {
    contexts: Vec<Arc<Context>>,
    index: HashMap<Context, usize>,
}

impl ContextInterner {
    /// Create an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared instance equal to `context`, inserting it if new.
    pub fn intern(&mut self, context: &Context) -> Arc<Context> {
        if let Some(&idx) = self.index.get(context) {
            return Arc::clone(&self.contexts[idx]);
        }
        let shared = Arc::new(context.clone());
        self.index.insert(context.clone(), self.contexts.len());
        self.contexts.push(Arc::clone(&shared));
        shared
    }

    /// Intern a list of declarations, dropping duplicates while keeping
    /// first-declaration order.
    pub fn intern_all<'a>(
        &mut self,
        contexts: impl IntoIterator<Item = &'a Context>,
    ) -> Vec<Arc<Context>> {
        let mut seen = HashSet::new();
        contexts
            .into_iter()
            .filter(|context| seen.insert(*context))
            .map(|context| self.intern(context))
            .collect()
    }

    /// Number of distinct contexts seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Whether no context has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Consume the interner, yielding distinct contexts in first-seen order.
    #[must_use]
    pub fn into_contexts(self) -> Vec<Arc<Context>> {
        self.contexts
    }
}
