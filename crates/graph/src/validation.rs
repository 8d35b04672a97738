//! Validation reports.
//!
//! The builder never stops at the first problem: everything it can discover
//! about a definition is collected into one [`ValidationReport`].

use crate::Error;
use miette::Diagnostic;
use thiserror::Error;

/// Every error found while building one pipeline.
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
#[error("Pipeline '{pipeline_id}' failed validation with {} error(s)", .errors.len())]
#[diagnostic(code(pipeline_ir::graph::invalid_pipeline))]
pub struct ValidationReport {
    pipeline_id: String,
    #[related]
    errors: Vec<Error>,
}

impl ValidationReport {
    /// Create a report.
    #[must_use]
    pub fn new(pipeline_id: impl Into<String>, errors: Vec<Error>) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            errors,
        }
    }

    /// Id of the pipeline that failed.
    #[must_use]
    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    /// The collected errors, in discovery order.
    #[must_use]
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether the report is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether any error satisfies `predicate`.
    pub fn contains(&self, predicate: impl Fn(&Error) -> bool) -> bool {
        self.errors.iter().any(predicate)
    }

    /// Consume the report, yielding its errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }
}
