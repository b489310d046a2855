//! Diff configuration.

use liveset_core::{Document, EqualsFn, Value};
use std::fmt;
use std::sync::Arc;

/// Maps a document to the shape observers see.
pub type ProjectionFn = Arc<dyn Fn(&Document) -> Document + Send + Sync>;

/// Options shared by the ordered and unordered diffs.
#[derive(Clone, Default)]
pub struct DiffOptions {
    /// Field equality; structural equality when `None`.
    pub equals: Option<EqualsFn>,
    /// Applied to both sides before field diffs and to added documents.
    pub projection: Option<ProjectionFn>,
}

impl DiffOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_equals(mut self, equals: EqualsFn) -> Self {
        self.equals = Some(equals);
        self
    }

    pub fn with_projection(mut self, projection: ProjectionFn) -> Self {
        self.projection = Some(projection);
        self
    }

    pub(crate) fn values_equal(&self, a: &Value, b: &Value) -> bool {
        match &self.equals {
            Some(equals) => equals(a, b),
            None => a == b,
        }
    }

    /// Whole-document equality. A custom predicate sees both documents as
    /// objects.
    pub(crate) fn docs_equal(&self, a: &Document, b: &Document) -> bool {
        match &self.equals {
            Some(equals) => equals(&Value::Object(a.clone()), &Value::Object(b.clone())),
            None => a == b,
        }
    }

    pub(crate) fn project(&self, doc: &Document) -> Document {
        match &self.projection {
            Some(projection) => projection(doc),
            None => doc.clone(),
        }
    }
}

impl fmt::Debug for DiffOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffOptions")
            .field("equals", &self.equals.as_ref().map(|_| "<fn>"))
            .field("projection", &self.projection.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
