//! Error policies: the collaborator deciding drop versus abort.
//!
//! Materialization failures never panic and never silently disappear. Every
//! item-level or annotation-level failure is handed to the [`ErrorPolicy`]
//! keyed by `(item id, subset)`; the hook's return value decides whether
//! extraction continues (the failing item or record is dropped) or aborts.

use std::cell::RefCell;
use std::rc::Rc;

use log::warn;

use crate::error::{AnnotationError, ImportError};

/// Receives item-level and annotation-level extraction failures.
///
/// Returning `Ok(())` tolerates the failure: the item is evicted (or the
/// record dropped) and extraction continues. Returning `Err` aborts the
/// current operation with that error.
pub trait ErrorPolicy {
    fn report_item_error(
        &mut self,
        error: ImportError,
        item_id: &str,
        subset: &str,
    ) -> Result<(), ImportError>;

    fn report_annotation_error(
        &mut self,
        error: AnnotationError,
        item_id: &str,
        subset: &str,
    ) -> Result<(), ImportError>;
}

/// Aborts extraction on the first failure of any kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailFast;

impl ErrorPolicy for FailFast {
    fn report_item_error(
        &mut self,
        error: ImportError,
        _item_id: &str,
        _subset: &str,
    ) -> Result<(), ImportError> {
        Err(error)
    }

    fn report_annotation_error(
        &mut self,
        error: AnnotationError,
        _item_id: &str,
        _subset: &str,
    ) -> Result<(), ImportError> {
        Err(error.into())
    }
}

/// An item-level failure retained by [`Tolerate`].
#[derive(Debug)]
pub struct ItemFailure {
    pub item_id: String,
    pub subset: String,
    pub error: ImportError,
}

/// An annotation-level failure retained by [`Tolerate`].
#[derive(Debug)]
pub struct AnnotationFailure {
    pub item_id: String,
    pub subset: String,
    pub error: AnnotationError,
}

#[derive(Debug, Default)]
struct LogInner {
    item_failures: Vec<ItemFailure>,
    annotation_failures: Vec<AnnotationFailure>,
}

/// Shared handle onto the failures collected by a [`Tolerate`] policy.
///
/// Clone the handle before moving the policy into the extractor; both refer
/// to the same log. Single-threaded by design, like the extractor itself.
#[derive(Clone, Debug, Default)]
pub struct ErrorLog {
    inner: Rc<RefCell<LogInner>>,
}

impl ErrorLog {
    pub fn item_failure_count(&self) -> usize {
        self.inner.borrow().item_failures.len()
    }

    pub fn annotation_failure_count(&self) -> usize {
        self.inner.borrow().annotation_failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_failure_count() == 0 && self.annotation_failure_count() == 0
    }

    /// Drains the retained item-level failures.
    pub fn take_item_failures(&self) -> Vec<ItemFailure> {
        std::mem::take(&mut self.inner.borrow_mut().item_failures)
    }

    /// Drains the retained annotation-level failures.
    pub fn take_annotation_failures(&self) -> Vec<AnnotationFailure> {
        std::mem::take(&mut self.inner.borrow_mut().annotation_failures)
    }
}

/// Tolerates every failure: drops the item or record, logs a warning, and
/// retains the failure in an inspectable [`ErrorLog`].
#[derive(Debug, Default)]
pub struct Tolerate {
    log: ErrorLog,
}

impl Tolerate {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle onto the shared failure log.
    pub fn log(&self) -> ErrorLog {
        self.log.clone()
    }
}

impl ErrorPolicy for Tolerate {
    fn report_item_error(
        &mut self,
        error: ImportError,
        item_id: &str,
        subset: &str,
    ) -> Result<(), ImportError> {
        warn!("dropping item '{item_id}' in subset '{subset}': {error}");
        self.log.inner.borrow_mut().item_failures.push(ItemFailure {
            item_id: item_id.to_string(),
            subset: subset.to_string(),
            error,
        });
        Ok(())
    }

    fn report_annotation_error(
        &mut self,
        error: AnnotationError,
        item_id: &str,
        subset: &str,
    ) -> Result<(), ImportError> {
        warn!("dropping annotation of item '{item_id}' in subset '{subset}': {error}");
        self.log
            .inner
            .borrow_mut()
            .annotation_failures
            .push(AnnotationFailure {
                item_id: item_id.to_string(),
                subset: subset.to_string(),
                error,
            });
        Ok(())
    }
}
