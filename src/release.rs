//! Releasing resources obtained during evaluation.
//!
//! [`Releasables`] groups several owned resources behind one release point.
//! Releasing the group attempts every member even when some fail; the first
//! failure is reported and the rest are carried along as suppressed.

use crate::block::{BlockError, BlockResult};
use log::warn;

/// A resource that must be released exactly once.
///
/// `close` releases the resource on the first call and is a no-op afterwards.
pub trait Releasable {
    fn close(&mut self) -> BlockResult<()>;
}

impl<R: Releasable + ?Sized> Releasable for Box<R> {
    fn close(&mut self) -> BlockResult<()> {
        (**self).close()
    }
}

impl<R: Releasable> Releasable for Option<R> {
    fn close(&mut self) -> BlockResult<()> {
        match self {
            Some(resource) => resource.close(),
            None => Ok(()),
        }
    }
}

/// Release every resource in `resources`, in order.
///
/// All releases are attempted. Returns the first failure with any later
/// failures attached as suppressed.
pub fn close_all<'a, R, I>(resources: I) -> BlockResult<()>
where
    R: Releasable + ?Sized + 'a,
    I: IntoIterator<Item = &'a mut R>,
{
    let failures: Vec<BlockError> = resources
        .into_iter()
        .filter_map(|resource| resource.close().err())
        .collect();
    match BlockError::from_release_failures(failures) {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// A composite guard owning a list of resources.
///
/// The resources are released together by [`close`](Releasable::close) or,
/// failing that, when the guard is dropped.
#[derive(Debug)]
pub struct Releasables<R: Releasable> {
    resources: Vec<R>,
}

impl<R: Releasable> Releasables<R> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            resources: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, resource: R) {
        self.resources.push(resource);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.resources.iter()
    }
}

impl<R: Releasable> Default for Releasables<R> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<R: Releasable> From<Vec<R>> for Releasables<R> {
    fn from(resources: Vec<R>) -> Self {
        Self { resources }
    }
}

impl<R: Releasable> Releasable for Releasables<R> {
    fn close(&mut self) -> BlockResult<()> {
        close_all(self.resources.iter_mut())
    }
}

impl<R: Releasable> Drop for Releasables<R> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to release resources on drop: {}", e);
        }
    }
}
