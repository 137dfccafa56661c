//! Values that arrive from an asynchronous loader.

/// A value requested from a loader: still in flight, available, or rejected.
///
/// Consumers match on the variant instead of awaiting anything, so a pending asset simply
/// keeps the dependent feature dormant until a later frame.
#[derive(Debug)]
pub enum Loadable<T> {
    Pending,
    Ready(T),
    Failed(anyhow::Error),
}

impl<T> Loadable<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Loadable::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Loadable::Ready(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Loadable::Pending)
    }

    /// Settle a pending value. Returns `false` (and keeps the old value) if it was already settled.
    pub fn resolve(&mut self, result: anyhow::Result<T>) -> bool {
        if !self.is_pending() {
            log::warn!("ignoring a second resolution of an already settled asset");
            return false;
        }
        *self = result.into();
        true
    }
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Loadable::Pending
    }
}

impl<T> From<anyhow::Result<T>> for Loadable<T> {
    fn from(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(value) => Loadable::Ready(value),
            Err(err) => Loadable::Failed(err),
        }
    }
}
