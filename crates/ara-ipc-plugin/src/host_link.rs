//! Route from a host interface proxy back to its host-side controller.

use ara_ipc_core::refs::DocumentControllerHostRef;
use ara_ipc_core::{Connection, IpcError, Result, Selector};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Weak};
use tracing::error;

/// Connection plus the controller host ref every host callback starts with.
///
/// The host interface traits have no error channel. A failed call is logged
/// here and the proxy answers with the trait's failure value.
#[derive(Clone)]
pub(crate) struct HostLink {
    connection: Weak<Connection>,
    controller: DocumentControllerHostRef,
}

impl HostLink {
    pub(crate) fn new(connection: &Arc<Connection>, controller: DocumentControllerHostRef) -> Self {
        Self {
            connection: Arc::downgrade(connection),
            controller,
        }
    }

    pub(crate) fn controller(&self) -> DocumentControllerHostRef {
        self.controller
    }

    fn connection(&self) -> Result<Arc<Connection>> {
        self.connection.upgrade().ok_or(IpcError::Disconnected)
    }

    /// Largest argument or reply payload one call can carry, `None` once the
    /// session is gone.
    pub(crate) fn max_payload_size(&self) -> Option<usize> {
        self.connection().ok().map(|connection| connection.max_payload_size())
    }

    pub(crate) fn try_call<A, R>(&self, selector: Selector, args: &A) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.connection()?.call(selector, args)
    }

    /// Blocking call; `None` if it failed.
    pub(crate) fn call<A, R>(&self, selector: Selector, args: &A) -> Option<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        match self.try_call(selector, args) {
            Ok(reply) => Some(reply),
            Err(e) => {
                error!(%selector, controller = self.controller.bits(), error = %e, "host call failed");
                None
            }
        }
    }

    pub(crate) fn notify<A>(&self, selector: Selector, args: &A)
    where
        A: Serialize + ?Sized,
    {
        if let Err(e) = self.connection().and_then(|c| c.notify(selector, args)) {
            error!(%selector, controller = self.controller.bits(), error = %e, "host notification failed");
        }
    }
}

impl std::fmt::Debug for HostLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostLink")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}
