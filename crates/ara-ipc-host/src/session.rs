//! Host session: one connection to one plug-in process.
//!
//! The session owns the table of live document controller proxies. Its handle
//! bits are the `DocumentControllerHostRef` the plug-in sends back with every
//! callback, which is how the dispatcher finds the target controller.

use crate::dispatcher::HostDispatcher;
use crate::document_controller::ControllerShared;
use ara_ipc_core::{Connection, HandleTable, IpcConfig, IpcError, ObjectKind, Result, SocketTransport};
use ara_ipc_core::refs::DocumentControllerHostRef;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

pub(crate) struct SessionState {
    pub(crate) controllers: Mutex<HandleTable<Arc<ControllerShared>>>,
    /// Largest reply payload the connection can carry.
    pub(crate) max_payload_size: usize,
}

impl SessionState {
    fn new(max_payload_size: usize) -> Self {
        Self {
            controllers: Mutex::new(HandleTable::new(ObjectKind::DocumentController)),
            max_payload_size,
        }
    }

    /// Resolve a callback's controller host ref to a controller that still accepts calls.
    pub(crate) fn controller(&self, host_ref: DocumentControllerHostRef) -> Result<Arc<ControllerShared>> {
        let controller = self.controllers.lock().lookup(host_ref.bits())?.clone();
        if controller.is_gone() {
            return Err(IpcError::StaleHandle {
                kind: ObjectKind::DocumentController,
                handle: host_ref.bits(),
            });
        }
        Ok(controller)
    }
}

/// Host end of a session.
///
/// Cloning is cheap and every clone addresses the same session.
#[derive(Clone)]
pub struct HostSession {
    connection: Arc<Connection>,
    pub(crate) state: Arc<SessionState>,
}

impl HostSession {
    /// Take over `connection` and install the host callback dispatcher on it.
    pub fn new(connection: Arc<Connection>) -> Self {
        let state = Arc::new(SessionState::new(connection.max_payload_size()));
        connection.set_dispatcher(Arc::new(HostDispatcher::new(Arc::downgrade(&state))));
        Self { connection, state }
    }

    /// Connect to a plug-in process listening on `config.socket_path`.
    pub fn connect(config: &IpcConfig) -> Result<Self> {
        let transport = SocketTransport::connect(config)?;
        info!(path = %config.socket_path.display(), "host session connected");
        Ok(Self::new(Connection::from_socket(transport)))
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Number of document controllers not yet finalized.
    pub fn controller_count(&self) -> usize {
        self.state.controllers.lock().len()
    }

    /// End the session. Proxies still alive afterwards fail with `Disconnected`.
    pub fn close(&self) {
        self.connection.close();
        let controllers = self.state.controllers.lock().drain();
        for controller in controllers {
            controller.mark_gone();
        }
        info!("host session closed");
    }
}
