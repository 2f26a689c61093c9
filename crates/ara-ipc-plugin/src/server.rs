//! Socket front end of the plug-in process.
//!
//! The host spawns the plug-in process with a socket path, then connects to
//! it. One accepted connection is one session.

use crate::stub::PlugInStub;
use ara_ipc_core::api::PlugInFactory;
use ara_ipc_core::{Connection, IpcConfig, Result, TransportListener};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct PlugInServer {
    listener: TransportListener,
    factories: Vec<Arc<dyn PlugInFactory>>,
}

impl PlugInServer {
    pub fn bind(config: &IpcConfig, factories: Vec<Arc<dyn PlugInFactory>>) -> Result<Self> {
        let listener = TransportListener::bind(config)?;
        info!(path = %listener.path().display(), factories = factories.len(), "plug-in server listening");
        Ok(Self { listener, factories })
    }

    pub fn path(&self) -> &Path {
        self.listener.path()
    }

    /// Wait for a host and install a stub on its connection.
    ///
    /// The caller drives the session with [`Connection::serve`].
    pub fn accept(&self) -> Result<(Arc<Connection>, Arc<PlugInStub>)> {
        let connection = Connection::from_socket(self.listener.accept()?);
        let stub = PlugInStub::new(&connection, self.factories.clone());
        info!("host connected");
        Ok((connection, stub))
    }

    /// Serve a single host session until it says goodbye.
    pub fn run(&self) -> Result<()> {
        let (connection, _stub) = self.accept()?;
        let result = connection.serve();
        info!(ok = result.is_ok(), "host session ended");
        result
    }
}
