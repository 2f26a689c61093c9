//! Factory discovery.
//!
//! The plug-in process may offer several factories. Their descriptors are
//! fetched once at bootstrap and kept as owned copies; a factory is addressed
//! by its index from then on.

use crate::document_controller::DocumentControllerProxy;
use crate::session::HostSession;
use ara_ipc_core::api::HostInterfaces;
use ara_ipc_core::model::{DocumentProperties, FactoryDescriptor};
use ara_ipc_core::{IpcError, Result, Selector};
use tracing::info;

pub struct RemoteFactories {
    session: HostSession,
    descriptors: Vec<FactoryDescriptor>,
}

impl RemoteFactories {
    /// Query every factory the plug-in process offers.
    pub fn bootstrap(session: &HostSession) -> Result<Self> {
        let connection = session.connection();
        let count: u32 = connection.call(Selector::GetFactoriesCount, &())?;
        let descriptors = (0..count)
            .map(|index| connection.call::<_, FactoryDescriptor>(Selector::GetFactory, &index))
            .collect::<Result<Vec<_>>>()?;

        for (index, descriptor) in descriptors.iter().enumerate() {
            info!(
                index,
                factory_id = %descriptor.factory_id,
                name = %descriptor.plugin_name,
                archive_id = %descriptor.document_archive_id,
                "remote factory"
            );
        }

        Ok(Self {
            session: session.clone(),
            descriptors,
        })
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptor(&self, index: usize) -> Option<&FactoryDescriptor> {
        self.descriptors.get(index)
    }

    pub fn descriptors(&self) -> &[FactoryDescriptor] {
        &self.descriptors
    }

    /// Index of the factory with `factory_id`.
    pub fn find(&self, factory_id: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.factory_id == factory_id)
    }

    pub fn session(&self) -> &HostSession {
        &self.session
    }

    /// Create a document controller with factory `index`.
    ///
    /// `interfaces` serve the callbacks the plug-in makes for this controller.
    pub fn create_document_controller(
        &self,
        index: usize,
        interfaces: HostInterfaces,
        properties: &DocumentProperties,
    ) -> Result<DocumentControllerProxy> {
        if index >= self.descriptors.len() {
            return Err(IpcError::InvalidArgument(format!(
                "factory index {index} out of range (have {})",
                self.descriptors.len()
            )));
        }
        DocumentControllerProxy::create(&self.session, index as u32, interfaces, properties)
    }
}

impl std::fmt::Debug for RemoteFactories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFactories")
            .field("descriptors", &self.descriptors)
            .finish_non_exhaustive()
    }
}
