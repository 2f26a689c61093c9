//! Test helpers and fixtures for ara-ipc integration tests
//!
//! A [`Fixture`] wires both process sides together over an in-memory
//! connection: the plug-in end runs [`PlugInStub`] on its own thread, the host
//! end is driven from the test thread. Plug-in callbacks into the host are
//! only served while the host waits on one of its own calls, the same way a
//! real host pumps messages only inside a call.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`]:
//! - `F32_SAMPLE_EPSILON`: samples that went through single precision
//! - `F64_SAMPLE_EPSILON`: samples that stayed in double precision

pub mod mock_host;
pub mod tolerances;

use ara_ipc::api::{PlugInExtension, PlugInFactory};
use ara_ipc::model::{AudioSourceProperties, DocumentProperties};
use ara_ipc::refs::{AudioSourceHostRef, AudioSourceRef, PlugInExtensionRef};
use ara_ipc::{
    Connection, Dispatch, DocumentControllerProxy, HostSession, PlugInStub, RemoteFactories, Result, Selector,
};
use mock_host::MockHost;
use mock_plugin::{MockExtension, MockFactory};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Install a test-friendly subscriber once. Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Passes every plug-in-bound message to the stub and keeps a copy.
pub struct RecordingDispatch {
    inner: Arc<PlugInStub>,
    messages: Mutex<Vec<(Selector, Vec<u8>)>>,
}

impl Dispatch for RecordingDispatch {
    fn dispatch(&self, selector: Selector, payload: &[u8]) -> Result<Vec<u8>> {
        self.messages.lock().push((selector, payload.to_vec()));
        self.inner.dispatch(selector, payload)
    }
}

pub struct Fixture {
    pub host: Arc<MockHost>,
    pub factory: Arc<MockFactory>,
    pub session: HostSession,
    pub factories: RemoteFactories,
    pub stub: Arc<PlugInStub>,
    recorder: Arc<RecordingDispatch>,
    plugin_thread: Option<JoinHandle<Result<()>>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_factory(MockFactory::new())
    }

    pub fn with_factory(factory: Arc<MockFactory>) -> Self {
        init_tracing();

        let (host_end, plugin_end) = Connection::pair();
        let stub = PlugInStub::new(&plugin_end, vec![factory.clone() as Arc<dyn PlugInFactory>]);
        let recorder = Arc::new(RecordingDispatch {
            inner: stub.clone(),
            messages: Mutex::new(Vec::new()),
        });
        plugin_end.set_dispatcher(recorder.clone());
        let plugin_thread = thread::spawn(move || plugin_end.serve());

        let session = HostSession::new(host_end);
        let factories = RemoteFactories::bootstrap(&session).expect("Failed to bootstrap factories");

        Self {
            host: MockHost::new(),
            factory,
            session,
            factories,
            stub,
            recorder,
            plugin_thread: Some(plugin_thread),
        }
    }

    /// A document controller created with the mock factory and every host interface.
    pub fn controller(&self) -> DocumentControllerProxy {
        let properties = DocumentProperties {
            name: Some("Test Document".into()),
        };
        self.factories
            .create_document_controller(0, self.host.interfaces(), &properties)
            .expect("Failed to create document controller")
    }

    /// A ramp source known to the mock host, registered with `controller`.
    pub fn audio_source(
        &self,
        controller: &DocumentControllerProxy,
        host_ref: AudioSourceHostRef,
        channel_count: usize,
        frames: usize,
        merits_64_bit_samples: bool,
    ) -> AudioSourceRef {
        self.host.add_ramp_source(host_ref, channel_count, frames);
        let properties = AudioSourceProperties {
            name: Some(format!("source {}", host_ref.bits())),
            persistent_id: format!("com.example.source.{}", host_ref.bits()),
            sample_count: frames as i64,
            sample_rate: TEST_SAMPLE_RATE,
            channel_count: channel_count as i32,
            merits_64_bit_samples,
        };
        controller
            .create_audio_source(host_ref, &properties)
            .expect("Failed to create audio source")
    }

    /// A plug-in instance registered with the stub, ready to be bound.
    pub fn extension(&self) -> (Arc<MockExtension>, PlugInExtensionRef) {
        let extension = MockExtension::new(self.factory.clone());
        let remote = self.stub.register_extension(extension.clone() as Arc<dyn PlugInExtension>);
        (extension, remote)
    }

    /// Round trip to the plug-in so every earlier one-way message has been handled.
    pub fn sync(&self) {
        let _: u32 = self
            .session
            .connection()
            .call(Selector::GetFactoriesCount, &())
            .expect("Failed to sync with plug-in");
    }

    /// Messages the plug-in side received, in arrival order.
    pub fn messages(&self) -> Vec<(Selector, Vec<u8>)> {
        self.recorder.messages.lock().clone()
    }

    pub fn clear_messages(&self) {
        self.recorder.messages.lock().clear();
    }

    /// Close the session and return how the plug-in side ended.
    pub fn shutdown(mut self) -> Result<()> {
        self.session.close();
        self.join_plugin()
    }

    fn join_plugin(&mut self) -> Result<()> {
        match self.plugin_thread.take() {
            Some(handle) => handle.join().expect("plug-in thread panicked"),
            None => Ok(()),
        }
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.host.set_read_hook(None);
        self.session.close();
        if let Some(handle) = self.plugin_thread.take() {
            let _ = handle.join();
        }
    }
}
