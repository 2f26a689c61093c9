//! Probe binary. Connects to a plug-in process and lists its factories.

use ara_ipc_host::{HostSession, IpcConfig, IpcError, RemoteFactories, Result};
use std::env;

fn load_config() -> Result<IpcConfig> {
    match env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            serde_json::from_str(&text)
                .map_err(|e| IpcError::InvalidArgument(format!("bad config {path}: {e}")))
        }
        None => Ok(IpcConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = load_config()?;
    let session = HostSession::connect(&config)?;
    let factories = RemoteFactories::bootstrap(&session)?;

    for (index, descriptor) in factories.descriptors().iter().enumerate() {
        println!(
            "{index}: {} ({}) by {}, version {}",
            descriptor.plugin_name, descriptor.factory_id, descriptor.manufacturer_name, descriptor.version
        );
        println!("   archive {}", descriptor.document_archive_id);
        for compatible in &descriptor.compatible_document_archive_ids {
            println!("   restores {compatible}");
        }
        for content_type in &descriptor.analyzeable_content_types {
            println!("   analyzes {}", content_type.identifier());
        }
    }

    session.close();
    Ok(())
}
