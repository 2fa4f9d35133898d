use std::path::Path;

use crate::core::config::{load_config, ConfigOverrides};
use crate::core::gateway::{test_connection, GeminiClient};
use crate::error::PigenError;

/// Send the test prompt through the configured gateway
pub async fn ping(project_root: &Path, model: Option<String>) -> Result<(), PigenError> {
    let overrides = ConfigOverrides {
        model,
        ..ConfigOverrides::default()
    };
    let config = load_config(project_root, overrides)?;
    let gateway = GeminiClient::new(config.gateway.clone(), config.generation.base_delay())?;

    println!(
        "Pinging {} with {} key(s)...",
        config.gateway.model,
        gateway.limiter().credential_count()
    );
    let reply = test_connection(&gateway).await?;
    println!("OK: {}", reply.trim());
    Ok(())
}
