//! `tutorbot serve`: start the HTTP server.

use std::path::Path;

pub async fn run(
    config_path: &Path,
    port_override: Option<u16>,
    host_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config =
        crate::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if let Some(host) = host_override {
        config.gateway.host = host;
    }

    println!("🎓 Tutorbot");
    println!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {} ({})", config.model, config.provider);
    if !config.has_api_key() {
        println!("   ⚠️  No API key: replies will use the offline fallback");
    }

    tutorbot_gateway::start(config).await?;

    Ok(())
}
