//! `tutorbot config`: configuration management commands.

use std::path::Path;

pub async fn validate(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match crate::load_config(config_path) {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();
            if !config.has_api_key() {
                warnings.push("No API key set (set TUTORBOT_API_KEY or OPENAI_API_KEY)");
            }
            if !config.knowledge.topics_dir.is_dir() {
                warnings.push("Topics directory not found; context lookup will be empty");
            }
            if config.gateway.rate_limit_interval_ms == 0 {
                warnings.push("Rate limiting is disabled");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:  {}", config.provider);
            println!("   Base URL:  {}", config.base_url());
            println!("   Model:     {}", config.model);
            println!("   Gateway:   {}:{}", config.gateway.host, config.gateway.port);
            println!("   Sessions:  {:?}", config.tutor.session_policy);
            println!("   Topics:    {}", config.knowledge.topics_dir.display());
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        crate::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", config.redacted_toml());
    Ok(())
}

pub async fn path(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn default_config_path_is_valid() {
        let path = tutorbot_config::AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().contains(".tutorbot"));
    }
}
