//! `tutorbot init`: first-time setup.

use std::path::Path;

use tutorbot_config::AppConfig;

pub async fn run(config_path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let topics_dir = AppConfig::default().knowledge.topics_dir;
    write_defaults(config_path, &topics_dir, force)
}

fn write_defaults(
    config_path: &Path,
    topics_dir: &Path,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🎓 Tutorbot Setup");
    println!("=================\n");

    if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            println!("✅ Created config directory: {}", dir.display());
        }
    }

    if !topics_dir.exists() {
        std::fs::create_dir_all(topics_dir)?;
        println!("✅ Created topics directory: {}", topics_dir.display());
    }

    if config_path.exists() && !force {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or re-run with --force.\n");
        return Ok(());
    }

    std::fs::write(config_path, AppConfig::default_toml())?;
    println!("✅ Wrote config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set api_key in the file, or export TUTORBOT_API_KEY");
    println!("   2. Put topic files (<subject>.json) into the knowledge.topics_dir");
    println!("   3. Run: tutorbot serve\n");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_loadable_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let topics = dir.path().join("topics");

        write_defaults(&path, &topics, false).unwrap();
        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.gateway.port, AppConfig::default().gateway.port);
        assert!(topics.is_dir());

        // A second run keeps the existing file.
        std::fs::write(&path, "model = \"custom\"\n").unwrap();
        write_defaults(&path, &topics, false).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap().model, "custom");

        write_defaults(&path, &topics, true).unwrap();
        assert_ne!(AppConfig::load_from(&path).unwrap().model, "custom");
    }
}
