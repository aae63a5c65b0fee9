//! `tutorbot doctor`: diagnose the local setup.

use std::path::Path;

use tutorbot_core::provider::Provider;
use tutorbot_knowledge::TopicLibrary;

pub async fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Tutorbot Doctor");
    println!("==================\n");

    let mut issues = 0;

    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults (run `tutorbot init`)");
    }

    let config = match crate::load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    let provider = tutorbot_providers::router::build_from_config(&config);
    if provider.is_configured() {
        println!("  ✅ Provider '{}' configured ({})", provider.name(), config.base_url());
    } else {
        println!("  ⚠️  No API key configured: replies will use the offline fallback");
        issues += 1;
    }

    let topics_dir = &config.knowledge.topics_dir;
    if topics_dir.is_dir() {
        let topics = TopicLibrary::load_dir(topics_dir);
        let subjects: Vec<&str> = topics.subjects().collect();
        if subjects.is_empty() {
            println!("  ⚠️  Topics directory has no usable files: {}", topics_dir.display());
            issues += 1;
        } else {
            println!(
                "  ✅ {} topic records for: {}",
                topics.record_count(),
                subjects.join(", ")
            );
        }
    } else {
        println!("  ⚠️  Topics directory missing: {}", topics_dir.display());
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
