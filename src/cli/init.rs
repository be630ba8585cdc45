use std::path::Path;

use crate::error::Result;
use crate::settings::{save_settings, Settings};

/// Writes settings (keeping an existing file's values) and lays out the data
/// directory.
pub fn run(settings_path: &Path, settings: &Settings) -> Result<()> {
    let data_dir = Path::new(&settings.data_dir);
    for feed in &settings.feeds {
        std::fs::create_dir_all(settings.raw_dir().join(&feed.name))?;
    }
    std::fs::create_dir_all(settings.processed_dir())?;
    save_settings(settings, settings_path)?;

    println!("Settings written to {}", settings_path.display());
    println!("Data directory: {}", data_dir.display());
    for feed in &settings.feeds {
        println!(
            "  raw/{}/  ({}, {} format{})",
            feed.name,
            feed.source,
            feed.format.key(),
            if feed.required { ", required" } else { "" }
        );
    }
    println!("Drop statement exports into those folders, then run `reckon report`.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::load_settings;

    #[test]
    fn test_init_creates_feed_dirs_and_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            data_dir: dir.path().join("data").to_string_lossy().to_string(),
            ..Settings::default()
        };
        let path = dir.path().join("config").join("settings.json");
        run(&path, &settings).unwrap();

        assert!(dir.path().join("data/raw/td_bank").is_dir());
        assert!(dir.path().join("data/raw/venmo").is_dir());
        assert!(dir.path().join("data/processed").is_dir());
        let loaded = load_settings(&path).unwrap();
        assert_eq!(loaded.data_dir, settings.data_dir);
    }
}
