use std::fs;
use std::io;
use std::path::PathBuf;

use sg_core::settings::Settings;
use sg_core::store::{SettingsStore, StoreError};

/// Settings kept in a JSON file on disk, in the export file layout.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Settings, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Settings::default()),
            Err(e) => return Err(e.into()),
        };
        Ok(Settings::from_json(&text)?)
    }

    fn save(&mut self, settings: &Settings) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, settings.to_export_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults_and_save_round_trips() {
        let dir = std::env::temp_dir().join(format!("sg-cli-store-{}", std::process::id()));
        let path = dir.join("nested").join("settings.json");
        let mut store = JsonFileStore::new(&path);

        assert_eq!(store.load().unwrap(), Settings::default());

        let settings = Settings {
            blocked_sites: vec!["a.com".to_string()],
            redirect_url: "https://safe.example/".to_string(),
            challenge_text: "guard".to_string(),
        };
        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);

        let _ = fs::remove_dir_all(&dir);
    }
}
