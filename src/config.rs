// SkyTrack — aiming a telescope at aircraft and celestial targets
// Copyright (C) 2025 SkyTrack developers
//
// This file is part of SkyTrack
//
// SkyTrack is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License version 3
// as published by the Free Software Foundation.
//
// SkyTrack is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with SkyTrack.  If not, see <http://www.gnu.org/licenses/>.
//

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "skytrack.json";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Observer position: [latitude°, longitude°, ellipsoidal height m].
    pub location: [f64; 3],
}

impl Configuration {
    /// Loads the configuration, falling back to (and persisting) zeros when
    /// the file is absent or unreadable. Never fails.
    pub fn load() -> Configuration {
        Configuration::load_from(&config_file_path())
    }

    pub fn load_from(path: &Path) -> Configuration {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    log::error!("config file {} is invalid ({}); using defaults", path.display(), e);
                    Configuration::default()
                }
            },
            Err(_) => {
                log::info!(
                    "could not load configuration from {}; a new configuration file will be created",
                    path.display()
                );
                let config = Configuration::default();
                if let Err(e) = config.store_to(path) {
                    log::warn!("failed to write the configuration file: {}", e);
                }
                config
            }
        }
    }

    pub fn store(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.store_to(&config_file_path())
    }

    pub fn store_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn config_file_path() -> PathBuf {
    // falls back to the working directory when no config dir is known
    dirs::config_dir().unwrap_or_default().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_fallbacks() {
        let dir = std::env::temp_dir();
        let path = dir.join("skytrack_test_config.json");
        let _ = std::fs::remove_file(&path);

        // absent file: defaults, and the file gets created
        let config = Configuration::load_from(&path);
        assert_eq!(config, Configuration::default());
        assert!(path.exists());

        let config = Configuration { location: [51.5, -0.1, 35.0] };
        config.store_to(&path).unwrap();
        assert_eq!(Configuration::load_from(&path), config);

        // unreadable content: defaults, no panic
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(Configuration::load_from(&path), Configuration::default());

        let _ = std::fs::remove_file(&path);
    }
}
