//! Browser profile storage.
//!
//! A profile is a named bundle of presentation settings (viewport, user
//! agent, locale, permissions) persisted as one JSON file per profile.
//! The orchestration core only ever uses a profile's name as an opaque
//! label; the settings exist for the remote service and for humans.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ProfileError;
use crate::util::sanitize_filename;

/// Browser viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Named presentation settings for a browser session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSettings {
    pub name: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

impl ProfileSettings {
    /// Creates a profile with default presentation settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user_agent: None,
            viewport: Viewport::default(),
            locale: default_locale(),
            timezone: default_timezone(),
            permissions: Vec::new(),
        }
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the viewport dimensions.
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Viewport { width, height };
        self
    }

    /// Sets the locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Sets the timezone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Sets the granted permissions.
    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Keyed collection of profiles persisted to disk.
pub struct ProfileStore {
    dir: PathBuf,
    profiles: HashMap<String, ProfileSettings>,
}

impl ProfileStore {
    /// Creates an empty store rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            profiles: HashMap::new(),
        }
    }

    /// Seeds the store with profiles for common testing scenarios.
    pub fn with_defaults(mut self) -> Result<Self, ProfileError> {
        let defaults = [
            ProfileSettings::new("desktop")
                .with_user_agent(
                    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
                )
                .with_permissions(vec!["geolocation".to_string(), "notifications".to_string()]),
            ProfileSettings::new("mobile")
                .with_user_agent(
                    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
                     AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/120.0.0.0 \
                     Mobile/15E148 Safari/604.1",
                )
                .with_viewport(375, 812)
                .with_permissions(vec!["geolocation".to_string()]),
            ProfileSettings::new("tablet").with_viewport(768, 1024),
            ProfileSettings::new("high-dpi").with_viewport(2560, 1440),
            ProfileSettings::new("privacy").with_timezone("UTC"),
        ];

        for profile in defaults {
            self.create(profile)?;
        }
        info!(count = self.profiles.len(), "seeded default profiles");
        Ok(self)
    }

    /// Creates (or replaces) a profile and persists it.
    pub fn create(&mut self, profile: ProfileSettings) -> Result<(), ProfileError> {
        if profile.name.trim().is_empty() {
            return Err(ProfileError::InvalidName(
                "profile name must not be empty".to_string(),
            ));
        }
        self.save(&profile)?;
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Looks up a profile by name.
    pub fn get(&self, name: &str) -> Option<&ProfileSettings> {
        self.profiles.get(name)
    }

    /// All profiles, sorted by name.
    pub fn list(&self) -> Vec<&ProfileSettings> {
        let mut profiles: Vec<_> = self.profiles.values().collect();
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        profiles
    }

    /// Deletes a profile and its file.
    pub fn delete(&mut self, name: &str) -> Result<(), ProfileError> {
        let profile = self
            .profiles
            .remove(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;
        let path = self.profile_path(&profile.name);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        info!(profile = %name, "profile deleted");
        Ok(())
    }

    /// Loads every readable profile file under the store directory.
    /// Unreadable files are skipped with a warning.
    pub fn load_from_disk(&mut self) -> Result<usize, ProfileError> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut loaded = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(ProfileError::from)
                .and_then(|s| serde_json::from_str::<ProfileSettings>(&s).map_err(ProfileError::from))
            {
                Ok(profile) => {
                    self.profiles.insert(profile.name.clone(), profile);
                    loaded += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable profile");
                }
            }
        }
        info!(loaded, "profiles loaded from disk");
        Ok(loaded)
    }

    fn profile_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_filename(name)))
    }

    fn save(&self, profile: &ProfileSettings) -> Result<(), ProfileError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(profile)?;
        fs::write(self.profile_path(&profile.name), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_get_delete() {
        let temp = TempDir::new().unwrap();
        let mut store = ProfileStore::new(temp.path());

        let profile = ProfileSettings::new("narrow").with_viewport(320, 568);
        store.create(profile).unwrap();

        let got = store.get("narrow").unwrap();
        assert_eq!(got.viewport.width, 320);

        store.delete("narrow").unwrap();
        assert!(store.get("narrow").is_none());
        assert!(matches!(
            store.delete("narrow"),
            Err(ProfileError::NotFound(_))
        ));
    }

    #[test]
    fn test_round_trip_through_disk() {
        let temp = TempDir::new().unwrap();
        let mut store = ProfileStore::new(temp.path());
        store
            .create(
                ProfileSettings::new("kiosk")
                    .with_viewport(1080, 1920)
                    .with_locale("de-DE")
                    .with_permissions(vec!["camera".to_string()]),
            )
            .unwrap();

        let mut reloaded = ProfileStore::new(temp.path());
        assert_eq!(reloaded.load_from_disk().unwrap(), 1);
        let profile = reloaded.get("kiosk").unwrap();
        assert_eq!(profile.locale, "de-DE");
        assert_eq!(profile.viewport.height, 1920);
        assert_eq!(profile.permissions, vec!["camera"]);
    }

    #[test]
    fn test_defaults_are_seeded() {
        let temp = TempDir::new().unwrap();
        let store = ProfileStore::new(temp.path()).with_defaults().unwrap();
        assert!(store.get("desktop").is_some());
        assert!(store.get("mobile").is_some());
        assert_eq!(store.list().len(), 5);
        // list() is sorted by name
        let names: Vec<_> = store.list().iter().map(|p| p.name.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_empty_name_rejected() {
        let temp = TempDir::new().unwrap();
        let mut store = ProfileStore::new(temp.path());
        assert!(matches!(
            store.create(ProfileSettings::new("  ")),
            Err(ProfileError::InvalidName(_))
        ));
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("broken.json"), "not json").unwrap();

        let mut store = ProfileStore::new(temp.path());
        assert_eq!(store.load_from_disk().unwrap(), 0);
    }
}
