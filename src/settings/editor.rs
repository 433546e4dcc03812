//! Load, edit and save the tutor configuration

use super::{Level, PersonaPicker, Speed, StoredSettings, Topic, TutorSettings, DURATION_OPTIONS};
use crate::backend::SettingsService;
use crate::persona::{all_personas, persona_index, Persona};
use crate::store::{LocalStore, StoreError};

/// Local copy of the last saved configuration
pub trait SettingsCache: Send + Sync {
    fn load_cached(&self) -> Result<Option<StoredSettings>, StoreError>;
    fn store_cached(&self, settings: &StoredSettings) -> Result<(), StoreError>;
}

impl SettingsCache for LocalStore {
    fn load_cached(&self) -> Result<Option<StoredSettings>, StoreError> {
        self.cached_settings()
    }

    fn store_cached(&self, settings: &StoredSettings) -> Result<(), StoreError> {
        self.cache_settings(settings)
    }
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSource {
    Remote,
    LocalCache,
    Defaults,
}

/// What `save` managed to persist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    pub stored_locally: bool,
    pub synced_remotely: bool,
}

/// Editable configuration plus the persona carousel state
pub struct SettingsEditor<R, C> {
    remote: R,
    cache: C,
    device_id: String,
    settings: TutorSettings,
    picker: PersonaPicker,
    source: SettingsSource,
}

impl<R: SettingsService, C: SettingsCache> SettingsEditor<R, C> {
    /// Load from the server, else the local cache, else the defaults.
    ///
    /// Each tier is consulted only when the previous one fails or has
    /// nothing. A remote hit also refreshes the local cache.
    pub async fn load(remote: R, cache: C, device_id: impl Into<String>) -> Self {
        let device_id = device_id.into();

        let remote_settings = match remote.get_settings(&device_id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load settings from server, using local");
                None
            }
        };

        let (stored, source) = if let Some(stored) = remote_settings {
            if let Err(e) = cache.store_cached(&stored) {
                tracing::warn!(error = %e, "Failed to refresh local settings cache");
            }
            (stored, SettingsSource::Remote)
        } else {
            match cache.load_cached() {
                Ok(Some(stored)) => (stored, SettingsSource::LocalCache),
                Ok(None) => (StoredSettings::default(), SettingsSource::Defaults),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read local settings cache");
                    (StoredSettings::default(), SettingsSource::Defaults)
                }
            }
        };

        let settings = TutorSettings::from_stored(&stored);
        tracing::info!(?source, tutor = %settings.tutor_id, "Loaded settings");
        let picker = PersonaPicker::new(
            all_personas().len(),
            persona_index(&settings.tutor_id).unwrap_or(0),
        );

        Self {
            remote,
            cache,
            device_id,
            settings,
            picker,
            source,
        }
    }

    pub fn settings(&self) -> &TutorSettings {
        &self.settings
    }

    pub fn source(&self) -> SettingsSource {
        self.source
    }

    pub fn picker(&self) -> &PersonaPicker {
        &self.picker
    }

    pub fn persona(&self) -> &'static Persona {
        self.settings.persona()
    }

    /// Select the persona card at `index` and scroll to it
    pub fn select_persona(&mut self, index: usize) -> bool {
        let Some(persona) = all_personas().get(index) else {
            return false;
        };
        self.picker.select(index);
        self.settings.tutor_id = persona.id.to_string();
        true
    }

    pub fn select_persona_id(&mut self, id: &str) -> bool {
        persona_index(id).is_some_and(|index| self.select_persona(index))
    }

    /// Move the page indicator; the selection is left alone
    pub fn scrolled_to(&mut self, offset: f64, viewport_width: f64) -> usize {
        self.picker.scrolled_to(offset, viewport_width)
    }

    pub fn set_level(&mut self, level: Level) {
        self.settings.level = level;
    }

    pub fn set_speed(&mut self, speed: Speed) {
        self.settings.speed = speed;
    }

    pub fn set_topic(&mut self, topic: Topic) {
        self.settings.topic = topic;
    }

    /// Returns `false` for lengths outside [`DURATION_OPTIONS`]
    pub fn set_duration(&mut self, minutes: u32) -> bool {
        if !DURATION_OPTIONS.contains(&minutes) {
            return false;
        }
        self.settings.duration = minutes;
        true
    }

    /// Persist locally, then to the server. A failed server write is only
    /// logged; the local copy stands.
    pub async fn save(&self) -> SaveReport {
        let stored = self.settings.to_stored();

        let stored_locally = match self.cache.store_cached(&stored) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to save settings locally");
                false
            }
        };

        let synced_remotely = match self.remote.save_settings(&self.device_id, &stored).await {
            Ok(()) => {
                tracing::info!("Saved settings to server");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to save settings to server");
                false
            }
        };

        SaveReport {
            stored_locally,
            synced_remotely,
        }
    }
}
