use crate::data::persistence::{get_data_dir, Persistable};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NightsEditor {
    /// Type a number into the field.
    #[default]
    Text,
    /// Increment/decrement with +/-.
    Stepper,
}

/// Which parts of the planner screen are enabled.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ViewOptions {
    pub show_map: bool,
    pub show_path: bool,
    pub allow_upload: bool,
    pub nights_editor: NightsEditor,
}

impl Default for ViewOptions {
    fn default() -> Self {
        ViewOptions {
            show_map: true,
            show_path: true,
            allow_upload: true,
            nights_editor: NightsEditor::Text,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GeocoderSettings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        GeocoderSettings {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("itin/", env!("CARGO_PKG_VERSION"), " (itinerary planner)")
                .to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub view: ViewOptions,
    pub geocoder: GeocoderSettings,
}

/// Wrapper that reads the `settings` key from config.yaml.
#[derive(Serialize, Deserialize, Default, Debug)]
struct SettingsWrapper {
    #[serde(default)]
    settings: AppSettings,
}

impl Persistable for SettingsWrapper {
    fn filename() -> &'static str {
        "config.yaml"
    }
    fn is_json() -> bool {
        false
    }
}

impl AppSettings {
    pub fn load() -> Result<Self> {
        Self::load_from(&get_data_dir()?)
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        Ok(SettingsWrapper::load_from(dir)?.settings)
    }

    pub fn save_to(&self, dir: &Path) -> Result<()> {
        let wrapper = SettingsWrapper {
            settings: self.clone(),
        };
        wrapper.save_to(dir)?;
        Ok(())
    }
}
