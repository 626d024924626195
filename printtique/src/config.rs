//! User preferences, saved and loaded from `printtique.toml` in the platform preference dir.

use printtique_core::{
    assets::LOW_RESOLUTION_WIDTH, catalog::Catalog, state::freehand::StrokeStyle,
};

const DOCUMENTATION: &str = r##"# Printtique preferences. You may edit this file, but be aware that formatting and comments will
# not be preserved. Missing keys take their defaults.

# catalog = "/path/to/catalog.toml"    Load products, fonts, clipart and orders from this file
#                                       instead of the built-in catalog.
# low-resolution-width = 1000           Uploads narrower than this (px) are flagged as blurry.
# [drawing]
# color = "#000000"
# width = 3.0
# [export]
# gap = 40                              Space between the two sides of a preview.
# label-height = 50                     Band above the sides holding the view labels.

"##;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExportLayout {
    pub gap: u32,
    pub label_height: u32,
}
impl Default for ExportLayout {
    fn default() -> Self {
        Self {
            gap: 40,
            label_height: 50,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Preferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<std::path::PathBuf>,
    pub low_resolution_width: u32,
    pub drawing: StrokeStyle,
    pub export: ExportLayout,
}
impl Default for Preferences {
    fn default() -> Self {
        Self {
            catalog: None,
            low_resolution_width: LOW_RESOLUTION_WIDTH,
            drawing: StrokeStyle::default(),
            export: ExportLayout::default(),
        }
    }
}
impl Preferences {
    const FILENAME: &'static str = "printtique.toml";
    /// Load the user's preferences, or defaults if unavailable for some reason.
    #[must_use]
    pub fn load() -> Self {
        match preferences_dir() {
            None => {
                log::warn!("Preferences dir unavailable, defaulting.");
                Self::default()
            }
            Some(mut dir) => {
                dir.push(Self::FILENAME);
                Self::load_or_default(&dir)
            }
        }
    }
    #[must_use]
    fn load_or_default(path: &std::path::Path) -> Self {
        let loaded: anyhow::Result<Self> = try_block::try_block! {
            let string = std::fs::read_to_string(path)?;
            let preferences: Self = toml::from_str(&string)?;
            Ok(preferences)
        };
        match loaded {
            Ok(preferences) => preferences,
            Err(e) => {
                log::warn!("Failed to load preferences from {path:?}, defaulting:\n{e:?}");
                Self::default()
            }
        }
    }
    pub fn save(&self) -> anyhow::Result<()> {
        let mut preferences =
            preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        // Not recursive. If the parent is missing, the user probably has a good reason.
        let _ = std::fs::DirBuilder::new().create(&preferences);

        preferences.push(Self::FILENAME);
        let string = DOCUMENTATION.to_owned() + &toml::ser::to_string_pretty(self)?;
        std::fs::write(preferences, string)?;
        Ok(())
    }
    /// The configured catalog, or the built-in one if none is configured.
    pub fn catalog(&self) -> anyhow::Result<Catalog> {
        use anyhow::Context;
        let Some(path) = &self.catalog else {
            return Ok(Catalog::builtin());
        };
        let string = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {path:?}"))?;
        Catalog::from_toml_str(&string).with_context(|| format!("invalid catalog {path:?}"))
    }
    #[must_use]
    pub fn upload_policy(&self) -> printtique_core::assets::UploadPolicy {
        printtique_core::assets::UploadPolicy {
            low_resolution_width: self.low_resolution_width,
        }
    }
}
