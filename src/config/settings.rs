use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{AssetCollection, AssetDescriptor, AssetKind};
use crate::storage::StorageLayout;

use super::discovery::{discover_config_file, ConfigError};

const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0";
const DEFAULT_LISTEN_PORT: u16 = 5000;

/// On-disk shape of the configuration file. Every section and list may be
/// missing or null.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfigDocument {
    pub gallery: Option<GalleryDocument>,
    pub stable_diffusion: Option<StableDiffusionDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GalleryDocument {
    pub listen_address: Option<String>,
    pub listen_port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StableDiffusionDocument {
    pub path: Option<String>,
    pub checkpoints: Option<Vec<AssetDescriptor>>,
    pub loras: Option<Vec<AssetDescriptor>>,
    pub upscalers: Option<Vec<AssetDescriptor>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GallerySettings {
    pub listen_address: String,
    pub listen_port: u16,
}

impl Default for GallerySettings {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.into(),
            listen_port: DEFAULT_LISTEN_PORT,
        }
    }
}

impl GallerySettings {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.listen_address, self.listen_port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableDiffusionSettings {
    pub path: String,
    pub checkpoints: AssetCollection,
    pub loras: AssetCollection,
    pub upscalers: AssetCollection,
}

impl Default for StableDiffusionSettings {
    fn default() -> Self {
        Self {
            path: String::new(),
            checkpoints: AssetCollection::new(AssetKind::Checkpoint),
            loras: AssetCollection::new(AssetKind::Lora),
            upscalers: AssetCollection::new(AssetKind::Upscaler),
        }
    }
}

impl StableDiffusionSettings {
    pub fn collection(&self, kind: AssetKind) -> &AssetCollection {
        match kind {
            AssetKind::Checkpoint => &self.checkpoints,
            AssetKind::Lora => &self.loras,
            AssetKind::Upscaler => &self.upscalers,
        }
    }

    pub fn collection_mut(&mut self, kind: AssetKind) -> &mut AssetCollection {
        match kind {
            AssetKind::Checkpoint => &mut self.checkpoints,
            AssetKind::Lora => &mut self.loras,
            AssetKind::Upscaler => &mut self.upscalers,
        }
    }
}

/// A descriptor that was dropped while loading because it lacked a name or url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedAsset {
    pub kind: AssetKind,
    pub descriptor: AssetDescriptor,
}

#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub gallery: GallerySettings,
    pub stable_diffusion: StableDiffusionSettings,
    rejected: Vec<RejectedAsset>,
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.gallery == other.gallery && self.stable_diffusion == other.stable_diffusion
    }
}

impl Eq for Configuration {}

impl Configuration {
    pub fn from_document(document: ConfigDocument) -> Self {
        let gallery = document.gallery.unwrap_or_default();
        let gallery = GallerySettings {
            listen_address: gallery
                .listen_address
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.into()),
            listen_port: gallery.listen_port.unwrap_or(DEFAULT_LISTEN_PORT),
        };

        let sd = document.stable_diffusion.unwrap_or_default();
        let mut rejected = Vec::new();
        let mut collect = |kind: AssetKind, entries: Option<Vec<AssetDescriptor>>| {
            let (collection, dropped) =
                AssetCollection::from_descriptors(kind, entries.unwrap_or_default());
            rejected.extend(
                dropped
                    .into_iter()
                    .map(|descriptor| RejectedAsset { kind, descriptor }),
            );
            collection
        };
        let checkpoints = collect(AssetKind::Checkpoint, sd.checkpoints);
        let loras = collect(AssetKind::Lora, sd.loras);
        let upscalers = collect(AssetKind::Upscaler, sd.upscalers);

        Self {
            gallery,
            stable_diffusion: StableDiffusionSettings {
                path: sd.path.unwrap_or_default(),
                checkpoints,
                loras,
                upscalers,
            },
            rejected,
        }
    }

    pub fn to_document(&self) -> ConfigDocument {
        let sd = &self.stable_diffusion;
        ConfigDocument {
            gallery: Some(GalleryDocument {
                listen_address: Some(self.gallery.listen_address.clone()),
                listen_port: Some(self.gallery.listen_port),
            }),
            stable_diffusion: Some(StableDiffusionDocument {
                path: Some(sd.path.clone()),
                checkpoints: Some(sd.checkpoints.to_descriptors()),
                loras: Some(sd.loras.to_descriptors()),
                upscalers: Some(sd.upscalers.to_descriptors()),
            }),
        }
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let document: Option<ConfigDocument> = serde_yaml::from_str(contents)?;
        Ok(Self::from_document(document.unwrap_or_default()))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let configuration =
            Self::from_yaml_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!(
            path = %path.display(),
            checkpoints = configuration.stable_diffusion.checkpoints.len(),
            loras = configuration.stable_diffusion.loras.len(),
            upscalers = configuration.stable_diffusion.upscalers.len(),
            "Loaded configuration"
        );
        Ok(configuration)
    }

    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let path = discover_config_file(dir)?;
        Self::from_yaml_file(&path)
    }

    /// Loads the one configuration file in the current working directory.
    pub fn discover_and_load() -> Result<Self, ConfigError> {
        let dir = std::env::current_dir().map_err(|source| ConfigError::Read {
            path: PathBuf::from("."),
            source,
        })?;
        Self::load_from_dir(&dir)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.to_document()).context("serialize configuration to yaml")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_document())
            .context("serialize configuration to json")
    }

    /// Descriptors dropped during loading, in file order.
    pub fn rejected(&self) -> &[RejectedAsset] {
        &self.rejected
    }

    pub fn storage(&self) -> StorageLayout {
        StorageLayout::new(&self.stable_diffusion.path)
    }
}
