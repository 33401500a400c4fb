mod discovery;
mod settings;

pub use discovery::{discover_config_file, ConfigError};
pub use settings::{
    ConfigDocument, Configuration, GalleryDocument, GallerySettings, RejectedAsset,
    StableDiffusionDocument, StableDiffusionSettings,
};
