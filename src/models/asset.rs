use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named, URL-sourced asset as declared in the configuration file.
///
/// The declared name is stored verbatim; the on-disk file name is derived from
/// it by the [`NamingRule`] of the collection the descriptor lives in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AssetDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl AssetDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && !self.url.is_empty()
    }
}

impl fmt::Display for AssetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{{ name: {:?}, url: {:?} }}", self.name, self.url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("asset name is empty")]
    Empty,
    #[error("asset name `{0}` has more than one extension")]
    MultipleExtensions(String),
}

/// Extension policy applied to a declared name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamingRule {
    /// Every name ends up as `{stem}.pth`, whatever extension it was declared with.
    Checkpoint,
    /// Names end up as `{stem}.safetensors`; an existing `.safetensors` is kept.
    Safetensors,
}

impl NamingRule {
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            NamingRule::Checkpoint => "pth",
            NamingRule::Safetensors => "safetensors",
        }
    }

    pub fn canonical_name(&self, declared: &str) -> Result<String, NameError> {
        if declared.is_empty() {
            return Err(NameError::Empty);
        }

        let mut parts = declared.split('.');
        let stem = parts.next().unwrap_or_default();
        let Some(extension) = parts.next() else {
            return Ok(format!("{declared}.{}", self.extension()));
        };
        if parts.next().is_some() {
            return Err(NameError::MultipleExtensions(declared.to_string()));
        }

        match self {
            // Checkpoints are always rewritten, `.pt` and `.ckpt` included.
            NamingRule::Checkpoint => Ok(format!("{stem}.{}", self.extension())),
            NamingRule::Safetensors if extension == self.extension() => Ok(declared.to_string()),
            NamingRule::Safetensors => Ok(format!("{stem}.{}", self.extension())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    Checkpoint,
    Lora,
    Upscaler,
}

impl AssetKind {
    /// Order in which a full synchronization walks the collections.
    pub const ALL: [AssetKind; 3] = [AssetKind::Checkpoint, AssetKind::Lora, AssetKind::Upscaler];

    #[must_use]
    pub fn naming(&self) -> NamingRule {
        match self {
            AssetKind::Checkpoint => NamingRule::Checkpoint,
            AssetKind::Lora | AssetKind::Upscaler => NamingRule::Safetensors,
        }
    }

    /// Directory below the storage root that holds assets of this kind.
    #[must_use]
    pub fn subdirectory(&self) -> &'static [&'static str] {
        match self {
            AssetKind::Checkpoint => &["models", "Stable-diffusion"],
            AssetKind::Lora => &["models", "Lora"],
            AssetKind::Upscaler => &["models", "ESRGAN"],
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            AssetKind::Checkpoint => "checkpoint",
            AssetKind::Lora => "lora",
            AssetKind::Upscaler => "upscaler",
        }
    }

    pub fn canonical_name(&self, descriptor: &AssetDescriptor) -> Result<String, NameError> {
        self.naming().canonical_name(&descriptor.name)
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_requires_name_and_url() {
        assert!(AssetDescriptor::new("model", "https://example.com/m").is_valid());
        assert!(!AssetDescriptor::new("", "https://example.com/m").is_valid());
        assert!(!AssetDescriptor::new("model", "").is_valid());
        assert!(!AssetDescriptor::default().is_valid());
    }

    #[test]
    fn checkpoint_names_always_end_in_pth() {
        let rule = NamingRule::Checkpoint;
        assert_eq!(rule.canonical_name("model").unwrap(), "model.pth");
        assert_eq!(rule.canonical_name("model.ckpt").unwrap(), "model.pth");
        assert_eq!(rule.canonical_name("model.pt").unwrap(), "model.pth");
        assert_eq!(rule.canonical_name("model.pth").unwrap(), "model.pth");
        assert_eq!(rule.canonical_name("model.bin").unwrap(), "model.pth");
    }

    #[test]
    fn safetensors_names_keep_matching_extension() {
        let rule = NamingRule::Safetensors;
        assert_eq!(rule.canonical_name("lora").unwrap(), "lora.safetensors");
        assert_eq!(rule.canonical_name("lora.bin").unwrap(), "lora.safetensors");
        assert_eq!(
            rule.canonical_name("lora.safetensors").unwrap(),
            "lora.safetensors"
        );
    }

    #[test]
    fn unsupported_names_are_reported() {
        assert_eq!(
            NamingRule::Safetensors.canonical_name("a.b.safetensors"),
            Err(NameError::MultipleExtensions("a.b.safetensors".into()))
        );
        assert_eq!(NamingRule::Checkpoint.canonical_name(""), Err(NameError::Empty));
    }

    #[test]
    fn kinds_pick_their_naming_rule() {
        let descriptor = AssetDescriptor::new("detail.pt", "https://example.com/d");
        assert_eq!(
            AssetKind::Checkpoint.canonical_name(&descriptor).unwrap(),
            "detail.pth"
        );
        assert_eq!(
            AssetKind::Lora.canonical_name(&descriptor).unwrap(),
            "detail.safetensors"
        );
        assert_eq!(
            AssetKind::Upscaler.canonical_name(&descriptor).unwrap(),
            "detail.safetensors"
        );
    }

    #[test]
    fn descriptor_deserializes_missing_fields_as_empty() {
        let descriptor: AssetDescriptor = serde_json::from_str(r#"{"name": "only"}"#).unwrap();
        assert_eq!(descriptor.name, "only");
        assert_eq!(descriptor.url, "");
        assert!(!descriptor.is_valid());
    }
}
