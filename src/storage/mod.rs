//! Directory layout of a Stable Diffusion installation.
//!
//! Every path is derived from the configured root. Getters never touch the
//! filesystem; callers create what they need through
//! [`StorageLayout::ensure_directory`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};

use crate::models::AssetKind;

const DEFAULT_IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
    image_extensions: Vec<String>,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            image_extensions: DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn models_path(&self) -> PathBuf {
        self.root.join("models")
    }

    pub fn embeddings_path(&self) -> PathBuf {
        self.root.join("embeddings")
    }

    pub fn scripts_path(&self) -> PathBuf {
        self.root.join("scripts")
    }

    pub fn extensions_path(&self) -> PathBuf {
        self.root.join("extensions")
    }

    pub fn outputs_path(&self) -> PathBuf {
        self.root.join("outputs")
    }

    /// Where txt2img results land, one sub-folder per day.
    pub fn images_path(&self) -> PathBuf {
        self.outputs_path().join("txt2img-images")
    }

    pub fn kind_path(&self, kind: AssetKind) -> PathBuf {
        kind.subdirectory()
            .iter()
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    pub fn resolve(&self, kind: AssetKind, canonical_name: &str) -> PathBuf {
        self.kind_path(kind).join(canonical_name)
    }

    pub fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// File size in bytes, `0` for anything that is not there.
    pub fn size(&self, path: &Path) -> u64 {
        fs::metadata(path).map(|meta| meta.len()).unwrap_or(0)
    }

    pub fn ensure_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))
    }

    pub fn image_extensions(&self) -> &[String] {
        &self.image_extensions
    }

    pub fn add_image_extension(&mut self, extension: &str) -> &mut Self {
        let extension = normalize_extension(extension);
        if !self.image_extensions.contains(&extension) {
            self.image_extensions.push(extension);
        }
        self
    }

    pub fn remove_image_extension(&mut self, extension: &str) -> &mut Self {
        let extension = normalize_extension(extension);
        self.image_extensions.retain(|current| current != &extension);
        self
    }

    pub fn set_image_extensions<I, S>(&mut self, extensions: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.image_extensions = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        self
    }

    /// Names of the sub-directories of `dir`, sorted.
    pub fn list_folders(&self, dir: &Path) -> Result<Vec<String>> {
        let mut folders = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
            let entry = entry.context("read directory entry")?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    folders.push(name.to_string());
                }
            }
        }
        folders.sort();
        Ok(folders)
    }

    /// Image files directly inside `dir`, most recently modified first.
    pub fn list_images(&self, dir: &Path) -> Result<Vec<String>> {
        let mut images: Vec<(SystemTime, String)> = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
            let entry = entry.context("read directory entry")?;
            let path = entry.path();
            if !path.is_file() || !self.is_image(&path) {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(ToOwned::to_owned) else {
                continue;
            };
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            images.push((modified, name));
        }
        images.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        Ok(images.into_iter().map(|(_, name)| name).collect())
    }

    fn is_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let dotted = format!(".{ext}");
                self.image_extensions.iter().any(|known| known == &dotted)
            })
            .unwrap_or(false)
    }
}

fn normalize_extension(extension: &str) -> String {
    if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    }
}
