use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

const CONFIG_EXTENSIONS: [&str; 2] = [".yml", ".yaml"];
const CONFIG_MARKERS: [&str; 3] = ["conf", "config", "configuration"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration file found in {}", .dir.display())]
    NotFound { dir: PathBuf },
    #[error(
        "multiple configuration files found in {}: {}",
        .dir.display(),
        .candidates.join(", ")
    )]
    Ambiguous {
        dir: PathBuf,
        candidates: Vec<String>,
    },
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Finds the single YAML file in `dir` whose name marks it as configuration.
pub fn discover_config_file(dir: &Path) -> Result<PathBuf, ConfigError> {
    let read_error = |source| ConfigError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let Some(name) = entry.file_name().to_str().map(ToOwned::to_owned) else {
            continue;
        };
        if is_config_name(&name) && entry.path().is_file() {
            candidates.push(name);
        }
    }
    candidates.sort();

    match candidates.len() {
        0 => Err(ConfigError::NotFound {
            dir: dir.to_path_buf(),
        }),
        1 => Ok(dir.join(&candidates[0])),
        _ => Err(ConfigError::Ambiguous {
            dir: dir.to_path_buf(),
            candidates,
        }),
    }
}

fn is_config_name(name: &str) -> bool {
    CONFIG_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
        && CONFIG_MARKERS.iter().any(|marker| name.contains(marker))
}
