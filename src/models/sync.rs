use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::Configuration;
use crate::storage::StorageLayout;

use super::{
    asset::{AssetDescriptor, AssetKind},
    download::{download_with_progress, DownloadPlan, DEFAULT_CHUNK_SIZE},
    progress::TransferStats,
    remote::{HttpSource, RemoteSource},
};

const HTTP_OK: u16 = 200;

/// Lifecycle notifications for a single asset. `name` is the canonical file
/// name, except for `Failed` which carries the declared one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncEvent<'a> {
    Checking {
        kind: AssetKind,
        name: &'a str,
        url: &'a str,
    },
    UpToDate {
        kind: AssetKind,
        name: &'a str,
        size: u64,
    },
    Started {
        kind: AssetKind,
        name: &'a str,
        url: &'a str,
        total_bytes: u64,
    },
    Progress {
        kind: AssetKind,
        name: &'a str,
        stats: TransferStats,
    },
    Completed {
        kind: AssetKind,
        name: &'a str,
        bytes: u64,
    },
    Rejected {
        kind: AssetKind,
        name: &'a str,
        url: &'a str,
        status: u16,
    },
    Failed {
        kind: AssetKind,
        name: &'a str,
        error: &'a str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum SyncOutcome {
    /// Local and remote sizes already agree.
    UpToDate { size: u64 },
    Downloaded { path: PathBuf, bytes: u64 },
    /// The server answered with something other than 200; nothing was written.
    Rejected { status: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    pub kind: AssetKind,
    pub name: String,
    pub result: Result<SyncOutcome, String>,
}

/// Result of one pass over every configured asset, in sync order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub records: Vec<SyncRecord>,
}

impl SyncReport {
    pub fn downloaded(&self) -> usize {
        self.count(|outcome| matches!(outcome, SyncOutcome::Downloaded { .. }))
    }

    pub fn up_to_date(&self) -> usize {
        self.count(|outcome| matches!(outcome, SyncOutcome::UpToDate { .. }))
    }

    pub fn rejected(&self) -> usize {
        self.count(|outcome| matches!(outcome, SyncOutcome::Rejected { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = &SyncRecord> {
        self.records.iter().filter(|record| record.result.is_err())
    }

    fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&SyncOutcome) -> bool,
    {
        self.records
            .iter()
            .filter(|record| record.result.as_ref().is_ok_and(&predicate))
            .count()
    }
}

/// Reconciles the files under the storage root with the configured assets.
///
/// A file is fetched again, in full, whenever its size differs from the size
/// the server announces. Work is strictly sequential.
#[derive(Debug)]
pub struct Synchronizer<S = HttpSource> {
    storage: StorageLayout,
    source: S,
    chunk_size: usize,
}

impl Synchronizer<HttpSource> {
    pub fn over_http(storage: StorageLayout) -> Result<Self> {
        Ok(Self::new(storage, HttpSource::new()?))
    }
}

impl<S: RemoteSource> Synchronizer<S> {
    pub fn new(storage: StorageLayout, source: S) -> Self {
        Self {
            storage,
            source,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn storage(&self) -> &StorageLayout {
        &self.storage
    }

    pub fn local_size(&self, path: &Path) -> u64 {
        self.storage.size(path)
    }

    pub fn remote_size(&self, url: &str) -> Result<u64> {
        self.source.content_length(url)
    }

    pub fn sync<F>(
        &self,
        kind: AssetKind,
        descriptor: &AssetDescriptor,
        mut observer: F,
    ) -> Result<SyncOutcome>
    where
        F: FnMut(SyncEvent<'_>),
    {
        let name = kind
            .canonical_name(descriptor)
            .with_context(|| format!("resolve file name for {kind} `{}`", descriptor.name))?;
        let url = descriptor.url.as_str();
        let path = self.storage.resolve(kind, &name);

        observer(SyncEvent::Checking {
            kind,
            name: &name,
            url,
        });
        let local_size = self.local_size(&path);
        let remote_size = self
            .remote_size(url)
            .with_context(|| format!("query size of {url}"))?;

        if local_size == remote_size {
            if remote_size == 0 && !self.storage.exists(&path) {
                tracing::warn!(
                    kind = %kind,
                    name = %name,
                    url,
                    "Server did not report a size and no local copy exists; nothing fetched"
                );
            } else {
                tracing::debug!(kind = %kind, name = %name, size = local_size, "Up to date");
            }
            observer(SyncEvent::UpToDate {
                kind,
                name: &name,
                size: local_size,
            });
            return Ok(SyncOutcome::UpToDate { size: local_size });
        }

        let mut body = self.source.open(url).with_context(|| format!("fetch {url}"))?;
        if body.status != HTTP_OK {
            tracing::warn!(kind = %kind, name = %name, url, status = body.status, "Unable to download");
            observer(SyncEvent::Rejected {
                kind,
                name: &name,
                url,
                status: body.status,
            });
            return Ok(SyncOutcome::Rejected {
                status: body.status,
            });
        }

        self.storage.ensure_directory(&self.storage.kind_path(kind))?;

        tracing::info!(
            kind = %kind,
            name = %name,
            url,
            local_size,
            remote_size = body.content_length,
            "Downloading"
        );
        observer(SyncEvent::Started {
            kind,
            name: &name,
            url,
            total_bytes: body.content_length,
        });

        let plan = DownloadPlan {
            url: url.to_string(),
            destination: path,
            expected_size_bytes: body.content_length,
            chunk_size: self.chunk_size,
        };
        let outcome = download_with_progress(&plan, body.reader.as_mut(), |stats| {
            observer(SyncEvent::Progress {
                kind,
                name: &name,
                stats,
            });
        })?;

        tracing::info!(
            kind = %kind,
            name = %name,
            bytes = outcome.bytes_downloaded,
            path = %outcome.final_path.display(),
            "Download complete"
        );
        observer(SyncEvent::Completed {
            kind,
            name: &name,
            bytes: outcome.bytes_downloaded,
        });

        Ok(SyncOutcome::Downloaded {
            path: outcome.final_path,
            bytes: outcome.bytes_downloaded,
        })
    }

    /// Checkpoints, then LoRAs, then upscalers, each in file order. A failing
    /// asset is logged and recorded; the pass always runs to the end.
    pub fn sync_all<F>(&self, configuration: &Configuration, mut observer: F) -> SyncReport
    where
        F: FnMut(SyncEvent<'_>),
    {
        let mut report = SyncReport::default();
        for kind in AssetKind::ALL {
            for descriptor in configuration.stable_diffusion.collection(kind) {
                let result = self.sync(kind, descriptor, &mut observer).map_err(|error| {
                    let message = format!("{error:#}");
                    tracing::warn!(kind = %kind, name = %descriptor.name, "Sync failed: {message}");
                    observer(SyncEvent::Failed {
                        kind,
                        name: &descriptor.name,
                        error: &message,
                    });
                    message
                });
                report.records.push(SyncRecord {
                    kind,
                    name: descriptor.name.clone(),
                    result,
                });
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RemoteBody;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::fs;
    use std::io::Cursor;

    use anyhow::anyhow;

    #[derive(Clone)]
    struct Served {
        status: u16,
        body: Vec<u8>,
        advertise_length: bool,
    }

    #[derive(Default)]
    struct FakeSource {
        served: HashMap<String, Served>,
        opened: Cell<usize>,
        probed: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn serve(mut self, url: &str, status: u16, body: &[u8]) -> Self {
            self.served.insert(
                url.into(),
                Served {
                    status,
                    body: body.to_vec(),
                    advertise_length: true,
                },
            );
            self
        }

        fn serve_without_length(mut self, url: &str, body: &[u8]) -> Self {
            self.served.insert(
                url.into(),
                Served {
                    status: 200,
                    body: body.to_vec(),
                    advertise_length: false,
                },
            );
            self
        }

        fn lookup(&self, url: &str) -> Result<Served> {
            self.served
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("connection refused: {url}"))
        }
    }

    impl RemoteSource for FakeSource {
        fn content_length(&self, url: &str) -> Result<u64> {
            self.probed.borrow_mut().push(url.to_string());
            let served = self.lookup(url)?;
            Ok(if served.advertise_length {
                served.body.len() as u64
            } else {
                0
            })
        }

        fn open(&self, url: &str) -> Result<RemoteBody> {
            self.opened.set(self.opened.get() + 1);
            let served = self.lookup(url)?;
            Ok(RemoteBody {
                status: served.status,
                content_length: if served.advertise_length {
                    served.body.len() as u64
                } else {
                    0
                },
                reader: Box::new(Cursor::new(served.body)),
            })
        }
    }

    fn descriptor(name: &str, url: &str) -> AssetDescriptor {
        AssetDescriptor::new(name, url)
    }

    #[test]
    fn equal_sizes_skip_the_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path());
        let target = storage.resolve(AssetKind::Lora, "style.safetensors");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, b"same").unwrap();

        let source = FakeSource::default().serve("https://h/style", 200, b"diff");
        let sync = Synchronizer::new(storage, source);
        let mut events = Vec::new();
        let outcome = sync
            .sync(AssetKind::Lora, &descriptor("style", "https://h/style"), |event| {
                events.push(format!("{event:?}"));
            })
            .unwrap();

        assert_eq!(outcome, SyncOutcome::UpToDate { size: 4 });
        assert_eq!(sync.source.opened.get(), 0);
        assert_eq!(fs::read(&target).unwrap(), b"same");
        assert_eq!(events.len(), 2);
        assert!(events[0].starts_with("Checking"));
        assert!(events[1].starts_with("UpToDate"));
    }

    #[test]
    fn size_mismatch_overwrites_with_remote_body() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path());
        let target = storage.resolve(AssetKind::Checkpoint, "base.pth");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, vec![0u8; 10_000]).unwrap();

        let remote = vec![9u8; 3000];
        let source = FakeSource::default().serve("https://h/base", 200, &remote);
        let sync = Synchronizer::new(storage, source).with_chunk_size(1024);

        let mut progress = Vec::new();
        let outcome = sync
            .sync(
                AssetKind::Checkpoint,
                &descriptor("base.ckpt", "https://h/base"),
                |event| {
                    if let SyncEvent::Progress { stats, .. } = event {
                        progress.push(stats.downloaded_bytes);
                    }
                },
            )
            .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Downloaded {
                path: target.clone(),
                bytes: 3000
            }
        );
        assert_eq!(fs::metadata(&target).unwrap().len(), 3000);
        assert_eq!(progress, [1024, 2048, 3000]);
    }

    #[test]
    fn missing_file_is_fetched_into_new_kind_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path());
        let source = FakeSource::default().serve("https://h/x4", 200, b"weights");
        let sync = Synchronizer::new(storage.clone(), source);

        sync.sync(AssetKind::Upscaler, &descriptor("x4.pth", "https://h/x4"), |_| {})
            .unwrap();

        let target = storage.resolve(AssetKind::Upscaler, "x4.safetensors");
        assert_eq!(fs::read(target).unwrap(), b"weights");
    }

    #[test]
    fn non_200_is_skipped_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path());
        let source = FakeSource::default().serve("https://h/gone", 404, b"not found");
        let sync = Synchronizer::new(storage.clone(), source);

        let outcome = sync
            .sync(AssetKind::Lora, &descriptor("gone", "https://h/gone"), |_| {})
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Rejected { status: 404 });
        assert!(!storage
            .resolve(AssetKind::Lora, "gone.safetensors")
            .exists());
    }

    #[test]
    fn unknown_length_with_absent_file_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path());
        let source = FakeSource::default().serve_without_length("https://h/quiet", b"data");
        let sync = Synchronizer::new(storage, source);

        let outcome = sync
            .sync(AssetKind::Lora, &descriptor("quiet", "https://h/quiet"), |_| {})
            .unwrap();

        assert_eq!(outcome, SyncOutcome::UpToDate { size: 0 });
        assert_eq!(sync.source.opened.get(), 0);
    }

    #[test]
    fn batch_continues_past_failures_in_collection_order() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!(
            r#"
stable_diffusion:
  path: {}
  checkpoints:
    - name: base
      url: https://h/base
  loras:
    - name: missing
      url: https://h/missing
    - name: offline
      url: https://h/offline
    - name: two.dots.safetensors
      url: https://h/dots
    - name: style
      url: https://h/style
  upscalers:
    - name: x4
      url: https://h/x4
"#,
            dir.path().display()
        );
        let config = Configuration::from_yaml_str(&yaml).unwrap();
        let source = FakeSource::default()
            .serve("https://h/base", 200, b"base")
            .serve("https://h/missing", 404, b"nope")
            .serve("https://h/dots", 200, b"dots")
            .serve("https://h/style", 200, b"style")
            .serve("https://h/x4", 200, b"x4");
        let sync = Synchronizer::new(config.storage(), source);

        let mut failed = Vec::new();
        let report = sync.sync_all(&config, |event| {
            if let SyncEvent::Failed { name, .. } = event {
                failed.push(name.to_string());
            }
        });

        let order: Vec<_> = report.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            order,
            ["base", "missing", "offline", "two.dots.safetensors", "style", "x4"]
        );
        assert_eq!(report.downloaded(), 3);
        assert_eq!(report.rejected(), 1);
        assert_eq!(report.failures().count(), 2);
        assert_eq!(failed, ["offline", "two.dots.safetensors"]);
        assert_eq!(
            *sync.source.probed.borrow(),
            [
                "https://h/base",
                "https://h/missing",
                "https://h/offline",
                "https://h/style",
                "https://h/x4"
            ]
        );

        let storage = config.storage();
        assert!(storage.resolve(AssetKind::Lora, "style.safetensors").exists());
        assert!(storage.resolve(AssetKind::Upscaler, "x4.safetensors").exists());
    }

    #[test]
    fn second_pass_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path());
        let mut config = Configuration::default();
        config.stable_diffusion.path = dir.path().display().to_string();
        config
            .stable_diffusion
            .checkpoints
            .add(descriptor("base", "https://h/base"));

        let source = FakeSource::default().serve("https://h/base", 200, b"checkpoint");
        let sync = Synchronizer::new(storage, source);

        assert_eq!(sync.sync_all(&config, |_| {}).downloaded(), 1);
        let second = sync.sync_all(&config, |_| {});
        assert_eq!(second.up_to_date(), 1);
        assert_eq!(sync.source.opened.get(), 1);
    }
}
