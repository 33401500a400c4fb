use std::{
    fs::File,
    io::{Read, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};

use super::progress::{ProgressTracker, TransferStats};

pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Destination and expected size of one full-file transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub url: String,
    pub destination: PathBuf,
    pub expected_size_bytes: u64,
    pub chunk_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub final_path: PathBuf,
    pub bytes_downloaded: u64,
}

/// Streams `body` into the plan's destination, truncating whatever was there.
/// `progress` sees one snapshot per written chunk.
pub fn download_with_progress<R, F>(
    plan: &DownloadPlan,
    body: &mut R,
    mut progress: F,
) -> Result<DownloadOutcome>
where
    R: Read + ?Sized,
    F: FnMut(TransferStats),
{
    let mut file = File::create(&plan.destination)
        .with_context(|| format!("create {}", plan.destination.display()))?;
    let bytes_downloaded = copy_chunks(plan, body, &mut file, &mut progress)?;
    file.flush().context("flush download")?;

    Ok(DownloadOutcome {
        final_path: plan.destination.clone(),
        bytes_downloaded,
    })
}

fn copy_chunks<R, F>(
    plan: &DownloadPlan,
    body: &mut R,
    file: &mut File,
    progress: &mut F,
) -> Result<u64>
where
    R: Read + ?Sized,
    F: FnMut(TransferStats),
{
    let mut tracker = ProgressTracker::start(plan.expected_size_bytes);
    let mut buffer = vec![0u8; plan.chunk_size.max(1)];
    loop {
        let read = body
            .read(&mut buffer)
            .with_context(|| format!("read chunk from {}", plan.url))?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .with_context(|| format!("write chunk to {}", plan.destination.display()))?;
        progress(tracker.record(read));
    }
    Ok(tracker.downloaded_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    fn plan(destination: PathBuf, expected: u64, chunk_size: usize) -> DownloadPlan {
        DownloadPlan {
            url: "https://example.com/asset".into(),
            destination,
            expected_size_bytes: expected,
            chunk_size,
        }
    }

    #[test]
    fn writes_body_and_reports_each_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("asset.bin");
        let payload = vec![7u8; 2500];
        let mut snapshots = Vec::new();

        let outcome = download_with_progress(
            &plan(target.clone(), 2500, 1024),
            &mut Cursor::new(payload.clone()),
            |stats| snapshots.push(stats.downloaded_bytes),
        )
        .unwrap();

        assert_eq!(outcome.bytes_downloaded, 2500);
        assert_eq!(fs::read(&target).unwrap(), payload);
        assert_eq!(snapshots, [1024, 2048, 2500]);
    }

    #[test]
    fn overwrites_longer_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("asset.bin");
        fs::write(&target, vec![1u8; 4096]).unwrap();

        download_with_progress(&plan(target.clone(), 10, 4), &mut Cursor::new(vec![2u8; 10]), |_| {})
            .unwrap();

        assert_eq!(fs::read(&target).unwrap(), vec![2u8; 10]);
    }

    #[test]
    fn missing_parent_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing").join("asset.bin");
        let result = download_with_progress(&plan(target, 1, 1), &mut Cursor::new(vec![0u8]), |_| {});
        assert!(result.is_err());
    }
}
