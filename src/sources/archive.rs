//! Archive dependency fetching: download, hash, extract (spec §4.3).

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::core::dependency::ArchiveDependency;
use crate::util::hash::sha256_bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFetchResult {
    pub hash: String,
}

pub fn fetch(dep: &ArchiveDependency, dest: &Path) -> Result<ArchiveFetchResult> {
    let bytes = download(&dep.url)?;
    let hash = sha256_bytes(&bytes);

    let extract_root = tempfile::tempdir().context("failed to create extraction scratch directory")?;
    extract(&dep.url, &bytes, extract_root.path())?;

    let source_dir = match &dep.subdirectory {
        Some(sub) => extract_root.path().join(sub),
        None => single_top_level_dir(extract_root.path()).unwrap_or_else(|| extract_root.path().to_path_buf()),
    };

    if dest.exists() {
        std::fs::remove_dir_all(dest)?;
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    copy_dir_recursive(&source_dir, dest)?;

    Ok(ArchiveFetchResult { hash })
}

fn download(url: &str) -> Result<Vec<u8>> {
    let response = reqwest::blocking::get(url).with_context(|| format!("failed to download {url}"))?;
    if !response.status().is_success() {
        bail!("download of {url} failed with status {}", response.status());
    }
    let bytes = response.bytes().context("failed to read response body")?;
    Ok(bytes.to_vec())
}

fn extract(url: &str, bytes: &[u8], dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    if url.ends_with(".zip") {
        extract_zip(bytes, dest)
    } else {
        extract_tar_gz(bytes, dest)
    }
}

fn extract_zip(bytes: &[u8], dest: &Path) -> Result<()> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor).context("not a valid zip archive")?;
    archive.extract(dest).context("failed to extract zip archive")?;
    Ok(())
}

fn extract_tar_gz(bytes: &[u8], dest: &Path) -> Result<()> {
    let decoder = flate2::read::GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);
    archive.unpack(dest).context("failed to extract tar archive")?;
    Ok(())
}

fn single_top_level_dir(root: &Path) -> Option<std::path::PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(root).ok()?.filter_map(|e| e.ok()).collect();
    if entries.len() == 1 && entries[0].file_type().ok()?.is_dir() {
        return Some(entries.remove(0).path());
    }
    None
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let dest_path = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &dest_path)?;
        } else {
            std::fs::copy(entry.path(), &dest_path)?;
        }
    }
    Ok(())
}
