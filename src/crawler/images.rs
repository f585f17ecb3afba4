//! Image download for accepted pages
//!
//! Images are fetched through the job's static fetcher and handed to an [`ImageStore`].
//! A failed download is logged and leaves the image's `local_path` empty.

use crate::crawler::Fetcher;
use crate::state::PageImage;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Longest file extension kept from an image URL (including the dot)
const MAX_EXTENSION_LEN: usize = 5;

/// Extension used when the URL has none or an implausible one
const DEFAULT_EXTENSION: &str = ".jpg";

/// Destination for downloaded images
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores image bytes and returns where they were written
    async fn store(&self, url: &Url, bytes: &[u8]) -> std::io::Result<String>;
}

/// Stores images as files in one directory
#[derive(Debug, Clone)]
pub struct DirImageStore {
    directory: PathBuf,
}

impl DirImageStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl ImageStore for DirImageStore {
    async fn store(&self, url: &Url, bytes: &[u8]) -> std::io::Result<String> {
        tokio::fs::create_dir_all(&self.directory).await?;
        let path = self.directory.join(image_file_name(url));

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("Image {} already stored at {}", url, path.display());
        } else {
            tokio::fs::write(&path, bytes).await?;
        }

        Ok(path.to_string_lossy().into_owned())
    }
}

/// File name for an image: SHA-256 of the URL plus the URL's extension
pub fn image_file_name(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    let hash = hex::encode(hasher.finalize());

    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    let extension = match last_segment.rfind('.') {
        Some(idx) if last_segment.len() - idx <= MAX_EXTENSION_LEN && idx + 1 < last_segment.len() => {
            last_segment[idx..].to_ascii_lowercase()
        }
        _ => DEFAULT_EXTENSION.to_string(),
    };

    format!("{}{}", hash, extension)
}

/// Downloads every image and records where each was stored
pub async fn download_images(
    fetcher: &dyn Fetcher,
    store: &dyn ImageStore,
    images: &mut [PageImage],
    timeout: Duration,
) {
    for image in images.iter_mut() {
        let Ok(url) = Url::parse(&image.url) else {
            continue;
        };

        let bytes = match fetcher.fetch(&url, timeout, false).await {
            Ok(page) => page.body,
            Err(e) => {
                warn!("Failed to download image {}: {}", url, e);
                continue;
            }
        };

        match store.store(&url, &bytes).await {
            Ok(path) => image.local_path = Some(path),
            Err(e) => warn!("Failed to store image {}: {}", url, e),
        }
    }
}
