//! Image-host mirror: uploads a local image directory to an HTTP object store.
//!
//! Implements the translation engine's [`ImageSync`] port. The sync walks the
//! directory recursively, flattens everything to `key_prefix + basename`, and
//! checks object existence before uploading, so repeated syncs of the same
//! directory are cheap and idempotent. Individual file failures are logged
//! and skipped; only a missing endpoint or transport-level breakage fails the
//! sync as a whole.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use pagelift_shared::{PageliftError, Result};
use pagelift_translate::ImageSync;

/// File extensions mirrored to the host. Everything else is ignored.
const SUPPORTED_EXTENSIONS: [&str; 9] = [
    "bmp", "gif", "heic", "jpeg", "jpg", "png", "svg", "tif", "tiff",
];

/// Object-store client scoped to one bucket and key prefix.
pub struct ObjectStoreClient {
    http: Client,
    endpoint: String,
    bucket: String,
    key_prefix: String,
    auth_token: Option<String>,
}

impl ObjectStoreClient {
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        key_prefix: impl Into<String>,
        auth_token: Option<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PageliftError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            key_prefix: key_prefix.into(),
            auth_token: auth_token.filter(|t| !t.is_empty()),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{key}", self.endpoint, self.bucket)
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// HEAD the object; any success status counts as present.
    async fn object_exists(&self, key: &str) -> Result<bool> {
        let response = self
            .with_auth(self.http.head(self.object_url(key)))
            .send()
            .await
            .map_err(|e| PageliftError::Network(format!("object_exists: {e}")))?;
        Ok(response.status().is_success())
    }

    async fn put_object(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let response = self
            .with_auth(self.http.put(self.object_url(key)))
            .body(bytes)
            .send()
            .await
            .map_err(|e| PageliftError::Network(format!("put_object: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PageliftError::image_host(
                "put_object",
                format!("{key}: HTTP {status}"),
            ));
        }
        Ok(())
    }

    /// Mirror every supported image under `dir` that is not already present
    /// on the host.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn sync(&self, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            warn!("image directory does not exist, nothing to sync");
            return Ok(());
        }

        let mut uploaded = 0usize;
        let mut skipped = 0usize;

        for file in collect_files(dir)? {
            let Some(name) = file.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };

            let supported = file
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()));
            if !supported {
                continue;
            }

            // Non-ASCII names make unreliable object keys and URLs.
            if !name.is_ascii() {
                warn!(file = %name, "filename is not ASCII, skipping upload");
                continue;
            }

            let key = format!("{}{name}", self.key_prefix);
            match self.upload_if_missing(&file, &key).await {
                Ok(true) => uploaded += 1,
                Ok(false) => skipped += 1,
                Err(e) => warn!(file = %name, error = %e, "upload failed, continuing"),
            }
        }

        info!(uploaded, skipped, "image sync complete");
        Ok(())
    }

    /// Returns true if the file was uploaded, false if already present.
    async fn upload_if_missing(&self, file: &Path, key: &str) -> Result<bool> {
        if self.object_exists(key).await? {
            debug!(key, "object already present");
            return Ok(false);
        }

        let bytes = std::fs::read(file).map_err(|e| PageliftError::io(file, e))?;
        self.put_object(key, bytes).await?;
        debug!(key, "object uploaded");
        Ok(true)
    }
}

impl ImageSync for ObjectStoreClient {
    async fn sync_directory(&self, dir: &Path) -> Result<()> {
        self.sync(dir).await
    }
}

/// Recursively collect regular files under `dir`.
fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let entries = std::fs::read_dir(&current).map_err(|e| PageliftError::io(&current, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| PageliftError::io(&current, e))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
