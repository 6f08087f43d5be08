use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Turns a local image path into a `data:` URL.
///
/// Templates hold this as a strategy object so targets without filesystem
/// access can build the crate without `fs` and inject their own loader.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn path_to_data_url(&self, path: &str) -> Result<String>;
}

/// The loader templates get when none is configured explicitly.
pub fn default_loader() -> Option<Arc<dyn ImageLoader>> {
    #[cfg(feature = "fs")]
    {
        Some(Arc::new(FsImageLoader))
    }
    #[cfg(not(feature = "fs"))]
    {
        None
    }
}

#[cfg(feature = "fs")]
pub use fs::FsImageLoader;

#[cfg(feature = "fs")]
mod fs {
    use super::ImageLoader;
    use crate::Result;
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use std::path::Path;
    use tracing::debug;

    /// Reads images from the local filesystem.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FsImageLoader;

    #[async_trait]
    impl ImageLoader for FsImageLoader {
        async fn path_to_data_url(&self, path: &str) -> Result<String> {
            let bytes = tokio::fs::read(path).await?;
            let mime = mime_from_path(Path::new(path));
            debug!("Loaded {} bytes from {} as {}", bytes.len(), path, mime);

            let mut url = String::with_capacity(mime.len() + bytes.len() * 4 / 3 + 20);
            url.push_str("data:");
            url.push_str(mime);
            url.push_str(";base64,");
            STANDARD.encode_string(&bytes, &mut url);
            Ok(url)
        }
    }

    pub(crate) fn mime_from_path(path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("bmp") => "image/bmp",
            Some("svg") => "image/svg+xml",
            _ => "application/octet-stream",
        }
    }

}
