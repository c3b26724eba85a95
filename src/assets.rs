use crate::canvas::EmbeddedImage;
use base64::Engine;
use log::{debug, warn};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Upper bound on logo payloads. Anything larger is treated as a failed
/// load, not an error.
const MAX_LOGO_BYTES: usize = 8 * 1024 * 1024;

/// Resolves an optional logo reference into decoded RGB pixels.
///
/// Every failure path degrades to `None`: the export must proceed
/// without branding rather than abort. No retries are attempted.
#[derive(Debug)]
pub struct AssetLoader {
    client: reqwest::Client,
    timeout: Duration,
}

impl AssetLoader {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Fetches and decodes the logo. Accepts `https?://` URLs and
    /// `data:image/...;base64,` URIs. Checks `cancel` before touching
    /// the network.
    pub async fn load(
        &self,
        reference: Option<&str>,
        cancel: &CancellationToken,
    ) -> Option<EmbeddedImage> {
        let reference = reference?.trim();
        if reference.is_empty() {
            return None;
        }
        if cancel.is_cancelled() {
            debug!("logo load skipped: export cancelled");
            return None;
        }

        let bytes = if reference.starts_with("data:") {
            Self::decode_data_uri(reference)?
        } else if reference.starts_with("http://") || reference.starts_with("https://") {
            self.fetch(reference).await?
        } else {
            warn!("unsupported logo reference scheme: {}", reference);
            return None;
        };

        if bytes.len() > MAX_LOGO_BYTES {
            warn!("logo payload too large ({} bytes), skipping", bytes.len());
            return None;
        }

        match image::load_from_memory(&bytes) {
            Ok(decoded) => {
                let rgb = decoded.to_rgb8();
                debug!("logo decoded: {}x{}", rgb.width(), rgb.height());
                Some(EmbeddedImage {
                    width: rgb.width(),
                    height: rgb.height(),
                    rgb: rgb.into_raw(),
                })
            }
            Err(err) => {
                warn!("logo decode failed, continuing without branding: {}", err);
                None
            }
        }
    }

    async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        let response = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("logo fetch failed, continuing without branding: {}", err);
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(
                "logo fetch returned {}, continuing without branding",
                response.status()
            );
            return None;
        }
        if let Some(length) = response.content_length() {
            if length as usize > MAX_LOGO_BYTES {
                warn!("logo payload too large ({} bytes), skipping", length);
                return None;
            }
        }
        match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(err) => {
                warn!("logo body read failed, continuing without branding: {}", err);
                None
            }
        }
    }

    fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
        let payload = match uri.split_once(";base64,") {
            Some((_, payload)) => payload,
            None => {
                warn!("logo data URI is not base64-encoded, skipping");
                return None;
            }
        };
        match base64::engine::general_purpose::STANDARD.decode(payload.trim()) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!("logo data URI decode failed: {}", err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_data_uri() -> String {
        let mut pixmap = tiny_skia::Pixmap::new(4, 2).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(30, 60, 120, 255));
        let png = pixmap.encode_png().unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        )
    }

    #[tokio::test]
    async fn decodes_a_base64_data_uri_logo() {
        let loader = AssetLoader::new(Duration::from_secs(1));
        let logo = loader
            .load(Some(&png_data_uri()), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!((logo.width, logo.height), (4, 2));
        assert_eq!(logo.rgb.len(), 4 * 2 * 3);
    }

    #[tokio::test]
    async fn missing_and_blank_references_yield_none() {
        let loader = AssetLoader::new(Duration::from_secs(1));
        let token = CancellationToken::new();
        assert!(loader.load(None, &token).await.is_none());
        assert!(loader.load(Some("   "), &token).await.is_none());
    }

    #[tokio::test]
    async fn garbage_payloads_degrade_to_none() {
        let loader = AssetLoader::new(Duration::from_secs(1));
        let token = CancellationToken::new();
        assert!(loader
            .load(Some("data:image/png;base64,!!!not-base64!!!"), &token)
            .await
            .is_none());
        assert!(loader
            .load(Some("data:image/png;base64,aGVsbG8="), &token)
            .await
            .is_none());
        assert!(loader.load(Some("ftp://example.com/logo.png"), &token).await.is_none());
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_load() {
        let loader = AssetLoader::new(Duration::from_secs(1));
        let token = CancellationToken::new();
        token.cancel();
        assert!(loader.load(Some(&png_data_uri()), &token).await.is_none());
    }
}
