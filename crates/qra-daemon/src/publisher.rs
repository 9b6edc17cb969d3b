//! QR publishing: token -> scan URL -> PNG, stored for `GET /qr_image`.
//!
//! Rendering is behind [`QrRenderer`] so tests can substitute it. The
//! publisher keeps the newest image by gate generation: a render that
//! finishes late (e.g. a rotator tick racing a mode switch) never replaces
//! an image minted after it.

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Luma};
use qra_gate::{GateSnapshot, Mode};
use qrcode::QrCode;
use tokio::sync::{Mutex, RwLock};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum PublishError {
    /// The URL could not be encoded as a QR image.
    Render(String),
    /// The image was rendered but the on-disk mirror could not be written.
    Write(String),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Render(msg) => write!(f, "qr render failed: {msg}"),
            PublishError::Write(msg) => write!(f, "qr write failed: {msg}"),
        }
    }
}

impl std::error::Error for PublishError {}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// `render(url) -> image bytes`.
pub trait QrRenderer: Send + Sync {
    fn render(&self, url: &str) -> Result<Vec<u8>, PublishError>;
}

/// Grayscale PNG via the `qrcode` + `image` crates.
#[derive(Clone, Debug)]
pub struct PngQrRenderer {
    module_px: u32,
}

impl PngQrRenderer {
    pub fn new(module_px: u32) -> Self {
        Self {
            module_px: module_px.max(1),
        }
    }
}

impl QrRenderer for PngQrRenderer {
    fn render(&self, url: &str) -> Result<Vec<u8>, PublishError> {
        let code = QrCode::new(url.as_bytes()).map_err(|e| PublishError::Render(e.to_string()))?;
        let img = code
            .render::<Luma<u8>>()
            .module_dimensions(self.module_px, self.module_px)
            .build();

        let mut out = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .map_err(|e| PublishError::Render(e.to_string()))?;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// The image currently on offer.
#[derive(Clone, Debug)]
pub struct PublishedQr {
    pub generation: u64,
    pub mode: Mode,
    pub png: Arc<[u8]>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    Stored,
    /// A newer generation was already published; this image was dropped.
    Superseded,
}

pub struct QrPublisher {
    public_base_url: String,
    renderer: Arc<dyn QrRenderer>,
    output_path: Option<PathBuf>,
    current: RwLock<Option<PublishedQr>>,
    /// Generation last written to `output_path`. Serializes file writes
    /// without holding `current` across the disk IO.
    mirrored: Mutex<u64>,
}

impl QrPublisher {
    pub fn new(
        public_base_url: impl Into<String>,
        renderer: Arc<dyn QrRenderer>,
        output_path: Option<PathBuf>,
    ) -> Self {
        Self {
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            renderer,
            output_path,
            current: RwLock::new(None),
            mirrored: Mutex::new(0),
        }
    }

    pub fn scan_url(&self, token: &str) -> String {
        format!("{}/scan_form?token={}", self.public_base_url, token)
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// Render and store the QR for `snap`, then mirror it to `output_path`.
    ///
    /// A render error replaces nothing: the previous image stays on offer
    /// and the caller's next mint is the retry. A write error happens after
    /// the new image is already served; only the file copy lags.
    pub async fn publish(&self, snap: &GateSnapshot) -> Result<PublishOutcome, PublishError> {
        let png: Arc<[u8]> = self.renderer.render(&self.scan_url(snap.token.as_str()))?.into();

        {
            let mut cur = self.current.write().await;
            if cur.as_ref().is_some_and(|c| c.generation > snap.generation) {
                return Ok(PublishOutcome::Superseded);
            }
            *cur = Some(PublishedQr {
                generation: snap.generation,
                mode: snap.mode,
                png: Arc::clone(&png),
            });
        }

        if let Some(path) = &self.output_path {
            let mut mirrored = self.mirrored.lock().await;
            if *mirrored > snap.generation {
                return Ok(PublishOutcome::Stored);
            }
            tokio::fs::write(path, &png)
                .await
                .map_err(|e| PublishError::Write(format!("{:?}: {e}", path)))?;
            *mirrored = snap.generation;
        }
        Ok(PublishOutcome::Stored)
    }

    pub async fn current(&self) -> Option<PublishedQr> {
        self.current.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qra_gate::Token;

    struct EchoRenderer;

    impl QrRenderer for EchoRenderer {
        fn render(&self, url: &str) -> Result<Vec<u8>, PublishError> {
            Ok(url.as_bytes().to_vec())
        }
    }

    fn snap(generation: u64, token: &str) -> GateSnapshot {
        GateSnapshot {
            mode: Mode::Attendance,
            token: Token::from(token),
            generation,
        }
    }

    #[test]
    fn png_renderer_emits_png_magic() {
        let png = PngQrRenderer::new(4)
            .render("http://127.0.0.1:8899/scan_form?token=ab12cd34")
            .unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[tokio::test]
    async fn older_generation_never_replaces_newer() {
        let p = QrPublisher::new("http://gate/", Arc::new(EchoRenderer), None);

        assert_eq!(p.publish(&snap(5, "newer000")).await.unwrap(), PublishOutcome::Stored);
        assert_eq!(
            p.publish(&snap(4, "older000")).await.unwrap(),
            PublishOutcome::Superseded
        );

        let cur = p.current().await.unwrap();
        assert_eq!(cur.generation, 5);
        assert_eq!(&*cur.png, b"http://gate/scan_form?token=newer000");
    }

    #[tokio::test]
    async fn failed_file_write_still_serves_new_image() {
        let dir = tempfile::tempdir().unwrap();
        let unwritable = dir.path().join("missing_dir").join("qr.png");
        let p = QrPublisher::new("http://gate", Arc::new(EchoRenderer), Some(unwritable));

        assert!(matches!(
            p.publish(&snap(1, "first000")).await,
            Err(PublishError::Write(_))
        ));
        assert_eq!(p.current().await.unwrap().generation, 1);

        assert!(p.publish(&snap(2, "second00")).await.is_err());
        let cur = p.current().await.unwrap();
        assert_eq!(cur.generation, 2);
        assert_eq!(&*cur.png, b"http://gate/scan_form?token=second00");
    }

    #[tokio::test]
    async fn file_mirror_tracks_newest_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr.png");
        let p = QrPublisher::new("http://gate", Arc::new(EchoRenderer), Some(path.clone()));

        p.publish(&snap(3, "three000")).await.unwrap();
        p.publish(&snap(2, "two00000")).await.unwrap();
        assert_eq!(
            std::fs::read(&path).unwrap(),
            b"http://gate/scan_form?token=three000"
        );
    }
}
