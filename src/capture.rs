use crate::document::DocumentModel;
use crate::error::ExportError;
use std::future::Future;
use std::time::Duration;
use tiny_skia::Pixmap;
use tokio_util::sync::CancellationToken;

/// A captured rendering of the document preview: one tall bitmap plus
/// the scale factor it was rendered at (device pixels per CSS-style
/// unit; the shipped default renders at 2x for resolution).
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub pixmap: Pixmap,
    pub scale: f32,
}

/// The off-screen view that renders a rich document preview.
///
/// The returned future must resolve only once the view has completed a
/// full layout pass — an explicit ready signal, not a timing guess. The
/// adapter bounds the wait with a readiness timeout and never interleaves
/// two captures.
pub trait PreviewSurface {
    fn render(
        &self,
        document: &DocumentModel,
    ) -> impl Future<Output = Result<CaptureFrame, ExportError>> + Send;
}

/// A surface for previews rendered out-of-band: hands back a frame that
/// already exists. Useful when the caller drives its own view pipeline.
pub struct StaticPreview {
    frame: CaptureFrame,
}

impl StaticPreview {
    pub fn new(pixmap: Pixmap, scale: f32) -> Self {
        Self {
            frame: CaptureFrame { pixmap, scale },
        }
    }
}

impl PreviewSurface for StaticPreview {
    async fn render(&self, _document: &DocumentModel) -> Result<CaptureFrame, ExportError> {
        Ok(self.frame.clone())
    }
}

/// Waits for the preview to signal ready and validates the frame.
/// Checked against `cancel` before the render begins; a surface that
/// never signals surfaces as `CaptureNotReady`.
pub(crate) async fn acquire_frame<S: PreviewSurface>(
    surface: &S,
    document: &DocumentModel,
    readiness_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<CaptureFrame, ExportError> {
    if cancel.is_cancelled() {
        return Err(ExportError::Cancelled);
    }
    let frame = match tokio::time::timeout(readiness_timeout, surface.render(document)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(ExportError::CaptureNotReady(format!(
                "preview did not signal ready within {}ms",
                readiness_timeout.as_millis()
            )));
        }
    };
    if frame.pixmap.width() == 0 || frame.pixmap.height() == 0 {
        return Err(ExportError::Render("captured bitmap is empty".to_string()));
    }
    if !(frame.scale > 0.0) {
        return Err(ExportError::Render(format!(
            "invalid capture scale {}",
            frame.scale
        )));
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::quote_q2024;

    fn solid_pixmap(width: u32, height: u32) -> Pixmap {
        let mut pixmap = Pixmap::new(width, height).unwrap();
        pixmap.fill(tiny_skia::Color::WHITE);
        pixmap
    }

    struct NeverReady;

    impl PreviewSurface for NeverReady {
        async fn render(&self, _document: &DocumentModel) -> Result<CaptureFrame, ExportError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            unreachable!("the adapter must time out first");
        }
    }

    #[tokio::test]
    async fn static_preview_resolves_immediately() {
        let surface = StaticPreview::new(solid_pixmap(100, 300), 2.0);
        let frame = acquire_frame(
            &surface,
            &quote_q2024(),
            Duration::from_millis(250),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(frame.pixmap.height(), 300);
        assert_eq!(frame.scale, 2.0);
    }

    #[tokio::test]
    async fn unready_surface_times_out_as_capture_not_ready() {
        let err = acquire_frame(
            &NeverReady,
            &quote_q2024(),
            Duration::from_millis(20),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExportError::CaptureNotReady(_)));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits_before_capture() {
        let token = CancellationToken::new();
        token.cancel();
        let surface = StaticPreview::new(solid_pixmap(10, 10), 2.0);
        let err = acquire_frame(&surface, &quote_q2024(), Duration::from_millis(250), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Cancelled));
    }

    #[tokio::test]
    async fn zero_scale_frames_are_rejected() {
        let surface = StaticPreview::new(solid_pixmap(10, 10), 0.0);
        let err = acquire_frame(
            &surface,
            &quote_q2024(),
            Duration::from_millis(250),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExportError::Render(_)));
    }
}
