mod assets;
mod canvas;
mod capture;
mod document;
mod error;
mod font;
mod layout;
mod money;
mod pdf;
mod slicer;
mod types;

pub use assets::AssetLoader;
pub use canvas::{DrawOp, EmbeddedImage, ImageRef, PageCanvas, RenderedDoc, RenderedPage};
pub use capture::{CaptureFrame, PreviewSurface, StaticPreview};
pub use document::{
    DocumentKind, DocumentModel, FooterContent, LineItem, PaymentStatus, PaymentSummary,
    Recipient, SystemConfig, Totals,
};
pub use error::ExportError;
pub use font::{text_width, wrap_text, FontId};
pub use layout::LayoutStyle;
pub use money::{Money, Percent};
pub use types::{Color, Margins, Pt, Rect, Size};

use log::debug;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The finished export: PDF bytes plus the name the caller should save
/// or download them under.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl ExportArtifact {
    /// Writes the artifact into `dir` under its own file name.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// The document export engine.
///
/// Holds the fixed page geometry for every export plus the
/// at-most-one-export-in-flight registry: a second export of the same
/// document number while one is pending is rejected, never interleaved.
#[derive(Debug)]
pub struct Exporter {
    page_size: Size,
    margins: Margins,
    style: LayoutStyle,
    assets: AssetLoader,
    readiness_timeout: Duration,
    in_flight: Mutex<HashSet<String>>,
}

#[derive(Clone)]
pub struct ExporterBuilder {
    page_size: Size,
    margins: Margins,
    style: LayoutStyle,
    asset_timeout: Duration,
    readiness_timeout: Duration,
}

impl Default for ExporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterBuilder {
    pub fn new() -> Self {
        Self {
            page_size: Size::letter(),
            margins: Margins::all(20.0),
            style: LayoutStyle::default(),
            asset_timeout: Duration::from_secs(10),
            readiness_timeout: Duration::from_secs(5),
        }
    }

    pub fn page_size(mut self, size: Size) -> Self {
        self.page_size = size;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    pub fn margin_all(mut self, value: f32) -> Self {
        self.margins = Margins::all(value);
        self
    }

    pub fn style(mut self, style: LayoutStyle) -> Self {
        self.style = style;
        self
    }

    /// Bound on the logo fetch. A fetch that exceeds it degrades to an
    /// unbranded export, it does not fail it.
    pub fn asset_timeout(mut self, timeout: Duration) -> Self {
        self.asset_timeout = timeout;
        self
    }

    /// Bound on how long the preview surface may take to signal ready.
    pub fn readiness_timeout(mut self, timeout: Duration) -> Self {
        self.readiness_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Exporter, ExportError> {
        if self.page_size.width <= Pt::ZERO || self.page_size.height <= Pt::ZERO {
            return Err(ExportError::InvalidConfiguration(
                "page size must be positive".to_string(),
            ));
        }
        if self.margins.left + self.margins.right >= self.page_size.width
            || self.margins.top + self.margins.bottom >= self.page_size.height
        {
            return Err(ExportError::InvalidConfiguration(
                "margins leave no content area".to_string(),
            ));
        }
        if self.asset_timeout.is_zero() || self.readiness_timeout.is_zero() {
            return Err(ExportError::InvalidConfiguration(
                "timeouts must be positive".to_string(),
            ));
        }
        Ok(Exporter {
            page_size: self.page_size,
            margins: self.margins,
            style: self.style,
            assets: AssetLoader::new(self.asset_timeout),
            readiness_timeout: self.readiness_timeout,
            in_flight: Mutex::new(HashSet::new()),
        })
    }
}

impl Exporter {
    pub fn builder() -> ExporterBuilder {
        ExporterBuilder::new()
    }

    /// Exports through the vector path: the document is drawn directly
    /// into page coordinates with row-aware breaks, so a line item never
    /// splits across a page boundary.
    pub async fn export(
        &self,
        document: &DocumentModel,
        branding: &SystemConfig,
    ) -> Result<ExportArtifact, ExportError> {
        self.export_with_cancel(document, branding, &CancellationToken::new())
            .await
    }

    pub async fn export_with_cancel(
        &self,
        document: &DocumentModel,
        branding: &SystemConfig,
        cancel: &CancellationToken,
    ) -> Result<ExportArtifact, ExportError> {
        document.validate()?;
        let _ticket = self.begin(&document.number)?;
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        debug!("exporting {} via the vector path", document.number);
        let logo = self
            .assets
            .load(branding.logo_url.as_deref(), cancel)
            .await;
        let mut rendered = layout::paginate(
            document,
            branding,
            logo.as_ref(),
            self.page_size,
            self.margins,
            &self.style,
        );
        layout::stamp_footers(&mut rendered, &branding.company_name, self.margins, &self.style);
        self.finalize(document, rendered)
    }

    /// Exports through the raster path: the caller's preview surface
    /// renders the document as one tall bitmap, which is sliced into
    /// page-height bands. Band boundaries are pixel-blind — a row in
    /// the captured view can land across two pages.
    pub async fn export_captured<S: PreviewSurface>(
        &self,
        document: &DocumentModel,
        surface: &S,
    ) -> Result<ExportArtifact, ExportError> {
        self.export_captured_with_cancel(document, surface, &CancellationToken::new())
            .await
    }

    pub async fn export_captured_with_cancel<S: PreviewSurface>(
        &self,
        document: &DocumentModel,
        surface: &S,
        cancel: &CancellationToken,
    ) -> Result<ExportArtifact, ExportError> {
        document.validate()?;
        let _ticket = self.begin(&document.number)?;

        let frame =
            capture::acquire_frame(surface, document, self.readiness_timeout, cancel).await?;
        debug!(
            "captured {} at {}x{} (scale {})",
            document.number,
            frame.pixmap.width(),
            frame.pixmap.height(),
            frame.scale
        );
        let bands = slicer::slice_frame(&frame, self.page_size)?;
        let rendered = slicer::bands_to_doc(bands, self.page_size);
        self.finalize(document, rendered)
    }

    fn finalize(
        &self,
        document: &DocumentModel,
        rendered: RenderedDoc,
    ) -> Result<ExportArtifact, ExportError> {
        let bytes = pdf::write_pdf(&rendered)?;
        let artifact = ExportArtifact {
            file_name: pdf::artifact_file_name(document.kind, &document.number),
            page_count: rendered.pages.len(),
            bytes,
        };
        debug!(
            "export of {} finished: {} page(s), {} bytes",
            document.number,
            artifact.page_count,
            artifact.bytes.len()
        );
        Ok(artifact)
    }

    fn begin(&self, number: &str) -> Result<InFlightTicket<'_>, ExportError> {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !set.insert(number.to_string()) {
            return Err(ExportError::ExportInFlight(number.to_string()));
        }
        Ok(InFlightTicket {
            registry: &self.in_flight,
            key: number.to_string(),
        })
    }
}

/// Releases the in-flight slot on every exit path, success or failure,
/// so a retry is always possible.
struct InFlightTicket<'a> {
    registry: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for InFlightTicket<'_> {
    fn drop(&mut self) {
        let mut set = self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        set.remove(&self.key);
    }
}
