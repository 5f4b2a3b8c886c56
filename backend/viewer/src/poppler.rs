//! Rasterizes pages with poppler's `pdftoppm`.
//!
//! The document is piped through stdin and the PNG read back from stdout. A
//! cancelled token kills the child process.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::ImageFormat;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use deepread_core::{ReaderError, Result, Rotation};

use crate::cancel::RenderToken;
use crate::loader::PdfDocument;
use crate::renderer::{Frame, FrameSurface, PageRenderer, RenderRequest};
use crate::viewport::Viewport;

/// Points per inch; pdftoppm renders at `72 * scale` DPI for a 1:1 viewport.
const POINTS_PER_INCH: f32 = 72.0;

pub struct PopplerRenderer {
    binary: PathBuf,
    surface: FrameSurface,
}

impl PopplerRenderer {
    pub fn new(surface: FrameSurface) -> Self {
        Self {
            binary: PathBuf::from("pdftoppm"),
            surface,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn surface(&self) -> &FrameSurface {
        &self.surface
    }

    async fn rasterize(&self, document: &PdfDocument, request: RenderRequest) -> Result<Vec<u8>> {
        let dpi = ((POINTS_PER_INCH * request.scale).round().max(1.0) as u32).to_string();
        let page = request.page.to_string();

        let mut child = Command::new(&self.binary)
            .args(["-f", page.as_str(), "-l", page.as_str(), "-r", dpi.as_str()])
            .args(["-png", "-singlefile", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ReaderError::Render(format!("failed to start {}: {e}", self.binary.display())))?;

        if let Some(mut stdin) = child.stdin.take() {
            let bytes = document.bytes().clone();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&bytes).await {
                    debug!(error = %e, "pdftoppm closed stdin early");
                }
            });
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ReaderError::Render(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReaderError::Render(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl PageRenderer for PopplerRenderer {
    fn name(&self) -> &str {
        "poppler"
    }

    async fn render(
        &self,
        document: &PdfDocument,
        request: RenderRequest,
        viewport: Viewport,
        token: &RenderToken,
    ) -> Result<()> {
        if token.is_cancelled() {
            return Err(ReaderError::RenderCancelled);
        }
        debug!(page = request.page, dpi_scale = request.scale, ?viewport, "Rasterizing page");

        // Dropping the rasterize future drops the child, which kills it.
        let png = tokio::select! {
            png = self.rasterize(document, request) => png?,
            _ = token.cancelled() => return Err(ReaderError::RenderCancelled),
        };

        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .map_err(|e| ReaderError::Render(format!("bad raster output: {e}")))?
            .to_rgba8();
        let image = match request.rotation {
            Rotation::Deg0 => decoded,
            Rotation::Deg90 => imageops::rotate90(&decoded),
            Rotation::Deg180 => imageops::rotate180(&decoded),
            Rotation::Deg270 => imageops::rotate270(&decoded),
        };
        // pdftoppm rounds DPI, so the raster can be a pixel or two off.
        let image = if (image.width(), image.height()) != (viewport.width, viewport.height) {
            debug!(
                got_width = image.width(),
                got_height = image.height(),
                want_width = viewport.width,
                want_height = viewport.height,
                "Resizing raster to viewport"
            );
            imageops::resize(&image, viewport.width, viewport.height, FilterType::Triangle)
        } else {
            image
        };

        self.surface.commit(
            token,
            Frame {
                document_id: document.id(),
                request,
                image,
            },
        )
    }
}
