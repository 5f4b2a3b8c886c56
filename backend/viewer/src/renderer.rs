use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use image::RgbaImage;

use deepread_core::{ReaderError, Result, Rotation};

use crate::cancel::RenderToken;
use crate::loader::PdfDocument;
use crate::viewport::Viewport;

/// A page to draw and the geometry to draw it with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub page: u32,
    pub scale: f32,
    pub rotation: Rotation,
}

/// Draws one page of a document onto an output surface.
///
/// Implementations must check `token` before committing pixels and return
/// [`ReaderError::RenderCancelled`] when it has been cancelled.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    fn name(&self) -> &str;

    async fn render(
        &self,
        document: &PdfDocument,
        request: RenderRequest,
        viewport: Viewport,
        token: &RenderToken,
    ) -> Result<()>;
}

/// The last committed page image.
#[derive(Debug, Clone)]
pub struct Frame {
    pub document_id: u64,
    pub request: RenderRequest,
    pub image: RgbaImage,
}

/// Output surface holding the most recent frame. Clones share the surface.
#[derive(Clone, Default)]
pub struct FrameSurface {
    frame: Arc<Mutex<Option<Frame>>>,
}

impl FrameSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Frame>> {
        self.frame.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the displayed frame unless `token` was cancelled.
    ///
    /// The token is checked under the surface lock, so a superseded render can
    /// never overwrite the frame of the render that replaced it.
    pub fn commit(&self, token: &RenderToken, frame: Frame) -> Result<()> {
        let mut slot = self.lock();
        if token.is_cancelled() {
            return Err(ReaderError::RenderCancelled);
        }
        *slot = Some(frame);
        Ok(())
    }

    pub fn current(&self) -> Option<Frame> {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(page: u32) -> Frame {
        Frame {
            document_id: 1,
            request: RenderRequest {
                page,
                scale: 1.0,
                rotation: Rotation::Deg0,
            },
            image: RgbaImage::new(2, 2),
        }
    }

    #[test]
    fn cancelled_tokens_cannot_commit() {
        let surface = FrameSurface::new();
        let live = RenderToken::new();
        surface.commit(&live, frame(1)).unwrap();

        let stale = RenderToken::new();
        stale.cancel();
        let err = surface.commit(&stale, frame(2)).unwrap_err();
        assert!(err.is_cancellation());
        assert_eq!(surface.current().unwrap().request.page, 1);
    }
}
