//! The render engine state machine.
//!
//! `Unloaded → Loading → Ready`. In `Ready`, every change of page, zoom or
//! rotation starts exactly one render and cancels the one before it. A failed
//! load drops back to `Unloaded`.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use deepread_core::{clamp_scale, DocumentSession, DocumentSource, ReaderError, Result, Rotation};
use deepread_logging::{EventLogger, ReaderEvent};

use crate::cancel::RenderToken;
use crate::loader::{DocumentLoader, PdfDocument};
use crate::renderer::{PageRenderer, RenderRequest};
use crate::viewport::{Viewport, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unloaded,
    Loading,
    Ready,
}

/// What the output surface currently shows, published on a watch channel.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderStatus {
    Idle,
    Rendering(RenderRequest),
    Rendered {
        request: RenderRequest,
        viewport: Viewport,
    },
    /// A non-fatal render failure to show next to the page.
    Notice {
        request: RenderRequest,
        message: String,
    },
}

struct InFlight {
    token: RenderToken,
    task: JoinHandle<()>,
}

pub struct RenderEngine {
    loader: DocumentLoader,
    renderer: Arc<dyn PageRenderer>,
    phase: Phase,
    document: Option<Arc<PdfDocument>>,
    session: Option<DocumentSession>,
    in_flight: Option<InFlight>,
    status: Arc<watch::Sender<RenderStatus>>,
    load_error: Option<String>,
}

impl RenderEngine {
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Self {
        let (status, _) = watch::channel(RenderStatus::Idle);
        Self {
            loader: DocumentLoader::new(),
            renderer,
            phase: Phase::Unloaded,
            document: None,
            session: None,
            in_flight: None,
            status: Arc::new(status),
            load_error: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> Option<&DocumentSession> {
        self.session.as_ref()
    }

    pub fn document(&self) -> Option<&Arc<PdfDocument>> {
        self.document.as_ref()
    }

    /// Message to show in place of the viewer after a failed load.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> RenderStatus {
        self.status.borrow().clone()
    }

    /// Load a new document, replacing the current one.
    ///
    /// Returns the page count. On success the first page is rendered at the
    /// session's initial zoom.
    pub async fn load_document(&mut self, source: DocumentSource) -> Result<u32> {
        let page_count = self.open(source).await?;
        self.render_current();
        Ok(page_count)
    }

    /// Load a new document and render it once, already positioned on `page`
    /// at `scale` and `rotation`.
    pub async fn load_document_at(
        &mut self,
        source: DocumentSource,
        page: u32,
        scale: f32,
        rotation: Rotation,
    ) -> Result<u32> {
        let page_count = self.open(source).await?;
        self.apply_view(page, scale, rotation);
        self.render_current();
        Ok(page_count)
    }

    async fn open(&mut self, source: DocumentSource) -> Result<u32> {
        self.cancel_in_flight();
        self.document = None;
        self.session = None;
        self.load_error = None;
        self.phase = Phase::Loading;
        self.status.send_replace(RenderStatus::Idle);
        info!(source = %source, "Loading document");

        match self.loader.load(&source).await {
            Ok(document) => {
                let page_count = document.page_count();
                let name = document.name().to_string();
                self.session = Some(DocumentSession::new(source, name, page_count));
                self.document = Some(Arc::new(document));
                self.phase = Phase::Ready;
                info!(pages = page_count, "Document ready");
                Ok(page_count)
            }
            Err(e) => {
                warn!(error = %e, "Document failed to load");
                self.phase = Phase::Unloaded;
                self.load_error = Some(e.to_string());
                Err(match e {
                    load @ ReaderError::Load(_) => load,
                    other => ReaderError::Load(other.to_string()),
                })
            }
        }
    }

    /// Start rendering `request`, superseding any render in flight.
    ///
    /// Failures other than cancellation are logged and published as a
    /// [`RenderStatus::Notice`]; they never reach the caller. The scale is
    /// clamped to the zoom range and a non-finite scale is rejected.
    pub fn render_page(&mut self, mut request: RenderRequest) -> Result<()> {
        if !request.scale.is_finite() {
            return Err(ReaderError::Render(format!("invalid scale {}", request.scale)));
        }
        request.scale = clamp_scale(request.scale);
        let document = match (&self.document, self.phase) {
            (Some(document), Phase::Ready) => Arc::clone(document),
            _ => return Err(ReaderError::Render("no document loaded".to_string())),
        };
        let page_size = document.page_size(request.page).ok_or_else(|| {
            ReaderError::Render(format!(
                "page {} out of range 1..={}",
                request.page,
                document.page_count()
            ))
        })?;

        self.cancel_in_flight();
        let viewport = Viewport::for_page(page_size, request.scale, request.rotation);
        let token = RenderToken::new();
        self.status.send_replace(RenderStatus::Rendering(request));
        debug!(page = request.page, scale = request.scale, rotation = request.rotation.degrees(), "Render started");

        let renderer = Arc::clone(&self.renderer);
        let status = Arc::clone(&self.status);
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            let result = renderer
                .render(&document, request, viewport, &task_token)
                .await;
            let outcome = match result {
                Ok(()) => RenderStatus::Rendered { request, viewport },
                Err(e) if e.is_cancellation() || task_token.is_cancelled() => {
                    debug!(page = request.page, "Render superseded");
                    return;
                }
                Err(e) => {
                    warn!(page = request.page, error = %e, renderer = renderer.name(), "Render failed");
                    EventLogger::log_event(
                        "-",
                        ReaderEvent::RenderNotice {
                            page: request.page,
                            detail: e.to_string(),
                        },
                    );
                    RenderStatus::Notice {
                        request,
                        message: e.to_string(),
                    }
                }
            };
            // Checked under the channel lock: once a newer render has announced
            // itself this task's token is already cancelled.
            status.send_if_modified(|current| {
                if task_token.is_cancelled() {
                    return false;
                }
                *current = outcome;
                true
            });
        });

        self.in_flight = Some(InFlight { token, task });
        Ok(())
    }

    /// Wait for the render in flight, if any, and return the resulting status.
    pub async fn finish_render(&mut self) -> RenderStatus {
        if let Some(in_flight) = self.in_flight.take() {
            if let Err(e) = in_flight.task.await {
                warn!(error = %e, "Render task panicked");
            }
        }
        self.status()
    }

    pub fn set_page(&mut self, page: u32) -> bool {
        self.update(|session| session.set_page(page))
    }

    pub fn next_page(&mut self) -> bool {
        self.update(DocumentSession::next_page)
    }

    pub fn previous_page(&mut self) -> bool {
        self.update(DocumentSession::previous_page)
    }

    pub fn set_zoom(&mut self, scale: f32) -> bool {
        self.update(|session| session.set_zoom(scale))
    }

    pub fn zoom_in(&mut self) -> bool {
        self.update(DocumentSession::zoom_in)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.update(DocumentSession::zoom_out)
    }

    pub fn rotate(&mut self) -> bool {
        self.update(DocumentSession::rotate)
    }

    /// Move to `page` at `scale` and `rotation` in one step. Starts a single
    /// render when anything changed.
    pub fn set_view(&mut self, page: u32, scale: f32, rotation: Rotation) -> bool {
        if self.phase != Phase::Ready {
            return false;
        }
        let changed = self.apply_view(page, scale, rotation);
        if changed {
            self.render_current();
        }
        changed
    }

    fn apply_view(&mut self, page: u32, scale: f32, rotation: Rotation) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let page_changed = session.set_page(page);
        let zoom_changed = session.set_zoom(scale);
        let rotation_changed = session.set_rotation(rotation);
        page_changed || zoom_changed || rotation_changed
    }

    /// Viewport of the current page at the current zoom and rotation.
    pub fn viewport(&self) -> Option<Viewport> {
        let session = self.session.as_ref()?;
        let size = self
            .document
            .as_ref()
            .and_then(|d| d.page_size(session.current_page()))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Some(Viewport::for_page(size, session.scale(), session.rotation()))
    }

    fn update(&mut self, change: impl FnOnce(&mut DocumentSession) -> bool) -> bool {
        if self.phase != Phase::Ready {
            return false;
        }
        let changed = self.session.as_mut().map(change).unwrap_or(false);
        if changed {
            self.render_current();
        }
        changed
    }

    fn render_current(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let request = RenderRequest {
            page: session.current_page(),
            scale: session.scale(),
            rotation: session.rotation(),
        };
        if let Err(e) = self.render_page(request) {
            warn!(error = %e, "Could not start render");
        }
    }

    fn cancel_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.token.cancel();
        }
    }
}

impl Drop for RenderEngine {
    fn drop(&mut self) {
        self.cancel_in_flight();
    }
}
