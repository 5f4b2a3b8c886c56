//! `POST /api/upload`

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use tracing::{info, warn};

use deepread_core::wire::UploadResponse;
use deepread_core::ReaderError;
use deepread_logging::{EventLogger, ReaderEvent};

use crate::error::ApiError;
use crate::server::{CurrentDocument, GatewayState};

const PDF_MAGIC: &[u8] = b"%PDF-";

struct UploadedFile {
    name: String,
    content_type: Option<String>,
    bytes: Bytes,
}

/// A part counts as a PDF when its bytes carry the `%PDF-` header and either its
/// declared content type or its extension says so.
fn looks_like_pdf(file: &UploadedFile) -> bool {
    let declared = file
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"));
    let extension = file.name.to_ascii_lowercase().ends_with(".pdf");
    file.bytes.starts_with(PDF_MAGIC) && (declared || extension)
}

async fn read_single_file(mut multipart: Multipart) -> Result<UploadedFile, ApiError> {
    let mut found: Option<UploadedFile> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        if found.is_some() {
            return Err(ApiError::bad_request("Only one file may be uploaded"));
        }
        let name = field.file_name().unwrap_or("document.pdf").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        found = Some(UploadedFile {
            name,
            content_type,
            bytes,
        });
    }
    found.ok_or_else(|| ReaderError::NoFile.into())
}

/// Store the uploaded PDF in place of the previous one and have the backend
/// index it.
pub async fn upload_pdf(
    State(state): State<GatewayState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let file = read_single_file(multipart).await?;
    if !looks_like_pdf(&file) {
        warn!(filename = %file.name, content_type = ?file.content_type, "Rejected non-PDF upload");
        return Err(ReaderError::InvalidFileType(file.name).into());
    }

    let _ingest = state.lock_ingest().await;
    let filename = state.store.replace(&file.name, &file.bytes).await?;
    let url = format!("/pdfs/{filename}");
    info!(filename = %filename, "Processing file");
    EventLogger::log_event(
        "-",
        ReaderEvent::DocumentUploaded {
            filename: filename.clone(),
            size_bytes: file.bytes.len(),
        },
    );

    // The old file is gone, so the old context must not answer questions.
    state.chat.clear_context();
    state.set_current(CurrentDocument {
        name: filename.clone(),
        url: url.clone(),
    });

    let processed = state.backend.process_pdf(&filename).await.map_err(|e| match e {
        processing @ ReaderError::Processing(_) => processing,
        other => ReaderError::Processing(other.to_string()),
    })?;
    info!(
        message = %processed.message,
        pdf_internal_id = ?processed.pdf_internal_id,
        collection = %processed.collection_name_for_rag,
        pdf_session_id = %processed.pdf_session_id,
        "PDF processed successfully"
    );
    EventLogger::log_event(
        &processed.pdf_session_id,
        ReaderEvent::DocumentProcessed {
            filename: filename.clone(),
            collection: processed.collection_name_for_rag.clone(),
        },
    );

    state.chat.set_context(processed.context());
    state.set_current(CurrentDocument {
        name: processed
            .original_filename
            .clone()
            .unwrap_or_else(|| filename.clone()),
        url: url.clone(),
    });
    Ok(Json(UploadResponse { url }))
}
