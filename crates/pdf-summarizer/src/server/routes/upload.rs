//! PDF upload endpoint

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};

use crate::error::{Error, Result};
use crate::processing::Upload;
use crate::server::state::AppState;
use crate::types::UploadResponse;

/// Multipart field carrying the PDF
const FILE_FIELD: &str = "file";

/// POST /api/v1/upload - Validate a PDF and start processing it
pub async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let max_file_size = state.config().upload.max_file_size;
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_file_size))?;

        tracing::info!("Received upload: {} ({} bytes)", filename, data.len());

        upload = Some(Upload {
            filename,
            content_type,
            data,
        });
        break;
    }

    let upload = upload.ok_or_else(|| {
        Error::validation(format!("No file provided in multipart field '{}'", FILE_FIELD))
    })?;

    let receipt = state.engine().submit(upload).await?;
    Ok(Json(receipt.into()))
}

fn multipart_error(err: MultipartError, max_file_size: u64) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::FileTooLarge {
            size: None,
            max: max_file_size,
        }
    } else {
        Error::validation(format!("Failed to read multipart upload: {}", err.body_text()))
    }
}
