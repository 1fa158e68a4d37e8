//! Upload page and batch conversion handlers.

use crate::api::AppState;
use crate::assemble::{ARCHIVE_DOWNLOAD_NAME, BatchResponse, assemble_response};
use crate::error::{ApiError, Error};
use crate::types::{ConversionOutcome, UploadRef};
use crate::utils::client_ip;
use crate::workspace::RequestWorkspace;
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{ConnectInfo, Multipart, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use futures::Stream;
use std::net::SocketAddr;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

/// GET / - Upload page
///
/// Advertises the configured limits; conversion itself happens on
/// `POST /api/convert`.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let limits = &state.service.config().limits;
    let max_file_mb = limits.max_file_size >> 20;

    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>KGM to FLAC converter</title>
</head>
<body>
    <h1>KGM to FLAC converter</h1>
    <p>Upload .kgm, .kgma or .vpr files and receive FLAC back.</p>
    <p>Up to {max_files} files per request, {max_file_mb} MB per file.</p>
    <form action="/api/convert" method="post" enctype="multipart/form-data">
        <input type="file" name="files" multiple accept=".kgm,.kgma,.vpr" />
        <button type="submit">Convert</button>
    </form>
</body>
</html>
"#,
        max_files = limits.max_files,
    ))
}

/// POST /api/convert - Convert a batch of encrypted audio files
///
/// Accepts repeated multipart `files` fields. One success streams the FLAC
/// back directly; several successes stream a zip archive; zero successes or
/// an invalid batch answer with an error status.
#[utoipa::path(
    post,
    path = "/api/convert",
    tag = "convert",
    request_body(content = Vec<u8>, description = "Encrypted audio uploads (multipart/form-data, repeated 'files' field)", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Converted audio (audio/flac for one file, application/zip for several)"),
        (status = 400, description = "No files, too many files, or every file failed", body = crate::error::ApiError),
        (status = 500, description = "Workspace or archive failure", body = crate::error::ApiError)
    )
)]
pub async fn convert(
    State(state): State<AppState>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    mut multipart: Multipart,
) -> Response {
    let started = Instant::now();
    let client = client_ip(&headers, peer.map(|info| info.0));

    let mut uploads: Vec<UploadRef> = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("files") {
                    continue;
                }
                let file_name = field.file_name().unwrap_or("upload").to_string();
                match field.bytes().await {
                    Ok(bytes) => uploads.push(UploadRef::new(file_name, bytes.to_vec())),
                    Err(e) => {
                        warn!(client = %client, file = %file_name, error = %e, "failed to read upload field");
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(ApiError::validation(format!(
                                "failed to read file {file_name}: {e}"
                            ))),
                        )
                            .into_response();
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(client = %client, error = %e, "malformed multipart body");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiError::validation(format!("malformed multipart body: {e}"))),
                )
                    .into_response();
            }
        }
    }

    if uploads.is_empty() {
        return Error::EmptyBatch.into_response();
    }

    info!(client = %client, files = uploads.len(), "upload started");

    let (workspace, outcomes) = match state.service.run_batch(&uploads).await {
        Ok(result) => result,
        Err(e) => {
            warn!(client = %client, error = %e, "batch rejected");
            return e.into_response();
        }
    };

    log_outcomes(&client, &outcomes);

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    let response = match assemble_response(&outcomes, &workspace, state.service.names()) {
        Ok(response) => response,
        // Workspace goes out of scope here, releasing every artifact
        Err(e) => return e.into_response(),
    };

    info!(
        client = %client,
        files = outcomes.len(),
        succeeded,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "upload finished"
    );

    match response {
        BatchResponse::Single {
            path,
            download_name,
        } => stream_file(workspace, &path, "audio/flac", &download_name).await,
        BatchResponse::Archive { path } => {
            stream_file(workspace, &path, "application/zip", ARCHIVE_DOWNLOAD_NAME).await
        }
    }
}

fn log_outcomes(client: &str, outcomes: &[ConversionOutcome]) {
    for outcome in outcomes {
        match (&outcome.output, &outcome.error) {
            (Some(output), _) => info!(
                client = %client,
                file = %outcome.file_name,
                size = outcome.size,
                output = %output.display(),
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "file result"
            ),
            (None, Some(error)) => warn!(
                client = %client,
                file = %outcome.file_name,
                size = outcome.size,
                error = %error,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "file result"
            ),
            (None, None) => {}
        }
    }
}

/// Stream a workspace file back to the client
///
/// The response body takes ownership of the workspace, so its scratch
/// directory is removed when the stream finishes or the client goes away,
/// not when the handler returns.
async fn stream_file(
    workspace: RequestWorkspace,
    path: &Path,
    content_type: &str,
    download_name: &str,
) -> Response {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) => return Error::Io(e).into_response(),
    };
    let content_length = file.metadata().await.ok().map(|meta| meta.len());

    let stream = WorkspaceStream {
        inner: ReaderStream::new(file),
        _workspace: workspace,
    };

    let mut response = Response::new(Body::from_stream(stream));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type).unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        content_disposition(download_name),
    );
    if let Some(len) = content_length {
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
    response
}

/// Attachment header for a download name, tolerating non-ASCII filenames
fn content_disposition(download_name: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("attachment; filename=\"{download_name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"converted.flac\""))
}

/// File stream that keeps the request workspace alive until the body is done
struct WorkspaceStream {
    inner: ReaderStream<tokio::fs::File>,
    _workspace: RequestWorkspace,
}

impl Stream for WorkspaceStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}
