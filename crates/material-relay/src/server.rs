//! HTTP server for relay endpoints
//!
//! Provides /health, /r, /upload-and-generate-qr (alias /upload-and-link),
//! /upload-and-redirect, /generate-qr, /material/{id} and /jump/{id}.

use crate::error::{RelayError, Result};
use crate::fetch::SourceFetcher;
use crate::links::data_url;
use crate::pages::{self, HandoffPage, PublishPage};
use crate::publish::{MaterialUpload, PublishMode, Publisher};
use crate::qr::{self, DEFAULT_QR_SIZE};
use crate::types::{
    FileInfo, HealthResponse, QrQuery, QrResponse, RedirectQuery, UploadLinkResponse,
};
use ark_client::MaterialType;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Largest accepted material
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const DEFAULT_FETCH_NAME: &str = "Web upload";
const DEFAULT_UPLOAD_NAME: &str = "Uploaded image";
const DEFAULT_LOCAL_NAME: &str = "Local upload";

/// Shared state for the HTTP server
pub struct ServerState {
    pub publisher: Publisher,
    pub fetcher: SourceFetcher,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(publisher: Publisher, fetcher: SourceFetcher) -> Self {
        Self {
            publisher,
            fetcher,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/r", get(fetch_and_publish))
        .route("/upload-and-generate-qr", post(upload_and_link))
        .route("/upload-and-link", post(upload_and_link))
        .route("/upload-and-redirect", post(upload_and_redirect))
        .route("/generate-qr", get(generate_qr))
        .route("/material/{id}", get(get_material))
        .route("/jump/{id}", get(jump))
        // Room for multipart framing around a maximum-size file
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let cache_stats = state.publisher.cache().stats().await;
    // Clamped in case the wall clock steps backwards
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0) as u64;
    let mode = if state.publisher.has_credentials() {
        PublishMode::Upstream
    } else {
        PublishMode::Demo
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        mode,
        cache: cache_stats,
    })
}

/// Fetch an image by URL, upload it for real, and hand off to the app
async fn fetch_and_publish(
    State(state): State<SharedState>,
    Query(query): Query<RedirectQuery>,
) -> Result<Html<String>> {
    let img = non_empty(query.img)
        .ok_or_else(|| RelayError::BadRequest("Missing parameter: img".to_string()))?;
    let name = non_empty(query.name).unwrap_or_else(|| DEFAULT_FETCH_NAME.to_string());
    let declared_type = match non_empty(query.material_type) {
        Some(t) => Some(
            MaterialType::parse(&t)
                .ok_or_else(|| RelayError::BadRequest(format!("Unsupported type: {}", t)))?,
        ),
        None => None,
    };

    if !state.publisher.has_credentials() {
        return Err(RelayError::Config(
            "XHS_APP_ID or XHS_APP_SECRET is not configured".to_string(),
        ));
    }

    let (bytes, content_type) = state.fetcher.fetch(&img).await?;
    let material_type = declared_type.unwrap_or_else(|| MaterialType::from_mime(&content_type));

    let published = state.publisher.upload(&name, material_type, &bytes).await?;
    info!(
        name = %name,
        material_type = %published.material_type,
        material_id = published.material_id.as_deref().unwrap_or(""),
        "Published fetched material"
    );

    let links = state.publisher.links();
    Ok(Html(pages::publish_page(&PublishPage {
        display_name: &name,
        material_url: &published.material_url,
        material_id: published.material_id.as_deref().unwrap_or(""),
        deep_link: &published.deep_link,
        fallback_store_url: &links.fallback_store_url,
    })))
}

/// Upload a file and return its deep link, falling back to the cache
async fn upload_and_link(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<UploadLinkResponse>> {
    let upload = read_upload(multipart, DEFAULT_UPLOAD_NAME).await?;
    info!(
        original_name = %upload.original_name,
        size = upload.size(),
        material_type = %upload.material_type(),
        "Received upload"
    );

    let file_info = FileInfo::from(&upload);
    let published = state.publisher.upload_and_link(upload).await;
    info!(
        mode = ?published.mode,
        material_type = %published.material_type,
        material_url = %published.material_url,
        "Material linked"
    );

    let jump_url = match (&published.mode, &published.material_id) {
        (PublishMode::Upstream, _) | (_, None) => None,
        (_, Some(id)) => Some(state.publisher.links().jump_url(id)),
    };

    let qr_code = match qr::qr_data_url(&published.deep_link, DEFAULT_QR_SIZE) {
        Ok(qr_code) => Some(qr_code),
        Err(e) => {
            warn!(error = %e, "Could not render QR code for deep link");
            None
        }
    };

    Ok(Json(UploadLinkResponse::new(file_info, published, jump_url, qr_code)))
}

/// Render any URL as a QR code
async fn generate_qr(Query(query): Query<QrQuery>) -> Result<Json<QrResponse>> {
    let url = non_empty(query.url)
        .ok_or_else(|| RelayError::BadRequest("Missing parameter: url".to_string()))?;
    let size = qr::parse_size(query.size.as_deref())?;

    let qr_code = qr::qr_data_url(&url, size)?;
    Ok(Json(QrResponse {
        success: true,
        qr_code,
        url,
    }))
}

/// Hand a local file straight to the app as an inline data URL
async fn upload_and_redirect(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Html<String>> {
    let upload = read_upload(multipart, DEFAULT_LOCAL_NAME).await?;
    info!(
        original_name = %upload.original_name,
        mime_type = %upload.mime_type,
        size = upload.size(),
        "Local upload hand-off"
    );

    let inline_url = data_url(&upload.mime_type, &upload.bytes);
    let local_id = format!("local_{}", Utc::now().timestamp_millis());
    let links = state.publisher.links();
    let deep_link = links.deep_link(&inline_url, &local_id);

    Ok(Html(pages::handoff_page(&HandoffPage {
        title: "Ready to publish",
        display_name: &upload.display_name,
        original_name: &upload.original_name,
        mime_type: &upload.mime_type,
        size: upload.size(),
        deep_link: &deep_link,
        preview_url: is_image(&upload.mime_type).then_some(inline_url.as_str()),
        fallback_store_url: &links.fallback_store_url,
        note: "Demo mode: the file travels inside the link. Configure API credentials for real uploads.",
    })))
}

/// Serve a cached material once
async fn get_material(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let entry = state.publisher.cache().take(&id).await.map_err(|e| {
        warn!(id = %id, "Cached material not found");
        RelayError::from(e)
    })?;

    let content_type = HeaderValue::from_str(&entry.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&entry.original_name),
        )
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(entry.bytes))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}

/// QR landing page: claim a cached material and deep-link with it inline
async fn jump(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let entry = match state.publisher.cache().take(&id).await {
        Ok(entry) => entry,
        Err(_) => {
            warn!(id = %id, "Jump link expired or invalid");
            return (StatusCode::NOT_FOUND, Html(pages::expired_page())).into_response();
        }
    };

    info!(
        id = %id,
        original_name = %entry.original_name,
        size = entry.size_bytes,
        "Jump link claimed"
    );

    let inline_url = data_url(&entry.mime_type, &entry.bytes);
    let links = state.publisher.links();
    let deep_link = links.deep_link(&inline_url, &id);

    Html(pages::handoff_page(&HandoffPage {
        title: "Scan successful",
        display_name: &entry.display_name,
        original_name: &entry.original_name,
        mime_type: &entry.mime_type,
        size: entry.size_bytes,
        deep_link: &deep_link,
        preview_url: is_image(&entry.mime_type).then_some(inline_url.as_str()),
        fallback_store_url: &links.fallback_store_url,
        note: "The file was processed in demo mode. Configure API credentials for real uploads.",
    }))
    .into_response()
}

/// Read the `file` and optional `name` fields of a multipart upload
async fn read_upload(mut multipart: Multipart, default_name: &str) -> Result<MaterialUpload> {
    let mut file: Option<(Vec<u8>, String, String)> = None;
    let mut name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RelayError::BadRequest(e.to_string()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| RelayError::BadRequest(e.to_string()))?;
                file = Some((bytes.to_vec(), mime_type, original_name));
            }
            "name" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| RelayError::BadRequest(e.to_string()))?;
                name = Some(text);
            }
            _ => {}
        }
    }

    let (bytes, mime_type, original_name) =
        file.ok_or_else(|| RelayError::BadRequest("No file uploaded".to_string()))?;

    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(RelayError::BadRequest(format!(
            "File exceeds the {} MB limit",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }

    let display_name = non_empty(name)
        .or_else(|| non_empty(Some(original_name.clone())))
        .unwrap_or_else(|| default_name.to_string());

    Ok(MaterialUpload {
        bytes,
        mime_type,
        original_name,
        display_name,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_image(mime_type: &str) -> bool {
    mime_type.to_ascii_lowercase().starts_with("image/")
}

/// `inline` disposition with an ASCII fallback and an RFC 5987 UTF-8 name
fn content_disposition(original_name: &str) -> HeaderValue {
    let ascii: String = original_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let value = format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(original_name)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("inline"))
}
