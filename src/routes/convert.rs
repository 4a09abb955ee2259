//! Routes of the conversion front end.

use crate::artifact_store::content_type_for;
use crate::callback::CallbackPayload;
use crate::error::RelayError;
use crate::instructions::{instruction_list, InstructionPage};
use crate::pipeline::UploadedFile;
use crate::relay::ConvertRelay;
use crate::websocket::handle_ws_connection;
use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection, ws::WebSocketUpgrade, DefaultBodyLimit, Form, Multipart,
        Path, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// State shared across conversion handlers.
#[derive(Clone)]
pub struct ConvertState {
    pub relay: ConvertRelay,
    pub page: Arc<InstructionPage>,
}

pub fn router(state: ConvertState, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(instruction_page).post(instruction_page))
        .route("/convert", get(instruction_page).post(instruction_page))
        .route("/upload", post(upload))
        .route("/callback", post(callback))
        .route("/download/:filename", get(download))
        .route("/ws", get(ws_handler))
        .route("/health", get(super::health))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024)) // 100MB
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(serde::Deserialize)]
struct PickerForm {
    instructions: Option<String>,
}

/// Render the picker; a posted instruction joins the list for this response.
async fn instruction_page(
    State(state): State<ConvertState>,
    form: Option<Form<PickerForm>>,
) -> Result<Html<String>, RelayError> {
    let posted = form.and_then(|Form(f)| f.instructions);
    let instructions = instruction_list(posted.as_deref());
    state
        .page
        .render(&instructions)
        .map(Html)
        .map_err(|e| {
            error!("{:#}", e);
            RelayError::Render(e.to_string())
        })
}

/// Forward an uploaded file and instruction to the pipeline.
async fn upload(
    State(state): State<ConvertState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, RelayError> {
    // Anything that is not multipart cannot carry a file.
    let mut multipart = multipart.map_err(|_| RelayError::MissingFile)?;

    let mut file = None;
    let mut instruction = None;
    let mut uuid = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RelayError::Multipart(e.to_string()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(String::from);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| RelayError::Multipart(format!("Failed to read file: {}", e)))?;
                file = Some(UploadedFile {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            Some("instructions") => {
                instruction = Some(field_text(field).await?);
            }
            Some("uuid") => {
                uuid = Some(field_text(field).await?);
            }
            _ => {}
        }
    }

    let message = state
        .relay
        .relay_upload(file, instruction.as_deref(), uuid.as_deref())
        .await?;
    Ok(Json(json!({"status": "success", "message": message})))
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, RelayError> {
    field
        .text()
        .await
        .map_err(|e| RelayError::Multipart(e.to_string()))
}

/// Receive a job notification from the pipeline.
async fn callback(
    State(state): State<ConvertState>,
    body: Bytes,
) -> Result<Json<Value>, RelayError> {
    let data: Value = serde_json::from_slice(&body).unwrap_or_else(|e| {
        warn!("Callback body is not JSON ({}), using defaults", e);
        Value::Null
    });
    info!("Callback payload: {}", data);

    let payload = CallbackPayload::from_value(&data);
    info!("uuid: {}", payload.recipient);
    state.relay.handle_callback(payload).await?;
    Ok(Json(json!({"status": "success"})))
}

/// Serve a downloaded artifact as an attachment.
async fn download(
    State(state): State<ConvertState>,
    Path(filename): Path<String>,
) -> Result<Response, StatusCode> {
    let data = match state.relay.store().read(&filename).await {
        Ok(Some(data)) => data,
        Ok(None) => return Err(StatusCode::NOT_FOUND),
        Err(e) => {
            warn!("Cannot serve {:?}: {:#}", filename, e);
            return Err(StatusCode::NOT_FOUND);
        }
    };

    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&filename).to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ConvertState>) -> impl IntoResponse {
    let registry = state.relay.registry().clone();
    ws.on_upgrade(move |socket| handle_ws_connection(socket, registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ServerMessage, Status};
    use crate::relay::tests::{test_config, test_relay};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use futures::{SinkExt, StreamExt};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(download_dir: &std::path::Path) -> (Router, ConvertRelay) {
        let relay = test_relay(test_config("http://127.0.0.1:9", download_dir));
        let state = ConvertState {
            relay: relay.clone(),
            page: Arc::new(InstructionPage::new().unwrap()),
        };
        (router(state, &["http://localhost:5000".to_string()]), relay)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_page_includes_posted_instruction() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(dir.path());

        let response = app
            .oneshot(
                Request::post("/convert")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("instructions=Make+it+sparkle"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Make it sparkle"));
    }

    #[tokio::test]
    async fn test_upload_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(dir.path());

        let boundary = "XBOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"instructions\"\r\n\r\nConvert to grayscale\r\n--{b}--\r\n",
            b = boundary
        );
        let response = app
            .oneshot(
                Request::post("/upload")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={}", boundary),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"status": "error", "message": "No file received"})
        );
    }

    #[tokio::test]
    async fn test_callback_notifies_session() {
        let dir = tempfile::tempdir().unwrap();
        let (app, relay) = app(dir.path());
        let mut session = relay.registry().register("abc");

        let response = app
            .oneshot(
                Request::post("/callback")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"pipeline_message": "Done!", "user_document": {"uuid": "abc"}}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await, json!({"status": "success"}));

        let frame = serde_json::to_value(session.try_recv().unwrap()).unwrap();
        assert_eq!(
            frame,
            json!({"status": "success", "message": "Done!", "convert_uri": "", "filename": ""})
        );
    }

    #[tokio::test]
    async fn test_callback_garbage_body_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let (app, relay) = app(dir.path());
        let mut anonymous = relay.registry().register("anonymous");

        let response = app
            .oneshot(Request::post("/callback").body(Body::from("not json")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(anonymous.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_download_serves_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let (app, relay) = app(dir.path());
        relay.store().save("clip.gif", b"GIF89a").await.unwrap();

        let response = app
            .clone()
            .oneshot(Request::get("/download/clip.gif").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/gif");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"clip.gif\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"GIF89a");

        let missing = app
            .oneshot(Request::get("/download/nope.gif").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_websocket_session_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let (app, relay) = app(dir.path());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
            .await
            .unwrap();

        let hello = ws.next().await.unwrap().unwrap();
        let hello: Value = serde_json::from_str(hello.to_text().unwrap()).unwrap();
        let uuid = hello["uuid"].as_str().unwrap().to_string();
        assert_eq!(uuid.len(), 36);
        assert_eq!(relay.registry().len(), 1);

        let delivered = relay
            .registry()
            .deliver(ServerMessage::relay(Status::Success, "hi"), Some(uuid.as_str()));
        assert_eq!(delivered, 1);
        let frame = ws.next().await.unwrap().unwrap();
        let frame: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        assert_eq!(frame, json!({"status": "success", "message": "hi"}));

        ws.close(None).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !relay.registry().is_empty() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("session should be unregistered after close");
    }
}
