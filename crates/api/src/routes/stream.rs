//! WebSocket frame stream
//!
//! Each text message carries one base64 frame. The detection reply goes out
//! first; alerting and logging run afterwards on a separate task so a slow
//! provider never stalls the stream.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::pipeline::{self, AlertSubject, EncodedFrame};
use crate::routes::detect::{FrameDetection, FrameRequest};
use crate::SharedState;

/// Outcome of one stream message
#[derive(Debug, Default)]
pub struct StreamReply {
    /// Message to send back, if any
    pub message: Option<Value>,
    /// Alert and log task, resolving to whether the alert was sent
    pub record: Option<JoinHandle<bool>>,
}

/// Upgrade to a WebSocket
pub async fn ws_stream(ws: WebSocketUpgrade, State(state): State<SharedState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: SharedState) {
    info!("WebSocket stream connected");

    while let Some(msg) = socket.recv().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        };

        let reply = process_stream_message(&state, &text).await;
        if let Some(message) = reply.message {
            if socket.send(Message::Text(message.to_string())).await.is_err() {
                break;
            }
        }
    }

    info!("WebSocket stream closed");
}

/// Handle one text message from the stream.
///
/// Messages without a frame are ignored. Decode and model errors are
/// reported to the client as `{"error": ...}` and keep the stream open.
pub async fn process_stream_message(state: &SharedState, text: &str) -> StreamReply {
    let request: FrameRequest = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(e) => {
            return StreamReply {
                message: Some(json!({ "error": format!("invalid message: {}", e) })),
                record: None,
            }
        }
    };

    let Some(frame) = request.frame.filter(|f| !f.trim().is_empty()) else {
        debug!("Stream message without frame ignored");
        return StreamReply::default();
    };

    let objects = match pipeline::run_detection(state, EncodedFrame::Base64(frame)).await {
        Ok(objects) => objects,
        Err(e) => {
            return StreamReply {
                message: Some(json!({ "error": e.to_string() })),
                record: None,
            }
        }
    };

    let timestamp = pipeline::now_timestamp();
    let detections: Vec<FrameDetection> = objects.iter().map(FrameDetection::from).collect();
    let message = json!({
        "detected": !detections.is_empty(),
        "detections": detections,
        "timestamp": timestamp,
    });

    let record = AlertSubject::first(&objects).map(|subject| {
        let state = state.clone();
        let count = objects.len();
        let alert_config = request.alert_config;
        tokio::spawn(async move {
            pipeline::record_detection(
                &state,
                &subject,
                count,
                &timestamp,
                alert_config.as_ref(),
                "stream",
            )
            .await
        })
    });

    StreamReply {
        message: Some(message),
        record,
    }
}
