//! An HTTP server that receives Telegram updates pushed to the webhook URL.
//!
//! Telegram redelivers an update until it gets a 2xx response, so a failed expense is answered
//! with a 500 and comes back later. Malformed bodies are answered with a 400, which Telegram does
//! not retry.

use crate::bot::{Handlers, Update};
use crate::error::Res;
use anyhow::{anyhow, Context};
use http_body_util::{BodyExt, Limited};
use hyper::body::{Body, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Telegram updates are small. Anything bigger is not from Telegram.
const MAX_BODY_BYTES: usize = 1024 * 1024;

struct Webhook {
    /// Updates are handled one at a time so that two expenses never race for the same row.
    handlers: Mutex<Handlers>,
    secret_token: Option<String>,
}

/// Serves the webhook on `listener` until Ctrl-C is pressed.
pub(crate) async fn serve(
    listener: TcpListener,
    handlers: Handlers,
    secret_token: Option<String>,
) -> Res<()> {
    let webhook = Arc::new(Webhook {
        handlers: Mutex::new(handlers),
        secret_token,
    });
    let addr = listener
        .local_addr()
        .context("Unable to get the listening address")?;
    info!("Listening for Telegram updates on {addr}, press Ctrl-C to stop");
    loop {
        let (stream, peer) = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Unable to accept a connection: {e}");
                    continue;
                }
            },
        };
        debug!("Connection from {peer}");
        let webhook = webhook.clone();
        let service = service_fn(move |req: Request<Incoming>| {
            let webhook = webhook.clone();
            async move { Ok::<_, Infallible>(webhook.handle(req).await) }
        });
        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                warn!("Webhook connection error: {e}");
            }
        });
    }
}

impl Webhook {
    async fn handle(&self, req: Request<Incoming>) -> Response<String> {
        let method = req.method().clone();
        let secret = req
            .headers()
            .get(SECRET_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if method != Method::POST {
            return respond(StatusCode::METHOD_NOT_ALLOWED, json!({"error": "Method not allowed"}));
        }
        let body = match read_body(req.into_body()).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Unable to read the webhook request: {e:#}");
                return respond(StatusCode::BAD_REQUEST, json!({"error": "Invalid request"}));
            }
        };
        self.respond_to(secret.as_deref(), &body).await
    }

    /// Handles the body of a `POST` with the secret token header, if there was one.
    async fn respond_to(&self, secret: Option<&str>, body: &[u8]) -> Response<String> {
        if let Some(expected) = &self.secret_token {
            if secret != Some(expected.as_str()) {
                warn!("Rejecting a webhook request with a missing or wrong secret token");
                return respond(StatusCode::UNAUTHORIZED, json!({"error": "Unauthorized"}));
            }
        }
        let update: Update = match serde_json::from_slice(body) {
            Ok(update) => update,
            Err(e) => {
                warn!("Invalid JSON in webhook request: {e}");
                return respond(StatusCode::BAD_REQUEST, json!({"error": "Invalid JSON"}));
            }
        };
        let mut handlers = self.handlers.lock().await;
        match handlers.process_update(&update).await {
            Ok(()) => {
                info!(update_id = update.update_id, "Processed update");
                respond(StatusCode::OK, json!({"status": "ok"}))
            }
            Err(e) => {
                error!(update_id = update.update_id, "Failed to process update: {e}");
                respond(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "Internal server error"}),
                )
            }
        }
    }
}

/// Reads the whole body, failing once it grows past `MAX_BODY_BYTES`.
async fn read_body<B>(body: B) -> Res<Vec<u8>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let collected = Limited::new(body, MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| anyhow!("Failed to read the request body: {e}"))?;
    Ok(collected.to_bytes().to_vec())
}

fn respond(status: StatusCode, body: serde_json::Value) -> Response<String> {
    let mut response = Response::new(body.to_string());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{grid, TestSheet, CURRENT_MONTH};
    use crate::ledger::Ledger;
    use crate::test::RecordingSender;
    use http_body_util::Full;

    fn webhook(sheet: TestSheet, secret_token: Option<&str>) -> (Webhook, RecordingSender) {
        let sender = RecordingSender::default();
        let handlers = Handlers::new(
            Ledger::new(Box::new(sheet)),
            Box::new(sender.clone()),
            "€",
        );
        let webhook = Webhook {
            handlers: Mutex::new(handlers),
            secret_token: secret_token.map(str::to_string),
        };
        (webhook, sender)
    }

    const UPDATE: &str =
        r#"{"update_id": 3, "message": {"message_id": 9, "chat": {"id": 42}, "text": "Lunch 2.95"}}"#;

    #[tokio::test]
    async fn test_ok() {
        let sheet = TestSheet::default();
        let (webhook, sender) = webhook(sheet.clone(), None);
        let response = webhook.respond_to(None, UPDATE.as_bytes()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), r#"{"status":"ok"}"#);
        assert_eq!(sender.messages().await.len(), 1);
        assert_eq!(sheet.rows(CURRENT_MONTH).await.unwrap()[7][0], "Lunch");
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let (webhook, sender) = webhook(TestSheet::default(), None);
        let response = webhook.respond_to(None, b"{not json").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.body(), r#"{"error":"Invalid JSON"}"#);
        assert!(sender.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_secret_token() {
        let (webhook, _) = webhook(TestSheet::default(), Some("s3cret"));
        let response = webhook.respond_to(None, UPDATE.as_bytes()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = webhook.respond_to(Some("wrong"), UPDATE.as_bytes()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = webhook.respond_to(Some("s3cret"), UPDATE.as_bytes()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_failed_append_is_a_server_error() {
        let sheet = TestSheet::new(vec![("Tab".to_string(), grid(&[&["Rent", "5"]]))]);
        let (webhook, sender) = webhook(sheet, None);
        let response = webhook.respond_to(None, UPDATE.as_bytes()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(sender.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_read_body() {
        let body = read_body(Full::new(UPDATE.as_bytes())).await.unwrap();
        assert_eq!(body, UPDATE.as_bytes());

        let too_big = vec![b' '; MAX_BODY_BYTES + 1];
        assert!(read_body(Full::new(too_big.as_slice())).await.is_err());
    }

    #[tokio::test]
    async fn test_update_without_message() {
        let (webhook, sender) = webhook(TestSheet::default(), None);
        let response = webhook
            .respond_to(None, br#"{"update_id": 4, "channel_post": {}}"#)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(sender.messages().await.is_empty());
    }
}
