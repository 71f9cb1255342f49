//! Gateway HTTP server.

use crate::channels::{verify_signature, InboundEvent, LineClient, LineWebhookBody, SignatureError};
use crate::config::{self, Config, WASTE_CATEGORIES};
use crate::llm::OpenAiClient;
use crate::pipeline::Pipeline;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;

const HOME_TEXT: &str = "✅ 垃圾分類機器人服務運行中！";
const TEST_TEXT: &str = "🔧 測試頁面 - 服務正常運作中";
const ACK_BODY: &str = "OK";
const SIGNATURE_HEADER: &str = "X-Line-Signature";
/// Extra time on top of the classify deadline for in-flight pipelines to push after shutdown.
const DRAIN_GRACE: Duration = Duration::from_secs(10);

/// Shared state for the gateway. Secret and pipeline are fixed at startup; `tasks` holds the
/// pipeline runs spawned by the webhook so shutdown can wait for them.
#[derive(Clone)]
pub struct GatewayState {
    pub channel_secret: Arc<str>,
    pub pipeline: Pipeline,
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl GatewayState {
    pub fn new(channel_secret: impl Into<String>, pipeline: Pipeline) -> Self {
        Self {
            channel_secret: Arc::from(channel_secret.into()),
            pipeline,
            tasks: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    fn spawn_tracked(&self, task: impl Future<Output = ()> + Send + 'static) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        // Reap finished runs so the set only holds live ones.
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    /// Wait up to `limit` for spawned pipeline runs, then abort the rest.
    /// Returns how many runs were aborted.
    pub async fn drain_tasks(&self, limit: Duration) -> usize {
        let mut tasks = {
            let mut guard = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        if tasks.is_empty() {
            return 0;
        }
        log::info!("waiting for {} pipeline task(s) to finish", tasks.len());
        let drained = tokio::time::timeout(limit, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_ok() {
            log::info!("pipeline tasks finished");
            return 0;
        }
        let aborted = tasks.len();
        log::warn!(
            "{} pipeline task(s) still running after {:?}; aborting",
            aborted,
            limit
        );
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        aborted
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("authentication failed: {0}")]
    Authentication(#[from] SignatureError),
    #[error("malformed webhook body: {0}")]
    MalformedBody(#[from] serde_json::Error),
}

/// Verify and parse a webhook body, spawning one tracked pipeline task per image message.
/// Returns the number of dispatched events; processing continues after this returns.
pub fn receive_callback(
    state: &GatewayState,
    raw_body: &[u8],
    signature: &str,
) -> Result<usize, CallbackError> {
    verify_signature(&state.channel_secret, raw_body, signature)?;
    let body: LineWebhookBody = serde_json::from_slice(raw_body)?;
    let mut dispatched = 0;
    for event in &body.events {
        let Some(inbound) = InboundEvent::from_line_event(event) else {
            log::debug!("ignoring {} event", event.typ);
            continue;
        };
        log::info!(
            "image message {} received (event {})",
            inbound.message_id,
            event.webhook_event_id.as_deref().unwrap_or("-")
        );
        let pipeline = state.pipeline.clone();
        state.spawn_tracked(async move {
            pipeline.run(&inbound).await;
        });
        dispatched += 1;
    }
    Ok(dispatched)
}

/// Routes for the webhook server.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/test", get(test_page))
        .route("/callback", post(callback))
        .with_state(state)
}

/// Build clients from config and serve until SIGINT/SIGTERM, then let in-flight pipelines finish.
pub async fn run_gateway(config: Config) -> Result<()> {
    let channel_secret = config::resolve_channel_secret(&config);
    if channel_secret == config::PLACEHOLDER_CHANNEL_SECRET {
        log::warn!("LINE_CHANNEL_SECRET not set; using placeholder secret");
    }
    let access_token = config::resolve_access_token(&config);
    if access_token == config::PLACEHOLDER_ACCESS_TOKEN {
        log::warn!("LINE_CHANNEL_ACCESS_TOKEN not set; using placeholder token");
    }
    let api_key = config::resolve_openai_api_key(&config)
        .context("OPENAI_API_KEY is not set (env or openai.apiKey in config)")?;

    let line = LineClient::new(
        access_token,
        config.line.api_base.clone(),
        config.line.data_api_base.clone(),
    );
    let classifier = OpenAiClient::new(
        config::resolve_openai_base_url(&config),
        api_key,
        config::resolve_openai_model(&config),
        &WASTE_CATEGORIES,
    )
    .with_max_tokens(config::resolve_max_tokens(&config))
    .with_timeout(config::resolve_classify_timeout(&config));
    let pipeline = Pipeline::new(Arc::new(line), Arc::new(classifier));
    let state = GatewayState::new(channel_secret, pipeline);
    let app = router(state.clone());

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    state
        .drain_tasks(config::resolve_classify_timeout(&config) + DRAIN_GRACE)
        .await;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / — liveness text.
async fn home() -> &'static str {
    HOME_TEXT
}

/// GET /test — diagnostic text.
async fn test_page() -> &'static str {
    TEST_TEXT
}

/// POST /callback — LINE webhook receiver.
async fn callback(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    log::info!("webhook request received");
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    match receive_callback(&state, &body, signature) {
        Ok(_) => (StatusCode::OK, ACK_BODY),
        Err(e) => {
            log::error!("rejecting webhook: {}", e);
            (StatusCode::BAD_REQUEST, "Bad Request")
        }
    }
}
