use super::{
    client::{build_blocking_client, current_base_url, endpoint_url, SHORT_TIMEOUT},
    HEALTH_PATH,
};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// 检查知识库后端是否可用。网络不可达视为正常的离线状态，返回 false 而不是错误。
#[flutter_rust_bridge::frb]
pub fn check_backend_health() -> bool {
    let Ok(base_url) = current_base_url() else {
        return false;
    };
    is_healthy(&base_url)
}

fn is_healthy(base_url: &str) -> bool {
    let Ok(url) = endpoint_url(base_url, HEALTH_PATH, &[]) else {
        return false;
    };
    let Ok(client) = build_blocking_client(SHORT_TIMEOUT) else {
        return false;
    };
    match client.get(url).send() {
        Ok(response) if response.status().is_success() => response
            .json::<HealthResponse>()
            .map(|body| body.status == "healthy")
            .unwrap_or(false),
        Ok(response) => {
            debug!(target: "kb_ingest::health", status = %response.status(), "backend reported unhealthy");
            false
        }
        Err(err) => {
            debug!(target: "kb_ingest::health", error = %err, "backend unreachable");
            false
        }
    }
}
