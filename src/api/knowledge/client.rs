use crate::error::KnowledgeError;
use crate::settings;
use reqwest::{
    blocking::{Client, Response},
    redirect::Policy,
    StatusCode,
};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub(crate) const SHORT_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// 当前配置的后端地址，已规范化（无末尾 `/`）。
pub(crate) fn current_base_url() -> Result<String, KnowledgeError> {
    settings::get_api_base_url()
}

/// 构建带统一超时与重定向策略的阻塞式 HTTP 客户端。
pub(crate) fn build_blocking_client(timeout: Duration) -> Result<Client, KnowledgeError> {
    Client::builder()
        .timeout(timeout)
        .redirect(Policy::limited(10))
        .build()
        .map_err(|e| KnowledgeError::Http(format!("failed to build HTTP client: {e}")))
}

/// 在基础地址后拼接路径，并只附加有值的查询参数。
pub(crate) fn endpoint_url(
    base_url: &str,
    path: &str,
    query: &[(&str, Option<&str>)],
) -> Result<Url, KnowledgeError> {
    let raw = format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'));
    let mut url = Url::parse(&raw)
        .map_err(|e| KnowledgeError::Http(format!("invalid endpoint url {raw:?}: {e}")))?;
    let present: Vec<(&str, &str)> = query
        .iter()
        .filter_map(|(key, value)| value.map(|v| (*key, v)))
        .collect();
    if !present.is_empty() {
        url.query_pairs_mut().extend_pairs(present);
    }
    Ok(url)
}

/// FastAPI 风格的错误响应：`detail` 可能是字符串，也可能是校验错误列表。
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message(String),
    Validation(Vec<ValidationItem>),
}

#[derive(Debug, Deserialize)]
struct ValidationItem {
    msg: String,
}

/// 将非 2xx 响应体转换为可读信息；结构不符时回退为带状态码的通用提示。
pub(crate) fn describe_error_body(status: StatusCode, body: &str) -> String {
    let fallback = || format!("server returned HTTP {status}");
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: ErrorDetail::Message(message),
        }) if !message.trim().is_empty() => message,
        Ok(ErrorBody {
            detail: ErrorDetail::Validation(items),
        }) if !items.is_empty() => items
            .into_iter()
            .map(|item| item.msg)
            .collect::<Vec<_>>()
            .join("; "),
        _ => fallback(),
    }
}

/// 读取失败响应的正文并给出描述；正文不可读时同样回退为通用提示。
pub(crate) fn read_error_response(response: Response) -> String {
    let status = response.status();
    match response.text() {
        Ok(body) => describe_error_body(status, &body),
        Err(_) => format!("server returned HTTP {status}"),
    }
}
