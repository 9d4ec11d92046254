use crate::db;
use crate::error::KnowledgeError;
use url::Url;

const BASE_URL_KEY: &str = "api_base_url";
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/knowledge";

/// 读取知识库后端地址；未设置时返回默认值。
pub fn get_api_base_url() -> Result<String, KnowledgeError> {
    if let Some(value) = db::get_setting(BASE_URL_KEY)? {
        return normalize_base_url(&value);
    }
    Ok(default_api_base_url())
}

/// 校验并保存后端地址，返回规范化后的值。
pub fn set_api_base_url(raw: &str) -> Result<String, KnowledgeError> {
    let normalized = normalize_base_url(raw)?;
    db::set_setting(BASE_URL_KEY, &normalized)?;
    Ok(normalized)
}

pub fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

/// 去掉首尾空白与末尾 `/`，并要求是 http/https 地址。
pub(crate) fn normalize_base_url(raw: &str) -> Result<String, KnowledgeError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(KnowledgeError::Config(
            "api base url cannot be empty".to_string(),
        ));
    }
    let parsed = Url::parse(trimmed).map_err(|e| {
        KnowledgeError::Config(format!("invalid api base url {trimmed:?}: {e}"))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(KnowledgeError::Config(format!(
            "unsupported url scheme {other:?}; expected http or https"
        ))),
    }
}
