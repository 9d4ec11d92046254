use crate::settings::api_base_url::{
    get_api_base_url as core_get_api_base_url, set_api_base_url as core_set_api_base_url,
};

#[flutter_rust_bridge::frb]
pub fn get_api_base_url() -> Result<String, String> {
    core_get_api_base_url().map_err(|e| e.to_string())
}

/// FRB 对外接口：保存后端地址，之后的请求立即使用新地址。
#[flutter_rust_bridge::frb]
pub fn set_api_base_url(url: String) -> Result<String, String> {
    core_set_api_base_url(&url).map_err(|e| e.to_string())
}
