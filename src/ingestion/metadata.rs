use crate::api::knowledge::models::{non_blank, UploadMetadata};
use crate::error::KnowledgeError;
use once_cell::sync::Lazy;
use regex::Regex;

/// 允许选择的客户列表。
pub const KNOWN_CLIENTS: &[&str] = &["GROUPE BEL", "HOMECARE"];

static IMMATRICULATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{2}-[A-Z0-9]{3}-[A-Z0-9]{2}$").expect("immatriculation pattern is valid")
});

pub fn is_valid_immatriculation(value: &str) -> bool {
    IMMATRICULATION_PATTERN.is_match(value)
}

/// 从文件夹名（或路径）中提取车牌号。
/// 依次尝试：完整名称、去掉扩展名后的名称、前三段以 `-` 连接的名称。
pub fn extract_immatriculation(name: &str) -> Option<String> {
    let name = name
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    if is_valid_immatriculation(name) {
        return Some(name.to_string());
    }

    if let Some((stem, _)) = name.rsplit_once('.') {
        if is_valid_immatriculation(stem) {
            return Some(stem.to_string());
        }
    }

    let parts: Vec<&str> = name.split('-').collect();
    if parts.len() >= 3 {
        let candidate = parts[..3].join("-");
        if is_valid_immatriculation(&candidate) {
            return Some(candidate);
        }
    }
    None
}

pub fn is_known_client(value: &str) -> bool {
    KNOWN_CLIENTS.contains(&value)
}

impl UploadMetadata {
    /// 根据推断出的文件夹名预填车牌号；无法提取时留空。
    pub fn prefilled(folder_name: Option<String>) -> Self {
        UploadMetadata {
            immatriculation: folder_name.as_deref().and_then(extract_immatriculation),
            client: None,
            folder_name,
        }
    }

    /// 应用用户编辑的字段：`None` 保持原值，空白字符串清空该字段；
    /// 任一取值非法时整体拒绝，不修改当前值。
    pub fn apply_edits(
        &mut self,
        immatriculation: Option<String>,
        client: Option<String>,
    ) -> Result<(), KnowledgeError> {
        let immatriculation = immatriculation.map(|value| non_blank(Some(value)));
        let client = client.map(|value| non_blank(Some(value)));

        if let Some(Some(value)) = immatriculation.as_ref() {
            if !is_valid_immatriculation(value) {
                return Err(KnowledgeError::InvalidMetadata(format!(
                    "immatriculation {value:?} must look like AB-123-CD"
                )));
            }
        }
        if let Some(Some(value)) = client.as_ref() {
            if !is_known_client(value) {
                return Err(KnowledgeError::InvalidMetadata(format!(
                    "unknown client {value:?}; expected one of {}",
                    KNOWN_CLIENTS.join(", ")
                )));
            }
        }

        if let Some(value) = immatriculation {
            self.immatriculation = value;
        }
        if let Some(value) = client {
            self.client = value;
        }
        Ok(())
    }
}
