use crate::content::NodePath;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Запас до истечения токена
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 5 * 60;

/// Время жизни токена, если сервер его не указал
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 7200;

/// Максимальная длина анонса в символах
pub const DIGEST_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub app_id: String,
    pub app_secret: String,
    #[serde(default)]
    pub is_default: bool,
}

impl Account {
    pub fn has_credentials(&self) -> bool {
        !self.app_id.trim().is_empty() && !self.app_secret.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenState {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenState {
    /// None, если срок жизни не укладывается в диапазон дат
    pub fn issued_at(token: String, now: DateTime<Utc>, expires_in_secs: i64) -> Option<Self> {
        let expires_at = Duration::try_seconds(expires_in_secs)
            .and_then(|ttl| now.checked_add_signed(ttl))?;
        Some(TokenState { token, expires_at })
    }

    /// Токен годен, пока до истечения больше пяти минут
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .checked_sub_signed(Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS))
            .map(|deadline| now < deadline)
            .unwrap_or(false)
    }
}

/// Ссылка на изображение внутри дерева контента.
///
/// `<img>` без `src` тоже попадает в список, чтобы не сдвигать порядок
/// картинок и выбор обложки.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub source_locator: Option<String>,
    pub position: NodePath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub remote_media_id: String,
    pub remote_url: String,
}

/// Статья черновика в формате draft/add
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub title: String,
    pub author: String,
    pub digest: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_source_url: Option<String>,
    pub thumb_media_id: String,
    pub show_cover_pic: u8,
    pub need_open_comment: u8,
    pub only_fans_can_comment: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentPolicy {
    pub open: bool,
    pub fans_only: bool,
}

impl Default for CommentPolicy {
    fn default() -> Self {
        CommentPolicy {
            open: true,
            fans_only: false,
        }
    }
}

impl DraftRecord {
    pub fn new(
        title: String,
        author: String,
        flattened_text: &str,
        content: String,
        cover_media_id: Option<String>,
        content_source_url: Option<String>,
        comments: CommentPolicy,
    ) -> Self {
        let thumb_media_id = cover_media_id.unwrap_or_default();
        let show_cover_pic = u8::from(!thumb_media_id.is_empty());

        DraftRecord {
            title,
            author,
            digest: make_digest(flattened_text),
            content,
            content_source_url,
            thumb_media_id,
            show_cover_pic,
            need_open_comment: u8::from(comments.open),
            only_fans_can_comment: u8::from(comments.fans_only),
        }
    }
}

/// Первые сто символов текста, без попытки резюмировать
pub fn make_digest(text: &str) -> String {
    text.chars().take(DIGEST_MAX_CHARS).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRequest {
    pub articles: Vec<DraftRecord>,
}

/// Общие поля ответа: ненулевой errcode означает отказ
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub errcode: Option<i64>,
    #[serde(default)]
    pub errmsg: Option<String>,
}

impl ApiStatus {
    /// Возвращает текст ошибки, если сервис отказал
    pub fn failure(&self) -> Option<String> {
        match self.errcode {
            Some(code) if code != 0 => Some(format!(
                "{} (errcode: {})",
                self.errmsg.as_deref().unwrap_or("unknown error"),
                code
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
impl ApiStatus {
    pub fn ok() -> Self {
        ApiStatus::default()
    }

    pub fn failed(errcode: i64, errmsg: &str) -> Self {
        ApiStatus {
            errcode: Some(errcode),
            errmsg: Some(errmsg.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(flatten)]
    pub status: ApiStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaUploadResponse {
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
    #[serde(flatten)]
    pub status: ApiStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftCreateResponse {
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(flatten)]
    pub status: ApiStatus,
}

/// Скачанное изображение
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}
