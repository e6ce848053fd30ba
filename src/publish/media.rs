// publish/media.rs - загрузка изображений статьи в материалы аккаунта

use super::multipart::MultipartBuilder;
use super::notify::{Notice, Notifier};
use super::outcome::StageOutcome;
use crate::api::WeChatApi;
use crate::error::{AppError, AppResult};
use crate::models::{ImageReference, UploadResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use fancy_regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Имя поля, под которым add_material ждёт файл
const MEDIA_FIELD: &str = "media";
const FALLBACK_MIME: &str = "image/png";

/// Откуда берутся байты изображения
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Remote { url: String },
    Embedded { mime: String, data: Vec<u8> },
}

const DATA_URL_PATTERN: &str =
    r"(?s)^data:(?P<mime>[^;,]*)(?P<params>(?:;[^;,]*)*?)(?P<b64>;base64)?,(?P<payload>.*)$";

impl ImageSource {
    /// Определяет вид локатора: внешний URL или встроенные данные
    pub fn classify(locator: &str) -> AppResult<Self> {
        let locator = locator.trim();

        if locator.starts_with("http://") || locator.starts_with("https://") {
            return Ok(ImageSource::Remote {
                url: locator.to_string(),
            });
        }

        if locator.starts_with("data:") {
            return Self::decode_data_url(locator);
        }

        Err(AppError::UnsupportedFormat(format!(
            "expected an http(s) URL or a base64 data URL, got {}",
            preview(locator)
        )))
    }

    fn decode_data_url(locator: &str) -> AppResult<Self> {
        let re = Regex::new(DATA_URL_PATTERN)
            .map_err(|e| AppError::Custom(format!("data URL pattern: {e}")))?;
        let caps = re
            .captures(locator)
            .map_err(|e| AppError::UnsupportedFormat(format!("malformed data URL: {e}")))?
            .ok_or_else(|| AppError::UnsupportedFormat("malformed data URL".to_string()))?;

        if caps.name("b64").is_none() {
            return Err(AppError::UnsupportedFormat(
                "only base64 data URLs are supported".to_string(),
            ));
        }

        let mime = caps
            .name("mime")
            .map(|m| m.as_str().trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| FALLBACK_MIME.to_string());
        ensure_image_mime(&mime)?;

        let payload: String = caps
            .name("payload")
            .map(|m| m.as_str())
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();

        let data = STANDARD
            .decode(payload)
            .map_err(|e| AppError::UnsupportedFormat(format!("invalid base64 payload: {e}")))?;

        Ok(ImageSource::Embedded { mime, data })
    }
}

fn ensure_image_mime(mime: &str) -> AppResult<()> {
    if mime.starts_with("image/") {
        Ok(())
    } else {
        Err(AppError::UnsupportedFormat(format!("{mime} is not an image type")))
    }
}

/// MIME из заголовка ответа; без параметров, octet-stream считается картинкой
fn remote_mime(content_type: Option<&str>) -> AppResult<String> {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty() && m != "application/octet-stream")
        .unwrap_or_else(|| FALLBACK_MIME.to_string());
    ensure_image_mime(&mime)?;
    Ok(mime)
}

fn preview(locator: &str) -> String {
    let short: String = locator.chars().take(60).collect();
    if short.len() < locator.len() {
        format!("{short}...")
    } else {
        short
    }
}

/// Первое изображение уходит как обложка, остальные по номеру
pub fn upload_filename(index: usize) -> String {
    if index == 0 {
        "cover.png".to_string()
    } else {
        format!("image-{index}.png")
    }
}

/// Результат загрузки одной картинки из пакета
#[derive(Debug)]
pub struct ImageUpload {
    pub reference: ImageReference,
    pub outcome: StageOutcome<UploadResult>,
}

pub struct MediaUploader {
    api: Arc<dyn WeChatApi>,
    notifier: Arc<dyn Notifier>,
}

impl MediaUploader {
    pub fn new(api: Arc<dyn WeChatApi>, notifier: Arc<dyn Notifier>) -> Self {
        MediaUploader { api, notifier }
    }

    /// Загружает одно изображение
    pub async fn upload(&self, token: &str, image_source: &str, filename: &str) -> AppResult<UploadResult> {
        let (mime, data) = match ImageSource::classify(image_source)? {
            ImageSource::Remote { url } => {
                let fetched = self.api.fetch_image(&url).await?;
                (remote_mime(fetched.content_type.as_deref())?, fetched.data)
            }
            ImageSource::Embedded { mime, data } => (mime, data),
        };

        debug!("Uploading {} ({}, {} bytes)", filename, mime, data.len());

        let body = MultipartBuilder::new()
            .file(MEDIA_FIELD, filename, &mime, &data)
            .build();

        let response = self.api.upload_media(token, body).await?;

        if let Some(message) = response.status.failure() {
            return Err(AppError::Upload(message));
        }

        match (response.media_id, response.url) {
            (Some(remote_media_id), Some(remote_url))
                if !remote_media_id.is_empty() && !remote_url.is_empty() =>
            {
                info!("Uploaded {} as {}", filename, remote_media_id);
                Ok(UploadResult {
                    remote_media_id,
                    remote_url,
                })
            }
            _ => Err(AppError::Upload(
                "no media_id or url in response".to_string(),
            )),
        }
    }

    /// Загружает изображения строго по очереди в порядке документа.
    ///
    /// Ошибка отдельной картинки не прерывает пакет: она попадает в
    /// уведомления, а ссылка в документе остаётся прежней. Имя файла
    /// зависит от места картинки среди всех `<img>`, включая пустые.
    pub async fn upload_all(&self, token: &str, references: &[ImageReference]) -> Vec<ImageUpload> {
        let mut results = Vec::with_capacity(references.len());

        for (index, reference) in references.iter().enumerate() {
            let filename = upload_filename(index);
            let result = match reference.source_locator.as_deref() {
                Some(locator) => self.upload(token, locator, &filename).await,
                None => Err(AppError::UnsupportedFormat("image has no src".to_string())),
            };
            let outcome = StageOutcome::recoverable(result);

            if let StageOutcome::Recoverable(e) = &outcome {
                warn!(
                    "Image {} ({}) failed to upload: {}",
                    index + 1,
                    reference
                        .source_locator
                        .as_deref()
                        .map(preview)
                        .unwrap_or_else(|| "no src".to_string()),
                    e
                );
                self.notifier.notify(Notice::ImageFailed {
                    index,
                    message: e.to_string(),
                });
            }

            results.push(ImageUpload {
                reference: reference.clone(),
                outcome,
            });
        }

        let uploaded = results.iter().filter(|r| r.outcome.is_success()).count();
        if uploaded < references.len() {
            warn!(
                "{} of {} images kept their original links",
                references.len() - uploaded,
                references.len()
            );
        }

        results
    }
}
