pub mod wechat;

#[cfg(test)]
pub mod fake;

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{DraftCreateResponse, DraftRequest, FetchedImage, MediaUploadResponse, TokenResponse};
use crate::publish::multipart::MultipartBody;
use async_trait::async_trait;
use std::sync::Arc;

/// Транспортный интерфейс к API официального аккаунта.
///
/// Реализация только передаёт запросы: проверка errcode и политика
/// ошибок живут в компонентах конвейера.
#[async_trait]
pub trait WeChatApi: Send + Sync {
    /// Выпускает access_token по паре учётных данных
    async fn fetch_token(&self, app_id: &str, app_secret: &str) -> AppResult<TokenResponse>;

    /// Скачивает внешнее изображение
    async fn fetch_image(&self, url: &str) -> AppResult<FetchedImage>;

    /// Загружает изображение в постоянные материалы
    async fn upload_media(&self, token: &str, body: MultipartBody) -> AppResult<MediaUploadResponse>;

    /// Создаёт черновик
    async fn add_draft(&self, token: &str, request: &DraftRequest) -> AppResult<DraftCreateResponse>;
}

/// Фабрика для создания API клиента на основе конфигурации
pub fn create_api_client(config: &Config) -> AppResult<Arc<dyn WeChatApi>> {
    Ok(Arc::new(wechat::WeChatClient::new(
        &config.api_base,
        config.timeout_secs,
    )))
}
