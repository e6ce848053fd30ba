// api/fake.rs - подменный транспорт для тестов конвейера

use crate::error::{AppError, AppResult};
use crate::models::{
    ApiStatus, DraftCreateResponse, DraftRequest, FetchedImage, MediaUploadResponse, TokenResponse,
};
use crate::publish::multipart::MultipartBody;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Записывает все вызовы и отвечает по сценарию.
///
/// По умолчанию всё успешно: токен `token-N`, материалы `media-N`,
/// черновик `draft-1`.
#[derive(Default)]
pub struct FakeWeChatApi {
    pub token_calls: AtomicUsize,
    pub fetch_calls: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<MultipartBody>>,
    pub drafts: Mutex<Vec<DraftRequest>>,
    /// errcode для выдачи токена
    pub token_errcode: Option<i64>,
    /// Номера вызовов выдачи токена (с единицы), которые получат errcode
    pub failing_token_calls: HashSet<usize>,
    pub token_without_access_token: bool,
    pub expires_in: Option<i64>,
    /// Номера вызовов add_material, которые получат errcode
    pub failing_uploads: HashSet<usize>,
    /// URL, скачивание которых падает
    pub broken_urls: HashSet<String>,
    pub draft_errcode: Option<i64>,
    pub draft_without_media_id: bool,
}

impl FakeWeChatApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn drafts(&self) -> Vec<DraftRequest> {
        self.drafts.lock().unwrap().clone()
    }

    pub fn upload_text(&self, index: usize) -> String {
        String::from_utf8_lossy(self.uploads.lock().unwrap()[index].as_bytes()).into_owned()
    }
}

#[async_trait]
impl super::WeChatApi for FakeWeChatApi {
    async fn fetch_token(&self, _app_id: &str, _app_secret: &str) -> AppResult<TokenResponse> {
        let n = self.token_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let errcode = self
            .token_errcode
            .or_else(|| self.failing_token_calls.contains(&n).then_some(40001));
        if let Some(code) = errcode {
            return Ok(TokenResponse {
                status: ApiStatus::failed(code, "invalid credential"),
                ..Default::default()
            });
        }

        Ok(TokenResponse {
            access_token: (!self.token_without_access_token).then(|| format!("token-{n}")),
            expires_in: self.expires_in.or(Some(7200)),
            status: ApiStatus::ok(),
        })
    }

    async fn fetch_image(&self, url: &str) -> AppResult<FetchedImage> {
        self.fetch_calls.lock().unwrap().push(url.to_string());

        if self.broken_urls.contains(url) {
            return Err(AppError::Upload(format!("download of {url} returned HTTP 404")));
        }

        Ok(FetchedImage {
            data: b"\xff\xd8\xff\xe0jpeg".to_vec(),
            content_type: Some("image/jpeg; charset=binary".to_string()),
        })
    }

    async fn upload_media(&self, _token: &str, body: MultipartBody) -> AppResult<MediaUploadResponse> {
        let index = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(body);
            uploads.len() - 1
        };

        if self.failing_uploads.contains(&index) {
            return Ok(MediaUploadResponse {
                status: ApiStatus::failed(40005, "invalid file type"),
                ..Default::default()
            });
        }

        Ok(MediaUploadResponse {
            media_id: Some(format!("media-{index}")),
            url: Some(format!("https://mmbiz.qpic.cn/mmbiz/{index}")),
            media_type: Some("image".to_string()),
            status: ApiStatus::ok(),
        })
    }

    async fn add_draft(&self, _token: &str, request: &DraftRequest) -> AppResult<DraftCreateResponse> {
        self.drafts.lock().unwrap().push(request.clone());

        if let Some(code) = self.draft_errcode {
            return Ok(DraftCreateResponse {
                media_id: None,
                status: ApiStatus::failed(code, "invalid content"),
            });
        }

        Ok(DraftCreateResponse {
            media_id: (!self.draft_without_media_id).then(|| "draft-1".to_string()),
            status: ApiStatus {
                errcode: Some(0),
                errmsg: Some("ok".to_string()),
            },
        })
    }
}
