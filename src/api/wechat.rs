use crate::error::{AppError, AppResult};
use crate::models::{DraftCreateResponse, DraftRequest, FetchedImage, MediaUploadResponse, TokenResponse};
use crate::publish::multipart::MultipartBody;
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info};

const USER_AGENT: &str = "mppub/0.1";

/// Тип материала, который принимает add_material
const MEDIA_TYPE_IMAGE: &str = "image";

pub struct WeChatClient {
    http_client: Client,
    base_url: String,
}

impl WeChatClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        WeChatClient {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport_error(action: &str, e: reqwest::Error) -> AppError {
        // URL содержит access_token, в логи он попадать не должен
        let e = e.without_url();
        error!("Failed to {}: {}", action, e);
        if e.is_timeout() {
            AppError::Timeout
        } else {
            AppError::NetworkError(e)
        }
    }

    /// Сервис отвечает 200 даже при отказе, так что статус проверяется
    /// отдельно от errcode в теле
    async fn read_json<T: DeserializeOwned>(action: &str, response: Response) -> AppResult<T> {
        if !response.status().is_success() {
            error!("{} returned status: {}", action, response.status());
            return Err(AppError::ApiError(format!(
                "{} returned HTTP {}",
                action,
                response.status()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Self::transport_error(action, e))?;

        serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse {} response: {}", action, e);
            AppError::JsonError(e)
        })
    }
}

#[async_trait]
impl super::WeChatApi for WeChatClient {
    async fn fetch_token(&self, app_id: &str, app_secret: &str) -> AppResult<TokenResponse> {
        debug!(
            "Requesting access token: {}?grant_type=client_credential&appid={}&secret=***",
            self.endpoint("/cgi-bin/token"),
            app_id
        );

        let response = self
            .http_client
            .get(self.endpoint("/cgi-bin/token"))
            .query(&[
                ("grant_type", "client_credential"),
                ("appid", app_id),
                ("secret", app_secret),
            ])
            .send()
            .await
            .map_err(|e| Self::transport_error("request access token", e))?;

        Self::read_json("token", response).await
    }

    async fn fetch_image(&self, url: &str) -> AppResult<FetchedImage> {
        debug!("Downloading remote image: {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::transport_error("download image", e))?;

        if !response.status().is_success() {
            error!("Image download returned status: {}", response.status());
            return Err(AppError::Upload(format!(
                "download of {} returned HTTP {}",
                url,
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let data = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error("read image body", e))?;

        debug!(
            "Downloaded {} bytes ({})",
            data.len(),
            content_type.as_deref().unwrap_or("no content-type")
        );

        Ok(FetchedImage {
            data: data.to_vec(),
            content_type,
        })
    }

    async fn upload_media(&self, token: &str, body: MultipartBody) -> AppResult<MediaUploadResponse> {
        debug!(
            "Uploading media: {} bytes, boundary {}",
            body.content_length(),
            body.boundary()
        );

        let content_type = body.content_type();
        let content_length = body.content_length();

        let response = self
            .http_client
            .post(self.endpoint("/cgi-bin/material/add_material"))
            .query(&[("access_token", token), ("type", MEDIA_TYPE_IMAGE)])
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, content_length)
            .body(body.into_bytes())
            .send()
            .await
            .map_err(|e| Self::transport_error("upload media", e))?;

        let result: MediaUploadResponse = Self::read_json("add_material", response).await?;
        info!("add_material responded (media_id: {:?})", result.media_id);
        Ok(result)
    }

    async fn add_draft(&self, token: &str, request: &DraftRequest) -> AppResult<DraftCreateResponse> {
        debug!(
            "Creating draft with {} article(s)",
            request.articles.len()
        );

        let response = self
            .http_client
            .post(self.endpoint("/cgi-bin/draft/add"))
            .query(&[("access_token", token)])
            .json(request)
            .send()
            .await
            .map_err(|e| Self::transport_error("create draft", e))?;

        Self::read_json("draft/add", response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = WeChatClient::new("https://api.weixin.qq.com/", 5);
        assert_eq!(
            client.endpoint("/cgi-bin/token"),
            "https://api.weixin.qq.com/cgi-bin/token"
        );
    }
}
