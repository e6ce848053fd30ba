use crate::api::WeChatApi;
use crate::error::{AppError, AppResult};
use crate::models::{DraftRecord, DraftRequest};
use std::sync::Arc;
use tracing::{debug, info};

/// Отправляет готовую статью в черновики, ровно один запрос без повторов
pub struct DraftSubmitter {
    api: Arc<dyn WeChatApi>,
}

impl DraftSubmitter {
    pub fn new(api: Arc<dyn WeChatApi>) -> Self {
        DraftSubmitter { api }
    }

    pub async fn submit(&self, token: &str, draft: DraftRecord) -> AppResult<String> {
        debug!(
            "Submitting draft \"{}\" ({} bytes of content, cover: {:?})",
            draft.title,
            draft.content.len(),
            draft.thumb_media_id
        );

        let request = DraftRequest {
            articles: vec![draft],
        };
        let response = self.api.add_draft(token, &request).await?;

        if let Some(message) = response.status.failure() {
            return Err(AppError::Draft(message));
        }

        let draft_id = response
            .media_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Draft("no media_id in response".to_string()))?;

        info!("Draft created: {}", draft_id);
        Ok(draft_id)
    }
}
