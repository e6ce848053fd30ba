// publish/orchestrator.rs - полный цикл публикации статьи в черновики

use super::draft::DraftSubmitter;
use super::media::{ImageUpload, MediaUploader};
use super::notify::{Notice, Notifier};
use super::outcome::StageOutcome;
use super::token::TokenManager;
use crate::api::WeChatApi;
use crate::content::{sanitize, ContentNode};
use crate::error::{AppError, AppResult};
use crate::models::{Account, CommentPolicy, DraftRecord};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Автор по умолчанию, если вызывающий его не указал
pub const DEFAULT_AUTHOR: &str = "Anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Idle,
    Authenticating,
    ExtractingImages,
    UploadingImages,
    Sanitizing,
    Submitting,
    Done,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub author: Option<String>,
    pub content_source_url: Option<String>,
    pub comments: CommentPolicy,
}

#[derive(Debug)]
pub struct PublishReport {
    pub draft_id: String,
    pub cover_media_id: Option<String>,
    pub images: Vec<ImageUpload>,
}

/// Текущая стадия одного вызова публикации
struct PublishRun<'a> {
    state: PublishState,
    notifier: &'a dyn Notifier,
}

impl<'a> PublishRun<'a> {
    fn new(notifier: &'a dyn Notifier) -> Self {
        PublishRun {
            state: PublishState::Idle,
            notifier,
        }
    }

    fn enter(&mut self, state: PublishState) {
        debug!("Publish: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.notifier.notify(Notice::StateChanged(state));
    }

    fn fail(&mut self, e: AppError) -> AppError {
        error!("Publish failed during {:?}: {}", self.state, e);
        self.enter(PublishState::Failed);
        self.notifier.notify(Notice::Failed {
            message: e.to_string(),
        });
        e
    }
}

pub struct PublishOrchestrator {
    tokens: Arc<TokenManager>,
    uploader: MediaUploader,
    submitter: DraftSubmitter,
    notifier: Arc<dyn Notifier>,
    options: PublishOptions,
}

impl PublishOrchestrator {
    pub fn new(
        api: Arc<dyn WeChatApi>,
        tokens: Arc<TokenManager>,
        notifier: Arc<dyn Notifier>,
        options: PublishOptions,
    ) -> Self {
        PublishOrchestrator {
            tokens,
            uploader: MediaUploader::new(Arc::clone(&api), Arc::clone(&notifier)),
            submitter: DraftSubmitter::new(api),
            notifier,
            options,
        }
    }

    /// Публикует статью и возвращает id черновика
    pub async fn publish(
        &self,
        content: &mut ContentNode,
        title: &str,
        account: Option<&Account>,
    ) -> AppResult<String> {
        self.publish_with_report(content, title, account)
            .await
            .map(|report| report.draft_id)
    }

    /// То же, что [`publish`](Self::publish), но с результатами по каждой картинке.
    ///
    /// Успешно загруженные изображения переписываются прямо в `content`,
    /// упавшие сохраняют исходный `src`.
    pub async fn publish_with_report(
        &self,
        content: &mut ContentNode,
        title: &str,
        account: Option<&Account>,
    ) -> AppResult<PublishReport> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("article title is empty".to_string()));
        }
        let account =
            account.ok_or_else(|| AppError::Validation("no account selected".to_string()))?;

        info!("Publishing \"{}\" to account {}", title, account.name);
        let mut run = PublishRun::new(self.notifier.as_ref());

        run.enter(PublishState::Authenticating);
        let token = match StageOutcome::classify(self.tokens.get_token(account).await) {
            StageOutcome::Success(token) => token,
            StageOutcome::Recoverable(e) | StageOutcome::Fatal(e) => return Err(run.fail(e)),
        };

        run.enter(PublishState::ExtractingImages);
        let references = content.find_images();
        debug!("Found {} image(s) in content", references.len());

        run.enter(PublishState::UploadingImages);
        let images = if references.is_empty() {
            Vec::new()
        } else {
            self.notifier.notify(Notice::UploadingImages {
                count: references.len(),
            });
            self.uploader.upload_all(&token, &references).await
        };

        // обложка только из первого изображения, без поиска замены
        let cover_media_id = images
            .first()
            .and_then(|upload| upload.outcome.success())
            .map(|result| result.remote_media_id.clone());

        let mut uploaded = 0;
        for upload in &images {
            if let Some(result) = upload.outcome.success() {
                content.set_image_source(&upload.reference.position, &result.remote_url);
                uploaded += 1;
            }
        }
        if !images.is_empty() {
            self.notifier.notify(Notice::ImagesUploaded {
                uploaded,
                total: images.len(),
            });
        }

        run.enter(PublishState::Sanitizing);
        let html = sanitize(content);
        let draft = DraftRecord::new(
            title.to_string(),
            self.options
                .author
                .clone()
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            &content.flatten_text(),
            html,
            cover_media_id.clone(),
            self.options.content_source_url.clone(),
            self.options.comments,
        );

        run.enter(PublishState::Submitting);
        let draft_id = match StageOutcome::classify(self.submitter.submit(&token, draft).await) {
            StageOutcome::Success(id) => id,
            StageOutcome::Recoverable(e) | StageOutcome::Fatal(e) => return Err(run.fail(e)),
        };

        self.notifier.notify(Notice::DraftCreated {
            draft_id: draft_id.clone(),
        });
        run.enter(PublishState::Done);

        Ok(PublishReport {
            draft_id,
            cover_media_id,
            images,
        })
    }
}
