// publish/notify.rs - уведомления о ходе публикации для пользователя

use super::orchestrator::PublishState;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    StateChanged(PublishState),
    TokenIssued { account: String },
    UploadingImages { count: usize },
    ImageFailed { index: usize, message: String },
    ImagesUploaded { uploaded: usize, total: usize },
    DraftCreated { draft_id: String },
    Failed { message: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::StateChanged(state) => write!(f, "Publish stage: {:?}", state),
            Notice::TokenIssued { account } => {
                write!(f, "Access token refreshed for account {}", account)
            }
            Notice::UploadingImages { count } => write!(f, "Uploading {} image(s)...", count),
            Notice::ImageFailed { index, message } => write!(
                f,
                "Image {} failed to upload, keeping original link: {}",
                index + 1,
                message
            ),
            Notice::ImagesUploaded { uploaded, total } => {
                write!(f, "Images uploaded: {}/{}", uploaded, total)
            }
            Notice::DraftCreated { draft_id } => write!(
                f,
                "Draft created ({}), review it in the Official Account console",
                draft_id
            ),
            Notice::Failed { message } => write!(f, "Publish failed: {}", message),
        }
    }
}

/// Приёмник уведомлений: вызывается и забывается, на ход публикации не влияет
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Пишет уведомления в лог
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match &notice {
            Notice::StateChanged(_) => tracing::debug!("{}", notice),
            Notice::ImageFailed { .. } | Notice::Failed { .. } => warn!("{}", notice),
            _ => info!("{}", notice),
        }
    }
}
