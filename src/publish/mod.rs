//! Конвейер публикации: токен, загрузка изображений, очистка, черновик.

pub mod draft;
pub mod media;
pub mod multipart;
pub mod notify;
pub mod orchestrator;
pub mod outcome;
pub mod token;

pub use notify::TracingNotifier;
pub use orchestrator::{PublishOptions, PublishOrchestrator};
pub use token::TokenManager;
