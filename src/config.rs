use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_API_BASE: &str = "https://api.weixin.qq.com";
pub const DEFAULT_CONTENT_CLASS: &str = "mp-content-section";

#[derive(Parser, Debug, Clone)]
#[command(name = "mppub")]
#[command(version = "0.1.0")]
#[command(about = "Publishes a rendered HTML article as a WeChat Official Account draft")]
pub struct Config {
    /// HTML файл с отрендеренной статьёй
    /// env: MPPUB_INPUT
    #[arg(long, env = "MPPUB_INPUT")]
    pub input: PathBuf,

    /// Заголовок статьи (по умолчанию: имя входного файла)
    /// env: MPPUB_TITLE
    #[arg(long, env = "MPPUB_TITLE")]
    pub title: Option<String>,

    /// Автор статьи
    /// env: MPPUB_AUTHOR
    #[arg(long, env = "MPPUB_AUTHOR")]
    pub author: Option<String>,

    /// Идентификатор аккаунта, ключ кэша токенов
    /// env: MPPUB_ACCOUNT_ID
    #[arg(long, env = "MPPUB_ACCOUNT_ID", default_value = "default")]
    pub account_id: String,

    /// Отображаемое имя аккаунта
    /// env: MPPUB_ACCOUNT_NAME
    #[arg(long, env = "MPPUB_ACCOUNT_NAME", default_value = "default")]
    pub account_name: String,

    /// AppID официального аккаунта
    /// env: MPPUB_APP_ID
    #[arg(long, env = "MPPUB_APP_ID")]
    pub app_id: Option<String>,

    /// AppSecret официального аккаунта
    /// env: MPPUB_APP_SECRET
    #[arg(long, env = "MPPUB_APP_SECRET", hide_env_values = true)]
    pub app_secret: Option<String>,

    /// Ссылка "читать оригинал"
    /// env: MPPUB_SOURCE_URL
    #[arg(long, env = "MPPUB_SOURCE_URL")]
    pub source_url: Option<String>,

    /// Закрыть комментарии к статье
    #[arg(long, env = "MPPUB_NO_COMMENTS")]
    pub no_comments: bool,

    /// Комментировать могут только подписчики
    #[arg(long, env = "MPPUB_FANS_ONLY_COMMENTS")]
    pub fans_only_comments: bool,

    /// CSS класс элемента с содержимым статьи
    /// env: MPPUB_CONTENT_CLASS
    #[arg(long, env = "MPPUB_CONTENT_CLASS", default_value = DEFAULT_CONTENT_CLASS)]
    pub content_class: String,

    /// Базовый URL API
    /// env: MPPUB_API_BASE
    #[arg(long, env = "MPPUB_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Таймаут HTTP запросов в секундах
    /// env: MPPUB_TIMEOUT
    #[arg(long, env = "MPPUB_TIMEOUT", default_value = "30")]
    pub timeout_secs: u64,
}

impl Config {
    /// Валидирует конфигурацию при запуске
    pub fn validate(&self) -> crate::error::AppResult<()> {
        if self.timeout_secs == 0 {
            return Err(crate::error::AppError::Config(
                "--timeout-secs must be greater than zero".to_string(),
            ));
        }

        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(crate::error::AppError::Config(format!(
                "--api-base must be an http(s) URL, got {}",
                self.api_base
            )));
        }

        if self.no_comments && self.fans_only_comments {
            return Err("Cannot combine --no-comments with --fans-only-comments".into());
        }

        Ok(())
    }

    /// Заголовок из аргументов, иначе имя файла без расширения
    pub fn resolve_title(&self) -> String {
        if let Some(title) = &self.title {
            return title.trim().to_string();
        }

        self.input
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| {
                name.trim_end_matches(".html")
                    .trim_end_matches(".htm")
                    .trim_end_matches(".md")
                    .to_string()
            })
            .unwrap_or_default()
    }
}
