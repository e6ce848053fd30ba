use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod content;
mod error;
mod models;
mod publish;

use config::Config;
use models::{Account, CommentPolicy};
use publish::{PublishOptions, PublishOrchestrator, TokenManager, TracingNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализируем логирование
    init_tracing();

    // Парсим конфигурацию из CLI и env
    let config = Config::parse();

    // Валидируем конфигурацию
    config.validate()?;

    let html = tokio::fs::read_to_string(&config.input)
        .await
        .with_context(|| format!("failed to read {}", config.input.display()))?;

    let mut article =
        content::select_content(&content::parse_fragment(&html), &config.content_class)?;
    let title = config.resolve_title();
    let account = selected_account(&config);

    info!(
        "Starting mppub - input: {}, account: {}, api: {}",
        config.input.display(),
        config.account_name,
        config.api_base
    );

    let api = api::create_api_client(&config)?;
    let notifier = Arc::new(TracingNotifier);
    let tokens = Arc::new(TokenManager::new(Arc::clone(&api), notifier.clone()));
    let options = PublishOptions {
        author: config.author.clone(),
        content_source_url: config.source_url.clone(),
        comments: CommentPolicy {
            open: !config.no_comments,
            fans_only: config.fans_only_comments,
        },
    };

    let orchestrator = PublishOrchestrator::new(api, tokens, notifier, options);
    let report = orchestrator
        .publish_with_report(&mut article, &title, account.as_ref())
        .await?;

    let failed = report
        .images
        .iter()
        .filter(|upload| !upload.outcome.is_success())
        .count();
    if failed > 0 {
        warn!("{} image(s) kept their original links", failed);
    }
    info!(
        "Draft {} created (cover: {})",
        report.draft_id,
        report.cover_media_id.as_deref().unwrap_or("none")
    );

    println!("{}", report.draft_id);
    Ok(())
}

/// Аккаунт из конфигурации; без обоих учётных данных аккаунт не выбран
fn selected_account(config: &Config) -> Option<Account> {
    if config.app_id.is_none() && config.app_secret.is_none() {
        return None;
    }

    Some(Account {
        id: config.account_id.clone(),
        name: config.account_name.clone(),
        app_id: config.app_id.clone().unwrap_or_default(),
        app_secret: config.app_secret.clone().unwrap_or_default(),
        is_default: true,
    })
}

/// Инициализирует систему логирования с использованием tracing
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_writer(std::io::stderr)
        .init();
}
