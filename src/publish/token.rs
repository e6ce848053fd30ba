// publish/token.rs - выдача и кэширование access_token по аккаунтам

use super::notify::{Notice, Notifier};
use crate::api::WeChatApi;
use crate::error::{AppError, AppResult};
use crate::models::{Account, TokenState, DEFAULT_TOKEN_TTL_SECS};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Хранит по одному токену на аккаунт.
///
/// Запись в кэше заменяется целиком и никогда не держится заблокированной
/// во время сетевого вызова. Две одновременные выдачи для одного аккаунта
/// возможны, но в худшем случае дают лишний запрос.
pub struct TokenManager {
    api: Arc<dyn WeChatApi>,
    notifier: Arc<dyn Notifier>,
    cache: DashMap<String, TokenState>,
}

impl TokenManager {
    pub fn new(api: Arc<dyn WeChatApi>, notifier: Arc<dyn Notifier>) -> Self {
        TokenManager {
            api,
            notifier,
            cache: DashMap::new(),
        }
    }

    pub async fn get_token(&self, account: &Account) -> AppResult<String> {
        self.get_token_at(account, Utc::now()).await
    }

    pub async fn get_token_at(&self, account: &Account, now: DateTime<Utc>) -> AppResult<String> {
        if !account.has_credentials() {
            error!("Account {} has no AppID or AppSecret configured", account.name);
            return Err(AppError::Auth(format!(
                "AppID or AppSecret is not configured for account {}",
                account.name
            )));
        }

        // guard из DashMap отпускается до await
        let cached = self
            .cache
            .get(&account.id)
            .filter(|state| state.is_valid_at(now))
            .map(|state| state.token.clone());

        if let Some(token) = cached {
            debug!("Using cached access token for account {}", account.name);
            return Ok(token);
        }

        match self.issue(account, now).await {
            Ok(state) => {
                let token = state.token.clone();
                info!(
                    "Access token issued for account {}, expires at {}",
                    account.name, state.expires_at
                );
                self.cache.insert(account.id.clone(), state);
                self.notifier.notify(Notice::TokenIssued {
                    account: account.name.clone(),
                });
                Ok(token)
            }
            Err(e) => {
                // чужой свежий токен для того же аккаунта не трогаем
                error!("Failed to obtain access token for {}: {}", account.name, e);
                Err(e)
            }
        }
    }

    async fn issue(&self, account: &Account, now: DateTime<Utc>) -> AppResult<TokenState> {
        let response = self
            .api
            .fetch_token(&account.app_id, &account.app_secret)
            .await?;

        if let Some(message) = response.status.failure() {
            return Err(AppError::Auth(message));
        }

        let token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Auth("no access_token in response".to_string()))?;

        let expires_in = response.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        TokenState::issued_at(token, now, expires_in)
            .ok_or_else(|| AppError::Auth(format!("invalid expires_in: {}", expires_in)))
    }

    #[cfg(test)]
    pub fn cached(&self, account_id: &str) -> Option<TokenState> {
        self.cache.get(account_id).map(|state| state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeWeChatApi;
    use crate::publish::notify::testing::RecordingNotifier;
    use chrono::Duration;
    use std::collections::HashSet;

    fn account(id: &str) -> Account {
        Account {
            id: id.to_string(),
            name: format!("acc-{id}"),
            app_id: "wx123".to_string(),
            app_secret: "secret".to_string(),
            is_default: true,
        }
    }

    fn manager(api: FakeWeChatApi) -> (Arc<FakeWeChatApi>, Arc<RecordingNotifier>, TokenManager) {
        let api = Arc::new(api);
        let notifier = Arc::new(RecordingNotifier::default());
        let tokens = TokenManager::new(api.clone(), notifier.clone());
        (api, notifier, tokens)
    }

    #[tokio::test]
    async fn test_cache_hit_within_margin() {
        let (api, notifier, tokens) = manager(FakeWeChatApi::new());
        let acc = account("a");
        let now = Utc::now();

        let first = tokens.get_token_at(&acc, now).await.unwrap();
        let second = tokens
            .get_token_at(&acc, now + Duration::seconds(7200 - 301))
            .await
            .unwrap();

        assert_eq!(first, "token-1");
        assert_eq!(second, first);
        assert_eq!(api.token_calls(), 1);
        // уведомление только о свежей выдаче
        assert_eq!(notifier.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_inside_margin() {
        let (api, _, tokens) = manager(FakeWeChatApi::new());
        let acc = account("a");
        let now = Utc::now();

        tokens.get_token_at(&acc, now).await.unwrap();
        let refreshed = tokens
            .get_token_at(&acc, now + Duration::seconds(7200 - 300))
            .await
            .unwrap();

        assert_eq!(refreshed, "token-2");
        assert_eq!(api.token_calls(), 2);
        assert_eq!(tokens.cached("a").unwrap().token, "token-2");
    }

    #[test]
    fn test_missing_credentials_skip_network() {
        let (api, _, tokens) = manager(FakeWeChatApi::new());
        let mut acc = account("a");
        acc.app_secret = "  ".to_string();

        let result = tokio_test::block_on(tokens.get_token(&acc));
        assert!(matches!(result, Err(AppError::Auth(_))));
        assert_eq!(api.token_calls(), 0);
    }

    #[test]
    fn test_errcode_is_auth_error_and_not_cached() {
        let (api, notifier, tokens) = manager(FakeWeChatApi {
            token_errcode: Some(40001),
            ..Default::default()
        });
        let acc = account("a");

        let err = tokio_test::block_on(tokens.get_token(&acc)).unwrap_err();
        assert!(matches!(err, AppError::Auth(ref m) if m.contains("40001")));
        assert!(tokens.cached("a").is_none());
        assert!(notifier.notices().is_empty());

        // повторный вызов снова идёт в сеть
        let _ = tokio_test::block_on(tokens.get_token(&acc));
        assert_eq!(api.token_calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_access_token() {
        let (_, _, tokens) = manager(FakeWeChatApi {
            token_without_access_token: true,
            ..Default::default()
        });
        let err = tokens.get_token(&account("a")).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[tokio::test]
    async fn test_accounts_are_cached_separately() {
        let (api, _, tokens) = manager(FakeWeChatApi::new());
        let a = tokens.get_token(&account("a")).await.unwrap();
        let b = tokens.get_token(&account("b")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(tokens.get_token(&account("a")).await.unwrap(), a);
        assert_eq!(api.token_calls(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_expires_in_is_auth_error() {
        let (_, notifier, tokens) = manager(FakeWeChatApi {
            expires_in: Some(i64::MAX),
            ..Default::default()
        });
        let err = tokens.get_token(&account("a")).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(ref m) if m.contains("expires_in")));
        assert!(tokens.cached("a").is_none());
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cached_entry() {
        let (api, _, tokens) = manager(FakeWeChatApi {
            failing_token_calls: HashSet::from([2]),
            ..Default::default()
        });
        let acc = account("a");
        let now = Utc::now();

        tokens.get_token_at(&acc, now).await.unwrap();
        let err = tokens
            .get_token_at(&acc, now + Duration::seconds(7000))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
        // отказ не вычищает запись, которую мог положить соседний вызов
        assert_eq!(tokens.cached("a").unwrap().token, "token-1");

        let refreshed = tokens
            .get_token_at(&acc, now + Duration::seconds(7000))
            .await
            .unwrap();
        assert_eq!(refreshed, "token-3");
        assert_eq!(api.token_calls(), 3);
    }

    #[tokio::test]
    async fn test_expires_in_from_response() {
        let (_, _, tokens) = manager(FakeWeChatApi {
            expires_in: Some(600),
            ..Default::default()
        });
        let now = Utc::now();
        tokens.get_token_at(&account("a"), now).await.unwrap();
        let state = tokens.cached("a").unwrap();
        assert_eq!(state.expires_at, now + Duration::seconds(600));
    }
}
