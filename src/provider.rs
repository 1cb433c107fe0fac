use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{ProvideCredentials, future};
use aws_smithy_types::date_time::Format;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, info};

use crate::aws::Credentials;
use crate::aws::sts::{ExchangeCredentials, ExchangeRequest, StsExchange};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::token::IdentityTokenSource;

type SharedRefresh = Shared<BoxFuture<'static, Result<Credentials, ProviderError>>>;

/// Cached credential state. `current` is only ever replaced wholesale by a
/// completed refresh; `in_flight` is the refresh every concurrent caller of
/// that cycle awaits.
#[derive(Default)]
struct RefreshState {
    current: Option<Credentials>,
    in_flight: Option<SharedRefresh>,
}

/// AWS temporary-credential provider backed by web-identity federation.
///
/// Exchanges OIDC identity tokens for STS session credentials and caches the
/// result until it comes within the preemption window of its expiry. Any
/// number of tasks or threads may request credentials concurrently: at most
/// one token-fetch-plus-exchange sequence is in flight at a time, and every
/// caller that observed the need for a refresh receives that cycle's outcome,
/// success or failure alike.
///
/// A failed refresh leaves the cached value untouched and is reported to the
/// caller; the provider never retries on its own.
pub struct WebIdentityCredentials {
    token_source: Arc<dyn IdentityTokenSource>,
    exchange: Arc<dyn ExchangeCredentials>,
    request: ExchangeRequest,
    preempt_window: Duration,
    state: Arc<Mutex<RefreshState>>,
}

impl WebIdentityCredentials {
    /// Build a provider from a validated configuration and explicit
    /// token-source and exchange capabilities.
    pub fn new(
        config: &ProviderConfig,
        token_source: Arc<dyn IdentityTokenSource>,
        exchange: Arc<dyn ExchangeCredentials>,
    ) -> Self {
        Self {
            token_source,
            exchange,
            request: config.exchange_request(),
            preempt_window: config.preemption_window(),
            state: Arc::new(Mutex::new(RefreshState::default())),
        }
    }

    /// Build a provider that exchanges tokens at AWS STS in the configured
    /// region.
    pub fn with_sts(config: &ProviderConfig, token_source: Arc<dyn IdentityTokenSource>) -> Self {
        let exchange = Arc::new(StsExchange::new(config.region().clone()));
        Self::new(config, token_source, exchange)
    }

    /// Return valid temporary credentials, refreshing them first when absent
    /// or within the preemption window of expiry.
    ///
    /// Within the freshness window this is a pure read: no I/O, same value.
    pub async fn credentials(&self) -> Result<Credentials, ProviderError> {
        let refresh = {
            let mut state = self.lock_state();

            if let Some(current) = state.current.as_ref() {
                if !current.expires_within(self.preempt_window) {
                    return Ok(current.clone());
                }
            }

            match state.in_flight.as_ref() {
                Some(in_flight) => in_flight.clone(),
                None => {
                    let refresh = self.start_refresh();
                    state.in_flight = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await
    }

    // RefreshState is replaced wholesale, never left half-written, so a
    // poisoned lock still holds a consistent value.
    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build the refresh future shared by every caller of this cycle. The
    /// state lock is not held while the future runs; it is reacquired only
    /// to commit the outcome.
    fn start_refresh(&self) -> SharedRefresh {
        let token_source = Arc::clone(&self.token_source);
        let exchange = Arc::clone(&self.exchange);
        let request = self.request.clone();
        let state = Arc::clone(&self.state);

        async move {
            debug!("Refreshing credentials for role: {}", request.role_arn);

            let result = run_exchange(token_source, exchange, &request).await;

            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            if let Ok(credentials) = result.as_ref() {
                state.current = Some(credentials.clone());
            }
            state.in_flight = None;

            result
        }
        .boxed()
        .shared()
    }
}

async fn run_exchange(
    token_source: Arc<dyn IdentityTokenSource>,
    exchange: Arc<dyn ExchangeCredentials>,
    request: &ExchangeRequest,
) -> Result<Credentials, ProviderError> {
    let token = token_source
        .identity_token(&request.audience)
        .await
        .map_err(ProviderError::token_fetch)?;

    let credentials = exchange
        .exchange(request, token.as_str())
        .await
        .map_err(ProviderError::exchange)?;

    info!(
        "Obtained temporary credentials, expire at: {}",
        credentials
            .expiration
            .fmt(Format::DateTime)
            .unwrap_or_else(|_| "unknown".to_string())
    );

    Ok(credentials)
}

impl fmt::Debug for WebIdentityCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebIdentityCredentials")
            .field("request", &self.request)
            .field("preempt_window", &self.preempt_window)
            .finish_non_exhaustive()
    }
}

impl ProvideCredentials for WebIdentityCredentials {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(async move {
            let credentials = self
                .credentials()
                .await
                .map_err(CredentialsError::provider_error)?;
            Ok(credentials.into_sdk())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::SystemTime;

    use async_trait::async_trait;
    use aws_smithy_types::DateTime;

    use crate::constants::DEFAULT_STS_AUDIENCE;
    use crate::error::BoxError;
    use crate::token::IdentityToken;

    const READER_ROLE: &str = "arn:aws:iam::123456789012:role/reader";

    #[derive(Debug)]
    struct StubTokenSource {
        calls: AtomicUsize,
        fail_remaining: AtomicUsize,
        seen_audience: StdMutex<Option<String>>,
    }

    impl StubTokenSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_remaining: AtomicUsize::new(0),
                seen_audience: StdMutex::new(None),
            }
        }

        fn failing_times(times: usize) -> Self {
            let source = Self::new();
            source.fail_remaining.store(times, Ordering::SeqCst);
            source
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn seen_audience(&self) -> Option<String> {
            self.seen_audience.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IdentityTokenSource for StubTokenSource {
        async fn identity_token(&self, audience: &str) -> Result<IdentityToken, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_audience.lock().unwrap() = Some(audience.to_string());

            if self
                .fail_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err("identity provider unreachable".into());
            }

            Ok(IdentityToken::new("eyT1"))
        }
    }

    #[derive(Debug)]
    struct StubExchange {
        calls: AtomicUsize,
        lifetime: Duration,
        delay: Duration,
        fail: bool,
    }

    impl StubExchange {
        fn new(lifetime: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                lifetime,
                delay: Duration::ZERO,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(Duration::ZERO)
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExchangeCredentials for StubExchange {
        async fn exchange(
            &self,
            _request: &ExchangeRequest,
            identity_token: &str,
        ) -> Result<Credentials, BoxError> {
            let cycle = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err("role trust policy rejected the token".into());
            }

            assert_eq!(identity_token, "eyT1");

            Ok(Credentials {
                access_key_id: format!("AKIA{cycle:04}"),
                secret_access_key: "abc".to_string(),
                session_token: "tok1".to_string(),
                expiration: DateTime::from(SystemTime::now() + self.lifetime),
            })
        }
    }

    fn test_config() -> ProviderConfig {
        ProviderConfig::builder().role_arn(READER_ROLE).build().unwrap()
    }

    fn provider(
        token_source: &Arc<StubTokenSource>,
        exchange: &Arc<StubExchange>,
    ) -> WebIdentityCredentials {
        WebIdentityCredentials::new(
            &test_config(),
            Arc::clone(token_source) as Arc<dyn IdentityTokenSource>,
            Arc::clone(exchange) as Arc<dyn ExchangeCredentials>,
        )
    }

    #[tokio::test]
    async fn test_credentials_cached_while_fresh() {
        let token_source = Arc::new(StubTokenSource::new());
        let exchange = Arc::new(StubExchange::new(Duration::from_secs(3600)));
        let provider = provider(&token_source, &exchange);

        let first = provider.credentials().await.unwrap();
        let second = provider.credentials().await.unwrap();

        assert_eq!(first.access_key_id, "AKIA0001");
        assert_eq!(second.access_key_id, "AKIA0001");
        assert_eq!(token_source.calls(), 1);
        assert_eq!(exchange.calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_triggered_inside_preemption_window() {
        // 4 minutes left on a 5 minute window: the second call must refresh
        let token_source = Arc::new(StubTokenSource::new());
        let exchange = Arc::new(StubExchange::new(Duration::from_secs(240)));
        let provider = provider(&token_source, &exchange);

        let first = provider.credentials().await.unwrap();
        let second = provider.credentials().await.unwrap();

        assert_eq!(first.access_key_id, "AKIA0001");
        assert_eq!(second.access_key_id, "AKIA0002");
        assert_eq!(exchange.calls(), 2);
    }

    #[tokio::test]
    async fn test_single_flight_cooperative_callers() {
        let token_source = Arc::new(StubTokenSource::new());
        let exchange = Arc::new(
            StubExchange::new(Duration::from_secs(3600)).with_delay(Duration::from_millis(50)),
        );
        let provider = provider(&token_source, &exchange);

        let (a, b, c) = tokio::join!(
            provider.credentials(),
            provider.credentials(),
            provider.credentials()
        );

        let a = a.unwrap();
        assert_eq!(a.access_key_id, "AKIA0001");
        assert_eq!(b.unwrap().access_key_id, a.access_key_id);
        assert_eq!(c.unwrap().access_key_id, a.access_key_id);
        assert_eq!(token_source.calls(), 1);
        assert_eq!(exchange.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight_parallel_callers() {
        let token_source = Arc::new(StubTokenSource::new());
        let exchange = Arc::new(
            StubExchange::new(Duration::from_secs(3600)).with_delay(Duration::from_millis(100)),
        );
        let provider = Arc::new(provider(&token_source, &exchange));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let provider = Arc::clone(&provider);
                tokio::spawn(async move { provider.credentials().await })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().access_key_id, "AKIA0001");
        }
        assert_eq!(token_source.calls(), 1);
        assert_eq!(exchange.calls(), 1);
    }

    #[tokio::test]
    async fn test_exchange_failure_leaves_cache_empty() {
        let token_source = Arc::new(StubTokenSource::new());
        let exchange = Arc::new(StubExchange::failing());
        let provider = provider(&token_source, &exchange);

        let err = provider.credentials().await.unwrap_err();
        assert!(matches!(err, ProviderError::Exchange { .. }));
        assert_eq!(
            err.to_string(),
            "exchanging identity token for temporary credentials"
        );

        // the cache stayed empty: the next call runs the full cycle again
        let err = provider.credentials().await.unwrap_err();
        assert!(matches!(err, ProviderError::Exchange { .. }));
        assert_eq!(token_source.calls(), 2);
        assert_eq!(exchange.calls(), 2);
    }

    #[tokio::test]
    async fn test_token_fetch_failure_then_recovery() {
        let token_source = Arc::new(StubTokenSource::failing_times(1));
        let exchange = Arc::new(StubExchange::new(Duration::from_secs(3600)));
        let provider = provider(&token_source, &exchange);

        let err = provider.credentials().await.unwrap_err();
        assert!(matches!(err, ProviderError::TokenFetch { .. }));
        // the exchange is never attempted without a token
        assert_eq!(exchange.calls(), 0);

        // transient failure cleared: the next cycle succeeds normally
        let credentials = provider.credentials().await.unwrap();
        assert_eq!(credentials.access_key_id, "AKIA0001");
        assert_eq!(token_source.calls(), 2);
        assert_eq!(exchange.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_waiters_share_the_same_failure() {
        let token_source = Arc::new(StubTokenSource::new());
        let exchange = Arc::new(StubExchange::failing().with_delay(Duration::from_millis(50)));
        let provider = provider(&token_source, &exchange);

        let (a, b) = tokio::join!(provider.credentials(), provider.credentials());

        let a = a.unwrap_err();
        let b = b.unwrap_err();
        assert!(matches!(a, ProviderError::Exchange { .. }));
        assert!(matches!(b, ProviderError::Exchange { .. }));
        // one shared cycle, one shared failure
        assert_eq!(token_source.calls(), 1);
        assert_eq!(exchange.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_caller_does_not_abort_the_refresh() {
        let token_source = Arc::new(StubTokenSource::new());
        let exchange = Arc::new(
            StubExchange::new(Duration::from_secs(3600)).with_delay(Duration::from_millis(100)),
        );
        let provider = provider(&token_source, &exchange);

        // first caller gives up while the exchange is still in flight
        let cancelled =
            tokio::time::timeout(Duration::from_millis(10), provider.credentials()).await;
        assert!(cancelled.is_err());

        // a later caller joins the same cycle instead of starting a new one
        let credentials = provider.credentials().await.unwrap();
        assert_eq!(credentials.access_key_id, "AKIA0001");
        assert_eq!(token_source.calls(), 1);
        assert_eq!(exchange.calls(), 1);
    }

    #[tokio::test]
    async fn test_default_audience_used_for_token_fetch() {
        let token_source = Arc::new(StubTokenSource::new());
        let exchange = Arc::new(StubExchange::new(Duration::from_secs(3600)));
        let provider = provider(&token_source, &exchange);

        provider.credentials().await.unwrap();
        assert_eq!(
            token_source.seen_audience().as_deref(),
            Some(DEFAULT_STS_AUDIENCE)
        );
    }

    #[tokio::test]
    async fn test_configured_audience_passed_through() {
        let token_source = Arc::new(StubTokenSource::new());
        let exchange = Arc::new(StubExchange::new(Duration::from_secs(3600)));
        let config = ProviderConfig::builder()
            .role_arn(READER_ROLE)
            .audience("https://example.com/aud")
            .build()
            .unwrap();
        let provider = WebIdentityCredentials::new(
            &config,
            Arc::clone(&token_source) as Arc<dyn IdentityTokenSource>,
            Arc::clone(&exchange) as Arc<dyn ExchangeCredentials>,
        );

        provider.credentials().await.unwrap();
        assert_eq!(
            token_source.seen_audience().as_deref(),
            Some("https://example.com/aud")
        );
    }

    #[tokio::test]
    async fn test_provide_credentials_yields_sdk_credentials() {
        let token_source = Arc::new(StubTokenSource::new());
        let exchange = Arc::new(StubExchange::new(Duration::from_secs(3600)));
        let provider = provider(&token_source, &exchange);

        let sdk = provider.provide_credentials().await.unwrap();
        assert_eq!(sdk.access_key_id(), "AKIA0001");
        assert_eq!(sdk.session_token(), Some("tok1"));
        assert!(sdk.expiry().is_some());
    }
}
