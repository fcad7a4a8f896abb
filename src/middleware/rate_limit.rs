use super::{Middleware, Next};
use crate::exception::AppError;
use crate::http::{HttpRequest, HttpResponse};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    pub error_message: String,
    pub status_code: StatusCode,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60 * 60),
            error_message: "Maximum amount of requests reached. Try again shortly".to_string(),
            status_code: StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    remaining: u32,
}

/// In-memory fixed-window rate limiter keyed by client address.
///
/// Each client may make `max_requests` requests per window. Clones share
/// the same counters.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: Arc<RateLimitConfig>,
    clients: Arc<DashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            clients: Arc::new(DashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Spend one request from `client`'s budget and return what is left, or
    /// `None` when the budget is exhausted.
    pub fn acquire(&self, client: &str) -> Option<u32> {
        let now = Instant::now();
        let mut window = self.clients.entry(client.to_string()).or_insert(Window {
            started: now,
            remaining: self.config.max_requests,
        });
        if now.duration_since(window.started) >= self.config.window {
            *window = Window {
                started: now,
                remaining: self.config.max_requests,
            };
        }
        if window.remaining == 0 {
            return None;
        }
        window.remaining -= 1;
        Some(window.remaining)
    }

    /// Drop every client whose window has ended. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.clients.len();
        let window = self.config.window;
        self.clients.retain(|_, entry| entry.started.elapsed() < window);
        before.saturating_sub(self.clients.len())
    }

    /// Periodically purge expired windows on the Tokio runtime.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let limiter = self.clone();
        let period = self.config.window.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = limiter.purge_expired();
                if purged > 0 {
                    tracing::debug!("Rate limiter purged {} expired clients", purged);
                }
            }
        })
    }

    fn client_key(req: &HttpRequest) -> String {
        req.remote_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl Middleware for RateLimiter {
    fn handle(&self, req: &mut HttpRequest, res: &mut HttpResponse, next: &mut Next) -> Result<(), AppError> {
        let client = Self::client_key(req);
        let remaining = self.acquire(&client).ok_or_else(|| {
            tracing::warn!("Rate limit reached for {}", client);
            AppError::new(self.config.error_message.clone(), self.config.status_code).operational()
        })?;
        res.set_header(
            HeaderName::from_static("x-remaining-requests"),
            HeaderValue::from(remaining),
        )
        .set_header(
            HeaderName::from_static("x-maximum-requests"),
            HeaderValue::from(self.config.max_requests),
        );
        next.proceed();
        Ok(())
    }

    fn name(&self) -> &str {
        "RateLimiter"
    }
}
