use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prediction_core::{Bar, MarketData, PredictionError, TickerDetails, Timespan};
use reqwest::Client;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://api.polygon.io";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let wait_until = match ts.front().and_then(|f| f.checked_add(self.window)) {
                Some(deadline) => deadline,
                None => return,
            };
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for Polygon API slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl PolygonClient {
    /// Build a client from the `POLYGON_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, PredictionError> {
        let api_key = std::env::var("POLYGON_API_KEY")
            .map_err(|_| PredictionError::Configuration("Polygon API key not configured".into()))?;
        Ok(Self::new(api_key))
    }

    pub fn new(api_key: String) -> Self {
        // Free tier allows 5 req/min; paid plans set POLYGON_RATE_LIMIT higher.
        let rate_limit: usize = std::env::var("POLYGON_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, PredictionError> {
        let request = builder
            .build()
            .map_err(|e| PredictionError::MarketData(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| PredictionError::MarketData("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| PredictionError::MarketData(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 15u64;
            tracing::warn!(
                "Polygon 429 rate limited, waiting {}s before retry {}/3",
                wait_secs,
                attempt + 1
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(PredictionError::MarketData(
            "Rate limited by Polygon after 3 retries".to_string(),
        ))
    }

    async fn fetch_aggregates(
        &self,
        ticker: &str,
        multiplier: u32,
        timespan: Timespan,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, PredictionError> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            BASE_URL,
            ticker,
            multiplier,
            timespan.as_str(),
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let response = self
            .send_request(self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("adjusted", "true"),
                ("sort", "asc"),
            ]))
            .await?;

        if !response.status().is_success() {
            return Err(PredictionError::MarketData(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let agg_response: AggregateResponse = response
            .json()
            .await
            .map_err(|e| PredictionError::MarketData(e.to_string()))?;

        Ok(agg_response
            .results
            .into_iter()
            .filter_map(|r| {
                DateTime::from_timestamp_millis(r.t).map(|timestamp| Bar {
                    timestamp,
                    open: r.o,
                    high: r.h,
                    low: r.l,
                    close: r.c,
                    volume: r.v,
                })
            })
            .collect())
    }

    async fn fetch_ticker_details(&self, ticker: &str) -> Result<TickerDetails, PredictionError> {
        let url = format!("{}/v3/reference/tickers/{}", BASE_URL, ticker);

        let response = self
            .send_request(self.client.get(&url).query(&[("apiKey", &self.api_key)]))
            .await?;

        if !response.status().is_success() {
            return Err(PredictionError::MarketData(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let details: TickerDetailsResponse = response
            .json()
            .await
            .map_err(|e| PredictionError::MarketData(e.to_string()))?;

        let r = details.results;
        Ok(TickerDetails {
            ticker: r.ticker,
            name: r.name,
            description: r.description,
            market_cap: r.market_cap,
            homepage_url: r.homepage_url,
            currency_name: r.currency_name,
            primary_exchange: r.primary_exchange,
        })
    }
}

#[async_trait]
impl MarketData for PolygonClient {
    async fn get_aggregates(
        &self,
        ticker: &str,
        multiplier: u32,
        timespan: Timespan,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, PredictionError> {
        self.fetch_aggregates(ticker, multiplier, timespan, from, to)
            .await
    }

    async fn get_ticker_details(&self, ticker: &str) -> Result<TickerDetails, PredictionError> {
        self.fetch_ticker_details(ticker).await
    }
}

// Response types

#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64, // timestamp
    o: f64, // open
    h: f64, // high
    l: f64, // low
    c: f64, // close
    v: f64, // volume
}

#[derive(Debug, Deserialize)]
struct TickerDetailsResponse {
    results: TickerDetailsResult,
}

#[derive(Debug, Deserialize)]
struct TickerDetailsResult {
    ticker: String,
    name: Option<String>,
    description: Option<String>,
    market_cap: Option<f64>,
    homepage_url: Option<String>,
    currency_name: Option<String>,
    primary_exchange: Option<String>,
}
