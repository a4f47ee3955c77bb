//! Best-effort stock data gathering for the strategy prompt.
//!
//! Failures here never abort a pipeline run; a ticker that cannot be
//! resolved is logged and skipped.

use chrono::{Duration, Utc};
use prediction_core::{Bar, MarketData, OhlcSummary, StockData, Timespan};

/// Fetch reference data and OHLC summaries for each ticker. Tickers whose
/// details lookup fails are skipped; a failed OHLC window is skipped while
/// the rest of the ticker's data is kept.
pub async fn collect_stock_data(
    market: &dyn MarketData,
    tickers: &[String],
    include_year: bool,
    include_week: bool,
) -> Vec<StockData> {
    let mut out = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        match stock_data_for(market, ticker, include_year, include_week).await {
            Ok(data) => out.push(data),
            Err(e) => tracing::warn!(%ticker, "skipping stock data: {e}"),
        }
    }
    out
}

async fn stock_data_for(
    market: &dyn MarketData,
    ticker: &str,
    include_year: bool,
    include_week: bool,
) -> Result<StockData, prediction_core::PredictionError> {
    let details = market.get_ticker_details(ticker).await?;
    let now = Utc::now();
    let mut ohlc = Vec::new();

    if include_year {
        match market
            .get_aggregates(ticker, 1, Timespan::Day, now - Duration::days(365), now)
            .await
        {
            Ok(bars) => {
                if let Some(summary) = summarize(&bars, "1 year (daily)") {
                    ohlc.push(summary);
                }
            }
            Err(e) => tracing::warn!(%ticker, "yearly aggregates unavailable: {e}"),
        }
    }

    if include_week {
        match market
            .get_aggregates(ticker, 1, Timespan::Hour, now - Duration::days(7), now)
            .await
        {
            Ok(bars) => {
                if let Some(summary) = summarize(&bars, "1 week (hourly)") {
                    ohlc.push(summary);
                }
            }
            Err(e) => tracing::warn!(%ticker, "weekly aggregates unavailable: {e}"),
        }
    }

    Ok(StockData {
        ticker: details.ticker,
        name: details.name.unwrap_or_else(|| ticker.to_string()),
        description: details.description.unwrap_or_default(),
        market_cap: details.market_cap,
        website: details.homepage_url.unwrap_or_default(),
        currency: details.currency_name.unwrap_or_default(),
        exchange: details.primary_exchange.unwrap_or_default(),
        ohlc,
    })
}

/// Summarize a window of bars (sorted oldest first) into aggregate figures
fn summarize(bars: &[Bar], timeframe: &str) -> Option<OhlcSummary> {
    let first = bars.first()?;
    let last = bars.last()?;

    let change_pct = if first.close != 0.0 {
        Some((last.close - first.close) / first.close * 100.0)
    } else {
        None
    };
    let high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);

    Some(OhlcSummary {
        timeframe: timeframe.to_string(),
        current_price: Some(last.close),
        change_pct,
        high: Some(high),
        low: Some(low),
        start_date: first.timestamp.format("%Y-%m-%d").to_string(),
        end_date: last.timestamp.format("%Y-%m-%d").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(day: u32, close: f64, high: f64, low: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn summarize_computes_change_and_extremes() {
        let bars = vec![bar(1, 100.0, 105.0, 95.0), bar(2, 110.0, 115.0, 99.0)];
        let s = summarize(&bars, "1 year (daily)").unwrap();
        assert_eq!(s.current_price, Some(110.0));
        assert!((s.change_pct.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(s.high, Some(115.0));
        assert_eq!(s.low, Some(95.0));
        assert_eq!(s.start_date, "2025-01-01");
        assert_eq!(s.end_date, "2025-01-02");
    }

    #[test]
    fn summarize_empty_window_is_none() {
        assert!(summarize(&[], "1 week (hourly)").is_none());
    }
}
