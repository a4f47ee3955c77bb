//! Finviz screener client.
//!
//! Builds a screener URL from filter id -> option id pairs, fetches the
//! result page and extracts the ticker symbols from the screener table. The
//! filter catalogue exposed to the AI prompts is static: the industry list
//! lives in prediction-core (it is shared with the analysis templates) and a
//! small set of fundamental filters is defined here.

use async_trait::async_trait;
use prediction_core::industries::{
    INDUSTRIES, INDUSTRY_FILTER_DESCRIPTION, INDUSTRY_FILTER_ID, INDUSTRY_FILTER_TITLE,
};
use prediction_core::{FilterInfo, FilterOption, PredictionError, Screener};
use regex::Regex;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

const BASE_URL: &str = "https://finviz.com/screener.ashx?v=111&ft=4";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Non-industry filter categories offered to the filter-selection prompt
const STATIC_FILTERS: &[(&str, &str, &str, &[(&str, &str)])] = &[
    (
        "cap",
        "Market Cap.",
        "Total market value of a company's outstanding shares.",
        &[
            ("cap_mega", "Mega ($200bln and more)"),
            ("cap_large", "Large ($10bln to $200bln)"),
            ("cap_mid", "Mid ($2bln to $10bln)"),
            ("cap_small", "Small ($300mln to $2bln)"),
            ("cap_micro", "Micro ($50mln to $300mln)"),
        ],
    ),
    (
        "sec",
        "Sector",
        "The sector which a stock belongs to.",
        &[
            ("sec_basicmaterials", "Basic Materials"),
            ("sec_communicationservices", "Communication Services"),
            ("sec_consumercyclical", "Consumer Cyclical"),
            ("sec_consumerdefensive", "Consumer Defensive"),
            ("sec_energy", "Energy"),
            ("sec_financial", "Financial"),
            ("sec_healthcare", "Healthcare"),
            ("sec_industrials", "Industrials"),
            ("sec_realestate", "Real Estate"),
            ("sec_technology", "Technology"),
            ("sec_utilities", "Utilities"),
        ],
    ),
    (
        "sh_avgvol",
        "Average Volume",
        "The average number of shares traded in a security per day.",
        &[
            ("sh_avgvol_o50", "Over 50K"),
            ("sh_avgvol_o100", "Over 100K"),
            ("sh_avgvol_o500", "Over 500K"),
            ("sh_avgvol_o1000", "Over 1M"),
        ],
    ),
    (
        "fa_div",
        "Dividend Yield",
        "The dividend income relative to the share price.",
        &[
            ("fa_div_none", "None (0%)"),
            ("fa_div_pos", "Positive (>0%)"),
            ("fa_div_high", "High (>5%)"),
            ("fa_div_veryhigh", "Very High (>10%)"),
        ],
    ),
];

#[derive(Clone)]
pub struct FinvizClient {
    client: Client,
}

impl Default for FinvizClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FinvizClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// Screener URL with the given filter option ids applied
    fn build_url(filters: &HashMap<String, String>) -> String {
        if filters.is_empty() {
            return BASE_URL.to_string();
        }
        let mut values: Vec<&str> = filters.values().map(String::as_str).collect();
        values.sort_unstable();
        format!("{}&f={}", BASE_URL, values.join("%2C"))
    }

    /// Ticker symbols from the screener table of a result page
    fn extract_tickers(html: &str) -> Vec<String> {
        static TAB_LINK: OnceLock<Regex> = OnceLock::new();
        let re = TAB_LINK.get_or_init(|| {
            Regex::new(r#"class="tab-link"[^>]*>([A-Z][A-Z0-9.\-]*)</a>"#)
                .expect("tab-link pattern is valid")
        });
        re.captures_iter(html)
            .map(|c| c[1].to_string())
            .collect()
    }
}

#[async_trait]
impl Screener for FinvizClient {
    fn filter_info(&self) -> Vec<FilterInfo> {
        let mut info: Vec<FilterInfo> = STATIC_FILTERS
            .iter()
            .map(|(id, name, description, _)| FilterInfo {
                id: id.to_string(),
                name: name.to_string(),
                description: description.to_string(),
            })
            .collect();
        info.push(FilterInfo {
            id: INDUSTRY_FILTER_ID.to_string(),
            name: INDUSTRY_FILTER_TITLE.to_string(),
            description: INDUSTRY_FILTER_DESCRIPTION.to_string(),
        });
        info
    }

    fn filter_options(&self, selected: &[String]) -> HashMap<String, Vec<FilterOption>> {
        let mut options = HashMap::new();
        for id in selected {
            let opts: Vec<FilterOption> = if id == INDUSTRY_FILTER_ID {
                INDUSTRIES
                    .iter()
                    .map(|(value, name)| to_option(id, value, name))
                    .collect()
            } else {
                match STATIC_FILTERS.iter().find(|entry| entry.0 == id.as_str()) {
                    Some((_, _, _, values)) => values
                        .iter()
                        .map(|(value, name)| to_option(id, value, name))
                        .collect(),
                    None => continue,
                }
            };
            options.insert(id.clone(), opts);
        }
        options
    }

    async fn run_screener(
        &self,
        filters: &HashMap<String, String>,
    ) -> Result<Vec<String>, PredictionError> {
        let url = Self::build_url(filters);
        tracing::info!(%url, "running screener");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PredictionError::Screener(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PredictionError::Screener(format!(
                "HTTP {} fetching screener results",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| PredictionError::Screener(e.to_string()))?;

        let tickers = Self::extract_tickers(&html);
        if tickers.is_empty() && !html.contains("screener-table") {
            return Err(PredictionError::Screener(
                "screener table not found in response".to_string(),
            ));
        }
        Ok(tickers)
    }
}

fn to_option(filter_id: &str, value: &str, display_name: &str) -> FilterOption {
    // Option ids carry the filter prefix; expose the bare value too for
    // prompt readability.
    let bare = value
        .strip_prefix(&format!("{filter_id}_"))
        .unwrap_or(value);
    FilterOption {
        id: value.to_string(),
        value: bare.to_string(),
        display_name: display_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_without_filters_is_base() {
        assert_eq!(FinvizClient::build_url(&HashMap::new()), BASE_URL);
    }

    #[test]
    fn url_joins_filter_values_encoded() {
        let mut filters = HashMap::new();
        filters.insert("ind".to_string(), "ind_biotechnology".to_string());
        filters.insert("cap".to_string(), "cap_large".to_string());
        let url = FinvizClient::build_url(&filters);
        assert_eq!(
            url,
            format!("{BASE_URL}&f=cap_large%2Cind_biotechnology")
        );
    }

    #[test]
    fn tickers_extracted_from_tab_links() {
        let html = r##"
            <tr id="screener-table">
            <a href="quote.ashx?t=AAPL" class="tab-link">AAPL</a>
            <a href="quote.ashx?t=BRK.B" class="tab-link">BRK.B</a>
            <a class="tab-link-nw" href="#">Apple Inc.</a>
            </tr>"##;
        assert_eq!(FinvizClient::extract_tickers(html), vec!["AAPL", "BRK.B"]);
    }

    #[test]
    fn industry_options_use_shared_catalogue() {
        let client = FinvizClient::new();
        let options = client.filter_options(&["ind".to_string()]);
        let industry = &options["ind"];
        assert!(industry.iter().any(|o| o.id == "ind_semiconductors"));
        assert!(industry
            .iter()
            .any(|o| o.display_name == "Semiconductors" && o.value == "semiconductors"));
    }

    #[test]
    fn unknown_filter_is_skipped() {
        let client = FinvizClient::new();
        let options = client.filter_options(&["nope".to_string()]);
        assert!(options.is_empty());
    }

    #[test]
    fn catalogue_includes_industry_filter() {
        let client = FinvizClient::new();
        let info = client.filter_info();
        assert!(info.iter().any(|f| f.id == "ind"));
        assert!(info.iter().any(|f| f.id == "cap"));
    }
}
