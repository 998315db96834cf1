//! Market Quote Lookup
//!
//! A pure fetch/parse utility: normalize free-text input to a US-listed
//! ticker, then fetch a snapshot quote from the upstream chart endpoint.
//! Nothing here is stateful beyond the HTTP client.
//!
//! US-only is enforced twice: known non-US suffixes are rejected during
//! normalization, and the fetched quote's exchange code must be a US
//! listing.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upstream exchange codes for US listings
const US_EXCHANGES: &[&str] = &[
    "NMS",  // NASDAQ Global Select
    "NGM",  // NASDAQ Global Market
    "NCM",  // NASDAQ Capital Market
    "NYQ",  // NYSE
    "NYS",  // NYSE (alt)
    "ASE",  // NYSE American (AMEX)
    "PCX",  // NYSE Arca (ETFs)
    "BATS", // Cboe BZX
    "CBOE", // Cboe
];

/// Obvious non-US listings, rejected by suffix
const NON_US_SUFFIXES: &[&str] = &[
    ".NS", ".BO", ".L", ".TO", ".HK", ".SS", ".SZ", ".T", ".AX", ".NZ",
    ".PA", ".DE", ".VI", ".SW", ".SA", ".MX", ".CO", ".MI", ".BR", ".OL",
];

/// Words to skip when guessing a ticker from plain English
const STOPWORDS: &[&str] = &[
    "PRICE", "TODAY", "NEWS", "TREND", "TRENDS", "AND", "OR", "THE", "A", "AN",
    "SHOW", "GIVE", "WHAT", "IS", "ARE", "FOR", "WITH", "OF", "ON", "TO", "IN",
    "PLEASE", "LATEST", "CURRENT", "UPDATE", "STOCK", "INFO",
];

/// Common company names and variants mapped to US tickers
fn alias(token: &str) -> Option<&'static str> {
    let mapped = match token {
        "APPLE" | "AAPL" => "AAPL",
        "MICROSOFT" | "MSFT" => "MSFT",
        "GOOGLE" | "ALPHABET" | "GOOGL" => "GOOGL",
        "GOOG" => "GOOG",
        "META" | "FACEBOOK" | "FB" => "META",
        "AMAZON" | "AMZN" => "AMZN",
        "TESLA" | "TSLA" => "TSLA",
        "NVIDIA" | "NVDA" => "NVDA",
        "NETFLIX" | "NFLX" => "NFLX",
        "ADOBE" | "ADBE" => "ADBE",
        "SALESFORCE" | "CRM" => "CRM",
        "ORACLE" | "ORCL" => "ORCL",
        "IBM" => "IBM",
        "INTEL" | "INTC" => "INTC",
        "AMD" => "AMD",
        "QUALCOMM" | "QCOM" => "QCOM",
        "BROADCOM" | "AVGO" => "AVGO",
        "CISCO" | "CSCO" => "CSCO",
        "MICRON" | "MU" => "MU",
        "ASML" => "ASML",
        "TSMC" | "TSM" => "TSM",
        "ARM" => "ARM",
        "JPMORGAN" | "JPM" => "JPM",
        "CITI" | "CITIGROUP" | "C" => "C",
        "GOLDMAN" | "GS" => "GS",
        "VISA" | "V" => "V",
        "MASTERCARD" | "MA" => "MA",
        "PAYPAL" | "PYPL" => "PYPL",
        "AMEX" | "AXP" => "AXP",
        "BERKSHIRE" | "BRKB" | "BRK-B" => "BRK-B",
        "BRKA" | "BRK-A" => "BRK-A",
        "WALMART" | "WMT" => "WMT",
        "COSTCO" | "COST" => "COST",
        "TARGET" | "TGT" => "TGT",
        "DISNEY" | "DIS" => "DIS",
        "NIKE" | "NKE" => "NKE",
        "STARBUCKS" | "SBUX" => "SBUX",
        "MCDONALDS" | "MCD" => "MCD",
        "CHIPOTLE" | "CMG" => "CMG",
        "COKE" | "KO" => "KO",
        "PEPSI" | "PEPSICO" | "PEP" => "PEP",
        "UBER" => "UBER",
        "LYFT" => "LYFT",
        "AIRBNB" | "ABNB" => "ABNB",
        "SHOPIFY" | "SHOP" => "SHOP",
        "EXXON" | "XOM" => "XOM",
        "CHEVRON" | "CVX" => "CVX",
        "BOEING" | "BA" => "BA",
        "CATERPILLAR" | "CAT" => "CAT",
        "FORD" | "F" => "F",
        "GM" => "GM",
        "RIVIAN" | "RIVN" => "RIVN",
        "ATT" | "T" => "T",
        "VERIZON" | "VZ" => "VZ",
        "T-MOBILE" | "TMUS" => "TMUS",
        "PFIZER" | "PFE" => "PFE",
        "MERCK" | "MRK" => "MRK",
        "MODERNA" | "MRNA" => "MRNA",
        "CROWDSTRIKE" | "CRWD" => "CRWD",
        "DATADOG" | "DDOG" => "DDOG",
        "MONGODB" | "MDB" => "MDB",
        "SNOWFLAKE" | "SNOW" => "SNOW",
        "COINBASE" | "COIN" => "COIN",
        "SPY" | "SP500" | "SPX" => "SPY",
        "QQQ" => "QQQ",
        "VOO" => "VOO",
        "VTI" => "VTI",
        _ => return None,
    };
    Some(mapped)
}

/// Quote lookup failures
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Only US-listed symbols are supported.")]
    NonUsListing,

    #[error("Unsupported ticker format (US symbols only).")]
    BadFormat,

    #[error("Unknown or non-US symbol. Try a US ticker like AAPL, MSFT, BRK-B.")]
    NonUsExchange,

    #[error("No real-time data found. The symbol may be inactive or delisted.")]
    NoData,

    #[error("quote service request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl IntoResponse for QuoteError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::BAD_REQUEST,
        };
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}

/// Normalize free-form input to an upstream-style US ticker
///
/// Strips `$`, whitespace and stray punctuation, rejects known non-US
/// suffixes, applies the alias table, converts dot class shares to dash
/// form (`BRK.B` -> `BRK-B`), and validates the final shape.
pub fn normalize_ticker(text: &str) -> Result<String, QuoteError> {
    let mut symbol: String = text
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
        .collect();

    for suffix in NON_US_SUFFIXES {
        if symbol.ends_with(suffix) {
            return Err(QuoteError::NonUsListing);
        }
    }

    if let Some(mapped) = alias(&symbol) {
        symbol = mapped.to_string();
    }

    if symbol.contains('.') {
        symbol = symbol.replace('.', "-");
    }

    if !valid_shape(&symbol) {
        return Err(QuoteError::BadFormat);
    }

    Ok(symbol)
}

/// `[A-Z0-9]{1,5}` core with an optional `-[A-Z]{1,2}` class suffix
fn valid_shape(symbol: &str) -> bool {
    let (core, class) = match symbol.split_once('-') {
        Some((core, class)) => (core, Some(class)),
        None => (symbol, None),
    };
    let core_ok = (1..=5).contains(&core.len())
        && core.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    let class_ok = class.map_or(true, |class| {
        (1..=2).contains(&class.len()) && class.chars().all(|c| c.is_ascii_uppercase())
    });
    core_ok && class_ok
}

fn tokens(message: &str) -> impl Iterator<Item = &str> {
    message
        .split(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '&' | '\'')))
        .filter(|t| !t.is_empty())
}

/// Pull a plausible US ticker or known alias out of free text
///
/// Precedence: `$TICKER`, then a class-share token (`BRK.B` / `BRK-B`),
/// then a known alias word, then any uppercase-ish token that looks like a
/// ticker and is not a stopword.
pub fn extract_first_ticker(message: &str) -> Option<String> {
    for token in message.split_whitespace() {
        if let Some(rest) = token.strip_prefix('$') {
            let symbol: String = rest
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
                .collect();
            if !symbol.is_empty() {
                return Some(symbol.to_uppercase());
            }
        }
    }

    for token in tokens(message) {
        let up = token.to_uppercase();
        let has_class = up
            .split_once(['.', '-'])
            .map(|(core, class)| {
                !core.is_empty() && (1..=2).contains(&class.len()) && class.chars().all(|c| c.is_ascii_alphabetic())
            })
            .unwrap_or(false);
        if has_class {
            return Some(up);
        }
    }

    for token in tokens(message) {
        let up = token.to_uppercase();
        if alias(&up).is_some() {
            return Some(up);
        }
    }

    for token in tokens(message) {
        let up = token.to_uppercase();
        if STOPWORDS.contains(&up.as_str()) {
            continue;
        }
        if valid_shape(&up) {
            return Some(up);
        }
    }

    None
}

/// Snapshot quote returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub price: Option<f64>,
    pub previous_close: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub change_pct: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    currency: Option<String>,
    exchange_name: Option<String>,
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    #[serde(default)]
    previous_close: Option<f64>,
    #[serde(default)]
    regular_market_day_high: Option<f64>,
    #[serde(default)]
    regular_market_day_low: Option<f64>,
}

/// HTTP client for the upstream chart endpoint
#[derive(Clone)]
pub struct QuoteClient {
    http: reqwest::Client,
    base_url: String,
}

impl QuoteClient {
    pub fn new() -> Self {
        Self::with_base_url("https://query1.finance.yahoo.com")
    }

    /// Point the client at a different host (used by tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetch a snapshot quote, rejecting unknown or non-US listings
    pub async fn get_quote(&self, ticker: &str) -> Result<Quote, QuoteError> {
        let url = format!("{}/v8/finance/chart/{ticker}", self.base_url);
        let response: ChartResponse = self
            .http
            .get(&url)
            .query(&[("range", "1d"), ("interval", "1d")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let meta = response
            .chart
            .result
            .and_then(|mut results| {
                if results.is_empty() {
                    None
                } else {
                    Some(results.remove(0).meta)
                }
            })
            .ok_or(QuoteError::NoData)?;

        let is_us = meta
            .exchange_name
            .as_deref()
            .map(|code| US_EXCHANGES.contains(&code))
            .unwrap_or(false);
        if !is_us {
            return Err(QuoteError::NonUsExchange);
        }

        let price = meta.regular_market_price;
        let previous_close = meta.chart_previous_close.or(meta.previous_close);
        if price.is_none() && previous_close.is_none() {
            return Err(QuoteError::NoData);
        }

        Ok(Quote {
            symbol: ticker.to_string(),
            currency: meta.currency,
            exchange: meta.exchange_name,
            price,
            previous_close,
            day_high: meta.regular_market_day_high,
            day_low: meta.regular_market_day_low,
            change_pct: safe_pct(price, previous_close),
        })
    }
}

impl Default for QuoteClient {
    fn default() -> Self {
        Self::new()
    }
}

fn safe_pct(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) if b != 0.0 => Some((a / b - 1.0) * 100.0),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub q: String,
}

/// `GET /api/quote?q=` - resolve free text to a ticker and fetch its quote
pub async fn get_quote(
    State(client): State<QuoteClient>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<Quote>, QuoteError> {
    let symbol = match normalize_ticker(&query.q) {
        Ok(symbol) => symbol,
        Err(QuoteError::NonUsListing) => return Err(QuoteError::NonUsListing),
        Err(_) => {
            let guessed = extract_first_ticker(&query.q).ok_or(QuoteError::BadFormat)?;
            normalize_ticker(&guessed)?
        }
    };
    let quote = client.get_quote(&symbol).await?;
    Ok(Json(quote))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_normalize_applies_aliases() {
        assert_eq!(normalize_ticker("apple").unwrap(), "AAPL");
        assert_eq!(normalize_ticker("TESLA").unwrap(), "TSLA");
        assert_eq!(normalize_ticker("msft").unwrap(), "MSFT");
    }

    #[test]
    fn test_normalize_strips_decoration() {
        assert_eq!(normalize_ticker("$AAPL").unwrap(), "AAPL");
        assert_eq!(normalize_ticker("  nvda  ").unwrap(), "NVDA");
    }

    #[test]
    fn test_normalize_class_shares_dot_to_dash() {
        assert_eq!(normalize_ticker("BRK.B").unwrap(), "BRK-B");
        assert_eq!(normalize_ticker("brk-b").unwrap(), "BRK-B");
    }

    #[test]
    fn test_normalize_rejects_non_us_suffixes() {
        assert!(matches!(
            normalize_ticker("RELIANCE.NS"),
            Err(QuoteError::NonUsListing)
        ));
        assert!(matches!(normalize_ticker("VOD.L"), Err(QuoteError::NonUsListing)));
    }

    #[test]
    fn test_normalize_rejects_bad_shapes() {
        assert!(matches!(normalize_ticker("TOOLONGSYM"), Err(QuoteError::BadFormat)));
        assert!(matches!(normalize_ticker(""), Err(QuoteError::BadFormat)));
        assert!(matches!(normalize_ticker("AB-CDE"), Err(QuoteError::BadFormat)));
    }

    #[test]
    fn test_extract_prefers_dollar_prefix() {
        assert_eq!(
            extract_first_ticker("what about $MSFT vs apple").as_deref(),
            Some("MSFT")
        );
    }

    #[test]
    fn test_extract_class_share_token() {
        assert_eq!(
            extract_first_ticker("thoughts on brk.b today").as_deref(),
            Some("BRK.B")
        );
    }

    #[test]
    fn test_extract_alias_word() {
        assert_eq!(
            extract_first_ticker("show me the latest on tesla please").as_deref(),
            Some("TESLA")
        );
    }

    #[test]
    fn test_extract_skips_stopwords() {
        assert_eq!(
            extract_first_ticker("what is the price of AMD today").as_deref(),
            Some("AMD")
        );
    }

    #[test]
    fn test_extract_nothing_plausible() {
        assert_eq!(extract_first_ticker(""), None);
    }

    fn chart_body(exchange: &str, price: f64, prev: f64) -> serde_json::Value {
        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": {
                        "currency": "USD",
                        "exchangeName": exchange,
                        "regularMarketPrice": price,
                        "chartPreviousClose": prev,
                        "regularMarketDayHigh": price + 1.0,
                        "regularMarketDayLow": prev - 1.0
                    }
                }],
                "error": null
            }
        })
    }

    #[tokio::test]
    async fn test_get_quote_parses_meta_and_computes_change() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body("NMS", 110.0, 100.0)))
            .mount(&server)
            .await;

        let client = QuoteClient::with_base_url(server.uri());
        let quote = client.get_quote("AAPL").await.unwrap();

        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.exchange.as_deref(), Some("NMS"));
        assert_eq!(quote.price, Some(110.0));
        let change = quote.change_pct.unwrap();
        assert!((change - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_get_quote_rejects_non_us_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/SAP"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body("GER", 100.0, 99.0)))
            .mount(&server)
            .await;

        let client = QuoteClient::with_base_url(server.uri());
        assert!(matches!(
            client.get_quote("SAP").await,
            Err(QuoteError::NonUsExchange)
        ));
    }

    #[tokio::test]
    async fn test_get_quote_empty_result_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/ZZZZ"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chart": { "result": null, "error": { "code": "Not Found" } }
            })))
            .mount(&server)
            .await;

        let client = QuoteClient::with_base_url(server.uri());
        assert!(matches!(client.get_quote("ZZZZ").await, Err(QuoteError::NoData)));
    }
}
