// src/post.rs
//! Input boundary: raw post JSON from the ingestion service → clean [`PostRecord`]s.
//!
//! Upstream is inconsistent about shapes (`mentioned_stocks` arrives either as a
//! list or as a JSON-encoded string, timestamps as RFC 3339, naive ISO or unix
//! seconds, keys in camelCase or snake_case). All of that is absorbed here so the
//! scorers only ever see a `BTreeSet<Ticker>` and an `Option<DateTime<Utc>>`.
//!
//! Nothing in this module fails a batch because of one record: unusable fields
//! degrade to their least favorable value and are counted in [`PostBatch`].

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

use crate::error::RankError;

static TICKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9.\-]{0,9}$").expect("ticker regex"));

/// Normalized stock symbol (uppercase, no `$`, at most 10 chars).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Trim, drop a leading cashtag `$`, uppercase and validate.
    pub fn parse(raw: &str) -> Option<Self> {
        let t = raw.trim();
        let t = t.strip_prefix('$').unwrap_or(t).to_ascii_uppercase();
        TICKER_RE.is_match(&t).then_some(Self(t))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A post as the engine sees it. Read-only input; the engine never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: String,
    pub subreddit: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub content: Option<String>,
    /// Vote count, may be negative.
    pub score: i64,
    pub num_comments: u64,
    pub mentioned_stocks: BTreeSet<Ticker>,
    pub primary_stock: Option<Ticker>,
    /// Original publication time. `None` when missing or unparsable.
    pub posted_at: Option<DateTime<Utc>>,
}

impl PostRecord {
    pub fn new(
        id: impl Into<String>,
        score: i64,
        num_comments: u64,
        posted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            subreddit: None,
            title: None,
            author: None,
            url: None,
            content: None,
            score,
            num_comments,
            mentioned_stocks: BTreeSet::new(),
            primary_stock: None,
            posted_at,
        }
    }

    /// Attach stock mentions; symbols that fail [`Ticker::parse`] are dropped.
    pub fn with_stocks(mut self, mentioned: &[&str], primary: Option<&str>) -> Self {
        self.mentioned_stocks = mentioned.iter().filter_map(|s| Ticker::parse(s)).collect();
        self.primary_stock = primary.and_then(Ticker::parse);
        self
    }
}

/// Which fields of a record had to be replaced by worst-case values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Degradation {
    pub timestamp: bool,
    pub stocks: bool,
}

impl Degradation {
    pub fn any(&self) -> bool {
        self.timestamp || self.stocks
    }
}

/// A parsed batch plus per-record diagnostics collected at the boundary.
#[derive(Debug, Clone, Default)]
pub struct PostBatch {
    pub posts: Vec<PostRecord>,
    /// Elements skipped entirely (not an object, or no usable `id`).
    pub malformed: usize,
    pub degraded_timestamps: usize,
    pub degraded_stocks: usize,
}

/// `mentioned_stocks` as it may arrive on the wire.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StocksWire {
    List(Vec<Value>),
    Encoded(String),
    Other(Value),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPost {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    subreddit: Option<Value>,
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    author: Option<Value>,
    #[serde(default)]
    url: Option<Value>,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    score: Option<Value>,
    #[serde(default, alias = "num_comments")]
    num_comments: Option<Value>,
    #[serde(default, alias = "mentioned_stocks")]
    mentioned_stocks: Option<StocksWire>,
    #[serde(default, alias = "primary_stock")]
    primary_stock: Option<Value>,
    #[serde(default, alias = "posted_at")]
    posted_at: Option<Value>,
}

/// Parse a whole batch. Fails only when `value` is not an array.
pub fn parse_batch(value: Value) -> Result<PostBatch, RankError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(RankError::InvalidInput(format!(
                "expected an array of posts, got {}",
                json_kind(&other)
            )))
        }
    };

    let mut batch = PostBatch {
        posts: Vec::with_capacity(items.len()),
        ..PostBatch::default()
    };

    for item in items {
        match parse_post(item) {
            Some((post, deg)) => {
                if deg.any() {
                    debug!(
                        target: "feed",
                        id = %anon_id(&post.id),
                        timestamp = deg.timestamp,
                        stocks = deg.stocks,
                        "degraded post record"
                    );
                }
                batch.degraded_timestamps += usize::from(deg.timestamp);
                batch.degraded_stocks += usize::from(deg.stocks);
                batch.posts.push(post);
            }
            None => batch.malformed += 1,
        }
    }

    Ok(batch)
}

/// Keys the backend sends in both spellings. When a record carries both, the
/// camelCase one wins.
const KEY_SPELLINGS: [(&str, &str); 4] = [
    ("numComments", "num_comments"),
    ("mentionedStocks", "mentioned_stocks"),
    ("primaryStock", "primary_stock"),
    ("postedAt", "posted_at"),
];

/// Parse a single element. `None` means the element is unusable as a post.
pub fn parse_post(value: Value) -> Option<(PostRecord, Degradation)> {
    let Value::Object(mut map) = value else {
        return None;
    };
    for (camel, snake) in KEY_SPELLINGS {
        if map.contains_key(camel) {
            map.remove(snake);
        }
    }
    let raw: RawPost = serde_json::from_value(Value::Object(map)).ok()?;

    let id = match raw.id? {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    let mut deg = Degradation::default();

    // missing and unparsable both leave the post undated
    let posted_at = raw.posted_at.as_ref().and_then(parse_timestamp);
    deg.timestamp = posted_at.is_none();

    let (mentioned_stocks, stocks_degraded) = parse_stocks(raw.mentioned_stocks);
    deg.stocks = stocks_degraded;

    let post = PostRecord {
        id,
        subreddit: text(raw.subreddit),
        title: text(raw.title),
        author: text(raw.author),
        url: text(raw.url),
        content: text(raw.content),
        score: raw.score.as_ref().and_then(lenient_i64).unwrap_or(0),
        num_comments: raw
            .num_comments
            .as_ref()
            .and_then(lenient_i64)
            .map(|n| n.max(0) as u64)
            .unwrap_or(0),
        mentioned_stocks,
        primary_stock: text(raw.primary_stock).as_deref().and_then(Ticker::parse),
        posted_at,
    };

    Some((post, deg))
}

/// Epoch magnitudes at or above this are milliseconds (1e11 s is past year 5000).
const EPOCH_MILLIS_FROM: i64 = 100_000_000_000;

/// Latest year accepted from any format; anything later is treated as garbage.
const MAX_YEAR: i32 = 9999;

/// Accepts RFC 3339, naive ISO-8601 (read as UTC), unix seconds and unix
/// milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => from_epoch_int(i),
            None => n.as_f64().and_then(from_epoch_float),
        },
        _ => None,
    };
    parsed.filter(|dt| dt.year() <= MAX_YEAR)
}

fn from_epoch_int(raw: i64) -> Option<DateTime<Utc>> {
    match raw.checked_abs() {
        Some(abs) if abs < EPOCH_MILLIS_FROM => DateTime::from_timestamp(raw, 0),
        _ => DateTime::from_timestamp_millis(raw),
    }
}

fn from_epoch_float(raw: f64) -> Option<DateTime<Utc>> {
    if !raw.is_finite() {
        return None;
    }
    let secs = if raw.abs() >= EPOCH_MILLIS_FROM as f64 {
        raw / 1_000.0
    } else {
        raw
    };
    let whole = secs.floor();
    let nanos = (((secs - whole) * 1e9) as u32).min(999_999_999);
    DateTime::from_timestamp(whole as i64, nanos)
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    s.parse::<i64>().ok().and_then(from_epoch_int)
}

fn parse_stocks(wire: Option<StocksWire>) -> (BTreeSet<Ticker>, bool) {
    match wire {
        None => (BTreeSet::new(), false),
        Some(StocksWire::List(items)) => tickers_from_list(&items),
        Some(StocksWire::Encoded(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return (BTreeSet::new(), false);
            }
            match serde_json::from_str::<Vec<Value>>(s) {
                Ok(items) => tickers_from_list(&items),
                Err(_) => (BTreeSet::new(), true),
            }
        }
        Some(StocksWire::Other(_)) => (BTreeSet::new(), true),
    }
}

fn tickers_from_list(items: &[Value]) -> (BTreeSet<Ticker>, bool) {
    let mut out = BTreeSet::new();
    let mut degraded = false;
    for it in items {
        match it.as_str().and_then(Ticker::parse) {
            Some(t) => {
                out.insert(t);
            }
            None => degraded = true,
        }
    }
    (out, degraded)
}

fn text(v: Option<Value>) -> Option<String> {
    match v {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn lenient_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Short stable hash so logs can correlate a record without exposing it.
pub(crate) fn anon_id(id: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(id.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tickers(set: &BTreeSet<Ticker>) -> Vec<&str> {
        set.iter().map(Ticker::as_str).collect()
    }

    #[test]
    fn ticker_normalization() {
        assert_eq!(Ticker::parse(" $tsla ").unwrap().as_str(), "TSLA");
        assert_eq!(Ticker::parse("BRK.B").unwrap().as_str(), "BRK.B");
        assert!(Ticker::parse("").is_none());
        assert!(Ticker::parse("1ABC").is_none());
        assert!(Ticker::parse("WAYTOOLONGTICKER").is_none());
    }

    #[test]
    fn stocks_as_list_or_encoded_string() {
        let (a, da) = parse_stocks(Some(StocksWire::List(vec![json!("AAPL"), json!("tsla")])));
        assert_eq!(tickers(&a), vec!["AAPL", "TSLA"]);
        assert!(!da);

        let (b, db) = parse_stocks(Some(StocksWire::Encoded(r#"["GME","AMC"]"#.into())));
        assert_eq!(tickers(&b), vec!["AMC", "GME"]);
        assert!(!db);
    }

    #[test]
    fn garbage_stocks_degrade_to_empty() {
        let (a, da) = parse_stocks(Some(StocksWire::Encoded("not json".into())));
        assert!(a.is_empty() && da);

        let (b, db) = parse_stocks(Some(StocksWire::Other(json!({"AAPL": true}))));
        assert!(b.is_empty() && db);

        let (c, dc) = parse_stocks(Some(StocksWire::Encoded("   ".into())));
        assert!(c.is_empty() && !dc);
    }

    #[test]
    fn timestamp_formats() {
        let want = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp(&json!("2024-05-01T12:00:00Z")), Some(want));
        assert_eq!(parse_timestamp(&json!("2024-05-01T14:00:00+02:00")), Some(want));
        assert_eq!(parse_timestamp(&json!("2024-05-01T12:00:00")), Some(want));
        assert_eq!(parse_timestamp(&json!("2024-05-01 12:00:00.000000")), Some(want));
        assert_eq!(parse_timestamp(&json!(want.timestamp())), Some(want));
        assert_eq!(parse_timestamp(&json!(want.timestamp() as f64)), Some(want));
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
        assert_eq!(parse_timestamp(&json!(true)), None);
    }

    #[test]
    fn millisecond_epochs_are_not_far_future() {
        let want = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp(&json!(want.timestamp_millis())), Some(want));
        assert_eq!(
            parse_timestamp(&json!(want.timestamp_millis().to_string())),
            Some(want)
        );
        assert_eq!(
            parse_timestamp(&json!(want.timestamp_millis() as f64 + 500.0)),
            Some(want + chrono::Duration::milliseconds(500))
        );
        // microseconds land far past any plausible year
        assert_eq!(parse_timestamp(&json!(want.timestamp_micros())), None);
        assert_eq!(parse_timestamp(&json!("+56952-08-25T00:00:00Z")), None);
    }

    #[test]
    fn both_key_spellings_keep_the_record() {
        let (p, deg) = parse_post(json!({
            "id": "dup",
            "score": 3,
            "numComments": 8,
            "num_comments": 1,
            "postedAt": "2024-05-01T12:00:00Z",
            "posted_at": "garbage",
            "mentioned_stocks": ["AMD"],
            "mentionedStocks": ["NVDA"]
        }))
        .unwrap();
        assert_eq!(p.num_comments, 8);
        assert!(p.posted_at.is_some());
        assert_eq!(tickers(&p.mentioned_stocks), vec!["NVDA"]);
        assert!(!deg.any());

        let batch = parse_batch(json!([
            {"id": "x", "score": 5, "numComments": 2, "num_comments": 2}
        ]))
        .unwrap();
        assert_eq!(batch.malformed, 0);
        assert_eq!(batch.posts.len(), 1);
    }

    #[test]
    fn missing_and_unparsable_timestamps_count_alike() {
        let batch = parse_batch(json!([
            {"id": "missing", "score": 5},
            {"id": "null", "score": 5, "postedAt": null},
            {"id": "garbage", "score": 5, "postedAt": "soon"},
            {"id": "dated", "score": 5, "postedAt": "2024-05-01T12:00:00Z"}
        ]))
        .unwrap();
        assert_eq!(batch.degraded_timestamps, 3);
        assert_eq!(batch.posts.iter().filter(|p| p.posted_at.is_none()).count(), 3);
    }

    #[test]
    fn snake_case_backend_keys_are_accepted() {
        let (p, deg) = parse_post(json!({
            "id": "abc",
            "score": 12,
            "num_comments": 4,
            "mentioned_stocks": "[\"NVDA\"]",
            "primary_stock": "NVDA",
            "posted_at": "2024-05-01T12:00:00"
        }))
        .unwrap();
        assert_eq!(p.num_comments, 4);
        assert_eq!(tickers(&p.mentioned_stocks), vec!["NVDA"]);
        assert_eq!(p.primary_stock.as_ref().map(Ticker::as_str), Some("NVDA"));
        assert!(p.posted_at.is_some());
        assert!(!deg.any());
    }

    #[test]
    fn lenient_counts() {
        let (p, _) = parse_post(json!({"id": 7, "score": "15", "numComments": -3})).unwrap();
        assert_eq!(p.id, "7");
        assert_eq!(p.score, 15);
        assert_eq!(p.num_comments, 0);
    }

    #[test]
    fn batch_must_be_an_array() {
        let err = parse_batch(json!({"posts": []})).unwrap_err();
        assert!(matches!(err, RankError::InvalidInput(_)));
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn malformed_elements_are_skipped_not_fatal() {
        let batch = parse_batch(json!([
            {"id": "ok", "score": 5, "numComments": 5, "postedAt": "2024-05-01T12:00:00Z"},
            "just a string",
            {"title": "no id"},
            {"id": "bad-ts", "score": 5, "postedAt": "??", "mentionedStocks": 42}
        ]))
        .unwrap();
        assert_eq!(batch.posts.len(), 2);
        assert_eq!(batch.malformed, 2);
        assert_eq!(batch.degraded_timestamps, 1);
        assert_eq!(batch.degraded_stocks, 1);
        assert!(batch.posts[1].posted_at.is_none());
        assert!(batch.posts[1].mentioned_stocks.is_empty());
    }

    #[test]
    fn anon_id_is_short_and_stable() {
        let a = anon_id("t3_abc");
        assert_eq!(a.len(), 12);
        assert_eq!(a, anon_id("t3_abc"));
        assert_ne!(a, anon_id("t3_abd"));
    }
}
