//! Attribution capture and tag packing.
//!
//! Right before every submit the form's hidden attribution inputs are
//! refreshed from the [`PageContext`], and, when a `contact[tags]` input is
//! present, short `key=value` tokens are appended to its comma-joined list so
//! that the attribution persists with the customer record.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::form::FormModel;

/// The comma-joined tag list input.
pub const TAGS_FIELD: &str = "contact[tags]";

const UTM_KEYS: [&str; 5] = [
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_content",
    "utm_term",
];

/// Facts about the page hosting the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageContext {
    query: Vec<(String, String)>,
    /// `document.referrer`, possibly empty.
    pub referrer: String,
    /// Full page URL.
    pub page_url: String,
    /// Capture time.
    pub timestamp: DateTime<Utc>,
    /// Product being viewed, on product pages.
    pub product_id: Option<String>,
    /// Selected variant, on product pages.
    pub variant_id: Option<String>,
}

impl PageContext {
    /// Builds a context for `page_url`. A URL that does not parse yields no
    /// query parameters.
    pub fn new(page_url: impl Into<String>, referrer: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        let page_url = page_url.into();
        let query = url::Url::parse(&page_url)
            .map(|url| url.query_pairs().into_owned().collect())
            .unwrap_or_default();
        Self {
            query,
            referrer: referrer.into(),
            page_url,
            timestamp,
            product_id: None,
            variant_id: None,
        }
    }

    /// A context for `page_url` with no referrer, captured now.
    pub fn from_url(page_url: impl Into<String>) -> Self {
        Self::new(page_url, "", Utc::now())
    }

    /// Sets the referrer.
    #[must_use]
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = referrer.into();
        self
    }

    /// Sets the product and variant identifiers.
    #[must_use]
    pub fn with_product(mut self, product_id: impl Into<String>, variant_id: Option<String>) -> Self {
        self.product_id = Some(product_id.into());
        self.variant_id = variant_id;
        self
    }

    /// The first value of query parameter `key`, or `""`.
    pub fn param(&self, key: &str) -> &str {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map_or("", |(_, v)| v.as_str())
    }

    /// The ISO-8601 capture time, millisecond precision, `Z` suffix.
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Writes the attribution facts into the plain and `contact[...]` hidden
/// inputs. Inputs are created only when the form opts in.
pub fn capture_attribution(model: &mut FormModel, ctx: &PageContext) {
    let create = model.config().attrib_create;
    let mut facts: Vec<(&str, String)> = UTM_KEYS
        .iter()
        .map(|key| (*key, ctx.param(key).to_string()))
        .collect();
    facts.push(("referrer", ctx.referrer.clone()));
    facts.push(("page_url", ctx.page_url.clone()));
    facts.push(("timestamp", ctx.timestamp_iso()));

    let mut written = 0;
    for (key, value) in &facts {
        if model.set_hidden(key, value, create) {
            written += 1;
        }
        if model.set_hidden(&format!("contact[{key}]"), value, create) {
            written += 1;
        }
    }
    tracing::trace!(written, "attribution captured");
}

/// Replaces commas with spaces, collapses whitespace and trims.
pub fn sanitize_tag_value(value: &str) -> String {
    value
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits a comma-joined tag list, dropping empty entries.
pub fn parse_tags(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn push_unique(tags: &mut Vec<String>, token: &str) {
    let token = token.trim();
    if !token.is_empty() && !tags.iter().any(|t| t == token) {
        tags.push(token.to_string());
    }
}

fn token(key: &str, value: &str, max_len: usize) -> String {
    let full = format!("{key}={}", sanitize_tag_value(value));
    full.chars().take(max_len).collect::<String>().trim_end().to_string()
}

/// Appends the attribution tokens for `ctx` to an existing tag list.
pub fn build_tags(existing: &str, ctx: &PageContext, max_len: usize) -> String {
    let mut tags = parse_tags(existing);

    for key in ["utm_source", "utm_medium", "utm_campaign"] {
        let value = ctx.param(key);
        if !value.is_empty() {
            push_unique(&mut tags, &token(key, value, max_len));
        }
    }

    if !ctx.referrer.is_empty() {
        let host = match url::Url::parse(&ctx.referrer) {
            Ok(url) => url.host_str().unwrap_or_default().to_string(),
            Err(_) => ctx.referrer.clone(),
        };
        push_unique(&mut tags, &token("ref", &host, max_len));
    }

    if let Ok(page) = url::Url::parse(&ctx.page_url) {
        push_unique(&mut tags, &token("page", page.path(), max_len));
    }

    if let Some(product) = ctx.product_id.as_deref().filter(|p| !p.is_empty()) {
        push_unique(&mut tags, &token("product", product, max_len));
    }
    if let Some(variant) = ctx.variant_id.as_deref().filter(|v| !v.is_empty()) {
        push_unique(&mut tags, &token("variant", variant, max_len));
    }

    tags.join(", ")
}

/// Packs attribution into the form's `contact[tags]` input.
///
/// Returns the new list, or `None` when packing is disabled or the form has
/// no tags input.
pub fn pack_tags(model: &mut FormModel, ctx: &PageContext, max_len: usize) -> Option<String> {
    if !model.config().pack_tags {
        return None;
    }
    let id = model.ensure_hidden(TAGS_FIELD, false)?;
    let existing = model.control(id)?.value.clone();
    let packed = build_tags(&existing, ctx, max_len);
    model.set_value(id, &packed);
    Some(packed)
}
