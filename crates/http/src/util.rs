use encoding_rs::Encoding;
use hashbrown::HashMap;
use memchr::memmem::Finder;
use mime::Mime;
use smartstring::alias::String as SmartString;
use std::{str::FromStr, sync::LazyLock};

// common content-type values seen in practice, interned so that the
// frequent case skips mime parsing entirely
static CHARSET_CACHE: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut cache = HashMap::new();
    for content_type in [
        "text/html; charset=utf-8",
        "text/html;charset=utf-8",
        "text/plain; charset=utf-8",
        "text/plain;charset=utf-8",
        "text/xml; charset=utf-8",
        "application/json; charset=utf-8",
        "application/xml; charset=utf-8",
        "application/x-www-form-urlencoded; charset=utf-8",
    ] {
        cache.insert(content_type, "utf-8");
    }
    for content_type in [
        "text/html; charset=iso-8859-1",
        "text/html;charset=iso-8859-1",
        "text/plain; charset=iso-8859-1",
    ] {
        cache.insert(content_type, "iso-8859-1");
    }
    cache
});

static CHARSET_FINDER: LazyLock<Finder<'static>> = LazyLock::new(|| Finder::new(b"charset="));

/// An `Expect` header token this crate knows how to honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Expectation {
    Continue100,
    Processing102,
}

static EXPECTATIONS: LazyLock<HashMap<&'static str, Expectation>> = LazyLock::new(|| {
    let mut expectations = HashMap::new();
    expectations.insert("100-continue", Expectation::Continue100);
    expectations.insert("102-processing", Expectation::Processing102);
    expectations
});

/// Look a single `Expect` token up in the interned expectation table.
pub(crate) fn expectation(token: &str) -> Option<Expectation> {
    EXPECTATIONS
        .get(token.trim().to_ascii_lowercase().as_str())
        .copied()
}

/// Extract the `charset` parameter token from a content-type header
/// value. Interned common values first, then a [`Mime`] parse, then a
/// tolerant scan for misformatted values that mime rejects.
pub(crate) fn charset_token(content_type: &str) -> Option<SmartString> {
    let trimmed = content_type.trim();
    if let Some(token) = CHARSET_CACHE.get(trimmed.to_ascii_lowercase().as_str()) {
        return Some(SmartString::from(*token));
    }

    if let Ok(mime) = Mime::from_str(trimmed) {
        if let Some((_, value)) = mime.params().find(|(name, _)| name.as_str() == "charset") {
            return Some(SmartString::from(value.as_str()));
        }
    }

    let lower = trimmed.to_ascii_lowercase();
    let start = CHARSET_FINDER.find(lower.as_bytes())? + "charset=".len();
    let token = trimmed[start..]
        .split(';')
        .next()
        .map(|t| t.trim().trim_matches('"'))?;
    if token.is_empty() {
        None
    } else {
        Some(SmartString::from(token))
    }
}

/// Resolve a charset token to an [`Encoding`], if the label is one
/// encoding_rs recognizes.
pub(crate) fn encoding_for_charset(charset: &str) -> Option<&'static Encoding> {
    Encoding::for_label(charset.as_bytes())
}
