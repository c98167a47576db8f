//! Attribute literal parsers
//!
//! Small, total parsers for the declarative attribute namespace. Poll
//! durations stay lenient on purpose: an unparseable literal falls back to
//! one second rather than failing the whole resolution.

use std::time::Duration;

use tracing::warn;

/// Fallback when a poll duration literal cannot be parsed
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Strip the declarative prefix from an attribute name
///
/// Recognizes both `async-*` and `data-async-*`; returns the remainder, or
/// `None` for attributes outside the namespace.
pub fn strip_namespace(attr: &str) -> Option<&str> {
    attr.strip_prefix("data-async-")
        .or_else(|| attr.strip_prefix("async-"))
}

/// Convert a dash-case remainder to its camel-style config key
///
/// `render-method` becomes `renderMethod`.
pub fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Parse a poll duration literal
///
/// Accepts a bare number (seconds), `Nms` (milliseconds), or `Ns`
/// (seconds). Anything else, including zero or negative values, falls
/// back to [`DEFAULT_POLL_INTERVAL`]: the resulting interval is always
/// positive so the poll loop can never spin hot.
pub fn parse_poll_interval(raw: &str) -> Duration {
    let raw = raw.trim();
    let millis = if let Ok(seconds) = raw.parse::<f64>() {
        Some(seconds * 1000.0)
    } else if let Some(ms) = raw.strip_suffix("ms") {
        ms.trim().parse::<f64>().ok()
    } else if let Some(s) = raw.strip_suffix('s') {
        s.trim().parse::<f64>().ok().map(|seconds| seconds * 1000.0)
    } else {
        None
    };
    match millis {
        Some(ms) if ms.is_finite() && ms >= 1.0 => Duration::from_millis(ms as u64),
        _ => {
            warn!(literal = %raw, "parse_poll_interval: not a positive duration, defaulting to 1000ms");
            DEFAULT_POLL_INTERVAL
        }
    }
}

/// Parse a poll repeat-count literal
///
/// Returns `None` (unlimited) with a warning when the literal is not an
/// integer.
pub fn parse_poll_repeats(raw: &str) -> Option<u32> {
    match raw.trim().parse::<u32>() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!(literal = %raw, "parse_poll_repeats: not an integer, treating as unlimited");
            None
        }
    }
}
