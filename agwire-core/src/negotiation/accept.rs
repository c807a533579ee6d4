//! Accept / Content-Type header grammar (RFC 7231 media ranges).

use std::collections::BTreeMap;

use super::NegotiationError;

/// One media range from an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptType {
    /// Lowercased `main/sub`, possibly containing `*`.
    pub media_type: String,
    /// Quality factor in `[0, 1]`, truncated to three decimals.
    pub quality: f64,
    /// Parameters other than `q`.
    pub parameters: BTreeMap<String, String>,
}

impl AcceptType {
    /// Create an accept range without parameters.
    pub fn new(media_type: impl Into<String>, quality: f64) -> Self {
        Self {
            media_type: media_type.into(),
            quality,
            parameters: BTreeMap::new(),
        }
    }

    /// True for the global `*/*` range.
    pub fn is_global_wildcard(&self) -> bool {
        self.media_type == "*/*"
    }
}

/// Parse an `Accept` header into media ranges ordered by descending quality.
///
/// Entries with equal quality keep their header order. An empty header
/// yields a single `*/*` range.
pub fn parse_accept_header(header: &str) -> Result<Vec<AcceptType>, NegotiationError> {
    if header.is_empty() {
        return Ok(vec![AcceptType::new("*/*", 1.0)]);
    }

    let mut accept_types = header
        .split(',')
        .map(|part| {
            parse_accept_type(part.trim()).map_err(|reason| {
                NegotiationError::InvalidAcceptHeader(format!(
                    "invalid accept type '{}': {}",
                    part.trim(),
                    reason
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Vec::sort_by is stable
    accept_types.sort_by(|a, b| {
        b.quality
            .partial_cmp(&a.quality)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(accept_types)
}

fn parse_accept_type(s: &str) -> Result<AcceptType, String> {
    if s.is_empty() {
        return Err("empty accept type".to_string());
    }

    let mut segments = s.split(';');
    let media_type = segments
        .next()
        .map(|t| t.trim().to_ascii_lowercase())
        .unwrap_or_default();
    if media_type.is_empty() {
        return Err("empty media type".to_string());
    }
    if !is_valid_media_type(&media_type) {
        return Err(format!("invalid media type format: {media_type}"));
    }

    let mut accept = AcceptType::new(media_type, 1.0);

    for param in segments.map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = param
            .split_once('=')
            .ok_or_else(|| format!("invalid parameter format: {param}"))?;
        let key = key.trim();
        let value = value.trim().trim_matches('"');

        if key == "q" {
            accept.quality = parse_quality(value)?;
        } else {
            accept.parameters.insert(key.to_string(), value.to_string());
        }
    }

    Ok(accept)
}

/// Parse a q-value.
///
/// Out-of-range values are clamped into `[0, 1]`, except exactly `2.0`
/// which is rejected. Short non-numeric values degrade to `0`; long
/// malformed decimals are rejected.
pub(crate) fn parse_quality(s: &str) -> Result<f64, String> {
    let q = match s.parse::<f64>() {
        Ok(q) if !q.is_nan() => q,
        _ => {
            if s.contains('.') && s.len() > 10 {
                return Err(format!("invalid quality value format: {s}"));
            }
            return Ok(0.0);
        }
    };

    let q = if q < 0.0 {
        0.0
    } else if q > 1.0 {
        if q == 2.0 {
            return Err(format!("quality value {q} is out of range [0,1]"));
        }
        1.0
    } else {
        q
    };

    Ok((q * 1000.0).trunc() / 1000.0)
}

/// Parse a `Content-Type` style value into its base type and parameters.
///
/// Malformed parameters are skipped rather than rejected.
pub fn parse_media_type(
    media_type: &str,
) -> Result<(String, BTreeMap<String, String>), NegotiationError> {
    let mut segments = media_type.split(';');
    let base = segments.next().unwrap_or_default().trim();
    if !is_valid_media_type(base) {
        return Err(NegotiationError::InvalidAcceptHeader(format!(
            "invalid media type: {base}"
        )));
    }

    let params = segments
        .filter_map(|param| param.trim().split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().trim_matches('"').to_string()))
        .collect();

    Ok((base.to_string(), params))
}

/// Format a media type with parameters, quoting values that are not tokens.
pub fn format_media_type(media_type: &str, params: &BTreeMap<String, String>) -> String {
    let mut out = media_type.to_string();
    for (key, value) in params {
        out.push_str("; ");
        out.push_str(key);
        out.push('=');
        if needs_quoting(value) {
            out.push('"');
            out.push_str(value);
            out.push('"');
        } else {
            out.push_str(value);
        }
    }
    out
}

/// Wildcard-aware comparison of two `main/sub` media types.
pub fn match_media_types(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (Some((main_a, sub_a)), Some((main_b, sub_b))) = (a.split_once('/'), b.split_once('/'))
    else {
        return false;
    };
    if sub_a.contains('/') || sub_b.contains('/') {
        return false;
    }
    if main_a == "*" || main_b == "*" {
        return true;
    }
    main_a == main_b && (sub_a == "*" || sub_b == "*")
}

/// Base type of a media type string: parameters removed, trimmed and lowercased.
pub(crate) fn base_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub(crate) fn is_valid_media_type(media_type: &str) -> bool {
    match media_type.split_once('/') {
        Some((main, sub)) => !sub.contains('/') && is_token(main) && is_token(sub),
        None => false,
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_token_char)
}

// RFC 7230 tchar
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`' | '|' | '~'
        )
}

fn needs_quoting(value: &str) -> bool {
    !value.chars().all(is_token_char)
}

#[cfg(test)]
#[path = "accept_tests.rs"]
mod tests;
