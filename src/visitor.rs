//! Privacy-preserving visitor identification for analytics
//!
//! For every origin that reports a page view, visitors get a new id every
//! UTC day. IPs and user agents are never shipped, only the digest derived
//! from them.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Render a calendar date as `Www Mmm DD YYYY`, e.g. `Wed Oct 14 2026`
pub fn date_string(date: NaiveDate) -> String {
    date.format("%a %b %d %Y").to_string()
}

/// Hex SHA-256 of date + origin + ip + user agent
pub fn visitor_id(date: NaiveDate, origin: &str, ip: &str, user_agent: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date_string(date).as_bytes());
    hasher.update(origin.as_bytes());
    hasher.update(ip.as_bytes());
    hasher.update(user_agent.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Derive a tag-safe service name from an origin: `https://dietcode.io` -> `dietcode-io`
pub fn service_from_origin(origin: &str) -> String {
    let host = match url::Url::parse(origin) {
        Ok(url) => url.host_str().map(str::to_string),
        Err(_) => None,
    };

    let host = host.unwrap_or_else(|| {
        origin
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(origin)
            .trim_end_matches('/')
            .to_string()
    });

    host.replace('.', "-")
}
