//! Inbound cookie parsing.

use axum::http::header::{HeaderMap, COOKIE};

/// One `name=value` pair from a `Cookie` request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
}

impl Cookie {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Queryable view over every cookie the client sent.
#[derive(Debug, Clone, Default)]
pub struct CookiesHandler {
    cookies: Vec<Cookie>,
}

impl CookiesHandler {
    /// Parse all `Cookie` headers. Malformed pairs are skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let cookies = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|line| line.split(';'))
            .filter_map(parse_pair)
            .collect();
        Self { cookies }
    }

    /// First cookie with the given name.
    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.cookie(name).map(Cookie::value)
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }
}

fn parse_pair(pair: &str) -> Option<Cookie> {
    let (name, value) = pair.trim().split_once('=')?;
    let name = name.trim();
    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return None;
    }
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    Some(Cookie {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
}
