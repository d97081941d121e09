//! Three-tier response header container.
//!
//! # Tiers
//! - base: seeded by the upstream reply (replaced wholesale on ingestion)
//! - append: values added on top of base, never removing anything
//! - set: values that replace every existing value for their name
//!
//! # Merge
//! ```text
//! base ──▶ + append (per name, in call order) ──▶ set (drop name, insert values)
//! ```
//! The merge runs once, at finalize. Until then every tier is recorded
//! independently, so the order plugins ran in only matters within a tier.

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::GatewayResult;

#[derive(Debug, Clone, Default)]
pub struct PriorityHeader {
    header: HeaderMap,
    append_header: HeaderMap,
    set_header: HeaderMap,
}

impl PriorityHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base tier as currently recorded.
    pub fn headers(&self) -> &HeaderMap {
        &self.header
    }

    /// First base value for `name`, if it is valid UTF-8.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.header.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn base_mut(&mut self) -> &mut HeaderMap {
        &mut self.header
    }

    /// Swap the base tier for `header`. Append and set tiers are untouched.
    pub fn replace_base(&mut self, header: HeaderMap) {
        self.header = header;
    }

    /// Additive tier.
    pub fn appended(&self) -> &HeaderMap {
        &self.append_header
    }

    /// Overriding tier.
    pub fn overrides(&self) -> &HeaderMap {
        &self.set_header
    }

    /// Queue `value` to be added to `name` at finalize.
    pub fn add_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.append_header.append(name, value);
    }

    /// Queue `value` as the only value of `name` at finalize.
    ///
    /// A later call for the same name replaces an earlier one.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.set_header.insert(name, value);
    }

    /// Queue one more overriding value for `name`, keeping earlier ones.
    ///
    /// Use this for names that legitimately repeat, such as `Set-Cookie`.
    pub fn append_set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.set_header.append(name, value);
    }

    pub fn try_add_header(&mut self, name: &str, value: &str) -> GatewayResult<()> {
        let (name, value) = parse_pair(name, value)?;
        self.add_header(name, value);
        Ok(())
    }

    pub fn try_set_header(&mut self, name: &str, value: &str) -> GatewayResult<()> {
        let (name, value) = parse_pair(name, value)?;
        self.set_header(name, value);
        Ok(())
    }

    pub fn try_append_set_header(&mut self, name: &str, value: &str) -> GatewayResult<()> {
        let (name, value) = parse_pair(name, value)?;
        self.append_set_header(name, value);
        Ok(())
    }

    /// Fold the append and set tiers into base and return the result.
    ///
    /// Both tiers are drained, so a second call only returns base.
    pub(crate) fn merge(&mut self) -> &mut HeaderMap {
        for (name, value) in &self.append_header {
            self.header.append(name.clone(), value.clone());
        }
        for name in self.set_header.keys() {
            self.header.remove(name);
        }
        for (name, value) in &self.set_header {
            self.header.append(name.clone(), value.clone());
        }
        self.append_header.clear();
        self.set_header.clear();
        &mut self.header
    }
}

fn parse_pair(name: &str, value: &str) -> GatewayResult<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.as_bytes())?;
    let value = HeaderValue::from_str(value)?;
    Ok((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values<'a>(map: &'a HeaderMap, name: &str) -> Vec<&'a str> {
        map.get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    #[test]
    fn test_append_keeps_base_first() {
        let mut header = PriorityHeader::new();
        header.base_mut().insert("x-a", HeaderValue::from_static("v1"));
        header.try_add_header("X-A", "v2").unwrap();
        header.try_add_header("x-a", "v3").unwrap();

        let merged = header.merge();
        assert_eq!(values(merged, "x-a"), vec!["v1", "v2", "v3"]);
    }

    #[test]
    fn test_override_keeps_every_appended_value() {
        let mut header = PriorityHeader::new();
        header.base_mut().insert("set-cookie", HeaderValue::from_static("upstream=1"));
        header.try_set_header("Set-Cookie", "dropped=1").unwrap();
        header.try_set_header("Set-Cookie", "a=1").unwrap();
        header.try_append_set_header("set-cookie", "b=2").unwrap();

        let merged = header.merge();
        assert_eq!(values(merged, "set-cookie"), vec!["a=1", "b=2"]);
    }

    #[test]
    fn test_set_replaces_base_and_appended() {
        let mut header = PriorityHeader::new();
        header.base_mut().insert("x-b", HeaderValue::from_static("old"));
        header.try_add_header("x-b", "extra").unwrap();
        header.try_set_header("x-b", "first").unwrap();
        header.try_set_header("x-b", "new").unwrap();

        let merged = header.merge();
        assert_eq!(values(merged, "x-b"), vec!["new"]);
    }

    #[test]
    fn test_replace_base_preserves_tiers() {
        let mut header = PriorityHeader::new();
        header.try_set_header("x-c", "fixed").unwrap();
        header.try_add_header("x-trace", "abc").unwrap();

        let mut reply = HeaderMap::new();
        reply.insert("content-type", HeaderValue::from_static("text/plain"));
        header.replace_base(reply);

        let merged = header.merge();
        assert_eq!(values(merged, "x-c"), vec!["fixed"]);
        assert_eq!(values(merged, "x-trace"), vec!["abc"]);
        assert_eq!(values(merged, "content-type"), vec!["text/plain"]);
    }

    #[test]
    fn test_merge_drains_tiers() {
        let mut header = PriorityHeader::new();
        header.try_add_header("x-a", "v").unwrap();
        header.merge();
        assert!(header.appended().is_empty());

        let merged = header.merge();
        assert_eq!(values(merged, "x-a"), vec!["v"]);
    }

    #[test]
    fn test_invalid_input_rejected() {
        let mut header = PriorityHeader::new();
        assert!(header.try_add_header("bad name", "v").is_err());
        assert!(header.try_set_header("x-ok", "line\nbreak").is_err());
        assert!(header.appended().is_empty());
        assert!(header.overrides().is_empty());
    }
}
