//! Pending response status.
//!
//! No range validation happens here; finalize decides what a code means.

/// Holds the status code and text a plugin or upstream reply decided on.
/// A code of zero means nobody decided yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusHandler {
    code: u16,
    text: String,
}

impl StatusHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a status; the last writer wins.
    pub fn set_status(&mut self, code: u16, text: impl Into<String>) {
        self.code = code;
        self.text = text.into();
    }

    /// Raw code, `0` when unset.
    pub fn status_code(&self) -> u16 {
        self.code
    }

    /// Status text, e.g. `"200 OK"`.
    pub fn status(&self) -> &str {
        &self.text
    }

    pub fn is_set(&self) -> bool {
        self.code != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_by_default() {
        let status = StatusHandler::new();
        assert_eq!(status.status_code(), 0);
        assert!(!status.is_set());
        assert_eq!(status.status(), "");
    }

    #[test]
    fn test_last_write_wins() {
        let mut status = StatusHandler::new();
        status.set_status(403, "403 Forbidden");
        status.set_status(999, "custom");
        assert_eq!(status.status_code(), 999);
        assert_eq!(status.status(), "custom");
    }
}
