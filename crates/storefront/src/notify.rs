//! User-facing notifications.
//!
//! At most one toast is visible at a time: showing a toast dismisses the
//! pending one first. The stores push into a [`Toaster`]; the HTTP layer
//! delivers whatever is left as an `HX-Trigger` header (HTMX requests) or a
//! session flash (full-page redirects).

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{debug, trace};

use crate::models::keys;

/// Event name the frontend listens for in `HX-Trigger`.
pub const TOAST_EVENT: &str = "showToast";

/// Severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    /// CSS modifier class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A single notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Info,
            message: message.into(),
        }
    }

    /// `HX-Trigger` header value carrying this toast.
    ///
    /// Non-ASCII characters are JSON-escaped so the value is a valid header.
    #[must_use]
    pub fn hx_trigger(&self) -> Option<HeaderValue> {
        let mut payload = serde_json::Map::new();
        payload.insert(TOAST_EVENT.to_owned(), serde_json::to_value(self).ok()?);
        let json = serde_json::Value::Object(payload).to_string();
        HeaderValue::from_str(&escape_non_ascii(&json)).ok()
    }
}

/// Replace every non-ASCII character with its `\uXXXX` JSON escape.
fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0_u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

/// Single-slot notifier.
#[derive(Debug, Default)]
pub struct Toaster {
    current: Option<Toast>,
    shown: usize,
}

impl Toaster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dismiss the pending toast, then show `toast`.
    pub fn show(&mut self, toast: Toast) {
        if let Some(dismissed) = self.current.take() {
            trace!(message = %dismissed.message, "Dismissed toast");
        }
        self.current = Some(toast);
        self.shown += 1;
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.show(Toast::success(message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.show(Toast::error(message));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.show(Toast::info(message));
    }

    /// The visible toast.
    #[must_use]
    pub const fn current(&self) -> Option<&Toast> {
        self.current.as_ref()
    }

    /// Remove and return the visible toast.
    pub fn take(&mut self) -> Option<Toast> {
        self.current.take()
    }

    /// Number of toasts shown over this toaster's lifetime.
    #[must_use]
    pub const fn shown_count(&self) -> usize {
        self.shown
    }
}

// =============================================================================
// Flash messages
// =============================================================================

/// Store a toast to be shown on the next full page render.
pub async fn set_flash(session: &Session, toast: &Toast) {
    if let Err(e) = session.insert(keys::FLASH, toast).await {
        debug!(error = %e, "Failed to store flash toast");
    }
}

/// Take the pending flash toast, if any.
pub async fn take_flash(session: &Session) -> Option<Toast> {
    session.remove::<Toast>(keys::FLASH).await.ok().flatten()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_show_replaces_pending_toast() {
        let mut toaster = Toaster::new();
        toaster.success("Added");
        toaster.error("Out of stock");

        assert_eq!(toaster.shown_count(), 2);
        assert_eq!(toaster.current(), Some(&Toast::error("Out of stock")));
        assert_eq!(toaster.take(), Some(Toast::error("Out of stock")));
        assert!(toaster.current().is_none());
    }

    #[test]
    fn test_hx_trigger_escapes_non_ascii() {
        let header = Toast::info("Crème added").hx_trigger().unwrap();
        let value = header.to_str().unwrap();
        assert!(value.contains("\\u00e8"));

        let parsed: serde_json::Value = serde_json::from_str(value).unwrap();
        assert_eq!(parsed[TOAST_EVENT]["message"], "Crème added");
        assert_eq!(parsed[TOAST_EVENT]["kind"], "info");
    }
}
