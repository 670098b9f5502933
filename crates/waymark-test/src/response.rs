//! Recording response writer.

use http::StatusCode;
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use tokio::sync::watch;
use waymark_core::{BoxFuture, CookieOptions, ResponseWriter};

/// One call made on a [`RecordingResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    /// `set_status` was called.
    SetStatus(StatusCode),
    /// `send` was called.
    Send(Option<Value>),
    /// `set_cookie` was called.
    SetCookie {
        /// Cookie name.
        name: String,
        /// Cookie value.
        value: String,
        /// Cookie attributes, if any.
        options: Option<CookieOptions>,
    },
    /// `clear_cookie` was called.
    ClearCookie(String),
    /// `redirect` was called.
    Redirect {
        /// Redirect status.
        status: StatusCode,
        /// Target URL.
        url: String,
    },
}

#[derive(Debug, Default)]
struct RecordingState {
    events: Vec<ResponseEvent>,
    sent: bool,
}

/// A [`ResponseWriter`] that records every call for later assertions.
///
/// Unlike a real transport it never drops calls made after the response
/// was sent, so tests can check that nothing wrote twice.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use serde_json::json;
/// use waymark_core::ResponseWriter;
/// use waymark_test::RecordingResponse;
///
/// let response = RecordingResponse::new();
/// response.set_status(StatusCode::CREATED);
/// response.send(Some(json!({ "id": 1 })));
///
/// response
///     .assert_status(StatusCode::CREATED)
///     .assert_json_eq(&json!({ "id": 1 }));
/// ```
pub struct RecordingResponse {
    state: Mutex<RecordingState>,
    closed: watch::Sender<bool>,
}

impl Default for RecordingResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingResponse {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            state: Mutex::new(RecordingState::default()),
            closed,
        }
    }

    /// Creates a recorder whose headers were already sent by someone else.
    pub fn already_sent() -> Self {
        let response = Self::new();
        response.state.lock().sent = true;
        response
    }

    /// Simulates the client disconnecting.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    /// Returns every recorded call in order.
    #[must_use]
    pub fn events(&self) -> Vec<ResponseEvent> {
        self.state.lock().events.clone()
    }

    /// Returns true when no call was recorded.
    #[must_use]
    pub fn is_untouched(&self) -> bool {
        self.state.lock().events.is_empty()
    }

    /// Returns the last status set, through `set_status` or `redirect`.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.state.lock().events.iter().rev().find_map(|event| match event {
            ResponseEvent::SetStatus(status) | ResponseEvent::Redirect { status, .. } => {
                Some(*status)
            }
            _ => None,
        })
    }

    /// Returns the body of the first `send`, if one happened.
    ///
    /// The outer `Option` is `None` when nothing was sent; the inner one is
    /// `None` for a bodiless send.
    #[must_use]
    pub fn sent_body(&self) -> Option<Option<Value>> {
        self.state.lock().events.iter().find_map(|event| match event {
            ResponseEvent::Send(body) => Some(body.clone()),
            _ => None,
        })
    }

    /// Returns the redirect target, if `redirect` was called.
    #[must_use]
    pub fn redirect_url(&self) -> Option<String> {
        self.state.lock().events.iter().find_map(|event| match event {
            ResponseEvent::Redirect { url, .. } => Some(url.clone()),
            _ => None,
        })
    }

    /// Returns the number of `send` and `redirect` calls.
    #[must_use]
    pub fn send_count(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|event| matches!(event, ResponseEvent::Send(_) | ResponseEvent::Redirect { .. }))
            .count()
    }

    /// Returns the value set for a cookie, if any.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.state.lock().events.iter().find_map(|event| match event {
            ResponseEvent::SetCookie {
                name: cookie,
                value,
                ..
            } if cookie == name => Some(value.clone()),
            _ => None,
        })
    }

    /// Returns whether a cookie was cleared.
    #[must_use]
    pub fn cookie_cleared(&self, name: &str) -> bool {
        self.state
            .lock()
            .events
            .iter()
            .any(|event| matches!(event, ResponseEvent::ClearCookie(cookie) if cookie == name))
    }

    // Assertion methods

    /// Asserts that the last status equals the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the status doesn't match or was never set.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status(),
            Some(expected),
            "Expected status {expected}, got {:?}",
            self.status()
        );
        self
    }

    /// Asserts that exactly one response was sent.
    ///
    /// # Panics
    ///
    /// Panics if the response was sent zero or several times.
    pub fn assert_sent_once(&self) -> &Self {
        assert_eq!(self.send_count(), 1, "events: {:?}", self.events());
        self
    }

    /// Asserts that nothing was written.
    ///
    /// # Panics
    ///
    /// Panics if any call was recorded.
    pub fn assert_untouched(&self) -> &Self {
        assert!(self.is_untouched(), "unexpected events: {:?}", self.events());
        self
    }

    /// Asserts that the sent JSON body matches the expected value.
    ///
    /// # Panics
    ///
    /// Panics if nothing was sent or the body doesn't match.
    pub fn assert_json_eq(&self, expected: &Value) -> &Self {
        let body = self
            .sent_body()
            .unwrap_or_else(|| panic!("nothing sent, events: {:?}", self.events()));
        assert_eq!(body.as_ref(), Some(expected), "JSON body mismatch");
        self
    }

    /// Asserts that a response was sent without a body.
    ///
    /// # Panics
    ///
    /// Panics if nothing was sent or a body was sent.
    pub fn assert_empty_body(&self) -> &Self {
        assert_eq!(self.sent_body(), Some(None), "events: {:?}", self.events());
        self
    }

    /// Asserts a redirect to the given URL.
    ///
    /// # Panics
    ///
    /// Panics if no redirect happened or the URL differs.
    pub fn assert_redirect(&self, status: StatusCode, url: &str) -> &Self {
        let redirect = ResponseEvent::Redirect {
            status,
            url: url.to_string(),
        };
        assert!(
            self.events().contains(&redirect),
            "Expected redirect {status} {url}, events: {:?}",
            self.events()
        );
        self
    }

    fn record(&self, event: ResponseEvent) {
        self.state.lock().events.push(event);
    }
}

impl ResponseWriter for RecordingResponse {
    fn headers_sent(&self) -> bool {
        self.state.lock().sent
    }

    fn set_status(&self, status: StatusCode) {
        self.record(ResponseEvent::SetStatus(status));
    }

    fn send(&self, body: Option<Value>) {
        let mut state = self.state.lock();
        state.events.push(ResponseEvent::Send(body));
        state.sent = true;
    }

    fn set_cookie(&self, name: &str, value: &str, options: Option<&CookieOptions>) {
        self.record(ResponseEvent::SetCookie {
            name: name.to_string(),
            value: value.to_string(),
            options: options.cloned(),
        });
    }

    fn clear_cookie(&self, name: &str) {
        self.record(ResponseEvent::ClearCookie(name.to_string()));
    }

    fn redirect(&self, status: StatusCode, url: &str) {
        let mut state = self.state.lock();
        state.events.push(ResponseEvent::Redirect {
            status,
            url: url.to_string(),
        });
        state.sent = true;
    }

    fn closed(&self) -> BoxFuture<'static, ()> {
        let mut receiver = self.closed.subscribe();
        Box::pin(async move {
            let _ = receiver.wait_for(|closed| *closed).await;
        })
    }
}

impl fmt::Debug for RecordingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RecordingResponse")
            .field("events", &state.events)
            .field("sent", &state.sent)
            .field("closed", &*self.closed.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_records_in_order() {
        let response = RecordingResponse::new();
        response.set_cookie("a", "1", None);
        response.clear_cookie("b");
        response.set_status(StatusCode::OK);
        response.send(Some(json!("hi")));

        assert_eq!(
            response.events(),
            vec![
                ResponseEvent::SetCookie {
                    name: "a".to_string(),
                    value: "1".to_string(),
                    options: None,
                },
                ResponseEvent::ClearCookie("b".to_string()),
                ResponseEvent::SetStatus(StatusCode::OK),
                ResponseEvent::Send(Some(json!("hi"))),
            ]
        );
        assert_eq!(response.cookie("a").as_deref(), Some("1"));
        assert!(response.cookie_cleared("b"));
        assert!(response.headers_sent());
    }

    #[test]
    fn test_redirect() {
        let response = RecordingResponse::new();
        response.redirect(StatusCode::FOUND, "/login");

        response
            .assert_status(StatusCode::FOUND)
            .assert_redirect(StatusCode::FOUND, "/login")
            .assert_sent_once();
        assert_eq!(response.redirect_url().as_deref(), Some("/login"));
    }

    #[test]
    fn test_already_sent() {
        let response = RecordingResponse::already_sent();
        assert!(response.headers_sent());
        response.assert_untouched();
    }

    #[test]
    fn test_empty_body() {
        let response = RecordingResponse::new();
        response.set_status(StatusCode::NO_CONTENT);
        response.send(None);
        response.assert_empty_body();
    }

    #[tokio::test]
    async fn test_closed() {
        let response = Arc::new(RecordingResponse::new());
        let closed = response.closed();
        let closer = Arc::clone(&response);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            closer.close();
        });
        tokio::time::timeout(Duration::from_secs(1), closed)
            .await
            .unwrap();
    }
}
