//! # Waymark Test
//!
//! Test utilities for Waymark endpoints. Requests are dispatched without a
//! transport: build a request with [`TestRequest`], hand the dispatcher a
//! [`RecordingResponse`] and assert on what was written.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use waymark_test::{RecordingDiagnostics, RecordingResponse, TestRequest};
//!
//! #[tokio::test]
//! async fn test_get_user() {
//!     let diagnostics = Arc::new(RecordingDiagnostics::new());
//!     let dispatcher = Dispatcher::builder(config, handler)
//!         .diagnostics(diagnostics.clone())
//!         .build();
//!
//!     let request = TestRequest::get("/users/7").param("id", "7").build().unwrap();
//!     let response = Arc::new(RecordingResponse::new());
//!     dispatcher.dispatch(request, response.clone()).await.unwrap();
//!
//!     response.assert_status(StatusCode::OK).assert_sent_once();
//!     assert!(diagnostics.warnings().is_empty());
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/waymark-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod diagnostics;
mod error;
mod request;
mod response;

pub use diagnostics::RecordingDiagnostics;
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::{RecordingResponse, ResponseEvent};
