//! # Waymark Middleware
//!
//! Endpoint configuration and request dispatch for Waymark.
//!
//! ## Request Flow
//!
//! ```text
//! Request → pre middleware → input parsing → middleware → handler
//!                                                            ↓
//!        ResponseWriter ← cookies / mapping / redirect ← TerminalResponse
//! ```
//!
//! Every step receives the request's [`ParameterBag`] and resolves to a
//! [`MiddlewareOutcome`](waymark_core::MiddlewareOutcome): continue, continue
//! with extra parameters, or stop with a declared response.
//!
//! ## Key Types
//!
//! | Type                 | Purpose                                            |
//! |----------------------|----------------------------------------------------|
//! | [`MiddlewareUnit`]   | One named step with its declared responses         |
//! | [`EndpointConfig`]   | Immutable route, schemas, responses and chain      |
//! | [`EndpointFactory`]  | Shares pre middleware across endpoints             |
//! | [`Dispatcher`]       | Runs the chain and answers the request             |
//! | [`LegacyMiddleware`] | Adapts transport-level middleware functions        |

#![doc(html_root_url = "https://docs.rs/waymark-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bag;
pub mod chain;
pub mod config;
pub mod dispatcher;
pub mod input;
pub mod legacy;
pub mod middleware;

pub use bag::{ParameterBag, BODY, PARAMS, QUERY};
pub use chain::MiddlewareChain;
pub use config::{endpoint, EndpointConfig, EndpointFactory, EndpointInput, EndpointMeta};
pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherBuilder, ErrorCallback, HANDLER_STEP};
pub use input::{InputSchemas, INPUT_STEP};
pub use legacy::LegacyMiddleware;
pub use middleware::{security_requirement, MiddlewareUnit, SecurityRequirement, Step};
