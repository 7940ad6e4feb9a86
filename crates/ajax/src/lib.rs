//! Asynchronous form requests with CSRF protection and error reporting
//!
//! An [`Ajax`] client is bound to a [`dom::Document`] (for its location and
//! its `<meta name="csrf-token">`) and a [`Transport`]. Failed requests are
//! reported to a configurable endpoint through the same client.
//!
//! ```no_run
//! use ajax::{on_response, Ajax, AjaxConfig, Method};
//! use dom::Document;
//!
//! # async fn run() {
//! let doc = Document::parse_with_location(
//!     r#"<meta name="csrf-token" content="T">"#,
//!     "https://app.test/orders",
//! );
//! let client = Ajax::with_http(AjaxConfig::default(), doc);
//! client
//!     .ajax(Method::Post, "/orders", "id=7", on_response(|body| println!("{}", body)), true)
//!     .completed()
//!     .await;
//! # }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod request;
pub mod transport;

pub use config::AjaxConfig;
pub use error::{AjaxError, Result};
pub use pipeline::{on_response, Ajax, AjaxRequest, PendingRequest, ResponseHandler};
pub use report::ErrorReport;
pub use request::{is_absolute, HttpRequest, HttpResponse, Method};
pub use transport::{HttpTransport, Transport};
