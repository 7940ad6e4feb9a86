//! Request pipeline and error reporter
//!
//! ```text
//! ajax() ─spawn─▶ prepare ─▶ Transport::send ─▶ handler(body)
//!                    │                              │ status != 200
//!                    └── error ──▶ report() ◀───────┘ (handle_errors)
//!                                    │
//!                                    └─▶ ajax(POST error_log_url, handle_errors = false)
//! ```
//!
//! Every call returns immediately with a [`PendingRequest`]. Reports go
//! through the same pipeline with error handling switched off, so a failing
//! error log endpoint ends the chain instead of looping.

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

use dom::Document;

use crate::config::AjaxConfig;
use crate::error::{AjaxError, Result};
use crate::report::ErrorReport;
use crate::request::*;
use crate::transport::{HttpTransport, Transport};

/// Receives the raw response body, on success and on failure alike
pub type ResponseHandler = Box<dyn FnOnce(&str) + Send + 'static>;

/// Box a closure as a [`ResponseHandler`]
pub fn on_response<F>(f: F) -> Option<ResponseHandler>
where
    F: FnOnce(&str) + Send + 'static,
{
    Some(Box::new(f))
}

/// One request, consumed when sent
pub struct AjaxRequest {
    pub method: Method,
    pub url: String,
    /// Already encoded body, sent as is
    pub body: String,
    pub handler: Option<ResponseHandler>,
    /// Report non-200 responses (default `true`)
    pub handle_errors: bool,
}

impl AjaxRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: String::new(),
            handler: None,
            handle_errors: true,
        }
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn on_response<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&str) + Send + 'static,
    {
        self.handler = Some(Box::new(f));
        self
    }

    pub fn handle_errors(mut self, handle_errors: bool) -> Self {
        self.handle_errors = handle_errors;
        self
    }
}

impl std::fmt::Debug for AjaxRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AjaxRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("body", &self.body)
            .field("handler", &self.handler.is_some())
            .field("handle_errors", &self.handle_errors)
            .finish()
    }
}

/// Handle to an in-flight request. It can be awaited or dropped, never cancelled.
#[derive(Debug)]
pub struct PendingRequest {
    task: Option<JoinHandle<()>>,
}

impl PendingRequest {
    /// Wait until the handler (and any error report) has run
    pub async fn completed(self) {
        if let Some(task) = self.task {
            if let Err(e) = task.await {
                tracing::error!("Request task failed: {}", e);
            }
        }
    }

    /// Whether the request was actually dispatched
    pub fn is_dispatched(&self) -> bool {
        self.task.is_some()
    }
}

struct AjaxInner {
    config: AjaxConfig,
    document: Document,
    transport: Arc<dyn Transport>,
}

/// Request client bound to one document
#[derive(Clone)]
pub struct Ajax {
    inner: Arc<AjaxInner>,
}

impl Ajax {
    pub fn new(config: AjaxConfig, document: Document, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(AjaxInner {
                config,
                document,
                transport,
            }),
        }
    }

    /// Client that talks HTTP through `reqwest`
    pub fn with_http(config: AjaxConfig, document: Document) -> Self {
        Self::new(config, document, Arc::new(HttpTransport::new()))
    }

    pub fn config(&self) -> &AjaxConfig {
        &self.inner.config
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    /// Send a request. Returns at once; `handler` runs when the request
    /// reaches a terminal state.
    pub fn ajax(
        &self,
        method: Method,
        url: &str,
        body: impl Into<String>,
        handler: Option<ResponseHandler>,
        handle_errors: bool,
    ) -> PendingRequest {
        self.send(AjaxRequest {
            method,
            url: url.to_string(),
            body: body.into(),
            handler,
            handle_errors,
        })
    }

    pub fn send(&self, request: AjaxRequest) -> PendingRequest {
        self.spawn(self.clone().execute(request))
    }

    /// Report `error` to the error log endpoint, fire and forget
    pub fn handle_error(&self, error: &(dyn std::error::Error + '_)) -> PendingRequest {
        self.spawn(self.report(error.to_string()))
    }

    /// [`tools::serialize_object`], with failures reported instead of returned
    pub fn serialize_object(&self, value: &Value) -> Option<String> {
        match tools::serialize_object(value) {
            Ok(body) => Some(body),
            Err(e) => {
                self.handle_error(&e);
                None
            }
        }
    }

    fn spawn(&self, work: BoxFuture<'static, ()>) -> PendingRequest {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => PendingRequest {
                task: Some(runtime.spawn(work)),
            },
            Err(e) => {
                tracing::error!("Request not sent, no tokio runtime: {}", e);
                PendingRequest { task: None }
            }
        }
    }

    fn csrf_token(&self, method: Method, url: &str) -> Result<String> {
        self.inner
            .document
            .query_selector(r#"meta[name="csrf-token"]"#)?
            .map(|meta| meta.attribute("content").unwrap_or_default())
            .ok_or_else(|| AjaxError::MissingCsrfToken {
                method: method.to_string(),
                url: url.to_string(),
            })
    }

    /// Resolve `url` against the document location
    fn resolve(&self, url: &str) -> Result<String> {
        let invalid = |source| AjaxError::InvalidUrl {
            url: url.to_string(),
            source,
        };
        let resolved = match url::Url::parse(url) {
            Ok(absolute) => absolute,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                url::Url::parse(self.inner.document.location())
                    .and_then(|base| base.join(url))
                    .map_err(invalid)?
            }
            Err(e) => return Err(invalid(e)),
        };
        Ok(resolved.to_string())
    }

    fn prepare(&self, method: Method, url: &str, body: String) -> Result<HttpRequest> {
        let mut headers = vec![
            (CONTENT_TYPE.to_string(), FORM_CONTENT_TYPE.to_string()),
            (X_REQUESTED_WITH.to_string(), XML_HTTP_REQUEST.to_string()),
        ];
        if method.needs_csrf_token() && !is_absolute(url) {
            headers.push((X_CSRF_TOKEN.to_string(), self.csrf_token(method, url)?));
        }

        Ok(HttpRequest {
            method,
            url: self.resolve(url)?,
            headers,
            body,
        })
    }

    fn execute(self, request: AjaxRequest) -> BoxFuture<'static, ()> {
        async move {
            let AjaxRequest {
                method,
                url,
                body,
                handler,
                handle_errors,
            } = request;

            let prepared = match self.prepare(method, &url, body) {
                Ok(prepared) => prepared,
                Err(e) => {
                    tracing::debug!(%method, %url, "Request not sent: {}", e);
                    if handle_errors {
                        self.report(e.to_string()).await;
                    } else {
                        self.unreported_failure();
                    }
                    return;
                }
            };

            tracing::debug!(%method, url = %prepared.url, "Sending request");
            let response = match self.inner.transport.send(prepared).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(%method, %url, "Transport failed: {}", e);
                    HttpResponse::new(0, "")
                }
            };
            tracing::debug!(%method, %url, status = response.status, "Request completed");

            if let Some(handler) = handler {
                handler(&response.body);
            }
            if response.is_success() {
                return;
            }

            if handle_errors {
                let error = failure(method, &url, &response);
                self.report(error.to_string()).await;
            } else {
                self.unreported_failure();
            }
        }
        .boxed()
    }

    /// A request with error handling off failed, which only happens to reports
    fn unreported_failure(&self) {
        if self.inner.config.debug {
            tracing::error!("Error logging the error");
        }
    }

    /// Ship `message` to the error log endpoint and wait for the reply
    fn report(&self, message: String) -> BoxFuture<'static, ()> {
        let this = self.clone();
        async move {
            let debug = this.inner.config.debug;
            if debug {
                tracing::error!("{}", message);
            }

            let report = ErrorReport::new(this.inner.document.location(), message);
            let body = match report.to_form() {
                Ok(body) => body,
                Err(e) => {
                    tracing::error!("Failed to encode error report: {}", e);
                    return;
                }
            };

            let request = AjaxRequest::new(Method::Post, this.inner.config.error_log_url.clone())
                .body(body)
                .on_response(move |response| {
                    if debug {
                        tracing::debug!(response, "Error log response");
                    }
                })
                .handle_errors(false);
            this.execute(request).await;
        }
        .boxed()
    }
}

/// Error for a non-200 terminal state
fn failure(method: Method, url: &str, response: &HttpResponse) -> AjaxError {
    let message = if response.body.is_empty() {
        format!("{} {} failed with status {}", method, url, response.status)
    } else {
        response.body.clone()
    };
    AjaxError::Response {
        status: response.status,
        message,
    }
}

impl std::fmt::Debug for Ajax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ajax")
            .field("config", &self.inner.config)
            .field("document", &self.inner.document)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    const PAGE: &str = r#"<head><meta name="csrf-token" content="T"></head><body></body>"#;

    /// Records every request and answers by URL path
    #[derive(Default)]
    struct FakeTransport {
        sent: Mutex<Vec<HttpRequest>>,
        log: Arc<Mutex<Vec<String>>>,
        unreachable: AtomicBool,
    }

    impl FakeTransport {
        fn sent(&self) -> Vec<HttpRequest> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.log.lock().push(format!("send {}", request.url));
            self.sent.lock().push(request.clone());
            if self.unreachable.load(Ordering::SeqCst) {
                return Err(AjaxError::UnsupportedMethod("offline".to_string()));
            }
            let path = url::Url::parse(&request.url).map(|u| u.path().to_string());
            Ok(match path.as_deref() {
                Ok("/ok") => HttpResponse::new(200, "fine"),
                Ok("/empty-error") => HttpResponse::new(500, ""),
                Ok("/some/url/error-log") => HttpResponse::new(200, "logged"),
                _ => HttpResponse::new(404, "Not found"),
            })
        }
    }

    fn client(page: &str, config: AjaxConfig) -> (Ajax, Arc<FakeTransport>) {
        let transport = Arc::new(FakeTransport::default());
        let document = Document::parse_with_location(page, "https://app.test/orders/1");
        let ajax = Ajax::new(config, document, transport.clone());
        (ajax, transport)
    }

    #[tokio::test]
    async fn test_success_calls_handler_once() {
        let (ajax, transport) = client(PAGE, AjaxConfig::default());
        let (tx, rx) = tokio::sync::oneshot::channel();

        ajax.ajax(
            Method::Get,
            "/ok",
            "",
            on_response(move |body| {
                let _ = tx.send(body.to_string());
            }),
            true,
        )
        .completed()
        .await;

        assert_eq!(rx.await.unwrap(), "fine");
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "https://app.test/ok");
        assert_eq!(sent[0].header(CONTENT_TYPE), Some(FORM_CONTENT_TYPE));
        assert_eq!(sent[0].header(X_REQUESTED_WITH), Some("XMLHttpRequest"));
        assert_eq!(sent[0].header(X_CSRF_TOKEN), None);
    }

    #[tokio::test]
    async fn test_csrf_only_for_relative_unsafe_requests() {
        let (ajax, transport) = client(PAGE, AjaxConfig::default());
        ajax.ajax(Method::Post, "/ok", "a=1", None, true).completed().await;
        ajax.ajax(Method::Post, "https://other.example/ok", "a=1", None, false)
            .completed()
            .await;
        ajax.ajax(Method::Delete, "ok", "", None, false).completed().await;
        ajax.ajax(Method::Patch, "/ok", "", None, true).completed().await;

        let sent = transport.sent();
        assert_eq!(sent[0].header(X_CSRF_TOKEN), Some("T"));
        assert_eq!(sent[0].body, "a=1");
        assert_eq!(sent[1].header(X_CSRF_TOKEN), None);
        assert_eq!(sent[2].header(X_CSRF_TOKEN), Some("T"));
        assert_eq!(sent[2].url, "https://app.test/orders/ok");
        assert_eq!(sent[3].header(X_CSRF_TOKEN), None);
    }

    #[tokio::test]
    async fn test_failure_runs_handler_before_report() {
        let (ajax, transport) = client(PAGE, AjaxConfig::default());
        let log = transport.log.clone();

        ajax.ajax(
            Method::Get,
            "/missing",
            "",
            on_response(move |body| log.lock().push(format!("handler {}", body))),
            true,
        )
        .completed()
        .await;

        assert_eq!(
            *transport.log.lock(),
            vec![
                "send https://app.test/missing",
                "handler Not found",
                "send https://app.test/some/url/error-log",
            ]
        );
        let report = &transport.sent()[1];
        assert_eq!(report.method, Method::Post);
        assert_eq!(report.header(X_CSRF_TOKEN), Some("T"));
        assert_eq!(
            report.body,
            "url=https%3A%2F%2Fapp.test%2Forders%2F1&message=Not+found"
        );
    }

    #[tokio::test]
    async fn test_empty_body_gets_a_message() {
        let (ajax, transport) = client(PAGE, AjaxConfig::default());
        ajax.ajax(Method::Put, "/empty-error", "", None, true).completed().await;

        let report = &transport.sent()[1];
        assert!(report
            .body
            .ends_with("message=PUT+%2Fempty-error+failed+with+status+500"));
    }

    #[tokio::test]
    async fn test_suppressed_errors_are_not_reported() {
        let (ajax, transport) = client(
            PAGE,
            AjaxConfig {
                debug: true,
                ..AjaxConfig::default()
            },
        );
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        ajax.ajax(
            Method::Get,
            "/missing",
            "",
            on_response(move |_| flag.store(true, Ordering::SeqCst)),
            false,
        )
        .completed()
        .await;

        assert!(called.load(Ordering::SeqCst));
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_error_log_is_not_reported_again() {
        let (ajax, transport) = client(
            PAGE,
            AjaxConfig {
                debug: false,
                error_log_url: "/broken-log".to_string(),
            },
        );
        ajax.ajax(Method::Get, "/missing", "", None, true).completed().await;

        let urls: Vec<String> = transport.sent().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["https://app.test/missing", "https://app.test/broken-log"]);
    }

    #[tokio::test]
    async fn test_transport_error_is_status_zero() {
        let (ajax, transport) = client(PAGE, AjaxConfig::default());
        transport.unreachable.store(true, Ordering::SeqCst);
        let (tx, rx) = tokio::sync::oneshot::channel();

        ajax.ajax(
            Method::Get,
            "/ok",
            "",
            on_response(move |body| {
                let _ = tx.send(body.to_string());
            }),
            true,
        )
        .completed()
        .await;

        assert_eq!(rx.await.unwrap(), "");
        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].body.ends_with("message=GET+%2Fok+failed+with+status+0"));
    }

    #[tokio::test]
    async fn test_missing_csrf_meta_sends_nothing() {
        let (ajax, transport) = client("<body></body>", AjaxConfig::default());
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();

        ajax.ajax(
            Method::Post,
            "/ok",
            "a=1",
            on_response(move |_| flag.store(true, Ordering::SeqCst)),
            true,
        )
        .completed()
        .await;

        assert!(!called.load(Ordering::SeqCst));
        // The report is a relative POST too, so it cannot be sent either
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_csrf_meta_with_absolute_log_url() {
        let (ajax, transport) = client(
            "<body></body>",
            AjaxConfig {
                debug: false,
                error_log_url: "https://logs.example/ok".to_string(),
            },
        );
        ajax.ajax(Method::Post, "/ok", "a=1", None, true).completed().await;

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "https://logs.example/ok");
        assert!(sent[0].body.contains("csrf-token"));
    }

    #[tokio::test]
    async fn test_serialize_object_reports_bad_input() {
        let (ajax, transport) = client(PAGE, AjaxConfig::default());
        assert_eq!(
            ajax.serialize_object(&serde_json::json!({"x": 1, "y": 2})),
            Some("x=1&y=2".to_string())
        );
        assert!(transport.sent().is_empty());

        assert_eq!(ajax.serialize_object(&serde_json::json!([1])), None);
        // The report runs on its own task
        for _ in 0..100 {
            if !transport.sent().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0]
            .body
            .contains("message=Object+required+for+serialize_object%2C+got+Array"));
    }

    /// Collects formatted log output
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    async fn unsendable_report_output(debug: bool) -> String {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (ajax, transport) = client(
            "<body></body>",
            AjaxConfig {
                debug,
                ..AjaxConfig::default()
            },
        );
        ajax.ajax(Method::Post, "/ok", "a=1", None, true).completed().await;
        assert!(transport.sent().is_empty());

        let bytes = capture.0.lock().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unsendable_report_is_debug_gated() {
        let output = unsendable_report_output(true).await;
        assert_eq!(output.matches("Error logging the error").count(), 1);
        assert!(!output.contains("WARN"));

        let output = unsendable_report_output(false).await;
        assert!(!output.contains("Error logging the error"));
        assert!(!output.contains("WARN"));
    }

    #[test]
    fn test_without_runtime_nothing_is_sent() {
        let (ajax, transport) = client(PAGE, AjaxConfig::default());
        let pending = ajax.ajax(Method::Get, "/ok", "", None, true);
        assert!(!pending.is_dispatched());
        assert!(transport.sent().is_empty());
    }
}
