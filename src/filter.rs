//! The filter the HTTP client calls on every request.

use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use tracing::{debug, error};

use crate::client::{ClientResponse, FilterableRequest};
use crate::converters::{Converters, CookieConverter, HeaderConverter, ParamConverter, UriConverter};
use crate::entity::{build_request, build_response};
use crate::markdown::{ReportEntry, render_request, render_response};
use crate::mime::ClassificationSets;
use crate::prettify::{Prettifier, Prettifiers, default_prettifiers};
use crate::reporter::{LogLevel, Reporter, TracingReporter, emit_entries};

/// Logged in place of the response when the chain returned none.
pub const NULL_RESPONSE: &str = "NULL response from the HTTP client";

/// A request matching any registered predicate is not reported.
pub type RequestPredicate = Arc<dyn Fn(&FilterableRequest) -> bool + Send + Sync>;

// ---------------------------------------------------------------------------
// FilterConfig
// ---------------------------------------------------------------------------

static DEFAULT_CONFIG: LazyLock<FilterConfig> = LazyLock::new(|| FilterConfig {
    order: 0,
    level: LogLevel::Info,
    converters: Converters::default(),
    prettifiers: default_prettifiers(),
    classification: ClassificationSets::default(),
});

/// Everything a [`LoggingFilter`] can be tuned with. Every field has its own
/// default and can be replaced on its own.
#[derive(Clone)]
pub struct FilterConfig {
    /// Placement among other filters of the hosting client. Not used here.
    pub order: i32,
    /// Level of every non-error entry.
    pub level: LogLevel,
    pub converters: Converters,
    pub prettifiers: Prettifiers,
    pub classification: ClassificationSets,
}

impl Default for FilterConfig {
    fn default() -> Self {
        DEFAULT_CONFIG.clone()
    }
}

impl FilterConfig {
    /// Defaults with `Authorization`, session cookies and URI passwords
    /// redacted.
    pub fn sanitizing() -> Self {
        Self {
            converters: Converters::sanitizing(),
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_header_converter(mut self, converter: HeaderConverter) -> Self {
        self.converters.header = converter;
        self
    }

    pub fn with_part_header_converter(mut self, converter: HeaderConverter) -> Self {
        self.converters.part_header = converter;
        self
    }

    pub fn with_cookie_converter(mut self, converter: CookieConverter) -> Self {
        self.converters.cookie = converter;
        self
    }

    pub fn with_uri_converter(mut self, converter: UriConverter) -> Self {
        self.converters.uri = converter;
        self
    }

    pub fn with_param_converter(mut self, converter: ParamConverter) -> Self {
        self.converters.param = converter;
        self
    }

    pub fn with_prettifiers(mut self, prettifiers: Prettifiers) -> Self {
        self.prettifiers = prettifiers;
        self
    }

    /// Register or replace the prettifier of one MIME type.
    pub fn with_prettifier(mut self, mime_type: &str, prettifier: Prettifier) -> Self {
        self.prettifiers
            .insert(crate::mime::mime_type(Some(mime_type)), prettifier);
        self
    }

    pub fn with_classification(mut self, classification: ClassificationSets) -> Self {
        self.classification = classification;
        self
    }
}

impl fmt::Debug for FilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterConfig")
            .field("order", &self.order)
            .field("level", &self.level)
            .field("converters", &self.converters)
            .field("prettifiers", &self.prettifiers.keys().collect::<Vec<_>>())
            .field("classification", &self.classification)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// LoggingFilter
// ---------------------------------------------------------------------------

/// Reports every request and response passing through it.
///
/// Reporting never changes what the chain returns: rendering problems are
/// logged through `tracing` and the entries of that call are dropped.
pub struct LoggingFilter {
    config: FilterConfig,
    reporter: Arc<dyn Reporter>,
    // Copy-on-write: registration swaps in a new list, readers keep the
    // snapshot they started with.
    predicates: RwLock<Arc<Vec<RequestPredicate>>>,
}

impl Default for LoggingFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default(), Arc::new(TracingReporter))
    }
}

impl LoggingFilter {
    pub fn new(config: FilterConfig, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            config,
            reporter,
            predicates: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub fn order(&self) -> i32 {
        self.config.order
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Skip reporting of requests for which `predicate` returns `true`.
    ///
    /// Safe to call while other threads are intercepting requests.
    pub fn add_request_filter<P>(&self, predicate: P) -> &Self
    where
        P: Fn(&FilterableRequest) -> bool + Send + Sync + 'static,
    {
        let mut guard = self.predicates.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = Vec::with_capacity(guard.len() + 1);
        updated.extend(guard.iter().cloned());
        updated.push(Arc::new(predicate) as RequestPredicate);
        *guard = Arc::new(updated);
        self
    }

    fn is_skipped(&self, request: &FilterableRequest) -> bool {
        let predicates = Arc::clone(&self.predicates.read().unwrap_or_else(PoisonError::into_inner));
        predicates.iter().any(|predicate| predicate(request))
    }

    /// Report `request`, pass it down the chain, report what comes back.
    ///
    /// The chain is called exactly once and its result is returned as is,
    /// errors included.
    pub fn intercept<F, E>(&self, request: &FilterableRequest, next: F) -> Result<Option<ClientResponse>, E>
    where
        F: FnOnce(&FilterableRequest) -> Result<Option<ClientResponse>, E>,
    {
        if self.is_skipped(request) {
            debug!(method = %request.method, uri = %request.uri, "request excluded from report");
            return next(request);
        }

        self.report_request(request);
        let response = next(request)?;
        self.report_response(response.as_ref());
        Ok(response)
    }

    fn report_request(&self, request: &FilterableRequest) {
        let converters = self
            .config
            .converters
            .clone()
            .with_blacklisted_headers(&request.blacklisted_headers);
        let entity = build_request(
            request,
            &converters,
            &self.config.prettifiers,
            &self.config.classification,
        );
        match render_request(&entity) {
            Ok(entries) => self.emit(&entries),
            Err(e) => error!(method = %request.method, uri = %request.uri, error = %e, "request could not be rendered"),
        }
    }

    fn report_response(&self, response: Option<&ClientResponse>) {
        let Some(response) = response else {
            self.emit(&[ReportEntry::Text(NULL_RESPONSE.to_string())]);
            return;
        };
        let entity = build_response(
            response,
            &self.config.converters,
            &self.config.prettifiers,
            &self.config.classification,
        );
        match render_response(&entity) {
            Ok(entries) => self.emit(&entries),
            Err(e) => error!(status = response.status_code, error = %e, "response could not be rendered"),
        }
    }

    fn emit(&self, entries: &[ReportEntry]) {
        emit_entries(self.reporter.as_ref(), entries, self.config.level);
    }
}

impl fmt::Debug for LoggingFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let predicates = self
            .predicates
            .read()
            .map(|p| p.len())
            .unwrap_or_default();
        f.debug_struct("LoggingFilter")
            .field("config", &self.config)
            .field("predicates", &predicates)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{Record, RecordingReporter};

    fn filter(config: FilterConfig) -> (LoggingFilter, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::new());
        (LoggingFilter::new(config, reporter.clone()), reporter)
    }

    #[test]
    fn default_config_values() {
        let config = FilterConfig::default();
        assert_eq!(config.order, 0);
        assert_eq!(config.level, LogLevel::Info);
        assert!(config.prettifiers.contains_key("application/json"));
    }

    #[test]
    fn order_is_carried_through() {
        let (filter, _) = filter(FilterConfig::default().with_order(42));
        assert_eq!(filter.order(), 42);
    }

    #[test]
    fn chain_error_is_returned_untouched_after_request_report() {
        let (filter, reporter) = filter(FilterConfig::default());
        let request = FilterableRequest::new("GET", "http://h/");
        let result: Result<Option<ClientResponse>, &str> = filter.intercept(&request, |_| Err("connection refused"));
        assert_eq!(result, Err("connection refused"));
        assert_eq!(reporter.records().len(), 1);
    }

    #[test]
    fn configured_level_applies_to_entries() {
        let (filter, reporter) = filter(FilterConfig::default().with_level(LogLevel::Debug));
        let request = FilterableRequest::new("GET", "http://h/");
        filter
            .intercept::<_, ()>(&request, |_| Ok(Some(ClientResponse::new(204, "HTTP/1.1 204"))))
            .unwrap();
        for record in reporter.records() {
            match record {
                Record::Log { level, .. } => assert_eq!(level, LogLevel::Debug),
                other => panic!("unexpected record {other:?}"),
            }
        }
    }

    #[test]
    fn predicates_can_be_added_through_a_shared_reference() {
        let (filter, reporter) = filter(FilterConfig::default());
        let filter = Arc::new(filter);
        let handle = {
            let filter = Arc::clone(&filter);
            std::thread::spawn(move || {
                filter.add_request_filter(|r| r.uri.ends_with("/health"));
            })
        };
        handle.join().unwrap();

        let health = FilterableRequest::new("GET", "http://h/health");
        filter
            .intercept::<_, ()>(&health, |_| Ok(Some(ClientResponse::new(200, "HTTP/1.1 200"))))
            .unwrap();
        assert!(reporter.records().is_empty());
        assert!(format!("{filter:?}").contains("predicates: 1"));
    }
}
