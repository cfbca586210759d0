//! End-to-end scans against a scripted in-memory site.

use std::collections::HashMap;
use std::sync::Mutex;

use uniondump::{
    CancelFlag, Dbms, HttpMethod, HttpResponse, Level, ProbeRequest, ProgressEvent, RateLimiter,
    ScanConfig, Scanner, Transport, TransportError,
};

const MARKER: &str = "UNIQTEST999";

/// Simulates a MySQL-backed page with a 3-column injectable query that
/// renders the first selected column inside a table cell.
struct FakeSite {
    columns: usize,
    databases: Vec<&'static str>,
    tables: Vec<&'static str>,
    probes: Mutex<Vec<String>>,
}

impl FakeSite {
    fn new(databases: Vec<&'static str>, tables: Vec<&'static str>) -> Self {
        Self {
            columns: 3,
            databases,
            tables,
            probes: Mutex::new(Vec::new()),
        }
    }

    fn count(&self, needle: &str) -> usize {
        self.probes
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }

    fn total(&self) -> usize {
        self.probes.lock().unwrap().len()
    }

    fn payload_of(request: &ProbeRequest) -> String {
        match &request.form {
            Some(form) => form
                .iter()
                .find(|(k, _)| k == "id")
                .map(|(_, v)| v.clone())
                .unwrap_or_default(),
            None => url::Url::parse(&request.url)
                .unwrap()
                .query_pairs()
                .find(|(k, _)| k == "id")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default(),
        }
    }

    fn page(cell: &str) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(
            200,
            format!("<html><table><tr><td>{}</td></tr></table></html>", cell),
        ))
    }
}

impl Transport for FakeSite {
    fn send(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError> {
        let raw = Self::payload_of(request);
        self.probes.lock().unwrap().push(raw.clone());
        let payload = raw.replace("/**/", " ");

        if let Some(rest) = payload.split("ORDER BY ").nth(1) {
            let n: usize = rest.split('-').next().unwrap().trim().parse().unwrap();
            return if n <= self.columns {
                Self::page("item")
            } else {
                Ok(HttpResponse::new(500, "Unknown column in 'order clause'"))
            };
        }

        if payload.contains("CONCAT_WS") {
            return Self::page(&format!("{}1:alice,2:bob,broken,3:carol", MARKER));
        }
        if payload.contains("column_name") {
            return Self::page(&format!("{}id,name", MARKER));
        }
        if payload.contains("table_name") {
            return Self::page(&format!("{}{}", MARKER, self.tables.join(",")));
        }
        if payload.contains("schema_name") {
            return Self::page(&format!("{}{}", MARKER, self.databases.join(",")));
        }
        if payload.contains("database()") {
            return Self::page(&format!("{}shop", MARKER));
        }
        if payload.contains("@@version") {
            return Self::page(&format!("{}10.6.12-MariaDB", MARKER));
        }
        if payload.contains(&format!("'{}'", MARKER)) {
            return Self::page(MARKER);
        }

        Self::page("item")
    }
}

fn config() -> ScanConfig {
    ScanConfig::new("http://shop.test/item.php?id=1&lang=en", "id")
}

fn run(site: &FakeSite, config: ScanConfig) -> (uniondump::ScanResult, Vec<ProgressEvent>) {
    let mut events: Vec<ProgressEvent> = Vec::new();
    let result = Scanner::new(config, site)
        .with_rate_limiter(RateLimiter::unlimited())
        .scan(&mut events);
    (result, events)
}

#[test]
fn test_full_scan_populates_result() {
    let site = FakeSite::new(vec!["information_schema", "shop"], vec!["users"]);
    let (result, events) = run(&site, config());

    assert!(result.vulnerable);
    assert_eq!(result.column_count.map(|c| c.count), Some(3));
    assert_eq!(result.current_db.as_deref(), Some("shop"));
    assert_eq!(result.version.as_deref(), Some("10.6.12-MariaDB"));
    assert_eq!(result.dbms, Some(Dbms::MariaDb));
    assert_eq!(result.databases, vec!["information_schema", "shop"]);
    assert_eq!(result.tables["shop"], vec!["users"]);
    assert_eq!(
        result.columns_of("shop", "users").unwrap(),
        &vec!["id".to_string(), "name".to_string()]
    );

    let rows = result.rows_of("shop", "users").unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["name"], "alice");
    assert_eq!(rows[2]["id"], "3");
    assert!(result.errors.is_empty());
    assert!(result.waf_detected.is_none());

    let last = events.last().unwrap();
    assert_eq!(last.level, Level::Success);
    assert!(last.message.contains("completed"));
}

#[test]
fn test_fan_out_is_bounded() {
    let site = FakeSite::new(
        vec!["db1", "db2", "db3", "db4", "db5"],
        vec!["t1", "t2", "t3", "t4", "t5", "t6", "t7"],
    );
    let (result, _) = run(&site, config());

    assert_eq!(result.databases.len(), 5);
    assert_eq!(site.count("GROUP_CONCAT(table_name)"), 3);
    assert_eq!(site.count("GROUP_CONCAT(column_name)"), 15);
    assert_eq!(site.count("CONCAT_WS"), 15);
    assert!(!result.tables.contains_key("db4"));
    assert!(result.columns_of("db1", "t6").is_none());
    assert_eq!(result.tables["db1"].len(), 7);
}

#[test]
fn test_request_sequence() {
    let site = FakeSite::new(vec!["shop"], vec!["users"]);
    run(&site, config());

    // 4 ORDER BY, union, database, version, schemata, tables, columns, data
    assert_eq!(site.total(), 11);
    assert_eq!(site.count("ORDER BY"), 4);
}

#[test]
fn test_post_delivery() {
    let site = FakeSite::new(vec!["shop"], vec!["users"]);
    let (result, _) = run(&site, config().with_method(HttpMethod::Post));

    assert!(result.vulnerable);
    assert_eq!(result.current_db.as_deref(), Some("shop"));
}

#[test]
fn test_tampered_scan_still_extracts() {
    let site = FakeSite::new(vec!["shop"], vec!["users"]);
    let tampers = vec!["space2comment".to_string(), "unknown".to_string()];
    let (result, _) = run(&site, config().with_tampers(tampers));

    assert!(result.vulnerable);
    assert_eq!(result.databases, vec!["shop"]);
    assert!(site.probes.lock().unwrap().iter().all(|p| !p.contains(' ')));
}

#[test]
fn test_cancel_flag_stops_scan() {
    let site = FakeSite::new(vec!["shop"], vec!["users"]);
    let cancel = CancelFlag::new();
    cancel.cancel();

    let mut events: Vec<ProgressEvent> = Vec::new();
    let result = Scanner::new(config(), &site)
        .with_rate_limiter(RateLimiter::unlimited())
        .with_cancel_flag(cancel)
        .scan(&mut events);

    assert_eq!(site.total(), 0);
    assert_eq!(result.errors, vec!["scan cancelled".to_string()]);
    assert!(!result.vulnerable);
}

#[test]
fn test_other_query_params_survive() {
    let site = FakeSite::new(vec!["shop"], vec!["users"]);
    let seen: Mutex<Vec<HashMap<String, String>>> = Mutex::new(Vec::new());

    struct Spy<'a> {
        inner: &'a FakeSite,
        seen: &'a Mutex<Vec<HashMap<String, String>>>,
    }

    impl Transport for Spy<'_> {
        fn send(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError> {
            let query = url::Url::parse(&request.url)
                .unwrap()
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            self.seen.lock().unwrap().push(query);
            self.inner.send(request)
        }
    }

    let spy = Spy { inner: &site, seen: &seen };
    let mut scanner = Scanner::new(config(), spy).with_rate_limiter(RateLimiter::unlimited());
    scanner.scan(&mut Vec::<ProgressEvent>::new());

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|q| q.get("lang").map(String::as_str) == Some("en")));
}
