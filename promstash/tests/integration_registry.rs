//! Integration tests for the registry: the application-facing flow from
//! registration through scrape, wipe, and snapshot persistence.

use promstash::config::{Config, LabelMismatchBehavior};
use promstash::memory::MemoryStore;
use promstash::registry::{Registry, WipePolicy, WriteOptions};
use promstash::{HashStore, MetricType, PromstashError};
use tempfile::tempdir;

fn no_namespace() -> Config {
    let mut config = Config::default();
    config.registry.namespace = String::new();
    config
}

#[test]
fn test_requests_total_renders_six() {
    let mut registry = Registry::new(MemoryStore::new(), &no_namespace()).unwrap();
    let requests = registry
        .counter("requests_total", "Total requests", &[])
        .unwrap();

    registry.inc(requests, &[], WriteOptions::default()).unwrap();
    registry
        .inc_by(requests, &[], 5, WriteOptions::default())
        .unwrap();

    assert_eq!(
        registry.render().unwrap(),
        "# HELP requests_total Total requests\n# TYPE requests_total counter\nrequests_total 6\n"
    );
}

#[test]
fn test_full_scrape_output() {
    let mut registry = Registry::with_defaults(MemoryStore::new()).unwrap();
    let opts = WriteOptions::default();

    let requests = registry
        .counter("http_requests_total", "HTTP requests", &["method", "code"])
        .unwrap();
    let in_flight = registry.gauge("in_flight", "Requests in flight", &[]).unwrap();
    let latency = registry
        .histogram("http_seconds", "Latency", &["method"], Some(vec![0.1, 1.0]))
        .unwrap();

    registry.inc(requests, &["GET", "200"], opts).unwrap();
    registry.inc(requests, &["GET", "200"], opts).unwrap();
    registry.inc(requests, &["POST", "500"], opts).unwrap();
    registry.set(in_flight, &[], 3.0, opts).unwrap();
    registry.observe(latency, &["GET"], 0.0625, opts).unwrap();
    registry.observe(latency, &["GET"], 0.5, opts).unwrap();
    registry.observe(latency, &["GET"], 3.0, opts).unwrap();

    let expected = "\
# HELP app_http_requests_total HTTP requests
# TYPE app_http_requests_total counter
app_http_requests_total{method=\"GET\",code=\"200\"} 2
app_http_requests_total{method=\"POST\",code=\"500\"} 1
# HELP app_http_seconds Latency
# TYPE app_http_seconds histogram
app_http_seconds_bucket{method=\"GET\",le=\"0.1\"} 1
app_http_seconds_bucket{method=\"GET\",le=\"1\"} 2
app_http_seconds_bucket{method=\"GET\",le=\"+Inf\"} 3
app_http_seconds_sum{method=\"GET\"} 3.5625
app_http_seconds_count{method=\"GET\"} 3
# HELP app_in_flight Requests in flight
# TYPE app_in_flight gauge
app_in_flight 3
";
    assert_eq!(registry.render().unwrap(), expected);
}

#[test]
fn test_processes_share_one_store() {
    let store = MemoryStore::new();

    // Two independent registries stand in for two worker processes.
    let mut worker_a = Registry::with_defaults(store.clone()).unwrap();
    let mut worker_b = Registry::with_defaults(store.clone()).unwrap();
    let a = worker_a.counter("jobs_total", "Jobs", &["queue"]).unwrap();
    let b = worker_b.counter("jobs_total", "Jobs", &["queue"]).unwrap();

    worker_a.inc_by(a, &["mail"], 4, WriteOptions::default()).unwrap();
    worker_b.inc_by(b, &["mail"], 6, WriteOptions::default()).unwrap();

    // A scraper with no registrations of its own still sees everything.
    let scraper = Registry::with_defaults(store).unwrap();
    assert!(
        scraper
            .render()
            .unwrap()
            .contains("app_jobs_total{queue=\"mail\"} 10\n")
    );
}

#[test]
fn test_stale_labels_after_redeploy() {
    let store = MemoryStore::new();

    // An older deployment stored samples with a single label.
    let mut old = Registry::with_defaults(store.clone()).unwrap();
    let orders = old.counter("orders_total", "Orders", &["status"]).unwrap();
    old.inc(orders, &["paid"], WriteOptions::default()).unwrap();

    // The new deployment adds a label; its meta write replaces the old one.
    let mut config = Config::default();
    config.adapter.auto_clean_corrupted = false;
    let mut new = Registry::new(store.clone(), &config).unwrap();
    let orders = new
        .counter("orders_total", "Orders", &["status", "region"])
        .unwrap();
    new.inc(orders, &["paid", "eu"], WriteOptions::default())
        .unwrap();

    let text = new.render().unwrap();
    assert!(text.contains("app_orders_total{status=\"paid\",region=\"eu\"} 1\n"));
    assert!(!text.contains("app_orders_total{status=\"paid\"} 1"));

    // Without auto-clean the stale sample is still stored.
    assert_eq!(store.len(), 3);

    // A wipe clears it for good.
    new.wipe().unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_log_policy_drops_bad_writes() {
    let mut config = Config::default();
    config.registry.label_mismatch = LabelMismatchBehavior::Log;
    let mut registry = Registry::new(MemoryStore::new(), &config).unwrap();

    let gauge = registry.gauge("temp", "", &["room"]).unwrap();
    registry
        .set(gauge, &["kitchen", "extra"], 20.0, WriteOptions::default())
        .unwrap();
    registry
        .set(gauge, &["hall"], 18.0, WriteOptions::default())
        .unwrap();

    let families = registry.collect().unwrap();
    assert_eq!(families.len(), 1);
    assert_eq!(families[0].samples().len(), 1);
    assert_eq!(families[0].kind(), MetricType::Gauge);
}

#[test]
fn test_scrape_with_wipe_policy() {
    let mut registry = Registry::with_defaults(MemoryStore::new()).unwrap();
    let policy = WipePolicy::new(Config::default().wipe);
    let hits = registry.counter("hits_total", "", &[]).unwrap();

    registry.inc(hits, &[], WriteOptions::default()).unwrap();
    let text = registry
        .scrape(policy.should_wipe([("format", "text")]))
        .unwrap();
    assert!(text.contains("app_hits_total 1\n"));

    registry.inc(hits, &[], WriteOptions::default()).unwrap();
    let text = registry.scrape(policy.should_wipe([("wipe", "1")])).unwrap();
    assert!(text.contains("app_hits_total 2\n"));

    assert_eq!(registry.render().unwrap(), "");
}

#[test]
fn test_snapshot_round_trip_preserves_metrics() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("metrics.json");

    {
        let mut registry = Registry::with_defaults(MemoryStore::new()).unwrap();
        let latency = registry
            .histogram("seconds", "", &[], Some(vec![1.0]))
            .unwrap();
        registry
            .observe(latency, &[], 0.5, WriteOptions::at(1_000))
            .unwrap();
        registry.adapter().store().save(&path).unwrap();
    }

    let store = MemoryStore::load(&path, "").unwrap();
    let text = Registry::with_defaults(store).unwrap().render().unwrap();
    assert!(text.contains("app_seconds_bucket{le=\"1\"} 1 1000\n"));
    assert!(text.contains("app_seconds_count 1 1000\n"));
}

#[test]
fn test_store_is_reachable_through_the_trait() {
    let registry = Registry::with_defaults(MemoryStore::new()).unwrap();
    let store: &dyn HashStore = registry.adapter().store();
    assert_eq!(store.transport_prefix(), "");
    assert!(matches!(
        Registry::new(
            MemoryStore::new(),
            &serde_json::from_str::<Config>(r#"{"registry": {"namespace": "bad-ns"}}"#).unwrap()
        ),
        Err(PromstashError::Config(_))
    ));
}
