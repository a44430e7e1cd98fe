use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

static METRICS: OnceLock<PortalMetrics> = OnceLock::new();

pub struct PortalMetrics {
    registry: Registry,
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub guard_denials_total: IntCounterVec,
    pub lessons_created_total: IntCounter,
    pub lesson_submissions_failed_total: IntCounterVec,
}

impl PortalMetrics {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "path", "status"],
        )?;
        let guard_denials_total = IntCounterVec::new(
            Opts::new("guard_denials_total", "Protected navigations that were denied"),
            &["reason"],
        )?;
        let lessons_created_total =
            IntCounter::new("lessons_created_total", "Lessons created through the wizard")?;
        let lesson_submissions_failed_total = IntCounterVec::new(
            Opts::new(
                "lesson_submissions_failed_total",
                "Lesson submissions that failed",
            ),
            &["stage"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(guard_denials_total.clone()))?;
        registry.register(Box::new(lessons_created_total.clone()))?;
        registry.register(Box::new(lesson_submissions_failed_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            guard_denials_total,
            lessons_created_total,
            lesson_submissions_failed_total,
        })
    }
}

/// Build the registry once. Later calls are no-ops.
pub fn init_metrics() -> prometheus::Result<()> {
    if METRICS.get().is_some() {
        return Ok(());
    }
    let metrics = PortalMetrics::new()?;
    let _ = METRICS.set(metrics);
    Ok(())
}

/// Registered metrics, or `None` before [`init_metrics`] ran.
pub fn metrics() -> Option<&'static PortalMetrics> {
    METRICS.get()
}

pub fn record_request(method: &str, path: &str, status: u16, seconds: f64) {
    if let Some(m) = metrics() {
        let status = status.to_string();
        let labels = [method, path, status.as_str()];
        m.http_requests_total.with_label_values(&labels).inc();
        m.http_request_duration_seconds
            .with_label_values(&labels)
            .observe(seconds);
    }
}

pub fn record_guard_denial(reason: &str) {
    if let Some(m) = metrics() {
        m.guard_denials_total.with_label_values(&[reason]).inc();
    }
}

pub fn record_lesson_created() {
    if let Some(m) = metrics() {
        m.lessons_created_total.inc();
    }
}

pub fn record_submission_failure(stage: &str) {
    if let Some(m) = metrics() {
        m.lesson_submissions_failed_total
            .with_label_values(&[stage])
            .inc();
    }
}

/// Text exposition of every registered metric.
pub fn get_metrics() -> String {
    let Some(m) = metrics() else {
        return String::new();
    };

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&m.registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
