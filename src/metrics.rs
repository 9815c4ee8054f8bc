use std::sync::atomic::{AtomicU64, Ordering};

use crate::acl::Decision;

/// Gate decision counters shared between the middleware and the API.
#[derive(Default)]
pub struct GateMetrics {
    pub requests_total: AtomicU64,
    pub requests_allowed: AtomicU64,
    pub requests_denied: AtomicU64,
    pub requests_unspecified: AtomicU64,
}

impl GateMetrics {
    pub fn record(&self, decision: &Decision) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        let counter = match decision {
            Decision::Allow(_) => &self.requests_allowed,
            Decision::Deny(_) => &self.requests_denied,
            Decision::Unspecified => &self.requests_unspecified,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Serialize to Prometheus text exposition format.
    pub fn to_prometheus_text(&self) -> String {
        let total = self.requests_total.load(Ordering::Relaxed);
        let allowed = self.requests_allowed.load(Ordering::Relaxed);
        let denied = self.requests_denied.load(Ordering::Relaxed);
        let unspecified = self.requests_unspecified.load(Ordering::Relaxed);

        format!(
            "# HELP cidr_gate_requests_total Requests classified by the access gate\n\
             # TYPE cidr_gate_requests_total counter\n\
             cidr_gate_requests_total{{decision=\"allow\"}} {allowed}\n\
             cidr_gate_requests_total{{decision=\"deny\"}} {denied}\n\
             cidr_gate_requests_total{{decision=\"unspecified\"}} {unspecified}\n\
             cidr_gate_requests_total{{decision=\"total\"}} {total}\n"
        )
    }
}
