//! In-process counters and durations for ingest and answer calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Lock-free counters shared by all requests.
#[derive(Debug, Default)]
pub struct RagMetrics {
    documents_ingested: AtomicU64,
    documents_deleted: AtomicU64,
    questions_answered: AtomicU64,
    ingest_failures: AtomicU64,
    answer_failures: AtomicU64,
    ingest_ms_total: AtomicU64,
    ingest_ms_last: AtomicU64,
    answer_ms_total: AtomicU64,
    answer_ms_last: AtomicU64,
}

/// Point-in-time copy of [`RagMetrics`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub documents_ingested: u64,
    pub documents_deleted: u64,
    pub questions_answered: u64,
    pub ingest_failures: u64,
    pub answer_failures: u64,
    pub ingest_ms_total: u64,
    pub ingest_ms_last: u64,
    pub answer_ms_total: u64,
    pub answer_ms_last: u64,
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl RagMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one `ingest` call; failures still contribute their duration.
    pub fn record_ingest(&self, took: Duration, ok: bool) {
        let ms = millis(took);
        self.ingest_ms_total.fetch_add(ms, Ordering::Relaxed);
        self.ingest_ms_last.store(ms, Ordering::Relaxed);
        if ok {
            self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        } else {
            self.ingest_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_answer(&self, took: Duration, ok: bool) {
        let ms = millis(took);
        self.answer_ms_total.fetch_add(ms, Ordering::Relaxed);
        self.answer_ms_last.store(ms, Ordering::Relaxed);
        if ok {
            self.questions_answered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.answer_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_delete(&self) {
        self.documents_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let get = |a: &AtomicU64| a.load(Ordering::Relaxed);
        MetricsSnapshot {
            documents_ingested: get(&self.documents_ingested),
            documents_deleted: get(&self.documents_deleted),
            questions_answered: get(&self.questions_answered),
            ingest_failures: get(&self.ingest_failures),
            answer_failures: get(&self.answer_failures),
            ingest_ms_total: get(&self.ingest_ms_total),
            ingest_ms_last: get(&self.ingest_ms_last),
            answer_ms_total: get(&self.answer_ms_total),
            answer_ms_last: get(&self.answer_ms_last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_split_success_and_failure() {
        let m = RagMetrics::new();
        m.record_ingest(Duration::from_millis(30), true);
        m.record_ingest(Duration::from_millis(5), false);
        m.record_answer(Duration::from_millis(12), true);
        m.record_delete();

        let s = m.snapshot();
        assert_eq!(s.documents_ingested, 1);
        assert_eq!(s.ingest_failures, 1);
        assert_eq!(s.ingest_ms_total, 35);
        assert_eq!(s.ingest_ms_last, 5);
        assert_eq!(s.questions_answered, 1);
        assert_eq!(s.answer_ms_last, 12);
        assert_eq!(s.documents_deleted, 1);
    }
}
