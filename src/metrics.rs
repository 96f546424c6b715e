//! Process-wide counters for the mention pipeline.
//! Read with [`snapshot`]; the CLI prints them from `status`.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use serde::Serialize;

static BODIES_SCANNED: AtomicU64 = AtomicU64::new(0);
static CANDIDATES_GENERATED: AtomicU64 = AtomicU64::new(0);
static DIRECTORY_LOOKUPS: AtomicU64 = AtomicU64::new(0);
static MENTIONS_ACCEPTED: AtomicU64 = AtomicU64::new(0);
static MENTIONS_REJECTED: AtomicU64 = AtomicU64::new(0);
static PERMISSION_DENIED: AtomicU64 = AtomicU64::new(0);
static RECORDS_INSERTED: AtomicU64 = AtomicU64::new(0);
static DUPLICATES_IGNORED: AtomicU64 = AtomicU64::new(0);

static INSERTS_BY_TYPE: OnceLock<Mutex<HashMap<String, u64>>> = OnceLock::new();

pub fn observe_scan(candidates: usize) {
    BODIES_SCANNED.fetch_add(1, Ordering::Relaxed);
    CANDIDATES_GENERATED.fetch_add(candidates as u64, Ordering::Relaxed);
}

pub fn inc_directory_lookups() {
    DIRECTORY_LOOKUPS.fetch_add(1, Ordering::Relaxed);
}

pub fn observe_resolution(accepted: usize, rejected: usize) {
    MENTIONS_ACCEPTED.fetch_add(accepted as u64, Ordering::Relaxed);
    MENTIONS_REJECTED.fetch_add(rejected as u64, Ordering::Relaxed);
}

pub fn inc_permission_denied() {
    PERMISSION_DENIED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_duplicates_ignored() {
    DUPLICATES_IGNORED.fetch_add(1, Ordering::Relaxed);
}

fn inserts_lock() -> &'static Mutex<HashMap<String, u64>> {
    INSERTS_BY_TYPE.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn record_inserted(content_type: &str) {
    RECORDS_INSERTED.fetch_add(1, Ordering::Relaxed);
    let mut guard = inserts_lock().lock().unwrap_or_else(|e| e.into_inner());
    let count = guard.entry(content_type.to_string()).or_default();
    *count = count.saturating_add(1);
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct Snapshot {
    pub bodies_scanned: u64,
    pub candidates_generated: u64,
    pub directory_lookups: u64,
    pub mentions_accepted: u64,
    pub mentions_rejected: u64,
    pub permission_denied: u64,
    pub records_inserted: u64,
    pub duplicates_ignored: u64,
    pub inserted_by_type: HashMap<String, u64>,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        bodies_scanned: BODIES_SCANNED.load(Ordering::Relaxed),
        candidates_generated: CANDIDATES_GENERATED.load(Ordering::Relaxed),
        directory_lookups: DIRECTORY_LOOKUPS.load(Ordering::Relaxed),
        mentions_accepted: MENTIONS_ACCEPTED.load(Ordering::Relaxed),
        mentions_rejected: MENTIONS_REJECTED.load(Ordering::Relaxed),
        permission_denied: PERMISSION_DENIED.load(Ordering::Relaxed),
        records_inserted: RECORDS_INSERTED.load(Ordering::Relaxed),
        duplicates_ignored: DUPLICATES_IGNORED.load(Ordering::Relaxed),
        inserted_by_type: inserts_lock()
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone(),
    }
}
