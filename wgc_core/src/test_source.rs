use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;

use crate::{
    config::PostalCode,
    garbage_client::{AddressCandidate, FetchError, ScheduleSource},
    schedule::RawScheduleEntry,
};

/// A schedule source answering from canned data.
pub struct FakeSource {
    pub entries: Mutex<Result<Vec<RawScheduleEntry>, FetchError>>,
    pub candidates: Vec<AddressCandidate>,
    pub fetches: AtomicUsize,
}

impl FakeSource {
    pub fn new(entries: Result<Vec<RawScheduleEntry>, FetchError>) -> Self {
        Self {
            entries: Mutex::new(entries),
            candidates: vec![],
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn from_json(json: &str) -> Self {
        Self::new(Ok(serde_json::from_str(json).unwrap()))
    }

    pub fn with_candidates(mut self, candidates: Vec<AddressCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn respond_with(&self, entries: Result<Vec<RawScheduleEntry>, FetchError>) {
        *self.entries.lock().unwrap() = entries;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScheduleSource for FakeSource {
    async fn fetch(&self, _address_point_id: u64) -> Result<Vec<RawScheduleEntry>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().clone()
    }

    async fn search(&self, _postal_code: &PostalCode) -> Vec<AddressCandidate> {
        self.candidates.clone()
    }
}
