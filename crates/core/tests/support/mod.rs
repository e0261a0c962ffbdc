//! In-memory port fakes shared by the core integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bibsync_core::ports::{
    BriefBibSearchResponse, BriefRecord, Cascade, ControlNumberCheckResponse, ControlNumberEntry,
    HoldingEntry, HoldingOperation, HoldingUpdateResponse, RowSink, WorldcatApi,
};
use bibsync_domain::{BibsyncError, Result};

/// Scripted `WorldcatApi` fake: responses are queued per operation and every
/// call is recorded for inspection.
#[derive(Default)]
pub struct MockApi {
    pub check_calls: Mutex<Vec<String>>,
    pub update_calls: Mutex<Vec<(HoldingOperation, String, Option<Cascade>)>>,
    pub search_calls: Mutex<Vec<(String, Option<String>)>>,
    check_responses: Mutex<VecDeque<Result<ControlNumberCheckResponse>>>,
    update_responses: Mutex<VecDeque<Result<HoldingUpdateResponse>>>,
    search_responses: Mutex<VecDeque<Result<BriefBibSearchResponse>>>,
}

impl MockApi {
    pub fn queue_check(&self, response: Result<ControlNumberCheckResponse>) {
        self.check_responses.lock().unwrap().push_back(response);
    }

    pub fn queue_update(&self, response: Result<HoldingUpdateResponse>) {
        self.update_responses.lock().unwrap().push_back(response);
    }

    pub fn queue_search(&self, response: Result<BriefBibSearchResponse>) {
        self.search_responses.lock().unwrap().push_back(response);
    }
}

fn next<T>(queue: &Mutex<VecDeque<Result<T>>>) -> Result<T> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(BibsyncError::Internal("no queued response".into())))
}

#[async_trait]
impl WorldcatApi for MockApi {
    async fn check_control_numbers(
        &self,
        oclc_numbers: &str,
    ) -> Result<ControlNumberCheckResponse> {
        self.check_calls.lock().unwrap().push(oclc_numbers.to_string());
        next(&self.check_responses)
    }

    async fn update_holdings(
        &self,
        operation: HoldingOperation,
        oclc_numbers: &str,
        cascade: Option<Cascade>,
    ) -> Result<HoldingUpdateResponse> {
        self.update_calls.lock().unwrap().push((operation, oclc_numbers.to_string(), cascade));
        next(&self.update_responses)
    }

    async fn search_brief_bibs(
        &self,
        query: &str,
        held_by_symbol: Option<&str>,
    ) -> Result<BriefBibSearchResponse> {
        self.search_calls
            .lock()
            .unwrap()
            .push((query.to_string(), held_by_symbol.map(str::to_string)));
        next(&self.search_responses)
    }
}

/// Handle onto the rows captured by a [`RecordingSink`].
#[derive(Clone, Default)]
pub struct SinkSpy(Arc<Mutex<Vec<Vec<String>>>>);

impl SinkSpy {
    pub fn sink(&self) -> Box<dyn RowSink> {
        Box::new(RecordingSink(self.clone()))
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.0.lock().unwrap().clone()
    }
}

struct RecordingSink(SinkSpy);

impl RowSink for RecordingSink {
    fn write_row(&mut self, fields: &[&str]) -> Result<()> {
        self.0 .0.lock().unwrap().push(fields.iter().map(ToString::to_string).collect());
        Ok(())
    }
}

pub fn check_entry(requested: &str, current: &str, found: bool, merged: bool) -> ControlNumberEntry {
    ControlNumberEntry {
        requested_oclc_number: requested.to_string(),
        current_oclc_number: current.to_string(),
        found,
        merged,
    }
}

pub fn holding_entry(
    requested: &str,
    current: &str,
    status: &str,
    detail: &str,
) -> HoldingEntry {
    HoldingEntry {
        requested_oclc_number: requested.to_string(),
        current_oclc_number: current.to_string(),
        http_status_code: status.to_string(),
        error_detail: detail.to_string(),
    }
}

pub fn search_response(matches: u64, numbers: &[&str]) -> BriefBibSearchResponse {
    BriefBibSearchResponse {
        number_of_records: matches,
        brief_records: numbers
            .iter()
            .map(|number| BriefRecord { oclc_number: (*number).to_string() })
            .collect(),
    }
}

pub fn server_error() -> BibsyncError {
    BibsyncError::Http { status: 503, detail: "Service Unavailable".into() }
}
