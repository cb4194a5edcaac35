//! Mock source for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::models::AcquisitionResult;
use crate::sources::{Source, SourceCapabilities, SourceError};

/// A mock source that returns a predefined listing and abstracts.
#[derive(Debug)]
pub struct MockSource {
    listing: Result<AcquisitionResult, String>,
    abstracts: HashMap<usize, Result<String, String>>,
    abstract_calls: Arc<Mutex<Vec<usize>>>,
    shutdown_calls: Arc<Mutex<u32>>,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    /// A source with an empty listing and no abstracts
    pub fn new() -> Self {
        Self {
            listing: Ok(AcquisitionResult::empty()),
            abstracts: HashMap::new(),
            abstract_calls: Arc::new(Mutex::new(Vec::new())),
            shutdown_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Return `listing` from `list_publications`
    pub fn with_listing(mut self, listing: AcquisitionResult) -> Self {
        self.listing = Ok(listing);
        self
    }

    /// Fail `list_publications` with a network error
    pub fn failing_listing(mut self, message: &str) -> Self {
        self.listing = Err(message.to_string());
        self
    }

    /// Return `text` as the abstract of the unit at `index`
    pub fn with_abstract(mut self, index: usize, text: &str) -> Self {
        self.abstracts.insert(index, Ok(text.to_string()));
        self
    }

    /// Fail the abstract fetch of the unit at `index`
    pub fn failing_abstract(mut self, index: usize, message: &str) -> Self {
        self.abstracts.insert(index, Err(message.to_string()));
        self
    }

    /// Indices passed to `fetch_abstract`, in call order
    pub fn abstract_calls(&self) -> Arc<Mutex<Vec<usize>>> {
        self.abstract_calls.clone()
    }

    /// Number of `shutdown` calls
    pub fn shutdown_calls(&self) -> Arc<Mutex<u32>> {
        self.shutdown_calls.clone()
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::LIST | SourceCapabilities::ABSTRACTS
    }

    async fn list_publications(&mut self) -> Result<AcquisitionResult, SourceError> {
        self.listing.clone().map_err(SourceError::Network)
    }

    async fn fetch_abstract(&mut self, index: usize) -> Result<String, SourceError> {
        if let Ok(mut calls) = self.abstract_calls.lock() {
            calls.push(index);
        }

        match self.abstracts.get(&index) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(message)) => Err(SourceError::Timeout(message.clone())),
            None => Ok(String::new()),
        }
    }

    async fn shutdown(&mut self) -> Result<(), SourceError> {
        if let Ok(mut calls) = self.shutdown_calls.lock() {
            *calls += 1;
        }
        Ok(())
    }
}
