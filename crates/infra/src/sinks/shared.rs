//! Shared sink handle
//!
//! The chunked drivers and their buffers write to the same error bucket;
//! this wrapper lets one underlying sink be handed to both.

use std::sync::{Arc, Mutex};

use bibsync_core::ports::RowSink;
use bibsync_domain::{BibsyncError, Result};

/// Cloneable handle onto a single underlying sink.
pub struct SharedSink<S: RowSink> {
    inner: Arc<Mutex<S>>,
}

impl<S: RowSink> SharedSink<S> {
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self { inner: Arc::new(Mutex::new(sink)) }
    }
}

impl<S: RowSink> Clone for SharedSink<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S: RowSink> RowSink for SharedSink<S> {
    fn write_row(&mut self, fields: &[&str]) -> Result<()> {
        self.lock()?.write_row(fields)
    }

    fn flush(&mut self) -> Result<()> {
        self.lock()?.flush()
    }
}

impl<S: RowSink> SharedSink<S> {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, S>> {
        self.inner
            .lock()
            .map_err(|_| BibsyncError::Internal("shared sink lock poisoned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingSink {
        rows: usize,
    }

    impl RowSink for CountingSink {
        fn write_row(&mut self, _fields: &[&str]) -> Result<()> {
            self.rows += 1;
            Ok(())
        }
    }

    #[test]
    fn clones_write_to_the_same_sink() {
        let shared = SharedSink::new(CountingSink::default());
        let mut first = shared.clone();
        let mut second = shared.clone();

        first.write_row(&["a"]).unwrap();
        second.write_row(&["b"]).unwrap();

        assert_eq!(shared.inner.lock().unwrap().rows, 2);
    }
}
