//! The process-wide name-to-`Stream` table. Stream names come from
//! configuration (`src/config.rs`); this registry only tracks lifecycle —
//! `get_or_new` for a name seen for the first time, `delete` once a stream
//! has no producers and no consumers left.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::router::stream::Stream;

#[derive(Default)]
pub struct Registry {
    streams: Mutex<HashMap<String, Arc<Stream>>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Stream>> {
        self.streams.lock().unwrap().get(name).cloned()
    }

    pub fn get_or_new(&self, name: &str) -> Arc<Stream> {
        self.streams
            .lock()
            .unwrap()
            .entry(name.to_owned())
            .or_insert_with(|| Arc::new(Stream::new()))
            .clone()
    }

    /// Registers `stream` under `name`, replacing whatever was there.
    pub fn new_stream(&self, name: &str, stream: Arc<Stream>) {
        self.streams.lock().unwrap().insert(name.to_owned(), stream);
    }

    pub fn delete(&self, name: &str) -> Option<Arc<Stream>> {
        self.streams.lock().unwrap().remove(name)
    }

    pub fn all(&self) -> Vec<String> {
        self.streams.lock().unwrap().keys().cloned().collect()
    }
}
