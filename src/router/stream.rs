//! A named `Stream` aggregates zero or more producers (same camera dialed
//! more than once shares tracks this way) and serves consumers by matching
//! each consumer's requested media against every producer's media list in
//! turn, first match wins.

use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::media::Media;
use crate::router::producer::Producer;
use crate::track::BoundTrack;

#[derive(Default)]
pub struct Stream {
    producers: Mutex<Vec<Arc<Producer>>>,
}

impl Stream {
    pub fn new() -> Stream {
        Stream::default()
    }

    pub fn add_producer(&self, producer: Arc<Producer>) {
        self.producers.lock().unwrap().push(producer);
    }

    pub fn remove_producer(&self, producer: &Arc<Producer>) {
        self.producers
            .lock()
            .unwrap()
            .retain(|p| !Arc::ptr_eq(p, producer));
    }

    pub fn producer_count(&self) -> usize {
        self.producers.lock().unwrap().len()
    }

    /// True once at least one producer has at least one track with a bound
    /// consumer — used to decide whether an idle stream can be torn down.
    pub fn active(&self) -> bool {
        self.producers
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.tracks.iter().any(|t| t.sink_count() > 0))
    }

    /// Binds `push` to the first producer track whose media matches
    /// `remote`, trying producers in the order they were added. Returns
    /// `Error::NoMatchingTracks` if no producer has a compatible media.
    pub fn add_consumer(
        &self,
        remote: &Media,
        mtu: usize,
        push: crate::track::Sink,
    ) -> Result<BoundTrack> {
        let producers = self.producers.lock().unwrap();
        for producer in producers.iter() {
            if let Some(track) = producer.track_for(remote) {
                return Ok(track.bind(mtu, push));
            }
        }
        Err(Error::NoMatchingTracks)
    }

    pub fn medias(&self) -> Vec<Media> {
        self.producers
            .lock()
            .unwrap()
            .iter()
            .flat_map(|p| p.medias.clone())
            .collect()
    }
}
