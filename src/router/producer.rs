//! The producer side of a stream: something that publishes `Media`
//! descriptions and, once a consumer binds to one, pushes RTP onto that
//! media's `Track`.

use std::sync::Arc;

use crate::element::Element;
use crate::media::Media;
use crate::track::Track;

/// Where a stream's packets actually come from. An externally-driven
/// producer (most RTSP/RTMP/WebRTC sources) already runs its own read loop
/// on a spawned task and pushes into its tracks directly; `Registry` only
/// needs to know whether it should be dialed/started or is just a bag of
/// already-running tracks fed from elsewhere (e.g. a test fixture, or a
/// second consumer of the same camera sharing one dial).
#[derive(Debug)]
pub enum ProducerSource {
    Connected,
    Static,
}

#[derive(Debug)]
pub struct Producer {
    pub element: Element,
    pub source: ProducerSource,
    pub medias: Vec<Media>,
    pub tracks: Vec<Arc<Track>>,
}

impl Producer {
    pub fn new(source: ProducerSource, medias: Vec<Media>, tracks: Vec<Arc<Track>>) -> Producer {
        Producer {
            element: Element::new(),
            source,
            medias,
            tracks,
        }
    }

    /// Finds the track whose media matches `remote`, per `Media::match_media`
    /// (§4.1) — first `(media, track)` pair at the same index wins.
    pub fn track_for(&self, remote: &Media) -> Option<Arc<Track>> {
        self.medias
            .iter()
            .zip(self.tracks.iter())
            .find(|(media, _)| media.match_media(remote).is_some())
            .map(|(_, track)| track.clone())
    }
}
