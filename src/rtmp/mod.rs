//! A thin RTMP producer adapter. The handshake (C0/C1/C2, chunk stream
//! demux, AMF0 command parsing) is out of scope for this relay — see the
//! Non-goals in `SPEC_FULL.md` §1 — but the shape of a producer that could
//! plug into the router is kept so `router::Producer` isn't an RTSP-only
//! abstraction.

use std::sync::Arc;

use url::Url;

use crate::error::{Error, Result};
use crate::media::{Codec, Direction, MediaKind, CODEC_H264};
use crate::router::{Producer, ProducerSource};
use crate::track::Track;

/// Connects to an `rtmp://` URL and would run the handshake plus chunk
/// stream demux; both are unimplemented, so this always returns
/// `Error::Unsupported`. Kept so the relay's stream-source dispatch (by URL
/// scheme) has a real arm to call rather than an implicit gap.
pub async fn dial(url: &str) -> Result<Arc<Producer>> {
    let parsed = Url::parse(url)?;
    if parsed.scheme() != "rtmp" {
        return Err(Error::MalformedMessage(format!(
            "not an rtmp url: {url}"
        )));
    }
    Err(Error::Unsupported("rtmp handshake"))
}

/// Wraps a H.264 access unit source (one already past the handshake, e.g. a
/// test fixture) as a `Producer` with a single video media whose codec is
/// flagged AVC (`h264::PAYLOAD_TYPE_AVC`) — matching how go2rtc's
/// `pkg/rtmp` client hands raw NAL units to `Track.WriteRTP` and lets the
/// track's own repacketizer fragment them for RTP.
pub fn avc_producer() -> Arc<Producer> {
    let mut codec = Codec::raw(CODEC_H264, 90_000, 0);
    codec.payload_type = crate::h264::PAYLOAD_TYPE_AVC;
    let media = crate::media::Media::new(MediaKind::Video, Direction::SendOnly, vec![codec.clone()]);
    let track = Track::new(codec);
    Arc::new(Producer::new(ProducerSource::Connected, vec![media], vec![track]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dial_rejects_non_rtmp_urls() {
        let err = dial("rtsp://host/stream").await.unwrap_err();
        assert!(matches!(err, Error::MalformedMessage(_)));
    }

    #[tokio::test]
    async fn dial_is_unsupported_for_now() {
        let err = dial("rtmp://host/live/stream").await.unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn avc_producer_flags_its_codec_as_avc() {
        let producer = avc_producer();
        assert!(crate::h264::is_avc(&producer.medias[0].codecs[0]));
    }
}
