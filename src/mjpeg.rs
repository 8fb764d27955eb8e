//! The MJPEG consumer, grounded on go2rtc's `cmd/mjpeg` handler: each
//! inbound JPEG is written as one multipart chunk directly to an HTTP
//! response writer. It's the one consumer in the relay where a sink write
//! failure (the player's connection dropped) unbinds itself immediately
//! instead of being logged and left bound — an HTTP response writer that
//! already errored will never succeed again, unlike a momentarily slow
//! RTSP socket.

use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::media::{Codec, Direction, MediaKind, CODEC_JPEG};
use crate::router::Stream;
use crate::track::BoundTrack;

/// Binds an MJPEG consumer to `stream`, calling `write` with each frame's
/// raw JPEG bytes. On the first error from `write`, the consumer unbinds
/// itself and the error is returned up through `Track::write_rtp`'s
/// logging (the producer side isn't otherwise notified: each consumer
/// manages its own lifecycle).
pub fn consume(
    stream: &Stream,
    write: impl Fn(&[u8]) -> Result<()> + Send + Sync + 'static,
) -> Result<BoundTrack> {
    let remote = crate::media::Media::new(
        MediaKind::Video,
        Direction::RecvOnly,
        vec![Codec::raw(CODEC_JPEG, 90_000, 0)],
    );

    let self_handle: Arc<Mutex<Option<BoundTrack>>> = Arc::new(Mutex::new(None));
    let self_handle_for_sink = self_handle.clone();

    let sink: crate::track::Sink = Box::new(move |packet| match write(&packet.payload) {
        Ok(()) => Ok(()),
        Err(err) => {
            if let Some(handle) = self_handle_for_sink.lock().unwrap().take() {
                handle.unbind();
            }
            Err(err)
        }
    });

    let bound = stream.add_consumer(&remote, 1500, sink)?;
    *self_handle.lock().unwrap() = Some(bound.clone());
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Media;
    use crate::router::{Producer, ProducerSource};
    use crate::track::Track;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    fn jpeg_producer() -> (Arc<Producer>, Arc<Track>) {
        let codec = Codec::raw(CODEC_JPEG, 90_000, 0);
        let media = Media::new(MediaKind::Video, Direction::SendOnly, vec![codec.clone()]);
        let track = Track::new(codec);
        (
            Arc::new(Producer::new(
                ProducerSource::Static,
                vec![media],
                vec![track.clone()],
            )),
            track,
        )
    }

    #[test]
    fn delivers_payload_bytes_to_the_writer() {
        let stream = Stream::new();
        let (producer, track) = jpeg_producer();
        stream.add_producer(producer);

        let received = Arc::new(StdMutex::new(Vec::new()));
        let r = received.clone();
        let bound = consume(&stream, move |bytes| {
            r.lock().unwrap().push(bytes.to_vec());
            Ok(())
        })
        .unwrap();

        let packet = rtp::packet::Packet {
            header: rtp::header::Header::default(),
            payload: bytes::Bytes::from_static(&[0xFF, 0xD8, 0xFF]),
        };
        track.write_rtp(&packet);

        assert_eq!(received.lock().unwrap().len(), 1);
        assert_eq!(&received.lock().unwrap()[0], &[0xFF, 0xD8, 0xFF]);
        bound.unbind();
    }

    #[test]
    fn a_write_failure_unbinds_the_consumer() {
        let stream = Stream::new();
        let (producer, track) = jpeg_producer();
        stream.add_producer(producer);

        let attempts = Arc::new(AtomicUsize::new(0));
        let a = attempts.clone();
        consume(&stream, move |_| {
            a.fetch_add(1, Ordering::SeqCst);
            Err(crate::error::Error::ConnectionClosed)
        })
        .unwrap();
        assert!(stream.active());

        let packet = rtp::packet::Packet {
            header: rtp::header::Header::default(),
            payload: bytes::Bytes::from_static(&[0xFF, 0xD8]),
        };
        track.write_rtp(&packet);

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(!stream.active());
    }
}
