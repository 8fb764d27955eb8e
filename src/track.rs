//! A `Track` is one negotiated codec plus a fan-out list of sinks. Producers
//! call `write_rtp` once per packet; every bound consumer sink receives a
//! copy. Binding returns a handle rather than exposing sink identity, since
//! closures aren't addressable the way the equivalent `*Track` pointers are.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rtp::packet::Packet;

use crate::error::Result;
use crate::h264;
use crate::media::Codec;

pub type Sink = Box<dyn Fn(&Packet) -> Result<()> + Send + Sync>;

struct Entry {
    id: u64,
    sink: Sink,
}

pub struct Track {
    pub codec: Codec,
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

/// A handle returned by `Track::bind`; dropping it does not unbind — callers
/// must call `unbind` explicitly, matching the rest of the relay's
/// explicit-lifecycle style (no RAII teardown for network resources).
/// `unbind` is idempotent, so cloning a handle to let two owners race to
/// remove it is safe.
#[derive(Debug, Clone)]
pub struct BoundTrack {
    track: Arc<Track>,
    id: u64,
}

impl Track {
    pub fn new(codec: Codec) -> Arc<Track> {
        Arc::new(Track {
            codec,
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Binds a sink to this track. When the track's codec is flagged as AVC
    /// (raw, length-prefixed NAL units rather than RTP-shaped payloads —
    /// see `h264::PAYLOAD_TYPE_AVC`), the sink is wrapped with the RFC 6184
    /// fragmenter first so every write arrives at `push` already fragmented
    /// to `mtu`.
    pub fn bind(self: &Arc<Self>, mtu: usize, push: Sink) -> BoundTrack {
        let push: Sink = if h264::is_avc(&self.codec) {
            let push: Arc<dyn Fn(&Packet) -> Result<()> + Send + Sync> = Arc::from(push);
            Box::new(move |packet: &Packet| {
                let push = push.clone();
                h264::rtp_payloader(mtu, move |p: Packet| push(&p))(packet.clone())
            })
        } else {
            push
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().unwrap().push(Entry { id, sink: push });
        BoundTrack {
            track: self.clone(),
            id,
        }
    }

    pub fn unbind(&self, id: u64) {
        self.entries.lock().unwrap().retain(|e| e.id != id);
    }

    /// Delivers one RTP packet to every bound sink. A sink error is logged
    /// and that sink is left bound — a single slow or broken consumer must
    /// not interrupt delivery to the others.
    pub fn write_rtp(&self, packet: &Packet) {
        let entries = self.entries.lock().unwrap();
        for entry in entries.iter() {
            if let Err(err) = (entry.sink)(packet) {
                log::warn!("track sink {} failed: {err}", entry.id);
            }
        }
    }

    pub fn sink_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl BoundTrack {
    pub fn unbind(&self) {
        self.track.unbind(self.id);
    }

    pub fn track(&self) -> &Arc<Track> {
        &self.track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use rtp::header::Header;
    use std::sync::atomic::AtomicUsize;

    fn packet() -> Packet {
        Packet {
            header: Header::default(),
            payload: Bytes::from_static(&[1, 2, 3]),
        }
    }

    #[test]
    fn write_rtp_fans_out_to_every_sink() {
        let track = Track::new(Codec::raw("H265", 90_000, 0));
        let count = Arc::new(AtomicUsize::new(0));

        let c1 = count.clone();
        let b1 = track.bind(1500, Box::new(move |_| { c1.fetch_add(1, Ordering::SeqCst); Ok(()) }));
        let c2 = count.clone();
        let b2 = track.bind(1500, Box::new(move |_| { c2.fetch_add(1, Ordering::SeqCst); Ok(()) }));

        track.write_rtp(&packet());
        assert_eq!(count.load(Ordering::SeqCst), 2);

        b1.unbind();
        track.write_rtp(&packet());
        assert_eq!(count.load(Ordering::SeqCst), 3);

        b2.unbind();
        assert_eq!(track.sink_count(), 0);
    }

    #[test]
    fn a_failing_sink_does_not_stop_delivery_to_others() {
        let track = Track::new(Codec::raw("H265", 90_000, 0));
        let count = Arc::new(AtomicUsize::new(0));

        track.bind(1500, Box::new(|_| Err(crate::error::Error::ConnectionClosed)));
        let c = count.clone();
        track.bind(1500, Box::new(move |_| { c.fetch_add(1, Ordering::SeqCst); Ok(()) }));

        track.write_rtp(&packet());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn avc_track_fragments_before_delivery() {
        let mut codec = Codec::raw("H264", 90_000, 0);
        codec.payload_type = h264::PAYLOAD_TYPE_AVC;
        let track = Track::new(codec);

        let delivered = Arc::new(Mutex::new(Vec::new()));
        let d = delivered.clone();
        track.bind(
            1500,
            Box::new(move |p: &Packet| {
                d.lock().unwrap().push(p.payload.clone());
                Ok(())
            }),
        );

        let mut avc = Vec::new();
        avc.extend_from_slice(&3u32.to_be_bytes());
        avc.extend_from_slice(&[0x67, 0x01, 0x02]);
        track.write_rtp(&Packet {
            header: Header::default(),
            payload: Bytes::from(avc),
        });

        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(&delivered[0][..], &[0x67, 0x01, 0x02]);
    }
}
