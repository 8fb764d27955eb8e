//! SRTP demultiplexing on one shared UDP socket, grounded on go2rtc's
//! `pkg/srtp` server: every inbound packet's SSRC is looked up in a
//! registration table to find which session it belongs to, since SRTP (by
//! design) doesn't carry anything else identifying the stream on the wire.
//! Actual decryption (key derivation, AES-GCM/CTR) is out of scope — see
//! `SPEC_FULL.md` §1 Non-goals — this module only demuxes.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};

#[derive(Default)]
pub struct SsrcRegistry {
    sessions: Mutex<HashMap<u32, String>>,
}

impl SsrcRegistry {
    pub fn new() -> SsrcRegistry {
        SsrcRegistry::default()
    }

    pub fn register(&self, ssrc: u32, session_id: &str) {
        self.sessions
            .lock()
            .unwrap()
            .insert(ssrc, session_id.to_owned());
    }

    pub fn unregister(&self, ssrc: u32) {
        self.sessions.lock().unwrap().remove(&ssrc);
    }

    pub fn session_for(&self, ssrc: u32) -> Option<String> {
        self.sessions.lock().unwrap().get(&ssrc).cloned()
    }
}

/// Extracts the SSRC field from a raw (S)RTP packet header without
/// decrypting anything — SSRC sits in the clear at a fixed offset in every
/// RTP/SRTP packet (RFC 3711 doesn't encrypt the header).
pub fn ssrc_of(packet: &[u8]) -> Result<u32> {
    if packet.len() < 12 {
        return Err(Error::MalformedMessage("srtp packet shorter than a header".into()));
    }
    Ok(u32::from_be_bytes([packet[8], packet[9], packet[10], packet[11]]))
}

/// Demuxes one inbound datagram to the session it belongs to, or
/// `Error::NoMatchingTracks` if its SSRC was never registered.
pub fn demux(registry: &SsrcRegistry, packet: &[u8]) -> Result<String> {
    let ssrc = ssrc_of(packet)?;
    registry.session_for(ssrc).ok_or(Error::NoMatchingTracks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet_with_ssrc(ssrc: u32) -> Vec<u8> {
        let mut p = vec![0u8; 12];
        p[8..12].copy_from_slice(&ssrc.to_be_bytes());
        p
    }

    #[test]
    fn ssrc_of_reads_the_fixed_offset() {
        let packet = packet_with_ssrc(0xDEADBEEF);
        assert_eq!(ssrc_of(&packet).unwrap(), 0xDEADBEEF);
    }

    #[test]
    fn short_packet_is_a_typed_error() {
        let err = ssrc_of(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, Error::MalformedMessage(_)));
    }

    #[test]
    fn demux_finds_the_registered_session() {
        let registry = SsrcRegistry::new();
        registry.register(42, "cam1");
        let packet = packet_with_ssrc(42);
        assert_eq!(demux(&registry, &packet).unwrap(), "cam1");
    }

    #[test]
    fn demux_of_an_unknown_ssrc_is_no_matching_tracks() {
        let registry = SsrcRegistry::new();
        let packet = packet_with_ssrc(7);
        let err = demux(&registry, &packet).unwrap_err();
        assert!(matches!(err, Error::NoMatchingTracks));
    }
}
