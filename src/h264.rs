//! H.264-specific repacketization: AVC (4-byte length-prefixed NAL units,
//! as delivered by RTMP) to Annex-B, and RTP fragmentation to an MTU
//! (single NAL unit packets when they fit, FU-A fragmentation otherwise,
//! per RFC 6184).

use bytes::{BufMut, Bytes, BytesMut};
use rtp::header::Header;
use rtp::packet::Packet;

use crate::media::{Codec, CODEC_H264};

/// A producer-side H.264 track whose payload type is this sentinel carries
/// raw AVC access units rather than already-RTP-shaped payloads (e.g. an
/// RTMP-sourced track). `Track::bind` checks for it to decide whether to
/// insert the fragmenter below.
pub const PAYLOAD_TYPE_AVC: u8 = 0xFF;

const NAL_TYPE_FUA: u8 = 28;
const FUA_HEADER_LEN: usize = 2;

pub fn is_avc(codec: &Codec) -> bool {
    codec.name == CODEC_H264 && codec.payload_type == PAYLOAD_TYPE_AVC
}

/// Splits a 4-byte big-endian length-prefixed AVC access unit into its
/// constituent NAL units (without start codes — callers that want Annex-B
/// bytes prepend `00 00 00 01` themselves).
pub fn split_avc(data: &[u8]) -> Vec<Bytes> {
    let mut nals = Vec::new();
    let mut offset = 0usize;
    while offset + 4 <= data.len() {
        let len = u32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]) as usize;
        offset += 4;
        if offset + len > data.len() {
            break;
        }
        nals.push(Bytes::copy_from_slice(&data[offset..offset + len]));
        offset += len;
    }
    nals
}

/// Fragments one NAL unit into one or more RTP payloads of at most `mtu`
/// bytes (header included by the caller separately): a single NAL unit
/// packet when it fits, otherwise FU-A fragments per RFC 6184 §5.8.
pub fn fragment_nal(nal: &Bytes, mtu: usize) -> Vec<Bytes> {
    if nal.len() <= mtu || nal.is_empty() {
        return vec![nal.clone()];
    }

    let nal_header = nal[0];
    let nal_type = nal_header & 0x1F;
    let nri = nal_header & 0x60;
    let payload = &nal[1..];

    let max_fragment = mtu.saturating_sub(FUA_HEADER_LEN).max(1);
    let mut fragments = Vec::new();
    let mut offset = 0usize;
    let total = payload.len();

    while offset < total {
        let end = (offset + max_fragment).min(total);
        let is_first = offset == 0;
        let is_last = end == total;

        let fu_header = {
            let mut b = nal_type;
            if is_first {
                b |= 0x80;
            }
            if is_last {
                b |= 0x40;
            }
            b
        };

        let mut out = BytesMut::with_capacity(FUA_HEADER_LEN + (end - offset));
        out.put_u8(nri | NAL_TYPE_FUA);
        out.put_u8(fu_header);
        out.put_slice(&payload[offset..end]);
        fragments.push(out.freeze());

        offset = end;
    }

    fragments
}

/// Wraps an RTP-packet sink so that writes of raw NAL-unit payloads are
/// fragmented to `mtu` first. Used for producer tracks whose payload
/// isn't already RTP-shaped (see `PAYLOAD_TYPE_AVC`).
pub fn rtp_payloader(
    mtu: usize,
    push: impl Fn(Packet) -> crate::error::Result<()> + Send + Sync + 'static,
) -> impl Fn(Packet) -> crate::error::Result<()> + Send + Sync + 'static {
    move |packet: Packet| -> crate::error::Result<()> {
        let nals = split_avc(&packet.payload);
        let nals: Vec<Bytes> = if nals.is_empty() {
            vec![packet.payload.clone()]
        } else {
            nals
        };

        let last_index = nals.len().saturating_sub(1);
        for (i, nal) in nals.iter().enumerate() {
            let fragments = fragment_nal(nal, mtu);
            let last_fragment = fragments.len().saturating_sub(1);
            for (j, fragment) in fragments.into_iter().enumerate() {
                let marker = i == last_index && j == last_fragment;
                let header = Header {
                    marker,
                    ..packet.header.clone()
                };
                push(Packet {
                    header,
                    payload: fragment,
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_avc_reads_length_prefixed_units() {
        let mut data = Vec::new();
        data.extend_from_slice(&3u32.to_be_bytes());
        data.extend_from_slice(&[0x67, 0x01, 0x02]);
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&[0x68, 0x03]);

        let nals = split_avc(&data);
        assert_eq!(nals.len(), 2);
        assert_eq!(&nals[0][..], &[0x67, 0x01, 0x02]);
        assert_eq!(&nals[1][..], &[0x68, 0x03]);
    }

    #[test]
    fn small_nal_is_not_fragmented() {
        let nal = Bytes::from_static(&[0x67, 0x01, 0x02]);
        let fragments = fragment_nal(&nal, 1500);
        assert_eq!(fragments.len(), 1);
        assert_eq!(&fragments[0][..], &nal[..]);
    }

    #[test]
    fn large_nal_is_fua_fragmented() {
        let mut payload = vec![0x65u8]; // nal header, type 5 (IDR slice)
        payload.extend(std::iter::repeat(0xAB).take(3000));
        let nal = Bytes::from(payload);

        let fragments = fragment_nal(&nal, 1400);
        assert!(fragments.len() > 1);

        // first fragment sets the start bit
        assert_eq!(fragments[0][0] & 0x1F, NAL_TYPE_FUA);
        assert_ne!(fragments[0][1] & 0x80, 0);
        // last fragment sets the end bit
        let last = fragments.last().unwrap();
        assert_ne!(last[1] & 0x40, 0);
        // every fragment fits the mtu
        for f in &fragments {
            assert!(f.len() <= 1400);
        }
    }
}
