//! The `Transport` header, restricted to what this relay actually speaks:
//! interleaved TCP unicast (`RTP/AVP/TCP;unicast;interleaved=a-b`). UDP and
//! multicast transports are parsed far enough to recognize and reject with
//! `Error::UnsupportedTransport` — go2rtc's `pkg/rtsp` only ever negotiates
//! interleaved TCP, and so does this relay.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterleavedChannels {
    pub rtp: u8,
    pub rtcp: u8,
}

impl InterleavedChannels {
    pub fn for_media_index(index: usize) -> InterleavedChannels {
        let rtp = (index * 2) as u8;
        InterleavedChannels { rtp, rtcp: rtp + 1 }
    }

    pub fn header_value(&self) -> String {
        format!(
            "RTP/AVP/TCP;unicast;interleaved={}-{}",
            self.rtp, self.rtcp
        )
    }
}

pub fn parse_transport(header: &str) -> Result<InterleavedChannels> {
    if !header.contains("RTP/AVP/TCP") || !header.contains("interleaved=") {
        return Err(Error::UnsupportedTransport(header.to_owned()));
    }
    let spec = header
        .split(';')
        .find_map(|part| part.trim().strip_prefix("interleaved="))
        .ok_or_else(|| Error::UnsupportedTransport(header.to_owned()))?;
    let (rtp, rtcp) = spec
        .split_once('-')
        .ok_or_else(|| Error::UnsupportedTransport(header.to_owned()))?;
    let rtp: u8 = rtp
        .parse()
        .map_err(|_| Error::UnsupportedTransport(header.to_owned()))?;
    let rtcp: u8 = rtcp
        .parse()
        .map_err(|_| Error::UnsupportedTransport(header.to_owned()))?;
    Ok(InterleavedChannels { rtp, rtcp })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_assigned_even_odd_per_media_index() {
        assert_eq!(
            InterleavedChannels::for_media_index(0),
            InterleavedChannels { rtp: 0, rtcp: 1 }
        );
        assert_eq!(
            InterleavedChannels::for_media_index(2),
            InterleavedChannels { rtp: 4, rtcp: 5 }
        );
    }

    #[test]
    fn header_value_round_trips_through_parse() {
        let channels = InterleavedChannels::for_media_index(1);
        let parsed = parse_transport(&channels.header_value()).unwrap();
        assert_eq!(parsed, channels);
    }

    #[test]
    fn udp_transport_is_rejected() {
        let err = parse_transport("RTP/AVP;unicast;client_port=8000-8001").unwrap_err();
        assert!(matches!(err, Error::UnsupportedTransport(_)));
    }
}
