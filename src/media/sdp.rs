//! Minimal RFC 4566 SDP marshal/unmarshal, scoped to exactly what the
//! relay needs: media kind, direction, codec list (rtpmap/fmtp), control
//! URL and mid. No ICE, no extmap, no bandwidth lines — this is not a
//! general-purpose SDP library.

use super::codec::Codec;
use super::direction::{
    Direction, DIRECTION_INACTIVE_STR, DIRECTION_RECV_ONLY_STR, DIRECTION_SEND_ONLY_STR,
    DIRECTION_SEND_RECV_STR,
};
use super::media::{Media, MediaKind};
use crate::error::{Error, Result};

const SDP_HEADER: &str = "v=0\r\no=- 0 0 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\n";

struct RawMediaDescription {
    kind: String,
    formats: Vec<String>,
    attributes: Vec<(String, String)>,
}

/// Parses one SDP session description into zero or more `Media`.
/// A `sendrecv` media description is split into two entries (`recvonly`
/// then `sendonly`, in that order) so downstream code treats each
/// direction independently. An empty body is not an error — it just
/// yields an empty media list.
pub fn unmarshal_sdp(raw: &[u8]) -> Result<Vec<Media>> {
    let text = std::str::from_utf8(raw).map_err(|e| Error::InvalidSdp(e.to_string()))?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let raw_medias = parse_media_descriptions(text)?;

    let mut medias = Vec::new();
    for raw_media in raw_medias {
        let media = unmarshal_media(&raw_media)?;
        if media.direction == Direction::SendRecv {
            let mut recv = media.clone();
            recv.direction = Direction::RecvOnly;
            medias.push(recv);

            let mut send = media;
            send.direction = Direction::SendOnly;
            medias.push(send);
        } else {
            medias.push(media);
        }
    }

    Ok(medias)
}

fn parse_media_descriptions(text: &str) -> Result<Vec<RawMediaDescription>> {
    let mut out = Vec::new();
    let mut current: Option<RawMediaDescription> = None;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        match key {
            "m" => {
                if let Some(m) = current.take() {
                    out.push(m);
                }
                // m=<media> <port>/<number> <proto> <fmt> ...
                let mut parts = value.split_whitespace();
                let kind = parts
                    .next()
                    .ok_or_else(|| Error::InvalidSdp("missing m= media type".into()))?
                    .to_owned();
                // skip port and proto
                let formats: Vec<String> = parts.skip(2).map(|s| s.to_owned()).collect();
                current = Some(RawMediaDescription {
                    kind,
                    formats,
                    attributes: Vec::new(),
                });
            }
            "a" => {
                if let Some(m) = current.as_mut() {
                    let (akey, avalue) = value.split_once(':').unwrap_or((value, ""));
                    m.attributes.push((akey.to_owned(), avalue.to_owned()));
                }
            }
            _ => {}
        }
    }
    if let Some(m) = current.take() {
        out.push(m);
    }
    Ok(out)
}

fn unmarshal_media(raw: &RawMediaDescription) -> Result<Media> {
    let kind = match raw.kind.as_str() {
        "video" => MediaKind::Video,
        "audio" => MediaKind::Audio,
        other => return Err(Error::InvalidSdp(format!("unsupported media kind: {other}"))),
    };

    let mut direction = Direction::RecvOnly;
    let mut control = String::new();
    let mut mid = String::new();
    let mut has_direction_attr = false;

    for (key, value) in &raw.attributes {
        match key.as_str() {
            DIRECTION_SEND_ONLY_STR => {
                direction = Direction::SendOnly;
                has_direction_attr = true;
            }
            DIRECTION_RECV_ONLY_STR => {
                direction = Direction::RecvOnly;
                has_direction_attr = true;
            }
            DIRECTION_SEND_RECV_STR => {
                direction = Direction::SendRecv;
                has_direction_attr = true;
            }
            DIRECTION_INACTIVE_STR => {
                direction = Direction::Inactive;
                has_direction_attr = true;
            }
            "control" => control = value.clone(),
            "mid" => mid = value.clone(),
            _ => {}
        }
    }
    let _ = has_direction_attr; // default already matches "absent => recvonly"

    let mut codecs = Vec::with_capacity(raw.formats.len());
    for payload_type in &raw.formats {
        codecs.push(unmarshal_codec(raw, payload_type)?);
    }

    Ok(Media {
        kind,
        direction,
        codecs,
        control,
        mid,
        title: String::new(),
    })
}

fn unmarshal_codec(raw: &RawMediaDescription, payload_type: &str) -> Result<Codec> {
    let pt: u8 = payload_type
        .parse()
        .map_err(|_| Error::InvalidSdp(format!("bad payload type: {payload_type}")))?;

    let mut name = String::new();
    let mut clock_rate = 0u32;
    let mut channels = 0u16;
    let mut fmtp_line = String::new();

    for (key, value) in &raw.attributes {
        match key.as_str() {
            "rtpmap" if name.is_empty() && value.starts_with(payload_type) => {
                if let Some(i) = value.find(' ') {
                    let rest = value[i + 1..].trim_end();
                    let mut parts = rest.split('/');
                    name = parts.next().unwrap_or("").to_ascii_uppercase();
                    if let Some(rate) = parts.next() {
                        clock_rate = rate.trim().parse().unwrap_or(0);
                    }
                    if let Some("2") = parts.next() {
                        channels = 2;
                    }
                }
            }
            "fmtp" if fmtp_line.is_empty() && value.starts_with(payload_type) => {
                if let Some(i) = value.find(' ') {
                    fmtp_line = value[i + 1..].to_owned();
                }
            }
            _ => {}
        }
    }

    if name.is_empty() {
        // https://en.wikipedia.org/wiki/RTP_payload_formats
        match payload_type {
            "0" => {
                name = "PCMU".into();
                clock_rate = 8_000;
            }
            "8" => {
                name = "PCMA".into();
                clock_rate = 8_000;
            }
            "14" => {
                name = "MPA".into();
                clock_rate = 44_100;
            }
            "26" => {
                name = "JPEG".into();
                clock_rate = 90_000;
            }
            other => name = other.to_owned(),
        }
    }

    Ok(Codec {
        name,
        clock_rate,
        channels,
        fmtp_line,
        payload_type: pt,
    })
}

/// Emits a minimal session: the canonical four-line header, then one media
/// description per input media whose codec list is non-empty, using the
/// first codec only. Payload types are assigned starting at 96.
pub fn marshal_sdp(medias: &[Media]) -> Vec<u8> {
    let mut out = String::from(SDP_HEADER);
    let mut payload_type = 96u8;

    for media in medias {
        let Some(codec) = media.codecs.first() else {
            continue;
        };
        let kind = match media.kind {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        };
        out.push_str(&format!("m={kind} 0 RTP/AVP {payload_type}\r\n"));
        out.push_str(&format!("a={}\r\n", media.direction));
        if channels_suffix(codec.channels).is_empty() {
            out.push_str(&format!(
                "a=rtpmap:{payload_type} {}/{}\r\n",
                codec.name, codec.clock_rate
            ));
        } else {
            out.push_str(&format!(
                "a=rtpmap:{payload_type} {}/{}/{}\r\n",
                codec.name,
                codec.clock_rate,
                channels_suffix(codec.channels)
            ));
        }
        if !codec.fmtp_line.is_empty() {
            out.push_str(&format!("a=fmtp:{payload_type} {}\r\n", codec.fmtp_line));
        }
        if !media.control.is_empty() {
            out.push_str(&format!("a=control:{}\r\n", media.control));
        }

        payload_type += 1;
    }

    out.into_bytes()
}

fn channels_suffix(channels: u16) -> &'static str {
    match channels {
        2 => "2",
        _ => "",
    }
}

/// RTSP-specific wrapper around `unmarshal_sdp`: retries once with the
/// canonical header prepended if the raw body fails to parse (some cameras
/// omit the session-level header), then applies the ONVIF direction
/// inversion (§4.5): a remote media marked `recvonly` or unmarked is
/// re-labeled `sendonly` internally, and vice versa, because cameras
/// advertise direction from the client's point of view.
pub fn unmarshal_rtsp_sdp(raw: &[u8]) -> Result<Vec<Media>> {
    let mut medias = match unmarshal_sdp(raw) {
        Ok(medias) => medias,
        Err(first_err) => {
            let text = std::str::from_utf8(raw).unwrap_or("");
            match text.find("\nm=") {
                Some(i) => {
                    let mut fixed = SDP_HEADER.as_bytes().to_vec();
                    fixed.extend_from_slice(&raw[i + 1..]);
                    unmarshal_sdp(&fixed)?
                }
                None => return Err(first_err),
            }
        }
    };

    for media in &mut medias {
        media.direction = match media.direction {
            Direction::RecvOnly => Direction::SendOnly,
            Direction::SendOnly => Direction::RecvOnly,
            other => other,
        };
    }

    Ok(medias)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::media::MediaKind;

    #[test]
    fn empty_body_yields_empty_list() {
        let medias = unmarshal_sdp(b"").unwrap();
        assert!(medias.is_empty());
    }

    #[test]
    fn roundtrip_up_to_payload_type_renumbering() {
        let media = Media {
            kind: MediaKind::Video,
            direction: Direction::SendOnly,
            codecs: vec![Codec::raw("H264", 90_000, 0)],
            control: "trackID=0".into(),
            mid: String::new(),
            title: String::new(),
        };
        let raw = marshal_sdp(std::slice::from_ref(&media));
        let parsed = unmarshal_sdp(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].kind, media.kind);
        assert_eq!(parsed[0].direction, media.direction);
        assert_eq!(parsed[0].codecs[0].name, "H264");
        assert_eq!(parsed[0].codecs[0].payload_type, 96);
    }

    #[test]
    fn sendrecv_expands_to_two_medias() {
        let raw = b"v=0\r\no=- 0 0 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\nm=audio 0 RTP/AVP 0\r\na=sendrecv\r\n";
        let medias = unmarshal_sdp(raw).unwrap();
        assert_eq!(medias.len(), 2);
        assert_eq!(medias[0].direction, Direction::RecvOnly);
        assert_eq!(medias[1].direction, Direction::SendOnly);
    }

    #[test]
    fn static_payload_type_fallback() {
        let raw = b"v=0\r\no=- 0 0 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\nm=audio 0 RTP/AVP 0\r\n";
        let medias = unmarshal_sdp(raw).unwrap();
        assert_eq!(medias[0].codecs[0].name, "PCMU");
        assert_eq!(medias[0].codecs[0].clock_rate, 8_000);
    }

    #[test]
    fn missing_header_is_retried_by_rtsp_wrapper() {
        let raw = b"m=video 0 RTP/AVP 26\r\na=recvonly\r\n";
        let medias = unmarshal_rtsp_sdp(raw).unwrap();
        assert_eq!(medias.len(), 1);
        // ONVIF inversion: recvonly (on the wire) becomes sendonly internally.
        assert_eq!(medias[0].direction, Direction::SendOnly);
    }

    #[test]
    fn onvif_direction_inversion() {
        let raw = b"v=0\r\no=- 0 0 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\nm=audio 0 RTP/AVP 0\r\na=recvonly\r\n";
        let medias = unmarshal_rtsp_sdp(raw).unwrap();
        assert_eq!(medias[0].direction, Direction::SendOnly);
    }
}
