use crate::error::{Error, Result};

pub const CODEC_H264: &str = "H264";
pub const CODEC_H265: &str = "H265";
pub const CODEC_VP8: &str = "VP8";
pub const CODEC_VP9: &str = "VP9";
pub const CODEC_AV1: &str = "AV1";
pub const CODEC_JPEG: &str = "JPEG";
pub const CODEC_PCMU: &str = "PCMU";
pub const CODEC_PCMA: &str = "PCMA";
pub const CODEC_AAC: &str = "MPEG4-GENERIC";
pub const CODEC_OPUS: &str = "OPUS";
pub const CODEC_G722: &str = "G722";
pub const CODEC_MPA: &str = "MPA";

/// A single negotiable codec: take the best parts of an SDP `rtpmap`/`fmtp`
/// pair and an RTP payload type into one value type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codec {
    pub name: String,
    pub clock_rate: u32,
    pub channels: u16,
    pub fmtp_line: String,
    pub payload_type: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Video,
    Audio,
}

impl Codec {
    /// Builds a codec from one of the known name constants, filling in the
    /// clock rate (and channel count, for Opus) from the static table.
    /// Returns `Error::UnsupportedCodec` for anything else, rather than
    /// panicking: the name may come from user-controlled configuration.
    pub fn new(name: &str) -> Result<Codec> {
        let upper = name.to_ascii_uppercase();
        let (clock_rate, channels) = match upper.as_str() {
            CODEC_H264 | CODEC_H265 | CODEC_VP8 | CODEC_VP9 | CODEC_AV1 | CODEC_JPEG => {
                (90_000, 0)
            }
            CODEC_PCMU | CODEC_PCMA => (8_000, 0),
            CODEC_OPUS => (48_000, 2),
            "MJPEG" => return Ok(Codec::raw(CODEC_JPEG, 90_000, 0)),
            _ => return Err(Error::UnsupportedCodec(name.to_owned())),
        };
        Ok(Codec::raw(&upper, clock_rate, channels))
    }

    pub fn raw(name: &str, clock_rate: u32, channels: u16) -> Codec {
        Codec {
            name: name.to_owned(),
            clock_rate,
            channels,
            fmtp_line: String::new(),
            payload_type: 0,
        }
    }

    /// True iff names are equal AND (clock rates equal OR `other`'s is 0)
    /// AND (channels equal OR `other`'s is 0). Zero on the `other` side acts
    /// as a wildcard, to tolerate under-specified remote descriptions.
    pub fn matches(&self, other: &Codec) -> bool {
        self.name == other.name
            && (self.clock_rate == other.clock_rate || other.clock_rate == 0)
            && (self.channels == other.channels || other.channels == 0)
    }

    pub fn kind(&self) -> Option<Kind> {
        kind_of(&self.name)
    }
}

/// Classifies a bare codec name into video/audio without needing a `Media`;
/// used by the RTSP server's DESCRIBE response builder, which only has
/// bound tracks (codec only), not the originating media, to work from.
pub fn kind_of(name: &str) -> Option<Kind> {
    match name {
        CODEC_H264 | CODEC_H265 | CODEC_VP8 | CODEC_VP9 | CODEC_AV1 | CODEC_JPEG => {
            Some(Kind::Video)
        }
        CODEC_PCMU | CODEC_PCMA | CODEC_AAC | CODEC_OPUS | CODEC_G722 | CODEC_MPA => {
            Some(Kind::Audio)
        }
        _ => None,
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.payload_type, self.name, self.clock_rate)?;
        if self.channels > 0 {
            write!(f, "/{}", self.channels)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_known_codec() {
        let c = Codec::new("h264").unwrap();
        assert_eq!(c.name, "H264");
        assert_eq!(c.clock_rate, 90_000);
    }

    #[test]
    fn new_unknown_codec_is_typed_error() {
        let err = Codec::new("DOESNOTEXIST").unwrap_err();
        assert!(matches!(err, Error::UnsupportedCodec(_)));
    }

    #[test]
    fn mjpeg_alias() {
        let c = Codec::new("mjpeg").unwrap();
        assert_eq!(c.name, CODEC_JPEG);
    }

    #[test]
    fn matches_is_symmetric_when_fully_specified() {
        let a = Codec::raw("H265", 90_000, 0);
        let b = Codec::raw("H265", 90_000, 0);
        assert!(a.matches(&b));
        assert!(b.matches(&a));
    }

    #[test]
    fn matches_wildcard_is_asymmetric() {
        let specified = Codec::raw("OPUS", 48_000, 2);
        let wildcard = Codec::raw("OPUS", 0, 0);
        // specified.matches(wildcard): wildcard's fields are 0 => wildcard wins
        assert!(specified.matches(&wildcard));
        // wildcard.matches(specified): specified's fields are non-zero and differ from wildcard's 0
        assert!(!wildcard.matches(&specified));
    }

    #[test]
    fn matches_requires_equal_name() {
        let a = Codec::raw("H264", 90_000, 0);
        let b = Codec::raw("H265", 90_000, 0);
        assert!(!a.matches(&b));
    }
}
