use super::codec::Codec;
use super::direction::Direction;

/// One SDP media description: a kind, a direction, and its candidate codecs,
/// in caller preference order.
#[derive(Debug, Clone)]
pub struct Media {
    pub kind: MediaKind,
    pub direction: Direction,
    pub codecs: Vec<Codec>,
    pub control: String,
    pub mid: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl Media {
    pub fn new(kind: MediaKind, direction: Direction, codecs: Vec<Codec>) -> Media {
        Media {
            kind,
            direction,
            codecs,
            control: String::new(),
            mid: String::new(),
            title: String::new(),
        }
    }

    /// Returns the first local codec matching one of `remote`'s codecs,
    /// subject to kind equality and complementary direction. If `remote`
    /// advertises no codecs at all, the first local codec is returned
    /// unconditionally — tie-break is always local codec-list order.
    pub fn match_media(&self, remote: &Media) -> Option<Codec> {
        if self.kind != remote.kind {
            return None;
        }
        if self.direction.complement() != remote.direction {
            return None;
        }

        for local_codec in &self.codecs {
            if remote.codecs.is_empty() {
                return Some(local_codec.clone());
            }
            for remote_codec in &remote.codecs {
                if local_codec.matches(remote_codec) {
                    return Some(local_codec.clone());
                }
            }
        }
        None
    }
}

impl std::fmt::Display for Media {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        };
        write!(f, "{kind}, {}", self.direction)?;
        for codec in &self.codecs {
            write!(f, ", {codec}")?;
        }
        Ok(())
    }
}
