//! Media abstraction: media descriptions, codecs, and SDP interop.
//! Pure data plus matching logic — no I/O.

mod codec;
mod direction;
#[allow(clippy::module_inception)]
mod media;
mod sdp;

pub use codec::{
    kind_of, Codec, Kind, CODEC_AAC, CODEC_AV1, CODEC_G722, CODEC_H264, CODEC_H265, CODEC_JPEG,
    CODEC_MPA, CODEC_OPUS, CODEC_PCMA, CODEC_PCMU, CODEC_VP8, CODEC_VP9,
};
pub use direction::Direction;
pub use media::{Media, MediaKind};
pub use sdp::{marshal_sdp, unmarshal_rtsp_sdp, unmarshal_sdp};
