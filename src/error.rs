use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A codec name that isn't in the known table was handed to `Codec::new`.
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// `add_consumer` could not find any overlapping codec across any producer media.
    #[error("couldn't find the matching tracks")]
    NoMatchingTracks,

    /// SDP body didn't parse, even after the canonical-header retry.
    #[error("invalid sdp: {0}")]
    InvalidSdp(String),

    /// An RTSP response carried an unexpected status code.
    #[error("wrong response on {0}: {1}")]
    UnexpectedStatus(String, u16),

    /// `Transport` header on a `SETUP` response/request didn't match what we support.
    #[error("wrong transport: {0}")]
    UnsupportedTransport(String),

    /// Malformed RTSP request/response line or header block.
    #[error("malformed rtsp message: {0}")]
    MalformedMessage(String),

    #[error("user/pass not provided")]
    AuthNotProvided,

    #[error("wrong user/pass")]
    WrongCredentials,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tls error: {0}")]
    Tls(String),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("rtp error: {0}")]
    Rtp(#[from] rtp::Error),

    #[error("rtcp error: {0}")]
    Rtcp(#[from] rtcp::Error),

    #[error("marshal error: {0}")]
    Marshal(#[from] webrtc_util::Error),

    #[error("not supported: {0}")]
    Unsupported(&'static str),

    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
