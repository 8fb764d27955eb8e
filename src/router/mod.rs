//! Stream routing: matches consumer media requests against producer media
//! lists and fans RTP out through bound tracks. No protocol I/O lives
//! here — `src/rtsp`, `src/rtmp`, `src/webrtc` and `src/mjpeg` all drive
//! this module, never the reverse.

mod producer;
mod registry;
#[allow(clippy::module_inception)]
mod stream;

pub use producer::{Producer, ProducerSource};
pub use registry::Registry;
pub use stream::Stream;
