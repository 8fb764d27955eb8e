//! RTSP client and server: message framing, Basic/Digest auth, the
//! interleaved transport negotiation, and the connection state machine
//! that drives a stream's producer or consumer side.

pub mod auth;
pub mod conn;
pub mod message;
pub mod server;
pub mod source;
pub mod transport;

pub use conn::Conn;
pub use server::serve_session;
pub use source::dial_producer;
