//! Server-side RTSP session: one connection, speaking the play path
//! (`OPTIONS`/`DESCRIBE`/`SETUP`/`PLAY`/`TEARDOWN`) against a named stream
//! looked up in the `Registry`. `ANNOUNCE`/`RECORD` (publishing into the
//! relay) are accepted but not implemented — nothing in `SPEC_FULL.md`
//! currently drives a publish-capable caller, see `DESIGN.md`.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use rand::Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use webrtc_util::marshal::Marshal;

use crate::error::{Error, Result};
use crate::media::marshal_sdp;
use crate::router::Registry;
use crate::rtsp::message::{
    parse_request, Request, Response, InterleavedFrame, HEADER_CONTENT_LENGTH, HEADER_CONTENT_TYPE,
    HEADER_PUBLIC, HEADER_SESSION, HEADER_TRANSPORT,
};
use crate::rtsp::transport::parse_transport;
use crate::track::BoundTrack;

/// RTSP session IDs only need to be unguessable enough that one player can't
/// casually address another's session; a random 8-digit decimal string
/// matches what most deployed RTSP servers hand out.
fn new_session_id() -> String {
    let n: u32 = rand::rng().random_range(0..100_000_000);
    format!("{n:08}")
}

/// Extracts the stream name from an RTSP URL's path, e.g.
/// `rtsp://host/cam1` or `rtsp://host/cam1/trackID=0` both yield `cam1`.
fn stream_name(url: &str) -> String {
    let without_scheme = url.splitn(2, "://").nth(1).unwrap_or(url);
    let path = without_scheme.splitn(2, '/').nth(1).unwrap_or("");
    path.split('/').next().unwrap_or("").to_owned()
}

/// Reads one request from `reader`, or `Ok(None)` on a clean EOF before any
/// bytes of a new message arrive (the normal way a player disconnects
/// without sending `TEARDOWN`).
async fn read_request(reader: &mut OwnedReadHalf) -> Result<Option<Request>> {
    let mut head = BytesMut::new();
    let first = match reader.read_u8().await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(Error::from(e)),
    };
    head.extend_from_slice(&[first]);
    loop {
        if head.len() >= 4 && &head[head.len() - 4..] == b"\r\n\r\n" {
            break;
        }
        let byte = reader.read_u8().await?;
        head.extend_from_slice(&[byte]);
    }
    let head_str = std::str::from_utf8(&head[..head.len() - 4])
        .map_err(|e| Error::MalformedMessage(e.to_string()))?
        .to_owned();

    let content_length: usize = head_str
        .lines()
        .find_map(|line| {
            line.split_once(':').and_then(|(name, value)| {
                name.trim()
                    .eq_ignore_ascii_case(HEADER_CONTENT_LENGTH)
                    .then(|| value.trim().parse().unwrap_or(0))
            })
        })
        .unwrap_or(0);

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).await?;
    }

    Ok(Some(parse_request(&head_str, Bytes::from(body))?))
}

pub async fn serve_session(socket: TcpStream, registry: Arc<Registry>) -> Result<()> {
    let (mut read_half, write_half) = socket.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();

    let writer_task = tokio::spawn(async move {
        let mut write_half = write_half;
        while let Some(bytes) = rx.recv().await {
            if write_half.write_all(&bytes).await.is_err() {
                break;
            }
        }
    });

    let mut session_id: Option<String> = None;
    let mut bound: Vec<BoundTrack> = Vec::new();
    let mtu = 1500usize;

    let result = loop {
        let request = match read_request(&mut read_half).await {
            Ok(Some(request)) => request,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };
        let cseq = request.cseq();

        let response = match request.method.as_str() {
            "OPTIONS" => {
                let mut resp = Response::ok(cseq);
                resp.headers.set(
                    HEADER_PUBLIC,
                    "OPTIONS, DESCRIBE, SETUP, PLAY, TEARDOWN, GET_PARAMETER",
                );
                resp
            }
            "DESCRIBE" => {
                let name = stream_name(&request.url);
                match registry.get(&name) {
                    Some(stream) => {
                        let medias = stream.medias();
                        let sdp = marshal_sdp(&medias);
                        let mut resp = Response::ok(cseq);
                        resp.headers.set(HEADER_CONTENT_TYPE, "application/sdp");
                        resp.body = Bytes::from(sdp);
                        resp
                    }
                    None => Response::new(404, "Stream Not Found"),
                }
            }
            "SETUP" => {
                let name = stream_name(&request.url);
                let transport_header = request.headers.get(HEADER_TRANSPORT).unwrap_or("");
                match (registry.get(&name), parse_transport(transport_header)) {
                    (Some(stream), Ok(channels)) => {
                        let remote = stream.medias().into_iter().next().map(|mut m| {
                            m.direction = m.direction.complement();
                            m
                        });
                        let sink = {
                            let tx = tx.clone();
                            let channel = channels.rtp;
                            let sink: crate::track::Sink =
                                Box::new(move |packet: &rtp::packet::Packet| {
                                    let payload = packet.marshal().map_err(Error::from)?;
                                    let frame = InterleavedFrame { channel, payload };
                                    tx.send(Bytes::from(frame.encode()))
                                        .map_err(|_| Error::ConnectionClosed)
                                });
                            sink
                        };

                        match remote.and_then(|remote| stream.add_consumer(&remote, mtu, sink).ok())
                        {
                            Some(handle) => {
                                bound.push(handle);
                                if session_id.is_none() {
                                    session_id = Some(new_session_id());
                                }
                                let mut resp = Response::ok(cseq);
                                resp.headers
                                    .set(HEADER_TRANSPORT, channels.header_value());
                                resp.headers
                                    .set(HEADER_SESSION, session_id.clone().unwrap_or_default());
                                resp
                            }
                            None => Response::new(460, "Only Aggregate Operation Allowed"),
                        }
                    }
                    (None, _) => Response::new(404, "Stream Not Found"),
                    (_, Err(_)) => Response::new(461, "Unsupported Transport"),
                }
            }
            "PLAY" => {
                let mut resp = Response::ok(cseq);
                if let Some(session) = &session_id {
                    resp.headers.set(HEADER_SESSION, session.clone());
                }
                resp
            }
            "TEARDOWN" => {
                for handle in bound.drain(..) {
                    handle.unbind();
                }
                let mut resp = Response::ok(cseq);
                if let Some(session) = &session_id {
                    resp.headers.set(HEADER_SESSION, session.clone());
                }
                let mut bytes = resp.to_string().into_bytes();
                bytes.extend_from_slice(&resp.body);
                let _ = tx.send(Bytes::from(bytes));
                break Ok(());
            }
            "GET_PARAMETER" => Response::ok(cseq),
            "ANNOUNCE" | "RECORD" => Response::new(501, "Not Implemented"),
            other => Response::new(501, &format!("Unknown method: {other}")),
        };

        let mut bytes = response.to_string().into_bytes();
        bytes.extend_from_slice(&response.body);
        if tx.send(Bytes::from(bytes)).is_err() {
            break Ok(());
        }
    };

    for handle in bound {
        handle.unbind();
    }
    drop(tx);
    let _ = writer_task.await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_name_takes_the_first_path_segment() {
        assert_eq!(stream_name("rtsp://host/cam1"), "cam1");
        assert_eq!(stream_name("rtsp://host/cam1/trackID=0"), "cam1");
        assert_eq!(stream_name("rtsp://host:554/cam1?query=1"), "cam1?query=1");
    }
}
