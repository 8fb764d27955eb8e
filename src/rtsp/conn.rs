//! The RTSP connection state machine: one TCP socket, carrying request/
//! response signaling and interleaved RTP/RTCP for every `SETUP` media.
//! Used both to dial out to a camera (client role) and to serve a player
//! (server role) — the framing and keepalive loop are shared, only which
//! side issues requests differs.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_rustls::{client::TlsStream, TlsConnector};
use url::Url;
use webrtc_util::marshal::Unmarshal;

use crate::element::{Element, Event, State};
use crate::error::{Error, Result};
use crate::media::{unmarshal_rtsp_sdp, Media};
use crate::rtsp::auth;
use crate::rtsp::message::{
    parse_request, parse_response, InterleavedFrame, Request, Response, HEADER_AUTHORIZATION,
    HEADER_CONTENT_LENGTH, HEADER_CSEQ, HEADER_SESSION, HEADER_TRANSPORT, HEADER_WWW_AUTHENTICATE,
    INTERLEAVED_MAGIC,
};
use crate::rtsp::transport::{parse_transport, InterleavedChannels};
use crate::track::Track;

/// One message read off the wire: a protocol message, or a chunk of
/// interleaved media data multiplexed onto the same socket.
pub enum Incoming {
    Request(Request),
    Response(Response),
    Frame(InterleavedFrame),
}

/// Either a plain TCP socket (`rtsp://`) or a TLS one (`rtsps://`) — the
/// framing and state machine below don't care which, so `Conn` is generic
/// over neither and just stores this enum.
pub enum Socket {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for Socket {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Socket::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Socket::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Socket {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Socket::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Socket::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Socket::Plain(s) => Pin::new(s).poll_flush(cx),
            Socket::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Socket::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Socket::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

fn tls_connector() -> TlsConnector {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

pub struct Conn {
    stream: Mutex<Socket>,
    pub url: Url,
    cseq: AtomicU32,
    session: Mutex<Option<String>>,
    user: Option<String>,
    pass: Option<String>,
    pub element: Element,
    /// Channel number -> track to deliver received RTP into. Populated by
    /// `setup_media` (client) or the server's `SETUP` handler.
    channels: Mutex<HashMap<u8, Arc<Track>>>,
}

impl Conn {
    /// Opens the connection described by `url`: plain TCP for `rtsp://`,
    /// TLS for `rtsps://` (default port 322, per RFC 7826 §19.6).
    pub async fn dial(url: &str) -> Result<Conn> {
        let parsed = Url::parse(url)?;
        let host = parsed
            .host_str()
            .ok_or_else(|| Error::MalformedMessage("rtsp url missing host".into()))?;
        let is_tls = parsed.scheme() == "rtsps";
        let port = parsed.port().unwrap_or(if is_tls { 322 } else { 554 });
        let tcp = TcpStream::connect((host, port)).await?;

        let socket = if is_tls {
            let server_name = rustls::pki_types::ServerName::try_from(host.to_owned())
                .map_err(|_| Error::Tls(format!("invalid server name: {host}")))?;
            let tls_stream = tls_connector()
                .connect(server_name, tcp)
                .await
                .map_err(|e| Error::Tls(e.to_string()))?;
            Socket::Tls(Box::new(tls_stream))
        } else {
            Socket::Plain(tcp)
        };

        Ok(Conn::from_stream(
            socket,
            parsed.clone(),
            Some(parsed.username().to_owned()).filter(|s| !s.is_empty()),
            parsed.password().map(str::to_owned),
        ))
    }

    pub fn from_stream(
        stream: Socket,
        url: Url,
        user: Option<String>,
        pass: Option<String>,
    ) -> Conn {
        Conn {
            stream: Mutex::new(stream),
            url,
            cseq: AtomicU32::new(0),
            session: Mutex::new(None),
            user,
            pass,
            element: Element::new(),
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn next_cseq(&self) -> u32 {
        self.cseq.fetch_add(1, Ordering::Relaxed) + 1
    }

    async fn session_header(&self) -> Option<String> {
        self.session.lock().await.clone()
    }

    /// Sends a request and returns its response, retrying exactly once with
    /// an `Authorization` header if the first attempt is challenged with a
    /// 401. A second 401 is `Error::WrongCredentials`, never a further retry.
    pub async fn roundtrip(&self, mut request: Request) -> Result<Response> {
        let cseq = self.next_cseq();
        request.headers.set(HEADER_CSEQ, cseq.to_string());
        if let Some(session) = self.session_header().await {
            request.headers.set(HEADER_SESSION, session);
        }

        let response = self.send_and_read_response(&request).await?;
        if response.status != 401 {
            return Ok(response);
        }

        let challenge_header = response
            .headers
            .get(HEADER_WWW_AUTHENTICATE)
            .ok_or_else(|| Error::MalformedMessage("401 missing WWW-Authenticate".into()))?;
        let challenge = auth::parse_challenge(challenge_header)?;
        let (user, pass) = auth::credentials_required(self.user.as_deref(), self.pass.as_deref())?;

        let authorization = auth::authorize(&challenge, &user, &pass, &request.method, &request.url);
        request.headers.set(HEADER_AUTHORIZATION, authorization);
        request.headers.set(HEADER_CSEQ, self.next_cseq().to_string());

        let retried = self.send_and_read_response(&request).await?;
        if retried.status == 401 {
            return Err(Error::WrongCredentials);
        }
        Ok(retried)
    }

    async fn send_and_read_response(&self, request: &Request) -> Result<Response> {
        let mut stream = self.stream.lock().await;
        stream.write_all(request.to_string().as_bytes()).await?;
        if !request.body.is_empty() {
            stream.write_all(&request.body).await?;
        }
        loop {
            match read_message(&mut *stream).await? {
                Incoming::Response(response) => return Ok(response),
                // A server may push interleaved data or a request (e.g.
                // GET_PARAMETER keepalive) between our request and its
                // matching response; neither is a protocol error here.
                Incoming::Frame(_) | Incoming::Request(_) => continue,
            }
        }
    }

    pub async fn options(&self) -> Result<Response> {
        self.roundtrip(Request::new("OPTIONS", self.url.as_str()))
            .await
    }

    pub async fn describe(&self) -> Result<Vec<Media>> {
        let mut request = Request::new("DESCRIBE", self.url.as_str());
        request.headers.set("Accept", "application/sdp");
        let response = self.roundtrip(request).await?;
        if !response.is_success() {
            return Err(Error::UnexpectedStatus("DESCRIBE".into(), response.status));
        }
        let medias = unmarshal_rtsp_sdp(&response.body)?;
        if let Some(session) = response.headers.get(HEADER_SESSION) {
            *self.session.lock().await = Some(session.to_owned());
        }
        Ok(medias)
    }

    /// Negotiates interleaved TCP transport for one media and registers the
    /// track that received RTP for its channel should be written into.
    pub async fn setup_media(
        &self,
        media: &Media,
        channels: InterleavedChannels,
        track: Arc<Track>,
    ) -> Result<()> {
        let control_url = if media.control.is_empty() {
            self.url.to_string()
        } else if media.control.contains("://") {
            media.control.clone()
        } else {
            format!("{}/{}", self.url.as_str().trim_end_matches('/'), media.control)
        };

        let mut request = Request::new("SETUP", &control_url);
        request
            .headers
            .set(HEADER_TRANSPORT, channels.header_value());
        let response = self.roundtrip(request).await?;
        if !response.is_success() {
            return Err(Error::UnexpectedStatus("SETUP".into(), response.status));
        }

        let negotiated = response
            .headers
            .get(HEADER_TRANSPORT)
            .ok_or_else(|| Error::MalformedMessage("SETUP response missing Transport".into()))?;
        parse_transport(negotiated)?;

        if let Some(session) = response.headers.get(HEADER_SESSION) {
            let session_id = session.split(';').next().unwrap_or(session).to_owned();
            *self.session.lock().await = Some(session_id);
        }

        self.channels.lock().await.insert(channels.rtp, track);
        Ok(())
    }

    pub async fn play(&self) -> Result<Response> {
        let response = self
            .roundtrip(Request::new("PLAY", self.url.as_str()))
            .await?;
        if response.is_success() {
            self.element.fire(Event::State(State::Playing));
        }
        Ok(response)
    }

    pub async fn teardown(&self) -> Result<Response> {
        let response = self
            .roundtrip(Request::new("TEARDOWN", self.url.as_str()))
            .await?;
        self.element.fire(Event::State(State::Null));
        Ok(response)
    }

    /// Writes one RTP packet on `channel`, framed as interleaved data.
    pub async fn write_interleaved(&self, channel: u8, payload: Bytes) -> Result<()> {
        let frame = InterleavedFrame { channel, payload };
        let mut stream = self.stream.lock().await;
        stream.write_all(&frame.encode()).await?;
        Ok(())
    }

    /// Runs the post-`PLAY` read loop: dispatches interleaved RTP to the
    /// track registered for its channel, fires `Event::Rtcp` for RTCP
    /// channels, and answers in-band `GET_PARAMETER`/`OPTIONS` keepalives.
    /// Returns once the peer closes the connection or sends `TEARDOWN`.
    pub async fn handle(&self) -> Result<()> {
        loop {
            let incoming = {
                let mut stream = self.stream.lock().await;
                read_message(&mut *stream).await?
            };
            match incoming {
                Incoming::Frame(frame) => {
                    if frame.is_rtcp() {
                        self.element.fire(Event::Rtcp {
                            channel: frame.channel,
                            raw: Arc::from(frame.payload.as_ref()),
                        });
                        continue;
                    }
                    let channels = self.channels.lock().await;
                    if let Some(track) = channels.get(&frame.channel) {
                        if let Ok(packet) = rtp::packet::Packet::unmarshal(&mut frame.payload.clone())
                        {
                            track.write_rtp(&packet);
                        }
                    }
                }
                Incoming::Request(request) => {
                    let cseq = request.cseq();
                    match request.method.as_str() {
                        "TEARDOWN" => {
                            self.respond(Response::ok(cseq)).await?;
                            self.element.fire(Event::State(State::Null));
                            return Ok(());
                        }
                        "GET_PARAMETER" | "OPTIONS" => {
                            self.respond(Response::ok(cseq)).await?;
                        }
                        _ => {
                            self.element
                                .fire(Event::Request(Arc::new(request.clone())));
                            self.respond(Response::ok(cseq)).await?;
                        }
                    }
                }
                Incoming::Response(response) => {
                    self.element.fire(Event::Response(Arc::new(response)));
                }
            }
        }
    }

    async fn respond(&self, response: Response) -> Result<()> {
        let mut stream = self.stream.lock().await;
        stream.write_all(response.to_string().as_bytes()).await?;
        if !response.body.is_empty() {
            stream.write_all(&response.body).await?;
        }
        Ok(())
    }
}

async fn read_message(stream: &mut Socket) -> Result<Incoming> {
    let first = stream.read_u8().await?;
    if first == INTERLEAVED_MAGIC {
        let channel = stream.read_u8().await?;
        let len = stream.read_u16().await? as usize;
        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).await?;
        return Ok(Incoming::Frame(InterleavedFrame {
            channel,
            payload: Bytes::from(payload),
        }));
    }

    let mut head = BytesMut::new();
    head.extend_from_slice(&[first]);
    loop {
        if head.len() >= 4 && &head[head.len() - 4..] == b"\r\n\r\n" {
            break;
        }
        let byte = stream.read_u8().await?;
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
        stream.read_exact(&mut body).await?;
    }
    let body = Bytes::from(body);

    if head_str.starts_with("RTSP/") {
        Ok(Incoming::Response(parse_response(&head_str, body)?))
    } else {
        Ok(Incoming::Request(parse_request(&head_str, body)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn options_round_trips_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let n = socket.read(&mut buf).await.unwrap();
            assert!(std::str::from_utf8(&buf[..n]).unwrap().starts_with("OPTIONS"));
            socket
                .write_all(b"RTSP/1.0 200 OK\r\nCSeq: 1\r\nPublic: OPTIONS, DESCRIBE\r\n\r\n")
                .await
                .unwrap();
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let conn = Conn::from_stream(
            Socket::Plain(stream),
            Url::parse(&format!("rtsp://{addr}/stream")).unwrap(),
            None,
            None,
        );
        let response = conn.options().await.unwrap();
        assert!(response.is_success());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn describe_parses_sdp_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            let sdp =
                b"v=0\r\no=- 0 0 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\nm=video 0 RTP/AVP 96\r\na=sendonly\r\na=rtpmap:96 H264/90000\r\n";
            let head = format!(
                "RTSP/1.0 200 OK\r\nCSeq: 1\r\nContent-Length: {}\r\n\r\n",
                sdp.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(sdp).await.unwrap();
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let conn = Conn::from_stream(
            Socket::Plain(stream),
            Url::parse(&format!("rtsp://{addr}/stream")).unwrap(),
            None,
            None,
        );
        let medias = conn.describe().await.unwrap();
        assert_eq!(medias.len(), 1);
        assert_eq!(medias[0].codecs[0].name, "H264");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn a_single_401_without_credentials_is_auth_not_provided() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(b"RTSP/1.0 401 Unauthorized\r\nCSeq: 1\r\nWWW-Authenticate: Basic realm=\"cam\"\r\n\r\n")
                .await
                .unwrap();
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let conn = Conn::from_stream(
            Socket::Plain(stream),
            Url::parse(&format!("rtsp://{addr}/stream")).unwrap(),
            None,
            None,
        );
        let err = conn.options().await.unwrap_err();
        assert!(matches!(err, Error::AuthNotProvided));
        server.await.unwrap();
    }
}
