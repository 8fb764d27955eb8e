//! RTSP/1.0 request and response lines, headers, and the interleaved
//! binary-data framing that shares the same TCP connection (RFC 2326 §10,
//! §C.3). Parsing is deliberately forgiving of header casing and omitted
//! `Content-Length`, matching what real cameras and encoders send.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

use crate::error::{Error, Result};

pub const HEADER_CSEQ: &str = "CSeq";
pub const HEADER_SESSION: &str = "Session";
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_TRANSPORT: &str = "Transport";
pub const HEADER_WWW_AUTHENTICATE: &str = "WWW-Authenticate";
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_PUBLIC: &str = "Public";
pub const HEADER_RANGE: &str = "Range";

/// Case-insensitive header bag, keyed by the header's canonical lowercase
/// name but displayed with the name the caller first used.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: BTreeMap<String, (String, String)>,
}

impl Headers {
    pub fn new() -> Headers {
        Headers::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .insert(name.to_ascii_lowercase(), (name.to_owned(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.values().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl Request {
    pub fn new(method: &str, url: &str) -> Request {
        Request {
            method: method.to_owned(),
            url: url.to_owned(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    pub fn cseq(&self) -> Option<u32> {
        self.headers.get(HEADER_CSEQ)?.trim().parse().ok()
    }
}

impl Response {
    pub fn new(status: u16, reason: &str) -> Response {
        Response {
            status,
            reason: reason.to_owned(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    pub fn ok(cseq: Option<u32>) -> Response {
        let mut resp = Response::new(200, "OK");
        if let Some(cseq) = cseq {
            resp.headers.set(HEADER_CSEQ, cseq.to_string());
        }
        resp
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} RTSP/1.0\r\n", self.method, self.url)?;
        for (name, value) in self.headers.iter() {
            write!(f, "{name}: {value}\r\n")?;
        }
        if !self.body.is_empty() {
            write!(f, "{}: {}\r\n", HEADER_CONTENT_LENGTH, self.body.len())?;
        }
        write!(f, "\r\n")?;
        Ok(())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RTSP/1.0 {} {}\r\n", self.status, self.reason)?;
        for (name, value) in self.headers.iter() {
            write!(f, "{name}: {value}\r\n")?;
        }
        if !self.body.is_empty() {
            write!(f, "{}: {}\r\n", HEADER_CONTENT_LENGTH, self.body.len())?;
        }
        write!(f, "\r\n")?;
        Ok(())
    }
}

/// One interleaved binary data block (RFC 2326 Appendix C.3): `$`, a
/// channel id, a big-endian u16 length, then that many bytes of RTP or
/// RTCP. Even channel numbers carry RTP, odd ones carry RTCP for the same
/// media, by convention established at `SETUP`.
pub const INTERLEAVED_MAGIC: u8 = 0x24;

#[derive(Debug, Clone)]
pub struct InterleavedFrame {
    pub channel: u8,
    pub payload: Bytes,
}

impl InterleavedFrame {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.payload.len());
        out.push(INTERLEAVED_MAGIC);
        out.push(self.channel);
        out.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn is_rtcp(&self) -> bool {
        self.channel % 2 == 1
    }
}

/// Splits a header block (as found between the start line and the blank
/// line) into name/value pairs, tolerating header folding and stray
/// whitespace the way real devices produce it.
pub fn parse_headers(lines: &[&str]) -> Headers {
    let mut headers = Headers::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.set(name.trim(), value.trim());
        }
    }
    headers
}

/// Parses one full request from a buffer already split on `\r\n\r\n` into
/// `(head, body)`.
pub fn parse_request(head: &str, body: Bytes) -> Result<Request> {
    let mut lines = head.lines();
    let start = lines
        .next()
        .ok_or_else(|| Error::MalformedMessage("empty request".into()))?;
    let mut parts = start.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| Error::MalformedMessage("missing method".into()))?
        .to_owned();
    let url = parts
        .next()
        .ok_or_else(|| Error::MalformedMessage("missing url".into()))?
        .to_owned();

    let remaining: Vec<&str> = lines.collect();
    let headers = parse_headers(&remaining);

    Ok(Request {
        method,
        url,
        headers,
        body,
    })
}

pub fn parse_response(head: &str, body: Bytes) -> Result<Response> {
    let mut lines = head.lines();
    let start = lines
        .next()
        .ok_or_else(|| Error::MalformedMessage("empty response".into()))?;
    let mut parts = start.splitn(3, ' ');
    let _proto = parts
        .next()
        .ok_or_else(|| Error::MalformedMessage("missing proto".into()))?;
    let status: u16 = parts
        .next()
        .ok_or_else(|| Error::MalformedMessage("missing status".into()))?
        .parse()
        .map_err(|_| Error::MalformedMessage("bad status code".into()))?;
    let reason = parts.next().unwrap_or("").to_owned();

    let remaining: Vec<&str> = lines.collect();
    let headers = parse_headers(&remaining);

    Ok(Response {
        status,
        reason,
        headers,
        body,
    })
}
