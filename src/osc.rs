//! Minimal OSC 1.0 client for the synthesis engine.
//!
//! A message is an address pattern, a type-tag string, and arguments:
//!
//! ```text
//! /acc/music/bpm\0\0 ,f\0\0 [f32 big-endian]
//! ```
//!
//! Every chunk is padded with NULs to a four-byte boundary, and numeric
//! arguments are big-endian. That is the whole of what the engine needs,
//! so we encode it directly rather than pulling in a full OSC stack.
//!
//! Sending is fire-and-forget over UDP: the engine never acknowledges,
//! and a missing engine must not stall the mapping loop.

use log::warn;
use std::{
    fmt, io,
    net::{ToSocketAddrs, UdpSocket},
};

/// One OSC argument. The engine's address space only uses these three.
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    Int(i32),
    Float(f32),
    Str(String),
}

impl OscArg {
    fn type_tag(&self) -> u8 {
        match self {
            OscArg::Int(_) => b'i',
            OscArg::Float(_) => b'f',
            OscArg::Str(_) => b's',
        }
    }
}

impl From<i32> for OscArg {
    fn from(v: i32) -> Self {
        OscArg::Int(v)
    }
}

impl From<f32> for OscArg {
    fn from(v: f32) -> Self {
        OscArg::Float(v)
    }
}

impl From<&str> for OscArg {
    fn from(v: &str) -> Self {
        OscArg::Str(v.to_owned())
    }
}

/// A tagged control message bound for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub addr: String,
    pub args: Vec<OscArg>,
}

impl OscMessage {
    pub fn new(addr: impl Into<String>, args: Vec<OscArg>) -> Self {
        Self {
            addr: addr.into(),
            args,
        }
    }

    /// Shorthand for the overwhelmingly common single-argument message.
    pub fn single(addr: impl Into<String>, arg: impl Into<OscArg>) -> Self {
        Self::new(addr, vec![arg.into()])
    }

    /// Encode to the wire representation.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.addr.len() + 8 + self.args.len() * 8);

        push_padded_str(&mut buf, &self.addr);

        let mut tags = Vec::with_capacity(self.args.len() + 1);
        tags.push(b',');
        tags.extend(self.args.iter().map(OscArg::type_tag));
        push_padded_bytes(&mut buf, &tags);

        for arg in &self.args {
            match arg {
                OscArg::Int(v) => buf.extend_from_slice(&v.to_be_bytes()),
                OscArg::Float(v) => buf.extend_from_slice(&v.to_be_bytes()),
                OscArg::Str(v) => push_padded_str(&mut buf, v),
            }
        }

        buf
    }
}

/// Append `s` plus a terminating NUL, padded to a 4-byte boundary.
fn push_padded_str(buf: &mut Vec<u8>, s: &str) {
    push_padded_bytes(buf, s.as_bytes());
}

fn push_padded_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(bytes);
    // At least one NUL terminator, then out to the boundary.
    let padding = 4 - bytes.len() % 4;
    buf.extend(std::iter::repeat(0u8).take(padding));
}

/// Errors from constructing the sender. Per-message send failures are
/// deliberately not surfaced as errors; see [`OscSender::send`].
#[derive(Debug)]
pub enum OscError {
    /// Could not bind the local UDP socket.
    Bind(io::Error),

    /// The target address did not resolve.
    BadTarget(String),
}

impl fmt::Display for OscError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OscError::Bind(e) => write!(f, "could not bind udp socket: {}", e),
            OscError::BadTarget(t) => write!(f, "could not resolve osc target {:?}", t),
        }
    }
}

impl std::error::Error for OscError {}

/// Fire-and-forget OSC sender over UDP.
pub struct OscSender {
    socket: UdpSocket,
    target: std::net::SocketAddr,
    /// Messages dropped since construction, for the shutdown log line.
    dropped: u64,
}

impl OscSender {
    /// Bind an ephemeral local socket aimed at `target` (host:port).
    pub fn connect(target: &str) -> Result<Self, OscError> {
        let target_addr = target
            .to_socket_addrs()
            .map_err(|_| OscError::BadTarget(target.to_owned()))?
            .next()
            .ok_or_else(|| OscError::BadTarget(target.to_owned()))?;

        let socket = UdpSocket::bind("0.0.0.0:0").map_err(OscError::Bind)?;
        socket.set_nonblocking(true).map_err(OscError::Bind)?;

        Ok(Self {
            socket,
            target: target_addr,
            dropped: 0,
        })
    }

    /// Send one message. Failure is logged and swallowed: the destination
    /// being away is a transient condition that heals on a later tick, and
    /// must never block the caller.
    pub fn send(&mut self, msg: &OscMessage) {
        let encoded = msg.encode();
        if let Err(e) = self.socket.send_to(&encoded, self.target) {
            if self.dropped == 0 {
                warn!("dropping osc messages to {}: {}", self.target, e);
            }
            self.dropped += 1;
        }
    }

    /// Send a batch of messages.
    pub fn send_all(&mut self, msgs: &[OscMessage]) {
        for msg in msgs {
            self.send(msg);
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
