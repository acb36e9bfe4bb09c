//! Network sink.
//!
//! Frames are sent as UDP datagrams to a single destination, which can change
//! between frames.

use crate::frame::{StreamFrame, FRAME_LEN};
use anyhow::{Context, Result};
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

/// Destination for stream frames.
pub trait FrameSink {
    /// Sends a frame to `destination`.
    ///
    /// Returns `Ok` only if the whole frame has been handed to the network.
    fn send(&mut self, frame: &StreamFrame, destination: SocketAddr) -> Result<()>;
}

/// UDP frame sink.
///
/// Sends each frame as one datagram from an ephemeral local port.
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
}

impl UdpSink {
    /// Opens the UDP socket used to send frames.
    pub fn bind() -> Result<UdpSink> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .context("failed to open UDP socket")?;
        tracing::debug!(local_addr = %socket.local_addr()?, "opened UDP socket");
        Ok(UdpSink { socket })
    }
}

impl FrameSink for UdpSink {
    fn send(&mut self, frame: &StreamFrame, destination: SocketAddr) -> Result<()> {
        let sent = self.socket.send_to(frame.as_bytes(), destination)?;
        if sent != FRAME_LEN {
            anyhow::bail!("short send: {sent} of {FRAME_LEN} bytes");
        }
        Ok(())
    }
}
