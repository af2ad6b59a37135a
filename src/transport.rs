//! One request/response exchange with a DNS server over UDP or TCP
//!
//! Every call opens its own socket and drops it before returning. Retries
//! are left to the caller.

use log::trace;
use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpSocket, UdpSocket};

use crate::address_family::IpFamily;

/// Largest response read from a UDP socket
pub const MAX_UDP_RESPONSE_SIZE: usize = 512;

/// The transport protocol a query is sent over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Udp,
    Tcp,
}

impl Transport {
    pub fn name(self) -> &'static str {
        match self {
            Transport::Udp => "udp",
            Transport::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a transport name is neither `udp` nor `tcp`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transport {0:?}: must be 'udp' or 'tcp'")]
pub struct UnknownTransport(pub String);

impl FromStr for Transport {
    type Err = UnknownTransport;

    fn from_str(s: &str) -> Result<Transport, UnknownTransport> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp" => Ok(Transport::Udp),
            "tcp" => Ok(Transport::Tcp),
            _ => Err(UnknownTransport(s.to_owned())),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("timeout after {0:?} waiting for the server")]
    Timeout(Duration),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("message of {0} bytes does not fit a TCP length prefix")]
    Oversized(usize),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Timeout(_) => true,
            TransportError::Io(err) => err.kind() == io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}

/// Where and how to send one query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub server: SocketAddr,
    pub transport: Transport,
    pub family: IpFamily,
    pub timeout: Duration,
}

/// Sends a query packet and returns the raw response
///
/// This is the seam between query execution and the network, so execution
/// can be driven by canned responses.
pub trait Exchanger: Send + Sync + 'static {
    fn exchange(
        &self,
        packet: &[u8],
        target: &Target,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}

/// Exchanges over real sockets
#[derive(Debug, Clone, Copy, Default)]
pub struct Network;

impl Exchanger for Network {
    fn exchange(
        &self,
        packet: &[u8],
        target: &Target,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send {
        exchange(packet, target)
    }
}

/// Performs exactly one exchange, bounded as a whole by the target timeout
///
/// When the target family cannot reach the server (an IPv6 server for an
/// IPv4 query), the socket is opened in the server's own family.
pub async fn exchange(packet: &[u8], target: &Target) -> Result<Vec<u8>, TransportError> {
    let (family, server) = match target.family.target(target.server) {
        Some(server) => (target.family, server),
        None => {
            let family = IpFamily::of(&target.server.ip());
            trace!(
                "{} cannot reach {}, using an {} socket",
                target.family,
                target.server,
                family
            );
            (family, target.server)
        }
    };

    let attempt = async {
        match target.transport {
            Transport::Udp => exchange_udp(packet, server, family).await,
            Transport::Tcp => exchange_tcp(packet, server, family).await,
        }
    };
    tokio::time::timeout(target.timeout, attempt)
        .await
        .map_err(|_| TransportError::Timeout(target.timeout))?
}

async fn exchange_udp(
    packet: &[u8],
    server: SocketAddr,
    family: IpFamily,
) -> Result<Vec<u8>, TransportError> {
    let socket = UdpSocket::from_std(family.bind_udp()?)?;
    socket.connect(server).await?;
    let sent = socket.send(packet).await?;
    trace!("sent {} bytes to {} over udp", sent, server);

    let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
    let received = socket.recv(&mut buf).await?;
    buf.truncate(received);
    trace!("received {} bytes from {} over udp", received, server);
    Ok(buf)
}

async fn exchange_tcp(
    packet: &[u8],
    server: SocketAddr,
    family: IpFamily,
) -> Result<Vec<u8>, TransportError> {
    let socket = TcpSocket::from_std_stream(family.tcp_socket()?);
    let mut stream = socket.connect(server).await?;
    send_with_length_prefix(&mut stream, packet).await?;
    trace!("sent {} bytes to {} over tcp", packet.len(), server);

    let response = read_with_length_prefix(&mut stream).await?;
    trace!("received {} bytes from {} over tcp", response.len(), server);
    Ok(response)
}

/// Writes `message` preceded by its length as a big-endian u16
pub async fn send_with_length_prefix<S>(stream: &mut S, message: &[u8]) -> Result<(), TransportError>
where
    S: AsyncWrite + Unpin,
{
    let length = u16::try_from(message.len()).map_err(|_| TransportError::Oversized(message.len()))?;
    let mut framed = Vec::with_capacity(message.len() + 2);
    framed.extend_from_slice(&length.to_be_bytes());
    framed.extend_from_slice(message);
    stream.write_all(&framed).await?;
    stream.flush().await?;
    Ok(())
}

/// Reads one message framed by a big-endian u16 length
///
/// Partial reads are accumulated until the announced length is complete.
pub async fn read_with_length_prefix<S>(stream: &mut S) -> Result<Vec<u8>, TransportError>
where
    S: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;
    let length = u16::from_be_bytes(len_buf) as usize;

    let mut message = vec![0u8; length];
    stream.read_exact(&mut message).await?;
    Ok(message)
}
