use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, UdpSocket};
use std::str::FromStr;

/// The IP family a query is sent over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    pub fn of(addr: &IpAddr) -> IpFamily {
        match addr {
            IpAddr::V4(_) => IpFamily::V4,
            IpAddr::V6(_) => IpFamily::V6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IpFamily::V4 => "ipv4",
            IpFamily::V6 => "ipv6",
        }
    }

    fn any_addr(self) -> IpAddr {
        match self {
            IpFamily::V4 => Ipv4Addr::UNSPECIFIED.into(),
            IpFamily::V6 => Ipv6Addr::UNSPECIFIED.into(),
        }
    }

    fn domain(self) -> Domain {
        match self {
            IpFamily::V4 => Domain::IPV4,
            IpFamily::V6 => Domain::IPV6,
        }
    }

    /// The address to reach `server` at from a socket of this family
    ///
    /// An IPv6 socket reaches an IPv4 server through its v4-mapped address.
    /// An IPv4 socket cannot reach an IPv6 server at all.
    pub fn target(self, server: SocketAddr) -> Option<SocketAddr> {
        match (self, server.ip()) {
            (IpFamily::V4, IpAddr::V4(_)) | (IpFamily::V6, IpAddr::V6(_)) => Some(server),
            (IpFamily::V6, IpAddr::V4(ip)) => {
                Some(SocketAddr::new(ip.to_ipv6_mapped().into(), server.port()))
            }
            (IpFamily::V4, IpAddr::V6(_)) => None,
        }
    }

    fn socket(self, ty: Type, protocol: Protocol) -> io::Result<Socket> {
        let socket = Socket::new(self.domain(), ty, Some(protocol))?;
        if self == IpFamily::V6 {
            socket.set_only_v6(false)?;
        }
        socket.set_nonblocking(true)?;
        Ok(socket)
    }

    /// A non-blocking UDP socket bound to an ephemeral port
    pub fn bind_udp(self) -> io::Result<UdpSocket> {
        let socket = self.socket(Type::DGRAM, Protocol::UDP)?;
        let addr: SockAddr = SocketAddr::new(self.any_addr(), 0).into();
        socket.bind(&addr)?;
        Ok(socket.into())
    }

    /// A non-blocking, not yet connected TCP socket
    pub fn tcp_socket(self) -> io::Result<TcpStream> {
        let socket = self.socket(Type::STREAM, Protocol::TCP)?;
        socket.set_nodelay(true)?;
        Ok(socket.into())
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when an IP family name is neither `ipv4` nor `ipv6`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid ip version {0:?}: must be 'ipv4' or 'ipv6'")]
pub struct UnknownIpFamily(pub String);

impl FromStr for IpFamily {
    type Err = UnknownIpFamily;

    fn from_str(s: &str) -> Result<IpFamily, UnknownIpFamily> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ipv4" => Ok(IpFamily::V4),
            "ipv6" => Ok(IpFamily::V6),
            _ => Err(UnknownIpFamily(s.to_owned())),
        }
    }
}
