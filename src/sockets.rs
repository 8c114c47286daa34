use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::config::SocketOptions;
use crate::error::HollerError;
use crate::{MDNS_GROUP_V4, MDNS_GROUP_V6};

/// Which address family a socket speaks. mDNS runs both side by side, each
/// with its own group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    Ipv4,
    Ipv6,
}

impl Family {
    pub fn wildcard(&self) -> IpAddr {
        match self {
            Family::Ipv4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            Family::Ipv6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }

    /// The mDNS group address for this family.
    pub fn group(&self) -> IpAddr {
        match self {
            Family::Ipv4 => IpAddr::V4(MDNS_GROUP_V4),
            Family::Ipv6 => IpAddr::V6(MDNS_GROUP_V6),
        }
    }

    fn domain(&self) -> Domain {
        match self {
            Family::Ipv4 => Domain::IPV4,
            Family::Ipv6 => Domain::IPV6,
        }
    }

    pub fn matches(&self, addr: &IpAddr) -> bool {
        matches!(
            (self, addr),
            (Family::Ipv4, IpAddr::V4(_)) | (Family::Ipv6, IpAddr::V6(_))
        )
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Family::Ipv4 => write!(f, "IPv4"),
            Family::Ipv6 => write!(f, "IPv6"),
        }
    }
}

/// A raw UDP socket with reuse flags and multicast hop limit applied,
/// not yet bound.
fn raw_socket(family: Family, options: &SocketOptions) -> Result<Socket, HollerError> {
    let socket = Socket::new(family.domain(), Type::DGRAM, Some(Protocol::UDP))
        .map_err(HollerError::SocketBindFailed)?;
    socket
        .set_reuse_address(options.reuse_addr)
        .map_err(HollerError::SocketBindFailed)?;
    #[cfg(unix)]
    socket
        .set_reuse_port(options.reuse_port)
        .map_err(HollerError::SocketBindFailed)?;
    socket
        .set_nonblocking(true)
        .map_err(HollerError::SocketBindFailed)?;
    match family {
        Family::Ipv4 => socket
            .set_multicast_ttl_v4(options.multicast_hops)
            .map_err(HollerError::SocketBindFailed)?,
        Family::Ipv6 => {
            socket
                .set_only_v6(true)
                .map_err(HollerError::SocketBindFailed)?;
            socket
                .set_multicast_hops_v6(options.multicast_hops)
                .map_err(HollerError::SocketBindFailed)?;
        }
    }
    Ok(socket)
}

fn into_tokio(socket: Socket) -> Result<UdpSocket, HollerError> {
    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(HollerError::SocketBindFailed)
}

/// Binds a wildcard socket at `port` and joins the family's mDNS group,
/// optionally pinning the outgoing multicast interface. This is the receive
/// path for both the responder and the querier's multicast listener.
pub fn multicast_socket(
    family: Family,
    port: u16,
    options: &SocketOptions,
    interface: Option<&str>,
) -> Result<UdpSocket, HollerError> {
    let socket = raw_socket(family, options)?;
    let bind_addr = SocketAddr::new(family.wildcard(), port);
    socket
        .bind(&bind_addr.into())
        .map_err(HollerError::SocketBindFailed)?;

    match family {
        Family::Ipv4 => socket
            .join_multicast_v4(&MDNS_GROUP_V4, &Ipv4Addr::UNSPECIFIED)
            .map_err(HollerError::JoinFailed)?,
        Family::Ipv6 => socket
            .join_multicast_v6(&MDNS_GROUP_V6, 0)
            .map_err(HollerError::JoinFailed)?,
    }

    if let Some(name) = interface {
        set_outgoing_interface(&socket, family, name)?;
    }

    debug!("Bound {family} multicast socket on {bind_addr}");
    into_tokio(socket)
}

/// Binds a unicast socket for sending queries and catching unicast replies.
/// `bind_ip` of `None` means the wildcard; the port is always ephemeral.
pub fn unicast_socket(
    family: Family,
    options: &SocketOptions,
    bind_ip: Option<IpAddr>,
) -> Result<UdpSocket, HollerError> {
    let socket = raw_socket(family, options)?;
    let bind_addr = SocketAddr::new(bind_ip.unwrap_or_else(|| family.wildcard()), 0);
    socket
        .bind(&bind_addr.into())
        .map_err(HollerError::SocketBindFailed)?;
    debug!("Bound {family} unicast socket on {bind_addr}");
    into_tokio(socket)
}

/// Applies the family-appropriate `MULTICAST_IF` option for every address
/// of the named interface whose family matches the socket's.
fn set_outgoing_interface(
    socket: &Socket,
    family: Family,
    interface: &str,
) -> Result<(), HollerError> {
    let mut applied = false;
    for iface in interface_addrs(interface)? {
        match (family, iface.ip()) {
            (Family::Ipv4, IpAddr::V4(addr)) => {
                socket
                    .set_multicast_if_v4(&addr)
                    .map_err(HollerError::SocketBindFailed)?;
                applied = true;
            }
            (Family::Ipv6, IpAddr::V6(_)) => {
                socket
                    .set_multicast_if_v6(iface.index.unwrap_or(0))
                    .map_err(HollerError::SocketBindFailed)?;
                applied = true;
            }
            _ => {}
        }
    }
    if !applied {
        warn!("Interface {interface:?} has no {family} addresses, leaving MULTICAST_IF alone");
    }
    Ok(())
}

/// All addresses carried by the named interface.
pub fn interface_addrs(interface: &str) -> Result<Vec<if_addrs::Interface>, HollerError> {
    let mut found: Vec<if_addrs::Interface> = if_addrs::get_if_addrs()
        .map_err(HollerError::SocketBindFailed)?
        .into_iter()
        .filter(|iface| iface.name == interface)
        .collect();
    if found.is_empty() {
        return Err(HollerError::InvalidArgument(format!(
            "No such interface {interface:?}"
        )));
    }
    found.sort_by_key(|iface| iface.ip());
    Ok(found)
}

/// The first matching-family address on the named interface, the querier's
/// rebind target.
pub fn interface_ip(interface: &str, family: Family) -> Result<IpAddr, HollerError> {
    interface_addrs(interface)?
        .into_iter()
        .map(|iface| iface.ip())
        .find(|ip| family.matches(ip))
        .ok_or_else(|| {
            HollerError::InvalidArgument(format!(
                "Interface {interface:?} has no {family} address"
            ))
        })
}
