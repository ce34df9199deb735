//! Provides a raw socket implementation of [`PacketConn`]
//!
//! Link sockets (`AF_PACKET`) exchange whole Ethernet frames filtered by
//! EtherType. IP sockets (`AF_INET` with `IP_HDRINCL`) exchange whole IPv4
//! datagrams for one IP protocol. Both are bound to a single interface and
//! need root or `CAP_NET_RAW`.

use libc::{
    c_int, c_void, pollfd, sa_family_t, sockaddr, sockaddr_in, sockaddr_ll,
    sockaddr_storage, socklen_t, AF_INET, AF_PACKET, IPPROTO_IP, IP_HDRINCL,
    MSG_DONTWAIT, POLLIN, POLLNVAL, POLLOUT, SHUT_RDWR, SOCK_RAW, SOL_SOCKET,
    SO_BINDTODEVICE,
};
use std::{
    io, mem,
    net::Ipv4Addr,
    os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard, PoisonError, RwLock,
    },
    time::{Duration, Instant},
};

use crate::{
    error::{RLanProbeError, Result},
    network::NetworkInterface,
    packet::{MacAddr, HARDWARE_ADDR_LEN},
};

use super::{time_remaining, Addr, Deadlines, PacketConn};

// Upper bound on a single poll so deadline changes and closes made from
// another thread are noticed by a blocked reader
const POLL_SLICE: Duration = Duration::from_millis(100);

/// The kind of raw socket to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    /// `AF_PACKET` socket; `protocol` is an EtherType
    Link,
    /// `AF_INET` socket with `IP_HDRINCL`; `protocol` is an IP protocol number
    Ip,
}

/// A raw socket bound to one interface and protocol
///
/// The descriptor is only used while holding a read guard on it, and is
/// released under the write guard, so a reader racing [`PacketConn::close`]
/// can never touch a descriptor number the kernel has handed out again.
pub struct RawConn {
    fd: RwLock<Option<OwnedFd>>,
    kind: SocketKind,
    if_index: i32,
    protocol: u16,
    local_addr: Addr,
    closed: AtomicBool,
    deadlines: Mutex<Deadlines>,
}

impl RawConn {
    /// Opens a raw socket of `kind` bound to `interface`
    ///
    /// # Errors
    ///
    /// Returns [`RLanProbeError::Socket`] if the socket cannot be created or
    /// configured. The descriptor is released on every failure path.
    pub fn open(
        interface: &NetworkInterface,
        kind: SocketKind,
        protocol: u16,
    ) -> Result<Self> {
        let if_index = i32::try_from(interface.index).map_err(|_| {
            RLanProbeError::Interface(format!(
                "interface index {} out of range",
                interface.index
            ))
        })?;

        let fd = match kind {
            SocketKind::Link => open_link_socket(if_index, protocol),
            SocketKind::Ip => open_ip_socket(&interface.name, protocol),
        }
        .map_err(RLanProbeError::Socket)?;

        let local_addr = match kind {
            SocketKind::Link => Addr::Hardware(interface.mac),
            SocketKind::Ip => {
                Addr::Ip(interface.ipv4().unwrap_or(Ipv4Addr::UNSPECIFIED))
            }
        };

        log::debug!(
            "opened {:?} raw socket on {} (index {}) for protocol {:#06x}",
            kind,
            interface.name,
            if_index,
            protocol
        );

        Ok(Self {
            fd: RwLock::new(Some(fd)),
            kind,
            if_index,
            protocol,
            local_addr,
            closed: AtomicBool::new(false),
            deadlines: Mutex::new(Deadlines::default()),
        })
    }

    /// Returns the kind of socket
    pub fn kind(&self) -> SocketKind {
        self.kind
    }

    fn deadlines(&self) -> MutexGuard<'_, Deadlines> {
        // deadlines are plain data, a panic while holding the lock cannot
        // leave them half written
        self.deadlines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RLanProbeError::Closed);
        }
        Ok(())
    }

    // Runs `f` with the descriptor held open for the whole call
    fn with_fd<T>(&self, f: impl FnOnce(RawFd) -> Result<T>) -> Result<T> {
        self.ensure_open()?;

        let guard = self.fd.read().unwrap_or_else(PoisonError::into_inner);
        let fd = guard.as_ref().ok_or(RLanProbeError::Closed)?;

        f(fd.as_raw_fd())
    }

    // Waits until the socket is ready for `events`, polling in short slices
    // so the current deadline and closed flag are re-checked
    fn wait_ready(
        &self,
        events: i16,
        deadline: fn(&Deadlines) -> Option<Instant>,
    ) -> Result<()> {
        loop {
            self.ensure_open()?;

            let slice = match time_remaining(deadline(&self.deadlines()))? {
                Some(remaining) => remaining.min(POLL_SLICE),
                None => POLL_SLICE,
            };
            let timeout_ms = slice.as_millis().max(1) as c_int;

            let ready = self.with_fd(|fd| {
                let mut pfd = pollfd {
                    fd,
                    events,
                    revents: 0,
                };

                // SAFETY: pfd is a valid pollfd for the duration of the call
                match unsafe { libc::poll(&mut pfd, 1, timeout_ms) } {
                    -1 => {
                        let err = io::Error::last_os_error();
                        if err.kind() == io::ErrorKind::Interrupted {
                            return Ok(false);
                        }
                        Err(RLanProbeError::Io(err))
                    }
                    0 => Ok(false),
                    _ if pfd.revents & POLLNVAL != 0 => Err(RLanProbeError::Io(
                        io::Error::from_raw_os_error(libc::EBADF),
                    )),
                    _ => Ok(true),
                }
            })?;

            if ready {
                // a reader woken by close must not consume a shut down socket
                return self.ensure_open();
            }
        }
    }

    fn peer_addr(&self, storage: &sockaddr_storage) -> Addr {
        match self.kind {
            SocketKind::Link => {
                // SAFETY: recvfrom on an AF_PACKET socket fills a sockaddr_ll,
                // which fits within sockaddr_storage
                let sll =
                    unsafe { &*(storage as *const _ as *const sockaddr_ll) };
                let a = sll.sll_addr;
                Addr::Hardware(MacAddr::new(a[0], a[1], a[2], a[3], a[4], a[5]))
            }
            SocketKind::Ip => {
                // SAFETY: recvfrom on an AF_INET socket fills a sockaddr_in
                let sin =
                    unsafe { &*(storage as *const _ as *const sockaddr_in) };
                Addr::Ip(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)))
            }
        }
    }

    fn send_link(&self, fd: RawFd, buf: &[u8], mac: MacAddr) -> isize {
        let mut sll = link_sockaddr(self.if_index, self.protocol);
        sll.sll_halen = HARDWARE_ADDR_LEN as u8;
        sll.sll_addr[..HARDWARE_ADDR_LEN].copy_from_slice(&mac.octets());

        // SAFETY: buf and sll outlive the call; lengths match their types
        unsafe {
            libc::sendto(
                fd,
                buf.as_ptr() as *const c_void,
                buf.len(),
                0,
                &sll as *const sockaddr_ll as *const sockaddr,
                mem::size_of::<sockaddr_ll>() as socklen_t,
            )
        }
    }

    fn send_ip(&self, fd: RawFd, buf: &[u8], ip: Ipv4Addr) -> isize {
        // SAFETY: all-zero is a valid sockaddr_in
        let mut sin: sockaddr_in = unsafe { mem::zeroed() };
        sin.sin_family = AF_INET as sa_family_t;
        sin.sin_addr.s_addr = u32::from(ip).to_be();

        // SAFETY: buf and sin outlive the call; lengths match their types
        unsafe {
            libc::sendto(
                fd,
                buf.as_ptr() as *const c_void,
                buf.len(),
                0,
                &sin as *const sockaddr_in as *const sockaddr,
                mem::size_of::<sockaddr_in>() as socklen_t,
            )
        }
    }
}

impl PacketConn for RawConn {
    fn read_from(&self, buf: &mut [u8]) -> Result<(usize, Addr)> {
        loop {
            self.wait_ready(POLLIN, |d| d.read)?;

            // SAFETY: all-zero is a valid sockaddr_storage
            let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
            let mut addr_len =
                mem::size_of::<sockaddr_storage>() as socklen_t;

            let n = self.with_fd(|fd| {
                // SAFETY: buf, storage and addr_len are valid for writes of
                // the given sizes for the duration of the call
                Ok(unsafe {
                    libc::recvfrom(
                        fd,
                        buf.as_mut_ptr() as *mut c_void,
                        buf.len(),
                        MSG_DONTWAIT,
                        &mut storage as *mut sockaddr_storage as *mut sockaddr,
                        &mut addr_len,
                    )
                })
            })?;

            if n < 0 {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => {
                        continue
                    }
                    _ => return Err(RLanProbeError::Io(err)),
                }
            }

            return Ok((n as usize, self.peer_addr(&storage)));
        }
    }

    fn write_to(&self, buf: &[u8], addr: &Addr) -> Result<usize> {
        self.wait_ready(POLLOUT, |d| d.write)?;

        let n = self.with_fd(|fd| match (self.kind, addr) {
            (SocketKind::Link, Addr::Hardware(mac)) => {
                Ok(self.send_link(fd, buf, *mac))
            }
            (SocketKind::Ip, Addr::Ip(ip)) => Ok(self.send_ip(fd, buf, *ip)),
            _ => Err(RLanProbeError::InvalidAddress(format!(
                "cannot send to {} on a {:?} socket",
                addr, self.kind
            ))),
        })?;

        if n < 0 {
            return Err(RLanProbeError::Io(io::Error::last_os_error()));
        }

        Ok(n as usize)
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(RLanProbeError::Closed);
        }

        // wake readers parked in poll; not every raw socket supports it, so
        // the result is ignored and readers notice at their next slice
        if let Some(fd) = self
            .fd
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            // SAFETY: the descriptor is held open by the read guard
            unsafe {
                libc::shutdown(fd.as_raw_fd(), SHUT_RDWR);
            }
        }

        let fd = self
            .fd
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(fd) = fd {
            let raw = fd.into_raw_fd();
            log::debug!("closing raw socket {}", raw);

            // SAFETY: ownership was taken from the OwnedFd above
            cvt(unsafe { libc::close(raw) })?;
        }

        Ok(())
    }

    fn local_addr(&self) -> Addr {
        self.local_addr
    }

    fn set_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        let mut d = self.deadlines();
        d.read = deadline;
        d.write = deadline;
        Ok(())
    }

    fn set_read_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.deadlines().read = deadline;
        Ok(())
    }

    fn set_write_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.deadlines().write = deadline;
        Ok(())
    }
}

fn cvt(ret: c_int) -> io::Result<c_int> {
    match ret {
        -1 => Err(io::Error::last_os_error()),
        r => Ok(r),
    }
}

fn new_socket(domain: c_int, protocol: c_int) -> io::Result<OwnedFd> {
    // SAFETY: man 2 socket; returns a new descriptor or -1
    let fd = cvt(unsafe { libc::socket(domain, SOCK_RAW, protocol) })?;
    // SAFETY: fd was just returned by socket() and is owned by nobody else
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn link_sockaddr(if_index: i32, protocol: u16) -> sockaddr_ll {
    sockaddr_ll {
        sll_family: AF_PACKET as u16,
        sll_protocol: protocol.to_be(),
        sll_ifindex: if_index,
        sll_hatype: 0,
        sll_pkttype: 0,
        sll_halen: 0,
        sll_addr: [0; 8],
    }
}

fn open_link_socket(if_index: i32, protocol: u16) -> io::Result<OwnedFd> {
    let fd = new_socket(AF_PACKET, protocol.to_be() as c_int)?;
    let sll = link_sockaddr(if_index, protocol);

    // SAFETY: sll is a valid sockaddr_ll for the duration of the call
    cvt(unsafe {
        libc::bind(
            fd.as_raw_fd(),
            &sll as *const sockaddr_ll as *const sockaddr,
            mem::size_of::<sockaddr_ll>() as socklen_t,
        )
    })?;

    Ok(fd)
}

fn open_ip_socket(if_name: &str, protocol: u16) -> io::Result<OwnedFd> {
    let fd = new_socket(AF_INET, protocol as c_int)?;
    let raw = fd.as_raw_fd();
    let on: c_int = 1;

    // SAFETY: `on` is a valid c_int for the duration of the call
    cvt(unsafe {
        libc::setsockopt(
            raw,
            IPPROTO_IP,
            IP_HDRINCL,
            &on as *const c_int as *const c_void,
            mem::size_of::<c_int>() as socklen_t,
        )
    })?;

    // SAFETY: the name bytes are valid for the given length
    cvt(unsafe {
        libc::setsockopt(
            raw,
            SOL_SOCKET,
            SO_BINDTODEVICE,
            if_name.as_ptr() as *const c_void,
            if_name.len() as socklen_t,
        )
    })?;

    Ok(fd)
}

#[cfg(test)]
#[path = "./raw_tests.rs"]
mod tests;
