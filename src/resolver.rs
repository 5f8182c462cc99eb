//! DNS resolver implementation.
//!
//! A lookup runs as one synchronous pipeline: draw a message id, build the
//! query, exchange it with the server over UDP, then decode and validate the
//! reply into a [`Response`].
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//!
//! let response = dns_dig::dig("8.8.8.8", "example.com", Duration::from_secs(3))?;
//! for ip in response.ips() {
//!     println!("{ip}");
//! }
//! println!("ttl {}s, took {:?}", response.ttl(), response.elapsed());
//! # Ok::<(), dns_dig::DnsError>(())
//! ```
//!
//! # Network Configuration
//!
//! Queries go to UDP port 53 of the server. One deadline bounds the write and
//! every read; name resolution of the server itself is not covered by it.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::dns::{
    DnsHeader, DnsQuestion, HEADER_LEN, QUESTION_LEN, Reader, RecordHeader, ResponseCode, TYPE_A,
    build_query,
};
use crate::error::{DnsError, ErrorKind};
use crate::id::next_id;

/// The DNS server port, fixed per RFC 1035.
pub const DNS_PORT: u16 = 53;

/// Size of the chunk each receive reads into.
pub const RECV_CHUNK: usize = 1024;

/// The outcome of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    ips: Vec<Ipv4Addr>,
    ttl: u32,
    elapsed: Duration,
}

impl Response {
    /// IPv4 addresses from the `A` answers, in answer order.
    pub fn ips(&self) -> &[Ipv4Addr] {
        &self.ips
    }

    pub fn into_ips(self) -> Vec<Ipv4Addr> {
        self.ips
    }

    /// Smallest TTL across every answer record, `A` or not.
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Time from sending the query until the reply was fully read.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// A reply as it came off the wire.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub bytes: Vec<u8>,
    /// Time from just before the write until the last read returned.
    pub elapsed: Duration,
}

/// Carries a query to a server and brings back the raw reply.
///
/// Implementations report failures with the transport variants of
/// [`ErrorKind`]: `Dial`, `Write` and `Read`.
pub trait Transport {
    fn exchange(
        &self,
        server: &str,
        query: &[u8],
        timeout: Duration,
    ) -> Result<Exchange, ErrorKind>;
}

/// Sends queries over a fresh UDP socket per lookup.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    port: u16,
}

impl UdpTransport {
    pub const fn new() -> Self {
        UdpTransport { port: DNS_PORT }
    }

    #[cfg(test)]
    const fn with_port(port: u16) -> Self {
        UdpTransport { port }
    }
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UdpTransport {
    fn exchange(
        &self,
        server: &str,
        query: &[u8],
        timeout: Duration,
    ) -> Result<Exchange, ErrorKind> {
        let deadline = Instant::now().checked_add(timeout);
        let socket = connect(server, self.port).map_err(ErrorKind::Dial)?;

        let start = Instant::now();
        socket
            .set_write_timeout(remaining(deadline).map_err(ErrorKind::write)?)
            .map_err(ErrorKind::write)?;
        let written = socket.send(query).map_err(ErrorKind::write)?;
        if written != query.len() {
            return Err(ErrorKind::write(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sent {written} of {} bytes", query.len()),
            )));
        }

        let mut bytes = Vec::with_capacity(RECV_CHUNK);
        let mut chunk = [0u8; RECV_CHUNK];
        loop {
            socket
                .set_read_timeout(remaining(deadline).map_err(ErrorKind::read)?)
                .map_err(ErrorKind::read)?;
            let len = socket.recv(&mut chunk).map_err(ErrorKind::read)?;
            bytes.extend_from_slice(&chunk[..len]);
            // A short read means the datagram is complete.
            if len < RECV_CHUNK {
                break;
            }
        }

        Ok(Exchange {
            bytes,
            elapsed: start.elapsed(),
        })
    }
}

fn connect(server: &str, port: u16) -> io::Result<UdpSocket> {
    let addr = (server, port).to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no address found for {server}"),
        )
    })?;
    let local: SocketAddr = if addr.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local)?;
    socket.connect(addr)?;
    Ok(socket)
}

/// Time left before `deadline`. `None` means no deadline.
fn remaining(deadline: Option<Instant>) -> io::Result<Option<Duration>> {
    let Some(deadline) = deadline else {
        return Ok(None);
    };
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "lookup deadline exceeded",
        ));
    }
    Ok(Some(left))
}

/// Runs lookups over a [`Transport`].
#[derive(Debug, Clone, Default)]
pub struct Resolver<T = UdpTransport> {
    transport: T,
}

impl<T: Transport> Resolver<T> {
    pub const fn new(transport: T) -> Self {
        Resolver { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Looks up the `A` records of `domain` on `server`.
    ///
    /// `timeout` bounds the whole exchange. Nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns a [`DnsError`] naming `domain` and `server` when the name cannot
    /// be encoded, the exchange fails, or the reply does not validate.
    pub fn lookup(
        &self,
        server: &str,
        domain: &str,
        timeout: Duration,
    ) -> Result<Response, DnsError> {
        let fail = |kind: ErrorKind| DnsError::new(kind, domain, server);

        let id = next_id();
        let query = build_query(id, domain).map_err(|err| fail(err.into()))?;
        let name_len = query.len() - HEADER_LEN - QUESTION_LEN;
        debug!(id, server, domain, len = query.len(), "sending query");

        let exchange = self
            .transport
            .exchange(server, &query, timeout)
            .map_err(fail)?;
        debug!(id, len = exchange.bytes.len(), elapsed = ?exchange.elapsed, "received reply");

        let response =
            decode_response(id, name_len, &exchange.bytes, exchange.elapsed).map_err(fail)?;
        debug!(
            id,
            addresses = response.ips.len(),
            ttl = response.ttl,
            "lookup complete"
        );
        Ok(response)
    }
}

/// Looks up the IPv4 addresses of `domain` on `server`, port 53.
///
/// See [`Resolver::lookup`].
pub fn dig(server: &str, domain: &str, timeout: Duration) -> Result<Response, DnsError> {
    Resolver::new(UdpTransport::new()).lookup(server, domain, timeout)
}

/// Decodes and validates the reply to a single-question `A` query.
///
/// `name_len` is the length of the encoded name that was sent; the echoed
/// question name is skipped by that many bytes. Validation stops at the first
/// failing check: id, response code, question count, answer count. Answer
/// records that are not usable `A` records are skipped. Sections after the
/// answers are not read.
pub fn decode_response(
    request_id: u16,
    name_len: usize,
    bytes: &[u8],
    elapsed: Duration,
) -> Result<Response, ErrorKind> {
    let mut reader = Reader::new(bytes);

    let header = DnsHeader::decode(&mut reader)?;
    if header.id != request_id {
        return Err(ErrorKind::IdMismatch {
            expected: request_id,
            received: header.id,
        });
    }
    let rcode = header.response_code();
    if rcode != ResponseCode::NoError {
        return Err(ErrorKind::ResponseCode(rcode));
    }
    if header.question_count != 1 {
        return Err(ErrorKind::UnexpectedQuestionCount(header.question_count));
    }
    if header.answer_count < 1 {
        return Err(ErrorKind::NoAnswers);
    }

    for _ in 0..header.question_count {
        reader.skip(name_len)?;
        let question = DnsQuestion::decode(&mut reader)?;
        if question != DnsQuestion::a_record() {
            warn!(
                qtype = question.qtype,
                qclass = question.qclass,
                "question echo does not match the query"
            );
        }
    }

    let mut ips = Vec::with_capacity(usize::from(header.answer_count));
    let mut ttl = u32::MAX;
    for index in 0..header.answer_count {
        let record = RecordHeader::decode(&mut reader)?;
        ttl = ttl.min(record.ttl);
        let data = reader.take(usize::from(record.data_len))?;

        if record.rtype != TYPE_A {
            trace!(index, rtype = record.rtype, len = data.len(), "skipping non-A record");
            continue;
        }
        match <[u8; 4]>::try_from(data) {
            Ok(octets) => ips.push(Ipv4Addr::from(octets)),
            Err(_) => trace!(index, len = data.len(), "skipping A record with bad length"),
        }
    }

    Ok(Response { ips, ttl, elapsed })
}
