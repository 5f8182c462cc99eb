//! dns-dig - a minimal DNS stub resolver.
//!
//! Sends a single `A`/`IN` question over UDP to a resolver on port 53 and
//! decodes the reply into the IPv4 addresses, the smallest answer TTL and the
//! round-trip time.
//!
//! # Architecture
//!
//! - [`id`]: random message ids
//! - [`dns`]: wire types, name encoding, query building
//! - [`resolver`]: transport, reply validation, [`dig`]
//! - [`config`]: configuration for the command-line front end
//! - [`error`]: error types
//!
//! # Testing
//!
//! The exchange sits behind the [`Transport`] trait, so lookups can be driven
//! with canned replies:
//!
//! ```rust
//! use std::time::Duration;
//! use dns_dig::{ErrorKind, Resolver, Transport};
//! use dns_dig::resolver::Exchange;
//!
//! struct Silent;
//!
//! impl Transport for Silent {
//!     fn exchange(&self, _: &str, _: &[u8], _: Duration) -> Result<Exchange, ErrorKind> {
//!         Err(ErrorKind::read(std::io::ErrorKind::TimedOut.into()))
//!     }
//! }
//!
//! let err = Resolver::new(Silent)
//!     .lookup("192.0.2.1", "example.com", Duration::from_secs(1))
//!     .unwrap_err();
//! assert!(err.is_timeout());
//! ```

pub mod config;
pub mod dns;
pub mod error;
pub mod id;
pub mod resolver;

pub use config::Config;
pub use error::{ConfigError, DnsError, ErrorKind};
pub use id::{IdGenerator, next_id};
pub use resolver::{Resolver, Response, Transport, UdpTransport, dig};
