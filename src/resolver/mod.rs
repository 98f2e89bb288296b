//! The resolver loop: own the listening socket, answer from the cache
//! where possible, and forward misses to the configured upstream.
//!
//! This resolver is deliberately non-recursive. It understands exactly
//! one question per message, never follows a delegation chain itself,
//! and trusts the upstream server to do that work. Its only job is to
//! save that server a round trip the next time the same question comes
//! in, within the record's TTL.

pub mod cache;

use std::net::SocketAddrV4;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::clock::Clock;
use crate::protocol::{Message, ProtocolError, Rcode};
use crate::resolver::cache::SharedCache;

/// Largest datagram this resolver will send or expects to receive.
/// Matches the classic non-EDNS UDP payload limit; truncation beyond
/// this is out of scope.
const MAX_DATAGRAM_SIZE: usize = 512;

/// How long to wait for the upstream server to answer a forwarded
/// query before giving up.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs the resolver forever, answering queries received on `socket`
/// until `shutdown` resolves.
///
/// A single bad datagram, or a failed upstream round trip, is logged
/// and dropped rather than propagated: one client's malformed query or
/// unlucky timeout should never take the whole resolver down.
pub async fn run_forever(
    socket: UdpSocket,
    upstream_addr: SocketAddrV4,
    cache: SharedCache,
    clock: Arc<dyn Clock>,
    mut shutdown: impl std::future::Future<Output = ()> + Unpin,
) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    loop {
        let (len, peer) = tokio::select! {
            result = socket.recv_from(&mut buf) => match result {
                Ok(ok) => ok,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to receive datagram");
                    continue;
                }
            },
            _ = &mut shutdown => {
                tracing::info!("shutting down");
                return;
            }
        };

        let now = clock.now();
        match handle_datagram(&buf[..len], upstream_addr, &cache, now).await {
            Ok(Some(response)) => {
                if let Err(err) = socket.send_to(&response, peer).await {
                    tracing::warn!(error = %err, %peer, "failed to send response");
                }
            }
            Ok(None) => {
                tracing::debug!(%peer, "dropping query with no question");
            }
            Err(err) => {
                tracing::warn!(error = %err, %peer, "failed to resolve query");
            }
        }
    }
}

/// Handle one client datagram, returning the raw bytes to send back
/// (or `None` if the datagram couldn't be parsed into a question worth
/// answering).
async fn handle_datagram(
    datagram: &[u8],
    upstream_addr: SocketAddrV4,
    cache: &SharedCache,
    now: Instant,
) -> Result<Option<Vec<u8>>, ResolveError> {
    let request = match Message::from_octets(datagram, now) {
        Ok(message) => message,
        Err(err) => {
            tracing::debug!(error = %err, "dropping malformed query");
            return Ok(None);
        }
    };
    tracing::debug!(request = %request, "received query");

    let Some(question) = request.questions.first() else {
        return Ok(None);
    };

    if cache.has_fresh(question) {
        tracing::debug!(name = %question.name.to_text(), "cache hit");
        let answer = cache.get(question).expect("has_fresh implies present");
        let response = Message::build_response(&request, vec![answer], now);
        tracing::debug!(response = %response, "answered from cache");
        return Ok(Some(response.to_octets()));
    }

    tracing::debug!(name = %question.name.to_text(), "cache miss, forwarding upstream");
    let upstream_reply = forward_to_upstream(datagram, upstream_addr).await?;
    let reply =
        Message::from_octets(&upstream_reply, now).map_err(ResolveError::UpstreamDecodeFailure)?;
    tracing::debug!(response = %reply, "received upstream reply");

    if reply.header.rcode.is_name_error() {
        tracing::debug!(name = %question.name.to_text(), "upstream returned NXDOMAIN");
        return Ok(Some(upstream_reply));
    }

    let Some(answer) = reply.answers.first() else {
        return Err(ResolveError::UpstreamNoAnswer);
    };

    cache.put(question.clone(), answer.clone());
    let response = Message::build_response(&request, vec![answer.clone()], now);
    tracing::debug!(response = %response, "answered from upstream");
    Ok(Some(response.to_octets()))
}

/// Forward a client's raw query bytes to `upstream_addr` over a fresh
/// ephemeral UDP socket, and return the raw reply bytes.
async fn forward_to_upstream(
    query: &[u8],
    upstream_addr: SocketAddrV4,
) -> Result<Vec<u8>, ResolveError> {
    let socket = UdpSocket::bind((std::net::Ipv4Addr::UNSPECIFIED, 0))
        .await
        .map_err(ResolveError::UpstreamIOFailure)?;
    socket
        .send_to(query, upstream_addr)
        .await
        .map_err(ResolveError::UpstreamIOFailure)?;

    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    let len = timeout(UPSTREAM_TIMEOUT, socket.recv(&mut buf))
        .await
        .map_err(|_| ResolveError::UpstreamTimeout)?
        .map_err(ResolveError::UpstreamIOFailure)?;

    Ok(buf[..len].to_vec())
}

/// Why a query couldn't be answered, for reasons outside the client's
/// control: the upstream server, not the client's request.
#[derive(Debug)]
pub enum ResolveError {
    /// Sending to, or receiving from, the upstream socket failed.
    UpstreamIOFailure(std::io::Error),

    /// The upstream server did not answer within [`UPSTREAM_TIMEOUT`].
    UpstreamTimeout,

    /// The upstream's reply datagram didn't parse as a DNS message.
    UpstreamDecodeFailure(ProtocolError),

    /// The upstream's reply had `NOERROR` but no answer records.
    UpstreamNoAnswer,
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::UpstreamIOFailure(err) => write!(f, "upstream I/O failure: {err}"),
            ResolveError::UpstreamTimeout => write!(f, "upstream did not respond in time"),
            ResolveError::UpstreamDecodeFailure(err) => {
                write!(f, "upstream reply did not parse: {err}")
            }
            ResolveError::UpstreamNoAnswer => {
                write!(f, "upstream reply had no error but no answer")
            }
        }
    }
}

impl std::error::Error for ResolveError {}
