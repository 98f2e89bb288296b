//! End-to-end tests driving the resolver loop over real loopback UDP
//! sockets, the way a client and an upstream server actually would.

use std::net::SocketAddrV4;
use std::sync::Arc;
use std::time::Instant;

use tokio::net::UdpSocket;

use cachedns::clock::SystemClock;
use cachedns::protocol::*;
use cachedns::resolver::cache::SharedCache;
use cachedns::resolver::run_forever;

async fn local_socket() -> (UdpSocket, SocketAddrV4) {
    let socket = UdpSocket::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .unwrap();
    let addr = match socket.local_addr().unwrap() {
        std::net::SocketAddr::V4(v4) => v4,
        _ => unreachable!(),
    };
    (socket, addr)
}

fn query(name: &str) -> Message {
    Message {
        header: Header {
            id: 42,
            is_response: false,
            opcode: Opcode::Standard,
            is_authoritative: false,
            is_truncated: false,
            recursion_desired: true,
            recursion_available: false,
            z: false,
            authentic_data: false,
            checking_disabled: false,
            rcode: Rcode::NoError,
            qdcount: 1,
            ancount: 0,
            nscount: 0,
            arcount: 0,
        },
        questions: vec![Question {
            name: DomainName::from_text(name).unwrap(),
            qtype: RTYPE_A,
            qclass: RCLASS_IN,
        }],
        answers: vec![],
        authority: vec![],
        additional: vec![],
    }
}

/// Spawns a one-shot fake upstream that answers whatever request it
/// gets with a canned reply, and returns its address.
async fn fake_upstream(reply: Message) -> SocketAddrV4 {
    let (socket, addr) = local_socket().await;
    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        if let Ok((_, peer)) = socket.recv_from(&mut buf).await {
            let _ = socket.send_to(&reply.to_octets(), peer).await;
        }
    });
    addr
}

#[tokio::test]
async fn cold_query_is_forwarded_and_then_served_from_cache() {
    let (listen_socket, listen_addr) = local_socket().await;
    let request = query("example.com");

    let mut upstream_reply = request.clone();
    upstream_reply.header.is_response = true;
    upstream_reply.answers.push(ResourceRecord {
        name: upstream_reply.questions[0].name.clone(),
        rtype: RTYPE_A,
        rclass: RCLASS_IN,
        ttl: 300,
        rdata: RData::A {
            octets: [93, 184, 216, 34],
        },
        created_at: Instant::now(),
    });
    let upstream_addr = fake_upstream(upstream_reply).await;

    let clock = Arc::new(SystemClock);
    let cache = SharedCache::new(clock.clone());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let server = tokio::spawn(run_forever(
        listen_socket,
        upstream_addr,
        cache.clone(),
        clock,
        Box::pin(async {
            let _ = shutdown_rx.await;
        }),
    ));

    let client = UdpSocket::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .unwrap();
    client
        .send_to(&request.to_octets(), listen_addr)
        .await
        .unwrap();

    let mut buf = [0u8; 512];
    let len = tokio::time::timeout(std::time::Duration::from_secs(2), client.recv(&mut buf))
        .await
        .expect("response within timeout")
        .unwrap();
    let response = Message::from_octets(&buf[..len], Instant::now()).unwrap();
    assert_eq!(
        response.answers[0].rdata,
        RData::A {
            octets: [93, 184, 216, 34]
        }
    );

    let cache_question = &request.questions[0];
    assert!(cache.has_fresh(cache_question));

    let _ = shutdown_tx.send(());
    let _ = server.await;
}
