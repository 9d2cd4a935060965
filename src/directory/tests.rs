//! Directory Module Tests
//!
//! ## Test Scopes
//! - **Dispatch**: status codes and bodies for every request shape, without sockets.
//! - **Server**: real loopback connections, including fragmented requests and
//!   many simultaneous registrations.

#[cfg(test)]
mod tests {
    use crate::directory::{DirectoryServer, dispatch};
    use crate::protocol::*;
    use crate::registry::IndexRegistry;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn add(id: u32, title: &str, host: &str, port: u16) -> Vec<u8> {
        encode_request(
            &DirectoryRequest::Add {
                id: DocumentId(id),
                title: title.to_string(),
                peer: PeerAddress::new(host, port),
            }
            .into_request(),
        )
    }

    fn lookup(id: u32) -> Vec<u8> {
        encode_request(
            &DirectoryRequest::Lookup {
                id: DocumentId(id),
                peer: PeerAddress::new("asker", 7000),
            }
            .into_request(),
        )
    }

    fn list_all() -> Vec<u8> {
        encode_request(
            &DirectoryRequest::ListAll {
                peer: PeerAddress::new("asker", 7000),
            }
            .into_request(),
        )
    }

    async fn start_server() -> (SocketAddr, Arc<IndexRegistry>) {
        let registry = IndexRegistry::new();
        let server = DirectoryServer::bind("127.0.0.1:0", registry.clone())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        (addr, registry)
    }

    async fn roundtrip(addr: SocketAddr, raw: &[u8]) -> Response {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        decode_response(&buf).unwrap()
    }

    // ============================================================
    // DISPATCH
    // ============================================================

    #[test]
    fn test_add_returns_confirmation_body() {
        let registry = IndexRegistry::new();
        let response = dispatch(
            registry.as_ref(),
            &add(123, "A Proferred Official ICP", "thishost.csc.ncsu.edu", 5678),
        )
        .unwrap();

        assert_eq!(response.code, 200);
        assert_eq!(response.reason, "OK");
        assert_eq!(
            response.body_text(),
            "RFC 123 A Proferred Official ICP thishost.csc.ncsu.edu 5678"
        );
    }

    #[test]
    fn test_lookup_lists_peers_in_registration_order() {
        let registry = IndexRegistry::new();
        dispatch(registry.as_ref(), &add(3457, "Doc", "peerA", 6001)).unwrap();
        dispatch(registry.as_ref(), &add(3457, "Doc", "peerB", 6002)).unwrap();

        let response = dispatch(registry.as_ref(), &lookup(3457)).unwrap();
        assert_eq!(response.code, 200);
        assert_eq!(
            response.body_text(),
            "RFC 3457 Doc peerA 6001\r\nRFC 3457 Doc peerB 6002"
        );
    }

    #[test]
    fn test_lookup_miss_is_ok_and_empty() {
        let registry = IndexRegistry::new();
        let response = dispatch(registry.as_ref(), &lookup(42)).unwrap();
        assert_eq!(response.code, 200);
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_list_all_ordered_by_identifier() {
        let registry = IndexRegistry::new();
        dispatch(registry.as_ref(), &add(2, "Two", "peerB", 6002)).unwrap();
        dispatch(registry.as_ref(), &add(1, "One", "peerA", 6001)).unwrap();

        let response = dispatch(registry.as_ref(), &list_all()).unwrap();
        assert_eq!(
            response.body_text(),
            "RFC 1 One peerA 6001\r\nRFC 2 Two peerB 6002"
        );
    }

    #[test]
    fn test_list_all_on_empty_directory() {
        let registry = IndexRegistry::new();
        let response = dispatch(registry.as_ref(), &list_all()).unwrap();
        assert_eq!(response.code, 200);
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_unsupported_version_wins_over_missing_headers() {
        let registry = IndexRegistry::new();
        let response = dispatch(registry.as_ref(), b"ADD RFC 1 P2P-CI/2.0\r\n\r\n").unwrap();
        assert_eq!(response.code, 505);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_method_with_bad_version_is_505() {
        let registry = IndexRegistry::new();
        let response = dispatch(registry.as_ref(), b"PURGE ALL P2P-CI/9.9\r\n\r\n").unwrap();
        assert_eq!(response.code, 505);
    }

    #[test]
    fn test_unsupported_version_wins_over_bad_resource() {
        let registry = IndexRegistry::new();
        let cases: [&[u8]; 3] = [
            b"ADD RFC 0 P2P-CI/2.0\r\nHost: h\r\nPort: 1\r\nTitle: t\r\n\r\n",
            b"LOOKUP RFC abc P2P-CI/2.0\r\nHost: h\r\nPort: 1\r\n\r\n",
            b"LIST EVERYTHING P2P-CI/2.0\r\nHost: h\r\nPort: 1\r\n\r\n",
        ];
        for raw in cases {
            assert_eq!(dispatch(registry.as_ref(), raw).unwrap().code, 505);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bad_requests() {
        let registry = IndexRegistry::new();
        let cases: [&[u8]; 7] = [
            b"ADD RFC 1 P2P-CI/1.0\r\nHost: h\r\nPort: 1\r\n\r\n",
            b"LOOKUP RFC 1 P2P-CI/1.0\r\nHost: h\r\n\r\n",
            b"LIST ALL P2P-CI/1.0\r\nPort: 1\r\n\r\n",
            b"LIST ALL P2P-CI/1.0\r\nHost: h\r\nPort: abc\r\n\r\n",
            b"LOOKUP RFC x P2P-CI/1.0\r\nHost: h\r\nPort: 1\r\n\r\n",
            b"GET RFC 1 P2P-CI/1.0\r\nHost: h\r\nPort: 1\r\n\r\n",
            b"garbage\r\n\r\n",
        ];

        for raw in cases {
            let response = dispatch(registry.as_ref(), raw).unwrap();
            assert_eq!(
                response.code,
                400,
                "expected 400 for {:?}",
                String::from_utf8_lossy(raw)
            );
            assert!(response.body.is_empty());
        }
        assert!(registry.is_empty());
    }

    // ============================================================
    // SERVER
    // ============================================================

    #[tokio::test]
    async fn test_server_answers_over_tcp() {
        let (addr, registry) = start_server().await;

        let response = roundtrip(addr, &add(1, "One", "peerA", 6001)).await;
        assert_eq!(response.status_line(), "P2P-CI/1.0 200 OK");
        assert_eq!(registry.len(), 1);

        let response = roundtrip(addr, &lookup(1)).await;
        assert_eq!(response.body_text(), "RFC 1 One peerA 6001");
    }

    #[tokio::test]
    async fn test_server_reassembles_fragmented_request() {
        let (addr, registry) = start_server().await;
        let raw = add(9, "Slow Title", "slowpeer", 6100);

        let mut stream = TcpStream::connect(addr).await.unwrap();
        for piece in raw.chunks(5) {
            stream.write_all(piece).await.unwrap();
            stream.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        let response = decode_response(&buf).unwrap();

        assert_eq!(response.code, 200);
        assert_eq!(registry.lookup(DocumentId(9)).len(), 1);
    }

    #[tokio::test]
    async fn test_server_rejects_malformed_and_keeps_serving() {
        let (addr, _registry) = start_server().await;

        let response = roundtrip(addr, b"HELLO\r\n\r\n").await;
        assert_eq!(response.code, 400);

        let response = roundtrip(addr, b"LIST ALL P2P-CI/2.0\r\n\r\n").await;
        assert_eq!(response.code, 505);

        let response = roundtrip(addr, &list_all()).await;
        assert_eq!(response.code, 200);
    }

    #[tokio::test]
    async fn test_server_answers_oversized_content_length() {
        let (addr, registry) = start_server().await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(
                b"ADD RFC 1 P2P-CI/1.0\r\nHost: h\r\nPort: 1\r\nTitle: t\r\nContent-Length: 18446744073709551615\r\n\r\n",
            )
            .await
            .unwrap();

        let mut buf = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decode_response(&buf).unwrap().code, 400);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_silent_client_does_not_block_others() {
        let (addr, _registry) = start_server().await;

        let _idle = TcpStream::connect(addr).await.unwrap();
        let response = tokio::time::timeout(Duration::from_secs(5), roundtrip(addr, &list_all()))
            .await
            .unwrap();
        assert_eq!(response.code, 200);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_all_persist() {
        let (addr, registry) = start_server().await;
        let workers = 50u16;

        let mut handles = Vec::new();
        for i in 0..workers {
            handles.push(tokio::spawn(async move {
                roundtrip(addr, &add(1 + (i as u32 % 5), "Doc", &format!("peer-{}", i), 6000 + i))
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().code, 200);
        }

        assert_eq!(registry.len(), workers as usize);
    }
}
