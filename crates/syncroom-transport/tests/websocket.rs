//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use syncroom_transport::{
        Connection, Handshake, Transport, TransportError, WebSocketConnection,
        WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    async fn bind(origins: Vec<String>) -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind")
            .with_allowed_origins(origins);
        let addr = transport.local_addr().expect("local addr").to_string();
        (transport, addr)
    }

    async fn accept_one(
        transport: &mut WebSocketTransport,
    ) -> Result<WebSocketConnection, TransportError> {
        transport.accept().await?.upgrade().await
    }

    #[tokio::test]
    async fn test_websocket_send_text_and_receive_both_frame_kinds() {
        let (mut transport, addr) = bind(Vec::new()).await;
        let server_handle =
            tokio::spawn(async move { accept_one(&mut transport).await.expect("accept") });

        let (mut client, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("client should connect");
        let server_conn = server_handle.await.expect("task should complete");
        assert!(server_conn.id().into_inner() > 0);

        // UTF-8 payloads go out as text frames.
        server_conn.send(br#"{"event":"room-ended"}"#).await.unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"event":"room-ended"}"#);

        client
            .send(Message::Text("hello from text".to_string().into()))
            .await
            .unwrap();
        let received = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(received, b"hello from text");

        client
            .send(Message::Binary(b"hello from binary".to_vec().into()))
            .await
            .unwrap();
        let received = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(received, b"hello from binary");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_is_pending() {
        let (mut transport, addr) = bind(Vec::new()).await;
        let server_handle =
            tokio::spawn(async move { accept_one(&mut transport).await.expect("accept") });
        let (mut client, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .unwrap();
        let server_conn =
            std::sync::Arc::new(server_handle.await.expect("task should complete"));

        // Park a reader first, then write from another task.
        let reader = {
            let conn = std::sync::Arc::clone(&server_conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), server_conn.send(b"push"))
            .await
            .expect("send must not wait for the reader")
            .unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"push");

        client.send(Message::Close(None)).await.unwrap();
        let result = reader.await.unwrap().expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_rejects_disallowed_origin() {
        let (mut transport, addr) =
            bind(vec!["http://localhost:3000".to_string()]).await;
        let server_handle = tokio::spawn(async move { accept_one(&mut transport).await });

        let mut request = format!("ws://{addr}").into_client_request().unwrap();
        request
            .headers_mut()
            .insert("Origin", "https://evil.example".parse().unwrap());
        let result = tokio_tungstenite::connect_async(request).await;
        assert!(result.is_err(), "client upgrade should be refused");

        let accepted = server_handle.await.unwrap();
        assert!(matches!(
            accepted,
            Err(TransportError::HandshakeFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_websocket_accepts_listed_origin() {
        let (mut transport, addr) =
            bind(vec!["http://localhost:3000".to_string()]).await;
        let server_handle = tokio::spawn(async move { accept_one(&mut transport).await });

        let mut request = format!("ws://{addr}").into_client_request().unwrap();
        request
            .headers_mut()
            .insert("Origin", "http://localhost:3000".parse().unwrap());
        tokio_tungstenite::connect_async(request)
            .await
            .expect("listed origin should connect");

        assert!(server_handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_websocket_idle_peer_does_not_block_next_upgrade() {
        let (mut transport, addr) = bind(Vec::new()).await;

        // Opens TCP and never sends the upgrade request.
        let _idle = tokio::net::TcpStream::connect(&addr).await.unwrap();
        let idle_handshake = transport.accept().await.expect("accept idle");
        let idle_task = tokio::spawn(idle_handshake.upgrade());

        let client = tokio::spawn(tokio_tungstenite::connect_async(format!("ws://{addr}")));
        let started = std::time::Instant::now();
        let handshake = tokio::time::timeout(Duration::from_secs(1), transport.accept())
            .await
            .expect("accept must not wait for the idle peer")
            .expect("accept");
        let conn = tokio::time::timeout(Duration::from_secs(1), handshake.upgrade())
            .await
            .expect("upgrade must not wait for the idle peer")
            .expect("upgrade");
        client.await.unwrap().expect("client should connect");

        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(conn.id().into_inner() > 0);
        assert!(!idle_task.is_finished());
        idle_task.abort();
    }
}
