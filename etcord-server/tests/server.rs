//! End-to-end tests over real TCP connections
//!
//! Each test binds a server on an ephemeral port and talks to it with
//! framed client connections, exercising the full path from socket bytes
//! through routing to broadcast delivery.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use etcord_protocol::{
    ClientCodec, ClientMessage, ClientQuery, ErrorCode, ServerMessage,
};
use etcord_server::config::{AppConfig, ChannelConfig, ChannelKind};
use etcord_server::Server;

type Client = Framed<TcpStream, ClientCodec>;

struct TestServer {
    addr: SocketAddr,
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

async fn start_server() -> TestServer {
    let mut config = AppConfig::default();
    config.server.port = 0; // ephemeral
    config.channels.push(ChannelConfig {
        id: 2,
        parent_id: 0,
        name: "vc".into(),
        kind: ChannelKind::Voice,
    });

    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();
    let handle = tokio::spawn(async move {
        server.run().await.unwrap();
    });

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

async fn connect(addr: SocketAddr) -> Client {
    let stream = TcpStream::connect(addr).await.unwrap();
    Framed::new(stream, ClientCodec::new())
}

async fn connect_as(addr: SocketAddr, name: &str) -> Client {
    let mut client = connect(addr).await;
    client
        .send(ClientMessage::Login {
            name: name.to_string(),
        })
        .await
        .unwrap();
    client
}

/// Read the next message, failing the test instead of hanging forever
async fn next_message(client: &mut Client) -> ServerMessage {
    tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for a message")
        .expect("connection closed")
        .expect("decode error")
}

#[tokio::test]
async fn test_chat_fans_out_to_all_clients() {
    let server = start_server().await;

    let mut ada = connect_as(server.addr, "ada").await;

    // Serialize logins by waiting for the presence notification
    let mut grace = connect_as(server.addr, "grace").await;
    let grace_id = match next_message(&mut ada).await {
        ServerMessage::ClientConnected { client_id, name } => {
            assert_eq!(name, "grace");
            client_id
        }
        other => panic!("Expected ClientConnected, got {:?}", other),
    };

    let mut linus = connect_as(server.addr, "linus").await;
    assert!(matches!(
        next_message(&mut ada).await,
        ServerMessage::ClientConnected { .. }
    ));
    assert!(matches!(
        next_message(&mut grace).await,
        ServerMessage::ClientConnected { .. }
    ));

    grace
        .send(ClientMessage::ChatMessage {
            channel_id: 1,
            content: "hello everyone".to_string(),
        })
        .await
        .unwrap();

    // Everyone receives the same stored message, sender included
    for client in [&mut ada, &mut grace, &mut linus] {
        match next_message(client).await {
            ServerMessage::ChatMessage {
                channel_id,
                message,
            } => {
                assert_eq!(channel_id, 1);
                assert_eq!(message.message_id, 1);
                assert_eq!(message.sender_id, grace_id);
                assert_eq!(message.sender_name, "grace");
                assert_eq!(message.content, "hello everyone");
            }
            other => panic!("Expected ChatMessage, got {:?}", other),
        }
    }

    let _ = server.shutdown.send(());
    server.handle.await.unwrap();
}

#[tokio::test]
async fn test_chat_before_login_is_rejected() {
    let server = start_server().await;
    let mut client = connect(server.addr).await;

    client
        .send(ClientMessage::ChatMessage {
            channel_id: 1,
            content: "anonymous".to_string(),
        })
        .await
        .unwrap();

    match next_message(&mut client).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, ErrorCode::NotLoggedIn),
        other => panic!("Expected error, got {:?}", other),
    }

    // The rejected message was not stored
    client
        .send(ClientMessage::Login {
            name: "ada".to_string(),
        })
        .await
        .unwrap();
    client
        .send(ClientMessage::GetChatHistory {
            channel_id: 1,
            count: 0,
            offset_id: 0,
        })
        .await
        .unwrap();

    match next_message(&mut client).await {
        ServerMessage::GetChatHistory { messages, .. } => assert!(messages.is_empty()),
        other => panic!("Expected history, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_channel_and_voice_channel_errors() {
    let server = start_server().await;
    let mut client = connect_as(server.addr, "ada").await;

    client
        .send(ClientMessage::ChatMessage {
            channel_id: 999,
            content: "hi".to_string(),
        })
        .await
        .unwrap();
    match next_message(&mut client).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, ErrorCode::ChannelNotFound),
        other => panic!("Expected error, got {:?}", other),
    }

    // Channel 2 exists but is voice-only
    client
        .send(ClientMessage::ChatMessage {
            channel_id: 2,
            content: "hi".to_string(),
        })
        .await
        .unwrap();
    match next_message(&mut client).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, ErrorCode::ChannelTypeMismatch),
        other => panic!("Expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_payload_keeps_connection_usable() {
    let server = start_server().await;
    let mut client = connect_as(server.addr, "ada").await;

    // Empty content is a request-local failure
    client
        .send(ClientMessage::ChatMessage {
            channel_id: 1,
            content: String::new(),
        })
        .await
        .unwrap();
    match next_message(&mut client).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, ErrorCode::EmptyField),
        other => panic!("Expected error, got {:?}", other),
    }

    // The same connection still works afterwards
    client
        .send(ClientMessage::ChatMessage {
            channel_id: 1,
            content: "still here".to_string(),
        })
        .await
        .unwrap();
    match next_message(&mut client).await {
        ServerMessage::ChatMessage { message, .. } => assert_eq!(message.content, "still here"),
        other => panic!("Expected ChatMessage, got {:?}", other),
    }
}

#[tokio::test]
async fn test_zero_length_frame_closes_connection() {
    let server = start_server().await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(&[0x00, 0x00]).await.unwrap();

    // The server drops us without writing anything back
    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("timed out waiting for close")
        .unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_disconnect_notifies_named_clients() {
    let server = start_server().await;

    let mut ada = connect_as(server.addr, "ada").await;
    let grace = connect_as(server.addr, "grace").await;

    let grace_id = match next_message(&mut ada).await {
        ServerMessage::ClientConnected { client_id, name } => {
            assert_eq!(name, "grace");
            client_id
        }
        other => panic!("Expected ClientConnected, got {:?}", other),
    };

    drop(grace);

    match next_message(&mut ada).await {
        ServerMessage::ClientDisconnected { client_id } => assert_eq!(client_id, grace_id),
        other => panic!("Expected ClientDisconnected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_anonymous_disconnect_is_silent() {
    let server = start_server().await;

    let mut ada = connect_as(server.addr, "ada").await;
    let anonymous = connect(server.addr).await;
    drop(anonymous);

    // ada hears nothing about the anonymous connection; the next thing it
    // sees is its own chat broadcast
    ada.send(ClientMessage::ChatMessage {
        channel_id: 1,
        content: "ping".to_string(),
    })
    .await
    .unwrap();
    assert!(matches!(
        next_message(&mut ada).await,
        ServerMessage::ChatMessage { .. }
    ));
}

#[tokio::test]
async fn test_queries_over_the_wire() {
    let server = start_server().await;
    let mut client = connect_as(server.addr, "ada").await;

    client
        .send(ClientMessage::GetClients {
            query: ClientQuery::All,
        })
        .await
        .unwrap();
    match next_message(&mut client).await {
        ServerMessage::GetClients { clients } => {
            assert_eq!(clients.len(), 1);
            assert_eq!(clients[0].name, "ada");
        }
        other => panic!("Expected GetClients, got {:?}", other),
    }

    client.send(ClientMessage::GetChannels).await.unwrap();
    match next_message(&mut client).await {
        ServerMessage::GetChannels { channels } => {
            assert_eq!(channels.len(), 2);
            assert_eq!(channels[0].name, "general");
            assert_eq!(channels[1].name, "vc");
        }
        other => panic!("Expected GetChannels, got {:?}", other),
    }
}

#[tokio::test]
async fn test_chat_history_offset_and_count() {
    let server = start_server().await;
    let mut client = connect_as(server.addr, "ada").await;

    for i in 1..=4 {
        client
            .send(ClientMessage::ChatMessage {
                channel_id: 1,
                content: format!("message {}", i),
            })
            .await
            .unwrap();
        // Drain our own broadcast copy
        assert!(matches!(
            next_message(&mut client).await,
            ServerMessage::ChatMessage { .. }
        ));
    }

    client
        .send(ClientMessage::GetChatHistory {
            channel_id: 1,
            count: 2,
            offset_id: 1,
        })
        .await
        .unwrap();

    match next_message(&mut client).await {
        ServerMessage::GetChatHistory {
            channel_id,
            messages,
        } => {
            assert_eq!(channel_id, 1);
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].message_id, 2);
            assert_eq!(messages[1].message_id, 3);
            assert_eq!(messages[0].content, "message 2");
        }
        other => panic!("Expected GetChatHistory, got {:?}", other),
    }
}

#[tokio::test]
async fn test_graceful_shutdown_closes_clients() {
    let server = start_server().await;
    let mut client = connect_as(server.addr, "ada").await;

    // Round-trip once so the connection task is definitely running
    client.send(ClientMessage::GetChannels).await.unwrap();
    assert!(matches!(
        next_message(&mut client).await,
        ServerMessage::GetChannels { .. }
    ));

    let _ = server.shutdown.send(());
    server.handle.await.unwrap();

    // The stream ends rather than erroring
    let end = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for close");
    assert!(end.is_none());

    // And new connections are refused
    assert!(TcpStream::connect(server.addr).await.is_err());
}
