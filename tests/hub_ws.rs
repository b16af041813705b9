//! End-to-end tests: real server, real WebSocket clients.

#![allow(clippy::expect_used, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderName;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use taskboard_hub::api::build_router;
use taskboard_hub::app_state::AppState;
use taskboard_hub::config::{ConnectionConfig, HubConfig};
use taskboard_hub::domain::{BoardId, Entity, Mutation, MutationKind, SanitizedColumn, UserId};
use taskboard_hub::hub::{Hub, HubHandle, MemoryBoardAccess};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Server {
    addr: SocketAddr,
    hub: HubHandle,
    access: Arc<MemoryBoardAccess>,
    shutdown: CancellationToken,
}

async fn spawn_server() -> Server {
    let access = Arc::new(MemoryBoardAccess::new());
    let (hub, handle) = Hub::new(Arc::clone(&access), HubConfig::default());
    let shutdown = CancellationToken::new();
    tokio::spawn(hub.run(shutdown.clone()));

    let state = AppState {
        hub: handle.clone(),
        connection: ConnectionConfig::default(),
        shutdown: shutdown.clone(),
        user_header: HeaderName::from_static("x-user-id"),
    };
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, build_router(state)).await });

    Server {
        addr,
        hub: handle,
        access,
        shutdown,
    }
}

async fn connect(server: &Server, user: Option<u64>) -> Result<Client, tungstenite::Error> {
    let mut request = format!("ws://{}/ws", server.addr).into_client_request()?;
    if let Some(user) = user {
        request
            .headers_mut()
            .insert("x-user-id", HeaderValue::from(user));
    }
    let (client, _response) = tokio_tungstenite::connect_async(request).await?;
    Ok(client)
}

async fn wait_for_connections(server: &Server, expected: usize) {
    for _ in 0..100 {
        let stats = server.hub.stats().await.expect("hub running");
        if stats.connections == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("hub never reached {expected} connections");
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("frame in time")
            .expect("stream open")
            .expect("valid frame");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("json frame");
        }
    }
}

async fn send_json(client: &mut Client, value: Value) {
    client
        .send(Message::text(value.to_string()))
        .await
        .expect("send frame");
}

#[tokio::test]
async fn health_reports_counters() {
    let server = spawn_server().await;

    let body: Value = reqwest::get(format!("http://{}/health", server.addr))
        .await
        .expect("health request")
        .json()
        .await
        .expect("health json");

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["connections"], 0);
    server.shutdown.cancel();
}

#[tokio::test]
async fn upgrade_without_identity_is_rejected() {
    let server = spawn_server().await;

    let result = connect(&server, None).await;

    let Err(tungstenite::Error::Http(response)) = result else {
        panic!("expected an HTTP rejection");
    };
    assert_eq!(response.status(), 401);
    server.shutdown.cancel();
}

#[tokio::test]
async fn board_members_see_presence_and_mutations() {
    let server = spawn_server().await;
    server.access.grant(UserId::new(7), BoardId::new(5));
    server.access.grant(UserId::new(8), BoardId::new(5));

    let mut alice = connect(&server, Some(7)).await.expect("alice connects");
    wait_for_connections(&server, 1).await;
    let mut bob = connect(&server, Some(8)).await.expect("bob connects");
    assert_eq!(
        next_json(&mut alice).await,
        json!({"type": "register", "userId": 8})
    );

    send_json(&mut alice, json!({"type": "join", "channel": "board_5"})).await;
    assert_eq!(
        next_json(&mut alice).await,
        json!({"type": "join", "channel": "board_5", "userId": 7})
    );

    send_json(&mut bob, json!({"type": "join", "channel": "board_5"})).await;
    let bob_joined = json!({"type": "join", "channel": "board_5", "userId": 8});
    assert_eq!(next_json(&mut alice).await, bob_joined);
    assert_eq!(next_json(&mut bob).await, bob_joined);

    let column = SanitizedColumn {
        id: 3,
        board_id: 5,
        next_id: None,
        name: "Done".to_string(),
    };
    server
        .hub
        .notify_mutation(Mutation::new(
            BoardId::new(5),
            MutationKind::Updated,
            Entity::Column(column),
        ))
        .await
        .expect("hub accepts mutation");
    let expected = json!({
        "type": "updated",
        "channel": "board_5",
        "column": {"id": 3, "boardId": 5, "nextId": null, "name": "Done"}
    });
    assert_eq!(next_json(&mut alice).await, expected);
    assert_eq!(next_json(&mut bob).await, expected);

    send_json(&mut alice, json!({"type": "ping"})).await;
    assert_eq!(next_json(&mut alice).await, json!({"type": "pong"}));

    bob.close(None).await.expect("bob closes");
    assert_eq!(
        next_json(&mut alice).await,
        json!({"type": "leave", "channel": "board_5", "userId": 8})
    );
    assert_eq!(
        next_json(&mut alice).await,
        json!({"type": "unregister", "userId": 8})
    );

    server.shutdown.cancel();
}

#[tokio::test]
async fn malformed_and_unauthorized_frames_are_ignored() {
    let server = spawn_server().await;
    server.access.grant(UserId::new(7), BoardId::new(5));

    let mut client = connect(&server, Some(9)).await.expect("connects");
    client
        .send(Message::text("{not json"))
        .await
        .expect("send garbage");
    send_json(&mut client, json!({"type": "dance"})).await;
    send_json(&mut client, json!({"type": "join", "channel": "board_5"})).await;
    send_json(&mut client, json!({"type": "ping"})).await;

    assert_eq!(next_json(&mut client).await, json!({"type": "pong"}));
    let stats = server.hub.stats().await.expect("hub running");
    assert_eq!(stats.subscriptions, 0);
    server.shutdown.cancel();
}

#[tokio::test]
async fn shutdown_closes_open_connections() {
    let server = spawn_server().await;
    let mut client = connect(&server, Some(1)).await.expect("connects");
    wait_for_connections(&server, 1).await;

    server.shutdown.cancel();

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(frame) = client.next().await {
            if matches!(frame, Ok(Message::Close(_)) | Err(_)) {
                break;
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}
