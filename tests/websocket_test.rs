//! End-to-end over real sockets: JSON frames in, JSON frames out.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use arcana_pairs::auth::AnonymousVerifier;
use arcana_pairs::game::GameRules;
use arcana_pairs::servers::{GameSocketConfig, GameSocketServer};
use arcana_pairs::services::{LogResultSink, SessionConfig, SessionManager};
use arcana_pairs::strategy::HeuristicRegistry;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> SocketAddr {
    let manager = SessionManager::new(
        GameRules::default(),
        SessionConfig::default(),
        HeuristicRegistry::standard(),
        Arc::new(LogResultSink),
    )
    .unwrap();
    let server = GameSocketServer::new(
        GameSocketConfig::default(),
        manager,
        Arc::new(AnonymousVerifier),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    addr
}

async fn connect(addr: SocketAddr) -> Socket {
    let (socket, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    socket
}

async fn send(socket: &mut Socket, value: Value) {
    socket.send(Message::text(value.to_string())).await.unwrap();
}

async fn recv(socket: &mut Socket) -> Value {
    let frame = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("socket ended: {:?}", other),
            }
        }
    })
    .await;
    frame.expect("no frame within 5s")
}

async fn recv_type(socket: &mut Socket, kind: &str) -> Value {
    loop {
        let value = recv(socket).await;
        if value["type"] == kind {
            return value;
        }
    }
}

#[tokio::test]
async fn test_two_clients_are_paired() {
    let addr = start_server().await;
    let mut ann = connect(addr).await;
    let mut ben = connect(addr).await;

    send(&mut ann, json!({"type": "set_name", "name": "ann"})).await;
    assert_eq!(recv(&mut ann).await["type"], "waiting_for_match");
    send(&mut ben, json!({"type": "set_name", "name": "ben"})).await;

    let ann_found = recv_type(&mut ann, "match_found").await;
    let ben_found = recv_type(&mut ben, "match_found").await;
    assert_eq!(ann_found["gameId"], ben_found["gameId"]);
    assert_eq!(ann_found["opponentName"], "ben");
    assert_eq!(ann_found["boardRows"], 6);
    assert_ne!(ann_found["yourTurn"], ben_found["yourTurn"]);

    let state = recv_type(&mut ann, "game_state").await;
    assert_eq!(state["cards"].as_array().unwrap().len(), 36);
    assert_eq!(state["phase"], "first_flip");
    assert!(state["cards"][0].get("pairId").is_none());
}

#[tokio::test]
async fn test_bad_frames_get_an_error_reply() {
    let addr = start_server().await;
    let mut socket = connect(addr).await;

    socket.send(Message::text("not json")).await.unwrap();
    let reply = recv(&mut socket).await;
    assert_eq!(reply["type"], "error");

    send(&mut socket, json!({"type": "flip_card", "index": 0})).await;
    let reply = recv(&mut socket).await;
    assert_eq!(reply, json!({"type": "error", "message": "not in a match"}));
}

#[tokio::test]
async fn test_dropped_socket_can_rejoin() {
    let addr = start_server().await;
    let mut ann = connect(addr).await;
    let mut ben = connect(addr).await;
    send(&mut ann, json!({"type": "set_name", "name": "ann"})).await;
    recv_type(&mut ann, "waiting_for_match").await;
    send(&mut ben, json!({"type": "set_name", "name": "ben"})).await;
    let found = recv_type(&mut ann, "match_found").await;
    recv_type(&mut ben, "match_found").await;

    ann.close(None).await.unwrap();
    let notice = recv_type(&mut ben, "opponent_reconnecting").await;
    assert!(notice["reconnectionDeadlineUnixMs"].as_i64().unwrap() > 0);

    let mut again = connect(addr).await;
    send(
        &mut again,
        json!({
            "type": "rejoin",
            "gameId": found["gameId"],
            "rejoinToken": found["rejoinToken"],
            "name": "ann"
        }),
    )
    .await;
    let restored = recv_type(&mut again, "match_found").await;
    assert_eq!(restored["gameId"], found["gameId"]);
    recv_type(&mut again, "game_state").await;
    recv_type(&mut ben, "opponent_reconnected").await;
}
