//! WebSocket upgrade + message loop. Each connection owns one game session.
//!
//! Client messages are parsed as JSON and forwarded to core logic; artwork slots are
//! pushed to the client as their fetches complete, in completion order, tagged with
//! their index.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    Query, State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::task::JoinSet;
use tracing::{info, error, instrument, debug};
use uuid::Uuid;

use crate::logic::{self, dispatch_fetches, SlotUpdate};
use crate::protocol::{ClientWsMessage, ServerWsMessage, WsQuery};
use crate::state::AppState;

#[instrument(level = "info", skip(state, ws))]
pub async fn ws_upgrade(
  ws: WebSocketUpgrade,
  State(state): State<Arc<AppState>>,
  Query(q): Query<WsQuery>,
) -> impl IntoResponse {
  info!(target: "odd_art_out", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state, q.player_id))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, player_id: Option<String>) {
  let session_id = Uuid::new_v4().to_string();
  let player_id = player_id.unwrap_or_else(|| session_id.clone());
  info!(target: "odd_art_out", session = %session_id, player = %player_id, "WebSocket connected");

  state.open_socket_session(&session_id, &player_id).await;
  let mut fetches: JoinSet<Option<SlotUpdate>> = JoinSet::new();

  // The first round starts as soon as the socket opens.
  let opening = start_round(&state, &session_id, &player_id, &mut fetches).await;
  if send(&mut socket, &opening).await.is_err() {
    state.end_session(&session_id).await;
    return;
  }

  loop {
    let reply = tokio::select! {
      incoming = socket.recv() => match incoming {
        Some(Ok(Message::Text(txt))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(msg) => {
            debug!(target: "odd_art_out", "WS received: {:?}", &msg);
            handle_client_ws(msg, &state, &session_id, &player_id, &mut fetches).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        },
        Some(Ok(Message::Ping(payload))) => {
          let _ = socket.send(Message::Pong(payload)).await;
          continue;
        }
        Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
        Some(Ok(_)) => continue,
      },
      Some(joined) = fetches.join_next(), if !fetches.is_empty() => match joined {
        Ok(Some(update)) => ServerWsMessage::Artwork { generation: update.generation, artwork: update.artwork },
        // Stale round.
        Ok(None) => continue,
        Err(e) => {
          error!(target: "odd_art_out", error = %e, "Fetch task failed");
          continue;
        }
      },
    };

    if send(&mut socket, &reply).await.is_err() {
      break;
    }
  }

  state.end_session(&session_id).await;
  info!(target: "odd_art_out", session = %session_id, "WebSocket disconnected");
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await.map_err(|e| {
    error!(target: "odd_art_out", error = %e, "WS send error");
    e
  })
}

async fn start_round(
  state: &Arc<AppState>,
  session_id: &str,
  player_id: &str,
  fetches: &mut JoinSet<Option<SlotUpdate>>,
) -> ServerWsMessage {
  let ticket = match state.start_round(Some(session_id.to_string()), Some(player_id.to_string())).await {
    Ok(t) => t,
    Err(e) => return ServerWsMessage::Error { message: e.to_string() },
  };
  dispatch_fetches(state, &ticket, fetches);
  match logic::current_round(state, session_id).await {
    Ok(round) => ServerWsMessage::Round { round },
    Err(e) => ServerWsMessage::Error { message: e.to_string() },
  }
}

#[instrument(level = "info", skip(state, fetches))]
async fn handle_client_ws(
  msg: ClientWsMessage,
  state: &Arc<AppState>,
  session_id: &str,
  player_id: &str,
  fetches: &mut JoinSet<Option<SlotUpdate>>,
) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::NewRound => start_round(state, session_id, player_id, fetches).await,

    ClientWsMessage::Activate { index } => match logic::activate(state, session_id, index).await {
      Ok(result) => {
        tracing::info!(target: "round", session = %session_id, outcome = ?result.outcome, "WS activation handled");
        ServerWsMessage::Activated { result }
      }
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::Scores => match logic::scores(state, player_id).await {
      Ok(scores) => ServerWsMessage::Scores { scores },
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;
  use std::time::Duration;

  use futures_util::{SinkExt, StreamExt};
  use tokio::net::{TcpListener, TcpStream};
  use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream};
  use wiremock::matchers::path;
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;
  use crate::domain::Catalog;
  use crate::met::MetClient;
  use crate::routes::build_router;
  use crate::store::MemoryCounterStore;

  type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

  async fn museum() -> MockServer {
    let server = MockServer::start().await;
    let objects = [(101, "Monet"), (201, "Degas"), (202, "Degas"), (203, "Degas"), (204, "Degas")];
    for (id, artist) in objects {
      Mock::given(path(format!("/objects/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
          "primaryImageSmall": format!("https://img/{id}.jpg"),
          "artistDisplayName": artist,
          "title": format!("Work {id}"),
          "objectEndDate": 1890,
          "medium": "Oil on canvas",
          "tags": [{ "term": "Dancers" }]
        })))
        .mount(&server)
        .await;
    }
    server
  }

  /// Serve the full router on an ephemeral port.
  async fn serve(state: Arc<AppState>) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state);
    tokio::spawn(async move { axum::serve(listener, app).await });
    addr
  }

  async fn next_json(ws: &mut Client) -> serde_json::Value {
    loop {
      let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("server reply in time")
        .expect("socket still open")
        .unwrap();
      if let WsMessage::Text(txt) = msg {
        return serde_json::from_str(&txt).unwrap();
      }
    }
  }

  async fn send_json(ws: &mut Client, msg: serde_json::Value) {
    ws.send(WsMessage::Text(msg.to_string())).await.unwrap();
  }

  #[tokio::test]
  async fn socket_plays_a_round_and_drops_its_session_on_close() {
    let server = museum().await;
    let catalog = Catalog::new(BTreeMap::from([
      ("Monet".to_string(), vec![101]),
      ("Degas".to_string(), vec![201, 202, 203, 204]),
    ]));
    let met = MetClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    let state = Arc::new(AppState::new(catalog, met, Arc::new(MemoryCounterStore::new()), "./static"));
    let addr = serve(state.clone()).await;

    let (mut ws, _) = connect_async(format!("ws://{addr}/ws?playerId=p1")).await.unwrap();

    // Opening round, answers hidden.
    let opening = next_json(&mut ws).await;
    assert_eq!(opening["type"], "round");
    let round = &opening["round"];
    assert_eq!(round["playerId"], "p1");
    assert_eq!(round["reveal"], "hidden");
    assert!(round.get("correctArtist").is_none());
    let generation = round["generation"].as_u64().unwrap();
    let ids: Vec<u64> = round["artworks"]
      .as_array()
      .unwrap()
      .iter()
      .map(|a| a["id"].as_u64().unwrap())
      .collect();
    assert_eq!(ids.len(), 4);
    assert_eq!(state.sessions.read().await.len(), 1);

    // One push per slot, each landing on its own index.
    let mut filled = [false; 4];
    for _ in 0..4 {
      let msg = next_json(&mut ws).await;
      assert_eq!(msg["type"], "artwork");
      assert_eq!(msg["generation"], generation);
      let artwork = &msg["artwork"];
      let index = artwork["index"].as_u64().unwrap() as usize;
      assert_eq!(artwork["status"], "ready");
      assert_eq!(artwork["id"].as_u64().unwrap(), ids[index]);
      assert!(artwork.get("artistName").is_none());
      filled[index] = true;
    }
    assert_eq!(filled, [true; 4]);

    send_json(&mut ws, serde_json::json!({ "type": "ping" })).await;
    assert_eq!(next_json(&mut ws).await["type"], "pong");

    let monet = ids.iter().position(|id| *id == 101).unwrap();
    send_json(&mut ws, serde_json::json!({ "type": "activate", "index": monet })).await;
    let activated = next_json(&mut ws).await;
    assert_eq!(activated["type"], "activated");
    let result = &activated["result"];
    assert_eq!(result["outcome"], "scored");
    assert_eq!(result["code"], "correct");
    assert_eq!(result["round"]["reveal"], "revealed");
    assert_eq!(result["round"]["correctArtist"], "Monet");
    assert_eq!(result["scores"]["correct"], 1);
    assert_eq!(result["scores"]["incorrect"], 0);

    // A second click is a no-op for the counters.
    send_json(&mut ws, serde_json::json!({ "type": "activate", "index": monet })).await;
    let again = next_json(&mut ws).await;
    assert_eq!(again["result"]["outcome"], "already_revealed");
    assert_eq!(again["result"]["scores"]["correct"], 1);

    ws.close(None).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
      while !state.sessions.read().await.is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
      }
    })
    .await
    .expect("session dropped after the socket closed");
  }

  #[tokio::test]
  async fn bad_client_message_gets_an_error_reply() {
    let catalog = Catalog::new(BTreeMap::from([
      ("Monet".to_string(), vec![101]),
      ("Degas".to_string(), vec![201, 202, 203]),
    ]));
    // Nothing listens here; slots fail, which this test doesn't look at.
    let met = MetClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
    let state = Arc::new(AppState::new(catalog, met, Arc::new(MemoryCounterStore::new()), "./static"));
    let addr = serve(state).await;

    let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    assert_eq!(next_json(&mut ws).await["type"], "round");

    ws.send(WsMessage::Text("{\"type\":\"shuffle\"}".into())).await.unwrap();
    loop {
      let msg = next_json(&mut ws).await;
      if msg["type"] == "artwork" {
        continue;
      }
      assert_eq!(msg["type"], "error");
      assert!(msg["message"].as_str().unwrap().starts_with("Invalid JSON"));
      break;
    }
  }
}
