//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::util::rate_limit::FrameRateLimiter;
use crate::ws::hub::Connection;
use crate::ws::protocol::{ClientMsg, ServerMsg};
use crate::ws::session::Session;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4();
    info!(session_id = %session_id, "A player has connected");

    let (ws_sink, ws_stream) = socket.split();

    // Channel must exist before the session queues the world snapshot
    let connection = state.hub.register(session_id);
    let session = Session::open(
        session_id,
        state.game.clone(),
        state.hub.clone(),
        state.leaderboard.clone(),
    );

    let writer_handle = tokio::spawn(write_loop(session_id, ws_sink, connection));

    run_session(session, ws_stream, FrameRateLimiter::new(state.config.max_frames_per_sec)).await;

    // Cleanup on disconnect
    state.hub.unregister(&session_id);
    writer_handle.abort();

    info!(session_id = %session_id, "WebSocket connection closed");
}

/// Reader loop: WebSocket -> session
async fn run_session(
    mut session: Session,
    mut ws_stream: SplitStream<WebSocket>,
    mut rate_limiter: FrameRateLimiter,
) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(frame) => {
                if dispatch_frame(&mut session, &mut rate_limiter, frame) == FrameAction::Close {
                    break;
                }
            }
            Err(e) => {
                error!(session_id = %session.id(), error = %e, "WebSocket error");
                break;
            }
        }
    }

    session.close();
}

/// What the reader loop does after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameAction {
    Continue,
    Close,
}

/// Hand one inbound frame to the session. Over-quota and malformed frames
/// are dropped without touching the session.
fn dispatch_frame(
    session: &mut Session,
    rate_limiter: &mut FrameRateLimiter,
    frame: Message,
) -> FrameAction {
    let session_id = session.id();

    match frame {
        Message::Text(text) => {
            if !rate_limiter.check_frame() {
                warn!(
                    session_id = %session_id,
                    dropped = rate_limiter.dropped(),
                    "Rate limited input message"
                );
                return FrameAction::Continue;
            }

            match serde_json::from_str::<ClientMsg>(&text) {
                Ok(client_msg) => session.handle(client_msg),
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Failed to parse client message");
                }
            }
            FrameAction::Continue
        }
        Message::Binary(_) => {
            warn!(session_id = %session_id, "Received binary message, ignoring");
            FrameAction::Continue
        }
        Message::Ping(_) | Message::Pong(_) => FrameAction::Continue,
        Message::Close(_) => {
            info!(session_id = %session_id, "Client initiated close");
            FrameAction::Close
        }
    }
}

/// Writer loop: direct + broadcast channels -> WebSocket
async fn write_loop(
    session_id: Uuid,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut connection: Connection,
) {
    loop {
        let msg = tokio::select! {
            // Direct first so the initial world precedes any roster update
            biased;
            Some(msg) = connection.direct_rx.recv() => msg,
            result = connection.broadcast_rx.recv() => match result {
                Ok(msg) => msg,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        session_id = %session_id,
                        lagged_count = n,
                        "Client lagged, skipping {} messages", n
                    );
                    // Continue - don't disconnect for lag
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(session_id = %session_id, "Broadcast channel closed");
                    break;
                }
            },
        };

        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(session_id = %session_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::game::testing::core_with_seed;
    use crate::game::GameCore;
    use crate::store::{Leaderboard, MemoryLedger};
    use crate::ws::hub::Hub;
    use crate::ws::session::SessionState;

    struct Fixture {
        game: Arc<GameCore>,
        session: Session,
        connection: Connection,
    }

    fn fixture(seed: u64) -> Fixture {
        let game = Arc::new(core_with_seed(seed));
        let hub = Hub::new();
        let leaderboard = Leaderboard::new(Arc::new(MemoryLedger::new()), hub.clone(), 3);
        let id = Uuid::new_v4();
        let mut connection = hub.register(id);
        let session = Session::open(id, game.clone(), hub, leaderboard);
        // Opening world
        assert!(matches!(connection.direct_rx.try_recv(), Ok(ServerMsg::World(_))));

        Fixture {
            game,
            session,
            connection,
        }
    }

    fn text(json: &str) -> Message {
        Message::Text(json.to_string())
    }

    #[tokio::test]
    async fn test_valid_frame_reaches_session() {
        let mut f = fixture(1);
        let mut limiter = FrameRateLimiter::new(30);

        let action = dispatch_frame(&mut f.session, &mut limiter, text(r#"{"type":"start"}"#));

        assert_eq!(action, FrameAction::Continue);
        assert_eq!(f.session.state(), SessionState::Active);
        assert!(matches!(
            f.connection.direct_rx.try_recv(),
            Ok(ServerMsg::PlayerAssigned(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_frames_are_dropped() {
        let mut f = fixture(2);
        let mut limiter = FrameRateLimiter::new(30);

        for frame in [
            text("not json"),
            text(r#"{"type":"teleport"}"#),
            text(r#"{"type":"move","x":1,"y":1}"#),
            Message::Binary(vec![1, 2, 3]),
        ] {
            assert_eq!(
                dispatch_frame(&mut f.session, &mut limiter, frame),
                FrameAction::Continue
            );
        }

        assert_eq!(f.session.state(), SessionState::Connected);
        assert_eq!(f.game.player_count(), 0);
        assert!(f.connection.direct_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_over_quota_frames_are_dropped() {
        let mut f = fixture(3);
        let mut limiter = FrameRateLimiter::new(1);

        dispatch_frame(&mut f.session, &mut limiter, text(r#"{"type":"start"}"#));
        assert!(matches!(
            f.connection.direct_rx.try_recv(),
            Ok(ServerMsg::PlayerAssigned(_))
        ));

        // A second start would normally be answered with already_started
        let action = dispatch_frame(&mut f.session, &mut limiter, text(r#"{"type":"start"}"#));

        assert_eq!(action, FrameAction::Continue);
        assert_eq!(limiter.dropped(), 1);
        assert_eq!(f.session.state(), SessionState::Active);
        assert_eq!(f.game.player_count(), 1);
        assert!(f.connection.direct_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_frame_ends_read_loop() {
        let mut f = fixture(4);
        let mut limiter = FrameRateLimiter::new(30);

        assert_eq!(
            dispatch_frame(&mut f.session, &mut limiter, Message::Ping(vec![])),
            FrameAction::Continue
        );
        assert_eq!(
            dispatch_frame(&mut f.session, &mut limiter, Message::Close(None)),
            FrameAction::Close
        );
    }
}
