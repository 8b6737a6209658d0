//! Property tests over whole invocations.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use proptest::prelude::*;

use crate::adapter::Adapter;
use crate::identifiers::ConnectionId;
use crate::protocol::{BoxError, BoxedApp, Header, Message, Payload, ScopeKind, app_fn};
use crate::registry::{ConnectionRegistry, ConnectionUpdate, MemoryRegistry};
use crate::testing::{self, CONNECTION_ID, RecordingPusher};

// ============================================================================
// Applications
// ============================================================================

/// Replies with `status` and `chunks` as a streamed body.
fn chunked_app(status: u16, chunks: Vec<Vec<u8>>) -> BoxedApp {
    let chunks = Arc::new(chunks);
    Arc::new(app_fn(move |_scope, mut receive, send| {
        let chunks = Arc::clone(&chunks);
        async move {
            let _request = receive.recv().await;
            send.send(Message::response_start(
                status,
                vec![Header::new("content-type", "application/octet-stream")],
            ))
            .await?;
            for chunk in chunks.iter() {
                send.send(Message::response_chunk(chunk.clone())).await?;
            }
            send.send(Message::response_body(Vec::new())).await?;
            Ok::<(), BoxError>(())
        }
    }))
}

/// Accepts on connect; forwards every text message to `group`.
fn group_app(group: &'static str) -> BoxedApp {
    Arc::new(app_fn(move |scope, mut receive, send| async move {
        if scope.kind == ScopeKind::WebSocket {
            match receive.recv().await {
                Message::WebSocketConnect => send.send(Message::accept()).await?,
                Message::WebSocketReceive { text: Some(text), .. } => {
                    send.send(Message::send_group(group, text)).await?;
                }
                _ => {}
            }
        }
        Ok::<(), BoxError>(())
    }))
}

fn websocket_adapter(
    app: BoxedApp,
    registry: Arc<MemoryRegistry>,
    pusher: Arc<RecordingPusher>,
) -> Adapter {
    Adapter::builder()
        .app_arc(app)
        .registry(registry)
        .pusher(pusher)
        .build()
        .expect("adapter")
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_http_body_is_ordered_concatenation(
        status in 100u16..600,
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..8),
    ) {
        let expected: Vec<u8> = chunks.concat();
        let adapter = Adapter::builder()
            .app_arc(chunked_app(status, chunks))
            .build()
            .expect("adapter");

        let response = tokio_test::block_on(
            adapter.handle(testing::http_event("GET", "/stream", None)),
        )
        .expect("response");

        prop_assert_eq!(response.status_code, status);
        prop_assert_eq!(response.body_bytes().expect("body"), expected);
    }

    #[test]
    fn test_disconnect_always_leaves_connection_absent(
        messages in prop::collection::vec("[a-z ]{0,16}", 0..4),
        connected in any::<bool>(),
    ) {
        let registry = Arc::new(MemoryRegistry::new());
        let pusher = Arc::new(RecordingPusher::new());
        let adapter = websocket_adapter(group_app("room"), Arc::clone(&registry), pusher);
        let id = ConnectionId::new(CONNECTION_ID);

        runtime().block_on(async {
            if connected {
                adapter.handle(testing::ws_connect_event()).await.expect("connect");
            }
            for message in &messages {
                let _ = adapter.handle(testing::ws_message_event(message)).await;
            }
            adapter.handle(testing::ws_disconnect_event()).await.expect("disconnect");
        });

        prop_assert!(!registry.contains(&id));
    }

    #[test]
    fn test_group_send_pushes_once_per_member_and_prunes_gone(
        gone_mask in prop::collection::vec(any::<bool>(), 0..12),
    ) {
        testing::init_logging();

        let members: Vec<String> = (0..gone_mask.len()).map(|i| format!("member-{i}")).collect();
        let gone: Vec<&str> = members
            .iter()
            .zip(&gone_mask)
            .filter(|(_, gone)| **gone)
            .map(|(id, _)| id.as_str())
            .collect();

        let registry = Arc::new(MemoryRegistry::new());
        let pusher = Arc::new(RecordingPusher::new().with_gone(gone.iter().copied()));
        let adapter = websocket_adapter(group_app("room"), Arc::clone(&registry), Arc::clone(&pusher));

        runtime().block_on(async {
            for member in &members {
                registry
                    .upsert(&ConnectionId::new(member.as_str()), ConnectionUpdate::new().groups(["room"]))
                    .await
                    .expect("upsert");
            }
            adapter.handle(testing::ws_connect_event()).await.expect("connect");
            adapter.handle(testing::ws_message_event("hi")).await.expect("broadcast");
        });

        let mut pushed: Vec<String> = pusher
            .pushes()
            .into_iter()
            .map(|(id, payload)| {
                assert_eq!(payload, Payload::Text("hi".to_string()));
                id.into_inner()
            })
            .collect();
        pushed.sort();

        let mut expected: Vec<String> = members.clone();
        expected.push(CONNECTION_ID.to_string());
        expected.sort();

        prop_assert_eq!(pushed, expected);

        for (member, is_gone) in members.iter().zip(&gone_mask) {
            prop_assert_eq!(registry.contains(&ConnectionId::new(member.as_str())), !is_gone);
        }
        prop_assert!(registry.contains(&ConnectionId::new(CONNECTION_ID)));
    }
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[tokio::test]
async fn test_gone_member_is_not_pushed_twice() -> anyhow::Result<()> {
    testing::init_logging();

    let registry = Arc::new(MemoryRegistry::new());
    let pusher = Arc::new(RecordingPusher::new().with_gone(["stale"]));
    let adapter = websocket_adapter(group_app("room"), Arc::clone(&registry), Arc::clone(&pusher));

    registry
        .upsert(&ConnectionId::new("stale"), ConnectionUpdate::new().groups(["room"]))
        .await?;
    adapter.handle(testing::ws_connect_event()).await?;
    adapter.handle(testing::ws_message_event("first")).await?;
    adapter.handle(testing::ws_message_event("second")).await?;

    let stale_pushes = pusher
        .pushes()
        .into_iter()
        .filter(|(id, _)| id.as_str() == "stale")
        .count();

    assert_eq!(stale_pushes, 1);
    assert_eq!(pusher.pushes().len(), 3);
    Ok(())
}
