//! Per-connection tasks
//!
//! Each accepted socket gets two tasks: a reader loop that decodes frames
//! and routes them through the handlers, and a writer task that drains the
//! connection's outbound queue. The writer is the only task touching the
//! write half, so frames are never interleaved on the wire.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, warn};

use etcord_protocol::{
    ClientMessage, ErrorCode, FrameCodec, ProtocolError, ServerMessage,
};

use crate::handlers::{HandlerContext, HandlerResult};
use crate::registry::ClientId;
use crate::server::SharedState;

/// Drive one client connection until it disconnects or the server stops
///
/// The shutdown receiver is subscribed by the accept loop before this task
/// is spawned, so a signal sent right after accept is never missed.
pub(crate) async fn handle_client(
    stream: TcpStream,
    peer: SocketAddr,
    state: SharedState,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let (read_half, write_half) = stream.into_split();

    let (frame_tx, frame_rx) = mpsc::channel::<Bytes>(state.config.server.send_queue_depth);
    let client_id = state.registry.register(frame_tx);
    info!("{} connected from {}", client_id, peer);

    let writer = tokio::spawn(write_frames(write_half, frame_rx, client_id));

    let ctx = HandlerContext::new(
        Arc::clone(&state.registry),
        Arc::clone(&state.channels),
        client_id,
    );

    let mut frames = FramedRead::new(read_half, FrameCodec::new());

    loop {
        tokio::select! {
            frame = frames.next() => match frame {
                Some(Ok((ty, mut payload))) => {
                    match ClientMessage::decode_payload(ty, &mut payload) {
                        Ok(msg) => {
                            debug!("{} sent {}", client_id, ty);
                            deliver(&ctx, ctx.route_message(msg));
                        }
                        Err(e) if e.is_fatal() => {
                            error!("{} sent an unrecoverable {} frame: {}", client_id, ty, e);
                            break;
                        }
                        Err(e) => {
                            // The frame was fully consumed, so the stream is
                            // still in sync; reject just this request.
                            warn!("{} sent an invalid {} frame: {}", client_id, ty, e);
                            deliver(&ctx, HandlerContext::error(reject_code(&e), e.to_string()));
                        }
                    }
                }
                Some(Err(e)) => {
                    error!("{} framing error: {}", client_id, e);
                    break;
                }
                None => {
                    debug!("{} closed the connection", client_id);
                    break;
                }
            },
            _ = shutdown_rx.recv() => {
                debug!("{} reader stopping for shutdown", client_id);
                break;
            }
        }
    }

    let was_named = state.registry.is_named(client_id);
    state.registry.unregister(client_id);

    // Only announce clients that completed login; anonymous connections
    // were never announced in the first place.
    if was_named {
        broadcast_message(
            &state,
            ServerMessage::ClientDisconnected {
                client_id: client_id.value(),
            },
        );
    }

    // The registry entry held the last queue sender, so the writer drains
    // whatever is pending and exits on its own.
    if let Err(e) = writer.await {
        error!("{} writer task panicked: {}", client_id, e);
    }

    info!("{} disconnected", client_id);
}

/// Writer task: drain the outbound queue onto the socket
async fn write_frames(
    mut write_half: OwnedWriteHalf,
    mut frame_rx: mpsc::Receiver<Bytes>,
    client_id: ClientId,
) {
    while let Some(frame) = frame_rx.recv().await {
        if let Err(e) = write_half.write_all(&frame).await {
            debug!("{} write failed: {}", client_id, e);
            return;
        }
    }
    let _ = write_half.shutdown().await;
}

/// Turn a handler outcome into queued frames
fn deliver(ctx: &HandlerContext, result: HandlerResult) {
    match result {
        HandlerResult::Response(msg) => match msg.to_frame() {
            Ok(frame) => {
                ctx.registry.try_send_to(ctx.client_id, frame);
            }
            Err(e) => error!("Failed to encode {} response: {}", msg.msg_type(), e),
        },
        HandlerResult::Broadcast(msg) => match msg.to_frame() {
            Ok(frame) => {
                ctx.registry.broadcast(frame);
            }
            Err(e) => error!("Failed to encode {} broadcast: {}", msg.msg_type(), e),
        },
        HandlerResult::BroadcastExceptSender(msg) => match msg.to_frame() {
            Ok(frame) => {
                ctx.registry.broadcast_except(ctx.client_id, frame);
            }
            Err(e) => error!("Failed to encode {} broadcast: {}", msg.msg_type(), e),
        },
        HandlerResult::NoResponse => {}
    }
}

/// Broadcast a server-originated notification to everyone still connected
pub(crate) fn broadcast_message(state: &SharedState, msg: ServerMessage) {
    match msg.to_frame() {
        Ok(frame) => {
            state.registry.broadcast(frame);
        }
        Err(e) => error!("Failed to encode {} broadcast: {}", msg.msg_type(), e),
    }
}

/// Error code for a request rejected during payload decode
fn reject_code(err: &ProtocolError) -> ErrorCode {
    match err {
        ProtocolError::EmptyField(_) => ErrorCode::EmptyField,
        _ => ErrorCode::MalformedMessage,
    }
}
