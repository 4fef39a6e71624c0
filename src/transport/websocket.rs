//! WebSocket transport
//!
//! Accepts TCP connections, performs the WebSocket handshake and runs one
//! `Session` per client. Each connection gets two tasks:
//! - the session task, reading frames and calling into the relay
//! - a writer task, draining the connection's channel into the socket
//!
//! The writer ends once every `ConnectionHandle` clone is gone (the session
//! finished and the registry dropped the member), sends a close frame and
//! exits. If the socket breaks first, the writer stops draining and later
//! sends to this member fail, which is how fanout notices dead members.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};

use crate::connection::ConnectionHandle;
use crate::relay::Relay;
use crate::transport::session::Session;
use crate::utils::RelayError;

/// Bind `addr` and serve until the listener fails.
pub async fn start_websocket_server(addr: &str, relay: Arc<Relay>) -> Result<(), RelayError> {
    let listener = TcpListener::bind(addr).await?;
    info!("WebSocket server listening on ws://{}", listener.local_addr()?);
    serve(listener, relay).await
}

/// Accept connections on an already bound listener.
pub async fn serve(listener: TcpListener, relay: Arc<Relay>) -> Result<(), RelayError> {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let relay = relay.clone();
                tokio::spawn(handle_connection(stream, peer, relay));
            }
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, relay: Arc<Relay>) {
    let (handle, mut outgoing) = ConnectionHandle::channel();
    let mut session = Session::new(relay, handle);

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, error = %e, "WebSocket handshake error");
            return;
        }
    };
    session.handshake_complete();

    let connection_id = session.connection_id().to_string();
    debug!(%peer, connection = %connection_id, "connection accepted");

    let (mut ws_sender, ws_receiver) = ws_stream.split();

    let writer = {
        let connection_id = connection_id.clone();
        tokio::spawn(async move {
            while let Some(frame) = outgoing.recv().await {
                if let Err(e) = ws_sender.send(frame).await {
                    debug!(connection = %connection_id, error = %e, "send loop stopped");
                    return;
                }
            }
            let _ = ws_sender.close().await;
        })
    };

    session.run(ws_receiver).await;

    if let Err(e) = writer.await {
        warn!(connection = %connection_id, error = %e, "writer task failed");
    }
    debug!(%peer, connection = %connection_id, "connection closed");
}
