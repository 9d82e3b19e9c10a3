use crate::errors::ClientError;
use futures::{SinkExt, StreamExt};
use gridx_domain_models::SessionMessage;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{info, instrument};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A worker's end of a session connection, driven in integration tests.
///
/// Owns the WebSocket stream directly rather than splitting sink/stream
/// permanently: tests send one frame, then read the reply, in lockstep,
/// so there is never a need for concurrent send/receive here.
pub struct WorkerSessionClient {
    socket: Socket,
}

impl WorkerSessionClient {
    #[instrument(skip(ws_url))]
    pub async fn connect(ws_url: &str) -> Result<Self, ClientError> {
        info!("connecting worker session to {ws_url}");
        let (socket, _response) = tokio_tungstenite::connect_async(ws_url).await?;
        Ok(Self { socket })
    }

    pub async fn send(&mut self, message: &SessionMessage) -> Result<(), ClientError> {
        let text = serde_json::to_string(message)?;
        self.socket.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Waits for the next session frame, skipping ping/pong control frames.
    pub async fn recv(&mut self) -> Result<SessionMessage, ClientError> {
        loop {
            match self.socket.next().await {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                    return Err(ClientError::ClosedByPeer(reason));
                }
                Some(Ok(_)) => return Err(ClientError::UnexpectedFrame),
                Some(Err(e)) => return Err(ClientError::ConnectFault(e)),
                None => return Err(ClientError::Disconnected),
            }
        }
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.socket.close(None).await?;
        Ok(())
    }
}
