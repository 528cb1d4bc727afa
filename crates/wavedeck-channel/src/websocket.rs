//! WebSocket push transport using `tokio-tungstenite`.

use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use wavedeck_protocol::Credential;

use crate::{ChannelError, PushConnection, PushTransport};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`PushTransport`] connecting to the backend's realtime endpoint
/// over WebSocket.
///
/// The credential travels as an `Authorization: Bearer` header on the
/// upgrade request — connection-time auth context, never re-sent after
/// the handshake.
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    /// Creates a transport for the given `ws://` or `wss://` endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The configured endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PushTransport for WebSocketTransport {
    type Conn = WebSocketPushConnection;

    async fn connect(
        &self,
        credential: &Credential,
    ) -> Result<Self::Conn, ChannelError> {
        let mut request =
            self.url.as_str().into_client_request().map_err(|e| {
                ChannelError::ConnectFailed(format!(
                    "invalid realtime endpoint: {e}"
                ))
            })?;

        let bearer = format!("Bearer {}", credential.as_str())
            .parse()
            .map_err(|_| {
                ChannelError::ConnectFailed(
                    "credential is not a valid header value".into(),
                )
            })?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (ws, _response) = connect_async(request)
            .await
            .map_err(|e| ChannelError::ConnectFailed(e.to_string()))?;

        tracing::debug!(url = %self.url, "websocket connected");
        Ok(WebSocketPushConnection { ws })
    }
}

/// One established WebSocket push connection.
pub struct WebSocketPushConnection {
    ws: WsStream,
}

impl PushConnection for WebSocketPushConnection {
    async fn recv(&mut self) -> Result<Option<String>, ChannelError> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_str().to_owned()));
                }
                // Some backends frame JSON as binary; accept it when
                // it's valid UTF-8 and skip it otherwise.
                Some(Ok(Message::Binary(data))) => {
                    match String::from_utf8(data.to_vec()) {
                        Ok(text) => return Ok(Some(text)),
                        Err(_) => {
                            tracing::warn!(
                                "skipping non-utf8 binary push frame"
                            );
                            continue;
                        }
                    }
                }
                // A close frame is the server deliberately ending the
                // session's channel.
                Some(Ok(Message::Close(_))) => return Ok(None),
                // Ping/pong/raw frames are transport noise.
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(ChannelError::Transport(e.to_string()));
                }
                // Stream ended without a close frame: abnormal,
                // classified transient.
                None => {
                    return Err(ChannelError::Transport(
                        "stream ended without close frame".into(),
                    ));
                }
            }
        }
    }

    async fn close(&mut self) {
        // Best-effort close handshake; the connection is gone either way.
        let _ = self.ws.close(None).await;
    }
}
