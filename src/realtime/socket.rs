//! Realtime websocket connection and frame handling

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::RealtimeError;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// One JSON frame on a realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

pub struct RealtimeSocket {
    stream: WsStream,
}

impl RealtimeSocket {
    /// Connect to the realtime websocket endpoint.
    ///
    /// Auth is carried by the apikey in the URL query; no headers needed.
    pub async fn connect(url: &str) -> Result<Self, RealtimeError> {
        tracing::info!("Connecting realtime websocket");
        tracing::debug!("Realtime URL: {}", url);

        let (stream, response) = connect_async(url).await?;

        tracing::info!("Realtime websocket connected (status={})", response.status());

        Ok(Self { stream })
    }

    /// Send one channel message.
    pub async fn send(&mut self, msg: &ChannelMessage) -> Result<(), RealtimeError> {
        let text = serde_json::to_string(msg)
            .map_err(|e| RealtimeError::Protocol(format!("serialize frame: {}", e)))?;
        tracing::debug!("WS send: {}", text);
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Receive the next channel message, answering pings and skipping
    /// frames that do not parse (a partial event cannot be matched to any
    /// subscription, so it is dropped here).
    pub async fn recv(&mut self) -> Result<Option<ChannelMessage>, RealtimeError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("WS recv: {}", text);
                    match serde_json::from_str::<ChannelMessage>(&text) {
                        Ok(msg) => return Ok(Some(msg)),
                        Err(e) => {
                            tracing::debug!("Discarding unparseable frame: {}", e);
                        }
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    self.stream.send(Message::Pong(data)).await?;
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!("Realtime websocket closed: {:?}", frame);
                    return Ok(None);
                }
                Some(Ok(other)) => {
                    tracing::debug!("WS frame (ignored): {:?}", other);
                }
                Some(Err(e)) => {
                    return Err(RealtimeError::Transport(e));
                }
                None => {
                    return Ok(None);
                }
            }
        }
    }

    /// Close the connection.
    pub async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!("Websocket close: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_message_roundtrip() {
        let text = r#"{"topic":"realtime:public:messages:job_id=eq.42","event":"INSERT","payload":{"record":{"id":"m1"}},"ref":null}"#;
        let msg: ChannelMessage = serde_json::from_str(text).unwrap();
        assert_eq!(msg.topic, "realtime:public:messages:job_id=eq.42");
        assert_eq!(msg.event, "INSERT");
        assert_eq!(msg.payload["record"]["id"], "m1");
        assert!(msg.reference.is_none());
    }

    #[test]
    fn test_channel_message_missing_payload() {
        // Payload defaults to null rather than failing the whole frame.
        let text = r#"{"topic":"phoenix","event":"phx_reply","ref":"1"}"#;
        let msg: ChannelMessage = serde_json::from_str(text).unwrap();
        assert!(msg.payload.is_null());
        assert_eq!(msg.reference.as_deref(), Some("1"));
    }
}
