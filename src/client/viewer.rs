use anyhow::{anyhow, Result};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::arena::ArenaStatus;
use crate::display::DisplayMessage;

/// A display client connected to the feed
pub struct Viewer {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

/// Connect to a display feed, e.g. `ws://localhost:8080/displays/fta/websocket`.
pub async fn connect(url: &str) -> Result<Viewer> {
    let url = Url::parse(url).map_err(|e| anyhow!("invalid ws url: {e}"))?;
    let (stream, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
    Ok(Viewer { stream })
}

impl Viewer {
    /// Next display message. `None` once the server closes the connection.
    pub async fn next_message(&mut self) -> Option<Result<DisplayMessage>> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    return Some(DisplayMessage::from_json(text.as_str()).map_err(Into::into))
                }
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }

    /// Send an arbitrary text frame. The server ignores its content.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream
            .send(Message::Text(text.to_string().into()))
            .await?;
        Ok(())
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// What a display shows, rebuilt from the messages it has received
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewerState {
    pub status: Option<ArenaStatus>,
    pub reloads: u64,
}

impl ViewerState {
    /// Fold one message in. A status replaces the previous one outright.
    pub fn apply(&mut self, message: &DisplayMessage) {
        match message {
            DisplayMessage::Status(status) => self.status = Some(status.clone()),
            DisplayMessage::Reload => self.reloads += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{AllianceStation, MatchState};

    #[test]
    fn repeated_status_is_idempotent() {
        let mut status = ArenaStatus::default();
        status.match_state = MatchState::AutoPeriod;
        let message = DisplayMessage::Status(status);

        let mut once = ViewerState::default();
        once.apply(&message);
        let mut twice = ViewerState::default();
        twice.apply(&message);
        twice.apply(&message);

        assert_eq!(once, twice);
    }

    #[test]
    fn later_status_supersedes_earlier() {
        let older = ArenaStatus::default();
        let mut newer = older.clone();
        newer.station_mut(AllianceStation::B3).estop = true;

        let mut state = ViewerState::default();
        state.apply(&DisplayMessage::Status(older));
        state.apply(&DisplayMessage::Status(newer.clone()));

        assert_eq!(state.status, Some(newer));
    }

    #[test]
    fn reloads_are_counted() {
        let mut state = ViewerState::default();
        state.apply(&DisplayMessage::Reload);
        state.apply(&DisplayMessage::Reload);
        assert_eq!(state.reloads, 2);
        assert!(state.status.is_none());
    }

    #[tokio::test]
    async fn connect_rejects_bad_url() {
        assert!(connect("not a url").await.is_err());
    }
}
