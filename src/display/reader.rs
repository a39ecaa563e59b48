use std::fmt;
use std::future::Future;

use axum::extract::ws::Message;
use futures::{Stream, StreamExt};
use tracing::trace;
use uuid::Uuid;

use crate::error::Termination;

/// Drain inbound frames until the client goes away or `shutdown` resolves.
///
/// Frame content is discarded; there is no inbound command protocol. A clean
/// end-of-stream or close frame yields [`Termination::ClientClosed`], any read
/// error yields [`Termination::ReadFailed`]. If `shutdown` finishes first its
/// value is returned as-is.
pub async fn run<R, E, F>(session_id: Uuid, mut stream: R, shutdown: F) -> Termination
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
    F: Future<Output = Termination>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                None | Some(Ok(Message::Close(_))) => return Termination::ClientClosed,
                Some(Ok(_)) => trace!(%session_id, "ignoring inbound frame"),
                Some(Err(e)) => return Termination::ReadFailed(e.to_string()),
            },
            termination = &mut shutdown => return termination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use std::future::pending;

    type Inbound = Result<Message, axum::Error>;

    #[tokio::test]
    async fn end_of_stream_is_a_clean_close() {
        let (tx, rx) = mpsc::unbounded::<Inbound>();
        tx.unbounded_send(Ok(Message::Text("ping".into()))).unwrap();
        drop(tx);

        let termination = run(Uuid::new_v4(), rx, pending::<Termination>()).await;
        assert_eq!(termination, Termination::ClientClosed);
    }

    #[tokio::test]
    async fn close_frame_is_a_clean_close() {
        let (tx, rx) = mpsc::unbounded::<Inbound>();
        tx.unbounded_send(Ok(Message::Close(None))).unwrap();

        let termination = run(Uuid::new_v4(), rx, pending::<Termination>()).await;
        assert_eq!(termination, Termination::ClientClosed);
    }

    #[tokio::test]
    async fn read_error_is_reported() {
        let (tx, rx) = mpsc::unbounded::<Inbound>();
        tx.unbounded_send(Ok(Message::Binary(vec![1, 2, 3].into())))
            .unwrap();
        tx.unbounded_send(Err(axum::Error::new(std::io::Error::other(
            "connection reset",
        ))))
        .unwrap();

        match run(Uuid::new_v4(), rx, pending::<Termination>()).await {
            Termination::ReadFailed(reason) => assert!(reason.contains("connection reset")),
            other => panic!("unexpected termination: {other:?}"),
        }
    }

    #[tokio::test]
    async fn shutdown_signal_ends_the_loop() {
        let (_tx, rx) = mpsc::unbounded::<Inbound>();
        let termination = run(Uuid::new_v4(), rx, async {
            Termination::WriteFailed("gone".into())
        })
        .await;
        assert_eq!(termination, Termination::WriteFailed("gone".into()));
    }
}
