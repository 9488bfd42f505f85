use crate::app::events::{Event, InputEvent};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

/// Forward one file path per line from `reader` until EOF.
pub fn spawn_input_task<R>(tx: mpsc::Sender<Event>, reader: R)
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = reader.lines();
        loop {
            let ev = match lines.next_line().await {
                Ok(Some(line)) => map_line(&line),
                Ok(None) => InputEvent::Closed,
                Err(e) => {
                    tracing::warn!("input closed: {e}");
                    InputEvent::Closed
                }
            };
            let closed = ev == InputEvent::Closed;
            if tx.send(Event::Input(ev)).await.is_err() || closed {
                break;
            }
        }
    });
}

/// A blank line unloads the current track.
pub fn map_line(line: &str) -> InputEvent {
    InputEvent::FileChanged(line.trim().to_string())
}
