//! Line sources for the REPL.

use async_trait::async_trait;
use std::io::{self, BufRead};
use tokio::io::{AsyncBufRead, Lines};
use tokio::sync::mpsc;

/// Somewhere the REPL reads user input from.
#[async_trait]
pub trait LineSource: Send {
    /// Next line without its terminator, or `None` at end of input.
    async fn next_line(&mut self) -> io::Result<Option<String>>;
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> LineSource for Lines<R> {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        Lines::next_line(self).await
    }
}

/// Lines delivered over a channel.
///
/// Dropping the receiver never waits on the producer, so a pending read
/// cannot hold the session open.
pub struct ChannelLines {
    rx: mpsc::Receiver<io::Result<String>>,
}

impl ChannelLines {
    pub fn new(rx: mpsc::Receiver<io::Result<String>>) -> Self {
        Self { rx }
    }

    /// Read the terminal on a detached thread.
    pub fn stdin() -> io::Result<Self> {
        let (tx, rx) = mpsc::channel(1);

        std::thread::Builder::new()
            .name("parley-stdin".to_string())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self::new(rx))
    }
}

#[async_trait]
impl LineSource for ChannelLines {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.rx.recv().await.transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncBufReadExt;

    #[tokio::test]
    async fn test_reader_lines() {
        let mut lines = AsyncBufReadExt::lines("hello\r\nquit\n".as_bytes());
        assert_eq!(LineSource::next_line(&mut lines).await.unwrap().as_deref(), Some("hello"));
        assert_eq!(LineSource::next_line(&mut lines).await.unwrap().as_deref(), Some("quit"));
        assert_eq!(LineSource::next_line(&mut lines).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_channel_lines_end_when_sender_drops() {
        let (tx, rx) = mpsc::channel(2);
        let mut lines = ChannelLines::new(rx);

        tx.send(Ok("hi".to_string())).await.unwrap();
        tx.send(Err(io::Error::new(io::ErrorKind::InvalidData, "not utf-8")))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("hi"));
        assert!(lines.next_line().await.is_err());
        assert_eq!(lines.next_line().await.unwrap(), None);
    }
}
