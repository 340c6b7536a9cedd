use crate::traits::LineSource;
use crate::types::Result;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Lines pushed in from another task, e.g. a connection handler that owns
/// the socket. The source ends once every sender is dropped.
pub struct ChannelLineSource {
    name: String,
    lines: UnboundedReceiverStream<String>,
}

impl ChannelLineSource {
    pub fn new(name: impl Into<String>) -> (Self, mpsc::UnboundedSender<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let source = Self {
            name: name.into(),
            lines: UnboundedReceiverStream::new(receiver),
        };
        (source, sender)
    }
}

#[async_trait]
impl LineSource for ChannelLineSource {
    fn source_name(&self) -> String {
        self.name.clone()
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.lines.next().await)
    }
}
