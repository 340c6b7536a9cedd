use crate::traits::LineSource;
use crate::types::Result;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio_stream::wrappers::LinesStream;
use tracing::debug;

/// Raw lines read from any buffered async reader: stdin, a socket half
/// handed over by a connection layer, or a captured log file.
pub struct ReaderLineSource<R> {
    name: String,
    lines: LinesStream<R>,
}

impl<R> ReaderLineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            lines: LinesStream::new(reader.lines()),
        }
    }
}

impl ReaderLineSource<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new("stdin", BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R> LineSource for ReaderLineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn source_name(&self) -> String {
        self.name.clone()
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        match self.lines.next().await {
            Some(line) => Ok(Some(line?)),
            None => {
                debug!("Line source {} reached end of input", self.name);
                Ok(None)
            }
        }
    }
}
