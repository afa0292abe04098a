use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

use crate::channel::{Channel, ChannelError, ChannelMessage};

pub const PROMPT: &str = "Your question: ";

/// Line-oriented channel over any async reader and writer.
///
/// Lines are returned as typed, without trimming; the session decides what
/// blank input and exit words mean.
#[derive(Debug)]
pub struct LineChannel<R, W> {
    reader: R,
    writer: W,
    prompt: String,
}

/// Channel bound to the process stdin and stdout.
pub type CliChannel = LineChannel<BufReader<Stdin>, Stdout>;

impl CliChannel {
    #[must_use]
    pub fn new() -> Self {
        LineChannel::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> LineChannel<R, W> {
    #[must_use]
    pub fn with_io(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            prompt: PROMPT.to_owned(),
        }
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<R, W> Channel for LineChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Option<ChannelMessage>, ChannelError> {
        self.writer.write_all(self.prompt.as_bytes()).await?;
        self.writer.flush().await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let text = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(&line)
            .to_owned();
        Ok(Some(ChannelMessage { text }))
    }

    async fn send(&mut self, text: &str) -> Result<(), ChannelError> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(input: &str) -> LineChannel<&[u8], Vec<u8>> {
        LineChannel::with_io(input.as_bytes(), Vec::new())
    }

    #[tokio::test]
    async fn reads_lines_until_eof() {
        let mut ch = channel("first\r\n  second  \n");
        assert_eq!(ch.recv().await.unwrap().unwrap().text, "first");
        assert_eq!(ch.recv().await.unwrap().unwrap().text, "  second  ");
        assert!(ch.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn last_line_without_newline() {
        let mut ch = channel("tail");
        assert_eq!(ch.recv().await.unwrap().unwrap().text, "tail");
        assert!(ch.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blank_line_is_a_message() {
        let mut ch = channel("\n");
        assert_eq!(ch.recv().await.unwrap().unwrap().text, "");
    }

    #[tokio::test]
    async fn prompts_before_each_read_and_sends_lines() {
        let mut ch = channel("q\n");
        ch.recv().await.unwrap();
        ch.send("Answer:\nok").await.unwrap();
        ch.recv().await.unwrap();
        let out = String::from_utf8(ch.into_writer()).unwrap();
        assert_eq!(out, "Your question: Answer:\nok\nYour question: ");
    }

    #[tokio::test]
    async fn custom_prompt() {
        let mut ch = channel("").with_prompt("> ");
        assert!(ch.recv().await.unwrap().is_none());
        assert_eq!(ch.into_writer(), b"> ");
    }
}
