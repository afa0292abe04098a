//! Interactive question loop.

use codeqa_index::{IndexError, QueryEngine};
use codeqa_llm::LlmProvider;

use crate::channel::{Channel, ChannelError};

pub const BANNER: &str = "Ask any question about your codebase (type 'exit' to quit):";
pub const GOODBYE: &str = "Goodbye!";
pub const EMPTY_QUESTION_HINT: &str = "Please enter a valid question.";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("query failed: {0}")]
    Query(#[from] IndexError),
}

#[must_use]
pub fn format_answer(answer: &str) -> String {
    format!("Answer:\n{answer}")
}

fn is_exit_word(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

/// Reads questions from a channel and answers each one until the user
/// exits or input ends.
pub struct Session<'a, Ch, E: LlmProvider, C: LlmProvider> {
    channel: Ch,
    engine: &'a QueryEngine<E, C>,
}

impl<'a, Ch, E, C> Session<'a, Ch, E, C>
where
    Ch: Channel,
    E: LlmProvider,
    C: LlmProvider,
{
    #[must_use]
    pub fn new(channel: Ch, engine: &'a QueryEngine<E, C>) -> Self {
        Self { channel, engine }
    }

    pub fn into_channel(self) -> Ch {
        self.channel
    }

    /// Run the loop. Returns the number of questions answered.
    ///
    /// # Errors
    ///
    /// Channel failures and gateway or store errors end the session.
    pub async fn run(&mut self) -> Result<usize, SessionError> {
        let mut answered = 0;
        self.channel.send(BANNER).await?;
        while let Some(message) = self.channel.recv().await? {
            let question = message.text.trim();
            if is_exit_word(question) {
                self.channel.send(GOODBYE).await?;
                break;
            }
            if question.is_empty() {
                self.channel.send(EMPTY_QUESTION_HINT).await?;
                continue;
            }

            tracing::info!(question, "answering");
            let answer = self.engine.ask(question).await?;
            self.channel.send(&format_answer(&answer)).await?;
            answered += 1;
        }
        tracing::debug!(answered, "session ended");
        Ok(answered)
    }
}
