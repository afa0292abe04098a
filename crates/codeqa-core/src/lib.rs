//! Configuration, secret resolution, I/O channels and the interactive
//! question loop for codeqa.

pub mod channel;
pub mod cli;
pub mod config;
pub mod session;
pub mod vault;

pub use channel::{Channel, ChannelError, ChannelMessage};
pub use cli::CliChannel;
pub use config::Config;
pub use session::{Session, SessionError};
