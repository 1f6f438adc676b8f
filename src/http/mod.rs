//! HTTP adapters: the artifact repository client and the chat-facing server.

mod artifact;
pub mod server;
pub mod slack;

pub use artifact::HttpScriptSource;
pub use server::{AppState, MessageRequest, MessageResponse, router, serve};
pub use slack::{SlackAction, SlackClient, SlackEnvelope, SlackEvent, classify};
