pub mod auth;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod gemini;
pub mod render;
pub mod tools;
pub mod web_server;

pub use config::ServerConfig;
pub use controller::{CompletionTransport, FormController, SubmitError, SubmitOutcome};
pub use conversation::{Conversation, Role, Turn, TurnId};
pub use error::GatewayError;
pub use gemini::{CompletionError, CompletionModel, GeminiClient};
pub use web_server::{build_router, start_web_server, AppState};
