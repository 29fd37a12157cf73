// Public modules
pub mod backend;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod dispatcher;
pub mod error;
pub mod observability;
pub mod render;
pub mod types;

// Re-exports
pub use backend::Backend;
pub use chat::{ChatSession, SharedSession};
pub use client::{API_URL_ENV, DEFAULT_API_URL, Endpoint, MedicareClient};
pub use client_logger::ClientLogger;
pub use dispatcher::{
    ConversationState, DisclaimerPolicy, DispatchConfig, DispatchObserver, DispatchOutcome,
    Dispatcher, MAX_INPUT_CHARS, MAX_RETRIES, sanitize_input, terminal_text,
};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use types::*;
