// Public modules
pub mod analyze;
pub mod backend_reply;
pub mod chat_combined;
pub mod chat_message;
pub mod symptom_result;

// Re-exports
pub use analyze::{AnalyzeRequest, AnalyzeResponse};
pub use backend_reply::BackendReply;
pub use chat_combined::{ChatRequest, ChatResponse};
pub use chat_message::{ChatMessage, MessageOrigin, MessageOriginParseError};
pub use symptom_result::{DEFAULT_ADVICE, NO_MEDICATION, SymptomResult, UNKNOWN_CONDITION};
