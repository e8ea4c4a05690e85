//! AI booking assistant: intent detection, the tool-calling loop, SSE event
//! framing and speech output buffering.

pub mod events;
pub mod intent;
pub mod runtime;
pub mod tts;

pub use events::AgentEvent;
pub use intent::{classify_intent, Intent};
pub use runtime::{AgentRuntime, TurnRegistry};
pub use tts::{chunk_text, TtsBuffer};
