mod message;
mod session;
mod trace;

pub use message::{Message, Role};
pub use session::Session;
pub use trace::{visible_traces, TraceEvent, TraceKind, TRACE_PREVIEW_CHARS};
