pub mod reassembler;
pub mod record;
pub mod turn;
pub mod validate;

pub use reassembler::{LineReassembler, DATA_MARKER};
pub use record::StreamRecord;
pub use turn::{TurnOutcome, TurnProcessor, TurnState, FAILURE_MESSAGE};
pub use validate::is_complete_json_object;
