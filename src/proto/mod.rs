pub mod messages;

pub use messages::{ClientCommand, ServerEvent, TranscriptionStatus};
