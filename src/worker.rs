mod errors;
mod internal;

pub use errors::NoteError;
pub use internal::{NoteWorker, ReadCommand, WriteCommand};
