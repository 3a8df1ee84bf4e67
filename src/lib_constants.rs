// Depth of each of the worker's command queues. Callers block on send once
// it fills up, which only adds backpressure ahead of the single executor.
pub const COMMAND_QUEUE_DEPTH: usize = 32;

// Bound on fresh-id attempts when creating a note.
pub const CREATE_ID_ATTEMPTS: u32 = 10;
