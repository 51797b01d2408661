// Handshake: wire records, state machine, transcript and the two role drivers.

pub mod messages;
pub mod protocol;
pub mod state;
pub mod transcript;
