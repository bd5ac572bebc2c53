pub mod coordinator;
pub mod sequencer;
