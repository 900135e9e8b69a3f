//! Audio preview: one worker, one device, one file at a time.

pub mod player;

pub use player::{Player, PlayerError, PlayerNotice, OUTPUT_CHANNELS, OUTPUT_SAMPLE_RATE};
