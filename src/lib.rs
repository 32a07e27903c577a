// Gesture Composer - Beat-aligned robot gesture sequencer
// Module declarations

pub mod analysis;
pub mod arranger;
pub mod audio;
pub mod cli;
pub mod commands;
pub mod gestures;
pub mod groove;
pub mod state;

pub use cli::run;
