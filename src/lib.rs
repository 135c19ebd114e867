pub mod audio_player;
pub mod catalog;
pub mod config;
pub mod console_display;
pub mod coordinator;
pub mod dsp;
pub mod error;
pub mod event_log;
pub mod machine;
pub mod reel;
pub mod rhythm;
pub mod session_reader;
pub mod simulator;
pub mod theory;
pub mod timer;
pub mod types;
