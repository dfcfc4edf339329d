pub mod app_state;
pub mod config;
pub mod server;
pub mod tracing;
pub mod transcript_source;
pub mod video_id;
pub mod ytdlp;
