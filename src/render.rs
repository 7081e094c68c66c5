pub mod backend;
pub mod ffmpeg;
pub mod session;
