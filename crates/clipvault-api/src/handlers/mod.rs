pub mod health;
pub mod thumbnail;
pub mod video_upload;
