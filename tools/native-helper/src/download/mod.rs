//! Audio extraction using yt-dlp

mod ytdlp;

pub use ytdlp::{find_ffmpeg_dir, find_ytdlp, YtDlp};
