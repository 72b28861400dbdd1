//! yt-dlp driver: metadata lookups and best-audio MP3 extraction.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use serde::Serialize;
use tokio::process::Command as TokioCommand;
use tracing::{debug, info, warn};

use crate::error::ExtractError;
use crate::utils;

/// How much of yt-dlp's stderr is kept in a failure message.
const STDERR_TAIL_CHARS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VideoMeta {
    pub title: String,
    pub channel: String,
    pub description: String,
}

/// Subset of `--dump-json` the `/info` endpoint reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub author: Option<String>,
}

/// Find yt-dlp executable, checking common install locations
pub fn find_ytdlp() -> Option<PathBuf> {
    if let Ok(output) = std::process::Command::new("yt-dlp").arg("--version").output() {
        if output.status.success() {
            return Some(PathBuf::from("yt-dlp"));
        }
    }

    // pip --user installs on Windows land outside PATH
    #[cfg(windows)]
    {
        for var in ["APPDATA", "LOCALAPPDATA"] {
            let Ok(base) = std::env::var(var) else { continue };
            let python = if var == "APPDATA" {
                PathBuf::from(&base).join("Python")
            } else {
                PathBuf::from(&base).join("Programs").join("Python")
            };
            if let Ok(entries) = std::fs::read_dir(python) {
                for entry in entries.flatten() {
                    let scripts = entry.path().join("Scripts").join("yt-dlp.exe");
                    if scripts.exists() {
                        return Some(scripts);
                    }
                }
            }
        }
    }

    None
}

fn ffmpeg_exe_name() -> &'static str {
    if cfg!(windows) {
        "ffmpeg.exe"
    } else {
        "ffmpeg"
    }
}

/// First `bin` directory under `dir`, searching at most three levels down.
fn find_bin_dir(dir: &Path, depth: usize) -> Option<PathBuf> {
    if depth > 3 {
        return None;
    }
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    entries.sort();
    for path in entries {
        if path.file_name().is_some_and(|n| n == "bin") {
            return Some(path);
        }
        if let Some(found) = find_bin_dir(&path, depth + 1) {
            return Some(found);
        }
    }
    None
}

/// Directories that may hold a WinGet-installed ffmpeg, best first.
fn ffmpeg_candidates(home: &Path) -> Vec<PathBuf> {
    let winget = home
        .join("AppData")
        .join("Local")
        .join("Microsoft")
        .join("WinGet");
    let mut candidates = Vec::new();
    if let Ok(entries) = std::fs::read_dir(winget.join("Packages")) {
        let mut packages: Vec<PathBuf> = entries
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().to_lowercase().contains("ffmpeg"))
            .map(|e| e.path())
            .collect();
        packages.sort();
        candidates.extend(packages.iter().filter_map(|p| find_bin_dir(p, 0)));
    }
    candidates.push(winget.join("Links"));
    candidates
}

/// `None` when ffmpeg is already on PATH or nowhere to be found; otherwise
/// the directory to hand yt-dlp as `--ffmpeg-location`.
pub fn find_ffmpeg_dir() -> Option<PathBuf> {
    let on_path = std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success());
    if on_path {
        return None;
    }
    let home = dirs::home_dir()?;
    ffmpeg_candidates(&home)
        .into_iter()
        .find(|dir| dir.join(ffmpeg_exe_name()).exists())
}

fn meta_args(video_id: &str, with_description: bool) -> Vec<String> {
    let template = if with_description {
        "%(title)s\n%(channel)s\n%(description)s"
    } else {
        "%(title)s\n%(channel)s"
    };
    vec![
        "--print".into(),
        template.into(),
        "--no-playlist".into(),
        "--no-warnings".into(),
        "--skip-download".into(),
        utils::watch_url(video_id),
    ]
}

fn audio_args(video_id: &str, output_base: &Path, ffmpeg_dir: Option<&Path>) -> Vec<String> {
    let mut args: Vec<String> = [
        "-f",
        "bestaudio",
        "--extract-audio",
        "--audio-format",
        "mp3",
        "--audio-quality",
        "0",
        "--no-playlist",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    if let Some(dir) = ffmpeg_dir {
        args.push("--ffmpeg-location".into());
        args.push(dir.to_string_lossy().into_owned());
    }
    args.push("-o".into());
    args.push(format!("{}.%(ext)s", output_base.to_string_lossy()));
    args.push(utils::watch_url(video_id));
    args
}

/// Title on the first line, channel on the second, and (when asked for)
/// the multi-line description after that.
fn parse_meta(stdout: &str, with_description: bool) -> VideoMeta {
    let mut lines = stdout.trim().lines();
    let title = lines.next().unwrap_or("").to_string();
    let channel = lines.next().unwrap_or("").to_string();
    let description = if with_description {
        lines.collect::<Vec<_>>().join("\n")
    } else {
        String::new()
    };
    VideoMeta {
        title,
        channel,
        description,
    }
}

fn parse_info(stdout: &str) -> Result<VideoInfo, ExtractError> {
    let data: serde_json::Value = serde_json::from_str(stdout)?;
    let text = |name: &str| data.get(name).and_then(|v| v.as_str()).map(str::to_string);
    Ok(VideoInfo {
        title: text("title"),
        duration: data.get("duration").and_then(|v| v.as_f64()),
        author: text("uploader").or_else(|| text("channel")),
    })
}

fn stderr_tail(stderr: &str) -> String {
    let count = stderr.chars().count();
    stderr.chars().skip(count.saturating_sub(STDERR_TAIL_CHARS)).collect()
}

/// A located yt-dlp plus the ffmpeg directory it should use.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    ffmpeg_dir: Option<PathBuf>,
}

impl YtDlp {
    pub fn new(program: PathBuf, ffmpeg_dir: Option<PathBuf>) -> Self {
        Self {
            program,
            ffmpeg_dir,
        }
    }

    /// Use whatever yt-dlp the system has, falling back to a bare
    /// `yt-dlp` so a later install is picked up without a restart.
    pub fn discover(ffmpeg_dir: Option<PathBuf>) -> Self {
        let program = find_ytdlp().unwrap_or_else(|| PathBuf::from("yt-dlp"));
        Self::new(program, ffmpeg_dir)
    }

    pub fn ffmpeg_dir(&self) -> Option<&Path> {
        self.ffmpeg_dir.as_deref()
    }

    async fn run(&self, args: &[String]) -> Result<Output, ExtractError> {
        debug!(program = %self.program.display(), ?args, "spawning yt-dlp");
        TokioCommand::new(&self.program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ExtractError::YtDlpNotFound,
                _ => ExtractError::Io(e),
            })
    }

    /// Title and channel for the file name. Never fails: a lookup error
    /// yields the title `audio` and no channel.
    pub async fn title_and_channel(&self, video_id: &str) -> VideoMeta {
        let mut meta = match self.run(&meta_args(video_id, false)).await {
            Ok(output) => parse_meta(&String::from_utf8_lossy(&output.stdout), false),
            Err(e) => {
                warn!(video_id, error = %e, "title lookup failed");
                VideoMeta::default()
            }
        };
        if meta.title.is_empty() {
            meta.title = "audio".to_string();
        }
        meta
    }

    /// Title, channel and description; empty fields when the lookup fails.
    pub async fn full_meta(&self, video_id: &str) -> VideoMeta {
        match self.run(&meta_args(video_id, true)).await {
            Ok(output) => parse_meta(&String::from_utf8_lossy(&output.stdout), true),
            Err(e) => {
                warn!(video_id, error = %e, "metadata lookup failed");
                VideoMeta::default()
            }
        }
    }

    pub async fn info(&self, video_id: &str) -> Result<VideoInfo, ExtractError> {
        let args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            utils::watch_url(video_id),
        ];
        let output = self.run(&args).await?;
        if !output.status.success() {
            return Err(ExtractError::YtDlpFailed {
                code: exit_code(&output),
                stderr_tail: stderr_tail(&String::from_utf8_lossy(&output.stderr)),
            });
        }
        parse_info(&String::from_utf8_lossy(&output.stdout))
    }

    /// Extract best audio as `<work_dir>/<video_id>.mp3`.
    ///
    /// yt-dlp can exit non-zero over warnings and still write the file, so
    /// success is judged by the MP3 existing afterwards.
    pub async fn extract_mp3(&self, video_id: &str, work_dir: &Path) -> Result<PathBuf, ExtractError> {
        tokio::fs::create_dir_all(work_dir).await?;
        let base = work_dir.join(video_id);
        let mp3 = work_dir.join(format!("{video_id}.mp3"));
        let _ = tokio::fs::remove_file(&mp3).await;

        info!(video_id, "extracting audio");
        let output = self
            .run(&audio_args(video_id, &base, self.ffmpeg_dir()))
            .await?;

        if tokio::fs::try_exists(&mp3).await.unwrap_or(false) {
            if !output.status.success() {
                debug!(video_id, code = %exit_code(&output), "yt-dlp exited non-zero but wrote the file");
            }
            return Ok(mp3);
        }
        Err(ExtractError::YtDlpFailed {
            code: exit_code(&output),
            stderr_tail: stderr_tail(&String::from_utf8_lossy(&output.stderr)),
        })
    }
}

fn exit_code(output: &Output) -> String {
    output
        .status
        .code()
        .map_or_else(|| "signal".to_string(), |c| c.to_string())
}
