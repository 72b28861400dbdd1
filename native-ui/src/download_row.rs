//! The "Download MP3" row injected above the loop panel.
//!
//! Talks to the local extraction helper on a worker thread; results come
//! back over a channel and are drained once per frame.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use base64::Engine as _;
use crossbeam::channel::{unbounded, Receiver, Sender};
use eframe::egui;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);
const META_TIMEOUT: Duration = Duration::from_secs(10);
const FALLBACK_FILENAME: &str = "audio.mp3";

#[derive(Clone, Debug, PartialEq)]
pub enum ServerStatus {
    Checking,
    Online,
    Offline,
}

#[derive(Debug)]
enum RowMessage {
    Health(bool),
    Tagged { key: String, bpm: String },
    Saved(PathBuf),
    Failed(String),
}

pub struct DownloadRow {
    helper_url: String,
    video_id: Option<String>,
    server: ServerStatus,
    status_text: String,
    key_bpm: String,
    busy: bool,
    tx: Sender<RowMessage>,
    rx: Receiver<RowMessage>,
}

impl DownloadRow {
    pub fn new(helper_url: &str) -> Self {
        let (tx, rx) = unbounded();
        Self {
            helper_url: helper_url.trim_end_matches('/').to_string(),
            video_id: None,
            server: ServerStatus::Checking,
            status_text: String::new(),
            key_bpm: String::new(),
            busy: false,
            tx,
            rx,
        }
    }

    /// Rebuild the row for `video_id`: reset the status and re-probe the
    /// helper. Key/tempo tags are kept for the same video.
    pub fn attach(&mut self, video_id: &str) {
        if self.video_id.as_deref() != Some(video_id) {
            self.key_bpm.clear();
        }
        self.video_id = Some(video_id.to_string());
        self.status_text.clear();
        self.server = ServerStatus::Checking;
        self.probe();
    }

    fn probe(&self) {
        let tx = self.tx.clone();
        let url = format!("{}/health", self.helper_url);
        thread::spawn(move || {
            let online = check_health(&url);
            let _ = tx.send(RowMessage::Health(online));
        });
    }

    fn start_download(&mut self) {
        let Some(video_id) = self.video_id.clone() else {
            self.status_text = "No video ID found.".to_string();
            return;
        };
        self.busy = true;
        self.status_text = "Downloading... (this may take a moment)".to_string();

        let tx = self.tx.clone();
        let base = self.helper_url.clone();
        thread::spawn(move || {
            if !check_health(&format!("{base}/health")) {
                let _ = tx.send(RowMessage::Health(false));
                let _ = tx.send(RowMessage::Failed("Server offline".to_string()));
                return;
            }
            let _ = tx.send(RowMessage::Health(true));

            let (key, bpm) = fetch_tags(&base, &video_id).unwrap_or_default();
            let _ = tx.send(RowMessage::Tagged {
                key: key.clone(),
                bpm: bpm.clone(),
            });

            let target_dir = dirs::download_dir()
                .or_else(|| std::env::current_dir().ok())
                .unwrap_or_else(|| PathBuf::from("."));
            let msg = match download_mp3(&base, &video_id, &key, &bpm, &target_dir) {
                Ok(path) => RowMessage::Saved(path),
                Err(e) => {
                    tracing::warn!(video_id = %video_id, "download failed: {e:#}");
                    RowMessage::Failed(format!("{e:#}"))
                }
            };
            let _ = tx.send(msg);
        });
    }

    /// Drain worker results. Call once per frame.
    pub fn poll(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                RowMessage::Health(online) => {
                    self.server = if online {
                        ServerStatus::Online
                    } else {
                        ServerStatus::Offline
                    };
                }
                RowMessage::Tagged { key, bpm } => {
                    let bpm = if bpm.is_empty() { bpm } else { format!("{bpm} BPM") };
                    self.key_bpm = [key, bpm]
                        .into_iter()
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                        .join("  |  ");
                }
                RowMessage::Saved(path) => {
                    self.busy = false;
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                    self.status_text = format!("Saved to Downloads: {name}");
                    tracing::info!(path = %path.display(), "mp3 saved");
                }
                RowMessage::Failed(err) => {
                    self.busy = false;
                    self.status_text = format!("Error: {err}");
                }
            }
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.horizontal(|ui| {
                let button = ui.add_enabled(!self.busy, egui::Button::new("\u{2B07} Download MP3"));
                if button.clicked() {
                    self.start_download();
                }
                if self.busy {
                    ui.spinner();
                }
                ui.label(&self.status_text);

                if !self.key_bpm.is_empty() {
                    ui.separator();
                    ui.label(egui::RichText::new(&self.key_bpm).strong());
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let (color, text) = match self.server {
                        ServerStatus::Checking => (egui::Color32::GRAY, "Checking server..."),
                        ServerStatus::Online => (egui::Color32::from_rgb(60, 200, 90), "Local server"),
                        ServerStatus::Offline => (egui::Color32::from_rgb(230, 80, 60), "Server offline"),
                    };
                    ui.label(text);
                    ui.label(egui::RichText::new("\u{25CF}").color(color));
                });
            });
        });
    }
}

fn agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

fn check_health(url: &str) -> bool {
    match agent(HEALTH_TIMEOUT).get(url).call() {
        Ok(resp) => resp.status() == 200,
        Err(_) => false,
    }
}

fn fetch_tags(base: &str, video_id: &str) -> Result<(String, String)> {
    let body = agent(META_TIMEOUT)
        .get(&format!("{base}/meta"))
        .query("v", video_id)
        .call()?
        .into_string()?;
    let meta: serde_json::Value = serde_json::from_str(&body)?;
    let field = |name: &str| meta[name].as_str().unwrap_or("").to_string();
    Ok((field("key"), field("bpm")))
}

/// Name from the helper's base64 `X-Filename` header, reduced to a bare
/// file name.
pub fn decode_filename(header: Option<&str>) -> String {
    header
        .and_then(|h| base64::engine::general_purpose::STANDARD.decode(h.trim()).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|name| {
            Path::new(&name)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

fn download_mp3(base: &str, video_id: &str, key: &str, bpm: &str, dir: &Path) -> Result<PathBuf> {
    let mut request = ureq::get(&format!("{base}/download")).query("v", video_id);
    if !key.is_empty() {
        request = request.query("key", key);
    }
    if !bpm.is_empty() {
        request = request.query("bpm", bpm);
    }

    let resp = match request.call() {
        Ok(resp) => resp,
        Err(ureq::Error::Status(code, resp)) => {
            let body = resp.into_string().unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"].as_str().map(str::to_string))
                .unwrap_or_else(|| format!("Download failed ({code})"));
            return Err(anyhow!(message));
        }
        Err(e) => return Err(e.into()),
    };

    let filename = decode_filename(resp.header("X-Filename"));
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(filename);

    let mut bytes = Vec::new();
    resp.into_reader()
        .read_to_end(&mut bytes)
        .context("read mp3 body")?;
    std::fs::write(&path, &bytes).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_header_is_decoded() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("Beat - A Minor 140BPM - Prod.mp3");
        assert_eq!(decode_filename(Some(&encoded)), "Beat - A Minor 140BPM - Prod.mp3");
    }

    #[test]
    fn bad_or_missing_header_falls_back() {
        assert_eq!(decode_filename(None), "audio.mp3");
        assert_eq!(decode_filename(Some("%%%")), "audio.mp3");
    }

    #[test]
    fn path_components_are_stripped() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("../../etc/evil.mp3");
        assert_eq!(decode_filename(Some(&encoded)), "evil.mp3");
    }

    #[test]
    fn tags_are_shown_joined() {
        let mut row = DownloadRow::new("http://127.0.0.1:9/");
        row.tx
            .send(RowMessage::Tagged {
                key: "A Minor".into(),
                bpm: "140".into(),
            })
            .unwrap();
        row.tx.send(RowMessage::Failed("boom".into())).unwrap();
        row.poll();
        assert_eq!(row.key_bpm, "A Minor  |  140 BPM");
        assert_eq!(row.status_text, "Error: boom");
        assert_eq!(row.helper_url, "http://127.0.0.1:9");
    }
}
