//! Page address parsing.

use url::Url;

/// The parts of the page address the controller cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    path: String,
    video_id: Option<String>,
}

impl PageLocation {
    /// Parse an absolute address. Anything unparsable is treated as a
    /// non-video page.
    pub fn parse(href: &str) -> Self {
        match Url::parse(href) {
            Ok(url) => {
                let video_id = url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned())
                    .filter(|v| !v.is_empty());
                Self {
                    path: url.path().to_string(),
                    video_id,
                }
            }
            Err(_) => Self {
                path: String::new(),
                video_id: None,
            },
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// A watch page showing a specific video.
    pub fn is_video_page(&self) -> bool {
        self.path == "/watch" && self.video_id.is_some()
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }
}
