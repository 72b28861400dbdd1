//! Locates the active media element and remembers it while it stays attached.

use tracing::debug;

use crate::host::{HostPage, MediaHandle};

#[derive(Debug, Default)]
pub struct MediaResolver {
    cached: Option<MediaHandle>,
}

impl MediaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached handle if still attached, otherwise a fresh query.
    ///
    /// `None` is a normal outcome (e.g. mid-navigation) and simply means
    /// "try again on the next scheduled check".
    pub fn resolve(&mut self, host: &mut dyn HostPage) -> Option<MediaHandle> {
        if let Some(media) = self.cached {
            if host.is_connected(media) {
                return Some(media);
            }
            debug!(media = media.0, "cached media handle is stale");
            self.cached = None;
        }
        self.cached = host.query_media();
        if let Some(media) = self.cached {
            debug!(media = media.0, "resolved media element");
        }
        self.cached
    }

    /// Forget the cached handle; the next `resolve` queries the page.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn cached(&self) -> Option<MediaHandle> {
        self.cached
    }
}
