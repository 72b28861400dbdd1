//! HTTP server: health, MP3 download, metadata and info endpoints.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::Filter;

use crate::download::YtDlp;
use crate::error::ExtractError;
use crate::tags::Tags;
use crate::utils;

/// Server configuration
pub struct ServerConfig {
    pub port: u16,
    pub work_dir: PathBuf,
    pub ffmpeg_dir: Option<PathBuf>,
}

/// Shared by every request.
pub struct AppState {
    pub ytdlp: YtDlp,
    pub work_dir: PathBuf,
}

type Params = HashMap<String, String>;

/// Run the HTTP server until the process exits.
pub async fn run(config: ServerConfig) -> Result<()> {
    let state = Arc::new(AppState {
        ytdlp: YtDlp::discover(config.ffmpeg_dir),
        work_dir: config.work_dir,
    });
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let (bound, server) = warp::serve(routes(state))
        .try_bind_ephemeral(addr)
        .with_context(|| format!("binding {addr}"))?;
    info!("HTTP server listening on http://{}", bound);
    server.await;
    Ok(())
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "OPTIONS"])
        .allow_headers(vec!["Content-Type"])
        .expose_headers(vec!["X-Filename", "Content-Disposition"]);

    let with_state = warp::any().map(move || state.clone());

    let health = warp::path!("health").and(warp::get()).map(|| {
        warp::reply::json(&json!({ "status": "ok", "service": "yt-rapper-toolkit" }))
    });

    let download = warp::path!("download")
        .and(warp::get())
        .and(warp::query::<Params>())
        .and(with_state.clone())
        .and_then(handle_download);

    let meta = warp::path!("meta")
        .and(warp::get())
        .and(warp::query::<Params>())
        .and(with_state.clone())
        .and_then(handle_meta);

    let info = warp::path!("info")
        .and(warp::get())
        .and(warp::query::<Params>())
        .and(with_state)
        .and_then(handle_info);

    let not_found = warp::any().map(|| {
        warp::reply::with_status(
            warp::reply::json(&json!({ "error": "Not found" })),
            StatusCode::NOT_FOUND,
        )
    });

    health
        .or(download)
        .or(meta)
        .or(info)
        .or(not_found)
        .with(cors)
}

fn error_reply(err: &ExtractError) -> Response {
    warp::reply::with_status(
        warp::reply::json(&json!({ "error": err.to_string() })),
        err.status(),
    )
    .into_response()
}

fn valid_id(params: &Params) -> Option<&str> {
    params
        .get("v")
        .map(String::as_str)
        .filter(|id| utils::is_valid_video_id(id))
}

async fn handle_download(params: Params, state: Arc<AppState>) -> Result<Response, Infallible> {
    let Some(video_id) = valid_id(&params) else {
        return Ok(error_reply(&ExtractError::InvalidVideoId));
    };

    let meta = state.ytdlp.title_and_channel(video_id).await;
    let tag = |name: &str| params.get(name).map(String::as_str).unwrap_or("");
    let filename = utils::build_filename(&meta.title, tag("key"), tag("bpm"), &meta.channel);

    let mp3 = match state.ytdlp.extract_mp3(video_id, &state.work_dir).await {
        Ok(path) => path,
        Err(e) => {
            warn!(video_id, "Download error: {}", e);
            return Ok(error_reply(&e));
        }
    };

    let bytes = tokio::fs::read(&mp3).await;
    if let Err(e) = tokio::fs::remove_file(&mp3).await {
        warn!(path = %mp3.display(), "could not remove temp file: {}", e);
    }
    let bytes = match bytes {
        Ok(bytes) => bytes,
        Err(e) => return Ok(error_reply(&ExtractError::Io(e))),
    };

    info!(video_id, filename = %filename, size = bytes.len(), "serving mp3");
    let reply = warp::reply::with_header(bytes, "Content-Type", "audio/mpeg");
    let reply = warp::reply::with_header(
        reply,
        "Content-Disposition",
        utils::content_disposition(&filename),
    );
    let reply = warp::reply::with_header(reply, "X-Filename", utils::x_filename(&filename));
    Ok(reply.into_response())
}

async fn handle_meta(params: Params, state: Arc<AppState>) -> Result<Response, Infallible> {
    let Some(video_id) = valid_id(&params) else {
        return Ok(error_reply(&ExtractError::InvalidVideoId));
    };
    let meta = state.ytdlp.full_meta(video_id).await;
    let tags = Tags::detect(&format!("{}\n{}", meta.title, meta.description));
    Ok(warp::reply::json(&json!({
        "title": meta.title,
        "channel": meta.channel,
        "description": meta.description,
        "key": tags.key,
        "bpm": tags.bpm,
    }))
    .into_response())
}

async fn handle_info(params: Params, state: Arc<AppState>) -> Result<Response, Infallible> {
    let Some(video_id) = params.get("v").filter(|v| !v.is_empty()) else {
        return Ok(error_reply(&ExtractError::MissingVideoId));
    };
    match state.ytdlp.info(video_id).await {
        Ok(info) => Ok(warp::reply::json(&info).into_response()),
        Err(e) => {
            warn!(video_id = %video_id, "Info error: {}", e);
            Ok(error_reply(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_routes() -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
        // Never spawned by these tests: every request fails validation first.
        let state = Arc::new(AppState {
            ytdlp: YtDlp::new(PathBuf::from("yt-dlp-not-installed"), None),
            work_dir: std::env::temp_dir(),
        });
        routes(state)
    }

    fn body_json(body: &[u8]) -> serde_json::Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn health_reports_service() {
        let resp = warp::test::request()
            .path("/health")
            .reply(&test_routes())
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp.body()),
            json!({ "status": "ok", "service": "yt-rapper-toolkit" })
        );
    }

    #[tokio::test]
    async fn unknown_path_is_json_404() {
        let resp = warp::test::request()
            .path("/nope")
            .reply(&test_routes())
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp.body()), json!({ "error": "Not found" }));
    }

    #[tokio::test]
    async fn download_and_meta_validate_video_id() {
        for path in ["/download", "/download?v=short", "/meta?v=bad%20id%20here"] {
            let resp = warp::test::request().path(path).reply(&test_routes()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{path}");
            assert_eq!(
                body_json(resp.body()),
                json!({ "error": "Invalid or missing video ID" })
            );
        }
    }

    #[tokio::test]
    async fn info_requires_an_id() {
        let resp = warp::test::request()
            .path("/info")
            .reply(&test_routes())
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp.body()), json!({ "error": "Missing ?v= video ID" }));
    }

    #[tokio::test]
    async fn info_without_ytdlp_is_server_error() {
        let resp = warp::test::request()
            .path("/info?v=dQw4w9WgXcQ")
            .reply(&test_routes())
            .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(resp.body())["error"].is_string());
    }

    #[tokio::test]
    async fn cross_origin_requests_see_filename_headers() {
        let resp = warp::test::request()
            .path("/health")
            .header("origin", "https://www.youtube.com")
            .reply(&test_routes())
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("access-control-allow-origin"));
        let exposed = resp
            .headers()
            .get("access-control-expose-headers")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        assert!(exposed.contains("x-filename"));
        assert!(exposed.contains("content-disposition"));
    }
}
