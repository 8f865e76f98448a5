//! Local preview server for the docs directory
//!
//! Static files only: `/` maps to `index.html`, directories to their
//! `index.html`, and any path containing `..` is refused.

use axum::{
  extract::State,
  http::{header, StatusCode, Uri},
  response::{IntoResponse, Response},
  Router,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Paths;
use crate::error::AppResult;

const INDEX_FILE: &str = "index.html";

pub async fn serve(paths: &Paths, port: u16) -> AppResult<()> {
  let app = router(paths.docs_dir.clone());

  let addr = SocketAddr::from(([127, 0, 0, 1], port));
  let listener = tokio::net::TcpListener::bind(addr).await?;
  log::info!("Serving {} on {}", paths.docs_dir.display(), addr);
  println!("Serving at http://localhost:{}", port);

  axum::serve(listener, app).await?;
  Ok(())
}

fn router(root: PathBuf) -> Router {
  Router::new().fallback(serve_static).with_state(Arc::new(root))
}

async fn serve_static(State(root): State<Arc<PathBuf>>, uri: Uri) -> Response {
  let Some(relative) = resolve_path(uri.path()) else {
    log::debug!("Refusing {}", uri.path());
    return StatusCode::NOT_FOUND.into_response();
  };

  let mut path = root.join(relative);
  if tokio::fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false) {
    path.push(INDEX_FILE);
  }

  match tokio::fs::read(&path).await {
    Ok(bytes) => {
      log::debug!("GET {} -> {}", uri.path(), path.display());
      ([(header::CONTENT_TYPE, content_type(&path))], bytes).into_response()
    }
    Err(_) => StatusCode::NOT_FOUND.into_response(),
  }
}

/// Request path to a path relative to the served root; `None` when the
/// path tries to leave it.
fn resolve_path(request_path: &str) -> Option<PathBuf> {
  let mut relative = PathBuf::new();
  for part in request_path.split('/') {
    match part {
      "" | "." => {}
      ".." => return None,
      part if part.contains('\\') => return None,
      part => relative.push(part),
    }
  }

  if request_path.ends_with('/') || relative.as_os_str().is_empty() {
    relative.push(INDEX_FILE);
  }
  Some(relative)
}

fn content_type(path: &Path) -> &'static str {
  match path.extension().and_then(|ext| ext.to_str()) {
    Some("html") | Some("htm") => "text/html; charset=utf-8",
    Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
    Some("css") => "text/css; charset=utf-8",
    Some("json") => "application/json",
    Some("svg") => "image/svg+xml",
    Some("png") => "image/png",
    Some("jpg") | Some("jpeg") => "image/jpeg",
    Some("ico") => "image/x-icon",
    Some("txt") => "text/plain; charset=utf-8",
    _ => "application/octet-stream",
  }
}
