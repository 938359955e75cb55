use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use http_body_util::BodyExt;
use paper_catalog::config::{AppConfig, DEFAULT_CORS_ORIGINS, DEFAULT_MAX_UPLOAD_BYTES};
use paper_catalog::routes;
use paper_catalog::state::AppState;
use serde::de::DeserializeOwned;
use tempfile::TempDir;
use tower::util::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    #[allow(dead_code)]
    pub state: AppState,
    router: Router,
    storage_root: PathBuf,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create temp dir")?;
        let database_path = dir.path().join("papers.db");
        let storage_root = dir.path().join("storage").join("papers");

        let config = AppConfig {
            database_url: database_path
                .to_str()
                .ok_or_else(|| anyhow!("temp path is not valid UTF-8"))?
                .to_string(),
            database_max_pool_size: 2,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            storage_path: storage_root.clone(),
            cors_allowed_origins: DEFAULT_CORS_ORIGINS.split(',').map(str::to_string).collect(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        };

        let state = AppState::from_config(config).await?;
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            storage_root,
            _dir: dir,
        })
    }

    #[allow(dead_code)]
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Drops a file into the library as if it had been copied there by hand.
    #[allow(dead_code)]
    pub async fn write_library_file(&self, relative_path: &str, contents: &[u8]) -> Result<()> {
        let path = self.storage_root.join(relative_path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }

    pub async fn get(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())?;
        self.send(request).await
    }

    #[allow(dead_code)]
    pub async fn post_empty(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .body(Body::empty())?;
        self.send(request).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(path)
            .body(Body::empty())?;
        self.send(request).await
    }

    #[allow(dead_code)]
    pub async fn upload_paper(
        &self,
        filename: &str,
        data: &[u8],
        fields: &[(&str, &str)],
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend(b"Content-Type: text/markdown\r\n\r\n");
        body.extend(data);
        body.extend(b"\r\n");

        for (name, value) in fields {
            body.extend(format!("--{boundary}\r\n").as_bytes());
            body.extend(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            body.extend(value.as_bytes());
            body.extend(b"\r\n");
        }

        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/papers/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))?;
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> Result<hyper::Response<Body>> {
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub async fn json_body<T: DeserializeOwned>(response: hyper::Response<Body>) -> Result<T> {
    let body = body_to_vec(response.into_body()).await?;
    serde_json::from_slice(&body).context("failed to decode JSON response")
}
