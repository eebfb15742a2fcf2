#[cfg(test)]
pub(crate) mod fake;

use crate::models::{BookSummary, Chapter};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    Unauthorized,
    Network,
    Http,
    Parse,
    /// Rejected before any request was sent.
    Invalid,
}

#[derive(Clone, Debug)]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    pub(crate) fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Invalid,
            message: message.into(),
        }
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

/// Port the grepbook server listens on when run locally.
pub(crate) const DEFAULT_API_URL: &str = "http://localhost:5000";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct EnvConfig {
    pub api_url: String,
}

impl EnvConfig {
    pub fn new() -> Self {
        let Some(window) = web_sys::window() else {
            return Self {
                api_url: DEFAULT_API_URL.to_string(),
            };
        };

        // `window.ENV.API_URL` wins, then `window.ENV.api_url`.
        if let Some(env) = window.get("ENV") {
            if !env.is_undefined() && env.is_object() {
                for key in ["API_URL", "api_url"] {
                    if let Ok(api_url) = js_sys::Reflect::get(&env, &key.into()) {
                        if let Some(url_str) = api_url.as_string() {
                            return Self { api_url: url_str };
                        }
                    }
                }
            }
        }

        // The editor is served by the same server that owns `/summaries`.
        let origin = window
            .location()
            .origin()
            .ok()
            .filter(|o| !o.trim().is_empty() && o != "null");

        Self {
            api_url: origin.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct CreateSummaryRequest {
    pub title: String,
    pub book_author: String,
    pub book_url: String,
    pub chapters: Vec<CreateChapterRequest>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct CreateChapterRequest {
    pub heading: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct UpdateChapterRequest {
    pub heading: String,
    pub html: String,
    /// JSON-encoded delta, same encoding as the summary's `delta` field.
    pub delta: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ReorderChaptersRequest {
    pub old_index: usize,
    pub new_index: usize,
}

pub(crate) fn summaries_path() -> String {
    "/summaries".to_string()
}

pub(crate) fn summary_path(uid: &str) -> String {
    format!("/summaries/{}", urlencoding::encode(uid))
}

pub(crate) fn summary_edit_path(uid: &str) -> String {
    format!("{}/edit", summary_path(uid))
}

/// Collection path; the trailing slash is part of the route.
pub(crate) fn chapters_path(uid: &str) -> String {
    format!("{}/chapters/", summary_path(uid))
}

pub(crate) fn chapter_path(uid: &str, chapter_id: &str) -> String {
    format!(
        "{}/chapters/{}",
        summary_path(uid),
        urlencoding::encode(chapter_id)
    )
}

/// The REST surface behind `/summaries`.
///
/// `ApiClient` talks to the real server; tests substitute a recording store.
pub(crate) trait SummaryStore {
    async fn put_summary(&self, summary: &BookSummary) -> ApiResult<()>;
    async fn create_summary(&self, req: &CreateSummaryRequest) -> ApiResult<BookSummary>;
    async fn delete_summary(&self, uid: &str) -> ApiResult<()>;
    async fn create_chapter(&self, uid: &str, heading: &str) -> ApiResult<Chapter>;
    async fn put_chapter(&self, uid: &str, chapter: &Chapter) -> ApiResult<()>;
    async fn delete_chapter(&self, uid: &str, chapter_id: &str) -> ApiResult<()>;
    async fn reorder_chapters(&self, uid: &str, old_index: usize, new_index: usize)
        -> ApiResult<()>;
}

#[derive(Clone, Debug)]
pub(crate) struct ApiClient {
    pub(crate) base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }

    pub fn from_env() -> Self {
        Self::new(EnvConfig::new().api_url)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn request_api(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> ApiResult<serde_json::Value> {
        let client = reqwest::Client::new();
        let mut req = client
            .request(method, self.url(path))
            .header("Accept", "application/json");

        if let Some(b) = body {
            req = req.json(b);
        }

        let res = req.send().await.map_err(ApiError::network)?;
        let status = res.status();

        if status.is_success() {
            // Write endpoints answer with `{"message": ..}` or nothing at all.
            let text = res.text().await.map_err(ApiError::network)?;
            if text.trim().is_empty() {
                Ok(serde_json::Value::Null)
            } else {
                serde_json::from_str(&text).map_err(ApiError::parse)
            }
        } else if status.as_u16() == 401 {
            Err(ApiError::unauthorized())
        } else {
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, "Request failed"))
        }
    }

    /// Accepts the bare summary, `{"summary": {..}}`, or just `{"uid": ..}`.
    pub(crate) fn parse_created_summary(data: serde_json::Value) -> ApiResult<BookSummary> {
        let item = data.get("summary").cloned().unwrap_or(data);
        let summary = BookSummary::from_value(item.clone()).map_err(ApiError::parse)?;
        if summary.uid().trim().is_empty() {
            return Err(ApiError::parse(format!(
                "Create summary succeeded but response is missing uid: {item}"
            )));
        }
        Ok(summary)
    }

    /// Accepts the bare chapter or `{"chapter": {..}}`.
    pub(crate) fn parse_created_chapter(data: serde_json::Value) -> ApiResult<Chapter> {
        let item = data.get("chapter").cloned().unwrap_or(data);
        let chapter = Chapter::from_value(item.clone()).map_err(ApiError::parse)?;
        if chapter.id().trim().is_empty() {
            return Err(ApiError::parse(format!(
                "Create chapter succeeded but response is missing chapter id: {item}"
            )));
        }
        Ok(chapter)
    }
}

impl SummaryStore for ApiClient {
    async fn put_summary(&self, summary: &BookSummary) -> ApiResult<()> {
        self.request_api(
            reqwest::Method::PUT,
            &summary_path(summary.uid()),
            Some(summary),
        )
        .await
        .map(|_| ())
    }

    async fn create_summary(&self, req: &CreateSummaryRequest) -> ApiResult<BookSummary> {
        let data = self
            .request_api(reqwest::Method::POST, &summaries_path(), Some(req))
            .await?;
        Self::parse_created_summary(data)
    }

    async fn delete_summary(&self, uid: &str) -> ApiResult<()> {
        self.request_api(reqwest::Method::DELETE, &summary_path(uid), None::<&()>)
            .await
            .map(|_| ())
    }

    async fn create_chapter(&self, uid: &str, heading: &str) -> ApiResult<Chapter> {
        let data = self
            .request_api(
                reqwest::Method::POST,
                &chapters_path(uid),
                Some(&CreateChapterRequest {
                    heading: heading.to_string(),
                }),
            )
            .await?;
        Self::parse_created_chapter(data)
    }

    async fn put_chapter(&self, uid: &str, chapter: &Chapter) -> ApiResult<()> {
        self.request_api(
            reqwest::Method::PUT,
            &chapter_path(uid, chapter.id()),
            Some(&chapter.update_request()),
        )
        .await
        .map(|_| ())
    }

    async fn delete_chapter(&self, uid: &str, chapter_id: &str) -> ApiResult<()> {
        self.request_api(
            reqwest::Method::DELETE,
            &chapter_path(uid, chapter_id),
            None::<&()>,
        )
        .await
        .map(|_| ())
    }

    async fn reorder_chapters(
        &self,
        uid: &str,
        old_index: usize,
        new_index: usize,
    ) -> ApiResult<()> {
        self.request_api(
            reqwest::Method::PUT,
            &chapters_path(uid),
            Some(&ReorderChaptersRequest {
                old_index,
                new_index,
            }),
        )
        .await
        .map(|_| ())
    }
}
