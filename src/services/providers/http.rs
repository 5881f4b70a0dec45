/// REST adapter for the authoritative preference store
///
/// Resources:
/// - `GET    /favorites`                        → `[FavoriteItem]`
/// - `POST   /favorites`                        → `FavoriteItem` (409 if present)
/// - `DELETE /favorites/{mediaType}/{id}`       → 204 (404 treated as done)
/// - `GET    /comments?mediaId={id}`            → `[Comment]`
/// - `POST   /comments/{id}/reactions/{kind}`   → apply
/// - `DELETE /comments/{id}/reactions/{kind}`   → withdraw (404 treated as done)
///
/// Every request carries the session's bearer token and runs through the
/// [`ResilientInvoker`]. Payloads are decoded strictly; anything that does
/// not match the expected shape is rejected as [`AppError::Decode`].
use crate::{
    error::{AppError, AppResult},
    models::{
        sort_newest_first, Comment, CommentId, FavoriteItem, FavoriteKey, ReactionKind,
        ReactionMode, SessionContext,
    },
    services::{providers::RemoteStore, resilient::ResilientInvoker},
};
use reqwest::{Client as HttpClient, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

#[derive(Clone)]
pub struct HttpRemoteStore {
    http_client: HttpClient,
    api_url: String,
    session: SessionContext,
    invoker: ResilientInvoker,
}

impl HttpRemoteStore {
    pub fn new(api_url: impl Into<String>, session: SessionContext, invoker: ResilientInvoker) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            session,
            invoker,
        }
    }

    /// Appends percent-encoded path segments to the API base URL
    fn url(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| AppError::Internal(format!("Invalid backend URL {}: {}", self.api_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal(format!("Backend URL {} cannot take a path", self.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Bearer token of the current session; no request is made without one
    async fn bearer(&self) -> AppResult<String> {
        let session = self.session.snapshot().await;
        session
            .credentials()
            .map(|(_, token)| token.to_string())
            .ok_or(AppError::Unauthorized)
    }
}

/// Sends the request and turns non-success statuses into classified errors
async fn send_checked(request: RequestBuilder) -> AppResult<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(AppError::from_status(status.as_u16(), error_message(&body)))
}

/// Pulls `message` or `error` out of a JSON error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Sends the request and decodes the whole body. Runs inside the invoker so
/// a stalled body hits the same timeout as a stalled connect.
async fn fetch<T: DeserializeOwned>(request: RequestBuilder, what: &str) -> AppResult<T> {
    let response = send_checked(request).await?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            error = %e,
            payload = %what,
            response = %text,
            "Failed to decode remote store response"
        );
        AppError::Decode(format!("{}: {}", what, e))
    })
}

/// Treats a missing resource as already removed
fn ignore_not_found(result: AppResult<Response>) -> AppResult<()> {
    match result {
        Ok(_) | Err(AppError::NotFound(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

#[async_trait::async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list_favorites(&self) -> AppResult<Vec<FavoriteItem>> {
        let token = self.bearer().await?;
        let url = self.url(&["favorites"])?;

        let favorites: Vec<FavoriteItem> = self
            .invoker
            .invoke("list_favorites", || {
                fetch(self.http_client.get(url.clone()).bearer_auth(&token), "favorites")
            })
            .await?;

        tracing::debug!(count = favorites.len(), "Fetched remote favorites");
        Ok(favorites)
    }

    async fn add_favorite(&self, item: &FavoriteItem) -> AppResult<FavoriteItem> {
        let token = self.bearer().await?;
        let url = self.url(&["favorites"])?;

        self.invoker
            .invoke("add_favorite", || {
                fetch(
                    self.http_client.post(url.clone()).bearer_auth(&token).json(item),
                    "favorite",
                )
            })
            .await
    }

    async fn remove_favorite(&self, key: FavoriteKey) -> AppResult<()> {
        let token = self.bearer().await?;
        let media_type = key.media_type.to_string();
        let id = key.id.to_string();
        let url = self.url(&["favorites", &media_type, &id])?;

        let result = self
            .invoker
            .invoke("remove_favorite", || {
                send_checked(self.http_client.delete(url.clone()).bearer_auth(&token))
            })
            .await;

        ignore_not_found(result)
    }

    async fn list_comments(&self, media_id: i64) -> AppResult<Vec<Comment>> {
        let token = self.bearer().await?;
        let url = self.url(&["comments"])?;
        let media_id_param = media_id.to_string();

        let mut comments: Vec<Comment> = self
            .invoker
            .invoke("list_comments", || {
                fetch(
                    self.http_client
                        .get(url.clone())
                        .bearer_auth(&token)
                        .query(&[("mediaId", media_id_param.as_str())]),
                    "comments",
                )
            })
            .await?;

        if let Some(foreign) = comments.iter().find(|c| c.media_id != media_id) {
            return Err(AppError::Decode(format!(
                "comment {} belongs to media {}, expected {}",
                foreign.id, foreign.media_id, media_id
            )));
        }
        sort_newest_first(&mut comments);

        tracing::debug!(media_id, count = comments.len(), "Fetched comments");
        Ok(comments)
    }

    async fn react(
        &self,
        comment_id: &CommentId,
        kind: ReactionKind,
        mode: ReactionMode,
    ) -> AppResult<()> {
        let token = self.bearer().await?;
        let kind_segment = kind.to_string();
        let url = self.url(&["comments", comment_id.as_str(), "reactions", &kind_segment])?;

        match mode {
            ReactionMode::Apply => self
                .invoker
                .invoke("react_apply", || {
                    send_checked(self.http_client.post(url.clone()).bearer_auth(&token))
                })
                .await
                .map(|_| ()),
            ReactionMode::Withdraw => {
                let result = self
                    .invoker
                    .invoke("react_withdraw", || {
                        send_checked(self.http_client.delete(url.clone()).bearer_auth(&token))
                    })
                    .await;
                ignore_not_found(result)
            }
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
