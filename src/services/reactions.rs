//! Like/dislike toggling on comments
//!
//! Toggling a reaction the user already holds withdraws it; toggling the
//! other kind withdraws the opposite reaction first and then applies the
//! new one. The local thread is updated optimistically, reverted when any
//! server call fails, and replaced by the server's copy once the calls
//! succeed.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{
        Advisory, Comment, CommentId, Reaction, ReactionKind, ReactionStep, SessionContext,
    },
    services::{
        inflight::{InFlight, Ticket},
        notifier::Notifier,
        providers::RemoteStore,
    },
};

/// Result of a toggle that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToggleOutcome {
    /// Server accepted the change; `reaction` is the user's reaction afterwards
    Committed { reaction: Reaction },
    /// A toggle on the same comment is still in flight; this one was dropped
    Coalesced,
}

#[derive(Default)]
struct ThreadState {
    media_id: Option<i64>,
    comments: Vec<Comment>,
    inflight: InFlight<CommentId>,
}

impl ThreadState {
    fn comment_mut(&mut self, comment_id: &CommentId) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == *comment_id)
    }
}

pub struct ReactionController {
    session: SessionContext,
    remote: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<ThreadState>,
}

impl ReactionController {
    pub fn new(
        session: SessionContext,
        remote: Arc<dyn RemoteStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            session,
            remote,
            notifier,
            state: Mutex::new(ThreadState::default()),
        }
    }

    /// Fetches the thread for a title and makes it the current one
    pub async fn load_comments(&self, media_id: i64) -> AppResult<Vec<Comment>> {
        let comments = self.remote.list_comments(media_id).await?;

        let mut state = self.state.lock().await;
        if state.media_id != Some(media_id) {
            state.inflight.reset();
        }
        state.media_id = Some(media_id);
        state.comments = comments;

        tracing::debug!(media_id, count = state.comments.len(), "Comment thread loaded");
        Ok(state.comments.clone())
    }

    pub async fn comments(&self) -> Vec<Comment> {
        self.state.lock().await.comments.clone()
    }

    /// Drops the thread, e.g. on logout. Late responses are discarded.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.inflight.reset();
        state.media_id = None;
        state.comments.clear();
    }

    pub async fn toggle_like(&self, comment_id: &CommentId) -> AppResult<ToggleOutcome> {
        self.toggle(comment_id, ReactionKind::Like).await
    }

    pub async fn toggle_dislike(&self, comment_id: &CommentId) -> AppResult<ToggleOutcome> {
        self.toggle(comment_id, ReactionKind::Dislike).await
    }

    async fn toggle(&self, comment_id: &CommentId, kind: ReactionKind) -> AppResult<ToggleOutcome> {
        let session = self.session.snapshot().await;
        let Some((user, _)) = session.credentials() else {
            self.notifier
                .notify(Advisory::warning("Please log in to react to comments."));
            return Err(AppError::Unauthorized);
        };
        let user_id = user.id.clone();

        let (media_id, previous, steps, ticket, optimistic) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let media_id = state
                .media_id
                .ok_or_else(|| AppError::NotFound(format!("comment {}", comment_id)))?;
            let Some(index) = state.comments.iter().position(|c| c.id == *comment_id) else {
                return Err(AppError::NotFound(format!("comment {}", comment_id)));
            };
            let Some(ticket) = state.inflight.try_begin(comment_id.clone()) else {
                tracing::debug!(comment = %comment_id, "Toggle coalesced with in-flight toggle");
                return Ok(ToggleOutcome::Coalesced);
            };

            let comment = &mut state.comments[index];
            let previous = comment.clone();
            let steps = comment.toggle_plan(&user_id, kind);
            for step in &steps {
                comment.apply_step(&user_id, *step);
            }
            let optimistic = comment.reaction_of(&user_id);

            (media_id, previous, steps, ticket, optimistic)
        };

        self.notifier.notify(Advisory::success(match optimistic {
            Reaction::Liked => "Liked",
            Reaction::Disliked => "Disliked",
            Reaction::Neutral => "Reaction removed",
        }));

        let mut committed: Vec<ReactionStep> = Vec::with_capacity(steps.len());
        let mut failure = None;
        for step in &steps {
            match self.remote.react(comment_id, step.kind, step.mode).await {
                Ok(()) => committed.push(*step),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if let Some(error) = failure {
            return Err(self
                .revert(media_id, comment_id, previous, &committed, &ticket, error)
                .await);
        }

        self.reconcile(media_id, comment_id, &ticket).await;

        let mut state = self.state.lock().await;
        let reaction = state
            .comment_mut(comment_id)
            .map(|c| c.reaction_of(&user_id))
            .unwrap_or(optimistic);
        state.inflight.finish(&ticket);

        tracing::info!(comment = %comment_id, reaction = ?reaction, "Reaction committed");
        Ok(ToggleOutcome::Committed { reaction })
    }

    /// Undoes the server calls that went through, restores the local comment
    /// and reports the failure.
    async fn revert(
        &self,
        media_id: i64,
        comment_id: &CommentId,
        previous: Comment,
        committed: &[ReactionStep],
        ticket: &Ticket<CommentId>,
        error: AppError,
    ) -> AppError {
        let mut compensated = true;
        for step in committed.iter().rev() {
            let undo = step.inverse();
            if let Err(e) = self.remote.react(comment_id, undo.kind, undo.mode).await {
                tracing::error!(
                    comment = %comment_id,
                    error = %e,
                    "Failed to undo partial reaction change"
                );
                compensated = false;
                break;
            }
        }

        {
            let mut state = self.state.lock().await;
            if state.inflight.is_current(ticket) {
                if let Some(comment) = state.comment_mut(comment_id) {
                    *comment = previous;
                }
            }
        }

        if !committed.is_empty() || !compensated {
            self.reconcile(media_id, comment_id, ticket).await;
        }
        self.state.lock().await.inflight.finish(ticket);

        tracing::warn!(comment = %comment_id, error = %error, "Reaction change reverted");
        let message = match &error {
            AppError::Unauthorized | AppError::AuthRejected { .. } => {
                "Could not update your reaction: please log in again.".to_string()
            }
            other => format!("Could not update your reaction: {}", other),
        };
        self.notifier.notify(Advisory::error(message));
        error
    }

    /// Replaces the local copy of the comment with the server's
    async fn reconcile(&self, media_id: i64, comment_id: &CommentId, ticket: &Ticket<CommentId>) {
        let fetched = match self.remote.list_comments(media_id).await {
            Ok(comments) => comments,
            Err(e) => {
                tracing::warn!(
                    comment = %comment_id,
                    error = %e,
                    "Could not refresh comment after reaction, keeping local state"
                );
                return;
            }
        };

        let mut state = self.state.lock().await;
        if !state.inflight.is_current(ticket) || state.media_id != Some(media_id) {
            tracing::debug!(comment = %comment_id, "Discarding stale comment refresh");
            return;
        }
        match fetched.into_iter().find(|c| c.id == *comment_id) {
            Some(server_copy) => {
                if let Some(comment) = state.comment_mut(comment_id) {
                    *comment = server_copy;
                }
            }
            None => {
                tracing::info!(comment = %comment_id, "Comment no longer exists remotely");
                state.comments.retain(|c| c.id != *comment_id);
            }
        }
    }
}
