use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Identifier assigned to a comment by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub String);

impl CommentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CommentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn opposite(self) -> Self {
        match self {
            ReactionKind::Like => ReactionKind::Dislike,
            ReactionKind::Dislike => ReactionKind::Like,
        }
    }
}

impl Display for ReactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReactionKind::Like => write!(f, "like"),
            ReactionKind::Dislike => write!(f, "dislike"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionMode {
    Apply,
    Withdraw,
}

/// A user's current reaction to one comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Neutral,
    Liked,
    Disliked,
}

/// One server-side reaction call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionStep {
    pub kind: ReactionKind,
    pub mode: ReactionMode,
}

impl ReactionStep {
    pub fn apply(kind: ReactionKind) -> Self {
        Self {
            kind,
            mode: ReactionMode::Apply,
        }
    }

    pub fn withdraw(kind: ReactionKind) -> Self {
        Self {
            kind,
            mode: ReactionMode::Withdraw,
        }
    }

    /// The step that undoes this one
    pub fn inverse(self) -> Self {
        match self.mode {
            ReactionMode::Apply => Self::withdraw(self.kind),
            ReactionMode::Withdraw => Self::apply(self.kind),
        }
    }
}

/// A comment on a title, as stored remotely
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(alias = "_id")]
    pub id: CommentId,
    pub media_id: i64,
    pub user_id: String,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
}

impl Comment {
    fn set(&self, kind: ReactionKind) -> &Vec<String> {
        match kind {
            ReactionKind::Like => &self.likes,
            ReactionKind::Dislike => &self.dislikes,
        }
    }

    fn set_mut(&mut self, kind: ReactionKind) -> &mut Vec<String> {
        match kind {
            ReactionKind::Like => &mut self.likes,
            ReactionKind::Dislike => &mut self.dislikes,
        }
    }

    pub fn holds(&self, user_id: &str, kind: ReactionKind) -> bool {
        self.set(kind).iter().any(|u| u == user_id)
    }

    pub fn reaction_of(&self, user_id: &str) -> Reaction {
        if self.holds(user_id, ReactionKind::Like) {
            Reaction::Liked
        } else if self.holds(user_id, ReactionKind::Dislike) {
            Reaction::Disliked
        } else {
            Reaction::Neutral
        }
    }

    /// Server calls needed to toggle `kind` for this user.
    ///
    /// Holding `kind` already means withdraw it. Otherwise any opposite
    /// reaction is withdrawn first, then `kind` is applied. A user found in
    /// both sets gets both withdrawn.
    pub fn toggle_plan(&self, user_id: &str, kind: ReactionKind) -> Vec<ReactionStep> {
        let holds_same = self.holds(user_id, kind);
        let holds_opposite = self.holds(user_id, kind.opposite());

        let mut steps = Vec::with_capacity(2);
        if holds_opposite {
            steps.push(ReactionStep::withdraw(kind.opposite()));
        }
        if holds_same {
            steps.push(ReactionStep::withdraw(kind));
        } else {
            steps.push(ReactionStep::apply(kind));
        }
        steps
    }

    /// Applies one step to the local sets. Applying one kind always clears the other.
    pub fn apply_step(&mut self, user_id: &str, step: ReactionStep) {
        match step.mode {
            ReactionMode::Apply => {
                self.set_mut(step.kind.opposite()).retain(|u| u != user_id);
                if !self.holds(user_id, step.kind) {
                    self.set_mut(step.kind).push(user_id.to_string());
                }
            }
            ReactionMode::Withdraw => {
                self.set_mut(step.kind).retain(|u| u != user_id);
            }
        }
    }
}

/// Sorts newest first, ties broken by id so the order is stable
pub fn sort_newest_first(comments: &mut [Comment]) {
    comments.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.0.cmp(&a.id.0))
    });
}
