pub mod favorites;
pub mod inflight;
pub mod notifier;
pub mod providers;
pub mod reactions;
pub mod resilient;

pub use favorites::{FavoritesSynchronizer, MutationOutcome, SyncMode};
pub use notifier::{AdvisoryFeed, Notifier, TracingNotifier};
pub use providers::{HttpRemoteStore, InMemoryRemoteStore, RemoteStore};
pub use reactions::{ReactionController, ToggleOutcome};
pub use resilient::{ResilientInvoker, RetryAttempt, RetryPolicy};
