pub mod advisory;
pub mod comment;
pub mod favorite;
pub mod session;

pub use advisory::{Advisory, Severity};
pub use comment::{
    sort_newest_first, Comment, CommentId, Reaction, ReactionKind, ReactionMode, ReactionStep,
};
pub use favorite::{FavoriteItem, FavoriteKey, FavoritesCollection, MediaType};
pub use session::{Session, SessionContext, User};
