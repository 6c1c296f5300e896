mod index;
mod worktree;

pub use index::{branch_names, is_repository, RepositoryIndex, FALLBACK_BRANCH};
pub use worktree::WorktreeManager;
