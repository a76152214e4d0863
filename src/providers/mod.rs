pub mod gitlab;

pub use gitlab::HandleCache;
