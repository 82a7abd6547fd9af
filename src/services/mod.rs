pub mod github;
pub mod jokes;
pub mod retry;
