pub mod badge;
pub mod models;
pub mod questions;
pub mod rarity;
pub mod session;
pub mod stats;
pub mod trimester;
