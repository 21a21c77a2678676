mod client;
mod types;

pub use client::{AgileApi, YouTrackClient};
pub use types::*;
