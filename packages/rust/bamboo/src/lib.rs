//! Bamboo server client: session login, activity feed, labels, logs,
//! build results and comments.
//!
//! This crate only speaks HTTP and parses Bamboo's payloads. Deciding which
//! builds to look at, and what to say about them, is `bambot-core`'s job.

mod client;
pub mod feed;
pub mod resources;

pub use client::{BambooClient, ClientOptions};
pub use feed::parse_feed;
pub use resources::{comment_body, parse_build_result, parse_labels};
