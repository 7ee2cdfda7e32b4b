//! Application services: listing state, feeds, detail lookup, submissions.

pub mod detail;
pub mod error;
pub mod feed;
pub mod filter;
pub mod listing;
pub mod pagination;
pub mod repos;
pub mod submission;
pub mod subscription;
