//! Reading surface and submission core for a bilingual (Tamil/English) blog.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
