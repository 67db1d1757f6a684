//! The library code for `quire`, which reads blog posts from a directory of
//! source files and answers the questions a blog's pages ask of them: all
//! posts newest first, a single post by slug, the set of tags, and the posts
//! with a given tag or category.
//!
//! A post is built in three steps:
//!
//! 1. Splitting the source file into frontmatter and body
//!    ([`crate::frontmatter`])
//! 2. Estimating the reading time of the body ([`crate::reading_time`])
//! 3. Filling in defaults for anything the frontmatter leaves out
//!    ([`crate::post`])
//!
//! [`crate::repository::Repository`] drives those steps for a whole directory
//! on every query; nothing is cached between calls. Rendering is left to the
//! consumer, though [`crate::markdown`] converts bodies to HTML for the
//! command line.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod config;
pub mod frontmatter;
pub mod markdown;
pub mod post;
pub mod reading_time;
pub mod repository;

pub use post::{Post, PostMetadata};
pub use repository::Repository;
