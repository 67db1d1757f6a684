//! Defines [`PostMetadata`] and [`Post`], the records built for every post
//! source file. Every field of a record is total: values missing from the
//! frontmatter are replaced by defaults (see [`PostMetadata::new`]), so
//! consumers never have to deal with absent titles or dates.

use crate::frontmatter::Frontmatter;
use crate::reading_time::ReadingTime;
use chrono::{NaiveDate, Utc};
use serde::Serialize;

/// The title given to posts whose frontmatter doesn't have one.
pub const DEFAULT_TITLE: &str = "Untitled";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Everything about a post except its body. This is what listing operations
/// return.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMetadata {
    /// The source file name less its extension. Identifies the post.
    pub slug: String,

    pub title: String,

    /// The post date as written in the frontmatter. Posts are ordered by
    /// comparing this string, which is only chronological for `YYYY-MM-DD`
    /// dates.
    pub date: String,

    pub excerpt: String,

    /// Tags in frontmatter order. Duplicates are kept.
    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    pub reading_time: ReadingTime,
}

impl PostMetadata {
    /// Builds the metadata for the post `slug` from its parsed `frontmatter`
    /// and `body`. Defaults:
    ///
    /// * `title` is [`DEFAULT_TITLE`] when missing or empty
    /// * `date` is today's UTC date when missing or empty
    /// * `excerpt` is empty and `tags` has no elements when missing
    /// * `category` is left as `None` when missing
    pub fn new(
        slug: &str,
        frontmatter: Frontmatter,
        body: &str,
        words_per_minute: u32,
    ) -> PostMetadata {
        PostMetadata {
            slug: slug.to_owned(),
            title: non_empty(frontmatter.title)
                .unwrap_or_else(|| DEFAULT_TITLE.to_owned()),
            date: non_empty(frontmatter.date).unwrap_or_else(today),
            excerpt: frontmatter.excerpt.unwrap_or_default(),
            tags: frontmatter.tags.unwrap_or_default(),
            category: frontmatter.category,
            reading_time: ReadingTime::estimate(body, words_per_minute),
        }
    }

    /// Returns true if any of the post's tags is exactly `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Returns true if the post's category is exactly `category`. Posts
    /// without a category are in no category.
    pub fn in_category(&self, category: &str) -> bool {
        self.category.as_deref() == Some(category)
    }

    /// Formats the date for display, e.g. `2024-01-05` becomes
    /// `January 5, 2024`. Dates that aren't `YYYY-MM-DD` are returned as-is.
    pub fn display_date(&self) -> String {
        match NaiveDate::parse_from_str(&self.date, DATE_FORMAT) {
            Ok(date) => date.format("%B %-d, %Y").to_string(),
            Err(_) => self.date.clone(),
        }
    }
}

/// A post with its full, unrendered body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Post {
    #[serde(flatten)]
    pub metadata: PostMetadata,

    /// The body text following the frontmatter, verbatim.
    pub content: String,
}

impl Post {
    pub fn new(
        slug: &str,
        frontmatter: Frontmatter,
        body: &str,
        words_per_minute: u32,
    ) -> Post {
        Post {
            metadata: PostMetadata::new(slug, frontmatter, body, words_per_minute),
            content: body.to_owned(),
        }
    }
}

impl From<Post> for PostMetadata {
    fn from(post: Post) -> PostMetadata {
        post.metadata
    }
}

/// Today's UTC date as `YYYY-MM-DD`.
pub fn today() -> String {
    Utc::now().format(DATE_FORMAT).to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
