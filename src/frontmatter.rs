//! Splits a post source file into its YAML [`Frontmatter`] block and its body.
//! A source file is structured as follows:
//!
//! 1. Initial frontmatter fence (`---`) on the first line
//! 2. YAML frontmatter with any of `title`, `date`, `excerpt`, `tags` and
//!    `category`
//! 3. Terminal frontmatter fence (`---`) on a line of its own
//! 4. Post body
//!
//! For example:
//!
//! ```md
//! ---
//! title: Hello, world!
//! date: 2024-01-01
//! tags: [intro, rust]
//! ---
//! # Hello
//!
//! World
//! ```
//!
//! A file that does not begin with a fence has no frontmatter at all; the
//! whole file is the body.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::fmt;

const FENCE: &str = "---";
const BYTE_ORDER_MARK: char = '\u{feff}';

/// The metadata recognized in a post's frontmatter block. Every key is
/// optional and unknown keys are ignored; the defaults for missing keys are
/// applied by [`crate::post::PostMetadata::new`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Frontmatter {
    #[serde(deserialize_with = "scalar")]
    pub title: Option<String>,

    /// Normally an ISO-8601 date (`YYYY-MM-DD`), kept as text.
    #[serde(deserialize_with = "scalar")]
    pub date: Option<String>,

    #[serde(deserialize_with = "scalar")]
    pub excerpt: Option<String>,

    #[serde(deserialize_with = "scalar_seq")]
    pub tags: Option<Vec<String>>,

    #[serde(deserialize_with = "scalar")]
    pub category: Option<String>,
}

/// Splits `input` into its parsed [`Frontmatter`] and the body text. The body
/// is everything after the terminal fence line, verbatim.
pub fn split(input: &str) -> Result<(Frontmatter, &str)> {
    let input = input.strip_prefix(BYTE_ORDER_MARK).unwrap_or(input);
    let (yaml_start, yaml_stop, body_start) = match frontmatter_indices(input)? {
        Some(indices) => indices,
        None => return Ok((Frontmatter::default(), input)),
    };

    let yaml = &input[yaml_start..yaml_stop];
    let body = &input[body_start..];
    if is_blank(yaml) {
        return Ok((Frontmatter::default(), body));
    }
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Null => Ok((Frontmatter::default(), body)),
        value => Ok((serde_yaml::from_value(value)?, body)),
    }
}

// A block holding nothing but whitespace and comments has no fields.
fn is_blank(yaml: &str) -> bool {
    yaml.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

// Returns `(yaml_start, yaml_stop, body_start)` or `None` if the input has no
// opening fence.
fn frontmatter_indices(input: &str) -> Result<Option<(usize, usize, usize)>> {
    let mut lines = input.split_inclusive('\n');
    let yaml_start = match lines.next() {
        Some(first) if is_fence(first) => first.len(),
        _ => return Ok(None),
    };

    let mut offset = yaml_start;
    for line in lines {
        if is_fence(line) {
            return Ok(Some((yaml_start, offset, offset + line.len())));
        }
        offset += line.len();
    }
    Err(Error::FrontmatterMissingEndFence)
}

fn is_fence(line: &str) -> bool {
    line.trim_end() == FENCE
}

fn scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None => Ok(None),
        Some(value) => scalar_to_string(value).map_err(D::Error::custom),
    }
}

// Accepts either a list of scalars or a single scalar, which is treated as a
// one-element list.
fn scalar_seq<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Value::Sequence(items)) => {
            let mut v = Vec::with_capacity(items.len());
            for item in items {
                if let Some(s) = scalar_to_string(item).map_err(D::Error::custom)? {
                    v.push(s);
                }
            }
            Ok(Some(v))
        }
        Some(value) => Ok(scalar_to_string(value)
            .map_err(D::Error::custom)?
            .map(|s| vec![s])),
    }
}

fn scalar_to_string(value: Value) -> std::result::Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::String(s) => Ok(Some(s)),
        Value::Sequence(_) => Err(String::from("expected a scalar, found a list")),
        Value::Mapping(_) => Err(String::from("expected a scalar, found a mapping")),
    }
}

/// Represents the result of a frontmatter-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error splitting or parsing a post's frontmatter.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file has its starting frontmatter fence
    /// but no terminal fence.
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}
