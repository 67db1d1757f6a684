//! Loads [`Config`] from a `quire.yaml` project file. The project file is
//! found by searching a directory and its ancestors, and every path in it is
//! relative to the directory holding the file:
//!
//! ```yaml
//! posts_directory: content/posts
//! extension: md
//! words_per_minute: 250
//! ```
//!
//! All keys are optional.

use crate::reading_time::DEFAULT_WORDS_PER_MINUTE;
use crate::repository::DEFAULT_EXTENSION;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The name of the project file.
pub const PROJECT_FILE: &str = "quire.yaml";

/// Where posts live, relative to the project root, when not configured.
pub const DEFAULT_POSTS_DIRECTORY: &str = "src/posts";

#[derive(Deserialize)]
struct WordsPerMinute(u32);
impl Default for WordsPerMinute {
    fn default() -> Self {
        WordsPerMinute(DEFAULT_WORDS_PER_MINUTE)
    }
}

#[derive(Deserialize)]
struct Extension(String);
impl Default for Extension {
    fn default() -> Self {
        Extension(DEFAULT_EXTENSION.to_owned())
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Project {
    #[serde(default)]
    pub posts_directory: Option<PathBuf>,

    #[serde(default)]
    pub extension: Extension,

    #[serde(default)]
    pub words_per_minute: WordsPerMinute,
}

/// Resolved settings for a [`crate::repository::Repository`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub posts_directory: PathBuf,
    pub extension: String,
    pub words_per_minute: u32,
}

impl Config {
    /// The configuration used when there is no project file, with the posts
    /// directory resolved against `root`.
    pub fn defaults(root: &Path) -> Config {
        Config {
            posts_directory: root.join(DEFAULT_POSTS_DIRECTORY),
            extension: DEFAULT_EXTENSION.to_owned(),
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
        }
    }

    /// Loads the project file in `dir` or its closest ancestor that has one.
    /// Fails if no project file is found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        match find_project_file(dir) {
            Some(path) => Config::from_project_file(&path),
            None => Err(anyhow!(
                "Could not find `{}` in `{}` or any parent directory",
                PROJECT_FILE,
                dir.display()
            )),
        }
    }

    /// Like [`Config::from_directory`], but falls back to
    /// [`Config::defaults`] for `dir` when there is no project file.
    pub fn discover(dir: &Path) -> Result<Config> {
        match find_project_file(dir) {
            Some(path) => Config::from_project_file(&path),
            None => Ok(Config::defaults(dir)),
        }
    }

    pub fn from_project_file(path: &Path) -> Result<Config> {
        let file = File::open(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        let project: Project = serde_yaml::from_reader(file)
            .with_context(|| format!("Loading configuration `{}`", path.display()))?;
        if project.words_per_minute.0 == 0 {
            return Err(anyhow!(
                "`words_per_minute` in `{}` must be greater than zero",
                path.display()
            ));
        }

        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;
        Ok(Config {
            posts_directory: project_root.join(
                project
                    .posts_directory
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_POSTS_DIRECTORY)),
            ),
            extension: project.extension.0.trim_start_matches('.').to_owned(),
            words_per_minute: project.words_per_minute.0,
        })
    }
}

fn find_project_file(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .map(|ancestor| ancestor.join(PROJECT_FILE))
        .find(|path| path.is_file())
}
