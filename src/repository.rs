//! Defines the [`Repository`] type, which discovers post source files in a
//! directory and answers queries over them, and its [`Error`] type.
//!
//! There is no cache: every query re-reads and re-parses the whole directory,
//! so results always reflect what's on disk at the time of the call and a
//! [`Repository`] can be shared between threads without locking.

use crate::config::Config;
use crate::frontmatter::{self, split};
use crate::post::{Post, PostMetadata};
use crate::reading_time::DEFAULT_WORDS_PER_MINUTE;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// The extension of post source files when none is configured.
pub const DEFAULT_EXTENSION: &str = "mdx";

/// Reads [`Post`]s from a flat directory of source files. A post's slug is
/// its file name less the extension (e.g., `hello-world.mdx` has the slug
/// `hello-world`); files with other extensions and subdirectories are ignored.
#[derive(Clone, Debug)]
pub struct Repository {
    /// `directory` holds the post source files.
    directory: PathBuf,

    /// `suffix` is the file-name suffix of post source files, including the
    /// leading dot (e.g., `.mdx`).
    suffix: String,

    /// `words_per_minute` is the reading speed used for reading-time
    /// estimates.
    words_per_minute: u32,
}

impl Repository {
    /// Constructs a repository reading `.mdx` files from `directory`.
    pub fn new<P: Into<PathBuf>>(directory: P) -> Repository {
        Repository {
            directory: directory.into(),
            suffix: format!(".{}", DEFAULT_EXTENSION),
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
        }
    }

    /// Constructs a repository from a [`Config`].
    pub fn from_config(config: &Config) -> Repository {
        Repository::new(&config.posts_directory)
            .with_extension(&config.extension)
            .with_words_per_minute(config.words_per_minute)
    }

    /// Sets the source file extension. A leading dot is optional.
    pub fn with_extension(mut self, extension: &str) -> Repository {
        self.suffix = format!(".{}", extension.trim_start_matches('.'));
        self
    }

    pub fn with_words_per_minute(mut self, words_per_minute: u32) -> Repository {
        self.words_per_minute = words_per_minute;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the metadata of every post sorted by date, most recent first.
    /// Dates are compared as strings; posts with equal dates stay in file
    /// name order. A missing directory yields no posts. Directory entries and
    /// files that can't be read or parsed are logged and skipped, so a
    /// directory that can't be listed at all also yields no posts and this
    /// never returns `Err`.
    pub fn list_all(&self) -> Result<Vec<PostMetadata>> {
        if !self.directory.exists() {
            debug!(directory = %self.directory.display(), "posts directory does not exist");
            return Ok(Vec::new());
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut posts: Vec<PostMetadata> = Vec::new();
        for result in WalkDir::new(&self.directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(directory = %self.directory.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            let os_file_name = entry.file_name();
            let file_name = os_file_name.to_string_lossy();
            let slug = match self.slug_for(&file_name) {
                Some(slug) => slug,
                None => continue,
            };
            if !entry.path().is_file() {
                continue;
            }

            // Lossy file name conversion can map distinct files onto the same
            // slug; the first one in file name order wins.
            if !seen.insert(slug.to_owned()) {
                warn!(slug, path = %entry.path().display(), "skipping post with duplicate slug");
                continue;
            }

            match self.read_post(slug, entry.path()) {
                Ok(post) => posts.push(post.into()),
                Err(err) => warn!(slug, error = %err, "skipping post"),
            }
        }

        // `sort_by` is stable, which keeps equal dates in file name order.
        posts.sort_by(|a, b| b.date.cmp(&a.date));
        debug!(directory = %self.directory.display(), count = posts.len(), "listed posts");
        Ok(posts)
    }

    /// Reads the single post `slug`. Fails with [`Error::NotFound`] if there
    /// is no such post (or `slug` isn't a plain file stem), with
    /// [`Error::Parse`] if its frontmatter is malformed, and with
    /// [`Error::Io`] for other read failures.
    pub fn get_by_slug(&self, slug: &str) -> Result<Post> {
        if !is_valid_slug(slug) {
            return Err(Error::NotFound(slug.to_owned()));
        }
        let path = self.directory.join(format!("{}{}", slug, self.suffix));
        self.read_post(slug, &path)
    }

    /// Like [`Repository::get_by_slug`], but every failure is folded into
    /// `None`. The reason is only logged.
    pub fn find_by_slug(&self, slug: &str) -> Option<Post> {
        match self.get_by_slug(slug) {
            Ok(post) => Some(post),
            Err(Error::NotFound(_)) => None,
            Err(err) => {
                warn!(slug, error = %err, "failed to read post");
                None
            }
        }
    }

    /// Returns every slug in [`Repository::list_all`] order.
    pub fn slugs(&self) -> Result<Vec<String>> {
        Ok(self.list_all()?.into_iter().map(|p| p.slug).collect())
    }

    /// Returns the distinct tags of all posts in ascending order.
    pub fn list_tags(&self) -> Result<Vec<String>> {
        let tags: BTreeSet<String> = self
            .list_all()?
            .into_iter()
            .flat_map(|p| p.tags)
            .collect();
        Ok(tags.into_iter().collect())
    }

    /// Returns the posts tagged exactly `tag` (case-sensitive), most recent
    /// first.
    pub fn list_by_tag(&self, tag: &str) -> Result<Vec<PostMetadata>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|p| p.has_tag(tag))
            .collect())
    }

    /// Returns the posts whose category is exactly `category`
    /// (case-sensitive), most recent first.
    pub fn list_by_category(&self, category: &str) -> Result<Vec<PostMetadata>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|p| p.in_category(category))
            .collect())
    }

    /// Groups posts by tag. Tags are in ascending order and each tag's posts
    /// are in [`Repository::list_all`] order. A post that repeats a tag
    /// appears under it once.
    pub fn tag_index(&self) -> Result<BTreeMap<String, Vec<PostMetadata>>> {
        let mut index: BTreeMap<String, Vec<PostMetadata>> = BTreeMap::new();
        for post in self.list_all()? {
            for tag in post.tags.iter() {
                let posts = index.entry(tag.clone()).or_default();
                if posts.last().map(|p| &p.slug) != Some(&post.slug) {
                    posts.push(post.clone());
                }
            }
        }
        Ok(index)
    }

    fn slug_for<'n>(&self, file_name: &'n str) -> Option<&'n str> {
        match file_name.strip_suffix(self.suffix.as_str()) {
            Some(slug) if !slug.is_empty() => Some(slug),
            _ => None,
        }
    }

    fn read_post(&self, slug: &str, path: &Path) -> Result<Post> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            match err.kind() {
                io::ErrorKind::NotFound => Error::NotFound(slug.to_owned()),
                _ => Error::Io {
                    path: path.to_owned(),
                    err,
                },
            }
        })?;
        let (frontmatter, body) = split(&contents).map_err(|err| Error::Parse {
            path: path.to_owned(),
            err,
        })?;
        Ok(Post::new(slug, frontmatter, body, self.words_per_minute))
    }
}

// Slugs name a file directly inside the posts directory, so anything that
// could address another location is rejected.
fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(|c| c == '/' || c == '\\' || c == '\0')
}

/// The result of a fallible [`Repository`] operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error reading posts.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is no post with the requested slug.
    NotFound(String),

    /// Returned when a post's frontmatter can't be parsed.
    Parse { path: PathBuf, err: frontmatter::Error },

    /// Returned when a post source file exists but can't be read (including
    /// when it isn't valid UTF-8).
    Io { path: PathBuf, err: io::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotFound(slug) => write!(f, "post `{}` not found", slug),
            Error::Parse { path, err } => {
                write!(f, "parsing post '{}': {}", path.display(), err)
            }
            Error::Io { path, err } => {
                write!(f, "reading post '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NotFound(_) => None,
            Error::Parse { path: _, err } => Some(err),
            Error::Io { path: _, err } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, file_name: &str, contents: &str) {
        fs::write(dir.join(file_name), contents).unwrap();
    }

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    // The directory from the example scenario: an older, fully described
    // post and a newer one with only a date.
    fn scenario() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "hello-world.mdx",
            &format!(
                "---\ntitle: \"Hello\"\ndate: \"2024-01-01\"\ntags: [\"intro\",\"rust\"]\n---\n{}\n",
                words(600)
            ),
        );
        write(
            dir.path(),
            "second-post.mdx",
            "---\ndate: \"2024-06-01\"\n---\nShort.\n",
        );
        dir
    }

    fn slugs(posts: &[PostMetadata]) -> Vec<&str> {
        posts.iter().map(|p| p.slug.as_str()).collect()
    }

    #[test]
    fn test_list_all_scenario() -> Result<()> {
        let dir = scenario();
        let posts = Repository::new(dir.path()).list_all()?;
        assert_eq!(vec!["second-post", "hello-world"], slugs(&posts));
        assert_eq!("Untitled", posts[0].title);
        assert!(posts[0].tags.is_empty());
        assert_eq!(3, posts[1].reading_time.minutes);
        Ok(())
    }

    #[test]
    fn test_list_all_missing_directory() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let repository = Repository::new(dir.path().join("nope"));
        assert!(repository.list_all()?.is_empty());
        assert!(repository.list_tags()?.is_empty());
        assert!(repository.list_by_tag("rust")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_list_all_empty_directory() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        assert!(Repository::new(dir.path()).list_all()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_list_all_sorted_by_date_descending() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        for (slug, date) in &[
            ("a", "2023-03-01"),
            ("b", "2024-12-31"),
            ("c", "2021-07-14"),
            ("d", "2024-01-01"),
        ] {
            write(dir.path(), &format!("{}.mdx", slug), &format!("---\ndate: {}\n---\n", date));
        }
        let posts = Repository::new(dir.path()).list_all()?;
        assert_eq!(vec!["b", "d", "a", "c"], slugs(&posts));
        for pair in posts.windows(2) {
            assert!(pair[0].date >= pair[1].date);
        }
        Ok(())
    }

    #[test]
    fn test_equal_dates_keep_file_name_order() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        for slug in &["zeta", "alpha", "mid"] {
            write(dir.path(), &format!("{}.mdx", slug), "---\ndate: 2024-01-01\n---\n");
        }
        let posts = Repository::new(dir.path()).list_all()?;
        assert_eq!(vec!["alpha", "mid", "zeta"], slugs(&posts));
        Ok(())
    }

    #[test]
    fn test_list_all_ignores_other_files() -> Result<()> {
        let dir = scenario();
        write(dir.path(), "notes.md", "---\ntitle: Not a post\n---\n");
        write(dir.path(), ".mdx", "---\ntitle: No slug\n---\n");
        fs::create_dir(dir.path().join("drafts.mdx")).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        write(&dir.path().join("nested"), "deep.mdx", "---\ntitle: Deep\n---\n");

        let posts = Repository::new(dir.path()).list_all()?;
        assert_eq!(vec!["second-post", "hello-world"], slugs(&posts));
        Ok(())
    }

    #[test]
    fn test_list_all_skips_malformed_posts() -> Result<()> {
        let dir = scenario();
        write(dir.path(), "broken.mdx", "---\ntags: [unclosed\n---\nbody\n");
        write(dir.path(), "open.mdx", "---\ntitle: Never closed\n");

        let posts = Repository::new(dir.path()).list_all()?;
        assert_eq!(vec!["second-post", "hello-world"], slugs(&posts));
        Ok(())
    }

    #[test]
    fn test_list_all_defaults_fieldless_blocks() -> Result<()> {
        let dir = scenario();
        write(dir.path(), "commented.mdx", "---\n# draft notes, no fields yet\n---\nbody\n");
        write(dir.path(), "null.mdx", "---\n~\n---\nbody\n");

        let repository = Repository::new(dir.path());
        let posts = repository.list_all()?;
        for slug in &["commented", "null"] {
            let post = posts
                .iter()
                .find(|p| p.slug == *slug)
                .unwrap_or_else(|| panic!("{} missing from listing", slug));
            assert_eq!("Untitled", post.title);
            assert_eq!("Untitled", repository.get_by_slug(slug)?.metadata.title);
        }
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_list_all_unreadable_directory() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = scenario();
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o000)).unwrap();
        // Permission bits don't apply to root, so there's nothing to check.
        let readable = fs::read_dir(dir.path()).is_ok();
        let posts = Repository::new(dir.path()).list_all();
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

        if !readable {
            assert!(posts?.is_empty());
        }
        Ok(())
    }

    #[test]
    fn test_list_all_is_idempotent() -> Result<()> {
        let dir = scenario();
        let repository = Repository::new(dir.path());
        assert_eq!(repository.list_all()?, repository.list_all()?);
        assert_eq!(repository.list_tags()?, repository.list_tags()?);
        Ok(())
    }

    #[test]
    fn test_list_all_reflects_new_files() -> Result<()> {
        let dir = scenario();
        let repository = Repository::new(dir.path());
        assert_eq!(2, repository.list_all()?.len());
        write(dir.path(), "third.mdx", "---\ndate: 2025-01-01\n---\n");
        assert_eq!("third", repository.list_all()?[0].slug);
        Ok(())
    }

    #[test]
    fn test_get_by_slug_round_trip() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let body = "# Heading\n\nSome *text*.\n\n---\n\nAfter a rule.\n";
        write(
            dir.path(),
            "full.mdx",
            &format!(
                "---\ntitle: Full\ndate: 2024-02-29\nexcerpt: Everything set\ntags: [a, b, a]\ncategory: essays\n---\n{}",
                body
            ),
        );
        let post = Repository::new(dir.path()).get_by_slug("full")?;
        assert_eq!("full", post.metadata.slug);
        assert_eq!("Full", post.metadata.title);
        assert_eq!("2024-02-29", post.metadata.date);
        assert_eq!("Everything set", post.metadata.excerpt);
        assert_eq!(vec!["a", "b", "a"], post.metadata.tags);
        assert_eq!(Some(String::from("essays")), post.metadata.category);
        assert_eq!(body, post.content);
        Ok(())
    }

    #[test]
    fn test_get_by_slug_not_found() {
        let dir = scenario();
        let repository = Repository::new(dir.path());
        match repository.get_by_slug("nonexistent") {
            Err(Error::NotFound(slug)) => assert_eq!("nonexistent", slug),
            other => panic!("wanted not found; found {:?}", other),
        }
        assert_eq!(None, repository.find_by_slug("nonexistent"));
    }

    #[test]
    fn test_get_by_slug_rejects_paths() {
        let dir = scenario();
        write(dir.path(), "inner.mdx", "---\ntitle: Inner\n---\n");
        let repository = Repository::new(dir.path().join("missing"));
        for slug in &["", ".", "..", "../inner", "a/b", "a\\b"] {
            match repository.get_by_slug(slug) {
                Err(Error::NotFound(_)) => {}
                other => panic!("wanted not found for {:?}; found {:?}", slug, other),
            }
        }
    }

    #[test]
    fn test_get_by_slug_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.mdx", "---\ntags: [unclosed\n---\n");
        let repository = Repository::new(dir.path());
        match repository.get_by_slug("broken") {
            Err(Error::Parse { .. }) => {}
            other => panic!("wanted parse error; found {:?}", other),
        }
        assert_eq!(None, repository.find_by_slug("broken"));
    }

    #[test]
    fn test_get_by_slug_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("binary.mdx"), &[0xff, 0xfe, 0x00]).unwrap();
        match Repository::new(dir.path()).get_by_slug("binary") {
            Err(Error::Io { .. }) => {}
            other => panic!("wanted I/O error; found {:?}", other),
        }
    }

    #[test]
    fn test_get_by_slug_without_frontmatter() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "plain.mdx", "Only a body.\n");
        let post = Repository::new(dir.path()).get_by_slug("plain")?;
        assert_eq!("Untitled", post.metadata.title);
        assert_eq!("Only a body.\n", post.content);
        Ok(())
    }

    #[test]
    fn test_list_tags() -> Result<()> {
        let dir = scenario();
        write(
            dir.path(),
            "third.mdx",
            "---\ndate: 2023-01-01\ntags: [rust, zig, Rust]\n---\n",
        );
        let tags = Repository::new(dir.path()).list_tags()?;
        assert_eq!(vec!["Rust", "intro", "rust", "zig"], tags);
        Ok(())
    }

    #[test]
    fn test_list_by_tag() -> Result<()> {
        let dir = scenario();
        write(dir.path(), "third.mdx", "---\ndate: 2025-01-01\ntags: [rust]\n---\n");
        let repository = Repository::new(dir.path());
        assert_eq!(vec!["third", "hello-world"], slugs(&repository.list_by_tag("rust")?));
        assert!(repository.list_by_tag("RUST")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_list_by_category() -> Result<()> {
        let dir = scenario();
        write(dir.path(), "a.mdx", "---\ndate: 2020-01-01\ncategory: essays\n---\n");
        write(dir.path(), "b.mdx", "---\ndate: 2022-01-01\ncategory: essays\n---\n");
        write(dir.path(), "c.mdx", "---\ndate: 2021-01-01\ncategory: Essays\n---\n");
        let repository = Repository::new(dir.path());
        assert_eq!(vec!["b", "a"], slugs(&repository.list_by_category("essays")?));
        assert!(repository.list_by_category("")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_tag_index() -> Result<()> {
        let dir = scenario();
        write(dir.path(), "third.mdx", "---\ndate: 2025-01-01\ntags: [rust, rust]\n---\n");
        let index = Repository::new(dir.path()).tag_index()?;
        assert_eq!(vec!["intro", "rust"], index.keys().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(vec!["third", "hello-world"], slugs(&index["rust"]));
        assert_eq!(vec!["hello-world"], slugs(&index["intro"]));
        Ok(())
    }

    #[test]
    fn test_slugs() -> Result<()> {
        let dir = scenario();
        assert_eq!(
            vec!["second-post", "hello-world"],
            Repository::new(dir.path()).slugs()?
        );
        Ok(())
    }

    #[test]
    fn test_custom_extension_and_speed() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "post.md", &format!("---\ntitle: Md\n---\n{}", words(100)));
        write(dir.path(), "other.mdx", "---\ntitle: Mdx\n---\n");
        let repository = Repository::new(dir.path())
            .with_extension(".md")
            .with_words_per_minute(50);
        let posts = repository.list_all()?;
        assert_eq!(vec!["post"], slugs(&posts));
        assert_eq!(2, posts[0].reading_time.minutes);
        assert_eq!("Md", repository.get_by_slug("post")?.metadata.title);
        Ok(())
    }

    #[test]
    fn test_parse_testdata_posts() -> Result<()> {
        let repository = Repository::new("./testdata/posts/");
        let posts = repository.list_all()?;
        assert_eq!(vec!["second-post", "hello-world"], slugs(&posts));
        assert_eq!("Untitled", posts[0].title);
        assert_eq!("Hello", posts[1].title);
        assert_eq!(3, posts[1].reading_time.minutes);
        assert_eq!(vec!["intro", "rust"], repository.list_tags()?);
        assert_eq!(vec!["hello-world"], slugs(&repository.list_by_tag("rust")?));
        Ok(())
    }
}
