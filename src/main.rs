use anyhow::{bail, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use quire::config::Config;
use quire::markdown;
use quire::repository::{Error as RepositoryError, Repository};
use quire::{Post, PostMetadata};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let matches = app().get_matches();
    let (name, sub) = match matches.subcommand() {
        (name, Some(sub)) => (name, sub),
        // `SubcommandRequiredElseHelp` exits before we get here.
        _ => return Ok(()),
    };
    let repository = Repository::from_config(&config(&matches, sub)?);
    let json = matches.is_present("json") || sub.is_present("json");

    match name {
        "list" => print_posts(&repository.list_all()?, json, "No posts yet."),
        "show" => show(
            &repository,
            sub.value_of("slug").unwrap_or_default(),
            sub.is_present("html"),
            json,
        ),
        "tags" => {
            if sub.is_present("counts") {
                print_tag_index(&repository, json)
            } else {
                print_tags(&repository.list_tags()?, json)
            }
        }
        "tag" => {
            let tag = sub.value_of("tag").unwrap_or_default();
            print_posts(
                &repository.list_by_tag(tag)?,
                json,
                &format!("No posts tagged `{}`.", tag),
            )
        }
        "category" => {
            let category = sub.value_of("category").unwrap_or_default();
            print_posts(
                &repository.list_by_category(category)?,
                json,
                &format!("No posts in category `{}`.", category),
            )
        }
        _ => Ok(()),
    }
}

fn app() -> App<'static, 'static> {
    App::new("quire")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Lists and shows blog posts from a directory of frontmatter source files")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("posts")
                .long("posts")
                .value_name("DIR")
                .takes_value(true)
                .global(true)
                .help("The posts directory; overrides the project file"),
        )
        .arg(
            Arg::with_name("project")
                .long("project")
                .value_name("FILE")
                .takes_value(true)
                .global(true)
                .help("The project file; by default `quire.yaml` is searched for from the current directory up"),
        )
        .arg(
            Arg::with_name("json")
                .long("json")
                .global(true)
                .help("Prints JSON instead of text"),
        )
        .subcommand(SubCommand::with_name("list").about("Lists all posts, newest first"))
        .subcommand(
            SubCommand::with_name("show")
                .about("Shows a single post")
                .arg(Arg::with_name("slug").required(true).index(1))
                .arg(
                    Arg::with_name("html")
                        .long("html")
                        .help("Renders the body to HTML"),
                ),
        )
        .subcommand(
            SubCommand::with_name("tags").about("Lists all tags").arg(
                Arg::with_name("counts")
                    .long("counts")
                    .help("Lists the posts under each tag"),
            ),
        )
        .subcommand(
            SubCommand::with_name("tag")
                .about("Lists the posts with a tag")
                .arg(Arg::with_name("tag").required(true).index(1)),
        )
        .subcommand(
            SubCommand::with_name("category")
                .about("Lists the posts in a category")
                .arg(Arg::with_name("category").required(true).index(1)),
        )
}

// Global flags may land in either the top-level or the subcommand matches
// depending on where they were given.
fn config(matches: &ArgMatches, sub: &ArgMatches) -> Result<Config> {
    let value_of = |name: &str| sub.value_of(name).or_else(|| matches.value_of(name));
    let mut config = match value_of("project") {
        Some(project) => Config::from_project_file(Path::new(project))?,
        None => Config::discover(&std::env::current_dir()?)?,
    };
    if let Some(posts) = value_of("posts") {
        config.posts_directory = PathBuf::from(posts);
    }
    Ok(config)
}

fn show(repository: &Repository, slug: &str, html: bool, json: bool) -> Result<()> {
    let post = match repository.get_by_slug(slug) {
        Ok(post) => post,
        Err(RepositoryError::NotFound(_)) => bail!("No post found for `{}`.", slug),
        Err(err) => return Err(err.into()),
    };

    if json {
        let mut value = serde_json::to_value(&post)?;
        if let (true, Some(obj)) = (html, value.as_object_mut()) {
            obj.insert(
                "html".to_owned(),
                serde_json::Value::String(markdown::to_html(&post.content)),
            );
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print_post(&post, html);
    Ok(())
}

fn print_post(post: &Post, html: bool) {
    let metadata = &post.metadata;
    println!("{}", metadata.title);
    println!("{}", byline(metadata));
    if !metadata.tags.is_empty() {
        println!("{}", hashtags(&metadata.tags));
    }
    println!();
    if html {
        print!("{}", markdown::to_html(&post.content));
    } else {
        print!("{}", post.content);
    }
}

fn print_posts(posts: &[PostMetadata], json: bool, empty: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(posts)?);
        return Ok(());
    }
    if posts.is_empty() {
        println!("{}", empty);
        return Ok(());
    }

    for (i, post) in posts.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", byline(post));
        println!("{} ({})", post.title, post.slug);
        if !post.excerpt.is_empty() {
            println!("    {}", post.excerpt);
        }
        if !post.tags.is_empty() {
            println!("    {}", hashtags(&post.tags));
        }
    }
    Ok(())
}

fn print_tags(tags: &[String], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(tags)?);
    } else if tags.is_empty() {
        println!("No tags found.");
    } else {
        for tag in tags {
            println!("{}", tag);
        }
    }
    Ok(())
}

fn print_tag_index(repository: &Repository, json: bool) -> Result<()> {
    let index = repository.tag_index()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&index)?);
        return Ok(());
    }
    if index.is_empty() {
        println!("No tags found.");
        return Ok(());
    }

    for (tag, posts) in index.iter() {
        println!("{} ({})", tag, posts.len());
        for post in posts {
            println!("    {}  {}", post.display_date(), post.title);
        }
    }
    Ok(())
}

// e.g. `January 1, 2024 • 3 min read • essays`
fn byline(post: &PostMetadata) -> String {
    let mut line = format!("{} • {}", post.display_date(), post.reading_time);
    if let Some(category) = &post.category {
        line.push_str(" • ");
        line.push_str(category);
    }
    line
}

fn hashtags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_show_missing_post_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("present.mdx"), "---\ntitle: Here\n---\nbody\n")?;
        let repository = Repository::new(dir.path());

        let err = match show(&repository, "absent", false, false) {
            Err(err) => err,
            Ok(()) => panic!("wanted an error for a missing post"),
        };
        assert_eq!("No post found for `absent`.", err.to_string());
        show(&repository, "present", false, true)?;
        Ok(())
    }

    #[test]
    fn test_show_surfaces_parse_errors() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("broken.mdx"), "---\ntags: [unclosed\n---\n")?;
        let err = match show(&Repository::new(dir.path()), "broken", false, false) {
            Err(err) => err,
            Ok(()) => panic!("wanted a parse error"),
        };
        assert!(matches!(
            err.downcast_ref::<RepositoryError>(),
            Some(RepositoryError::Parse { .. })
        ));
        Ok(())
    }
}
