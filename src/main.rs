use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use url::Url;
use uuid::Uuid;

use feedboard::config::Config;
use feedboard::feed::{opml, Feed};
use feedboard::storage::FeedRepository;
use feedboard::util::{atomic_write, pad_to_width, parse_absolute_uri};

/// Get the config directory path (~/.config/feedboard/)
fn get_config_dir(home: Option<OsString>) -> Result<PathBuf> {
    let home = home.context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("feedboard"))
}

/// Returns the config file to load and the directory that relative paths in
/// it resolve against. `home` is only needed when no file was given.
fn resolve_config(
    explicit: Option<PathBuf>,
    home: Option<OsString>,
) -> Result<(PathBuf, PathBuf)> {
    match explicit {
        Some(file) => {
            let dir = file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            Ok((file, dir))
        }
        None => {
            let dir = get_config_dir(home)?;
            Ok((dir.join("config.toml"), dir))
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "feedboard", about = "Manage RSS feed sources stored in an XML file")]
struct Args {
    /// Config file (default: ~/.config/feedboard/config.toml). A relative
    /// `store_path` inside it resolves against the file's directory.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Feed store, overriding `store_path` from the config file
    #[arg(long, value_name = "FILE", global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty feed store if none exists
    Init,

    /// List feeds
    List {
        /// Only feeds carrying this tag
        #[arg(long)]
        tag: Option<String>,

        /// Print a JSON array instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one feed
    Show {
        id: Uuid,

        #[arg(long)]
        json: bool,
    },

    /// Add a feed and commit
    Add {
        #[arg(long)]
        name: String,

        /// Absolute URI of the feed
        #[arg(long, value_parser = parse_absolute_uri)]
        path: Url,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "")]
        tags: String,
    },

    /// Change fields of a feed and commit
    Edit {
        id: Uuid,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, value_parser = parse_absolute_uri)]
        path: Option<Url>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        tags: Option<String>,
    },

    /// Delete a feed and commit
    Remove { id: Uuid },

    /// Merge feeds from an OPML file and commit
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Write all feeds to an OPML file
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so `list --json` output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let (config_path, config_dir) =
        resolve_config(args.config.clone(), std::env::var_os("HOME"))?;
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let store_path = match &args.store {
        Some(p) => p.clone(),
        None => config.store_path(&config_dir),
    };

    match args.command {
        Command::Init => {
            if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create store directory {}", parent.display())
                })?;
            }
            let repo =
                FeedRepository::create(&store_path).context("Failed to create feed store")?;
            println!(
                "Feed store ready at {} ({} feeds)",
                repo.path().display(),
                repo.len()
            );
        }
        Command::List { tag, json } => {
            let repo = open_store(&store_path)?;
            let feeds: Vec<Feed> = repo
                .feeds()
                .into_iter()
                .filter(|f| tag.as_deref().map_or(true, |t| f.has_tag(t)))
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&feeds)?);
            } else {
                print_table(&feeds, config.list_name_width);
            }
        }
        Command::Show { id, json } => {
            let repo = open_store(&store_path)?;
            let feed = repo
                .get(&id)
                .with_context(|| format!("No feed with id {id}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(feed)?);
            } else {
                print_feed(feed);
            }
        }
        Command::Add {
            name,
            path,
            description,
            tags,
        } => {
            let mut repo = open_store(&store_path)?;
            let mut feed = repo.create_feed();
            feed.set_name(&name);
            feed.set_path(Some(path));
            feed.set_description(&description);
            feed.set_tags(&tags);
            let id = feed.id();
            repo.add(feed)?;
            repo.commit()?;
            println!("{id}");
        }
        Command::Edit {
            id,
            name,
            path,
            description,
            tags,
        } => {
            let mut repo = open_store(&store_path)?;
            let feed = repo
                .get_mut(&id)
                .with_context(|| format!("No feed with id {id}"))?;
            if let Some(name) = name {
                feed.set_name(&name);
            }
            if let Some(path) = path {
                feed.set_path(Some(path));
            }
            if let Some(description) = description {
                feed.set_description(&description);
            }
            if let Some(tags) = tags {
                feed.set_tags(&tags);
            }
            let edits = feed.revision();
            repo.commit()?;
            tracing::debug!(%id, edits, "Edited feed");
        }
        Command::Remove { id } => {
            let mut repo = open_store(&store_path)?;
            let removed = repo.delete(&id)?;
            repo.commit()?;
            println!("Removed {}", removed.name());
        }
        Command::Import { file } => {
            let mut repo = open_store(&store_path)?;
            let entries = opml::parse(&file).context("Failed to parse OPML file")?;
            if entries.is_empty() {
                eprintln!("Warning: No valid feeds found in {}", file.display());
            }
            let report = opml::import_into(&mut repo, entries)?;
            repo.commit()?;
            println!(
                "Imported {} feeds ({} already present)",
                report.added, report.skipped
            );
        }
        Command::Export { file } => {
            let repo = open_store(&store_path)?;
            if file.exists() {
                backup_existing(&file)?;
            }
            let feeds = repo.feeds();
            opml::export_to_file(&feeds, &file)?;
            println!("Exported {} feeds to {}", feeds.len(), file.display());
        }
    }

    Ok(())
}

fn open_store(path: &Path) -> Result<FeedRepository> {
    FeedRepository::open(path).with_context(|| {
        format!(
            "Failed to open feed store {} (run `feedboard init` to create it)",
            path.display()
        )
    })
}

/// SEC-006: copy an existing export target aside before overwriting it.
fn backup_existing(path: &Path) -> Result<()> {
    let content = std::fs::read(path)
        .with_context(|| format!("Failed to read '{}' for backup", path.display()))?;
    let backup_path = PathBuf::from(format!(
        "{}.backup.{}",
        path.display(),
        Utc::now().format("%Y%m%d_%H%M%S")
    ));
    atomic_write(&backup_path, &content).with_context(|| {
        format!(
            "Failed to create backup at '{}'. Original file is unchanged.",
            backup_path.display()
        )
    })?;
    println!("Backed up existing file to: {}", backup_path.display());
    Ok(())
}

fn print_table(feeds: &[Feed], name_width: usize) {
    if feeds.is_empty() {
        println!("No feeds.");
        return;
    }
    println!(
        "{:<36}  {}  {}",
        "ID",
        pad_to_width("NAME", name_width),
        "PATH"
    );
    for feed in feeds {
        println!(
            "{}  {}  {}",
            feed.id(),
            pad_to_width(feed.name(), name_width),
            feed.path().map(Url::as_str).unwrap_or("-")
        );
    }
}

fn print_feed(feed: &Feed) {
    println!("id:          {}", feed.id());
    println!("name:        {}", feed.name());
    println!(
        "path:        {}",
        feed.path().map(Url::as_str).unwrap_or("-")
    );
    println!("description: {}", feed.description());
    println!("tags:        {}", feed.tags());
}
