//! Binary entrypoint for the storybb-mentions CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml` and the data directory
//! - `scan` - print the candidate names found in a body
//! - `resolve` / `render` - resolve mentions against the directory, print them or the marked-up body
//! - `record` - resolve, render and store the mentions of a content item
//! - `show` - print the notification data for a content item
//! - `delete` - remove the stored mentions of a content item
//! - `add-character` / `add-member` - extend the JSON directory
//! - `status` - record counts and pipeline counters
//!
//! See the library crate docs for module‑level details: `storybb_mentions::`.
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use storybb_mentions::config::Config;
use storybb_mentions::directory::{GroupPermission, JsonDirectory};
use storybb_mentions::logutil::body_preview;
use storybb_mentions::mentions::scanner::html_escape;
use storybb_mentions::mentions::{
    mentioned_characters, possible_mentions, render_body, CharacterRecord, MemberRecord,
    ResolvedMention,
};
use storybb_mentions::metrics;
use storybb_mentions::storage::MentionStore;

#[derive(Parser)]
#[command(name = "storybb-mentions")]
#[command(about = "Find, render and store @mentions in StoryBB post bodies")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// Where the post body comes from.
#[derive(Args)]
struct BodyInput {
    /// Body text, entity-encoded as the forum stores it
    #[arg(long, conflicts_with = "file")]
    text: Option<String>,
    /// Read the body from a file ("-" for stdin)
    #[arg(long)]
    file: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file and create the data directory
    Init,
    /// Print candidate names found in a body
    Scan {
        #[command(flatten)]
        body: BodyInput,
    },
    /// Resolve mentions and print them as JSON
    Resolve {
        /// Member writing the body
        #[arg(long)]
        actor: u64,
        #[command(flatten)]
        body: BodyInput,
    },
    /// Resolve mentions and print the body with mention markup
    Render {
        #[arg(long)]
        actor: u64,
        #[command(flatten)]
        body: BodyInput,
    },
    /// Resolve, render and store the mentions of a content item
    Record {
        /// Content type tag, e.g. "msg"
        #[arg(long, default_value = "msg")]
        content_type: String,
        #[arg(long)]
        content_id: u64,
        /// Member writing the body
        #[arg(long)]
        actor: u64,
        /// Character the member is posting as
        #[arg(long)]
        character: u64,
        /// Replace previously stored mentions instead of only adding
        #[arg(long)]
        edit: bool,
        #[command(flatten)]
        body: BodyInput,
    },
    /// Print notification data for a content item as JSON
    Show {
        #[arg(long, default_value = "msg")]
        content_type: String,
        #[arg(long)]
        content_id: u64,
        /// Only these mentioned characters (repeatable)
        #[arg(long = "only")]
        only: Vec<u64>,
    },
    /// Remove every stored mention of a content item
    Delete {
        #[arg(long, default_value = "msg")]
        content_type: String,
        #[arg(long)]
        content_id: u64,
    },
    /// Add a character to the JSON directory
    AddCharacter {
        #[arg(long)]
        id: u64,
        #[arg(long)]
        member: u64,
        /// Plain-text name; stored entity-encoded
        #[arg(long)]
        name: String,
        /// Mark as the member's main character
        #[arg(long)]
        main: bool,
    },
    /// Add a member to the JSON directory
    AddMember {
        #[arg(long)]
        id: u64,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value_t = 0)]
        primary_group: u32,
        #[arg(long, default_value_t = 4)]
        post_group: u32,
        /// Additional group (repeatable)
        #[arg(long = "group")]
        groups: Vec<u32>,
        #[arg(long)]
        locale: Option<String>,
    },
    /// Show record counts and pipeline counters
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        info!("Initializing new mention configuration");
        Config::create_default(&cli.config).await?;
        info!("Configuration file created at {}", cli.config);
        let cfg = Config::default();
        let directory = JsonDirectory::load(&cfg.storage.data_dir).await?;
        MentionStore::open(cfg.storage.db_path())?;
        info!(
            "Data directory ready at {} ({} characters)",
            cfg.storage.data_dir,
            directory.character_count()
        );
        return Ok(());
    }

    // Missing config file is fine for everything but init: defaults apply.
    let config = match Config::load(&cli.config).await {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!("{} (using defaults)", e);
            None
        }
    };
    init_logging(&config, cli.verbose);
    let config = config.unwrap_or_default();
    let opts = config.mentions.scan_options();

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Scan { body } => {
            let text = read_body(&body).await?;
            for candidate in possible_mentions(&text, &opts) {
                println!("{}", candidate);
            }
        }
        Commands::Resolve { actor, body } => {
            let text = read_body(&body).await?;
            let directory = JsonDirectory::load(&config.storage.data_dir).await?;
            let gate = GroupPermission::new(&directory, &config.mentions.mention_groups);
            let found = mentioned_characters(&text, actor, &directory, &gate, &opts)?;
            let list: Vec<&ResolvedMention> = found.values().collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        Commands::Render { actor, body } => {
            let text = read_body(&body).await?;
            let directory = JsonDirectory::load(&config.storage.data_dir).await?;
            let gate = GroupPermission::new(&directory, &config.mentions.mention_groups);
            let found = mentioned_characters(&text, actor, &directory, &gate, &opts)?;
            println!("{}", render_body(&text, found.values(), opts.trigger));
        }
        Commands::Record {
            content_type,
            content_id,
            actor,
            character,
            edit,
            body,
        } => {
            let text = read_body(&body).await?;
            let directory = JsonDirectory::load(&config.storage.data_dir).await?;
            let gate = GroupPermission::new(&directory, &config.mentions.mention_groups);
            let found = mentioned_characters(&text, actor, &directory, &gate, &opts)?;
            let mentions: Vec<ResolvedMention> = found.values().cloned().collect();
            let store = MentionStore::open(config.storage.db_path())?;
            let (added, removed) = if edit {
                store.modify_mentions(&content_type, content_id, &mentions, actor, character)?
            } else {
                let added =
                    store.insert_mentions(&content_type, content_id, &mentions, actor, character)?;
                (added, 0)
            };
            info!(
                "Recorded {} {}: {} resolved, {} added, {} removed ('{}')",
                content_type,
                content_id,
                mentions.len(),
                added,
                removed,
                body_preview(&text)
            );
            let payload = serde_json::json!({
                "content_type": content_type,
                "content_id": content_id,
                "body": render_body(&text, mentions.iter(), opts.trigger),
                "resolved": mentions.len(),
                "added": added,
                "removed": removed,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Commands::Show {
            content_type,
            content_id,
            only,
        } => {
            let directory = JsonDirectory::load(&config.storage.data_dir).await?;
            let store = MentionStore::open(config.storage.db_path())?;
            let notices =
                store.mentions_by_content(&content_type, content_id, &only, &directory, &directory)?;
            println!("{}", serde_json::to_string_pretty(&notices)?);
        }
        Commands::Delete {
            content_type,
            content_id,
        } => {
            let store = MentionStore::open(config.storage.db_path())?;
            let removed = store.delete_mentions(&content_type, content_id)?;
            info!("Removed {} mention(s) from {} {}", removed, content_type, content_id);
            println!("{}", removed);
        }
        Commands::AddCharacter {
            id,
            member,
            name,
            main,
        } => {
            let mut directory = JsonDirectory::load(&config.storage.data_dir).await?;
            let record = CharacterRecord {
                id,
                member_id: member,
                name: html_escape(name.trim()),
                is_main: main,
                retired: false,
            };
            directory
                .add_character(record, &config.mentions.name_rules())
                .await
                .map_err(|e| anyhow!("Cannot add character '{}': {}", name, e))?;
            info!("Added character {} ('{}') for member {}", id, name, member);
        }
        Commands::AddMember {
            id,
            name,
            email,
            primary_group,
            post_group,
            groups,
            locale,
        } => {
            let mut directory = JsonDirectory::load(&config.storage.data_dir).await?;
            directory
                .add_member(MemberRecord {
                    id,
                    name: html_escape(name.trim()),
                    email,
                    primary_group,
                    post_group,
                    additional_groups: groups,
                    locale,
                })
                .await?;
            info!("Added member {} ('{}')", id, name);
        }
        Commands::Status => {
            let directory = JsonDirectory::load(&config.storage.data_dir).await?;
            let store = MentionStore::open(config.storage.db_path())?;
            let payload = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "characters": directory.character_count(),
                "members": directory.member_count(),
                "mention_records": store.count(),
                "trigger": opts.trigger.to_string(),
                "max_candidate_chars": opts.max_candidate_chars,
                "metrics": metrics::snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }

    Ok(())
}

async fn read_body(input: &BodyInput) -> Result<String> {
    match (&input.text, &input.file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) if path == "-" => {
            let text = tokio::task::spawn_blocking(|| std::io::read_to_string(std::io::stdin()))
                .await
                .map_err(|e| anyhow!("stdin reader failed: {}", e))??;
            Ok(text)
        }
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read body file {}: {}", path, e)),
        (None, None) => Err(anyhow!("Provide the body with --text or --file")),
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .map(|cfg| cfg.logging.level_filter())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when someone is watching
        let is_tty = atty::is(atty::Stream::Stderr);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
