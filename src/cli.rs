use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "docshelf",
    about = "Store, tag and search documents across content, metadata and text stores"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Abort store calls after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create or update a document
    Put(PutArgs),
    /// Print a document
    Get(GetArgs),
    /// Remove a document and its content
    #[command(name = "rm")]
    Remove(RemoveArgs),
    /// Tag a document
    Tag(TagArgs),
    /// Remove tags from a document
    Untag(TagArgs),
    /// List documents, optionally filtered by text query and tags
    #[command(name = "ls")]
    List(ListArgs),
    /// List all tags and how many documents carry each
    Tags(TagsArgs),
    /// Import every markdown and text file under a directory
    Import(ImportArgs),
    /// Show shelf location and statistics
    Status(StatusArgs),
    /// Read or change runtime settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

#[derive(Debug, Parser)]
pub struct PutArgs {
    /// Document path
    pub path: String,

    /// Read content from this file instead of stdin
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Document title
    #[arg(long)]
    pub title: Option<String>,

    /// Extra metadata as key=value (repeatable)
    #[arg(long = "meta", value_parser = parse_key_value)]
    pub metadata: Vec<(String, String)>,
}

#[derive(Debug, Parser)]
pub struct GetArgs {
    /// Document path
    pub path: String,

    /// Output as JSON with metadata
    #[arg(long)]
    pub json: bool,

    /// Print only metadata
    #[arg(long)]
    pub meta: bool,
}

#[derive(Debug, Parser)]
pub struct RemoveArgs {
    /// Document path
    pub path: String,
}

#[derive(Debug, Parser)]
pub struct TagArgs {
    /// Document path
    pub path: String,

    /// Tag names
    #[arg(required = true)]
    pub tags: Vec<String>,
}

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Free-text query
    pub query: Option<String>,

    /// Only documents carrying this tag (repeatable, all must match)
    #[arg(short = 't', long = "tag")]
    pub tags: Vec<String>,

    /// Glob pattern applied to document paths
    #[arg(long)]
    pub pattern: Option<String>,

    /// Output as JSON array
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct TagsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct ImportArgs {
    /// Directory to import
    pub dir: PathBuf,

    /// Path prefix for imported documents
    #[arg(long)]
    pub prefix: Option<String>,

    /// Tag every imported document (repeatable)
    #[arg(short = 't', long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print one setting, or all of them
    Get {
        /// Setting name
        key: Option<String>,
    },
    /// Persist a setting
    Set {
        /// Setting name
        key: String,
        /// New value
        value: String,
    },
}

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "docshelf",
            &mut std::io::stdout(),
        );
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_ls_with_query_and_tags() {
        let cli = Cli::parse_from([
            "docshelf", "ls", "rust", "-t", "a", "--tag", "b",
        ]);
        match cli.command {
            Command::List(args) => {
                assert_eq!(args.query.as_deref(), Some("rust"));
                assert_eq!(args.tags, vec!["a", "b"]);
                assert!(!args.json);
            }
            _ => panic!("expected ls command"),
        }
    }

    #[test]
    fn parse_put_metadata_pairs() {
        let cli = Cli::parse_from([
            "docshelf",
            "put",
            "a.md",
            "--meta",
            "author=erin",
            "--meta",
            "lang=en=US",
        ]);
        match cli.command {
            Command::Put(args) => {
                assert_eq!(
                    args.metadata,
                    vec![
                        ("author".to_string(), "erin".to_string()),
                        ("lang".to_string(), "en=US".to_string()),
                    ]
                );
            }
            _ => panic!("expected put command"),
        }
    }

    #[test]
    fn tag_requires_names() {
        assert!(Cli::try_parse_from(["docshelf", "tag", "a.md"]).is_err());
    }

    #[test]
    fn bad_metadata_is_rejected() {
        assert!(
            Cli::try_parse_from(["docshelf", "put", "a.md", "--meta", "x"])
                .is_err()
        );
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
