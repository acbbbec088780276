use std::{io::Read, sync::Arc, time::Duration};

use clap::Parser;
use docshelf::{
    Context,
    Coordinator,
    DataDir,
    Document,
    Error,
    FsContentStore,
    RedbMetadataStore,
    Result,
    TantivyTextIndex,
    cli::{
        Cli,
        Command,
        ConfigAction,
        GetArgs,
        ImportArgs,
        ListArgs,
        PutArgs,
    },
    coordinator::DEFAULT_SEARCH_LIMIT,
    document::validate_tags,
    import,
    tantivy_index::WRITER_MEMORY_BUDGET,
};
use kdam::BarExt;
use tantivy::IndexWriter;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const SEARCH_LIMIT_KEY: &str = "search_limit";

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DOCSHELF_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// The opened stores plus a coordinator over them.
struct Shelf {
    data_dir: DataDir,
    metadata: Arc<RedbMetadataStore>,
    index: Arc<TantivyTextIndex>,
    coordinator: Coordinator,
}

impl Shelf {
    fn open(data_dir: DataDir) -> Result<Self> {
        let metadata = Arc::new(RedbMetadataStore::open(&data_dir.metadata_db())?);
        let content = Arc::new(FsContentStore::open(&data_dir.content_dir())?);
        let limit = search_limit(&metadata)?;
        let index = Arc::new(TantivyTextIndex::open(&data_dir.tantivy_dir())?);
        let coordinator =
            Coordinator::new(content, metadata.clone(), index.clone())
                .with_search_limit(limit);

        Ok(Self {
            data_dir,
            metadata,
            index,
            coordinator,
        })
    }
}

fn search_limit(metadata: &RedbMetadataStore) -> Result<usize> {
    let raw = metadata
        .get_setting_or(SEARCH_LIMIT_KEY, &DEFAULT_SEARCH_LIMIT.to_string())?;
    parse_limit(&raw)
}

fn parse_limit(raw: &str) -> Result<usize> {
    match raw.parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(Error::Config(format!(
            "{SEARCH_LIMIT_KEY} must be a positive integer, got `{raw}`"
        ))),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let mut ctx = Context::background();
    if let Some(secs) = cli.timeout {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let shelf = Shelf::open(data_dir)?;

    match cli.command {
        Command::Put(args) => cmd_put(&shelf, &ctx, args)?,
        Command::Get(args) => cmd_get(&shelf, &ctx, &args)?,
        Command::Remove(args) => {
            shelf.coordinator.remove_doc(&ctx, &args.path)?;
            shelf.index.remove_document(&args.path)?;
            println!("Removed '{}'", args.path);
        }
        Command::Tag(args) => {
            shelf.coordinator.tag_doc(&ctx, &args.path, &args.tags)?;
        }
        Command::Untag(args) => {
            shelf.coordinator.untag_doc(&ctx, &args.path, &args.tags)?;
        }
        Command::List(args) => cmd_list(&shelf, &ctx, &args)?,
        Command::Tags(args) => {
            let tags = shelf.coordinator.list_tags(&ctx)?;
            if args.json {
                println!("{}", serde_json::to_string(&tags)?);
            } else if tags.is_empty() {
                println!("No tags defined.");
            } else {
                for tag in &tags {
                    println!("{}\t{}", tag.name, tag.paths.len());
                }
            }
        }
        Command::Import(args) => cmd_import(&shelf, &ctx, &args)?,
        Command::Status(args) => cmd_status(&shelf, &ctx, args.json)?,
        Command::Config { action } => match action {
            ConfigAction::Get { key: Some(key) } => {
                match shelf.metadata.get_setting(&key)? {
                    Some(value) => println!("{value}"),
                    None => {
                        return Err(Error::not_found("setting", &key));
                    }
                }
            }
            ConfigAction::Get { key: None } => {
                for (key, value) in shelf.metadata.list_settings()? {
                    println!("{key}\t{value}");
                }
            }
            ConfigAction::Set { key, value } => {
                if key != SEARCH_LIMIT_KEY {
                    return Err(Error::Config(format!(
                        "unknown setting `{key}`"
                    )));
                }
                parse_limit(&value)?;
                shelf.metadata.set_setting(&key, &value)?;
                println!("Set {key} = {value}");
            }
        },
        Command::Completions(_) => {}
    }

    Ok(())
}

fn cmd_put(shelf: &Shelf, ctx: &Context, args: PutArgs) -> Result<()> {
    let content = match &args.file {
        Some(file) => std::fs::read_to_string(file)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let title = args
        .title
        .unwrap_or_else(|| import::extract_title(&content, args.path.as_ref()));

    let mut doc = Document::new(args.path, content.clone()).with_title(title);
    doc.metadata.extend(args.metadata);

    let stored = shelf.coordinator.put_doc(ctx, doc)?;
    shelf.index.index_document(
        &stored.path,
        stored.title.as_deref().unwrap_or_default(),
        &content,
    )?;

    println!("Stored '{}'", stored.path);
    Ok(())
}

fn cmd_get(shelf: &Shelf, ctx: &Context, args: &GetArgs) -> Result<()> {
    if args.meta {
        let doc = shelf.coordinator.get_meta(ctx, &args.path)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&doc)?);
        } else {
            println!("path: {}", doc.path);
            if let Some(title) = &doc.title {
                println!("title: {title}");
            }
            println!("created: {}", doc.created_at);
            println!("updated: {}", doc.updated_at);
            for (key, value) in &doc.metadata {
                println!("{key}: {value}");
            }
        }
        return Ok(());
    }

    let doc = shelf.coordinator.get_doc(ctx, &args.path)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print!("{}", doc.content);
    }
    Ok(())
}

fn cmd_list(shelf: &Shelf, ctx: &Context, args: &ListArgs) -> Result<()> {
    let query = args.query.as_deref().unwrap_or_default();
    let mut docs = shelf.coordinator.list_docs(ctx, query, &args.tags)?;

    if let Some(pattern) = &args.pattern {
        let glob = globset::Glob::new(pattern)
            .map_err(|e| Error::Config(format!("invalid glob pattern: {e}")))?
            .compile_matcher();
        docs.retain(|doc| glob.is_match(&doc.path));
    }

    if args.json {
        println!("{}", serde_json::to_string(&docs)?);
    } else if docs.is_empty() {
        println!("No documents found.");
    } else {
        for doc in &docs {
            println!("{}\t{}", doc.path, doc.title.as_deref().unwrap_or(""));
        }
    }
    Ok(())
}

fn cmd_import(shelf: &Shelf, ctx: &Context, args: &ImportArgs) -> Result<()> {
    if !args.dir.is_dir() {
        return Err(Error::Config(format!(
            "path is not a directory: {}",
            args.dir.display()
        )));
    }
    validate_tags(&args.tags)?;

    let sources = import::discover(&args.dir, args.prefix.as_deref())?;
    eprintln!("Found {} files", sources.len());
    let docs = import::load(&sources);

    let mut writer = shelf.index.writer(WRITER_MEMORY_BUDGET)?;
    let outcome = import_docs(shelf, ctx, &writer, docs, &args.tags);
    // Documents stored before a failure must still reach the index.
    writer.commit()?;
    let (stored, failed) = outcome?;

    eprintln!();
    eprintln!("Imported {stored} documents ({failed} failed)");
    Ok(())
}

/// Store and index each document, returning (stored, failed) counts.
fn import_docs(
    shelf: &Shelf,
    ctx: &Context,
    writer: &IndexWriter,
    docs: Vec<Document>,
    tags: &[String],
) -> Result<(usize, usize)> {
    let mut pb = kdam::tqdm!(total = docs.len());
    let (mut stored, mut failed) = (0usize, 0usize);

    for doc in docs {
        let path = doc.path.clone();
        let title = doc.title.clone().unwrap_or_default();
        let content = doc.content.clone();

        match shelf.coordinator.put_doc(ctx, doc) {
            Ok(_) => {
                shelf.index.add_document(writer, &path, &title, &content)?;
                if !tags.is_empty() {
                    shelf.coordinator.tag_doc(ctx, &path, tags)?;
                }
                stored += 1;
            }
            // Orphans need an operator; stop rather than pile up more.
            Err(e) if e.leaves_orphan() => return Err(e),
            Err(e) => {
                warn!(path = %path, error = %e, "import failed");
                failed += 1;
            }
        }
        pb.update(1)?;
    }

    Ok((stored, failed))
}

fn cmd_status(shelf: &Shelf, ctx: &Context, json: bool) -> Result<()> {
    let documents = shelf.coordinator.list_docs::<&str>(ctx, "", &[])?.len();
    let tags = shelf.coordinator.list_tags(ctx)?.len();
    let limit = search_limit(&shelf.metadata)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "data_dir": shelf.data_dir.root(),
                "documents": documents,
                "tags": tags,
                "search_limit": limit,
            })
        );
    } else {
        println!("Data directory: {}", shelf.data_dir.root().display());
        println!("Documents: {documents}");
        println!("Tags: {tags}");
        println!("Search limit: {limit}");
    }
    Ok(())
}
