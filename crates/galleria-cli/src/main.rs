use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use galleria_contracts::chat::{parse_command, Turn, CHAT_HELP_COMMANDS};
use galleria_contracts::config::GalleryConfig;
use galleria_contracts::error::{truncate_text, ChatError};
use galleria_contracts::gallery::{ChatResult, GalleryItem};
use galleria_engine::{import_files, GalleryChat, GalleryRuntime, IngestReport};
use log::error;

const HISTORY_PREVIEW_CHARS: usize = 160;

#[derive(Debug, Parser)]
#[command(name = "galleria", version, about = "Chat with an image gallery")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Default, Args)]
struct GlobalArgs {
    /// JSON config file; `GALLERIA_*` variables and flags override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    index: Option<PathBuf>,
    #[arg(long, global = true)]
    collection: Option<String>,
    #[arg(long, global = true)]
    text_model: Option<String>,
    #[arg(long, global = true)]
    embedding_model: Option<String>,
    #[arg(long, global = true)]
    embedding_url: Option<String>,
    #[arg(long, global = true)]
    events: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat session.
    Chat,
    /// One turn in a fresh session.
    Ask(AskArgs),
    /// Add images to the gallery index.
    Ingest(IngestArgs),
    /// List gallery items, newest first.
    Gallery(GalleryArgs),
    /// Show one gallery item by path.
    Show(ShowArgs),
}

#[derive(Debug, Parser)]
struct AskArgs {
    #[arg(long)]
    image: Option<PathBuf>,
    #[arg(long)]
    json: bool,
    #[arg(trailing_var_arg = true)]
    text: Vec<String>,
}

#[derive(Debug, Parser)]
struct IngestArgs {
    /// Directory to ingest. Defaults to the configured image directory.
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Language for extracted tags and metadata.
    #[arg(long)]
    language: Option<String>,
    /// Files copied into the image directory before ingesting it.
    files: Vec<PathBuf>,
}

#[derive(Debug, Parser)]
struct GalleryArgs {
    #[arg(long)]
    limit: Option<usize>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Parser)]
struct ShowArgs {
    path: String,
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("galleria error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let mut config = GalleryConfig::load(cli.global.config.as_deref())?;
    apply_overrides(&mut config, &cli.global);
    if let Command::Ingest(args) = &cli.command {
        if let Some(language) = non_blank(args.language.as_deref()) {
            config.analysis_language = language;
        }
    }
    let runtime = GalleryRuntime::from_config(config)?;
    match cli.command {
        Command::Chat => {
            run_chat(&runtime)?;
            Ok(0)
        }
        Command::Ask(args) => run_ask(&runtime, args),
        Command::Ingest(args) => run_ingest(&runtime, args),
        Command::Gallery(args) => run_gallery(&runtime, args),
        Command::Show(args) => run_show(&runtime, args),
    }
}

fn apply_overrides(config: &mut GalleryConfig, global: &GlobalArgs) {
    if let Some(index) = &global.index {
        config.index_path = index.clone();
    }
    if let Some(collection) = non_blank(global.collection.as_deref()) {
        config.collection = collection;
    }
    if let Some(model) = non_blank(global.text_model.as_deref()) {
        config.text_model = model;
    }
    if let Some(model) = non_blank(global.embedding_model.as_deref()) {
        config.embedding_model = model;
    }
    if let Some(url) = non_blank(global.embedding_url.as_deref()) {
        config.embedding_base_url = Some(url);
    }
    if let Some(events) = &global.events {
        config.events_path = Some(events.clone());
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn run_chat(runtime: &GalleryRuntime) -> Result<()> {
    let chat = runtime.chat();
    let mut session = chat.create_session();
    let stdin = io::stdin();
    let mut line = String::new();

    println!(
        "Galleria chat started with {} and {}. Type /help for commands.",
        runtime.text_selection().model.name,
        runtime.embedding_selection().model.name
    );

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let command = parse_command(line.trim_end_matches(['\n', '\r']));
        match command.action.as_str() {
            "noop" => continue,
            "help" => println!("Commands: {}", CHAT_HELP_COMMANDS.join(" ")),
            "quit" => break,
            "new_session" => {
                chat.delete_session(&session);
                session = chat.create_session();
                println!("Started a new session.");
            }
            "clear_history" => match chat.clear_history(&session) {
                Ok(()) => println!("History cleared."),
                Err(err) => println!("{}", turn_failure_message(&err)),
            },
            "history" => match chat.session_history(&session) {
                Ok(turns) if turns.is_empty() => println!("No history yet."),
                Ok(turns) => {
                    for turn in &turns {
                        println!("{}", render_turn(turn));
                    }
                }
                Err(err) => println!("{}", turn_failure_message(&err)),
            },
            "gallery" => match runtime.gallery().items() {
                Ok(items) => print_items(&items),
                Err(err) => println!("Gallery unavailable: {err:#}"),
            },
            "show" => {
                let Some(path) = command.path.as_deref() else {
                    println!("/show requires a path");
                    continue;
                };
                match find_item(runtime, path) {
                    Ok(Some(item)) => println!("{}", render_item_details(&item)),
                    Ok(None) => println!("No gallery item at {path}"),
                    Err(err) => println!("Gallery unavailable: {err:#}"),
                }
            }
            "ingest" => {
                let dir = command
                    .path
                    .as_deref()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| runtime.config().image_dir.clone());
                match runtime.ingestor().ingest_directory(&dir) {
                    Ok(report) => println!("{}", render_report(&report)),
                    Err(err) => println!("Ingest failed: {err:#}"),
                }
            }
            "image_turn" => {
                let Some(path) = command.path.as_deref() else {
                    println!("/image requires a path");
                    continue;
                };
                let image = Path::new(path);
                if !image.exists() {
                    println!("Image not found: {}", image.display());
                    continue;
                }
                chat_turn(&chat, &session, command.text.as_deref(), Some(image));
            }
            "chat" => chat_turn(&chat, &session, command.text.as_deref(), None),
            _ => println!(
                "Unknown command: /{}. Type /help for commands.",
                command.text.as_deref().unwrap_or_default()
            ),
        }
    }
    chat.delete_session(&session);
    Ok(())
}

fn chat_turn(chat: &GalleryChat, session: &str, text: Option<&str>, image: Option<&Path>) {
    match chat.handle_turn(session, text, image) {
        Ok(result) => println!("{}", render_result(&result)),
        Err(err) => {
            error!("turn failed: {err}");
            println!("{}", turn_failure_message(&err));
        }
    }
}

/// What the user sees when a turn fails. Collaborator errors stay in the log.
fn turn_failure_message(err: &ChatError) -> String {
    match err {
        ChatError::InvalidInput(message) => message.clone(),
        ChatError::SessionNotFound(_) => {
            "This session has ended. Type /new to start another.".to_string()
        }
        ChatError::ExternalCall { .. } => {
            "Sorry, I couldn't complete that request. Please try again.".to_string()
        }
    }
}

fn run_ask(runtime: &GalleryRuntime, args: AskArgs) -> Result<i32> {
    let text = args.text.join(" ");
    let text = non_blank(Some(text.as_str()));
    if let Some(image) = &args.image {
        if !image.exists() {
            bail!("image not found: {}", image.display());
        }
    }
    let chat = runtime.chat();
    let session = chat.create_session();
    let result = chat.handle_turn(&session, text.as_deref(), args.image.as_deref());
    chat.delete_session(&session);
    let (code, output) = ask_output(result, args.json)?;
    if code == 0 {
        println!("{output}");
    } else {
        eprintln!("{output}");
    }
    Ok(code)
}

/// Exit code and text for a one-shot turn. Collaborator failures are logged
/// and replaced with generic text; input and session errors are shown as is.
fn ask_output(result: Result<ChatResult, ChatError>, json: bool) -> Result<(i32, String)> {
    match result {
        Ok(result) if json => Ok((0, serde_json::to_string_pretty(&result)?)),
        Ok(result) => Ok((0, render_result(&result))),
        Err(err) => {
            error!("ask failed: {err}");
            let message = match &err {
                ChatError::ExternalCall { .. } => turn_failure_message(&err),
                ChatError::InvalidInput(_) | ChatError::SessionNotFound(_) => err.to_string(),
            };
            Ok((1, message))
        }
    }
}

fn run_ingest(runtime: &GalleryRuntime, args: IngestArgs) -> Result<i32> {
    let dir = args
        .dir
        .unwrap_or_else(|| runtime.config().image_dir.clone());
    if !args.files.is_empty() {
        let copied = import_files(&args.files, &dir)?;
        println!("Copied {} file(s) into {}", copied.len(), dir.display());
    }
    let report = runtime.ingestor().ingest_directory(&dir)?;
    println!("{}", render_report(&report));
    Ok(if report.failed.is_empty() { 0 } else { 2 })
}

fn run_gallery(runtime: &GalleryRuntime, args: GalleryArgs) -> Result<i32> {
    let mut items = runtime.gallery().items()?;
    if let Some(limit) = args.limit {
        items.truncate(limit);
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        print_items(&items);
    }
    Ok(0)
}

fn run_show(runtime: &GalleryRuntime, args: ShowArgs) -> Result<i32> {
    let Some(item) = find_item(runtime, &args.path)? else {
        eprintln!("No gallery item at {}", args.path);
        return Ok(1);
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!("{}", render_item_details(&item));
    }
    Ok(0)
}

/// Accepts either the web form or the storage form of a path.
fn find_item(runtime: &GalleryRuntime, path: &str) -> Result<Option<GalleryItem>> {
    let gallery = runtime.gallery();
    if let Some(item) = gallery.item_by_path(path)? {
        return Ok(Some(item));
    }
    let web_path = gallery.path_mapper().to_web(path.trim());
    gallery.item_by_path(&web_path)
}

fn print_items(items: &[GalleryItem]) {
    if items.is_empty() {
        println!("The gallery is empty.");
        return;
    }
    for item in items {
        println!("{}", render_item_line(item));
    }
}

fn render_result(result: &ChatResult) -> String {
    let mut out = result.response.clone();
    if !result.paths.is_empty() {
        out.push_str("\n\nImages:");
        for path in &result.paths {
            out.push_str(&format!("\n  {path}"));
        }
    }
    if !result.combined_description.is_empty() {
        out.push_str(&format!("\n\nSummary: {}", result.combined_description));
    }
    out
}

fn render_turn(turn: &Turn) -> String {
    let speaker = match turn {
        Turn::Human(_) => "you",
        Turn::Ai(_) => "galleria",
    };
    let flattened = turn.content().split_whitespace().collect::<Vec<_>>().join(" ");
    format!("{speaker}: {}", truncate_text(&flattened, HISTORY_PREVIEW_CHARS))
}

fn render_item_line(item: &GalleryItem) -> String {
    if item.tags.is_empty() {
        return format!("{}  {}", item.id, item.path);
    }
    format!("{}  {}  [{}]", item.id, item.path, item.tags.join(", "))
}

fn render_item_details(item: &GalleryItem) -> String {
    let mut lines = vec![
        format!("Path: {}", item.path),
        format!("Description: {}", item.document),
    ];
    for (label, values) in [
        ("Tags", &item.tags),
        ("Color palette", &item.color_palette),
        ("Detected objects", &item.detected_objects),
        ("Use cases", &item.potential_use_cases),
    ] {
        if !values.is_empty() {
            lines.push(format!("{label}: {}", values.join(", ")));
        }
    }
    lines.join("\n")
}

fn render_report(report: &IngestReport) -> String {
    let mut out = format!(
        "Stored {}, skipped {}, failed {}.",
        report.stored.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for (path, message) in &report.failed {
        out.push_str(&format!("\n  {path}: {message}"));
    }
    out
}
