mod commands;
mod transcript;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use ragdesk_application::session::AcknowledgementKind;
use ragdesk_application::{SessionController, SessionEvent, SessionPhase};
use ragdesk_core::backend::UploadFile;
use ragdesk_core::conversation::Message;
use ragdesk_infrastructure::{ConfigService, ConversationStore, FileKeyValueStore, RagDeskPaths};
use ragdesk_interaction::HttpBackend;

use crate::commands::{COMMANDS, Command, parse, resolve_conversation};
use crate::transcript::{Chunk, Tone, Transcript};

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<(String, String)>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS
                .iter()
                .map(|(name, args)| (name.to_string(), args.to_string()))
                .collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|(name, _)| name.starts_with(line))
                .map(|(name, args)| Pair {
                    display: format!("{}{}", name, args),
                    replacement: name.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            // Completes the name, then shows the expected argument
            self.commands
                .iter()
                .find(|(name, _)| name.starts_with(line))
                .map(|(name, args)| format!("{}{}", &name[line.len()..], args))
                .filter(|hint| !hint.is_empty())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn paint(text: &str, tone: Tone) -> String {
    match tone {
        Tone::Answer => text.bright_blue().to_string(),
        Tone::User => text.green().to_string(),
        Tone::Success => text.bright_green().to_string(),
        Tone::Error => text.red().to_string(),
        Tone::Warning => text.yellow().to_string(),
        Tone::Info => text.bright_black().to_string(),
    }
}

fn write_chunks(chunks: Vec<Chunk>) {
    if chunks.is_empty() {
        return;
    }
    let mut stdout = std::io::stdout().lock();
    for chunk in chunks {
        let _ = match chunk {
            Chunk::Text(text, tone) => write!(stdout, "{}", paint(&text, tone)),
            Chunk::Newline => writeln!(stdout),
        };
    }
    let _ = stdout.flush();
}

/// Prints session events until the controller goes away.
async fn print_events(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    let mut transcript = Transcript::default();
    while let Some(event) = events.recv().await {
        let chunks = match event {
            SessionEvent::MessagesChanged {
                conversation_id,
                messages,
            } => transcript.messages(conversation_id.as_deref(), &messages),
            SessionEvent::SideChannelChanged(feed) => transcript.feed(&feed),
            SessionEvent::PhaseChanged(SessionPhase::Idle) => transcript.settle(),
            SessionEvent::Acknowledgement { kind, text } => {
                let tone = match kind {
                    AcknowledgementKind::Success => Tone::Success,
                    AcknowledgementKind::Error => Tone::Error,
                };
                transcript.notice(text, tone)
            }
            _ => Vec::new(),
        };
        write_chunks(chunks);
    }
}

fn print_history(messages: &[Message]) {
    for message in messages {
        let tone = Tone::of(message);
        let prefix = if tone == Tone::User { "> " } else { "" };
        println!("{}", paint(&format!("{}{}", prefix, message.text()), tone));
    }
}

fn print_help() {
    let lines = [
        "Type a question to ask it, or use a command:",
        "  /new                 start a new conversation",
        "  /list                list conversations",
        "  /open <n|id>         open a conversation",
        "  /delete <n|id>       delete a conversation",
        "  /search <prefix>     find conversations by title",
        "  /docs                list indexed documents",
        "  /rmdoc <filename>    delete a document",
        "  /upload <path>       upload a .pdf, .md or .zip file",
        "  /tasks               show processing tasks",
        "  /ingest              re-ingest all documents",
        "  quit                 exit",
    ];
    for line in lines {
        println!("{}", line.bright_black());
    }
}

fn build_controller() -> Result<(Arc<SessionController>, mpsc::UnboundedReceiver<SessionEvent>)> {
    let config_service = ConfigService::default_location()?;
    let config = config_service
        .load()
        .with_context(|| format!("Failed to load {}", config_service.path().display()))?;

    let store_dir = RagDeskPaths::store_dir(config.data_dir.as_ref())?;
    tracing::info!("Using store at {:?}", store_dir);
    let repository = Arc::new(ConversationStore::new(Arc::new(FileKeyValueStore::new(store_dir))));
    let backend = Arc::new(HttpBackend::from_config(&config)?);
    tracing::info!("Backend at {}", backend.base_url());

    let (controller, events) = SessionController::new(backend, repository, &config);
    Ok((Arc::new(controller), events))
}

async fn upload_from_path(controller: &SessionController, path: &str) -> Result<()> {
    let path = Path::new(path);
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file: {}", path.display()))?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    controller.upload(UploadFile::new(file_name, bytes)).await?;
    Ok(())
}

/// Runs a slow operation in the background so the prompt stays usable.
fn spawn_reported<F>(future: F)
where
    F: std::future::Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = future.await {
            eprintln!("{}", format!("Error: {:#}", e).red());
        }
    });
}

/// The main entry point for the RagDesk readline REPL.
///
/// Questions and uploads run as background tasks; their output arrives
/// through the session event channel and is printed by a dedicated task.
#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let (controller, events) = build_controller()?;
    let printer = tokio::spawn(print_events(events));
    controller.init().await;

    let helper = CliHelper::new();
    let mut rl = Editor::new()?;
    rl.set_helper(Some(helper));

    println!("{}", "=== RagDesk ===".bright_magenta().bold());
    println!(
        "{}",
        "Ask a question, type '/help' for commands, or 'quit' to exit.".bright_black()
    );
    println!();

    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match parse(&line) {
                    Command::Quit => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Command::Send(text) => {
                        let controller = Arc::clone(&controller);
                        let text = text.to_string();
                        spawn_reported(async move { Ok(controller.send(&text).await?) });
                    }
                    Command::New => {
                        controller.new_conversation().await;
                        println!("{}", "Started a new conversation.".bright_black());
                    }
                    Command::List => {
                        let conversations = controller.conversations().await;
                        if conversations.is_empty() {
                            println!("{}", "No conversations yet.".bright_black());
                        }
                        for (index, conversation) in conversations.iter().enumerate() {
                            println!(
                                "{} {}",
                                format!("{:>3}.", index + 1).bright_black(),
                                conversation.title
                            );
                        }
                    }
                    Command::Search(query) => {
                        for conversation in controller.search(query).await {
                            println!("{} {}", conversation.id.bright_black(), conversation.title);
                        }
                    }
                    Command::Open(reference) => {
                        let conversations = controller.conversations().await;
                        let opened = match resolve_conversation(&conversations, reference) {
                            Some(id) => controller.open_conversation(&id).await,
                            None => {
                                println!("{}", format!("No conversation '{}'", reference).yellow());
                                continue;
                            }
                        };
                        match opened {
                            Ok(()) => print_history(&controller.snapshot().await.messages),
                            Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                        }
                    }
                    Command::Delete(reference) => {
                        let conversations = controller.conversations().await;
                        match resolve_conversation(&conversations, reference) {
                            Some(id) => match controller.delete_conversation(&id).await {
                                Ok(()) => println!("{}", "Conversation deleted.".bright_black()),
                                Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                            },
                            None => {
                                println!("{}", format!("No conversation '{}'", reference).yellow())
                            }
                        }
                    }
                    Command::Docs => match controller.refresh_documents().await {
                        Ok(documents) if documents.is_empty() => {
                            println!("{}", "No documents indexed.".bright_black())
                        }
                        Ok(documents) => {
                            for document in documents {
                                println!("  {}", document);
                            }
                        }
                        Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                    },
                    Command::RemoveDocument(filename) => {
                        let controller = Arc::clone(&controller);
                        let filename = filename.to_string();
                        // Outcome is reported through the acknowledgement event
                        tokio::spawn(async move {
                            let _ = controller.delete_document(&filename).await;
                        });
                    }
                    Command::Upload(path) => {
                        let controller = Arc::clone(&controller);
                        let path = path.to_string();
                        spawn_reported(async move { upload_from_path(&controller, &path).await });
                    }
                    Command::Tasks => match controller.upload_tasks().await {
                        Ok(tasks) if tasks.is_empty() => {
                            println!("{}", "No tasks.".bright_black())
                        }
                        Ok(tasks) => {
                            let mut tasks: Vec<_> = tasks.into_iter().collect();
                            tasks.sort_by(|a, b| a.0.cmp(&b.0));
                            for (id, status) in tasks {
                                println!("  {} {}", id.bright_black(), status.describe());
                            }
                        }
                        Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                    },
                    Command::Ingest => {
                        let controller = Arc::clone(&controller);
                        tokio::spawn(async move {
                            let _ = controller.ingest_documents().await;
                        });
                    }
                    Command::Help => print_help(),
                    Command::Usage(usage) => {
                        println!("{}", format!("Usage: {}", usage).yellow())
                    }
                    Command::Unknown(name) => {
                        println!("{}", format!("Unknown command {}", name).bright_black())
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    // Background flows may still hold the controller
    printer.abort();
    Ok(())
}
