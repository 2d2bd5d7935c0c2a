//! Subcommands and their handlers

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use marknote_client::{AiTask, Callbacks, MarknoteClient, NoteQuery, SessionOutcome};
use marknote_core::{
    ChatKind, ChatRequest, LoginRequest, Note, NoteCreateRequest, NoteUpdateRequest,
    RegisterRequest,
};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and store the credentials
    Login {
        username: String,

        #[arg(short, long, env = "MARKNOTE_PASSWORD", hide_env_values = true)]
        password: String,

        /// Ask for a long-lived session
        #[arg(long)]
        remember: bool,
    },

    /// Create an account and sign in
    Register {
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "MARKNOTE_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(short, long)]
        nickname: Option<String>,
    },

    /// Sign out and forget the stored credentials
    Logout,

    /// Ask the assistant a question
    Chat {
        message: String,

        /// Continue an existing conversation
        #[arg(long)]
        conversation: Option<String>,

        /// Extra context, such as the note being edited
        #[arg(long)]
        context: Option<String>,

        #[arg(long)]
        no_stream: bool,
    },

    /// Rewrite text more clearly
    Enhance {
        #[command(flatten)]
        input: TextInput,

        #[arg(long)]
        no_stream: bool,
    },

    /// Summarize text
    Summarize {
        #[command(flatten)]
        input: TextInput,

        #[arg(long)]
        no_stream: bool,
    },

    /// Translate text
    Translate {
        text: String,

        /// Target language
        #[arg(long, default_value = "en")]
        to: String,
    },

    /// Show the conversation history
    Conversations,

    /// Delete the conversation history
    ClearConversations,

    /// Manage notes
    #[command(subcommand)]
    Notes(NotesCommand),
}

#[derive(Subcommand, Debug)]
pub enum NotesCommand {
    /// List notes page by page
    List {
        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "20")]
        size: u32,

        #[arg(long)]
        keyword: Option<String>,

        #[arg(long)]
        folder: Option<i64>,
    },

    /// Print one note
    Get { id: i64 },

    /// Create a note
    Create {
        #[arg(short, long)]
        title: String,

        #[command(flatten)]
        input: OptionalTextInput,

        #[arg(long)]
        tags: Option<String>,

        #[arg(long)]
        folder: Option<i64>,

        #[arg(long)]
        public: bool,
    },

    /// Change a note's title or content
    Update {
        id: i64,

        #[arg(short, long)]
        title: Option<String>,

        #[command(flatten)]
        input: OptionalTextInput,

        #[arg(long)]
        tags: Option<String>,
    },

    /// Delete a note
    Delete { id: i64 },

    /// Search notes by keyword
    Search { keyword: String },

    /// Star or unstar a note
    Star { id: i64 },

    /// List starred notes
    Starred,

    /// List recently updated notes
    Recent {
        #[arg(long)]
        limit: Option<u32>,
    },
}

/// Text given inline or read from a file
#[derive(Args, Debug)]
pub struct TextInput {
    #[arg(required_unless_present = "file")]
    text: Option<String>,

    /// Read the text from a file
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,
}

impl TextInput {
    fn read(self) -> Result<String> {
        match (self.text, self.file) {
            (Some(text), _) => Ok(text),
            (None, Some(path)) => std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display())),
            (None, None) => bail!("no text given"),
        }
    }
}

/// Optional note body, inline or from a file
#[derive(Args, Debug)]
pub struct OptionalTextInput {
    #[arg(short, long)]
    content: Option<String>,

    /// Read the content from a file
    #[arg(short, long, conflicts_with = "content")]
    file: Option<PathBuf>,
}

impl OptionalTextInput {
    fn read(self) -> Result<Option<String>> {
        match (self.content, self.file) {
            (Some(content), _) => Ok(Some(content)),
            (None, Some(path)) => std::fs::read_to_string(&path)
                .map(Some)
                .with_context(|| format!("failed to read {}", path.display())),
            (None, None) => Ok(None),
        }
    }
}

/// Run one command
pub async fn run(command: Command, client: &MarknoteClient) -> Result<()> {
    match command {
        Command::Login {
            username,
            password,
            remember,
        } => {
            let request = LoginRequest {
                username,
                password,
                remember_me: remember,
            };
            let jwt = client.auth().login(&request).await?;
            println!("Logged in as {}", jwt.username.as_deref().unwrap_or(&request.username));
        }
        Command::Register {
            username,
            email,
            password,
            nickname,
        } => {
            let request = RegisterRequest {
                username,
                email,
                password,
                nickname,
            };
            client.auth().register(&request).await?;
            println!("Registered and logged in as {}", request.username);
        }
        Command::Logout => {
            client.auth().logout().await?;
            println!("Logged out");
        }
        Command::Chat {
            message,
            conversation,
            context,
            no_stream,
        } => {
            let mut request = ChatRequest::new(message).with_kind(ChatKind::Chat);
            if let Some(id) = conversation {
                request = request.with_conversation(id);
            }
            if let Some(context) = context {
                request = request.with_context(context);
            }

            if no_stream {
                let body = client.ai().chat(&request).await?;
                print_text(body.get("data").and_then(|d| d.get("response")).unwrap_or(&body));
            } else {
                stream(client, AiTask::Chat(request)).await?;
            }
        }
        Command::Enhance { input, no_stream } => {
            let text = input.read()?;
            if no_stream {
                print_text(&data_of(client.ai().enhance_text(text).await?));
            } else {
                stream(client, AiTask::Enhance(text)).await?;
            }
        }
        Command::Summarize { input, no_stream } => {
            let text = input.read()?;
            if no_stream {
                print_text(&data_of(client.ai().summarize_content(text).await?));
            } else {
                stream(client, AiTask::Summarize(text)).await?;
            }
        }
        Command::Translate { text, to } => {
            print_text(&data_of(client.ai().translate_text(&text, &to).await?));
        }
        Command::Conversations => {
            let history = client.ai().get_conversations().await?;
            if history.is_empty() {
                println!("No conversations");
            }
            for entry in history {
                let when = entry
                    .timestamp
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!("[{}] {}", when, entry.conversation_id.as_deref().unwrap_or("-"));
                println!("  you: {}", entry.message);
                println!("  ai:  {}", entry.response);
            }
        }
        Command::ClearConversations => {
            client.ai().clear_conversations().await?;
            println!("Conversation history cleared");
        }
        Command::Notes(command) => run_notes(command, client).await?,
    }

    Ok(())
}

async fn run_notes(command: NotesCommand, client: &MarknoteClient) -> Result<()> {
    let notes = client.notes();

    match command {
        NotesCommand::List {
            page,
            size,
            keyword,
            folder,
        } => {
            let query = NoteQuery {
                page,
                size,
                keyword,
                folder_id: folder,
            };
            let result = notes.get_notes(&query).await?;
            print_notes(&result.records);
            println!(
                "page {}/{} ({} notes)",
                result.current,
                result.pages.max(1),
                result.total
            );
        }
        NotesCommand::Get { id } => {
            let note = notes.get_note(id).await?;
            println!("# {}", note.title);
            if let Some(tags) = note.tags.as_deref().filter(|t| !t.is_empty()) {
                println!("tags: {}", tags);
            }
            println!();
            println!("{}", note.content);
        }
        NotesCommand::Create {
            title,
            input,
            tags,
            folder,
            public,
        } => {
            let request = NoteCreateRequest {
                title,
                content: input.read()?,
                folder_id: folder,
                tags,
                is_public: public.then_some(true),
            };
            let note = notes.create_note(&request).await?;
            println!("Created note {}", note.id);
        }
        NotesCommand::Update {
            id,
            title,
            input,
            tags,
        } => {
            let update = NoteUpdateRequest {
                title,
                content: input.read()?,
                tags,
                ..NoteUpdateRequest::default()
            };
            let note = notes.update_note(id, &update).await?;
            println!("Updated note {}", note.id);
        }
        NotesCommand::Delete { id } => {
            notes.delete_note(id).await?;
            println!("Deleted note {}", id);
        }
        NotesCommand::Search { keyword } => print_notes(&notes.search_notes(&keyword).await?),
        NotesCommand::Star { id } => {
            notes.toggle_star(id).await?;
            println!("Toggled star on note {}", id);
        }
        NotesCommand::Starred => print_notes(&notes.get_starred_notes().await?),
        NotesCommand::Recent { limit } => print_notes(&notes.get_recent_notes(limit).await?),
    }

    Ok(())
}

/// Stream a task to stdout; Ctrl-C stops it
async fn stream(client: &MarknoteClient, task: AiTask) -> Result<()> {
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            watcher.cancel();
        }
    });

    let mut failure: Option<String> = None;
    let outcome = {
        let mut stdout = std::io::stdout();
        let mut sink = Callbacks::new(
            |text: &str| {
                let _ = write!(stdout, "{}", text);
                let _ = stdout.flush();
            },
            || println!(),
            |message: &str| failure = Some(message.to_string()),
        );
        client.ai().stream(task, &mut sink, &cancel).await
    };
    interrupt.abort();

    debug!("Stream outcome: {}", outcome.label());
    match outcome {
        SessionOutcome::Completed => Ok(()),
        SessionOutcome::Cancelled => {
            println!();
            bail!("interrupted")
        }
        SessionOutcome::Failed | SessionOutcome::Unavailable => {
            bail!(failure.unwrap_or_else(|| "request failed".to_string()))
        }
    }
}

fn data_of(body: Value) -> Value {
    match body {
        Value::Object(mut map) => map.remove("data").unwrap_or(Value::Object(map)),
        other => other,
    }
}

fn print_text(value: &Value) {
    match value {
        Value::String(text) => println!("{}", text),
        Value::Null => {}
        other => println!(
            "{}",
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
        ),
    }
}

fn print_notes(notes: &[Note]) {
    if notes.is_empty() {
        println!("No notes");
        return;
    }
    for note in notes {
        let star = if note.is_starred { "*" } else { " " };
        let updated = note
            .updated_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("{:>6} {} {:<40} {}", note.id, star, note.title, updated);
    }
}
