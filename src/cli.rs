// src/cli.rs
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::core::clipboard::{ClipboardWriter, CommandClipboard};
use crate::core::{
    AppConfig, ConfigManager, CvSession, Destination, Effect, FileStore, HtmlFileRenderer,
    ItemEdit, ListName, Operation, PersonalField, RemoteCvClient, SaveStatus, SessionOptions,
};
use crate::error::CvError;
use crate::types::TemplateId;

#[derive(Parser)]
#[command(name = "cvbuild")]
#[command(about = "Build, save and share an INTOWORK CV")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Bearer token; when set the CV lives on the INTOWORK backend
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Directory holding the local copy for anonymous use
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show the current CV
    Show {
        /// Print the raw document as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a personal field (firstName, lastName, email, phone, address, title, summary, photo)
    Set {
        field: String,
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Append a blank item to experiences, educations, skills or languages
    Add { list: ListName },
    /// Change one field of a list item
    Update {
        list: ListName,
        id: String,
        field: String,
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Remove a list item
    Remove { list: ListName, id: String },
    /// Select the print template
    Template { id: String },
    /// List available templates
    Templates,
    /// Start over with an empty CV
    Reset,
    /// Save a JSON snapshot of the CV
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace the CV with a JSON snapshot
    Import { path: PathBuf },
    /// Render the printable HTML document and open it for printing
    Print {
        /// Only write the file, do not open a browser
        #[arg(long)]
        no_open: bool,
    },
    /// Toggle public visibility and show the share link
    Share {
        /// Copy the link to the clipboard
        #[arg(long)]
        copy: bool,
    },
    /// Show view and download counters
    Analytics,
    /// Show the save indicator
    Status,
    /// Interactive editing with autosave
    Edit,
}

impl Command {
    /// Commands that change the document and need a save before exit
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::Set { .. }
                | Self::Add { .. }
                | Self::Update { .. }
                | Self::Remove { .. }
                | Self::Template { .. }
                | Self::Reset
                | Self::Import { .. }
        )
    }

    /// The editor operation behind a command, if it is a plain edit
    pub fn operation(&self) -> Result<Option<Operation>, CvError> {
        let op = match self {
            Self::Set { field, value } => Operation::UpdateField {
                field: field.parse::<PersonalField>()?,
                value: value.join(" "),
            },
            Self::Add { list } => Operation::AddItem(*list),
            Self::Update {
                list,
                id,
                field,
                value,
            } => Operation::UpdateItem {
                id: id.clone(),
                edit: ItemEdit::parse(*list, field, &value.join(" "))?,
            },
            Self::Remove { list, id } => Operation::RemoveItem {
                list: *list,
                id: id.clone(),
            },
            Self::Template { id } => Operation::SetTemplate(id.clone()),
            Self::Reset => Operation::Reset,
            _ => return Ok(None),
        };
        Ok(Some(op))
    }
}

/// Open a session in remote mode when a token is configured, local otherwise
pub async fn open_session(config: &AppConfig) -> Result<CvSession> {
    let token = config.token.as_deref().filter(|_| config.is_authenticated());
    let destination = match token {
        Some(token) => {
            info!("Signed in, using remote CV at {}", config.api_url);
            let client =
                RemoteCvClient::new(&config.api_url, token, config.request_timeout_secs)?;
            Destination::remote(Arc::new(client))
        }
        None => {
            info!("Anonymous, using local copy in {}", config.data_dir.display());
            Destination::local(Arc::new(FileStore::new(config.data_dir.clone())))
        }
    };

    let options = SessionOptions {
        quiet_period: config.quiet_period(),
        site_origin: config.site_origin.clone(),
    };
    Ok(CvSession::open(destination, options).await)
}

pub async fn handle_cli(cli: Cli, mut config: AppConfig) -> Result<()> {
    if cli.token.is_some() {
        config.token = cli.token;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    ConfigManager::ensure_directories(&config).await?;

    if cli.command == Command::Templates {
        print_templates();
        return Ok(());
    }

    let mut session = open_session(&config).await?;
    if let Some(warning) = session.hydrate_warning() {
        eprintln!("warning: could not load your saved CV ({}), starting empty", warning);
    }

    if cli.command == Command::Edit {
        return crate::repl::run(session, &config).await;
    }

    let mutating = cli.command.is_mutating();
    let label = if session.is_remote() { "remote" } else { "local" };
    let result = execute(&mut session, cli.command, &config).await;
    let saved = finish(session, mutating && result.is_ok()).await;

    result?;
    saved?;
    if mutating {
        println!("Saved ({})", label);
    }
    Ok(())
}

/// Write what a command changed, then stop the session. A reset local copy
/// stays erased and a CV that failed to load is never overwritten.
pub async fn finish(mut session: CvSession, save: bool) -> Result<(), CvError> {
    let saved = if save { session.flush().await } else { Ok(()) };
    session.close().await;
    saved
}

/// Run one command against a live session, printing its outcome
pub async fn execute(
    session: &mut CvSession,
    command: Command,
    config: &AppConfig,
) -> Result<(), CvError> {
    if let Some(op) = command.operation()? {
        let effect = session.dispatch(op);
        match effect {
            Effect::Added(id) => println!("{}", id),
            Effect::Cleared => println!("CV reset"),
            Effect::Rejected(reason) => {
                return Err(CvError::InvalidValue {
                    field: "template".to_string(),
                    reason,
                })
            }
            Effect::Schedule => {}
        }
        if let Command::Set { field, .. } = &command {
            print_field_warning(session, field);
        }
        return Ok(());
    }

    match command {
        Command::Show { json } => {
            if json {
                let text = serde_json::to_string_pretty(session.data())
                    .map_err(|e| CvError::InvalidValue {
                        field: "cvData".to_string(),
                        reason: e.to_string(),
                    })?;
                println!("{}", text);
            } else {
                print_summary(session);
            }
        }
        Command::Templates => print_templates(),
        Command::Export { out } => {
            let path = match out {
                Some(path) => {
                    session.export_to_file(&session.export(), &path).await?;
                    path
                }
                None => session.export_to_dir(&config.output_dir).await?,
            };
            println!("Exported to {}", path.display());
        }
        Command::Import { path } => {
            session.import_file(&path).await?;
            println!("Imported {}", path.display());
        }
        Command::Print { no_open } => {
            let renderer = HtmlFileRenderer::new(config.output_dir.clone())
                .open_in_browser(config.open_browser && !no_open);
            if let Some(path) = session.print(&renderer)? {
                println!("Printable CV: {}", path.display());
            }
        }
        Command::Share { copy } => {
            let visibility = session.toggle_public().await?.clone();
            if !visibility.is_public {
                println!("CV is now private");
            } else {
                match session.share_url() {
                    Some(url) => println!("CV is now public: {}", url),
                    None => println!("CV is now public, waiting for a share link"),
                }
                if copy {
                    let clipboard = clipboard(config)?;
                    let url = session.copy_share_url(clipboard.as_ref())?;
                    println!("Copied {}", url);
                }
            }
        }
        Command::Analytics => {
            let analytics = session.analytics().await?;
            println!("Views: {}  Downloads: {}", analytics.views, analytics.downloads);
        }
        Command::Status => println!("{}", describe_status(&session.current_status())),
        Command::Edit => println!("Already editing"),
        // plain edits are handled above
        _ => {}
    }
    Ok(())
}

fn clipboard(config: &AppConfig) -> Result<Box<dyn ClipboardWriter>, CvError> {
    config
        .clipboard_command
        .as_ref()
        .map(|cmd| Box::new(CommandClipboard::new(cmd.clone())) as Box<dyn ClipboardWriter>)
        .ok_or_else(|| {
            CvError::Clipboard("no clipboard command configured (set INTOWORK_CLIPBOARD)".to_string())
        })
}

pub fn describe_status(status: &SaveStatus) -> String {
    match status {
        SaveStatus::Idle => "Up to date".to_string(),
        SaveStatus::Pending => "Unsaved changes".to_string(),
        SaveStatus::Saving => "Saving...".to_string(),
        SaveStatus::Saved { at } => format!("Saved at {}", at.format("%H:%M:%S")),
        SaveStatus::Failed { message } => message.clone(),
    }
}

fn print_field_warning(session: &CvSession, field: &str) {
    if let Ok(field) = field.parse::<PersonalField>() {
        if let Some(message) = session.errors().get(field.as_str()) {
            eprintln!("warning: {}", message);
        }
    }
}

fn print_templates() {
    for template in TemplateId::ALL {
        println!(
            "{:<10} {:<10} {}",
            template.as_str(),
            template.display_name(),
            template.description()
        );
    }
}

fn print_summary(session: &CvSession) {
    let cv = session.data();
    let info = &cv.personal_info;
    let name = cv.full_name();

    println!("{}", if name.is_empty() { "(no name)" } else { name.as_str() });
    if !info.title.is_empty() {
        println!("{}", info.title);
    }
    println!(
        "Template: {} | Completion: {}% | Storage: {}",
        session.template(),
        cv.completion(),
        if session.is_remote() { "remote" } else { "local" }
    );
    if let Some(url) = session.share_url() {
        println!("Public link: {}", url);
    }

    for (label, value) in [
        ("Email", &info.email),
        ("Phone", &info.phone),
        ("Address", &info.address),
    ] {
        if !value.is_empty() {
            println!("{}: {}", label, value);
        }
    }

    if !cv.experiences.is_empty() {
        println!("\nExperiences:");
        for exp in &cv.experiences {
            let end = exp.display_end_date().unwrap_or("present");
            println!(
                "  [{}] {} @ {} ({} - {})",
                exp.id, exp.position, exp.company, exp.start_date, end
            );
        }
    }
    if !cv.educations.is_empty() {
        println!("\nEducation:");
        for edu in &cv.educations {
            println!(
                "  [{}] {} {} @ {} ({} - {})",
                edu.id, edu.degree, edu.field, edu.school, edu.start_date, edu.end_date
            );
        }
    }
    if !cv.skills.is_empty() {
        println!("\nSkills:");
        for skill in &cv.skills {
            println!("  [{}] {} {}/5", skill.id, skill.name, skill.level);
        }
    }
    if !cv.languages.is_empty() {
        println!("\nLanguages:");
        for language in &cv.languages {
            println!("  [{}] {} {}", language.id, language.name, language.level);
        }
    }

    if !session.errors().is_empty() {
        println!();
        for (field, message) in session.errors().iter() {
            println!("warning: {}: {}", field, message);
        }
    }
}
