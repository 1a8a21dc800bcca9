use std::{path::PathBuf, process::ExitCode};

use anyhow::{bail, Context as _};
use clap::{Args, Parser, Subcommand};

use nrelay_core::{
    auth::Session,
    bootstrap,
    dispatch::{ChannelSelection, DispatchRequest},
    domain::Channel,
    errors::Error,
    recipients::parse_recipients_text,
};

use crate::App;

const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Parser)]
#[command(name = "nrelay", version, about = "Internal notification relay")]
pub struct Cli {
    /// Operator account used to authenticate the command.
    #[arg(long, short, env = "NRELAY_USER", global = true)]
    user: Option<String>,

    #[arg(long, env = "NRELAY_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create data directories, default templates and (optionally) the admin user.
    Init,
    /// Send a message to one or more recipients.
    Send(SendArgs),
    #[command(subcommand)]
    Users(UsersCommand),
    #[command(subcommand)]
    Recipients(RecipientsCommand),
    #[command(subcommand)]
    Templates(TemplatesCommand),
}

#[derive(Debug, Args)]
struct SendArgs {
    /// telegram, email, sms, or auto (route by address shape).
    #[arg(long, short, value_parser = parse_selection)]
    channel: ChannelSelection,

    /// Recipient address (repeatable).
    #[arg(long = "to")]
    to: Vec<String>,

    /// Send to every stored recipient of the channel.
    #[arg(long, conflicts_with = "to")]
    all: bool,

    #[arg(long, short)]
    template: Option<String>,

    #[arg(long, short)]
    message: String,
}

#[derive(Debug, Subcommand)]
enum UsersCommand {
    List,
    Add {
        username: String,
        #[arg(long, env = "NRELAY_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
    Delete {
        username: String,
    },
}

#[derive(Debug, Subcommand)]
enum RecipientsCommand {
    List {
        #[arg(value_parser = parse_channel)]
        channel: Channel,
    },
    /// Replace a channel's list with `label: address` lines from a file.
    Set {
        #[arg(value_parser = parse_channel)]
        channel: Channel,
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum TemplatesCommand {
    List,
    Show { name: String },
    Save {
        name: String,
        #[arg(long)]
        body: String,
    },
}

fn parse_channel(s: &str) -> Result<Channel, String> {
    s.parse::<Channel>().map_err(|e| e.to_string())
}

fn parse_selection(s: &str) -> Result<ChannelSelection, String> {
    if s.trim().eq_ignore_ascii_case("auto") {
        return Ok(ChannelSelection::Inferred);
    }
    parse_channel(s).map(ChannelSelection::Explicit)
}

pub async fn run(app: &App, cli: Cli) -> anyhow::Result<ExitCode> {
    let Cli {
        user,
        password,
        command,
    } = cli;
    let (user, password) = (user.as_deref(), password.as_deref());
    let session = move || login(app, user, password);

    match command {
        Command::Init => init(app).await,
        Command::Send(args) => send(app, &session().await?, args).await,
        Command::Users(cmd) => users(app, &session().await?, cmd).await,
        Command::Recipients(cmd) => {
            session().await?;
            recipients(app, cmd).await
        }
        Command::Templates(cmd) => {
            session().await?;
            templates(app, cmd).await
        }
    }
}

async fn init(app: &App) -> anyhow::Result<ExitCode> {
    let report = bootstrap::ensure_layout(&app.cfg, &app.files, &app.templates).await?;
    println!(
        "Data directory ready at {} (templates seeded: {}, recipient files created: {}, admin seeded: {})",
        app.cfg.data_dir.display(),
        report.seeded_templates,
        report.created_recipient_files,
        report.seeded_admin
    );
    Ok(ExitCode::SUCCESS)
}

async fn login(app: &App, user: Option<&str>, password: Option<&str>) -> anyhow::Result<Session> {
    let (Some(user), Some(password)) = (user, password) else {
        bail!("--user and --password (or NRELAY_USER / NRELAY_PASSWORD) are required");
    };
    match app.auth.login(user, password).await {
        Ok(session) => Ok(session),
        Err(Error::AuthDenied) => bail!("invalid username or password"),
        Err(e) => Err(e.into()),
    }
}

async fn send(app: &App, session: &Session, args: SendArgs) -> anyhow::Result<ExitCode> {
    let recipients = if args.all {
        let ChannelSelection::Explicit(channel) = args.channel else {
            bail!("--all needs an explicit channel");
        };
        app.recipients.addresses(channel).await?
    } else {
        args.to
    };

    let req = DispatchRequest {
        selection: args.channel,
        recipients,
        message: args.message,
        template: args.template,
        actor: session.username.clone(),
    };
    let outcome = app.dispatcher()?.dispatch(&req).await?;

    println!("{}", outcome.summary());
    if outcome.all_failed() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn users(app: &App, session: &Session, cmd: UsersCommand) -> anyhow::Result<ExitCode> {
    match cmd {
        UsersCommand::List => {
            for name in app.auth.list_users().await? {
                println!("{name}");
            }
        }
        UsersCommand::Add {
            username,
            new_password,
        } => {
            if new_password.chars().count() < MIN_PASSWORD_LEN {
                bail!("password must be at least {MIN_PASSWORD_LEN} characters");
            }
            app.auth.create_user(&username, &new_password).await?;
            println!("User {username} created");
        }
        UsersCommand::Delete { username } => {
            if username == session.username {
                bail!("cannot delete the user you are logged in as");
            }
            app.auth.delete_user(&username).await?;
            println!("User {username} deleted");
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn recipients(app: &App, cmd: RecipientsCommand) -> anyhow::Result<ExitCode> {
    match cmd {
        RecipientsCommand::List { channel } => {
            for entry in app.recipients.load(channel).await? {
                println!("{}: {}", entry.label, entry.address);
            }
        }
        RecipientsCommand::Set { channel, file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let entries = parse_recipients_text(&text);
            app.recipients.save(channel, &entries).await?;
            println!("Saved {} {channel} recipients", entries.len());
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn templates(app: &App, cmd: TemplatesCommand) -> anyhow::Result<ExitCode> {
    match cmd {
        TemplatesCommand::List => {
            for t in app.templates.all().await? {
                println!("{}: {}", t.name, t.body.lines().next().unwrap_or_default());
            }
        }
        TemplatesCommand::Show { name } => match app.templates.load(&name).await? {
            Some(t) => println!("{}", t.body),
            None => bail!("template not found: {name}"),
        },
        TemplatesCommand::Save { name, body } => {
            app.templates.save(&name, &body).await?;
            println!("Template {name} saved");
        }
    }
    Ok(ExitCode::SUCCESS)
}
