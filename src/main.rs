//! Terminal front end for the document wizard.
//!
//! Usage:
//!   docwizard key save <TOKEN>
//!   docwizard fields --prompt "Invoice for client X"
//!   docwizard document --prompt "Invoice for client X" --data values.json --print
//!   docwizard run

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docwizard::clients::OpenAiClient;
use docwizard::config::{Config, RuntimeConfig};
use docwizard::credentials::{CredentialStore, FileCredentialStore};
use docwizard::export;
use docwizard::generators;
use docwizard::schemas::{FormData, InputKind};
use docwizard::{Step, Transition, WizardSession};

#[derive(Parser)]
#[command(name = "docwizard", version)]
#[command(about = "Generate formal documents from a description via a completion endpoint", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the saved API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// Generate the field list for a document description and print it as JSON
    Fields {
        /// Free-text description of the document
        #[arg(long)]
        prompt: String,
    },
    /// Generate the document from a description and a JSON object of field values
    Document {
        /// Free-text description of the document
        #[arg(long)]
        prompt: String,

        /// JSON file with field values ("-" reads stdin)
        #[arg(long, value_name = "FILE")]
        data: PathBuf,

        /// Output directory (defaults to export.output_dir)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Also write a print-ready copy
        #[arg(long)]
        print: bool,
    },
    /// Run the three-step wizard interactively
    Run {
        /// Output directory (defaults to export.output_dir)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Save the API key for later sessions
    Save { token: String },
    /// Forget the saved API key
    Clear,
    /// Show whether an API key is saved
    Status,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    Config::load_env_file();
    let runtime = RuntimeConfig::load_from_env();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&runtime.log_level))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("load configuration")?;

    let client = OpenAiClient::from_config(&config.completion)?;
    let store = FileCredentialStore::new(&config.storage.path);
    info!(model = client.model(), store = %store.path().display(), "docwizard starting");
    let mut session = WizardSession::new(Arc::new(client), Arc::new(store));

    match cli.command {
        Commands::Key { action } => key(&mut session, action),
        Commands::Fields { prompt } => fields(&mut session, prompt).await,
        Commands::Document {
            prompt,
            data,
            out,
            print,
        } => {
            let out = out.unwrap_or_else(|| config.export.output_dir.clone());
            document(&config, &prompt, &data, &out, print).await
        }
        Commands::Run { out } => {
            let out = out.unwrap_or_else(|| config.export.output_dir.clone());
            run(&mut session, &out).await
        }
    }
}

fn key(session: &mut WizardSession, action: KeyAction) -> Result<()> {
    match action {
        KeyAction::Save { token } => {
            session.save_credential(&token)?;
            println!("API key saved.");
        }
        KeyAction::Clear => {
            session.clear_credential()?;
            println!("API key cleared.");
        }
        KeyAction::Status => match session.credential() {
            Some(cred) => println!("API key saved ({}).", cred.masked()),
            None => println!("No API key saved."),
        },
    }
    Ok(())
}

async fn fields(session: &mut WizardSession, prompt: String) -> Result<()> {
    session.set_document_prompt(prompt);
    match session.submit_description().await {
        Transition::Advanced(_) => {
            let schema = session
                .state()
                .field_schema()
                .ok_or_else(|| anyhow!("field schema missing after step 1"))?;
            println!("{}", serde_json::to_string_pretty(schema)?);
            Ok(())
        }
        Transition::Failed { message, .. } => Err(anyhow!(message)),
        Transition::Inert | Transition::Stale => Err(anyhow!("wizard is busy")),
    }
}

/// Non-interactive step 2 → 3 from a values file
async fn document(config: &Config, prompt: &str, data: &Path, out: &Path, print: bool) -> Result<()> {
    let raw = if data == Path::new("-") {
        io::read_to_string(io::stdin()).context("read field values from stdin")?
    } else {
        std::fs::read_to_string(data).with_context(|| format!("read {}", data.display()))?
    };
    let form_data = parse_form_values(&raw)?;

    let client = OpenAiClient::from_config(&config.completion)?;
    let credential = FileCredentialStore::new(&config.storage.path).load()?;
    let markup =
        generators::generate_document(&client, credential.as_ref(), prompt, &form_data).await?;

    write_outputs(&markup, out, print)
}

/// Accepts a flat JSON object; non-string scalars are kept in their JSON spelling.
fn parse_form_values(raw: &str) -> Result<FormData> {
    let value: Value = serde_json::from_str(raw).context("parse field values as JSON")?;
    let Value::Object(map) = value else {
        return Err(anyhow!("field values must be a JSON object"));
    };
    Ok(map
        .into_iter()
        .map(|(name, value)| match value {
            Value::String(s) => (name, s),
            Value::Null => (name, String::new()),
            other => (name, other.to_string()),
        })
        .collect())
}

fn write_outputs(markup: &str, out: &Path, print: bool) -> Result<()> {
    let path = export::write_download(markup, out)?;
    println!("Document written to {}", path.display());
    if print {
        let print_path = export::write_print_shell(markup, out)?;
        println!("Print version written to {}", print_path.display());
    }
    Ok(())
}

/// Typed in place of a description or a field value to replace the saved key.
const KEY_COMMAND: &str = ":key";

async fn run(session: &mut WizardSession, out: &Path) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    loop {
        if session.credential().is_none() {
            let Some(token) = ask(&mut input, "OpenAI API key: ")? else {
                return Ok(());
            };
            if let Err(e) = session.save_credential(&token) {
                eprintln!("{}", e);
            }
            continue;
        }

        match session.state().step() {
            Step::Description => {
                println!(
                    "Step 1/3: describe the document (finish with an empty line, {} changes the API key)",
                    KEY_COMMAND
                );
                let Some(text) = ask_block(&mut input)? else {
                    return Ok(());
                };
                if text.trim() == KEY_COMMAND {
                    if !replace_key(session, &mut input)? {
                        return Ok(());
                    }
                    continue;
                }
                session.set_document_prompt(text);
                println!("Generating field list...");
                report(session.submit_description().await);
            }
            Step::FormEntry => {
                println!(
                    "Step 2/3: enter the data (empty input keeps the current value, {} changes the API key)",
                    KEY_COMMAND
                );
                let fields = session.state().field_schema().cloned().unwrap_or_default();
                let mut change_key = false;
                for field in &fields {
                    let current = session.state().field_value(&field.name).to_string();
                    let hint = match field.input_kind() {
                        InputKind::Date => " (YYYY-MM-DD)".to_string(),
                        InputKind::Text => field
                            .kind
                            .as_ref()
                            .map(|k| format!(" ({})", k))
                            .unwrap_or_default(),
                    };
                    let label = if current.is_empty() {
                        format!("{}{}: ", field.name, hint)
                    } else {
                        format!("{}{} [{}]: ", field.name, hint, current)
                    };
                    let Some(value) = ask(&mut input, &label)? else {
                        return Ok(());
                    };
                    if value == KEY_COMMAND {
                        change_key = true;
                        break;
                    }
                    if !value.is_empty() {
                        session.set_field_value(field.name.clone(), value);
                    }
                }
                if change_key {
                    if !replace_key(session, &mut input)? {
                        return Ok(());
                    }
                    continue;
                }
                println!("Generating document...");
                report(session.submit_form().await);
            }
            Step::Result => {
                let markup = session.state().document_markup().unwrap_or_default().to_string();
                println!("Step 3/3: document ready");
                write_outputs(&markup, out, true)?;
                let again = ask(&mut input, "Clear the data and start over? [y/N] ")?;
                if again.is_some_and(|a| a.eq_ignore_ascii_case("y")) {
                    session.reset();
                } else {
                    return Ok(());
                }
            }
        }
    }
}

/// Ask for a new key and save it; a blank answer keeps the current one.
/// Returns `false` at end of input.
fn replace_key(session: &mut WizardSession, input: &mut impl BufRead) -> Result<bool> {
    let Some(token) = ask(input, "New OpenAI API key (empty keeps the current one): ")? else {
        return Ok(false);
    };
    if token.is_empty() {
        println!("API key unchanged.");
        return Ok(true);
    }
    match session.save_credential(&token) {
        Ok(()) => println!("API key saved."),
        Err(e) => eprintln!("{}", e),
    }
    Ok(true)
}

fn report(outcome: Transition) {
    match outcome {
        Transition::Advanced(step) => info!(step = step.number(), "advanced"),
        Transition::Failed { message, .. } => eprintln!("Error: {}", message),
        Transition::Inert | Transition::Stale => {}
    }
}

/// One trimmed line; `None` at end of input.
fn ask(input: &mut impl BufRead, label: &str) -> Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Lines up to the first empty one; `None` at end of input with nothing read.
fn ask_block(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut lines = Vec::new();
    let mut eof = false;
    loop {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            eof = true;
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        lines.push(line.to_string());
    }
    if lines.is_empty() && eof {
        return Ok(None);
    }
    // a blank description still goes to the wizard so it can report it
    Ok(Some(lines.join("\n")))
}
