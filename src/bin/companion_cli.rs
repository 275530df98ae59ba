//! Command-line client for the companion server.
//!
//! `extract` runs text extraction locally without a server; `upload` and `chat` talk to a running
//! instance over HTTP.
use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use rustycompanion::documents::extract_text;
use serde::Deserialize;
use serde_json::{Map, Value, json};

const DEFAULT_SERVER: &str = "http://127.0.0.1:4100";

#[derive(Parser)]
#[command(name = "companion-cli", about = "Client for the Rusty Companion server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the text extracted from a local file.
    Extract {
        path: PathBuf,
        /// MIME type to assume instead of detecting from the suffix.
        #[arg(long)]
        mime: Option<String>,
    },
    /// Upload a file so its text becomes chat context.
    Upload {
        path: PathBuf,
        #[arg(long)]
        mime: Option<String>,
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },
    /// Send one chat message and print the reply.
    Chat {
        message: String,
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },
}

#[derive(Deserialize)]
struct UploadReply {
    ok: bool,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    characters: Option<usize>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChatReply {
    reply: String,
    #[serde(default)]
    meta: Map<String, Value>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Extract { path, mime } => extract(&path, mime.as_deref()),
        Command::Upload { path, mime, server } => upload(&path, mime.as_deref(), &server).await,
        Command::Chat { message, server } => chat(&message, &server).await,
    }
}

fn extract(path: &Path, mime: Option<&str>) -> Result<()> {
    let (filename, bytes) = read_file(path)?;
    let text = extract_text(&filename, &bytes, mime.unwrap_or_default())
        .with_context(|| format!("failed to extract text from {}", path.display()))?;
    println!("{text}");
    Ok(())
}

async fn upload(path: &Path, mime: Option<&str>, server: &str) -> Result<()> {
    let (filename, bytes) = read_file(path)?;
    let mut part = Part::bytes(bytes).file_name(filename);
    if let Some(mime) = mime {
        part = part
            .mime_str(mime)
            .with_context(|| format!("invalid MIME type '{mime}'"))?;
    }
    let form = Form::new().part("file", part);

    let response = reqwest::Client::new()
        .post(format!("{}/upload", server.trim_end_matches('/')))
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("failed to reach {server}"))?;
    let status = response.status();
    let reply: UploadReply = response
        .json()
        .await
        .with_context(|| format!("server answered {status} with an unreadable body"))?;

    if !reply.ok {
        bail!(
            "upload rejected ({status}): {}",
            reply.error.unwrap_or_else(|| "no reason given".into())
        );
    }
    println!(
        "stored {} ({} characters)",
        reply.filename.unwrap_or_default(),
        reply.characters.unwrap_or_default()
    );
    Ok(())
}

async fn chat(message: &str, server: &str) -> Result<()> {
    let response = reqwest::Client::new()
        .post(format!("{}/chat", server.trim_end_matches('/')))
        .json(&json!({ "message": message }))
        .send()
        .await
        .with_context(|| format!("failed to reach {server}"))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("chat failed ({status}): {body}");
    }

    let reply: ChatReply = response
        .json()
        .await
        .context("failed to decode chat reply")?;
    println!("{}", reply.reply);
    if !reply.meta.is_empty() {
        println!("meta: {}", Value::Object(reply.meta));
    }
    Ok(())
}

fn read_file(path: &Path) -> Result<(String, Vec<u8>)> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?
        .to_string();
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok((filename, bytes))
}
