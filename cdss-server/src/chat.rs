//! Terminal chat client for a running server's `/bot` endpoint.

use std::time::Duration;

use anyhow::{Context, bail};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde_json::Value;

use crate::server::{BotRequest, BotResponse};

/// Posts questions to `{backend}/bot` on one thread.
///
/// `backend` may be the server root or the `/bot` endpoint itself.
pub struct BotClient {
    client: reqwest::Client,
    endpoint: String,
    thread_id: String,
}

impl BotClient {
    pub fn new(backend: &str, thread_id: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: bot_endpoint(backend),
            thread_id: thread_id.into(),
        })
    }

    /// Send one message and return the server's answer.
    pub async fn ask(&self, message: &str) -> anyhow::Result<String> {
        let request =
            BotRequest { message: message.to_string(), thread_id: Some(self.thread_id.clone()) };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("could not reach {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or_default();
            let detail = body.get("error").and_then(Value::as_str).unwrap_or("no detail");
            bail!("server returned {status}: {detail}");
        }
        let body: BotResponse = response.json().await.context("malformed /bot response")?;
        Ok(body.output)
    }
}

fn bot_endpoint(backend: &str) -> String {
    let base = backend.trim_end_matches('/');
    let base = base.strip_suffix("/bot").unwrap_or(base);
    format!("{base}/bot")
}

/// Read questions from the terminal until EOF or `exit`.
pub async fn run(backend: &str, thread_id: &str) -> anyhow::Result<()> {
    let client = BotClient::new(backend, thread_id)?;
    let mut editor = DefaultEditor::new().context("failed to start line editor")?;

    println!("Heart Failure Management CDSS - 2022 AHA/ACC/HFSA");
    println!("Connected to {backend} (thread {thread_id}). Type 'exit' to quit.\n");

    loop {
        match editor.readline("You > ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if matches!(line, "exit" | "quit") {
                    break;
                }
                let _ = editor.add_history_entry(line);

                match client.ask(line).await {
                    Ok(answer) => println!("\nCDSS > {answer}\n"),
                    Err(e) => eprintln!("\nError: {e:#}\n"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        }
    }
    Ok(())
}
