//! TCP server for moDB
//!
//! Line-oriented plain-text protocol: the server accumulates input lines
//! until one ends with `;`, then lexes, parses, plans, and executes every
//! statement in the buffer. Responses are the formatted results followed by
//! a prompt. All connections share one executor behind a global lock, so
//! statements execute in a total order across sessions.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{error, info};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::executor::{Executor, Planner, ResultSet};
use crate::sql::Parser;

/// Default server port
pub const DEFAULT_PORT: u16 = 3003;

/// Fresh-statement prompt
const PROMPT: &str = "moDB> ";
/// Continuation prompt for multi-line statements
const CONTINUATION: &str = "   -> ";

const COLOR_RED: &str = "\x1b[31m";
const COLOR_GREEN: &str = "\x1b[32m";
const COLOR_RESET: &str = "\x1b[0m";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Create a new server config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host address
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Get the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// moDB TCP server
pub struct Server {
    config: ServerConfig,
    executor: Arc<Mutex<Executor>>,
}

impl Server {
    /// Create a server over a catalog
    pub fn new(config: ServerConfig, catalog: Catalog) -> Self {
        Self {
            config,
            executor: Arc::new(Mutex::new(Executor::new(catalog))),
        }
    }

    /// Start listening and handle connections, one thread each
    pub fn start(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_address())?;
        info!(address = %self.config.bind_address(), "server listening");

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let executor = self.executor.clone();
                    thread::spawn(move || {
                        if let Err(e) = handle_connection(stream, executor) {
                            error!(error = %e, "connection error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                }
            }
        }

        Ok(())
    }
}

/// Handle a client session until it disconnects
fn handle_connection(stream: TcpStream, executor: Arc<Mutex<Executor>>) -> Result<()> {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    info!(peer = %peer, "client connected");

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;

    let mut query_buffer = String::new();
    let mut prompt = PROMPT;
    writer.write_all(prompt.as_bytes())?;
    writer.flush()?;

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() && query_buffer.is_empty() {
            writer.write_all(prompt.as_bytes())?;
            writer.flush()?;
            continue;
        }

        query_buffer.push_str(trimmed);
        query_buffer.push(' ');

        if trimmed.ends_with(';') {
            let query = std::mem::take(&mut query_buffer);
            prompt = PROMPT;

            info!(peer = %peer, query = %query.trim(), "received query");
            let response = process_query(&executor, query.trim());
            writer.write_all(response.as_bytes())?;
        } else {
            prompt = CONTINUATION;
        }

        writer.write_all(prompt.as_bytes())?;
        writer.flush()?;
    }

    info!(peer = %peer, "client disconnected");
    Ok(())
}

/// Parse, plan, and execute a buffered input; returns the full response text.
///
/// A parse error reports the first message and skips the whole buffer; an
/// execution error is reported for its statement and later statements in the
/// same buffer still run.
fn process_query(executor: &Arc<Mutex<Executor>>, input: &str) -> String {
    let mut parser = Parser::new(input);
    let statements = parser.parse_program();

    if let Some(err) = parser.first_error() {
        return format!("{}{}{}\n", COLOR_RED, err, COLOR_RESET);
    }

    let planner = Planner::new();
    let mut output = String::new();

    for stmt in statements {
        let plan = planner.plan(stmt);
        let result = executor.lock().unwrap().execute(plan);
        match result {
            Ok(res) => output.push_str(&format_result(&res)),
            Err(e) => {
                output.push_str(&format!(
                    "{}Execution error: {}{}\n",
                    COLOR_RED, e, COLOR_RESET
                ));
            }
        }
    }

    output
}

/// Format a result set for the wire: a status line for empty results, a
/// padded column table otherwise
fn format_result(result: &ResultSet) -> String {
    if result.columns.is_empty() && result.rows.is_empty() {
        let msg = result
            .message
            .as_deref()
            .unwrap_or("Success (Action completed)");
        return format!("{}{}{}\n", COLOR_GREEN, msg, COLOR_RESET);
    }

    let mut out = String::new();

    // Header
    out.push_str("| ");
    for col in &result.columns {
        out.push_str(&format!("{:<10} | ", col));
    }
    out.push('\n');

    // Separator
    out.push('|');
    for _ in &result.columns {
        out.push_str("------------|");
    }
    out.push('\n');

    // Rows
    if result.rows.is_empty() {
        out.push_str(" (0 rows returned)\n");
    } else {
        for row in &result.rows {
            out.push_str("| ");
            for value in &row.values {
                out.push_str(&format!("{:<10} | ", value.to_string()));
            }
            out.push('\n');
        }
    }

    out
}
