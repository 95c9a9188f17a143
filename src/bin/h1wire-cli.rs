use std::path::PathBuf;

use bytes::Bytes;
use clap::Parser;
use serde_json::{json, Map, Value};

use h1wire::client::{Client, ParsedUrl, Response};
use h1wire::config::load_or_default;
use h1wire::observability::logging;
use h1wire::wire::chunked::encode_chunked;
use h1wire::wire::{Headers, Method, Payload};

/// Chunk size used by `--chunked`.
const CHUNK_LEN: usize = 1024;

#[derive(Parser)]
#[command(name = "h1wire-cli")]
#[command(about = "Send one HTTP/1.1 request and print the response as JSON", long_about = None)]
struct Cli {
    /// Request method (GET, POST, PUT, DELETE, HEAD, OPTIONS, TRACE, CONNECT)
    #[arg(short, long)]
    method: String,

    /// Target URL; http:// is assumed when no scheme is given
    #[arg(short, long)]
    url: String,

    /// Request headers as a JSON object, e.g. '{"Content-Type": "application/json"}'
    #[arg(short = 'H', long, default_value = "{}")]
    headers: String,

    /// Request body
    #[arg(short, long, default_value = "")]
    data: String,

    /// Redirects to follow, overrides client.max_redirects
    #[arg(long)]
    max_redirects: Option<u32>,

    /// Send the body with chunked transfer coding
    #[arg(long)]
    chunked: bool,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;
    logging::init_logging(&config.observability.log_filter);

    let method: Method = cli.method.to_ascii_uppercase().parse()?;
    let url = ParsedUrl::parse(&cli.url)?;
    let mut headers = parse_headers(&cli.headers)?;
    if !headers.contains("host") {
        headers.insert("Host", url.authority());
    }

    let body = if cli.data.is_empty() {
        Bytes::new()
    } else if cli.chunked {
        headers.remove("content-length");
        headers.insert("Transfer-Encoding", "chunked");
        Bytes::from(encode_chunked(cli.data.as_bytes(), CHUNK_LEN))
    } else {
        if !headers.contains("content-length") {
            headers.insert("Content-Length", cli.data.len().to_string());
        }
        Bytes::from(cli.data)
    };

    let max_redirects = cli.max_redirects.unwrap_or(config.client.max_redirects);
    let client = Client::new(config.client)?;
    let response = client
        .execute(method, &url, headers, body, max_redirects)
        .await?;

    println!("{}", serde_json::to_string_pretty(&render(&response))?);
    Ok(())
}

fn parse_headers(raw: &str) -> Result<Headers, Box<dyn std::error::Error>> {
    let object: Map<String, Value> = serde_json::from_str(raw)?;
    let mut headers = Headers::new();
    for (name, value) in object {
        match value {
            Value::String(value) => headers.insert(name, value),
            other => headers.insert(name, other.to_string()),
        }
    }
    Ok(headers)
}

fn render(response: &Response) -> Value {
    let body = match &response.body {
        Payload::Text(text) => Value::String(text.clone()),
        Payload::Binary(bytes) => json!(bytes.as_ref()),
    };
    json!({
        "version": response.head.version,
        "status": response.head.status,
        "reason": response.head.reason,
        "headers": response.head.headers,
        "body": body,
    })
}
