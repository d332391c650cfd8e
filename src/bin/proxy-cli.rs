use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, HOST};
use serde_json::json;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Management CLI for the caching proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Host header to send; must be on the API allow-list for refresh.
    #[arg(long)]
    host: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness probe
    Health,
    /// Readiness probe
    Ready,
    /// Purge a site's cache, or one file in it
    Refresh {
        /// Site class (main or res)
        #[arg(short, long)]
        site: String,

        #[arg(long, default_value = "file")]
        cache_type: String,

        /// File below the site directory, e.g. /index.html
        #[arg(short, long)]
        file_path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(host) = &cli.host {
        headers.insert(HOST, HeaderValue::from_str(host)?);
    }

    let res = match cli.command {
        Commands::Health => {
            client
                .get(format!("{}/proxy-svc/api/healthz", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Ready => {
            client
                .get(format!("{}/proxy-svc/api/readyz", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Refresh {
            site,
            cache_type,
            file_path,
        } => {
            let mut body = json!({ "site": site, "cacheType": cache_type });
            if let Some(file_path) = file_path {
                body["filePath"] = json!(file_path);
            }
            client
                .post(format!("{}/proxy-svc/api/v1/refresh-cache", cli.url))
                .headers(headers)
                .json(&body)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    println!("{}", status);
    if !text.is_empty() {
        println!("{}", text);
    }
    Ok(())
}
