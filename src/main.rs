//! Main entry point for the asset-retriever CLI application.
//!
//! Resolves a local path or a remote URL into an asset, prints its format,
//! and optionally lists its entries or writes one of them to stdout.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use asset_retriever::logging::init_logging;
use asset_retriever::{Asset, AssetRetriever, Cli, HttpResource, Resource};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let url = cli.url()?;
    let retriever = AssetRetriever::default();

    if cli.is_http_url() {
        // Keep a typed handle on the remote resource to report the traffic
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let resource = Arc::new(HttpResource::new(client, url));
        let asset = retriever
            .retrieve_resource(resource.clone(), cli.hints())
            .await?;
        process_asset(&asset, &cli).await?;

        if !cli.is_quiet() {
            eprintln!(
                "\nTotal bytes transferred: {}",
                format_size(resource.transferred_bytes())
            );
        }
    } else {
        let asset = retriever.retrieve(&url, cli.hints()).await?;
        process_asset(&asset, &cli).await?;
    }

    Ok(())
}

async fn process_asset(asset: &Asset, cli: &Cli) -> Result<()> {
    if !cli.is_quiet() {
        print_format(asset);
    }
    if cli.list {
        list_entries(asset).await?;
    }
    if let Some(entry) = &cli.pipe {
        pipe(asset, entry).await?;
    }
    Ok(())
}

fn print_format(asset: &Asset) {
    let format = asset.format();
    let specifications: Vec<&str> = format
        .specifications
        .iter()
        .map(|specification| specification.as_str())
        .collect();

    println!(
        "Kind:         {}",
        if asset.is_container() { "container" } else { "resource" }
    );
    println!("Media type:   {}", format.media_type);
    println!("Extension:    {}", format.file_extension);
    println!("Conforms to:  {}", specifications.join(", "));
}

/// List the entries of a container with their uncompressed lengths.
async fn list_entries(asset: &Asset) -> Result<()> {
    let Some(container) = asset.container() else {
        println!("\nNot a container: nothing to list");
        return Ok(());
    };

    println!("\n{:>10}  Name", "Length");
    println!("{}", "-".repeat(40));

    let mut total = 0u64;
    for url in container.entries() {
        let length = match container.get(url) {
            Some(resource) => resource.estimated_length().await?,
            None => None,
        };
        total += length.unwrap_or(0);
        let length = length.map_or_else(|| "?".to_string(), |length| length.to_string());
        println!("{length:>10}  {url}");
    }

    println!("{}", "-".repeat(40));
    println!("{:>10}  {} files", total, container.entries().len());
    Ok(())
}

/// Write `entry` of a container, or the whole resource, to stdout.
async fn pipe(asset: &Asset, entry: &str) -> Result<()> {
    let resource: Arc<dyn Resource> = match asset {
        Asset::Resource { resource, .. } => resource.clone(),
        Asset::Container { container, .. } => container
            .get_path(entry)
            .ok_or_else(|| anyhow!("{entry}: no such entry"))?,
    };

    let mut stdout = std::io::stdout();
    let mut write_error = None;
    resource
        .stream(None, &mut |chunk: &[u8]| {
            if write_error.is_none()
                && let Err(error) = stdout.write_all(chunk)
            {
                write_error = Some(error);
            }
        })
        .await?;

    if let Some(error) = write_error {
        return Err(error).context("cannot write to stdout");
    }
    stdout.flush()?;
    Ok(())
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
