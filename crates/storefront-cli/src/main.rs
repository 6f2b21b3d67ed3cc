//! Storefront CLI: command-line client for the product image API.
//!
//! Set STOREFRONT_API_URL (or pass --base-url) to point at the server.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use storefront_api_client::{crop, ApiClient, AspectRatio, CropMode, PixelCrop, UploadSource};
use storefront_cli::{init_tracing, parse_pixel_crop, print_json};
use storefront_core::models::ImageSurface;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "storefront", about = "Storefront product image CLI")]
struct Cli {
    /// Server base URL
    #[arg(
        long,
        global = true,
        env = "STOREFRONT_API_URL",
        default_value = storefront_api_client::DEFAULT_BASE_URL
    )]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crop a local image to an aspect ratio and write it as JPEG
    Crop {
        /// Source image
        input: PathBuf,
        /// Output JPEG path
        #[arg(long, short)]
        output: PathBuf,
        /// Aspect ratio: 1:1, 3:1, 4:3 or 16:9
        #[arg(long, default_value = "1:1")]
        ratio: AspectRatio,
        /// Crop box as x,y,width,height (default: largest centered box)
        #[arg(long, value_parser = parse_pixel_crop)]
        rect: Option<PixelCrop>,
    },
    /// Upload an image as a new bundle, cropped when --ratio is given
    Upload {
        /// products, collections, pages or gallery
        surface: ImageSurface,
        /// Owning entity id
        owner: String,
        /// Image file
        file: PathBuf,
        /// Crop to this aspect ratio before uploading
        #[arg(long)]
        ratio: Option<AspectRatio>,
        /// Crop box as x,y,width,height (requires --ratio)
        #[arg(long, value_parser = parse_pixel_crop, requires = "ratio")]
        rect: Option<PixelCrop>,
        /// Insert at this index instead of appending
        #[arg(long)]
        position: Option<i32>,
    },
    /// List an owner's bundles in display order
    List {
        surface: ImageSurface,
        owner: String,
    },
    /// Replace an owner's ordering with the given bundle ids
    Reorder {
        surface: ImageSurface,
        owner: String,
        /// Every bundle id of the owner, in the new order
        #[arg(required = true)]
        bundle_ids: Vec<Uuid>,
    },
    /// Delete a bundle and its stored variants
    Delete {
        surface: ImageSurface,
        bundle_id: Uuid,
    },
    /// Resolve stored paths to signed URLs
    Sign {
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    if let Commands::Crop {
        input,
        output,
        ratio,
        rect,
    } = &cli.command
    {
        let source = std::fs::read(input)
            .with_context(|| format!("Failed to read file: {}", input.display()))?;
        let cropped = crop(&source, *ratio, *rect)?;
        std::fs::write(output, &cropped)
            .with_context(|| format!("Failed to write file: {}", output.display()))?;
        return print_json(&serde_json::json!({
            "output": output.display().to_string(),
            "ratio": ratio.to_string(),
            "bytes": cropped.len(),
        }));
    }

    let client = ApiClient::new(&cli.base_url).context("Failed to create API client")?;

    match cli.command {
        Commands::Crop { .. } => {}
        Commands::Upload {
            surface,
            owner,
            file,
            ratio,
            rect,
            position,
        } => {
            let source = UploadSource::from_path(&file)?;
            let mode = match ratio {
                Some(ratio) => CropMode::Cropped(ratio, rect),
                None => CropMode::Verbatim,
            };
            let response = client
                .upload(surface, &owner, source, mode, position)
                .await?;
            print_json(&response)?;
        }
        Commands::List { surface, owner } => {
            let response = client.list(surface, &owner).await?;
            print_json(&response)?;
        }
        Commands::Reorder {
            surface,
            owner,
            bundle_ids,
        } => {
            let response = client.reorder(surface, &owner, &bundle_ids).await?;
            print_json(&response)?;
        }
        Commands::Delete { surface, bundle_id } => {
            let response = client.delete(surface, bundle_id).await?;
            print_json(&response)?;
        }
        Commands::Sign { paths } => {
            let response = client.sign(paths).await?;
            print_json(&response)?;
        }
    }

    Ok(())
}
