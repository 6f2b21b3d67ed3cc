use anyhow::Context;
use serde::Serialize;
use storefront_api_client::PixelCrop;

/// Parse a crop rectangle given as `x,y,width,height`.
pub fn parse_pixel_crop(input: &str) -> Result<PixelCrop, String> {
    let parts: Vec<&str> = input.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!(
            "expected x,y,width,height but got '{}'",
            input
        ));
    }

    let mut values = [0u32; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("'{}' is not a non-negative integer", part))?;
    }
    Ok(PixelCrop::new(values[0], values[1], values[2], values[3]))
}

/// Print a value as pretty JSON on stdout.
pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays valid JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
