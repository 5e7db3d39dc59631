//! Analyze an image once, then apply an edit grounded in that analysis.
//!
//! Requires `GEMINI_API_KEY` (or `API_KEY`) in the environment.
//!
//! ```sh
//! cargo run --example edit_image -- photo.jpg "make it look like a watercolor"
//! ```

use latent_explorer::{codec, editor, EditSession, GeminiClient, GeminiConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let (path, request) = match (args.next(), args.next()) {
        (Some(path), Some(request)) => (path, request),
        _ => anyhow::bail!("usage: edit_image <image> <edit request>"),
    };
    let mime = if path.ends_with(".jpg") || path.ends_with(".jpeg") {
        "image/jpeg"
    } else if path.ends_with(".webp") {
        "image/webp"
    } else {
        "image/png"
    };

    let config = GeminiConfig::from_env()
        .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY is not set"))?;
    let mut session = EditSession::new(GeminiClient::new(config));
    session.load_image(&std::fs::read(&path)?, mime)?;

    let analysis = session.analyze().await?;
    println!("Analysis:\n{}\n", analysis);

    let record = session.apply_edit(&request).await?;
    let filename = editor::suggested_filename(&record.image);
    std::fs::write(&filename, codec::decode(&record.image)?)?;
    println!("Saved {}", filename);
    Ok(())
}
