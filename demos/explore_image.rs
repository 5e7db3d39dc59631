//! Explore an image: fetch ideas, branch on two of them, auto-explore one
//! branch further and export the whole session.
//!
//! Requires `GEMINI_API_KEY` (or `API_KEY`) in the environment.
//!
//! ```sh
//! RUST_LOG=latent_explorer=info cargo run --example explore_image -- photo.png
//! ```

use latent_explorer::{
    codec, export_idea_history, export_session, AutoExplore, Explorer, GeminiClient, GeminiConfig,
    ImageRef,
};
use tracing_subscriber::EnvFilter;

fn mime_for(path: &str) -> &'static str {
    match path.rsplit('.').next().map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: explore_image <image>"))?;
    let config = GeminiConfig::from_env()
        .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY is not set"))?;

    let explorer = Explorer::new(GeminiClient::new(config));
    let image = codec::encode(&std::fs::read(&path)?, mime_for(&path))?;
    let root = explorer.start(ImageRef::Inline(image));

    let ideas = explorer.explore(&root, 4).await?;
    for (i, idea) in ideas.iter().enumerate() {
        println!("[{}] {}\n    -> {}", i, idea.description, idea.suggested_prompt);
    }

    let picks: Vec<usize> = (0..ideas.len().min(2)).collect();
    let results = explorer.generate_selected(&root, &picks).await?;
    let mut first_child = None;
    for (index, result) in results {
        match result {
            Ok(child) => {
                println!("Idea {} -> node {}", index, child);
                first_child.get_or_insert(child);
            }
            Err(e) => eprintln!("Idea {} failed: {}", index, e),
        }
    }

    if let Some(child) = first_child {
        explorer.navigate(&child)?;
        let report = explorer
            .auto_explore(AutoExplore::new(child).with_depth(2).with_ideas_per_step(3), |status| {
                println!("  {}", status)
            })
            .await;
        println!("{}", report.status);
    }

    println!("\n{}", explorer.store().render_outline());

    let ids: Vec<String> = explorer.store().nodes().into_iter().map(|n| n.id).collect();
    let archive = export_session(explorer.store(), explorer.backend(), &ids).await?;
    let written = archive.write_to(".")?;
    println!("Saved {} images to {}", archive.manifest.len(), written.display());

    std::fs::write("idea-history.json", export_idea_history(explorer.store())?)?;
    Ok(())
}
