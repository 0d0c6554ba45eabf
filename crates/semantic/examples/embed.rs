use std::{env, error::Error};

use semantic::{EmbeddingMode, SemanticConfig, SemanticModel};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let text = args
        .next()
        .unwrap_or_else(|| "Hello world from semantic.".into());
    let mode: EmbeddingMode = args
        .next()
        .map(|m| m.parse::<EmbeddingMode>())
        .transpose()?
        .unwrap_or_default();

    let cfg = SemanticConfig {
        mode,
        ..SemanticConfig::default()
    };
    println!(
        "Loading {} in {:?} mode (assets under {})",
        cfg.model_name,
        cfg.mode,
        cfg.model_dir.display()
    );

    let model = SemanticModel::load(&cfg).await?;
    let vector = model.embed(&text)?;

    println!("model: {}", model.name());
    println!("dim: {}", vector.len());
    println!("first values: {:?}", &vector[..vector.len().min(8)]);
    println!(
        "norm: {:.4}",
        vector.iter().map(|v| v * v).sum::<f32>().sqrt()
    );

    Ok(())
}
