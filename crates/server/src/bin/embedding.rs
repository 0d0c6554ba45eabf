//! Embedding & semantic search service binary.

use server::EmbeddingConfig;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = EmbeddingConfig::load()?;
    server::start_embedding_server(config).await?;

    Ok(())
}
