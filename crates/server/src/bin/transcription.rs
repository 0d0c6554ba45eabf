//! Transcription service binary.

use server::TranscriptionConfig;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = TranscriptionConfig::load()?;
    server::start_transcription_server(config).await?;

    Ok(())
}
