//! Drives both services through the full pipeline:
//! transcribe -> embed -> index -> search.
//!
//! Start `transcription-server` and `embedding-server` first, then run
//! `cargo run -p voxindex-server --example api_client -- /path/to/audio.wav`.

use reqwest::Client;
use serde_json::{json, Value};

const TRANSCRIPTION_URL: &str = "http://localhost:5000";
const EMBEDDING_URL: &str = "http://localhost:5001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let audio_path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: api_client <audio file>"))?;
    let client = Client::new();

    // 1. Health checks
    for url in [TRANSCRIPTION_URL, EMBEDDING_URL] {
        let resp = client.get(format!("{url}/health")).send().await?;
        println!("{url}/health -> {} {}", resp.status(), resp.text().await?);
    }
    println!();

    // 2. Transcribe
    let transcript: Value = client
        .post(format!("{TRANSCRIPTION_URL}/transcribe"))
        .json(&json!({ "audio_path": audio_path }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let segments = transcript["segments"].as_array().cloned().unwrap_or_default();
    println!(
        "Transcribed {} segments, language {}, duration {}s",
        segments.len(),
        transcript["language"],
        transcript["duration"]
    );

    // 3. Embed, using the segment position as its id
    let to_embed: Vec<Value> = segments
        .iter()
        .enumerate()
        .map(|(i, seg)| json!({ "id": i, "text": seg["text"] }))
        .collect();
    let embedded: Value = client
        .post(format!("{EMBEDDING_URL}/embed"))
        .json(&json!({ "segments": to_embed }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    // 4. Index under one video id
    let indexed: Value = client
        .post(format!("{EMBEDDING_URL}/index"))
        .json(&json!({ "video_id": 1, "embeddings": embedded["embeddings"] }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    println!("{} (total {})", indexed["message"], indexed["total_vectors"]);

    // 5. Search with the first segment's text
    if let Some(first) = segments.first() {
        let results: Value = client
            .post(format!("{EMBEDDING_URL}/search"))
            .json(&json!({ "query": first["text"], "video_id": 1, "top_k": 3 }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        println!("Search for {}:", first["text"]);
        for hit in results["results"].as_array().into_iter().flatten() {
            let id = hit["transcript_id"].as_u64().unwrap_or_default() as usize;
            println!(
                "  {:.4}  [{}] {}",
                hit["similarity"].as_f64().unwrap_or_default(),
                id,
                segments.get(id).map(|s| &s["text"]).unwrap_or(&Value::Null)
            );
        }
    }

    Ok(())
}
