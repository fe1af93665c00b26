//! Stats command handler.

use clap::Args;
use docqa_core::AppResult;
use docqa_knowledge::RagPipeline;

/// Show vector store statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, pipeline: &RagPipeline) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let settings = pipeline.settings();
        let chunks = pipeline.chunk_count().await?;

        if self.json {
            let output = serde_json::json!({
                "backend": settings.store_backend.as_str(),
                "path": settings.store_path,
                "chunks": chunks,
                "embeddingProvider": settings.embedding.provider,
                "embeddingModel": settings.embedding.model,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Backend:    {}", settings.store_backend);
            println!("Path:       {}", settings.store_path.display());
            println!("Chunks:     {}", chunks);
            println!(
                "Embeddings: {} ({})",
                settings.embedding.provider, settings.embedding.model
            );
        }

        Ok(())
    }
}
