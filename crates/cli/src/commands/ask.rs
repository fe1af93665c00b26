//! Ask command handler.

use clap::Args;
use docqa_core::AppResult;
use docqa_knowledge::{QueryAnswer, RagPipeline, DEFAULT_TOP_K};

/// Maximum characters of each source shown in text output.
const SNIPPET_CHARS: usize = 160;

/// Ask a question about the ingested documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Number of chunks to retrieve (1-20)
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, pipeline: &RagPipeline) -> AppResult<()> {
        tracing::info!("Executing ask command (top_k: {})", self.top_k);

        let answer = pipeline.query(&self.query, self.top_k).await?;
        tracing::debug!("Answer grounded on {} sources", answer.sources.len());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&answer)?);
        } else {
            print!("{}", render(&answer));
        }

        Ok(())
    }
}

fn snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(SNIPPET_CHARS).collect();
        format!("{}...", cut)
    }
}

fn render(answer: &QueryAnswer) -> String {
    let mut out = format!("Answer:\n{}\n", answer.answer);
    if !answer.sources.is_empty() {
        out.push_str("\nSources:\n");
        for (i, source) in answer.sources.iter().enumerate() {
            out.push_str(&format!("[{}] {}\n", i + 1, snippet(source)));
        }
    }
    out
}
