// src/linkedin_analysis/conversation_analyzer.rs
use super::llm_client::LlmClient;
use super::prompts::insight_prompt;
use super::rate_policy::RatePolicy;
use crate::types::{AnalysisOutcome, Conversation, EnrichmentResult};
use crate::utils::preview;
use std::sync::Arc;
use tracing::{info, warn};

/// Enriches conversations one model call at a time.
pub struct ConversationAnalyzer {
    llm: Arc<dyn LlmClient>,
    rate_policy: RatePolicy,
}

impl ConversationAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>, rate_policy: RatePolicy) -> Self {
        Self { llm, rate_policy }
    }

    pub fn describe(&self) -> String {
        self.llm.describe()
    }

    /// Analyze one conversation. Never fails: any error becomes the sentinel result.
    pub async fn analyze(&self, conversation: &Conversation) -> EnrichmentResult {
        let outcome = self.request_analysis(conversation).await;
        self.rate_policy.pause().await;

        if let AnalysisOutcome::Failed { error } = &outcome {
            warn!(
                "Error analyzing conversation for {}: {}",
                conversation.lead.display_name(),
                preview(error, 100)
            );
        }

        EnrichmentResult::from_conversation(conversation, outcome)
    }

    async fn request_analysis(&self, conversation: &Conversation) -> AnalysisOutcome {
        let prompt = insight_prompt(conversation);
        match self.llm.complete(&prompt).await {
            Ok(text) => AnalysisOutcome::from_model_text(&text),
            Err(e) => AnalysisOutcome::failed(format!("{:#}", e)),
        }
    }

    /// Analyze conversations in order, sequentially, pausing after each request.
    pub async fn analyze_all<'a, I>(&self, conversations: I) -> Vec<EnrichmentResult>
    where
        I: IntoIterator<Item = &'a Conversation>,
    {
        let conversations: Vec<&Conversation> = conversations.into_iter().collect();
        let total = conversations.len();
        info!(
            "🤖 Analyzing {} conversations with {}",
            total,
            self.llm.describe()
        );

        let mut results = Vec::with_capacity(total);
        for (idx, conversation) in conversations.into_iter().enumerate() {
            info!(
                "[{}/{}] Analyzing: {} ({} messages, {} replies)",
                idx + 1,
                total,
                conversation.lead.display_name(),
                conversation.total_messages(),
                conversation.reply_count()
            );

            let result = self.analyze(conversation).await;
            if result.has_pain_points() {
                info!(
                    "   Found {} pain points, {} features",
                    result.pain_points.len(),
                    result.features.len()
                );
            } else {
                info!("   No clear pain points extracted");
            }
            results.push(result);
        }

        results
    }
}
