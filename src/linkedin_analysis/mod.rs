// src/linkedin_analysis/mod.rs
pub mod conversation_analyzer;
pub mod llm_client;
pub mod meeting_detector;
pub mod prompts;
pub mod rate_policy;
mod types;

pub use conversation_analyzer::ConversationAnalyzer;
pub use llm_client::{build_client, AnthropicClient, LlmClient, OpenAiClient};
pub use meeting_detector::{KeywordMeetingDetector, LlmMeetingDetector, MeetingDetector};
pub use rate_policy::RatePolicy;
