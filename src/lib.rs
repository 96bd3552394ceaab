pub mod cli;
pub mod core;
pub mod environment;
pub mod linkedin_analysis;
pub mod pipeline;
pub mod types;
pub mod utils;

pub use crate::core::{AppConfig, InsightReport, ResultTable};
pub use crate::linkedin_analysis::{ConversationAnalyzer, LlmClient, MeetingDetector, RatePolicy};
pub use crate::types::{Conversation, ConversationSet, EnrichmentResult};
