// src/types/mod.rs
pub mod conversation;
pub mod insights;
pub mod records;

pub use conversation::{render_messages, Conversation, ConversationSet, RenderStyle};
pub use insights::{
    AnalysisOutcome, AnalysisPayload, EngagementLevel, EnrichmentResult, FeatureSuggestion,
    MeetingVerdict, PainPoint, RowStatus,
};
pub use records::{Direction, Lead, Message, RawTable};
