// src/cli.rs
use crate::core::aggregator::aggregate;
use crate::core::workbook::{export_insights, export_master_raw, load_insights};
use crate::core::{AppConfig, FsOps, RecordLoader, ResultTable};
use crate::linkedin_analysis::{
    build_client, ConversationAnalyzer, KeywordMeetingDetector, LlmMeetingDetector, MeetingDetector,
};
use crate::pipeline::{self, BatchStats};
use crate::types::ConversationSet;
use crate::utils::timestamped_output_path;
use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "outreach-insights")]
#[command(about = "Turn LinkedIn outreach conversations into customer insight reports")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Paths file (YAML); defaults to insights.yaml when present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Export locations that override the paths file.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    #[arg(long)]
    pub messages: Option<PathBuf>,
    #[arg(long)]
    pub people: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Workbook to write; defaults to a timestamped file in the output directory
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DetectorKind {
    Keyword,
    Llm,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Enrich every conversation with at least one reply
    Analyze {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[arg(long)]
        skip_meeting_pass: bool,
    },
    /// Enrich only the conversations missing from a previous workbook
    Resume {
        #[arg(long)]
        previous: PathBuf,
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[arg(long)]
        skip_meeting_pass: bool,
    },
    /// Re-run the rows of a previous workbook whose analysis failed
    Repair {
        #[arg(long)]
        previous: PathBuf,
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[arg(long)]
        skip_meeting_pass: bool,
    },
    /// Flag booked meetings in an existing workbook
    DetectMeetings {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = DetectorKind::Keyword)]
        detector: DetectorKind,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Rebuild the stored transcripts of a workbook from the messages export
    AttachConversations {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        messages: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Copy people, messages and threads into one workbook
    MasterRaw {
        #[command(flatten)]
        inputs: InputArgs,
        #[arg(long)]
        threads: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
}

pub async fn handle_command(cli: Cli, run_id: &str) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Analyze {
            inputs,
            output,
            skip_meeting_pass,
        } => {
            let analyzer = analyzer(&config)?;
            let conversations = load_conversations(&config, &inputs)?;
            if conversations.is_empty() {
                warn!("No conversations with replies found, nothing to analyze");
                return Ok(());
            }

            let (table, stats) =
                pipeline::analyze_fresh(&analyzer, &conversations, config.batch_limit()).await;
            log_batch("Analysis", &stats);

            let path = output_path(&config, &output, "Customer_Insights");
            finish(table, &path, skip_meeting_pass, run_id).await?;
        }

        Command::Resume {
            previous,
            inputs,
            output,
            skip_meeting_pass,
        } => {
            let analyzer = analyzer(&config)?;
            FsOps::require_file(&previous, "Previous results")?;
            let prior = load_insights(&previous)?;
            let conversations = load_conversations(&config, &inputs)?;

            let (table, stats) =
                pipeline::resume(&analyzer, prior, &conversations, config.batch_limit()).await;
            log_batch("Resume", &stats);

            let path = output_path(&config, &output, "Customer_Insights_Complete");
            finish(table, &path, skip_meeting_pass, run_id).await?;
        }

        Command::Repair {
            previous,
            inputs,
            output,
            skip_meeting_pass,
        } => {
            let analyzer = analyzer(&config)?;
            FsOps::require_file(&previous, "Previous results")?;
            let prior = load_insights(&previous)?;
            let conversations = load_conversations(&config, &inputs)?;

            let (table, stats) =
                pipeline::repair(&analyzer, prior, &conversations, config.batch_limit()).await;
            log_batch("Repair", &stats);

            let path = output_path(&config, &output, "Customer_Insights_Fixed");
            finish(table, &path, skip_meeting_pass, run_id).await?;
        }

        Command::DetectMeetings {
            input,
            detector,
            output,
        } => {
            let detector: Box<dyn MeetingDetector> = match detector {
                DetectorKind::Keyword => Box::new(KeywordMeetingDetector::new()?),
                DetectorKind::Llm => Box::new(LlmMeetingDetector::new(
                    build_client(&config)?,
                    config.meeting_policy(),
                )),
            };

            FsOps::require_file(&input, "Insights workbook")?;
            let mut table = load_insights(&input)?;
            pipeline::apply_meeting_detection(&mut table, detector.as_ref(), config.batch_limit())
                .await;

            let path = output_path(&config, &output, "Customer_Insights_With_Meetings");
            write_insights(&table, &path, run_id).await?;
        }

        Command::AttachConversations {
            input,
            messages,
            output,
        } => {
            FsOps::require_file(&input, "Insights workbook")?;
            let messages_path = messages.unwrap_or_else(|| config.paths.messages_csv.clone());
            FsOps::require_file(&messages_path, "Messages export")?;

            let mut table = load_insights(&input)?;
            let messages = RecordLoader::load_messages(&messages_path)?;
            pipeline::attach_conversations(&mut table, &messages);

            let path = output_path(&config, &output, "Customer_Insights_With_Conversations");
            write_insights(&table, &path, run_id).await?;
        }

        Command::MasterRaw {
            inputs,
            threads,
            output,
        } => {
            let people_path = inputs.people.unwrap_or_else(|| config.paths.people_csv.clone());
            let messages_path = inputs
                .messages
                .unwrap_or_else(|| config.paths.messages_csv.clone());
            let threads_path = threads.unwrap_or_else(|| config.paths.threads_csv.clone());
            for (path, what) in [
                (&people_path, "People export"),
                (&messages_path, "Messages export"),
                (&threads_path, "Threads export"),
            ] {
                FsOps::require_file(path, what)?;
            }

            let people = RecordLoader::load_raw(&people_path)?;
            let messages = RecordLoader::load_raw(&messages_path)?;
            let threads = RecordLoader::load_raw(&threads_path)?;

            let path = output_path(&config, &output, "LinkedIn_Master_Raw");
            FsOps::ensure_parent_dir(&path).await?;
            export_master_raw(&people, &messages, &threads, &path)?;
            info!("✅ Master report: {}", path.display());
        }
    }

    Ok(())
}

/// Builds the client first so a missing credential fails before any work starts.
fn analyzer(config: &AppConfig) -> Result<ConversationAnalyzer> {
    let analyzer = ConversationAnalyzer::new(build_client(config)?, config.analysis_policy());
    info!("Using {}", analyzer.describe());
    if let Some(limit) = config.batch_limit() {
        info!("🧪 Test mode: at most {} conversations per batch", limit);
    }
    Ok(analyzer)
}

fn load_conversations(config: &AppConfig, inputs: &InputArgs) -> Result<ConversationSet> {
    let messages_path = inputs
        .messages
        .clone()
        .unwrap_or_else(|| config.paths.messages_csv.clone());
    let people_path = inputs
        .people
        .clone()
        .unwrap_or_else(|| config.paths.people_csv.clone());
    FsOps::require_file(&messages_path, "Messages export")?;
    FsOps::require_file(&people_path, "People export")?;

    let messages = RecordLoader::load_messages(&messages_path)?;
    let people = RecordLoader::load_people(&people_path)?;
    Ok(aggregate(&messages, &people))
}

fn output_path(config: &AppConfig, output: &OutputArgs, stem: &str) -> PathBuf {
    output
        .output
        .clone()
        .unwrap_or_else(|| timestamped_output_path(&config.paths.output_dir, stem))
}

fn log_batch(label: &str, stats: &BatchStats) {
    info!(
        "{} finished: {} conversations analyzed, {} failed",
        label, stats.attempted, stats.failed
    );
    if stats.deferred > 0 {
        info!("{} conversations left for a later run", stats.deferred);
    }
}

async fn finish(mut table: ResultTable, path: &Path, skip_meeting_pass: bool, run_id: &str) -> Result<()> {
    if skip_meeting_pass {
        info!("Skipping keyword meeting pass");
    } else {
        let detector = KeywordMeetingDetector::new()?;
        pipeline::apply_meeting_detection(&mut table, &detector, None).await;
    }
    write_insights(&table, path, run_id).await
}

async fn write_insights(table: &ResultTable, path: &Path, run_id: &str) -> Result<()> {
    FsOps::ensure_parent_dir(path).await?;
    let report = export_insights(table, path, run_id)?;

    info!("✅ Report: {}", path.display());
    for metric in &report.metrics {
        info!("   {}: {:?}", metric.name, metric.value);
    }
    if table.failed_count() > 0 {
        warn!(
            "{} rows failed analysis; run `repair --previous {}` to retry them",
            table.failed_count(),
            path.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::parse_from([
            "outreach-insights",
            "--config",
            "paths.yaml",
            "resume",
            "--previous",
            "old.xlsx",
            "--messages",
            "m.csv",
            "--skip-meeting-pass",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("paths.yaml")));
        match cli.command {
            Command::Resume {
                previous,
                inputs,
                output,
                skip_meeting_pass,
            } => {
                assert_eq!(previous, PathBuf::from("old.xlsx"));
                assert_eq!(inputs.messages, Some(PathBuf::from("m.csv")));
                assert!(inputs.people.is_none());
                assert!(output.output.is_none());
                assert!(skip_meeting_pass);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::parse_from([
            "outreach-insights",
            "detect-meetings",
            "--input",
            "in.xlsx",
            "--detector",
            "llm",
            "--output",
            "out.xlsx",
        ]);
        match cli.command {
            Command::DetectMeetings {
                detector, output, ..
            } => {
                assert_eq!(detector, DetectorKind::Llm);
                assert_eq!(output.output, Some(PathBuf::from("out.xlsx")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_detector_defaults_to_keyword() {
        let cli = Cli::parse_from(["outreach-insights", "detect-meetings", "--input", "in.xlsx"]);
        assert!(matches!(
            cli.command,
            Command::DetectMeetings {
                detector: DetectorKind::Keyword,
                ..
            }
        ));
    }
}
