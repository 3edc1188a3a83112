use std::sync::Arc;

use leadflow::calendar::{CalendarBooker, CalendarConfig, DisabledCalendar, HttpCalendar};
use leadflow::config::PipelineConfig;
use leadflow::llm::{LlmConfig, create_provider};
use leadflow::mail::{ImapMailbox, MailConfig, MailSender, MailboxReader, SmtpMailer};
use leadflow::pipeline::orchestrator::PipelineOrchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = PipelineConfig::from_env();

    let llm_config = LlmConfig::from_env().unwrap_or_else(|| {
        eprintln!("Error: OPENAI_API_KEY not set");
        eprintln!("  export OPENAI_API_KEY=sk-...");
        std::process::exit(1);
    });

    let mail_config = MailConfig::from_env().unwrap_or_else(|| {
        eprintln!("Error: EMAIL_IMAP_HOST not set");
        eprintln!("  export EMAIL_IMAP_HOST=imap.example.com");
        std::process::exit(1);
    });

    eprintln!("📬 LeadFlow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", llm_config.model);
    eprintln!("   Prospects: {}", config.prospects_path.display());
    eprintln!("   Shortlist: top {}", config.shortlist_size);
    eprintln!(
        "   Reply window: {}s (poll every {}s)",
        config.reply_timeout.as_secs(),
        config.poll_interval.as_secs()
    );
    eprintln!(
        "   Email: IMAP {}, SMTP {}",
        mail_config.imap_host, mail_config.smtp_host
    );

    let llm = create_provider(&llm_config)?;
    let mailer: Arc<dyn MailSender> = Arc::new(SmtpMailer::new(mail_config.clone()));
    let mailbox: Arc<dyn MailboxReader> = Arc::new(ImapMailbox::new(mail_config));

    let calendar: Arc<dyn CalendarBooker> = match CalendarConfig::from_env() {
        Some(calendar_config) => {
            eprintln!("   Calendar: {}", calendar_config.api_url);
            Arc::new(HttpCalendar::new(calendar_config))
        }
        None => {
            eprintln!("   Calendar: not configured (bookings will be recorded as failed)");
            Arc::new(DisabledCalendar)
        }
    };
    eprintln!();

    let orchestrator = PipelineOrchestrator::new(config.clone(), llm, mailer, mailbox, calendar);
    let state = orchestrator.run().await?;

    // Persist the full run artifact next to the inputs
    let results_path = format!(
        "results_{}.json",
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    );
    std::fs::write(&results_path, serde_json::to_string_pretty(&state)?)?;

    eprintln!("\n✅ Pipeline complete");
    eprintln!("   Shortlisted: {}", state.shortlisted.len());
    eprintln!("   Emails sent: {}", state.emails_sent.len());
    eprintln!("   Meetings: {}", state.scheduled_meetings.len());
    eprintln!("   Follow-ups: {}", state.follow_ups_sent.len());
    eprintln!("   Results: {results_path}");

    if state.analyses.is_empty() {
        eprintln!("   Analytics: no transcripts found");
    } else {
        eprintln!("   Report: {}", config.report_path.display());
        eprintln!("\n📈 Call recap:");
        for analysis in &state.analyses {
            let snippet: String = analysis.summary.chars().take(120).collect();
            eprintln!(
                "   - {} ({}) [{}]: {}",
                analysis.meta.company_name, analysis.meta.industry, analysis.sentiment, snippet
            );
        }
    }

    Ok(())
}
