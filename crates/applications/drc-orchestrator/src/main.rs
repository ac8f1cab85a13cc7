//! DRC - Disaster Response Console
//!
//! ## Usage
//!
//! ```bash
//! # Live simulation for 5 minutes, alerting two contacts on acceptance
//! drc run --duration 300 --auto-accept --to +15551230001 --to +15551230002
//!
//! # Single message
//! drc sms send --to +15551230001 --body "Test alert"
//!
//! # Bulk message (exits non-zero when every send fails)
//! drc sms bulk --to +15551230001 --to +15551230002 --body "Evacuate now"
//! ```
//!
//! Twilio credentials come from flags or `TWILIO_ACCOUNT_SID`,
//! `TWILIO_AUTH_TOKEN`, `TWILIO_PHONE_NUMBER`; the relay URL from
//! `DRC_SMS_ENDPOINT`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use drc_orchestrator::{
    DEFAULT_SMS_ENDPOINT, DeliveryOutcome, LiveOptions, RecipientList, SmsClient, SmsConfig,
    run_live, send_bulk,
};
use drc_simulation_engine::SimulationConfig;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Disaster response operations console
#[derive(Parser)]
#[command(name = "drc")]
#[command(about = "Disaster response simulation and emergency SMS alerts", long_about = None)]
struct Cli {
    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(flatten)]
    sms: SmsArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SmsArgs {
    /// SMS relay endpoint
    #[arg(long, global = true, env = "DRC_SMS_ENDPOINT", default_value = DEFAULT_SMS_ENDPOINT)]
    sms_endpoint: String,

    /// Twilio account SID
    #[arg(
        long,
        global = true,
        env = "TWILIO_ACCOUNT_SID",
        default_value = "",
        hide_env_values = true
    )]
    account_sid: String,

    /// Twilio auth token
    #[arg(
        long,
        global = true,
        env = "TWILIO_AUTH_TOKEN",
        default_value = "",
        hide_env_values = true
    )]
    auth_token: String,

    /// Sender phone number
    #[arg(long, global = true, env = "TWILIO_PHONE_NUMBER", default_value = "")]
    from_number: String,

    /// SMS request timeout (seconds)
    #[arg(long, global = true, default_value_t = 10)]
    sms_timeout: u64,
}

impl SmsArgs {
    fn client(&self) -> anyhow::Result<SmsClient> {
        let config = SmsConfig::default()
            .with_endpoint(&self.sms_endpoint)
            .with_credentials(&self.account_sid, &self.auth_token, &self.from_number)
            .with_timeout_secs(self.sms_timeout);
        Ok(SmsClient::new(config)?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation on wall-clock timers
    Run {
        /// Stop after this many seconds (runs until Ctrl-C if omitted)
        #[arg(short, long)]
        duration: Option<u64>,

        /// RNG seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// JSON simulation config
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Accept disaster alerts automatically
        #[arg(long)]
        auto_accept: bool,

        /// Emergency contact (repeatable)
        #[arg(long = "to")]
        recipients: Vec<String>,

        /// Log a status line every N seconds
        #[arg(long)]
        status_every: Option<u64>,

        /// Write the final dashboard snapshot (JSON)
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Send SMS messages through the relay
    Sms {
        #[command(subcommand)]
        action: SmsAction,
    },
}

#[derive(Subcommand)]
enum SmsAction {
    /// Send one message
    Send {
        /// Recipient phone number
        #[arg(long)]
        to: String,

        /// Message text
        #[arg(long)]
        body: String,
    },

    /// Send the same message to several recipients, one after another
    Bulk {
        /// Recipient phone number (repeatable)
        #[arg(long = "to", required = true)]
        recipients: Vec<String>,

        /// Message text
        #[arg(long)]
        body: String,
    },
}

fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "drc.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "drc=info,info".into()))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref());

    match cli.command {
        Commands::Run {
            duration,
            seed,
            config,
            auto_accept,
            recipients,
            status_every,
            snapshot,
        } => {
            let mut sim_config = match config {
                Some(path) => SimulationConfig::from_json_file(&path)?,
                None => SimulationConfig::default(),
            };
            if let Some(seed) = seed {
                sim_config = sim_config.with_seed(seed);
            }

            let recipients: RecipientList = recipients.into_iter().collect();
            let options = LiveOptions {
                duration: duration.map(Duration::from_secs),
                auto_accept,
                recipients: recipients.numbers().to_vec(),
                status_every: status_every.map(Duration::from_secs),
                snapshot_path: snapshot,
            };

            let client = cli.sms.client()?;
            let report = run_live(sim_config, options, &client).await?;

            println!("{}", serde_json::to_string_pretty(&report.summary)?);
            for delivery in &report.deliveries {
                println!("Emergency broadcast: {}", delivery.summary());
            }
            Ok(())
        }

        Commands::Sms { action } => {
            let client = cli.sms.client()?;
            match action {
                SmsAction::Send { to, body } => {
                    let response = client.send(&to, &body).await?;
                    println!("{}", serde_json::to_string_pretty(&response)?);
                    if !response.success {
                        anyhow::bail!(
                            "message to {} rejected: {}",
                            to,
                            response.error.unwrap_or(response.message)
                        );
                    }
                    Ok(())
                }
                SmsAction::Bulk { recipients, body } => {
                    let recipients: RecipientList = recipients.into_iter().collect();
                    let result = send_bulk(&client, recipients.numbers(), &body).await?;

                    info!(
                        sent = result.success.len(),
                        failed = result.failed.len(),
                        "Bulk send finished"
                    );
                    println!("{}", result.summary());
                    for number in &result.failed {
                        println!("  failed: {}", number);
                    }
                    if result.outcome() == DeliveryOutcome::AllFailed {
                        anyhow::bail!("all {} messages failed", result.failed.len());
                    }
                    Ok(())
                }
            }
        }
    }
}
