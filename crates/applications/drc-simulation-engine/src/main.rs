//! DRC Simulation Engine CLI
//!
//! Runs the disaster response simulation on a virtual clock and reports what
//! happened.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use drc_core::OperationsPhase;
use drc_simulation_engine::{
    DashboardSnapshot, SimEvent, SimNotice, SimulationConfig, SimulationSummary, Simulator,
    VirtualScheduler,
};

#[derive(Parser, Debug)]
#[command(name = "drc-sim")]
#[command(about = "Simulate a disaster response operation on a virtual clock", long_about = None)]
struct Args {
    /// Simulated duration in seconds
    #[arg(short, long, default_value_t = 120)]
    duration: u64,

    /// RNG seed (random if omitted)
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON simulation config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Accept the first disaster alert automatically
    #[arg(long)]
    auto_accept: bool,

    /// Start in this phase (monitoring, surveillance, search, relief)
    #[arg(long)]
    phase: Option<OperationsPhase>,

    /// Output JSON file path (optional)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunReport {
    summary: SimulationSummary,
    snapshot: DashboardSnapshot,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "drc=info,info".into()))
        .with(fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  DRC Simulation Engine                                   ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    println!("Configuration:");
    println!("  Duration: {} s", args.duration);
    match config.seed {
        Some(seed) => println!("  Seed: {}", seed),
        None => println!("  Seed: random"),
    }
    println!("  Fleet tick: {} s", config.fleet_tick_secs);
    println!("  Sensor tick: {} s", config.sensor_tick_secs);
    println!("  Network extenders: {}", config.network_extender_count);
    println!("  Auto-accept alerts: {}\n", args.auto_accept);

    let scheduler = VirtualScheduler::<SimEvent>::new(Utc::now());
    let mut sim = Simulator::new(config, scheduler)?;

    let mut notices = Vec::new();
    if let Some(phase) = args.phase {
        notices.extend(sim.select_phase(phase));
    }
    notices.extend(sim.start());
    for second in 0..=args.duration {
        for notice in &notices {
            report_notice(second, notice);
        }
        if args.auto_accept && notices.iter().any(|n| matches!(n, SimNotice::AlertRaised(_))) {
            sim.accept_alert();
        }
        if second == args.duration {
            break;
        }
        notices = sim.advance(Duration::from_secs(1));
    }
    sim.stop();

    let summary = sim.summary();
    print_summary(&summary);

    if let Some(path) = &args.output {
        println!("\nWriting report to {}...", path.display());
        let report = RunReport {
            summary,
            snapshot: sim.snapshot(),
        };
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("  Report saved");
    }

    info!("Simulation finished");
    println!("\n✅ Simulation complete!\n");
    Ok(())
}

fn report_notice(second: u64, notice: &SimNotice) {
    match notice {
        SimNotice::AlertRaised(p) => println!(
            "[{:>4}s] ALERT     {} {} at {} (p={:.2})",
            second,
            p.severity.as_str().to_uppercase(),
            p.kind.as_str().to_uppercase(),
            p.location.name,
            p.probability
        ),
        SimNotice::ExtenderOffline(id) => println!("[{:>4}s] OFFLINE   {}", second, id),
        SimNotice::PhaseEntered(phase) => println!("[{:>4}s] PHASE     {}", second, phase),
        SimNotice::ResponseComplete => println!("[{:>4}s] COMPLETE  response finished", second),
        SimNotice::ReliefMessagingNeeded(crowded) => {
            println!("[{:>4}s] MESSAGING {} crowded hotspots", second, crowded)
        }
    }
}

fn print_summary(summary: &SimulationSummary) {
    println!("\n╔══════════════════════════════════════════════════════════╗");
    println!("║  Simulation Results                                      ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    let stats = &summary.stats;
    let rows: Vec<(&str, String)> = vec![
        ("Elapsed", format!("{:.0} s", summary.elapsed_secs)),
        ("Phase", summary.phase.to_string()),
        ("Progress", format!("{}%", summary.progress)),
        ("Response complete", summary.response_complete.to_string()),
        ("Incident", summary.incident.clone().unwrap_or_else(|| "-".to_string())),
        ("Drones active", format!("{}/{}", summary.active_drones, summary.total_drones)),
        ("Extenders active", format!("{}/{}", summary.active_extenders, summary.total_extenders)),
        ("Abnormal readings", summary.abnormal_readings.to_string()),
        ("Predictions", summary.predictions.to_string()),
        ("Hotspots", format!("{} ({} people)", summary.hotspots, summary.people_in_hotspots)),
        ("Fleet ticks", stats.fleet_ticks.to_string()),
        ("Sensor ticks", stats.sensor_ticks.to_string()),
        ("Progress ticks", stats.progress_ticks.to_string()),
        (
            "Alerts",
            format!(
                "{} raised / {} accepted / {} dismissed",
                stats.alerts_raised, stats.alerts_accepted, stats.alerts_dismissed
            ),
        ),
        ("Extenders lost", stats.extenders_offline.to_string()),
        ("Hotspot refreshes", stats.hotspot_refreshes.to_string()),
    ];

    println!("{:<20} {:>36}", "Metric", "Value");
    println!("{}", "-".repeat(57));
    for (label, value) in rows {
        println!("{:<20} {:>36}", label, value);
    }
}
