// =============================================================================
// Pathline Forecast Nexus — Main Entry Point
// =============================================================================
//
// Loads the active forecast config and the week's resolved input, evaluates
// the week against the latest stored snapshot, appends the result to the
// store, and prints the full snapshot as JSON for downstream display.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod alignment;
mod forecast_config;
mod history;
mod integrity;
mod pipeline;
mod scoring;
mod snapshot;
mod tripwire;
mod types;
mod weekly;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::forecast_config::ForecastConfig;
use crate::history::SnapshotStore;
use crate::pipeline::evaluate_week;
use crate::weekly::WeeklyInput;

fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Pathline Forecast Nexus — Weekly Evaluation      ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path =
        std::env::var("PATHLINE_CONFIG").unwrap_or_else(|_| "forecast_config.json".to_string());
    let input_path =
        std::env::var("PATHLINE_INPUT").unwrap_or_else(|_| "weekly_input.json".to_string());
    let store_path =
        std::env::var("PATHLINE_SNAPSHOTS").unwrap_or_else(|_| "snapshots.json".to_string());

    // ── 2. Load documents ────────────────────────────────────────────────
    let config = ForecastConfig::load(&config_path)?;
    let input = WeeklyInput::load(&input_path)?;

    let store = SnapshotStore::load(&store_path).unwrap_or_else(|e| {
        warn!(error = %e, "failed to load snapshot store, starting empty");
        SnapshotStore::new()
    });

    if store.is_empty() {
        info!("no snapshot history on record");
    } else if let Some(latest) = store.latest() {
        info!(
            snapshots = store.len(),
            latest_week = %latest.week_ending,
            "snapshot history available"
        );
    }

    // ── 3. Evaluate the week ─────────────────────────────────────────────
    let previous = store.previous_before(input.week_ending);
    if previous.is_none() {
        info!("no prior week on record, week-over-week delta will be null");
    }

    let snapshot = evaluate_week(&config, &input, previous.as_ref());

    info!(
        week_ending = %snapshot.week_ending,
        active = %snapshot.scores.active,
        score = snapshot.integrity.score,
        grade = %snapshot.integrity.grade,
        label = %snapshot.integrity.label,
        "snapshot computed"
    );

    // ── 4. Persist & emit ────────────────────────────────────────────────
    store.push(snapshot.clone());
    store.save(&store_path)?;

    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
