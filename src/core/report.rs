use crate::domain::model::{Configuration, Ledger, Snapshot};
use crate::utils::error::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    tier: usize,
    tier_name: &'a str,
    draw_order: usize,
    number: i64,
}

/// One CSV row per drawn number, tiers 1-based, in draw order.
pub fn write_csv<W: io::Write>(config: &Configuration, ledger: &Ledger, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    for (tier_index, tier) in config.tiers.iter().enumerate() {
        for (order, &number) in ledger.drawn(tier_index).iter().enumerate() {
            csv_writer.serialize(ResultRow {
                tier: tier_index + 1,
                tier_name: &tier.name,
                draw_order: order + 1,
                number,
            })?;
        }
    }

    // Header-only output when nothing has been drawn yet.
    if ledger.total_drawn() == 0 {
        csv_writer.write_record(["tier", "tier_name", "draw_order", "number"])?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn export_filename(date: NaiveDate) -> String {
    format!("results_{}.csv", date.format("%Y%m%d"))
}

/// Writes `results_<YYYYMMDD>.csv` into `output_dir` and returns its path.
pub fn export_csv(
    config: &Configuration,
    ledger: &Ledger,
    output_dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(export_filename(date));
    let file = fs::File::create(&path)?;
    write_csv(config, ledger, file)?;
    tracing::info!("Exported {} winners to {}", ledger.total_drawn(), path.display());
    Ok(path)
}

/// Plain-text board: one line per tier with its winners.
pub fn render_board(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}  [{}..={}]  {} numbers left",
        snapshot.title, snapshot.min_number, snapshot.max_number, snapshot.pool_size
    );

    for (index, tier) in snapshot.tiers.iter().enumerate() {
        let marker = if index == snapshot.current_tier_index && !snapshot.all_finished {
            '>'
        } else {
            ' '
        };
        let winners = if tier.drawn.is_empty() {
            "-".to_string()
        } else {
            tier.drawn
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        };
        let _ = writeln!(
            out,
            "{} {}. {} ({}/{}, {} left): {}",
            marker,
            index + 1,
            tier.name,
            tier.drawn.len(),
            tier.capacity,
            tier.remaining,
            winners
        );
    }

    if snapshot.all_finished {
        out.push_str("All tiers are complete.\n");
    }
    out
}
