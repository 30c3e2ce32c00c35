use chrono::Local;
use clap::Parser;
use lucky_draw::config::{cli, CliConfig, Command, Settings};
use lucky_draw::core::report;
use lucky_draw::utils::error::ErrorCategory;
use lucky_draw::utils::{logger, validation::Validate};
use lucky_draw::{
    Configuration, DrawEngine, DrawObserver, DrawOutcome, FileStore, Phase, ReconfigureOutcome,
    StdRandom, Tier,
};
use std::io::{self, BufRead, Write};
use std::time::Duration;

type Engine = DrawEngine<FileStore, StdRandom>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ Failed to load settings: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if settings.json_logs() {
        logger::init_json_logger(cli.verbose, settings.log_level());
    } else {
        logger::init_cli_logger(cli.verbose, settings.log_level());
    }

    if let Err(e) = settings.validate() {
        tracing::error!("❌ Settings validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let data_dir = cli.data_dir(&settings).to_string();
    tracing::debug!("Using data directory {}", data_dir);

    if let Err(e) = run(&cli, &settings, &data_dir).await {
        tracing::error!("❌ {} (category: {:?})", e, e.category());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = match e.category() {
            ErrorCategory::Validation => 1,
            ErrorCategory::State => 2,
            ErrorCategory::Storage => 3,
        };
        std::process::exit(exit_code);
    }

    Ok(())
}

async fn run(cli: &CliConfig, settings: &Settings, data_dir: &str) -> lucky_draw::Result<()> {
    let seed = match &cli.command {
        Command::Draw { seed, .. } => seed.or(settings.seed()),
        _ => settings.seed(),
    };
    let random = seed
        .map(StdRandom::seeded)
        .unwrap_or_else(StdRandom::from_os_rng);
    let mut engine = DrawEngine::open(FileStore::new(data_dir), random)?;

    match &cli.command {
        Command::Status { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
            } else {
                print!("{}", report::render_board(&engine.snapshot()));
            }
        }
        Command::Draw { roll_ms, tier, .. } => {
            if let Some(tier) = tier {
                engine.select_tier(cli::tier_index(*tier)?)?;
                println!("🎯 Current tier: {}", engine.current_tier().name);
            }
            let duration = roll_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| settings.roll_duration());
            engine.add_observer(Box::new(RollingDisplay));
            draw(&mut engine, settings.roll_interval(), duration).await?;
        }
        Command::Configure {
            title,
            min,
            max,
            tiers,
            yes,
        } => configure(&mut engine, title.as_deref(), *min, *max, tiers, *yes)?,
        Command::Title { text } => {
            let saved = engine.set_title(text);
            println!("✅ Title set to '{}'", saved);
        }
        Command::Reset { yes } => reset(&mut engine, *yes)?,
        Command::Defaults { yes } => {
            if confirm(
                "Restore the default configuration? All winners will be cleared.",
                *yes,
            ) {
                engine.restore_defaults()?;
                println!("✅ Default configuration restored");
            } else {
                println!("Cancelled");
            }
        }
        Command::Export { output } => {
            let path = report::export_csv(
                engine.config(),
                engine.ledger(),
                output,
                Local::now().date_naive(),
            )?;
            println!("📁 Results saved to: {}", path.display());
        }
    }

    Ok(())
}

async fn draw(engine: &mut Engine, interval: Duration, duration: Duration) -> lucky_draw::Result<()> {
    match engine.request_draw()? {
        DrawOutcome::Started => {
            roll(engine, interval, duration).await;
            if let DrawOutcome::Stopped(winner) = engine.request_draw()? {
                let tier = &engine.config().tiers[winner.tier_index];
                println!(
                    "🎉 {} wins {} ({} left)",
                    winner.number,
                    tier.name,
                    engine.remaining(winner.tier_index).unwrap_or(0)
                );
            }
            if engine.phase() == Phase::Finished {
                println!("🏁 All tiers are complete.");
            }
        }
        DrawOutcome::Advanced(next) => println!(
            "➡️  Tier complete; moved on to '{}'. Run draw again to continue.",
            engine.config().tiers[next].name
        ),
        DrawOutcome::Finished => println!("🏁 All tiers are complete."),
        // A freshly opened engine is never rolling, so there is nothing to stop.
        DrawOutcome::Ignored | DrawOutcome::Stopped(_) => {
            println!("The draw is finished. Use `reset` to start over.")
        }
    }
    Ok(())
}

/// Drives the display sampler until the roll time is up or Ctrl-C arrives.
async fn roll(engine: &mut Engine, interval: Duration, duration: Duration) {
    let mut ticker = tokio::time::interval(interval);
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => {
                engine.tick();
            }
        }
    }
}

fn configure(
    engine: &mut Engine,
    title: Option<&str>,
    min: Option<i64>,
    max: Option<i64>,
    tiers: &[Tier],
    yes: bool,
) -> lucky_draw::Result<()> {
    let current = engine.config().clone();
    let edit = Configuration {
        title: title.map(str::to_string).unwrap_or(current.title),
        min_number: min.unwrap_or(current.min_number),
        max_number: max.unwrap_or(current.max_number),
        tiers: if tiers.is_empty() {
            current.tiers
        } else {
            tiers.to_vec()
        },
    };

    let range_size = edit.max_number.saturating_sub(edit.min_number).saturating_add(1);
    if i64::try_from(edit.total_capacity()).unwrap_or(i64::MAX) > range_size {
        tracing::warn!(
            "Tiers ask for {} winners but the range only holds {} numbers",
            edit.total_capacity(),
            range_size
        );
    }

    let outcome = engine.reconfigure(edit, |reason| {
        confirm(
            &format!(
                "This change discards all recorded winners because {}. Continue?",
                reason
            ),
            yes,
        )
    })?;

    match outcome {
        ReconfigureOutcome::Applied => println!("✅ Configuration saved"),
        ReconfigureOutcome::Reset(_) => println!("✅ Configuration saved; winners cleared"),
        ReconfigureOutcome::NotSaved(reason) => {
            println!("⚠️  Tier changes were not saved ({})", reason)
        }
    }
    Ok(())
}

fn reset(engine: &mut Engine, yes: bool) -> lucky_draw::Result<()> {
    let confirmed = if yes || engine.ledger().total_drawn() == 0 {
        true
    } else if engine.phase() == Phase::Finished {
        confirm(
            "All tiers are complete. Reset the draw? All winners will be cleared.",
            false,
        )
    } else {
        let index = engine.state().current_tier_index;
        let prompt = format!(
            "Drawing '{}' is in progress ({} drawn, {} left). Reset? All winners will be cleared.",
            engine.current_tier().name,
            engine.ledger().drawn_count(index),
            engine.remaining(index).unwrap_or(0)
        );
        confirm(&prompt, false) && confirm("This cannot be undone. Delete all winners?", false)
    };

    if confirmed {
        engine.reset()?;
        println!("✅ Draw reset");
    } else {
        println!("Cancelled");
    }
    Ok(())
}

fn confirm(prompt: &str, assume_yes: bool) -> bool {
    if assume_yes {
        return true;
    }

    print!("{} [y/N] ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(e) => {
            tracing::warn!("Could not read confirmation: {}", e);
            false
        }
    }
}

/// Prints sampled numbers in place while the draw rolls.
struct RollingDisplay;

impl DrawObserver for RollingDisplay {
    fn on_number_sampled(&mut self, number: i64) {
        print!("\r🎲 {:>6}", number);
        let _ = io::stdout().flush();
    }

    fn on_draw_stop(&mut self, _winning_number: i64, _tier_index: usize) {
        println!();
    }
}
