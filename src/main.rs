use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use diners::{Coordinator, SimulationConfig, SimulationEvent};

#[derive(Parser)]
#[command(name = "diners")]
#[command(about = "Dining philosophers simulation with deadlock detection", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        #[arg(long, help = "Number of philosophers")]
        population: Option<usize>,
        #[arg(long, help = "Speed multiplier, smaller is faster")]
        speed: Option<u32>,
        #[arg(long, help = "Delay between taking the right and left utensil")]
        gap_ms: Option<u64>,
        #[arg(long, default_value_t = 10, help = "How long to run")]
        duration_secs: u64,
        #[arg(long, help = "TOML configuration file")]
        config: Option<PathBuf>,
        #[arg(long, help = "Start a new table whenever a deadlock is detected")]
        auto_restart: bool,
        #[arg(long, help = "Print the final table as JSON")]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            population,
            speed,
            gap_ms,
            duration_secs,
            config,
            auto_restart,
            json,
        } => {
            let mut config = match config {
                Some(path) => SimulationConfig::from_file(&path)?,
                None => SimulationConfig::from_env(),
            };
            if let Some(population) = population {
                config.population = population;
            }
            if let Some(speed) = speed {
                config.speed = speed;
            }
            if let Some(gap_ms) = gap_ms {
                config.utensil_gap_ms = gap_ms;
            }
            config.validate()?;

            run_simulation(&config, Duration::from_secs(duration_secs), auto_restart, json).await?
        }
    }

    Ok(())
}

async fn run_simulation(
    config: &SimulationConfig,
    duration: Duration,
    auto_restart: bool,
    json: bool,
) -> Result<()> {
    let coordinator = Coordinator::new(config);
    let mut events = BroadcastStream::new(coordinator.subscribe());
    coordinator.start()?;

    println!(
        "Seated {} philosophers (speed {}, gap {} ms)",
        config.population, config.speed, config.utensil_gap_ms
    );

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);

    let mut deadlocks = 0;
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            item = events.next() => match item {
                Some(Ok(SimulationEvent::DeadlockDetected { count })) => {
                    deadlocks += 1;
                    print!("{}", coordinator.drain_log());
                    println!("Deadlock: all {} philosophers hold their right utensil", count);
                    if auto_restart && coordinator.restart()? {
                        println!("Restarted the table");
                    }
                }
                Some(_) => print!("{}", coordinator.drain_log()),
                None => break,
            },
        }
    }

    coordinator.stop();
    print!("{}", coordinator.drain_log());
    println!("Stopped after {} deadlock(s)", deadlocks);

    if json {
        println!("{}", serde_json::to_string_pretty(&coordinator.snapshot())?);
    }

    Ok(())
}
