//! VMRA Simulation Engine CLI
//!
//! Runs the round-robin simulator locally and talks to the VMRA backend.
//!
//! ```bash
//! # Simulate four random VMs, one tick per second
//! vmra-sim run --vms 4
//!
//! # Explicit fleet, unpaced, timeline written to JSON
//! vmra-sim run --vm 20:2048 --vm 35:1024 --tick-ms 0 --output run.json
//!
//! # Backend calls
//! vmra-sim summary
//! vmra-sim allocate --vm-id 1 --cpu 30 --memory 2048
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vmra_core::{AllocationRequest, FleetBackend};
use vmra_simulation_engine::{
    driver::shared, render, Driver, HttpBackend, RunReport, Session, SimConfig, SimError,
    TaskInterval, VmSpec, DEFAULT_BACKEND_URL,
};

#[derive(Parser)]
#[command(name = "vmra-sim")]
#[command(about = "Simulate round-robin task scheduling across a VM fleet", long_about = None)]
struct Cli {
    /// Backend API endpoint
    #[arg(long, global = true, env = "VMRA_BACKEND", default_value = DEFAULT_BACKEND_URL)]
    backend: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a local simulation to completion
    Run {
        /// JSON config file (missing fields use defaults)
        #[arg(short, long)]
        config: Option<String>,

        /// Number of random VMs to admit
        #[arg(long, default_value_t = 3)]
        vms: usize,

        /// Explicit VM as CPU:MEMORY (repeatable, replaces --vms)
        #[arg(long = "vm")]
        specs: Vec<VmSpec>,

        /// Task-units per VM
        #[arg(long)]
        workload: Option<u32>,

        /// Wall-clock milliseconds between ticks (0 = unpaced)
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Seed for random VM generation
        #[arg(long)]
        seed: Option<u64>,

        /// Also send POST /schedule to the backend (fire-and-forget)
        #[arg(long)]
        notify_backend: bool,

        /// Output JSON file path (optional)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List VMs known to the backend
    Vms,

    /// Show the backend's fleet summary
    Summary,

    /// Show the backend's usage forecast
    Predict,

    /// Request new CPU/memory for a backend VM (default: +10 CPU, +512 MB)
    Allocate {
        #[arg(long)]
        vm_id: u64,

        #[arg(long)]
        cpu: Option<u32>,

        #[arg(long)]
        memory: Option<u64>,
    },

    /// Trigger a server-side scheduling pass
    Schedule,
}

/// JSON written by `run --output`
#[derive(Serialize)]
struct RunOutput<'a> {
    report: &'a RunReport,
    timeline: &'a [TaskInterval],
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vmra_simulation_engine=info,vmra_sim=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            vms,
            specs,
            workload,
            tick_ms,
            seed,
            notify_backend,
            output,
        } => {
            let mut sim_config = match config {
                Some(path) => SimConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config from {}", path))?,
                None => SimConfig::default(),
            };
            if let Some(units) = workload {
                sim_config = sim_config.with_workload_units(units);
            }
            if let Some(ms) = tick_ms {
                sim_config = sim_config.with_tick_interval_ms(ms);
            }

            let backend = if notify_backend {
                Some(Arc::new(HttpBackend::new(&cli.backend)?) as Arc<dyn FleetBackend>)
            } else {
                None
            };
            run_simulation(sim_config, vms, specs, seed, backend, output).await?;
        }
        Commands::Vms => {
            let backend = HttpBackend::new(&cli.backend)?;
            let vms = backend.list_vms().await?;
            print!("{}", render::vm_table(&vms));
        }
        Commands::Summary => {
            let backend = HttpBackend::new(&cli.backend)?;
            let summary = backend.summary().await?;
            print!("{}", render::summary(&summary));
        }
        Commands::Predict => {
            let backend = HttpBackend::new(&cli.backend)?;
            let predictions = backend.predict().await?;
            print!("{}", render::predictions(&predictions));
        }
        Commands::Allocate { vm_id, cpu, memory } => {
            let backend = HttpBackend::new(&cli.backend)?;
            let request = match (cpu, memory) {
                (Some(cpu), Some(memory)) => AllocationRequest::new(vm_id, cpu, memory),
                _ => {
                    let vms = backend.list_vms().await?;
                    let vm = vms
                        .iter()
                        .find(|vm| vm.id == vm_id)
                        .with_context(|| format!("VM {} not found", vm_id))?;
                    let top_up = AllocationRequest::top_up(vm);
                    AllocationRequest::new(
                        vm_id,
                        cpu.unwrap_or(top_up.cpu),
                        memory.unwrap_or(top_up.memory),
                    )
                }
            };
            let response = backend.allocate(&request).await?;
            println!("{}", response.message);
            print!("{}", render::vm_table(&[response.vm]));
        }
        Commands::Schedule => {
            let backend = HttpBackend::new(&cli.backend)?;
            let ack = backend.schedule().await?;
            println!("{} (time slice: {}s)", ack.message, ack.time_slice);
        }
    }

    Ok(())
}

async fn run_simulation(
    config: SimConfig,
    vms: usize,
    specs: Vec<VmSpec>,
    seed: Option<u64>,
    backend: Option<Arc<dyn FleetBackend>>,
    output: Option<String>,
) -> anyhow::Result<()> {
    let cadence = Duration::from_millis(config.tick_interval_ms);
    let mut session = Session::new(config)?;

    if specs.is_empty() {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        for _ in 0..vms {
            match session.add_random_vm(&mut rng) {
                Ok(vm) => debug!(vm_id = vm.id, "Added random VM"),
                Err(e @ SimError::CapacityExceeded { .. }) => {
                    warn!("Cannot add more VMs: {}", e);
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }
    } else {
        for spec in specs {
            if let Err(e) = session.add_vm(spec) {
                warn!("Rejected VM {}:{}: {}", spec.cpu_usage, spec.memory_usage, e);
            }
        }
    }

    print!("{}", render::summary(&session.summary()));
    print!("{}", render::vm_table(&session.fleet_snapshot()));
    println!();

    let mut driver = Driver::new(cadence);
    if let Some(backend) = backend {
        driver = driver.with_backend(backend);
    }

    info!("Applying round-robin scheduling");
    let session = shared(session);
    let report = driver
        .run_with(session.clone(), |tick, _| {
            if let Some(interval) = &tick.interval {
                info!(
                    "Tick {}: {} on VM{} [{}..{}]",
                    tick.index,
                    interval.label(),
                    interval.vm_id,
                    interval.start_time,
                    interval.end_time
                );
            }
        })
        .await?;

    let guard = session.lock().await;
    println!();
    print!("{}", render::vm_table(&guard.fleet_snapshot()));
    println!();
    println!("Task Gantt Chart");
    print!("{}", render::gantt(guard.recorder(), render::GANTT_WIDTH));
    println!();
    print!("{}", render::predictions(&guard.predict()));

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&RunOutput {
            report: &report,
            timeline: guard.timeline(),
        })?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path))?;
        info!("Results saved to {}", path);
    }

    println!(
        "\nSimulation complete: {} ticks, {} task-units over {} VMs",
        report.ticks, report.intervals, report.vm_count
    );
    Ok(())
}
