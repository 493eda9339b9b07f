use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use freefall_core::{grams_to_kg, mps_to_kmh, DragRegime, Overrides, SimulationConfig, World};
use freefall_sim::{ComparativeSeries, Simulation};

#[derive(Parser)]
#[command(name = "freefall")]
#[command(version)]
#[command(about = "Free-fall simulator: RK4 integration compared with analytical drag solutions", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the preset worlds
    Worlds,

    /// Drop the body and print the comparison report
    Run {
        #[command(flatten)]
        setup: Setup,

        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        output: OutputFormat,

        /// Give up if the body has not landed after this many ticks
        #[arg(long, default_value = "10000000")]
        max_ticks: u64,
    },

    /// Check a terminal-velocity guess against the analytical value
    Check {
        #[command(flatten)]
        setup: Setup,

        /// Guessed terminal velocity (m/s)
        #[arg(long)]
        guess: f64,
    },
}

#[derive(Args)]
struct Setup {
    /// Preset world (earth-air, earth-vacuum, moon, water, jupiter, custom)
    #[arg(short, long, default_value = "earth-air")]
    world: World,

    /// JSON simulation config; replaces the world and body options
    #[arg(long, conflicts_with = "world")]
    config: Option<PathBuf>,

    /// Mass (grams)
    #[arg(short, long, default_value = "70")]
    mass: f64,

    /// Drop height (m)
    #[arg(long, default_value = "100")]
    height: f64,

    /// Initial downward velocity (m/s)
    #[arg(long, default_value = "0")]
    v0: f64,

    /// Gravity override (m/s², custom world only)
    #[arg(short, long)]
    gravity: Option<f64>,

    /// Drag coefficient override (custom and earth-air only)
    #[arg(short = 'k', long)]
    drag: Option<f64>,

    /// Drag regime override (none, linear, quadratic; unknown -> linear)
    #[arg(long)]
    regime: Option<DragRegime>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl Setup {
    fn build(&self) -> Result<SimulationConfig> {
        if let Some(path) = &self.config {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            let config: SimulationConfig = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parsing {}", path.display()))?;
            return Ok(config);
        }

        let mut config = SimulationConfig::for_world(self.world, grams_to_kg(self.mass), self.height, self.v0);
        let overrides = Overrides { gravity: self.gravity, drag_coefficient: self.drag, regime: self.regime };
        config.apply_overrides(self.world, &overrides)?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Worlds => print_worlds(),
        Commands::Run { setup, output, max_ticks } => {
            let mut sim = Simulation::new(setup.build()?)?;
            let summary = sim.run_until_landed(max_ticks)?;
            let report = sim.report();
            match output {
                OutputFormat::Json => println!("{}", report.to_json(true)?),
                OutputFormat::Csv => print!("{}", report.to_csv()),
                OutputFormat::Table => {
                    let p = sim.params();
                    println!("regime           {}", p.regime);
                    println!("mass             {} kg", p.mass);
                    println!("gravity          {} m/s²", p.gravity);
                    println!("drag coefficient {}", p.effective_drag());
                    println!("weight           {:.4} N", p.weight());
                    println!("fall time        {:.4} s ({} ticks)", summary.elapsed, summary.ticks);
                    println!(
                        "impact velocity  {:.4} m/s ({:.2} km/h)",
                        summary.impact_velocity,
                        mps_to_kmh(summary.impact_velocity)
                    );
                    println!("terminal         {}", fmt_velocity(report.terminal_velocity));
                    println!();
                    print_table(&report);
                }
            }
        }
        Commands::Check { setup, guess } => {
            let sim = Simulation::new(setup.build()?)?;
            let check = sim.check_terminal_guess(guess)?;
            if check.correct {
                println!("CORRECT: terminal velocity = {}", fmt_velocity(check.reference));
            } else {
                println!("INCORRECT: analytical terminal velocity is {}", fmt_velocity(check.reference));
            }
        }
    }
    Ok(())
}

fn print_worlds() {
    println!("{:<14} {:>8} {:>8} {:<10} description", "world", "g", "k", "regime");
    for world in World::ALL {
        let p = world.preset();
        println!(
            "{:<14} {:>8.2} {:>8.3} {:<10} {}",
            world.name(),
            p.gravity,
            p.drag_coefficient,
            p.regime.tag(),
            p.description
        );
    }
}

fn print_table(report: &ComparativeSeries) {
    print!("{:>8} {:>12}", "t (s)", "rk4");
    for curve in &report.references {
        print!(" {:>16}", curve.kind.tag());
    }
    println!();
    for (i, label) in report.labels().iter().enumerate() {
        print!("{:>8} {:>12.4}", label, report.numeric[i]);
        for curve in &report.references {
            print!(" {:>16.4}", curve.values[i]);
        }
        println!();
    }
}

fn fmt_velocity(v: f64) -> String {
    if v.is_finite() { format!("{v:.4} m/s") } else { "∞ (no drag)".to_string() }
}
