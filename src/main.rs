use clap::{Parser, Subcommand};
use std::path::PathBuf;
use traffic_agents::animation::{self, AnimationSettings};
use traffic_agents::export::read_trajectories;
use traffic_agents::plot::plot_statistic;
use traffic_agents::{LaneChangeStrategy, Model, ModelConfig, Result, Statistic};

#[derive(Parser)]
#[command(name = "traffic-agents")]
#[command(about = "Agent-based ring road traffic simulation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sweep over vehicle densities and chart the resulting flow or speed
    Simulate {
        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Number of lanes
        #[arg(long)]
        lanes: Option<usize>,
        /// Put vehicles under central control
        #[arg(long)]
        central: bool,
        /// Number of runs over all densities
        #[arg(long)]
        runs: Option<usize>,
        /// Statistic to chart: flow or speed
        #[arg(long, default_value = "flow")]
        stat: String,
        /// Where to save the chart
        #[arg(long, default_value = "density.png")]
        out: PathBuf,
        /// Directory to write the first run's trajectories to
        #[arg(long)]
        export: Option<PathBuf>,
        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
        /// Lane change strategy: greedy or traditional
        #[arg(long)]
        strategy: Option<String>,
    },
    /// Animate two trajectory files side by side
    Animate {
        /// Trajectories of the human-driven simulation
        human: PathBuf,
        /// Trajectories of the centrally controlled simulation
        smart: PathBuf,
        /// Where to save the GIF
        out: PathBuf,
        /// Length of the ring road in m
        #[arg(long, default_value = "2000")]
        road_length: f64,
        /// Time each frame is shown for, in ms
        #[arg(long, default_value = "100")]
        frame_delay: u32,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli.command) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Simulate {
            config,
            lanes,
            central,
            runs,
            stat,
            out,
            export,
            seed,
            strategy,
        } => {
            let stat: Statistic = stat.parse()?;
            let mut config = match config {
                Some(path) => ModelConfig::from_file(path)?,
                None => ModelConfig::default(),
            };
            if let Some(lanes) = lanes {
                config.lane_count = lanes;
            }
            if let Some(runs) = runs {
                config.runs = runs;
            }
            if let Some(strategy) = strategy {
                config.strategy = strategy.parse::<LaneChangeStrategy>()?;
            }
            config.central_control |= central;
            config.seed = seed.or(config.seed);

            let mut model = Model::new(config)?;
            model.run_all(export.as_deref())?;
            for (density, value) in model.mean_curve(stat) {
                println!("{:>8.2} veh/km  {:>10.2}  {}", density, value, stat.axis_label());
            }
            plot_statistic(&model, stat, &out)
        }
        Command::Animate {
            human,
            smart,
            out,
            road_length,
            frame_delay,
        } => {
            let human = read_trajectories(human)?;
            let smart = read_trajectories(smart)?;
            let settings = AnimationSettings {
                road_length,
                frame_delay,
                ..Default::default()
            };
            let frames = animation::animate(&human, &smart, &settings, &out)?;
            println!("Saved {} frames to {}", frames, out.display());
            Ok(())
        }
    }
}
