use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use moesim::coherence::ReplacementKind;
use moesim::sim::config::{CacheConfig, Config, MemConfig, SimConfig};
use moesim::sim::top::Sim;
use toml::Table;

#[derive(Parser)]
#[command(version, about)]
struct MoesimArgs {
    #[arg(help="Path to config.toml")]
    config_path: Option<PathBuf>,
    #[arg(long, help="Override access trace path")]
    trace: Option<PathBuf>,
    #[arg(long, help="Override number of processors")]
    num_processors: Option<usize>,
    #[arg(long, help="Override number of sets per cache")]
    num_sets: Option<usize>,
    #[arg(long, help="Override ways per set")]
    associativity: Option<usize>,
    #[arg(long, help="Override replacement policy (random, lru, round_robin)")]
    replacement: Option<ReplacementKind>,
    #[arg(long, help="Seed for random replacement")]
    seed: Option<u64>,
    #[arg(long, help="Override memory size")]
    mem_size: Option<usize>,
    #[arg(long, help="Enable log at level (0:none, 1:info, 2:debug)")]
    log: Option<u64>,
    #[arg(long, help="Write final snapshot as JSON")]
    snapshot: Option<PathBuf>,
    #[arg(long, help="Print final cache contents")]
    print_snapshot: bool,
}

pub fn main() -> anyhow::Result<()> {
    env_logger::init();

    let argv = MoesimArgs::parse();
    let config_table: Table = match &argv.config_path {
        Some(path) => {
            let config = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&config).context("cannot parse config toml")?
        }
        None => Table::new(),
    };
    let mut sim_config = SimConfig::from_section(config_table.get("sim"))
        .context("in [sim] section")?;
    let mut cache_config = CacheConfig::from_section(config_table.get("cache"))
        .context("in [cache] section")?;
    let mut mem_config = MemConfig::from_section(config_table.get("mem"))
        .context("in [mem] section")?;

    // override toml configs with argv
    sim_config.trace = argv.trace.unwrap_or(sim_config.trace);
    sim_config.log_level = argv.log.unwrap_or(sim_config.log_level);
    sim_config.snapshot = argv.snapshot.or(sim_config.snapshot);
    sim_config.print_snapshot |= argv.print_snapshot;
    cache_config.num_processors = argv.num_processors.unwrap_or(cache_config.num_processors);
    cache_config.num_sets = argv.num_sets.unwrap_or(cache_config.num_sets);
    cache_config.associativity = argv.associativity.unwrap_or(cache_config.associativity);
    cache_config.replacement = argv.replacement.unwrap_or(cache_config.replacement);
    cache_config.seed = argv.seed.or(cache_config.seed);
    mem_config.size = argv.mem_size.unwrap_or(mem_config.size);

    if sim_config.trace.as_os_str().is_empty() {
        anyhow::bail!("no access trace given; set [sim] trace or pass --trace");
    }

    let mut sim = Sim::new(sim_config, cache_config, mem_config)?;
    let stats = sim.simulate()?;
    println!(
        "reads={} writes={} hits={} misses={} invalidations={}",
        stats.reads, stats.writes, stats.hits, stats.misses, stats.invalidations
    );
    Ok(())
}
