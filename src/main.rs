//! Particle Flow CLI - Run a headless flow simulation over a JSON dataset.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use particle_flow::{
    compute::{Driver, FlowEngine, HierarchyKind, Unpaced, default_layout},
    schema::{Dataset, DatasetShape, EngineConfig, LayoutConfig},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <data.json> [ticks] [--flat]", args[0]);
        eprintln!();
        eprintln!("Run a particle flow simulation over a JSON dataset.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  data.json  Path to the dataset file");
        eprintln!("  ticks      Number of ticks to simulate (default: 600)");
        eprintln!("  --flat     Treat the dataset as a flat category record");
        eprintln!();
        eprintln!("Engine configuration is read from <data>.config.json when present.");
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let data_path = PathBuf::from(&args[1]);
    let flat = args.iter().skip(2).any(|a| a == "--flat");
    let ticks: u64 = args
        .iter()
        .skip(2)
        .find_map(|s| s.parse().ok())
        .unwrap_or(600);

    let shape = if flat {
        DatasetShape::flat()
    } else {
        DatasetShape::default()
    };

    // Load configuration
    let config_path = data_path.with_extension("config.json");
    let config: EngineConfig = if config_path.exists() {
        let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
            eprintln!("Error reading config file: {}", e);
            std::process::exit(1);
        });
        serde_json::from_str(&config_str).unwrap_or_else(|e| {
            eprintln!("Error parsing config: {}", e);
            std::process::exit(1);
        })
    } else {
        EngineConfig::for_shape(&shape)
    };

    // Load dataset
    let dataset = Dataset::from_path(&data_path, &shape, config.max_depth).unwrap_or_else(|e| {
        eprintln!("Error loading dataset: {}", e);
        std::process::exit(1);
    });

    let mut engine = FlowEngine::new(&dataset, config).unwrap_or_else(|e| {
        eprintln!("Error creating engine: {}", e);
        std::process::exit(1);
    });

    let kind = engine.hierarchy().kind;
    let layout_config = match kind {
        HierarchyKind::Nested => LayoutConfig::nested(960.0),
        HierarchyKind::Flat => LayoutConfig::flat(960.0),
    };
    if let Err(e) = layout_config.validate() {
        eprintln!("Error in layout: {}", e);
        std::process::exit(1);
    }
    let layout = engine.apply_layout(default_layout(kind, layout_config).as_ref());

    println!("Particle Flow Simulation");
    println!("========================");
    println!("Dataset: {} ({:?})", data_path.display(), kind);
    println!("Canvas: {:.0}x{:.0}", layout.width, layout.height);
    println!("Routes: {}", engine.routes().len());
    println!("Destinations: {}", engine.routes().destinations().len());
    println!("Population cap: {}", engine.population_cap());
    println!("Ticks: {}", ticks);
    println!();

    // Run simulation
    println!("Running simulation...");
    let start = Instant::now();
    let mut driver = Driver::new();
    let result = driver.run(&mut engine, &mut Unpaced::new(ticks), |frame| {
        // Print progress every 10%
        if frame.tick % (ticks / 10).max(1) == 0 {
            let arrived: u64 = frame.counters.iter().map(|c| c.count).sum();
            let elapsed = start.elapsed().as_secs_f32();
            println!(
                "  Tick {}/{}: in flight={}, arrived={}, {:.1} ticks/s",
                frame.tick,
                ticks,
                frame.sprites.len(),
                arrived,
                frame.tick as f32 / elapsed
            );
        }
    });
    if let Err(e) = result {
        eprintln!("Simulation failed: {}", e);
        std::process::exit(1);
    }

    let elapsed = start.elapsed();

    println!();
    println!("Arrivals:");
    for counter in engine.counters() {
        println!(
            "  {:<20} {:<12} {:>6} {:>5}",
            counter.destination,
            counter.group,
            counter.count,
            counter.label()
        );
    }
    println!();
    println!(
        "Time: {:.2}s ({:.1} ticks/s)",
        elapsed.as_secs_f32(),
        ticks as f32 / elapsed.as_secs_f32()
    );
}

fn print_example_config() {
    let config = EngineConfig::default();

    println!("Example configuration (data.config.json):");
    println!("{}", serde_json::to_string_pretty(&config).unwrap());
    println!();
    println!("Example nested dataset (data.json):");
    println!(
        "{}",
        r#"{"root": {"A": {"B": {"males": 3, "females": 1}}, "C": {"males": 4}}}"#
    );
    println!();
    println!("Example flat dataset (run with --flat):");
    println!(
        "{}",
        r#"{"bit0": 10, "bit1": 20, "bit2": 30, "bit3": 25, "bit4": 15, "males": 60, "females": 40}"#
    );
}
