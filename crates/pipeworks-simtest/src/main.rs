//! Pipeworks Headless Simulation Harness
//!
//! Runs scripted pipe scenarios and a seeded randomized sweep against the
//! engine, entirely in-process, and prints a pass/fail table.
//!
//! Usage:
//!   cargo run -p pipeworks-simtest
//!   cargo run -p pipeworks-simtest -- --verbose --seed 42
//!   RUST_LOG=debug cargo run -p pipeworks-simtest

use hecs::Entity;
use pipeworks_core::prelude::*;
use pipeworks_logic::canister::Canister;
use pipeworks_logic::constants::{ONE_ATMOSPHERE, R, T20C};
use pipeworks_logic::mixing_port::MixingPort;
use pipeworks_logic::pumps::{PassiveGate, PressurePump, VolumePump};
use pipeworks_logic::recycler::Recycler;
use pipeworks_logic::regulator::PressureRegulator;
use pipeworks_logic::transfer::fraction_to_equalize_pressure;
use pipeworks_logic::{Gas, GasMixture};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Shipped configuration ───────────────────────────────────────────────
const CONFIG_JSON: &str = include_str!("../../../data/pipeworks.json");

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    let seed = args
        .iter()
        .position(|a| a == "--seed")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(7);
    log::info!("harness starting, sweep seed {}", seed);
    println!("=== Pipeworks Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Shipped config and prototypes
    results.extend(validate_config(verbose));

    // 2. Gas math
    results.extend(validate_gas_math(verbose));

    // 3. Device scenarios
    results.extend(validate_devices(verbose));

    // 4. Network topology
    results.extend(validate_topology(verbose));

    // 5. Randomized conservation sweep
    results.extend(validate_random_sweep(seed, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn close(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() <= tolerance * a.abs().max(b.abs()).max(1.0)
}

fn pressure_at(engine: &SimulationEngine, entity: Entity, port: PortKind) -> f32 {
    engine
        .node_air(entity, port)
        .map(GasMixture::pressure)
        .unwrap_or(0.0)
}

// ── 1. Config ───────────────────────────────────────────────────────────

fn validate_config(verbose: bool) -> Vec<TestResult> {
    println!("--- Config & Prototypes ---");
    let mut results = Vec::new();

    let config = match SimulationConfig::from_json_str(CONFIG_JSON) {
        Ok(c) => c,
        Err(e) => {
            results.push(TestResult {
                name: "config_parse".into(),
                passed: false,
                detail: format!("{}", e),
            });
            return results;
        }
    };

    results.push(TestResult {
        name: "config_has_prototypes".into(),
        passed: !config.prototypes.is_empty(),
        detail: format!("{} prototypes loaded", config.prototypes.len()),
    });

    // Every prototype spawns and survives a few ticks
    let names: Vec<String> = config.prototypes.keys().cloned().collect();
    let mut engine = SimulationEngine::with_config(config);
    engine
        .environment_mut()
        .fill_area(TilePos::new(0, 0), TilePos::new(15, 0), &Environment::breathable_air());
    let mut spawned = Vec::new();
    let mut failures = Vec::new();
    for (x, name) in names.iter().enumerate() {
        match engine.spawn_prototype(name, TilePos::new(x as i32, 0)) {
            Ok(entity) => spawned.push((name.clone(), entity)),
            Err(e) => failures.push(format!("{}: {}", name, e)),
        }
    }
    for _ in 0..10 {
        engine.update(1.0);
    }
    results.push(TestResult {
        name: "config_prototypes_spawn".into(),
        passed: failures.is_empty(),
        detail: if failures.is_empty() {
            format!("{} prototypes spawned and ticked", spawned.len())
        } else {
            failures.join(", ")
        },
    });

    // Canister prototypes filled their ports
    let unfilled: Vec<&str> = spawned
        .iter()
        .filter(|(name, _)| name.ends_with("canister"))
        .filter(|(_, entity)| pressure_at(&engine, *entity, PortKind::Port) <= 0.0)
        .map(|(name, _)| name.as_str())
        .collect();
    results.push(TestResult {
        name: "config_canisters_filled".into(),
        passed: unfilled.is_empty(),
        detail: if unfilled.is_empty() {
            "every canister port holds gas".into()
        } else {
            format!("empty: {}", unfilled.join(", "))
        },
    });

    if verbose {
        println!("  Prototype snapshots after 10 s:");
        for (name, entity) in &spawned {
            if let Some(s) = engine.snapshot(*entity) {
                println!(
                    "    {:18} {:22} in={:>9.2} out={:>9.2} flow={:>7.2} L/s",
                    name,
                    s.kind.name(),
                    s.inlet_pressure.unwrap_or(0.0),
                    s.outlet_pressure.unwrap_or(0.0),
                    s.flow_rate
                );
            }
        }
    }

    results
}

// ── 2. Gas Math ─────────────────────────────────────────────────────────

fn validate_gas_math(_verbose: bool) -> Vec<TestResult> {
    println!("--- Gas Math ---");
    let mut results = Vec::new();

    // Merge then split by volume
    let a = GasMixture::new(100.0)
        .with_temperature(250.0)
        .with_moles(Gas::Oxygen, 4.0)
        .with_moles(Gas::Nitrogen, 12.0);
    let b = GasMixture::new(300.0)
        .with_temperature(450.0)
        .with_moles(Gas::CarbonDioxide, 9.0);
    let energy = a.thermal_energy() + b.thermal_energy();
    let mut pooled = GasMixture::new(400.0);
    pooled.copy_from(&a);
    pooled.merge(b);
    let part = pooled.remove_ratio(0.25);
    results.push(TestResult {
        name: "gas_merge_split_conserves".into(),
        passed: close(part.total_moles() + pooled.total_moles(), 25.0, 1e-5)
            && close(part.thermal_energy() + pooled.thermal_energy(), energy, 1e-4),
        detail: format!(
            "{:.4} mol, {:.1} J after split",
            part.total_moles() + pooled.total_moles(),
            part.thermal_energy() + pooled.thermal_energy()
        ),
    });

    // 200 kPa against 50 kPa, equal volumes: 0.375 of the inlet equalizes
    let high = GasMixture::filled(200.0, 300.0, Gas::Nitrogen, 200.0);
    let low = GasMixture::filled(200.0, 300.0, Gas::Nitrogen, 50.0);
    let fraction = fraction_to_equalize_pressure(&high, &low);
    results.push(TestResult {
        name: "gas_fraction_to_equalize".into(),
        passed: close(fraction, 0.375, 1e-4),
        detail: format!("fraction = {:.4}", fraction),
    });

    // Space swallows gas
    let mut space = GasMixture::space();
    space.merge(GasMixture::filled(100.0, T20C, Gas::Oxygen, ONE_ATMOSPHERE));
    results.push(TestResult {
        name: "gas_space_is_immutable".into(),
        passed: space.total_moles() == 0.0,
        detail: format!("space holds {} mol", space.total_moles()),
    });

    results
}

// ── 3. Device Scenarios ─────────────────────────────────────────────────

fn validate_devices(_verbose: bool) -> Vec<TestResult> {
    println!("--- Device Scenarios ---");
    let mut results = Vec::new();

    // Pressure pump: 10 mol O2 in 2 L pushed into an empty 2 L outlet
    let mut engine = SimulationEngine::with_config(SimulationConfig {
        pipe_volume: 2.0,
        ..Default::default()
    });
    let pump = engine.spawn_device(
        GasDevice::PressurePump(PressurePump::default()),
        TilePos::new(0, 0),
    );
    let loaded = engine
        .fill_node(
            pump,
            PortKind::Inlet,
            GasMixture::new(2.0)
                .with_temperature(300.0)
                .with_moles(Gas::Oxygen, 10.0),
        )
        .and_then(|_| {
            engine.fill_node(pump, PortKind::Outlet, GasMixture::new(2.0).with_temperature(300.0))
        });
    engine.update(1.0);
    let outlet = pressure_at(&engine, pump, PortKind::Outlet);
    results.push(TestResult {
        name: "device_pressure_pump".into(),
        passed: loaded.is_ok()
            && close(engine.total_moles(), 10.0, 1e-5)
            && outlet <= ONE_ATMOSPHERE * (1.0 + 1e-4),
        detail: format!(
            "outlet {:.3} kPa, {:.4} mol total",
            outlet,
            engine.total_moles()
        ),
    });

    // Relief valve, 10 L/s rating against a 75 L equalizing demand
    let mut engine = SimulationEngine::new();
    let valve = engine.spawn_device(
        GasDevice::PressureRegulator(PressureRegulator {
            threshold: 100.0,
            max_transfer_rate: 10.0,
            ..PressureRegulator::relief_valve()
        }),
        TilePos::new(0, 0),
    );
    let inlet = GasMixture::filled(200.0, 300.0, Gas::Nitrogen, 200.0);
    let inlet_moles = inlet.total_moles();
    let to_threshold = inlet_moles - 100.0 * 200.0 / (R * 300.0);
    let wanted = to_threshold.min(0.375 * inlet_moles) * R * 300.0 / 200.0;
    let expected = wanted.clamp(0.0, 10.0);
    let _ = engine.fill_node(valve, PortKind::Inlet, inlet);
    let _ = engine.fill_node(
        valve,
        PortKind::Outlet,
        GasMixture::filled(200.0, 300.0, Gas::Nitrogen, 50.0),
    );
    engine.update(1.0);
    let flow = engine.snapshot(valve).map(|s| s.flow_rate).unwrap_or(0.0);
    results.push(TestResult {
        name: "device_relief_valve_volume".into(),
        passed: close(flow, expected, 1e-4),
        detail: format!("moved {:.3} L (expected {:.3} L)", flow, expected),
    });

    // Recycler below its reaction threshold still flows
    let mut engine = SimulationEngine::new();
    let recycler = engine.spawn_device(GasDevice::Recycler(Recycler::default()), TilePos::new(0, 0));
    let _ = engine.fill_node(
        recycler,
        PortKind::Inlet,
        GasMixture::filled(200.0, 300.0, Gas::CarbonDioxide, 500.0),
    );
    engine.update(1.0);
    let reacting = match engine.world.get::<&GasDevice>(recycler).as_deref() {
        Ok(GasDevice::Recycler(r)) => r.reacting,
        _ => true,
    };
    let co2_out = engine
        .node_air(recycler, PortKind::Outlet)
        .map(|air| air.get_moles(Gas::CarbonDioxide))
        .unwrap_or(0.0);
    results.push(TestResult {
        name: "device_recycler_cold".into(),
        passed: !reacting && co2_out > 0.0,
        detail: format!("reacting={} co2 out={:.3} mol", reacting, co2_out),
    });

    // Canister spawn at 5 atm
    let mut engine = SimulationEngine::new();
    let canister = engine.spawn_device(
        GasDevice::Canister(Canister::with_contents(GasMixture::filled(
            1000.0,
            T20C,
            Gas::Oxygen,
            5.0 * ONE_ATMOSPHERE,
        ))),
        TilePos::new(0, 0),
    );
    engine.update(1.0);
    let port = pressure_at(&engine, canister, PortKind::Port);
    let net_size = engine
        .network_of(canister, PortKind::Port)
        .map(|net| engine.network_size(net))
        .unwrap_or(0);
    results.push(TestResult {
        name: "device_canister_spawn".into(),
        passed: close(port, 5.0 * ONE_ATMOSPHERE, 1e-4) && net_size == 1,
        detail: format!("port {:.2} kPa, network of {}", port, net_size),
    });

    results
}

// ── 4. Topology ─────────────────────────────────────────────────────────

fn pipe_run(engine: &mut SimulationEngine, length: usize, y: i32) -> Vec<Entity> {
    let pipes: Vec<Entity> = (0..length)
        .map(|x| engine.spawn_pipe(TilePos::new(x as i32, y)))
        .collect();
    for pair in pipes.windows(2) {
        let _ = engine.connect((pair[0], PortKind::Pipe), (pair[1], PortKind::Pipe));
    }
    pipes
}

fn validate_topology(_verbose: bool) -> Vec<TestResult> {
    println!("--- Network Topology ---");
    let mut results = Vec::new();

    let mut engine = SimulationEngine::new();
    let left = pipe_run(&mut engine, 5, 0);
    let right = pipe_run(&mut engine, 7, 1);
    let valve = engine.spawn_device(GasDevice::Valve(Valve::default()), TilePos::new(5, 0));
    let _ = engine.connect((left[4], PortKind::Pipe), (valve, PortKind::Inlet));
    let _ = engine.connect((valve, PortKind::Outlet), (right[0], PortKind::Pipe));
    engine.update(1.0);

    let size_of = |engine: &SimulationEngine, entity: Entity| {
        engine
            .network_of(entity, PortKind::Pipe)
            .map(|net| engine.network_size(net))
            .unwrap_or(0)
    };
    let split = (size_of(&engine, left[0]), size_of(&engine, right[0]));

    let _ = engine.toggle_valve(valve);
    engine.update(1.0);
    let joined = size_of(&engine, left[0]);

    let _ = engine.toggle_valve(valve);
    engine.update(1.0);
    let restored = (size_of(&engine, left[0]), size_of(&engine, right[0]));

    results.push(TestResult {
        name: "topology_valve_join".into(),
        passed: joined == split.0 + split.1 && engine.network_count() == 2,
        detail: format!("{} + {} → {}", split.0, split.1, joined),
    });
    results.push(TestResult {
        name: "topology_valve_restore".into(),
        passed: restored == split,
        detail: format!("{:?} after closing", restored),
    });

    // Unanchoring drops a device out of the pipe it sits on
    let pump = engine.spawn_device(
        GasDevice::PressurePump(PressurePump::default()),
        TilePos::new(0, 2),
    );
    let _ = engine.connect((right[6], PortKind::Pipe), (pump, PortKind::Inlet));
    engine.update(1.0);
    let attached = engine.network_of(pump, PortKind::Inlet) == engine.network_of(right[6], PortKind::Pipe);
    let _ = engine.set_anchored(pump, false);
    engine.update(1.0);
    let detached = engine.network_of(pump, PortKind::Inlet) != engine.network_of(right[6], PortKind::Pipe);
    results.push(TestResult {
        name: "topology_unanchor".into(),
        passed: attached && detached,
        detail: format!("attached={} detached={}", attached, detached),
    });

    results
}

// ── 5. Randomized Sweep ─────────────────────────────────────────────────

fn random_device(rng: &mut StdRng) -> GasDevice {
    match rng.gen_range(0..7) {
        0 => GasDevice::PressurePump(PressurePump {
            target_pressure: rng.gen_range(0.0..500.0),
            ..Default::default()
        }),
        1 => GasDevice::PassiveGate(PassiveGate::default()),
        2 => GasDevice::VolumePump(VolumePump {
            transfer_rate: rng.gen_range(0.0..200.0),
            ..Default::default()
        }),
        3 => GasDevice::PressureRegulator(PressureRegulator::default()),
        4 => GasDevice::PressureRegulator(PressureRegulator::relief_valve()),
        5 => GasDevice::Recycler(Recycler::default()),
        _ => GasDevice::MixingPort(MixingPort::default()),
    }
}

fn validate_random_sweep(seed: u64, verbose: bool) -> Vec<TestResult> {
    println!("--- Randomized Sweep (seed {}) ---", seed);
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(seed);

    let mut worst_drift = 0.0f32;
    let mut negatives = 0usize;
    let runs = 20;
    for run in 0..runs {
        let mut engine = SimulationEngine::new();
        let mut previous = pipe_run(&mut engine, rng.gen_range(1..4), 0);
        for segment in 1..rng.gen_range(3..8) {
            let device = engine.spawn_device(random_device(&mut rng), TilePos::new(0, segment));
            let next = pipe_run(&mut engine, rng.gen_range(1..4), segment);
            if let Some(tail) = previous.last() {
                let _ = engine.connect((*tail, PortKind::Pipe), (device, PortKind::Inlet));
            }
            let _ = engine.connect((device, PortKind::Outlet), (next[0], PortKind::Pipe));
            for pipe in &next {
                let mut mixture = GasMixture::new(engine.config().pipe_volume)
                    .with_temperature(rng.gen_range(150.0..800.0));
                for gas in Gas::ALL {
                    if rng.gen_bool(0.5) {
                        mixture.set_moles(gas, rng.gen_range(0.0..40.0));
                    }
                }
                let _ = engine.fill_node(*pipe, PortKind::Pipe, mixture);
            }
            previous = next;
        }

        let start = engine.total_moles();
        for _ in 0..100 {
            engine.update(rng.gen_range(0.1..2.0));
            negatives += engine
                .graph()
                .iter()
                .filter_map(|(_, node)| node.owned_air())
                .filter(|air| Gas::ALL.iter().any(|gas| air.get_moles(*gas) < 0.0))
                .count();
        }
        let drift = ((engine.total_moles() - start) / start.max(1.0)).abs();
        worst_drift = worst_drift.max(drift);
        if verbose {
            println!(
                "  run {:2}: {:3} nodes, {:2} networks, drift {:.2e}",
                run,
                engine.graph().node_count(),
                engine.network_count(),
                drift
            );
        }
    }

    results.push(TestResult {
        name: "sweep_conserves_moles".into(),
        passed: worst_drift < 1e-3,
        detail: format!("worst relative drift {:.2e} over {} runs", worst_drift, runs),
    });
    results.push(TestResult {
        name: "sweep_non_negative".into(),
        passed: negatives == 0,
        detail: format!("{} negative readings", negatives),
    });

    results
}
