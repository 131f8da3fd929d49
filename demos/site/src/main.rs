//! site — end-to-end demo of the site dispatch engine.
//!
//! Builds a small port site (two warehouses, two cranes, a frame truck towing a
//! frame), files a ship transport and an internal transfer, lets the
//! scheduler assign crews round by round, executes everything, and prints
//! the status and performance reports.
//!
//! Usage: `site [config.json]`.  Without a file the default 20×20 grid is
//! used.  Events and final task records go to `output/site/`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tms_core::{DispatchConfig, Position, ProductId, TaskStatus};
use tms_dispatch::{Dispatcher, DispatcherBuilder, ShipOrder};
use tms_output::{CsvWriter, EventRecorder};
use tms_registry::{CapacityBasis, Equipment, EquipmentKind, Product, Warehouse, WarehouseKind};
use tms_task::ShipPlan;

const OUTPUT_DIR: &str = "output/site";
/// Scheduling rounds before giving up on tasks that stay Pending.
const MAX_ROUNDS: usize = 8;
const LOG_LINES: usize = 20;

// ── Site data ─────────────────────────────────────────────────────────────────

fn load_config() -> Result<DispatchConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            let config: DispatchConfig = serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?;
            Ok(config)
        }
        None => Ok(DispatchConfig::default()),
    }
}

fn populate(d: &Dispatcher) -> Result<()> {
    d.add_product(Product::new("P001", "钢材", 10.0, 5.0).with_category("金属").with_unit_price(5000.0))?;
    d.add_product(Product::new("P002", "水泥", 8.0, 4.0).with_category("建材").with_unit_price(800.0))?;
    d.add_product(Product::new("P003", "木材", 5.0, 8.0).with_category("建材").with_unit_price(1200.0))?;

    // Capacities are volumes.
    d.add_warehouse(
        Warehouse::new("TW001", "码头仓库1", WarehouseKind::Terminal, Position::new(0, 0), 1000.0)
            .with_basis(CapacityBasis::Volume)
            .with_stock("P001", 100)
            .with_stock("P002", 80),
    )?;
    d.add_warehouse(
        Warehouse::new("PW001", "成品仓库1", WarehouseKind::FinishedGoods, Position::new(10, 10), 2000.0)
            .with_basis(CapacityBasis::Volume)
            .with_stock("P003", 50),
    )?;

    d.add_equipment(Equipment::new("C001", "吊机1", EquipmentKind::Crane, Position::new(0, 1)).with_home("TW001"))?;
    d.add_equipment(Equipment::new("C002", "吊机2", EquipmentKind::Crane, Position::new(10, 11)).with_home("PW001"))?;
    d.add_equipment(Equipment::new("T001", "框架车1", EquipmentKind::FrameTruck, Position::new(5, 5)))?;
    d.add_equipment(
        Equipment::new("F001", "框架1", EquipmentKind::Frame, Position::new(5, 6)).with_capacity(100.0),
    )?;
    d.attach_frame(&"T001".into(), &"F001".into())?;
    Ok(())
}

fn file_tasks(d: &Dispatcher) -> Result<()> {
    let ship = ShipOrder::new(ShipPlan::new("货轮001", "上海港"))
        .with_product("P003", 20)
        .with_priority(2)
        .with_deadline(d.deadline_in_hours(4));
    let ship = d.create_ship_transport(ship)?;
    let transfer = d.create_internal_transfer("TW001", "PW001", [(ProductId::new("P001"), 10)], 1)?;
    println!("Filed ship transport {ship} and internal transfer {transfer}");
    Ok(())
}

// ── Dispatch loop ─────────────────────────────────────────────────────────────

/// Schedule and execute until nothing is Pending or a round assigns nothing.
fn dispatch(d: &Dispatcher) -> Result<()> {
    for round in 1..=MAX_ROUNDS {
        let order = d.optimize_schedule()?;
        if order.is_empty() {
            break;
        }
        println!("Round {round}: {} task(s) assigned", order.len());
        for id in &order {
            let outcome = d.execute_detailed(id)?;
            let verdict = if outcome.success { "ok" } else { "FAILED" };
            println!(
                "  {:<8} {verdict:<6} ticks {:>3} -> {:>3}  {}",
                id.as_str(),
                outcome.started.0,
                outcome.finished.0,
                outcome.reason.unwrap_or_default()
            );
        }
        if d.tasks_with_status(TaskStatus::Pending).is_empty() {
            break;
        }
    }
    Ok(())
}

// ── Reports ───────────────────────────────────────────────────────────────────

fn print_reports(d: &Dispatcher) {
    let status = d.status();
    println!();
    println!("=== System status (tick {}) ===", status.tick.0);
    println!(
        "Products {}  |  Warehouses {}  |  Equipment {}  |  Active tasks {}  |  Pending {}",
        status.products, status.warehouses, status.equipment, status.active_tasks, status.pending_tasks
    );
    println!(
        "Equipment: idle {}, assigned {}, busy {}, out of service {}",
        status.by_status.idle, status.by_status.assigned, status.by_status.busy, status.by_status.out_of_service
    );
    println!("{:<8} {:<12} {:>9} {:>10}", "Warehouse", "Kind", "Used %", "Available");
    println!("{}", "-".repeat(42));
    for w in &status.utilization {
        println!("{:<8} {:<12} {:>9.1} {:>10.1}", w.id.as_str(), w.kind.as_str(), w.utilization_pct, w.available);
    }

    let report = d.performance_report();
    println!();
    println!("=== Performance ===");
    println!(
        "Tasks {}  |  completed {}  |  failed {}  |  cancelled {}",
        report.total, report.completed, report.failed, report.cancelled
    );
    match report.success_rate {
        Some(rate) => println!("Success rate: {:.1}%", rate * 100.0),
        None => println!("Success rate: n/a"),
    }
    if let Some(avg) = report.average_execution_ticks {
        println!("Average execution: {avg:.1} ticks");
    }
    for e in &report.equipment {
        let pct = e.utilization.map_or("n/a".to_string(), |u| format!("{:.1}%", u * 100.0));
        println!("  {:<6} {:<12} busy {:>4} ticks  {pct}", e.id.as_str(), e.kind.as_str(), e.busy_ticks);
    }

    println!();
    println!("=== Last {LOG_LINES} events ===");
    for event in report.recent_events.iter().take(LOG_LINES).rev() {
        let tick = event.tick().map_or("-".to_string(), |t| t.0.to_string());
        println!("[{tick:>4}] {}", event.describe());
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = load_config()?;
    let dispatcher = DispatcherBuilder::new(config).build()?;
    info!(width = dispatcher.config().grid_width, height = dispatcher.config().grid_height, "site demo");

    std::fs::create_dir_all(OUTPUT_DIR)?;
    let writer = CsvWriter::new(Path::new(OUTPUT_DIR))?;
    let mut recorder = EventRecorder::new(writer, dispatcher.subscribe(), dispatcher.config());

    populate(&dispatcher)?;
    file_tasks(&dispatcher)?;
    dispatch(&dispatcher)?;

    recorder.write_tasks(&dispatcher.tasks());
    recorder.finish();
    if let Some(e) = recorder.take_error() {
        eprintln!("output error: {e}");
    }

    print_reports(&dispatcher);
    println!();
    println!("{} events written to {OUTPUT_DIR}/events.csv", recorder.recorded());
    Ok(())
}
