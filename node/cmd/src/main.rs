//! Mesh node binary.
//!
//! Runs a small in-process mesh of three kernels joined by the loopback
//! transport: a chain A - B - C. The script exercises the whole core
//! (scan/advertise modes, connection setup, discovery, route updates, and a
//! multi-hop ping relayed through the middle node) and prints each node's
//! routing table at the end.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use picomesh_kernel::MeshKernel;
use picomesh_wire::DevAddr;

mod config;
mod sim;

use config::{parse_addr, NodeConfig};
use sim::{SimEvent, SimHub, SimTransport};

/// Mesh node with an in-process loopback radio
#[derive(Parser, Debug)]
#[command(name = "picomesh", version, about = "BLE-style mesh node core demo")]
struct Args {
    /// Path to a YAML node configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Scan duration used in the demo script, e.g. 5s
    #[arg(long, default_value = "5s")]
    scan_timeout: humantime::Duration,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone())),
        )
        .init();

    let config = match &args.config {
        Some(path) => NodeConfig::load_from_file(path)?,
        None => {
            let mut config = NodeConfig::default();
            config.apply_environment_overrides();
            config
        }
    };

    let addr_a = config.parsed_own_addr()?;
    let addr_b = parse_addr("0b:00:00:00:00:02")?;
    let addr_c = parse_addr("0c:00:00:00:00:03")?;

    let hub = SimHub::new();
    let mut nodes = vec![
        MeshKernel::with_config(
            SimTransport::new(addr_a, Rc::clone(&hub)),
            config.kernel_config(),
        ),
        MeshKernel::with_config(
            SimTransport::new(addr_b, Rc::clone(&hub)),
            config.kernel_config(),
        ),
        MeshKernel::with_config(
            SimTransport::new(addr_c, Rc::clone(&hub)),
            config.kernel_config(),
        ),
    ];

    // B and C advertise; A scans, then the scan timeout fires.
    kernel_for(&mut nodes, addr_b)?.start_advertising()?;
    kernel_for(&mut nodes, addr_c)?.start_advertising()?;
    let scanner = kernel_for(&mut nodes, addr_a)?;
    scanner.scan_environment(*args.scan_timeout)?;
    scanner.on_scan_complete();

    // Build the chain A - B - C.
    kernel_for(&mut nodes, addr_a)?.connect_to(addr_b)?;
    pump(&hub, &mut nodes)?;
    kernel_for(&mut nodes, addr_b)?.connect_to(addr_c)?;
    pump(&hub, &mut nodes)?;

    // A asks its neighborhood for routes, then B pushes its table around.
    kernel_for(&mut nodes, addr_a)?.broadcast_discovery()?;
    pump(&hub, &mut nodes)?;
    kernel_for(&mut nodes, addr_b)?.broadcast_update()?;
    pump(&hub, &mut nodes)?;

    // A can now reach C through B: ping across two hops.
    kernel_for(&mut nodes, addr_a)?.ping(addr_c)?;
    pump(&hub, &mut nodes)?;

    for node in &nodes {
        info!(
            "node {}: {} outgoing, {} incoming, {} routes",
            node.own_addr(),
            node.outgoing_count(),
            node.incoming_count(),
            node.routes().len()
        );
        for entry in node.routes().export() {
            info!("  {}", entry);
        }
    }

    Ok(())
}

/// Drain the hub, feeding each owed callback into the kernel it belongs to
fn pump(hub: &Rc<RefCell<SimHub>>, nodes: &mut [MeshKernel<SimTransport>]) -> Result<()> {
    while let Some(event) = SimHub::pop_event(hub) {
        match event {
            SimEvent::Inbound { node, peer, conn_id } => {
                kernel_for(nodes, node)?.on_inbound_connection(peer, conn_id)?;
            }
            SimEvent::Data { node, conn_id, bytes } => {
                kernel_for(nodes, node)?.on_data(conn_id, &bytes)?;
            }
        }
    }
    Ok(())
}

fn kernel_for(
    nodes: &mut [MeshKernel<SimTransport>],
    addr: DevAddr,
) -> Result<&mut MeshKernel<SimTransport>> {
    nodes
        .iter_mut()
        .find(|node| node.own_addr() == addr)
        .ok_or_else(|| anyhow!("no simulated node with address {}", addr))
}
