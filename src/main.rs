// CertWire - Real-time Certificate Transparency log aggregator
// Copyright (C) 2025 CertWire Team
// Licensed under GPL-3.0
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.

use anyhow::Result;
use certwire::api::{ApiServer, AppState, ConfigSnapshot};
use certwire::ct::{PollScheduler, PollerConfig};
use certwire::stream::{CertBuffer, FanOutBroker};
use certwire::Args;
use clap::Parser;
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging - respect RUST_LOG environment variable
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let args = Args::parse();
    display_banner(&args);

    // Core pipeline: buffer <- broker <- pollers
    let buffer = Arc::new(CertBuffer::new(args.buffer_size));
    let broker = Arc::new(FanOutBroker::new(
        Arc::clone(&buffer),
        args.max_clients,
        args.queue_size,
    ));

    let mut scheduler = PollScheduler::new(
        &args.log_list_url,
        args.max_workers,
        PollerConfig {
            poll_interval: args.poll_interval(),
            batch_size: args.batch_size,
        },
    );

    // An empty log list leaves the HTTP surface up with an empty buffer
    scheduler.start(Arc::clone(&broker)).await;

    tokio::spawn(stats_reporter(
        Arc::clone(&buffer),
        Arc::clone(&broker),
        scheduler.shutdown_flag(),
    ));

    let state = Arc::new(AppState::new(
        Arc::clone(&buffer),
        Arc::clone(&broker),
        ConfigSnapshot {
            poll_interval: args.poll_interval,
            batch_size: args.batch_size,
            buffer_size: args.buffer_size,
            client_ping_timeout: args.ping_timeout,
        },
    ));
    let server = ApiServer::new(state, &args.host, args.port, args.ping_timeout());

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("API server failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    scheduler.stop().await;
    info!("CertWire stopped");
    Ok(())
}

/// Log pipeline throughput once a minute
async fn stats_reporter(
    buffer: Arc<CertBuffer>,
    broker: Arc<FanOutBroker>,
    shutdown: Arc<AtomicBool>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    interval.tick().await;

    while !shutdown.load(Ordering::Relaxed) {
        interval.tick().await;

        let stats = buffer.stats();
        let clients = broker.client_counts();
        info!(
            "Processed {} certificates ({:.2}/s), buffer {}/{}, {} subscribers, {} messages dropped",
            stats.total_processed,
            stats.rate_per_s,
            stats.buffer_size,
            stats.buffer_capacity,
            clients.total,
            broker.dropped_total()
        );
    }
}

fn display_banner(args: &Args) {
    if args.quiet {
        return;
    }

    println!(
        r#"
    ╔═══════════════════════════════════════════════════════════╗
    ║                     CertWire v{}                       ║
    ║     Real-time Certificate Transparency Stream Server      ║
    ╚═══════════════════════════════════════════════════════════╝
    "#,
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "    API on port {}, streams on {}-{}\n",
        args.port.to_string().cyan(),
        (args.port + 1).to_string().cyan(),
        (args.port + 3).to_string().cyan()
    );
}
