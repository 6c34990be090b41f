// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::time::Instant;

use anyhow::Context;
use flowgraph::components::{Doubler, Echo};
use flowgraph::config::load_options;
use flowgraph::{run_with, Graph, NetworkOptions, Transport};
use tracing_subscriber::EnvFilter;

const DOUBLERS: [&str; 3] = ["d1", "d2", "d3"];

/// Builds `e1 -> d1, d2, d3 -> e2` with `In` and `Out` exported.
fn fan_out_fan_in() -> anyhow::Result<Graph> {
    let mut graph = Graph::new();
    graph.add("e1", Echo::<i32>::new())?;
    graph.add("e2", Echo::<i32>::new())?;
    for doubler in DOUBLERS {
        graph.add(doubler, Doubler::new())?;
        graph.connect("e1", "Out", doubler, "In")?;
        graph.connect(doubler, "Out", "e2", "In")?;
    }
    graph.map_in_port("In", "e1", "In")?;
    graph.map_out_port("Out", "e2", "Out")?;
    Ok(graph)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [options.yaml]", args[0]);
        std::process::exit(1);
    }

    let options = match args.get(1) {
        Some(path) => load_options(path).with_context(|| format!("loading {}", path))?,
        None => NetworkOptions::default(),
    };

    println!("🚀 flowgraph fan-out / fan-in demo");
    println!("═══════════════════════════════════");
    println!("Topology: e1 -> {} -> e2", DOUBLERS.join(", "));
    println!("Options:  {:?}", options);
    println!();

    let mut graph = fan_out_fan_in()?;
    let input = Transport::<i32>::new();
    let output = Transport::<i32>::new();
    graph.set_in_port("In", &input)?;
    graph.set_out_port("Out", &output)?;

    let start_time = Instant::now();
    let completion = run_with(graph, &options)?;

    let feeder = input.clone();
    tokio::spawn(async move {
        for value in 1..=8 {
            if feeder.send(value).await.is_err() {
                break;
            }
        }
        feeder.close();
    });

    let mut results = Vec::new();
    while let Some(value) = output.recv().await {
        println!("  received {}", value);
        results.push(value);
    }

    let summary = completion.await;
    results.sort_unstable();

    println!();
    println!("Results (sorted): {:?}", results);
    println!(
        "Processes: {}  Transports: {}  Panicked: {}  Failed: {}  Elapsed: {:?}",
        summary.processes,
        summary.transports,
        summary.panicked.len(),
        summary.failed.len(),
        start_time.elapsed()
    );
    Ok(())
}
