//! Demo client: walks the Phoenix backyard-pool scenario against a running
//! gateway, then fires a burst of concurrent safety checks.
//! Run with the gateway up: cargo run --bin demo

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::RwLock;

const DEFAULT_URL: &str = "http://127.0.0.1:5000";
const BURST_WORKERS: usize = 8;
const CHECKS_PER_WORKER: usize = 5;

type DemoResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

async fn post(client: &Client, base: &str, path: &str, body: Value) -> DemoResult<Value> {
    let res = client.post(format!("{base}{path}")).json(&body).send().await?;
    let status = res.status();
    let value: Value = res.json().await?;
    if !status.is_success() {
        return Err(format!("{path} -> {status}: {value}").into());
    }
    Ok(value)
}

async fn get(client: &Client, base: &str, path: &str) -> DemoResult<Value> {
    Ok(client.get(format!("{base}{path}")).send().await?.json().await?)
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let base = std::env::var("ZER01NE_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    println!("[DEMO] Target: {base} (ensure gateway is running)");

    if let Err(e) = run(&base).await {
        eprintln!("[DEMO] Failed: {e}");
        std::process::exit(1);
    }
}

async fn run(base: &str) -> DemoResult<()> {
    let client = Client::new();

    let banner = get(&client, base, "/").await?;
    println!("[DEMO] {} v{} | {}", banner["system"], banner["version"], banner["equation"]);

    let registered = post(
        &client,
        base,
        "/pool/register",
        json!({
            "owner_id": "MOM_AZ_001",
            "lat": 33.4484,
            "lon": -112.074,
            "depth_m": 1.2,
            "name": "Backyard Pool"
        }),
    )
    .await?;
    let session_id = registered["session_id"].as_str().unwrap_or_default().to_string();
    println!(
        "[DEMO] Pool registered: session={} collapse={} passed={}",
        session_id,
        registered["earth_validation"]["collapse_state"],
        registered["earth_validation"]["points_passed"]
    );

    let family = post(
        &client,
        base,
        "/family/register",
        json!({ "session_id": session_id, "mother_id": "MOM_AZ_001", "child_id": "CHILD_AZ_001" }),
    )
    .await?;
    let bond_id = family["bond_id"].as_str().unwrap_or_default().to_string();
    println!("[DEMO] Family bond: {bond_id}");

    let report = post(
        &client,
        base,
        "/safety/check",
        json!({
            "bond_id": bond_id,
            "child": {
                "child_id": "CHILD_AZ_001",
                "lat": 33.4484,
                "lon": -112.074,
                "distance": 2.5,
                "moving_toward": true,
                "heart_rate": 95
            }
        }),
    )
    .await?;
    println!(
        "[DEMO] Safety check: danger={} alert={} phase={} handshakes={}",
        report["danger_probability"], report["alert"], report["phase"], report["total_handshakes"]
    );

    burst(&client, base, &bond_id).await;

    let alerts = get(&client, base, "/alerts").await?;
    println!("[DEMO] Alerts on record: {}", alerts["count"]);

    let stats = get(&client, base, "/stats").await?;
    println!(
        "[DEMO] Stats: sessions={} bonds={} alerts={} earth_handshakes={} phase={}",
        stats["sessions"], stats["bonds"], stats["alerts"], stats["earth_handshakes"], stats["phase"]
    );
    Ok(())
}

/// Concurrent safety checks against one bond; half of them in the danger zone.
async fn burst(client: &Client, base: &str, bond_id: &str) {
    println!(
        "[DEMO] Burst: {} workers x {} checks = {} total",
        BURST_WORKERS,
        CHECKS_PER_WORKER,
        BURST_WORKERS * CHECKS_PER_WORKER
    );
    let success = Arc::new(AtomicU32::new(0));
    let failure = Arc::new(AtomicU32::new(0));
    let latencies: Arc<RwLock<Vec<u64>>> = Arc::new(RwLock::new(Vec::new()));
    let started = Instant::now();

    let handles = (0..BURST_WORKERS).map(|worker| {
        let client = client.clone();
        let base = base.to_string();
        let bond_id = bond_id.to_string();
        let success = Arc::clone(&success);
        let failure = Arc::clone(&failure);
        let latencies = Arc::clone(&latencies);
        tokio::spawn(async move {
            for n in 0..CHECKS_PER_WORKER {
                let close = (worker + n) % 2 == 0;
                let body = json!({
                    "bond_id": bond_id,
                    "child": {
                        "child_id": "CHILD_AZ_001",
                        "distance": if close { 0.5 } else { 8.0 },
                        "moving_toward": close,
                        "heart_rate": if close { 150 } else { 70 }
                    }
                });
                let sent = Instant::now();
                match post(&client, &base, "/safety/check", body).await {
                    Ok(_) => {
                        success.fetch_add(1, Ordering::Relaxed);
                        latencies.write().await.push(sent.elapsed().as_millis() as u64);
                    }
                    Err(e) => {
                        eprintln!("[DEMO] worker {worker}: {e}");
                        failure.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        })
    });
    join_all(handles).await;

    let ok = success.load(Ordering::Relaxed);
    let failed = failure.load(Ordering::Relaxed);
    let lat = latencies.read().await;
    let avg_ms = if lat.is_empty() {
        0
    } else {
        lat.iter().sum::<u64>() / lat.len() as u64
    };
    let rate = f64::from(ok) / f64::from((ok + failed).max(1)) * 100.0;
    println!(
        "[DEMO] Burst done in {} ms: ok={} failed={} success={:.1}% avg_latency={} ms",
        started.elapsed().as_millis(),
        ok,
        failed,
        rate,
        avg_ms
    );
}
