//! statusboard demo binary.
//!
//! Builds a board (from a topology file when one is given), drives a few
//! records through status changes while a ticker releases coalesced
//! notifications, and logs every notification.
//!
//! # Environment Variables
//!
//! - `RUST_LOG` — Tracing filter (default: "info,statusboard=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin board-demo
//! cargo run --bin board-demo -- board.yaml
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use serde_json::json;

use statusboard::elements::STATUS_VIEW_TYPE;
use statusboard::events::BoardChanged;
use statusboard::groups::{Boundary, ContainsFn};
use statusboard::{spawn_ticker, Asset, Board, BoardConfig, ElementFactory, Group, Position};

/// Ray-casting point-in-polygon on (lon, lat).
fn point_in_polygon() -> ContainsFn {
    Arc::new(|boundary: &Boundary, p: &Position| {
        let v = &boundary.vertices;
        let mut inside = false;
        let mut j = v.len().wrapping_sub(1);
        for i in 0..v.len() {
            let (a, b) = (&v[i], &v[j]);
            if (a.lat > p.lat) != (b.lat > p.lat)
                && p.lon < (b.lon - a.lon) * (p.lat - a.lat) / (b.lat - a.lat) + a.lon
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    })
}

fn default_board() -> anyhow::Result<Board> {
    let mut factory = ElementFactory::default();
    factory.bind_kind(
        "pump",
        STATUS_VIEW_TYPE,
        json!({"attribute": "load", "warning": 70, "critical": 90}),
    )?;
    let board = Board::new("demo", Duration::from_millis(200))
        .with_factory(factory)
        .with_group(Group::new("pumps"));
    Ok(board)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,statusboard=debug".into()),
        )
        .init();

    let mut board = match std::env::args().nth(1) {
        Some(path) => {
            let config = BoardConfig::from_path(&path)
                .with_context(|| format!("loading board config from {path}"))?;
            Board::from_config(&config, ElementFactory::default(), Some(point_in_polygon()))?
        }
        None => default_board()?,
    };
    tracing::info!(
        "board '{}' ready with {} segment(s)",
        board.name(),
        board.groups().len()
    );

    board
        .events_mut()
        .on("changed", "demo-log", |n: &BoardChanged| {
            tracing::info!(
                sequence = n.sequence,
                changes = n.changes.len(),
                checksums = ?n.group_checksums,
                "board changed"
            );
            for change in &n.changes {
                tracing::debug!(
                    "  segment {} slot {}: {}",
                    change.group_index,
                    change.change.index,
                    change.change.summary
                );
            }
        });

    let board = Arc::new(Mutex::new(board));
    let ticker = spawn_ticker(board.clone(), Duration::from_millis(50));

    for i in 0..3 {
        let pump = Asset::new(format!("pump-{i}"), "pump", [("load", json!(10 * i))])?;
        board.lock().add_record(Box::new(pump))?;
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    for load in [45, 75, 95, 60] {
        board
            .lock()
            .set_attribute("pump-1", "load", json!(load), None)?;
        tokio::time::sleep(Duration::from_millis(80)).await;
    }

    board.lock().remove_record("pump-0")?;
    tokio::time::sleep(Duration::from_millis(300)).await;

    ticker.abort();
    if let Some(last) = board.lock().flush() {
        tracing::info!("flushed {} trailing change(s)", last.changes.len());
    }
    tracing::info!("final checksums: {:?}", board.lock().checksums());
    Ok(())
}
