//! SkyScript console renderer.
//! Reads `YYYY-MM-DD sign` lines from stdin, feeds them to the dashboard
//! pipeline and prints every state transition.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use skyscript::{Dashboard, DashboardConfig, PipelineState, Selection};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; SKYSCRIPT_LOG_JSON=1 switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("skyscript=info,warn"));

    let json = std::env::var("SKYSCRIPT_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn parse_line(line: &str, fallback_date: NaiveDate, today: NaiveDate) -> Result<Selection> {
    let mut parts = line.split_whitespace();
    let first = parts.next().context("empty line")?;
    match parts.next() {
        Some(sign) => {
            let date = NaiveDate::parse_from_str(first, "%Y-%m-%d")
                .with_context(|| format!("bad date `{first}`, expected YYYY-MM-DD"))?;
            let sel = Selection::new(date, sign);
            sel.ensure_not_future(today)?;
            Ok(sel)
        }
        // A lone token only changes the sign.
        None => Ok(Selection::new(fallback_date, first)),
    }
}

fn render(state: &PipelineState) {
    if state.is_loading {
        println!("… loading");
    }
    if let Some(err) = &state.last_error {
        println!("! {err}");
    }
    if !state.is_loading {
        if let Some(rec) = &state.current {
            println!("★ {}\n  {}\n  {}", rec.image_title, rec.image_url, rec.horoscope_text);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = DashboardConfig::load_default().context("loading dashboard config")?;
    let dashboard = Dashboard::from_config(&cfg)?;

    let mut updates = dashboard.subscribe();
    let renderer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            render(&snapshot);
        }
    });

    let mut current = Selection::for_sign(Local::now().date_naive(), cfg.default_sign);
    dashboard.submit(current.clone())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line, current.date, Local::now().date_naive()) {
            Ok(sel) => {
                current = sel.clone();
                dashboard.submit(sel)?;
            }
            Err(e) => eprintln!("{e:#}"),
        }
    }

    // Stdin closed: let the last selection settle and finish before tearing down.
    tokio::time::sleep(cfg.quiet_period() + std::time::Duration::from_millis(50)).await;
    let mut idle = dashboard.subscribe();
    let _ = idle.wait_for(|s| !s.is_loading).await;

    dashboard.shutdown().await;
    let _ = renderer.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_date_and_sign_or_sign_only() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let s = parse_line("2024-01-01 aries", today, today).unwrap();
        assert_eq!(s, Selection::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), "aries"));
        let s = parse_line("leo", today, today).unwrap();
        assert_eq!(s, Selection::new(today, "leo"));
        assert!(parse_line("01/01/2024 aries", today, today).is_err());
    }

    #[test]
    fn future_dates_are_refused() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(parse_line("2024-03-01 leo", today, today).is_ok());
        let err = parse_line("2024-03-02 leo", today, today).unwrap_err();
        assert!(err.to_string().contains("in the future"), "{err:#}");
    }
}
