use anyhow::Result;
use surge_watch_core::MonitorConfig;

/// Prints one line per profile.
pub fn run() -> Result<()> {
    println!(
        "{:<10} {:>6} {:>12} {:>9} {:>10} {:>10}",
        "MODE", "TICK", "CONCURRENCY", "COOLDOWN", "VOL_RATIO", "MOVE_PCT"
    );
    for name in MonitorConfig::MODES {
        let cfg = MonitorConfig::profile(name)?;
        println!("{}", describe(&cfg));
    }
    Ok(())
}

fn describe(cfg: &MonitorConfig) -> String {
    let ve = &cfg.detectors.volume_explosion;
    format!(
        "{:<10} {:>5}s {:>12} {:>8}s {:>9.1}x {:>9.1}%",
        cfg.mode,
        cfg.tick_interval_secs,
        cfg.max_concurrency,
        cfg.cooldown_secs,
        ve.ratio_threshold,
        ve.move_threshold_pct
    )
}
