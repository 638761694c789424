use ad_cacher::adapters::listener::LoggingListener;
use ad_cacher::adapters::simulated::SimulatedProvider;
use ad_cacher::utils::error::{CacherError, ErrorSeverity};
use ad_cacher::utils::logger::{self, LogFormat};
use ad_cacher::utils::validation::Validate;
use ad_cacher::{AdCacher, CacherFileConfig, CliConfig};
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    // 載入 TOML 配置
    let config = match CacherFileConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            logger::init_logger(LogFormat::Compact, args.verbose);
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_logger(
        LogFormat::from_flags(args.json_logs, config.json_logs()),
        args.verbose,
    );

    tracing::info!("🚀 Starting ad-cacher");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    // 驗證配置
    if let Err(e) = args.validate().and_then(|_| config.validate()) {
        exit_with(e);
    }

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - configuration is valid, nothing was loaded");
        return Ok(());
    }

    // 建立模擬廣告網路與快取器
    let provider =
        SimulatedProvider::new(config.load_latency()).with_fail_every(config.fail_every());
    let cacher = AdCacher::new(provider, Arc::new(LoggingListener));

    if let Err(e) = cacher.configure(config.placement_configs(), config.refresh_interval()) {
        exit_with(e);
    }

    let deadline = tokio::time::sleep(args.run_duration());
    tokio::pin!(deadline);

    let mut display_tick = tokio::time::interval(args.display_interval());
    display_tick.tick().await;
    let mut rotation = args.display.iter().cycle();

    loop {
        tokio::select! {
            _ = &mut deadline => {
                tracing::info!("⏱️ Run time elapsed");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("🛑 Interrupted");
                break;
            }
            _ = display_tick.tick(), if !args.display.is_empty() => {
                if let Some(placement_id) = rotation.next() {
                    match cacher.request_display(placement_id) {
                        Some(outcome) if outcome.is_presented() => tracing::info!(
                            "📺 Displayed {} ad #{} from {}",
                            outcome.cached.format(),
                            outcome.cached.ad().handle().serial,
                            placement_id
                        ),
                        Some(outcome) => tracing::info!(
                            "🗑️ Dropped {} ad #{} from {} without showing it",
                            outcome.cached.format(),
                            outcome.cached.ad().handle().serial,
                            placement_id
                        ),
                        None => tracing::info!("🕳️ No cached ad for {}", placement_id),
                    }
                }
            }
        }
    }

    // 停止並輸出最終庫存
    cacher.stop();
    let snapshot = cacher.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    cacher.dispose();

    Ok(())
}

fn display_config_summary(config: &CacherFileConfig, args: &CliConfig) {
    tracing::info!("📋 Configuration Summary:");
    tracing::info!(
        "   Refresh interval: {}s",
        config.refresh_interval_seconds()
    );
    for placement in &config.placements {
        tracing::info!(
            "   📦 {} ({}) target {}",
            placement.placement_id,
            placement.format,
            placement.target_count
        );
    }
    tracing::info!(
        "   Simulated latency: {:?}, fail every: {}",
        config.load_latency(),
        config.fail_every()
    );
    if !args.display.is_empty() {
        tracing::info!(
            "   Displaying from {} every {}s",
            args.display.join(", "),
            args.display_every_seconds
        );
    }
}

fn exit_with(e: CacherError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
