use clap::Parser;
use time_entry_manager::config::settings::LocalSettings;
use time_entry_manager::utils::{logger, validation::Validate};
use time_entry_manager::{
    CliConfig, DataverseConnector, FunctionResponse, InMemoryStore, TimeEntryFunction,
};

fn exit_code(response: &FunctionResponse) -> i32 {
    match response.status {
        200..=299 => 0,
        400..=499 => 2, // payload 錯誤
        503 => 3,       // store 無法使用，可重試
        _ => 1,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();
    let resolver = config.resolver();
    let (settings, load_error) = match resolver.try_load_settings() {
        Ok(settings) => (settings.unwrap_or_default(), None),
        Err(e) => (LocalSettings::default(), Some(e)),
    };

    // 初始化日誌
    logger::init_cli_logger(config.verbose, settings.log_level());
    if let Some(e) = load_error {
        tracing::warn!("⚠️ {}", e);
    }

    tracing::info!("Starting time-entry-manager CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證設定
    if let Err(e) = settings.validate() {
        tracing::error!("❌ Settings validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }
    let schema = settings.table_schema();

    let body = config.read_payload()?;

    let response = if config.in_memory {
        tracing::info!("🧪 Using an empty in-memory store");
        TimeEntryFunction::new(InMemoryStore::new(), schema)
            .run(&body)
            .await
    } else {
        let resolved = resolver.resolve();
        tracing::info!("🔗 Connection resolved from {:?}", resolved.source);

        let connector = match DataverseConnector::from_connection_str(&resolved.value) {
            Ok(connector) => connector,
            Err(e) => {
                tracing::error!("❌ Invalid connection string: {}", e);
                tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
                eprintln!("❌ {}", e.user_friendly_message());
                std::process::exit(1);
            }
        };
        TimeEntryFunction::new(connector, schema).run(&body).await
    };

    if response.is_success() {
        println!("✅ {} {}", response.status, response.body);
    } else {
        eprintln!("❌ {} {}", response.status, response.body);
    }

    let code = exit_code(&response);
    if code > 0 {
        std::process::exit(code);
    }
    Ok(())
}
