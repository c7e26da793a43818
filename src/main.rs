use rdashscope::logger::{self, LoggerConfig};
use rdashscope::{BatchConfig, CancellationToken, DashScopeClient};
use std::env;
use std::io::Read;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();

    logger::init_with_config(LoggerConfig::from_env())?;

    if env_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let prompts_json = match env::args().nth(1) {
        Some(arg) if arg != "-" => arg,
        _ => {
            log::info!("📥 Reading prompts JSON from stdin...");
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let config = BatchConfig::from_env();
    logger::log_batch_config(&config);

    log::info!("🖼️  Known text-to-image models:");
    for model in rdashscope::supported_models() {
        log::info!("  {} - {} ({})", model.id, model.name, model.description);
    }

    let client = match DashScopeClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            log::warn!("💡 Set DASHSCOPE_API_KEY (and optionally DASHSCOPE_MODEL, DASHSCOPE_SIZE, ...)");
            return Err(e.into());
        }
    };

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("🛑 Ctrl-C received, canceling batch");
            on_ctrl_c.cancel();
        }
    });

    log::info!("🎨 Starting batch...");
    let output = match client.run_json(&prompts_json, &cancel).await {
        Ok(output) => output,
        Err(e) => {
            log::error!("❌ Batch failed: {}", e);
            return Err(e.into());
        }
    };

    let out_dir = PathBuf::from(env::var("DASHSCOPE_OUTPUT_DIR").unwrap_or_else(|_| ".".into()));
    std::fs::create_dir_all(&out_dir)?;
    let stamp = chrono::Utc::now().timestamp();
    for (index, image) in output.batch.images().iter().enumerate() {
        let path = out_dir.join(format!("dashscope_{}_{:02}.png", stamp, index));
        image.save(&path)?;
        log::info!("💾 Image saved to: {}", path.display());
    }

    log::info!("🎉 {} image(s) generated", output.image_count);
    println!("{}", output.urls_json);
    println!("{}", output.image_count);

    Ok(())
}
