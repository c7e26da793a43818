use rdashscope::{BatchConfig, CancellationToken, DashScopeClient};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match dotenv::dotenv() {
        Ok(_) => log::info!("✅ .env file loaded"),
        Err(_) => log::warn!("⚠️  No .env file found"),
    }
    rdashscope::logger::init()?;

    let api_key = env::var("DASHSCOPE_API_KEY")?;
    let config = BatchConfig::new()
        .with_api_key(api_key)
        .with_size("1024*1024")
        .with_n_per_prompt(2)
        .with_negative_prompt("low quality, text, watermark")
        .with_concurrency(2);

    let client = DashScopeClient::new(config)?;
    let prompts = vec![
        "A lighthouse on a cliff at dawn, oil painting".to_string(),
        "一只在雪地里的红狐狸，写实摄影".to_string(),
    ];

    let batch = client.run_batch(&prompts, &CancellationToken::new()).await?;
    for (image, url) in batch.images().iter().zip(batch.urls()) {
        println!("{}x{} <- {}", image.width(), image.height(), url);
    }

    let tensor = batch.to_nhwc_f32()?;
    println!("tensor shape: {:?}", tensor.shape);

    Ok(())
}
