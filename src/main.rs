use anyhow::Result;
use chapter_publish::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::load()?;

    // 初始化并运行应用
    let _state = App::initialize(config).await?.run().await?;

    Ok(())
}
