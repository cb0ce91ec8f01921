use std::sync::Arc;

use anyhow::{Context, Result};
use parallel_jspc::utils::logging;
use parallel_jspc::{CommandCompiler, Config, Orchestrator, WebXmlFragment};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(&config.pool_config()?);

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("无法创建输出目录: {}", config.output_dir.display()))?;

    let fragment = Arc::new(WebXmlFragment::new(
        config.web_xml_fragment.clone(),
        config.web_xml.clone(),
    ));
    let compiler = Arc::new(CommandCompiler::from_config(&config, Arc::clone(&fragment))?);

    let orchestrator = Orchestrator::new(config, compiler, fragment);
    orchestrator
        .run_until(async {
            // 无法监听信号时就永不中断
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
