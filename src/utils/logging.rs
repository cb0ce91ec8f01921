/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::PoolConfig;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 测试或嵌入场景下可能已经初始化过
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(pool: &PoolConfig) {
    info!("{}", "=".repeat(60));
    info!("🚀 JSP 并行预编译启动");
    info!(
        "📊 线程数: {} | 超时: {} 分钟",
        pool.thread_count(),
        pool.timeout().as_secs() / 60
    );
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `jobs`: 提交的任务数
/// - `failed`: 失败数量
/// - `elapsed`: 总耗时
pub fn print_final_stats(jobs: usize, failed: usize, elapsed: Duration) {
    info!("{}", "=".repeat(60));
    info!("📊 编译完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", jobs.saturating_sub(failed), jobs);
    info!("❌ 失败: {}", failed);
    info!("⏱️ 耗时: {:.2}s", elapsed.as_secs_f64());
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_by_chars() {
        assert_eq!(truncate_text("语法错误在第三行", 4), "语法错误...");
        assert_eq!(truncate_text("short", 10), "short");
    }
}
