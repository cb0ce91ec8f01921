//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责并发调度和整体流程，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `build` - 构建编排器
//! - 确定根目录、收集页面（委托 `PageResolver`）
//! - 驱动线程池并等待（可被外部中断）
//! - 汇总失败，全部成功时写出描述文件
//! - 每次运行结束释放编译器资源
//!
//! ### `worker_pool` - 编译线程池
//! - 固定数量的工作者消费同一个任务队列
//! - 单个任务失败只记入 `FailureSet`
//! - 有超时的尽力等待
//!
//! ## 层次关系
//!
//! ```text
//! build::Orchestrator (处理整个 Web 应用)
//!     ↓
//! worker_pool::CompileWorkerPool (处理 Vec<CompilationJob>)
//!     ↓
//! workflow::PageCompiler (处理单个 JSP)
//!     ↓
//! infrastructure (基础设施：CommandRunner)
//! ```

pub mod build;
pub mod worker_pool;

// 重新导出主要类型
pub use build::{BuildState, BuildSummary, Orchestrator};
pub use worker_pool::{CompileWorkerPool, PoolOutcome};
