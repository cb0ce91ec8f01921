//! # Parallel JSPC
//!
//! 多线程 JSP 预编译：把一个 Web 应用下的 JSP 分发给固定大小的线程池，
//! 逐个调用外部单文件编译器，汇总失败，全部成功后写出 web.xml 片段。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部编译器命令，只暴露"执行一次"的能力
//!
//! ### ② 业务能力层（Services）
//! - `PageResolver` - 确定根目录、扫描 / 规范化 JSP 路径
//! - `WebXmlFragment` - 收集 Servlet 映射、写出片段、合并 web.xml
//!
//! ### ③ 流程层（Workflow）
//! - `PageCompiler` - "编译一个 JSP"的能力（可注入）
//! - `CommandCompiler` - 基于外部命令的实现
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/worker_pool` - 固定并发的编译线程池
//! - `orchestrator/build` - 整体流程与失败汇总
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, PoolConfig};
pub use error::{BuildError, BuildResult, CompileError, ConfigurationError, FinalizeError};
pub use models::{CompilationJob, FailureSet, JobFailure};
pub use orchestrator::{BuildState, BuildSummary, CompileWorkerPool, Orchestrator, PoolOutcome};
pub use services::{PageResolver, WebDescriptor, WebXmlFragment};
pub use workflow::{CommandCompiler, PageCompiler};
