//! 外部命令执行器 - 基础设施层
//!
//! 持有外部单文件编译器的命令模板，只暴露"执行一次命令"的能力

use std::io;
use std::process::{Command, Output};

use tracing::debug;

use crate::error::ConfigurationError;

/// 外部命令执行器
///
/// 职责：
/// - 持有命令模板（程序 + 参数）
/// - 替换 `{name}` 占位符后执行
/// - 不认识 JSP / web.xml
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
}

impl CommandRunner {
    /// 从命令模板创建执行器，第一个元素为程序
    pub fn new(command: &[String]) -> Result<Self, ConfigurationError> {
        let (program, args) = command
            .split_first()
            .ok_or(ConfigurationError::MissingCompilerCommand)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// 执行命令并等待结束（阻塞）
    ///
    /// # 参数
    /// - `vars`: 占位符名称与取值，例如 `("page", "/app/index.jsp")`
    pub fn run(&self, vars: &[(&str, &str)]) -> io::Result<Output> {
        let args: Vec<String> = self.args.iter().map(|arg| substitute(arg, vars)).collect();
        debug!("执行命令: {} {}", self.program, args.join(" "));
        Command::new(&self.program).args(&args).output()
    }
}

fn substitute(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}
