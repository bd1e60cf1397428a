use thiserror::Error;

/// 寻源流程错误
///
/// 只有 `FatalParse`、`SearchStage` 和 `Configuration` 会终止一次运行，
/// 其余错误在各阶段内被吸收并记录到执行轨迹中。
#[derive(Debug, Error)]
pub enum SourcingError {
    /// 需求解析失败（输入为空、模型输出无法解析或缺少关键字段）
    #[error("需求解析失败: {0}")]
    FatalParse(String),

    /// 单个搜索查询失败
    #[error("搜索查询失败 ({query}): {reason}")]
    SearchQuery { query: String, reason: String },

    /// 所有搜索查询均失败
    #[error("供应商搜索阶段失败: {0} 个查询全部失败")]
    SearchStage(usize),

    /// 单个企业的工商校验失败
    #[error("企业校验失败 ({company}): {reason}")]
    ValidationLookup { company: String, reason: String },

    /// 工作单元超时
    #[error("任务超时 ({0}秒)")]
    Timeout(u64),

    /// 配置错误（运行前校验）
    #[error("配置错误: {0}")]
    Configuration(String),
}

impl SourcingError {
    /// 进程退出码
    pub fn exit_code(&self) -> u8 {
        match self {
            SourcingError::Configuration(_) => 2,
            SourcingError::FatalParse(_) => 3,
            SourcingError::SearchStage(_) => 4,
            _ => 1,
        }
    }

    /// 是否会终止整个运行
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SourcingError::FatalParse(_)
                | SourcingError::SearchStage(_)
                | SourcingError::Configuration(_)
        )
    }
}

/// 错误链中是否包含调用超时
pub fn is_timeout(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<SourcingError>(),
            Some(SourcingError::Timeout(_))
        )
    })
}

pub type SourcingResult<T> = Result<T, SourcingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(SourcingError::Configuration("x".into()).exit_code(), 2);
        assert_eq!(SourcingError::FatalParse("x".into()).exit_code(), 3);
        assert_eq!(SourcingError::SearchStage(8).exit_code(), 4);
        assert_eq!(SourcingError::Timeout(30).exit_code(), 1);
    }

    #[test]
    fn test_timeout_detected_through_context() {
        use anyhow::Context;

        let err = Err::<(), _>(SourcingError::Timeout(30))
            .context("工商查询 \"武汉甲公司\"")
            .unwrap_err();
        assert!(is_timeout(&err));
        assert!(!is_timeout(&anyhow::anyhow!("operation timed out")));
    }

    #[test]
    fn test_only_run_level_errors_are_fatal() {
        assert!(SourcingError::FatalParse("empty".into()).is_fatal());
        assert!(SourcingError::SearchStage(5).is_fatal());
        assert!(!SourcingError::Timeout(30).is_fatal());
        assert!(
            !SourcingError::ValidationLookup {
                company: "A".into(),
                reason: "not found".into()
            }
            .is_fatal()
        );
        assert!(
            !SourcingError::SearchQuery {
                query: "q".into(),
                reason: "503".into()
            }
            .is_fatal()
        );
    }
}
