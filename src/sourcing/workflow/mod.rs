use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::SourcingError;
use crate::outlet;
use crate::sourcing::context::SourcingContext;
use crate::sourcing::trace::{ExecutionTrace, TimingKeys, TimingScope};
use crate::sourcing::{parser, search, synthesizer, validator};
use crate::types::report::Report;

/// 四个阶段的顺序编排
///
/// 每个阶段拿到上一阶段的完整输出；只有需求解析失败和搜索全部失败会终止运行。
pub struct SourcingWorkflow {
    context: SourcingContext,
}

impl SourcingWorkflow {
    pub fn new(context: SourcingContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &SourcingContext {
        &self.context
    }

    /// 对一段采购需求执行完整流程
    pub async fn run(&self, requirement_text: &str) -> Result<Report, SourcingError> {
        let context = &self.context;
        let mut timing = TimingScope::new();
        let mut trace = ExecutionTrace::new(
            context.search.api_name(),
            context.registry.api_name(),
        );
        info!("🚀 开始供应商寻源，运行编号 {}", trace.run_id);

        timing.start_phase(TimingKeys::PARSE);
        let requirement = parser::parse_requirement(context.llm.as_ref(), requirement_text).await?;
        timing.end_phase(TimingKeys::PARSE);

        timing.start_phase(TimingKeys::SEARCH);
        let candidates = search::execute(context, &requirement, &mut trace).await?;
        timing.end_phase(TimingKeys::SEARCH);

        timing.start_phase(TimingKeys::VALIDATE);
        let records = validator::execute(context, &candidates, &mut trace).await;
        timing.end_phase(TimingKeys::VALIDATE);

        timing.start_phase(TimingKeys::SYNTHESIZE);
        let (rows, advice) = synthesizer::execute(
            context.llm.as_ref(),
            &requirement,
            &candidates,
            &records,
            &mut trace,
        )
        .await;
        timing.end_phase(TimingKeys::SYNTHESIZE);

        trace.absorb_timing(&timing);
        if context.config.cache.enabled {
            trace.cache = Some(context.cache_manager.generate_performance_report());
        }
        info!(
            "🎉 寻源完成: {} 家供应商进入对比，耗时 {:.2}秒",
            rows.len(),
            trace.total_seconds
        );

        Ok(Report {
            requirement,
            trace,
            rows,
            advice,
        })
    }
}

/// 启动寻源工作流
pub async fn launch(config: &Config, requirement_text: &str) -> Result<Report, SourcingError> {
    let context = SourcingContext::new(config.clone())
        .map_err(|e| SourcingError::Configuration(format!("{:#}", e)))?;

    // 按需在启动时检查模型连接
    if config.check_llm {
        context
            .llm
            .check_connection()
            .await
            .map_err(|e| SourcingError::Configuration(format!("模型服务不可用: {:#}", e)))?;
    }

    let workflow = SourcingWorkflow::new(context);
    let report = workflow.run(requirement_text).await?;

    if let Err(e) = outlet::print(&report, config.json_output) {
        error!("❌ 报告输出失败: {:#}", e);
    }
    if let Some(output_path) = &config.output_path
        && let Err(e) = outlet::save(&report, output_path).await
    {
        warn!("⚠️ 报告保存失败: {:#}", e);
    }

    Ok(report)
}
