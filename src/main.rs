use clap::Parser;
use std::process::ExitCode;

use sourcing_rs::cli::Args;
use sourcing_rs::error::SourcingError;
use sourcing_rs::{launch, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // 日志可能尚未初始化
            eprintln!("❌ {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: Args) -> Result<(), SourcingError> {
    let verbose = args.verbose;
    let requirement = args.requirement.clone();
    let config = args.into_config()?;
    logging::init(&config.log_level, verbose);

    // 任何外部调用之前完成校验
    config.validate()?;
    launch(&config, &requirement).await.map(|_| ())
}
