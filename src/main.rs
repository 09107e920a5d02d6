use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gitflow_guard::cli::{run_workflow, Args, WorkflowArgs};
use gitflow_guard::ui;

fn init_logging(args: &Args) {
    let runner_debug = std::env::var("ACTIONS_RUNNER_DEBUG").ok();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_filter(runner_debug.as_deref()).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.version {
        println!("gitflow-guard {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    init_logging(&args);

    let result = match run_workflow(&WorkflowArgs::from(&args)) {
        Ok(result) => result,
        Err(e) => {
            ui::display_error(&e.to_string());
            std::process::exit(1);
        }
    };

    ui::display_evaluation(&result.evaluation, &result.previewed);
    std::process::exit(result.exit_code());
}
