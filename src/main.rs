use clap::Parser;
use colored::Colorize;

use milkeyway::cli::Cli;
use milkeyway::config::{get_config, init_config_from};
use milkeyway::interfaces::cli::run_cli_command;
use milkeyway::system::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // 配置优先级：ENV > 配置文件 > 默认值
    init_config_from(&cli.config);
    let config = get_config();

    let _log_guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {:#}", "Failed to initialize logging:".red().bold(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_cli_command(cli.command).await {
        eprintln!("{}", e.format_colored());
        std::process::exit(1);
    }

    Ok(())
}
