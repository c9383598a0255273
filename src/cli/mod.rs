mod oneshot;
mod serve;

use anyhow::Result;
use console::style;

use crate::core::config::DashboardConfig;
use crate::core::terminal::{self, GuideSection, print_error};
use crate::platform::{NativePlatform, Platform};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Commands")
        .command("serve", "Start the dashboard API and the gateway poll")
        .command("sync", "Sync jobs and bot status from the gateway once")
        .command("status", "Show the cached bot status")
        .command("help", "Show this help")
        .print();

    GuideSection::new("Options (serve)")
        .text("--api-host <host>   Bind address (default: 127.0.0.1)")
        .text("--api-port <port>   Listen port (default: 17900)")
        .print();

    println!(
        " {} {} <command> [options]\n",
        style("Usage:").bold(),
        style("botdeck").green()
    );
}

/// Later flags win. A port that fails to parse keeps the previous value.
pub(crate) fn parse_api_server_flags(
    args: &[String],
    start: usize,
    mut api_host: String,
    mut api_port: u16,
) -> (String, u16) {
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--api-port" => {
                if i + 1 < args.len() {
                    api_port = args[i + 1].parse().unwrap_or(api_port);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--api-host" => {
                if i + 1 < args.len() {
                    api_host = args[i + 1].clone();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    (api_host, api_port)
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let data_dir = NativePlatform::data_dir();

    let Some(cmd) = args.get(1).map(String::as_str) else {
        print_help();
        return Ok(());
    };

    match cmd {
        "serve" => {
            let mut config = DashboardConfig::load(&data_dir).await?;
            (config.server.host, config.server.port) =
                parse_api_server_flags(&args, 2, config.server.host, config.server.port);
            serve::run_server(data_dir, config).await
        }
        "sync" => {
            let config = DashboardConfig::load(&data_dir).await?;
            oneshot::run_sync(&data_dir, &config).await
        }
        "status" => {
            let config = DashboardConfig::load(&data_dir).await?;
            oneshot::show_status(&data_dir, &config).await
        }
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => {
            print_error(&format!("Unknown command '{}'", other));
            print_help();
            Ok(())
        }
    }
}
