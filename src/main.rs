use clap::Parser;
use ttp_etl::domain::model::RunSummary;
use ttp_etl::utils::{logger, validation::Validate};
use ttp_etl::{CliConfig, EtlEngine, EtlError, LocalStorage, ReqwestFetcher, Settings, TtpPipeline};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting ttp-etl");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    match run(&cli).await {
        Ok(summary) => print_summary(&summary),
        Err(e) => {
            tracing::error!("❌ Run failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: &CliConfig) -> Result<RunSummary, EtlError> {
    let settings = Settings::from_cli(cli)?;
    settings.validate()?;

    let fetcher = ReqwestFetcher::new(&settings.user_agent)?;
    let pipeline = TtpPipeline::new(fetcher, LocalStorage::new(), settings);

    EtlEngine::new(pipeline).run().await
}

fn print_summary(summary: &RunSummary) {
    println!("✅ Navigator layer saved to {}", summary.output_path);
    if let Some(mode) = summary.parsing_mode() {
        println!("Parsing mode: {}", mode.label());
    }

    if summary.techniques.is_empty() {
        println!("\nNo techniques were found in the provided content.");
    } else {
        println!("\nTechniques found:");
        for item in &summary.techniques {
            println!("- {}: {}", item.id, item.name);
        }
    }

    if summary.tactics.is_empty() {
        println!("\nNo tactics were found in the provided content.");
    } else {
        println!("\nTactics found:");
        for item in &summary.tactics {
            println!("- {}: {}", item.id, item.name);
        }
    }
}
