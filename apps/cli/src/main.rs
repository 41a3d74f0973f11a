use clap::Parser;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    assessment_cli::init_tracing();
    assessment_cli::run(assessment_cli::Cli::parse())
}
