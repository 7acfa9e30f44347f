use clap::{Parser, Subcommand};

mod cmd;

#[derive(Parser, Debug)]
#[command(
    name = "fifotax",
    version,
    about = "Realized stock profit per tax year using FIFO cost basis"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Income, cost and profit per tax year for each stock
    Report(cmd::report::ReportCommand),
    /// Describe the accepted statement format
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Report(report) => report.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
