use clap::Parser;

use minute_recon::{load_aggregator, write_report, Window};

/// Joins per-minute transaction status counts with the `00` authorizations of the same minute
#[derive(Debug, Parser)]
#[clap(version)]
struct Args {
    /// The path to the transactions CSV file (timestamp, status, count)
    #[clap(env = "MINUTE_RECON_TRANSACTIONS")]
    transactions: std::path::PathBuf,
    /// The path to the auth codes CSV file (timestamp, auth_code, count)
    #[clap(env = "MINUTE_RECON_AUTH_CODES")]
    auth_codes: std::path::PathBuf,
    /// Only report the minutes this far back from the latest one: 15m, 1h, 6h or all
    #[clap(long, default_value = "all")]
    window: Window,
    /// Print the headline figures of the window instead of the per-minute report
    #[clap(long)]
    summary: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let aggregator = load_aggregator(&args.transactions, &args.auth_codes)?;

    if args.summary {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(std::io::stdout());
        writer.serialize(aggregator.summary(args.window)?)?;
        writer.flush()?;
    } else {
        write_report(std::io::stdout(), &aggregator.report_window(args.window))?;
    }

    Ok(())
}
