use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "astro-influx-exporter",
    version,
    about = "Forwards observatory equipment telemetry to InfluxDB"
)]
pub struct Args {
    /// Overrides EXPORTER_HTTP_BIND for the host bridge.
    #[arg(long)]
    pub bind: Option<String>,
    /// Runs the InfluxDB connection check, prints the result and exits.
    #[arg(long, default_value_t = false)]
    pub check_connection: bool,
}
