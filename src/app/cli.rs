use clap::Parser;

/// cratedig - dig through your sample library without leaving the terminal
#[derive(Parser, Debug)]
#[command(name = "cratedig", version, about)]
pub struct Args {
    /// Local data directory (config, catalog snapshot, log)
    #[arg(long, default_value = "~/.cratedig")]
    pub data: String,

    /// Catalog snapshot file name inside the data directory
    #[arg(long, default_value = "catalog.toml")]
    pub db: String,

    /// Log file name inside the data directory
    #[arg(long, default_value = "cratedig.log")]
    pub log: String,

    /// Root samples directory (overrides the saved one for this run)
    #[arg(long)]
    pub root: Option<String>,

    /// User name to launch with
    #[arg(long)]
    pub user: Option<String>,

    /// Tail the session log instead of starting the UI
    #[arg(long)]
    pub watch: bool,
}
