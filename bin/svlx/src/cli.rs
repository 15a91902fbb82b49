use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "svlx")]
#[command(
    author,
    version,
    about = "Deploy, redeploy and upgrade the SVLX proxy across networks"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "SVLX_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the configuration file (or a directory containing Svlx.toml).
    ///
    /// If not provided, ./Svlx.toml is used when it exists. Values can be
    /// overridden with SVLX_-prefixed environment variables.
    #[arg(long, alias = "conf", env = "SVLX_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy the proxy, or reuse an existing deployment, and register the stake pool
    /// after a fresh deploy.
    Deploy(RunArgs),
    /// Deploy new logic and repoint the existing proxy to it.
    Upgrade(RunArgs),
    /// Print the accounts derived from the HD wallet mnemonic.
    Accounts(AccountsArgs),
    /// List the deployments recorded for a network.
    Deployments(NetworkArgs),
}

#[derive(Args)]
pub struct NetworkArgs {
    /// Name of the target network in the configuration.
    #[arg(short, long, env = "SVLX_NETWORK")]
    pub network: String,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub target: NetworkArgs,

    /// BIP-39 mnemonic for networks that sign with an HD wallet (vlxmain, vlxtest).
    ///
    /// Ignored by networks whose node holds the keys (hardhat, localhost).
    #[arg(long, env = "HDWALLET_MNEMONIC", hide_env_values = true)]
    pub mnemonic: Option<String>,
}

#[derive(Args)]
pub struct AccountsArgs {
    /// BIP-39 mnemonic of the HD wallet.
    #[arg(long, env = "HDWALLET_MNEMONIC", hide_env_values = true)]
    pub mnemonic: String,

    /// Number of accounts to derive.
    #[arg(short, long, default_value_t = 1)]
    pub count: u32,
}
