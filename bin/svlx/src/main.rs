//! svlx is a CLI tool to deploy and upgrade the SVLX contract behind a proxy.

mod cli;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::Table;

use cli::{AccountsArgs, Cli, Command};
use svlx_deploy::{DeployConfig, Deployer, DeploymentStore, HdWallet};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config_path = cli.config.as_ref().map(PathBuf::from);

    match cli.command {
        Command::Deploy(args) => {
            let network = &args.target.network;
            let config = DeployConfig::load(config_path.as_deref())?;
            let deployer = Deployer::connect(config, network, args.mnemonic.as_deref())?;
            deployer
                .deploy()
                .await
                .with_context(|| format!("Deployment to {network} failed"))?;
        }
        Command::Upgrade(args) => {
            let network = &args.target.network;
            let config = DeployConfig::load(config_path.as_deref())?;
            let deployer = Deployer::connect(config, network, args.mnemonic.as_deref())?;
            deployer
                .upgrade()
                .await
                .with_context(|| format!("Upgrade on {network} failed"))?;
        }
        Command::Accounts(args) => print_accounts(&args)?,
        Command::Deployments(args) => {
            let config = DeployConfig::load(config_path.as_deref())?;
            let store = DeploymentStore::new(&config.deployments_dir);
            let records = store.list(&args.network)?;

            if records.is_empty() {
                tracing::info!(network = %args.network, "No deployments recorded");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_header(vec![
                "Contract",
                "Chain id",
                "Proxy",
                "Implementation",
                "Deployed at",
                "Upgraded at",
            ]);
            for record in records {
                table.add_row(vec![
                    record.contract_name,
                    record.network.chain_id.to_string(),
                    record.proxy_address.to_string(),
                    record.implementation_address.to_string(),
                    record.deployed_at.to_rfc3339(),
                    record
                        .upgraded_at
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_else(|| "-".to_string()),
                ]);
            }
            println!("{table}");
        }
    }

    Ok(())
}

/// Derive and print the first `count` addresses of the mnemonic's default derivation path.
fn print_accounts(args: &AccountsArgs) -> Result<()> {
    let wallet = HdWallet::from_mnemonic(&args.mnemonic, args.count)
        .context("Failed to derive accounts from mnemonic")?;
    for (index, address) in wallet.addresses().into_iter().enumerate() {
        println!("{index}: {address}");
    }
    Ok(())
}
