//! Resolution of the named accounts used by a run.

use alloy_core::primitives::Address;

use crate::{AccountRef, ChainClient, DeployError, DeployResult, NamedAccounts};

/// Concrete addresses for the roles of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountRoles {
    /// Sends the deploy and upgrade transactions; owns the proxy.
    pub deployer: Address,
    /// Sends the stake pool registration.
    pub admin: Address,
    /// Whether `admin` was substituted with the first signer because none was configured.
    pub admin_defaulted: bool,
}

/// Resolves [`NamedAccounts`] against the signers of the connected node.
pub struct AccountResolver<'a> {
    named: &'a NamedAccounts,
}

impl<'a> AccountResolver<'a> {
    pub fn new(named: &'a NamedAccounts) -> Self {
        Self { named }
    }

    /// Fetch the signer list from `chain` and resolve the roles against it.
    pub async fn resolve_from<C: ChainClient>(&self, chain: &C) -> DeployResult<AccountRoles> {
        let signers = chain.accounts().await?;
        self.resolve(&signers)
    }

    /// Fetch the signer list from `chain` and resolve the deployer alone.
    pub async fn resolve_deployer_from<C: ChainClient>(&self, chain: &C) -> DeployResult<Address> {
        let signers = chain.accounts().await?;
        self.resolve_deployer(&signers)
    }

    /// Resolve the deployer against `signers`, leaving the admin role untouched.
    pub fn resolve_deployer(&self, signers: &[Address]) -> DeployResult<Address> {
        let deployer = resolve_ref(self.named.deployer, signers, "deployer")?;
        tracing::debug!(deployer = %deployer, "Resolved deployer");
        Ok(deployer)
    }

    /// Resolve the roles against `signers`.
    ///
    /// An unset admin becomes the first signer.
    pub fn resolve(&self, signers: &[Address]) -> DeployResult<AccountRoles> {
        let deployer = self.resolve_deployer(signers)?;

        let (admin, admin_defaulted) = match self.named.admin_account {
            Some(admin) => (resolve_ref(admin, signers, "adminAccount")?, false),
            None => {
                let signer = signers.first().copied().ok_or_else(|| {
                    DeployError::config("no signer available to default adminAccount to")
                })?;
                tracing::info!(admin = %signer, "Using first signer as adminAccount");
                (signer, true)
            }
        };

        tracing::info!(admin = %admin, defaulted = admin_defaulted, "Resolved adminAccount");

        Ok(AccountRoles {
            deployer,
            admin,
            admin_defaulted,
        })
    }
}

fn resolve_ref(account: AccountRef, signers: &[Address], role: &str) -> DeployResult<Address> {
    match account {
        AccountRef::Address(address) => Ok(address),
        AccountRef::Index(index) => signers.get(index).copied().ok_or_else(|| {
            DeployError::config(format!(
                "cannot resolve {role}: signer index {index} requested but {} signer(s) available",
                signers.len()
            ))
        }),
    }
}
