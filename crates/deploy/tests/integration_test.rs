//! Integration tests for svlx-deploy.
//!
//! These tests run the deploy and upgrade entry points against an in-memory chain
//! that records every transaction it is sent, with artifacts and deployment records
//! in a temporary directory.
//! Run with: cargo test --test integration_test

use std::{
    collections::BTreeMap,
    path::Path,
    sync::{Arc, Mutex},
};

use alloy_core::primitives::{Address, B256, Bytes, address};
use svlx_deploy::{
    AccountRef, ChainClient, DeployConfig, DeployError, DeployResult, DeployStatus, Deployer,
    DeploymentStore, NamedAccounts, NetworkConfig, NetworkConfigTable, NetworkIdentity,
    ProxyDeployer, ProxyMode, StakePoolConfig, TxReceipt, calldata,
};
use tempdir::TempDir;

const VELAS_POOL: Address = address!("0x7f7697E82be5d7F41De6b283Ca562e4D79a4F74a");
const VELAS_TESTNET_POOL: Address = address!("0x267Ec0079043B43930a1d671FB98fD19FdCaF449");

const SIGNER_0: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
const SIGNER_1: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

const SVLX_BYTECODE_V1: &str = "0x6080604052348015600f57600080fd5b50";
const SVLX_BYTECODE_V2: &str = "0x6080604052348015600f57600080fd5b5060";
const PROXY_BYTECODE: &str = "0x608060405260405161";

/// A transaction received by the [`MockChain`].
#[derive(Debug, Clone)]
struct SentTx {
    from: Address,
    to: Option<Address>,
    data: Bytes,
}

#[derive(Debug, Default)]
struct MockState {
    sent: Vec<SentTx>,
    next_address: u64,
    block_number: u64,
}

/// In-memory chain. Contract creations get sequential addresses.
#[derive(Debug, Clone)]
struct MockChain {
    chain_id: u64,
    signers: Vec<Address>,
    /// When set, calls with this selector are rejected with this message.
    revert: Option<([u8; 4], String)>,
    /// When set, listing the signers fails with this network error.
    accounts_error: Option<String>,
    state: Arc<Mutex<MockState>>,
}

impl MockChain {
    fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            signers: vec![SIGNER_0, SIGNER_1],
            revert: None,
            accounts_error: None,
            state: Arc::new(Mutex::new(MockState {
                next_address: 0x1000,
                ..Default::default()
            })),
        }
    }

    fn reverting(mut self, signature: &str, message: &str) -> Self {
        self.revert = Some((calldata::selector(signature), message.to_string()));
        self
    }

    fn failing_accounts(mut self, message: &str) -> Self {
        self.accounts_error = Some(message.to_string());
        self
    }

    fn sent(&self) -> Vec<SentTx> {
        self.state.lock().unwrap().sent.clone()
    }

    fn calls_to(&self, signature: &str) -> Vec<SentTx> {
        let selector = calldata::selector(signature);
        self.sent()
            .into_iter()
            .filter(|tx| tx.to.is_some() && tx.data.len() >= 4 && tx.data[..4] == selector)
            .collect()
    }

    fn record(&self, tx: SentTx) -> TxReceipt {
        let mut state = self.state.lock().unwrap();
        state.block_number += 1;
        let contract_address = tx.to.is_none().then(|| {
            state.next_address += 1;
            let mut bytes = [0u8; 20];
            bytes[12..].copy_from_slice(&state.next_address.to_be_bytes());
            Address::from(bytes)
        });
        let receipt = TxReceipt {
            transaction_hash: B256::with_last_byte(state.sent.len() as u8 + 1),
            block_number: state.block_number,
            contract_address,
        };
        state.sent.push(tx);
        receipt
    }
}

impl ChainClient for MockChain {
    async fn chain_id(&self) -> DeployResult<u64> {
        Ok(self.chain_id)
    }

    async fn accounts(&self) -> DeployResult<Vec<Address>> {
        if let Some(message) = &self.accounts_error {
            return Err(DeployError::Network(message.clone()));
        }
        Ok(self.signers.clone())
    }

    async fn deploy_contract(&self, from: Address, init_code: Bytes) -> DeployResult<TxReceipt> {
        Ok(self.record(SentTx {
            from,
            to: None,
            data: init_code,
        }))
    }

    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
    ) -> DeployResult<TxReceipt> {
        if let Some((selector, message)) = &self.revert {
            if data.len() >= 4 && data[..4] == *selector {
                return Err(DeployError::TransactionRevert(message.clone()));
            }
        }
        Ok(self.record(SentTx {
            from,
            to: Some(to),
            data,
        }))
    }
}

/// Test setup context: artifacts, deployment records and configuration in a temp dir.
struct TestContext {
    temp_dir: TempDir,
    config: DeployConfig,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new("svlx-it").expect("Failed to create temp dir");
        let artifacts_dir = temp_dir.path().join("artifacts");
        std::fs::create_dir_all(&artifacts_dir).expect("Failed to create artifacts dir");

        write_artifact(&artifacts_dir, "SVLX", SVLX_BYTECODE_V1);
        write_artifact(&artifacts_dir, "EIP173Proxy", PROXY_BYTECODE);

        let mut networks = BTreeMap::new();
        networks.insert(
            "velas".to_string(),
            NetworkConfig {
                url: "http://127.0.0.1:8545".parse().expect("valid url"),
                chain_id: None,
                hd_wallet: None,
            },
        );

        let config = DeployConfig {
            artifacts_dir,
            deployments_dir: temp_dir.path().join("deployments"),
            networks,
            stake_pools: NetworkConfigTable::new([
                (106, StakePoolConfig { pool: VELAS_POOL }),
                (111, StakePoolConfig { pool: VELAS_TESTNET_POOL }),
            ]),
            ..Default::default()
        };

        Self { temp_dir, config }
    }

    fn deployer(&self, chain: &MockChain) -> Deployer<MockChain> {
        Deployer::new(self.config.clone(), "velas", chain.clone())
    }

    fn store(&self) -> DeploymentStore {
        DeploymentStore::new(&self.config.deployments_dir)
    }

    /// Replace the SVLX artifact with new bytecode, as a recompile would.
    fn change_bytecode(&self) {
        write_artifact(&self.config.artifacts_dir, "SVLX", SVLX_BYTECODE_V2);
    }
}

fn write_artifact(dir: &Path, name: &str, bytecode: &str) {
    let artifact = serde_json::json!({
        "contractName": name,
        "abi": [{
            "type": "function",
            "name": "addPool",
            "inputs": [{ "name": "pool", "type": "address" }],
        }],
        "bytecode": bytecode,
    });
    std::fs::write(dir.join(format!("{name}.json")), artifact.to_string())
        .expect("Failed to write artifact");
}

#[tokio::test]
async fn test_fresh_deploy_registers_pool_once() {
    let ctx = TestContext::new();
    let chain = MockChain::new(106);

    let report = ctx.deployer(&chain).deploy().await.expect("Deploy failed");

    assert_eq!(report.deployment.status, DeployStatus::Fresh);
    // implementation, proxy, addPool
    assert_eq!(chain.sent().len(), 3);

    let add_pool = chain.calls_to(calldata::ADD_POOL_SIGNATURE);
    assert_eq!(add_pool.len(), 1, "addPool should be sent exactly once");
    assert_eq!(add_pool[0].to, Some(report.contract_address()));
    assert_eq!(
        calldata::decode_address_arg(&add_pool[0].data, calldata::ADD_POOL_SIGNATURE),
        Some(VELAS_POOL)
    );

    let registration = report.registration.as_ref().expect("Pool should be registered");
    assert_eq!(registration.pool, VELAS_POOL);
    assert_eq!(
        registration.to_string(),
        format!("Registered stake pool {VELAS_POOL} on {}", report.contract_address())
    );
}

#[tokio::test]
async fn test_redeploy_is_idempotent() {
    let ctx = TestContext::new();
    let chain = MockChain::new(106);

    let first = ctx.deployer(&chain).deploy().await.expect("First deploy failed");
    let sent_after_first = chain.sent().len();

    let second = ctx.deployer(&chain).deploy().await.expect("Second deploy failed");

    assert_eq!(second.deployment.status, DeployStatus::Reused);
    assert_eq!(first.contract_address(), second.contract_address());
    assert_eq!(
        first.deployment.record.implementation_address,
        second.deployment.record.implementation_address
    );
    assert_eq!(
        chain.sent().len(),
        sent_after_first,
        "Second run should send no transactions"
    );
    assert!(second.registration.is_none());
    assert_eq!(chain.calls_to(calldata::ADD_POOL_SIGNATURE).len(), 1);
}

#[tokio::test]
async fn test_fresh_deploy_on_unconfigured_chain_skips_registration() {
    let ctx = TestContext::new();
    let chain = MockChain::new(999);

    let report = ctx.deployer(&chain).deploy().await.expect("Deploy failed");

    assert_eq!(report.deployment.status, DeployStatus::Fresh);
    assert!(report.registration.is_none());
    assert!(chain.calls_to(calldata::ADD_POOL_SIGNATURE).is_empty());
    assert_eq!(chain.sent().len(), 2);
}

#[tokio::test]
async fn test_testnet_scenario_with_default_admin() {
    let ctx = TestContext::new();
    let chain = MockChain::new(111);

    let report = ctx.deployer(&chain).deploy().await.expect("Deploy failed");

    assert!(report.roles.admin_defaulted);
    assert_eq!(report.roles.admin, report.roles.deployer);
    assert_eq!(report.roles.deployer, SIGNER_0);
    assert_eq!(report.network.chain_id, 111);
    assert!(report.deployment.is_fresh());

    let add_pool = chain.calls_to(calldata::ADD_POOL_SIGNATURE);
    assert_eq!(add_pool.len(), 1);
    assert_eq!(add_pool[0].from, report.roles.admin);
    assert_eq!(
        calldata::decode_address_arg(&add_pool[0].data, calldata::ADD_POOL_SIGNATURE),
        Some(VELAS_TESTNET_POOL)
    );

    let stored = ctx
        .store()
        .load("velas", "SVLX")
        .expect("Failed to load record")
        .expect("Record should be persisted");
    assert_eq!(report.contract_address(), stored.proxy_address);
    assert_eq!(
        stored.network,
        NetworkIdentity {
            name: "velas".to_string(),
            chain_id: 111,
        }
    );
}

#[tokio::test]
async fn test_configured_admin_sends_registration() {
    let mut ctx = TestContext::new();
    ctx.config.named_accounts = NamedAccounts {
        deployer: AccountRef::Index(0),
        admin_account: Some(AccountRef::Index(1)),
    };
    let chain = MockChain::new(106);

    let report = ctx.deployer(&chain).deploy().await.expect("Deploy failed");

    assert!(!report.roles.admin_defaulted);
    let add_pool = chain.calls_to(calldata::ADD_POOL_SIGNATURE);
    assert_eq!(add_pool.len(), 1);
    assert_eq!(add_pool[0].from, SIGNER_1);
    assert!(chain.sent().iter().filter(|tx| tx.to.is_none()).all(|tx| tx.from == SIGNER_0));
}

#[tokio::test]
async fn test_registration_revert_is_surfaced_and_not_retried() {
    let ctx = TestContext::new();
    let chain = MockChain::new(106)
        .reverting(calldata::ADD_POOL_SIGNATURE, "execution reverted: pool already added");

    let result = ctx.deployer(&chain).deploy().await;
    match result {
        Err(DeployError::TransactionRevert(msg)) => {
            assert_eq!(msg, "execution reverted: pool already added")
        }
        other => panic!("expected revert, got {other:?}"),
    }

    // The proxy stays deployed; a rerun reuses it and does not register again.
    let record = ctx
        .store()
        .load("velas", "SVLX")
        .expect("Failed to load record")
        .expect("Record should be persisted");
    let rerun = ctx.deployer(&chain).deploy().await.expect("Rerun failed");
    assert_eq!(rerun.deployment.status, DeployStatus::Reused);
    assert_eq!(rerun.contract_address(), record.proxy_address);
    assert_eq!(chain.sent().len(), 2);
}

#[tokio::test]
async fn test_changed_bytecode_is_not_auto_upgraded() {
    let ctx = TestContext::new();
    let chain = MockChain::new(106);

    let first = ctx.deployer(&chain).deploy().await.expect("Deploy failed");
    let sent_after_first = chain.sent().len();

    ctx.change_bytecode();
    let second = ctx.deployer(&chain).deploy().await.expect("Redeploy failed");

    assert_eq!(second.deployment.status, DeployStatus::Outdated);
    assert_eq!(second.deployment.record, first.deployment.record);
    assert_eq!(chain.sent().len(), sent_after_first);
    assert!(chain.calls_to(calldata::UPGRADE_TO_SIGNATURE).is_empty());
}

#[tokio::test]
async fn test_upgrade_keeps_proxy_address() {
    let ctx = TestContext::new();
    let chain = MockChain::new(106);

    let deployed = ctx.deployer(&chain).deploy().await.expect("Deploy failed");
    ctx.change_bytecode();

    let outcome = ctx.deployer(&chain).upgrade().await.expect("Upgrade failed");

    assert!(outcome.upgraded);
    assert_eq!(outcome.record.proxy_address, deployed.contract_address());
    assert_eq!(
        outcome.previous_implementation,
        deployed.deployment.record.implementation_address
    );
    assert_ne!(
        outcome.record.implementation_address,
        outcome.previous_implementation
    );
    assert!(outcome.record.upgraded_at.is_some());

    let upgrade_calls = chain.calls_to(calldata::UPGRADE_TO_SIGNATURE);
    assert_eq!(upgrade_calls.len(), 1);
    assert_eq!(upgrade_calls[0].to, Some(deployed.contract_address()));
    assert_eq!(
        calldata::decode_address_arg(&upgrade_calls[0].data, calldata::UPGRADE_TO_SIGNATURE),
        Some(outcome.record.implementation_address)
    );
    // Registration only ever happened during the fresh deploy.
    assert_eq!(chain.calls_to(calldata::ADD_POOL_SIGNATURE).len(), 1);

    let stored = ctx
        .store()
        .load("velas", "SVLX")
        .expect("Failed to load record")
        .expect("Record should be persisted");
    assert_eq!(stored, outcome.record);

    // Deploying after the upgrade reuses the upgraded proxy.
    let sent_before = chain.sent().len();
    let redeploy = ctx.deployer(&chain).deploy().await.expect("Redeploy failed");
    assert_eq!(redeploy.deployment.status, DeployStatus::Reused);
    assert_eq!(redeploy.contract_address(), deployed.contract_address());
    assert_eq!(chain.sent().len(), sent_before);
}

#[tokio::test]
async fn test_upgrade_without_existing_proxy_fails() {
    let ctx = TestContext::new();
    let chain = MockChain::new(106);

    let result = ctx.deployer(&chain).upgrade().await;

    assert!(matches!(result, Err(DeployError::NoExistingProxy { .. })));
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn test_upgrade_with_unchanged_bytecode_is_noop() {
    let ctx = TestContext::new();
    let chain = MockChain::new(106);

    ctx.deployer(&chain).deploy().await.expect("Deploy failed");
    let sent_before = chain.sent().len();

    let outcome = ctx.deployer(&chain).upgrade().await.expect("Upgrade failed");

    assert!(!outcome.upgraded);
    assert_eq!(outcome.record.implementation_address, outcome.previous_implementation);
    assert_eq!(chain.sent().len(), sent_before);
}

#[tokio::test]
async fn test_chain_id_mismatch_is_configuration_error() {
    let mut ctx = TestContext::new();
    if let Some(network) = ctx.config.networks.get_mut("velas") {
        network.chain_id = Some(106);
    }
    let chain = MockChain::new(111);

    let result = ctx.deployer(&chain).deploy().await;

    assert!(matches!(result, Err(DeployError::Configuration(_))));
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn test_proxy_deployer_rejects_upgrade_mode() {
    let ctx = TestContext::new();
    let chain = MockChain::new(106);
    let store = ctx.store();
    let network = NetworkIdentity {
        name: "velas".to_string(),
        chain_id: 106,
    };
    let contract = svlx_deploy::ContractArtifact::load(&ctx.config.artifacts_dir, "SVLX")
        .expect("Failed to load artifact");
    let proxy = svlx_deploy::ContractArtifact::load(&ctx.config.artifacts_dir, "EIP173Proxy")
        .expect("Failed to load artifact");
    let roles = svlx_deploy::AccountResolver::new(&ctx.config.named_accounts)
        .resolve(&[SIGNER_0])
        .expect("Failed to resolve accounts");

    let result = ProxyDeployer::new(&chain, &store, &network)
        .deploy(&contract, &proxy, &roles, &ProxyMode::Upgrade)
        .await;

    assert!(matches!(result, Err(DeployError::Configuration(_))));
    assert!(chain.sent().is_empty());
    assert!(ctx.temp_dir.path().join("artifacts/SVLX.json").exists());
}

#[tokio::test]
async fn test_proxy_creation_carries_initializer() {
    let ctx = TestContext::new();
    let chain = MockChain::new(999);

    let report = ctx.deployer(&chain).deploy().await.expect("Deploy failed");

    let creations: Vec<_> = chain.sent().into_iter().filter(|tx| tx.to.is_none()).collect();
    assert_eq!(creations.len(), 2);
    assert_eq!(creations[0].data.to_string(), SVLX_BYTECODE_V1);

    let proxy_code = &creations[1].data;
    let proxy_prefix: Bytes = PROXY_BYTECODE.parse().expect("valid hex");
    assert_eq!(proxy_code[..proxy_prefix.len()], proxy_prefix[..]);
    let args = &proxy_code[proxy_prefix.len()..];
    assert_eq!(
        Address::from_slice(&args[12..32]),
        report.deployment.record.implementation_address
    );
    assert_eq!(Address::from_slice(&args[44..64]), report.roles.deployer);
    assert_eq!(args[128..132], calldata::selector("initialize()"));
}

#[tokio::test]
async fn test_record_from_another_chain_is_not_reused() {
    let ctx = TestContext::new();
    let mainnet = MockChain::new(106);
    ctx.deployer(&mainnet).deploy().await.expect("Deploy failed");

    // Same network name, different node.
    let other = MockChain::new(999);
    let deploy = ctx.deployer(&other).deploy().await;
    assert!(matches!(
        deploy,
        Err(DeployError::Configuration(msg)) if msg.contains("chain id 106")
    ));

    ctx.change_bytecode();
    let upgrade = ctx.deployer(&other).upgrade().await;
    assert!(matches!(upgrade, Err(DeployError::Configuration(_))));
    assert!(other.sent().is_empty());
}

#[tokio::test]
async fn test_account_provider_failure_propagates_unmodified() {
    let ctx = TestContext::new();
    let chain = MockChain::new(106).failing_accounts("connection refused");

    let result = ctx.deployer(&chain).deploy().await;

    match result {
        Err(DeployError::Network(msg)) => assert_eq!(msg, "connection refused"),
        other => panic!("expected network error, got {other:?}"),
    }
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn test_upgrade_ignores_unresolvable_admin() {
    let mut ctx = TestContext::new();
    let chain = MockChain::new(106);
    ctx.deployer(&chain).deploy().await.expect("Deploy failed");

    ctx.config.named_accounts.admin_account = Some(AccountRef::Index(9));
    ctx.change_bytecode();

    let outcome = ctx.deployer(&chain).upgrade().await.expect("Upgrade failed");
    assert!(outcome.upgraded);
    let upgrade_calls = chain.calls_to(calldata::UPGRADE_TO_SIGNATURE);
    assert_eq!(upgrade_calls.len(), 1);
    assert_eq!(upgrade_calls[0].from, SIGNER_0);
}
