//! End-to-end genesis mining scenarios.

use genesis_core::coinbase::CoinbaseBuilder;
use genesis_core::hash::hash_to_display_hex;
use genesis_core::{meets_target, GenesisConfig, GenesisTemplate, Miner, Network};

const SATOSHI_SCRIPT: &str = "4104678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5fac";

fn test_config(bits: u32) -> GenesisConfig {
    let mut config =
        GenesisConfig::for_network(Network::Regtest, "test-genesis", vec![0x6a], 1700000000);
    config.compact_target = bits;
    config
}

#[test]
fn mines_easy_regtest_genesis() {
    let config = test_config(0x207fffff);
    let template = config.template().unwrap();
    let block = Miner::from_config(&config).mine(&template).unwrap();

    assert!(meets_target(&block.hash(), &template.target));
    assert!(block.verify());
    assert_eq!(block.nonce(), 2);
    assert_eq!(
        block.hash_hex(),
        "42e10465f8a014b7dec6e1a784027aed35cc950517a6f2344e942abdea2698e0"
    );
    assert_eq!(
        block.merkle_root_hex(),
        "366bfbaf530603db516fac5ef7746e524f45ddc62efdb697d235bd9ef9f88715"
    );
    assert_eq!(block.header().timestamp, 1700000000);
}

#[test]
fn mining_is_deterministic() {
    let config = test_config(0x1f00ffff);
    let template = config.template().unwrap();
    let miner = Miner::new();

    let first = miner.mine(&template).unwrap();
    let second = miner.mine(&template).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.nonce(), 62615);
    assert_eq!(
        first.hash_hex(),
        "00004aaceff15b0ddd639a355a451f94030830e4ede61487d9a80417d7009d41"
    );
    assert_eq!(
        first.merkle_root_hex(),
        "b95eb384107f935c83baf9e76b3c72115cc50fe5fdc88533f78ed61a6aa56cb5"
    );
}

#[test]
fn thread_count_does_not_change_the_result() {
    let template = test_config(0x1f0fffff).template().unwrap();

    let single = Miner::new().with_threads(1).mine(&template).unwrap();
    let parallel = Miner::new()
        .with_threads(8)
        .with_batch_size(256)
        .mine(&template)
        .unwrap();

    assert_eq!(single.nonce(), 9808);
    assert_eq!(
        single.hash_hex(),
        "000d12cc455860fd8c018dc39c12312f84f669784ac66bedf41ab22f07e07faf"
    );
    assert_eq!(single, parallel);
}

#[test]
fn reproduces_bitcoin_genesis_block() {
    let coinbase = CoinbaseBuilder::new(
        "The Times 03/Jan/2009 Chancellor on brink of second bailout for banks",
        hex::decode(SATOSHI_SCRIPT).unwrap(),
    )
    .with_genesis_extra_data(0x1d00ffff)
    .build(5_000_000_000)
    .unwrap();
    let template = GenesisTemplate::new(coinbase, 1, 1231006505, 0x1d00ffff).unwrap();

    assert_eq!(
        hash_to_display_hex(&template.header.merkle_root),
        "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"
    );

    // Search just the neighbourhood of the known nonce.
    let block = Miner::new()
        .with_threads(2)
        .with_batch_size(64)
        .with_nonce_range(2083236800..2083237000)
        .mine(&template)
        .unwrap();

    assert_eq!(block.nonce(), 2083236893);
    assert_eq!(
        block.hash_hex(),
        "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
    );
    assert_eq!(block.serialize_block().len(), 285);
}

#[test]
fn config_record_drives_the_pipeline() {
    let json = r#"{
        "message": "test-genesis",
        "reward": 5000000000,
        "rewardOutputScript": "6a",
        "timestamp": 1700000000,
        "compactTarget": "0x1f0fffff",
        "threadCount": 4,
        "network": "regtest"
    }"#;
    let config: GenesisConfig = serde_json::from_str(json).unwrap();
    let template = config.template().unwrap();

    assert_eq!(
        hash_to_display_hex(&template.header.merkle_root),
        "f444bab4607bfff096aa1c7b91869b96c767cf0a8923607ac1cd7d193498689b"
    );

    let block = Miner::from_config(&config).mine(&template).unwrap();
    assert_eq!(block.nonce(), 9808);
    assert!(block.verify());
}
