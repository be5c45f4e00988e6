//! Decoder scenarios: log-emitted events, CPI-emitted events behind the
//! wrapper discriminator, synthesized instruction-type events, determinism
//! and isolation.

use base64::Engine as _;
use engine::decode::{
    meteora_damm, meteora_dbc, pumpfun, MeteoraDbcDecoder, PumpfunDecoder, EVENT_CPI_WRAPPER,
};
use engine::{DecoderRegistry, ProgramDecoder};
use schema::{
    Event, InnerInstructions, Instruction, ProgramId, SourceKind, TokenBalance,
    TransactionEnvelope, Value, WSOL_MINT,
};

const PUMPFUN: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";
const DAMM_V2: &str = "cpamdpZCGKUy5JxQXB4dcpGPiikHawvSWAd6mEn1sGG";
const DBC: &str = "dbcij3LWUppWqq96dh6gJWwBifmcGfLSB5D4DuSMaqN";
const JUPITER: &str = "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4";

/// Little-endian payload builder mirroring the on-chain layout.
struct PayloadWriter(Vec<u8>);

impl PayloadWriter {
    fn with_discriminator(disc: [u8; 8]) -> Self {
        Self(disc.to_vec())
    }

    fn pubkey(mut self, address: &str) -> Self {
        let bytes = bs58::decode(address).into_vec().expect("valid base58");
        assert_eq!(bytes.len(), 32, "test pubkeys must be 32 bytes");
        self.0.extend_from_slice(&bytes);
        self
    }

    fn u64(mut self, v: u64) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn u128(mut self, v: u128) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn i64(mut self, v: i64) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn u8(mut self, v: u8) -> Self {
        self.0.push(v);
        self
    }

    fn bool(self, v: bool) -> Self {
        self.u8(v as u8)
    }

    fn bytes(self) -> Vec<u8> {
        self.0
    }
}

fn key(n: u8) -> String {
    bs58::encode([n; 32]).into_string()
}

fn trade_event_bytes(sol_amount: u64, token_amount: u64, is_buy: bool) -> Vec<u8> {
    let disc = pumpfun::SCHEMA.events[0].discriminator;
    PayloadWriter::with_discriminator(disc)
        .pubkey(&key(7)) // mint
        .u64(sol_amount)
        .u64(token_amount)
        .bool(is_buy)
        .pubkey(&key(8)) // user
        .i64(1_700_000_000) // timestamp
        .u64(30_000_000_000) // virtual_sol_reserves
        .u64(1_000_000_000_000) // virtual_token_reserves
        .u64(10_000_000_000) // real_sol_reserves
        .u64(500_000_000_000) // real_token_reserves
        .bytes()
}

fn pumpfun_log_envelope(payload: &[u8]) -> TransactionEnvelope {
    let b64 = base64::engine::general_purpose::STANDARD.encode(payload);
    TransactionEnvelope {
        signature: "PumpSig111".into(),
        slot: 100,
        block_time: Some(1_700_000_000),
        is_success: true,
        account_keys: vec!["FeePayer111".into(), PUMPFUN.into()],
        log_messages: vec![
            format!("Program {PUMPFUN} invoke [1]"),
            format!("Program data: {b64}"),
            format!("Program {PUMPFUN} success"),
        ],
        ..Default::default()
    }
}

#[test]
fn test_log_event_decode() {
    let env = pumpfun_log_envelope(&trade_event_bytes(1_000_000_000, 5_000_000, true));
    let events = PumpfunDecoder.parse(&env);

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.name, "TradeEvent");
    assert_eq!(event.program, ProgramId::Pumpfun);
    assert!(event.id.ends_with(":0"));
    assert_eq!(event.id, format!("PumpSig111:{PUMPFUN}:0"));
    assert_eq!(event.signer, "FeePayer111");
    assert_eq!(
        event.data.get("sol_amount").unwrap(),
        &Value::Big("1000000000".into())
    );
    assert_eq!(event.data.get("is_buy").unwrap(), &Value::Bool(true));
    assert_eq!(event.data.get("mint").unwrap().as_str(), Some(key(7).as_str()));
}

#[test]
fn test_log_event_owned_by_other_program_ignored() {
    let mut env = pumpfun_log_envelope(&trade_event_bytes(1, 1, true));
    // Same data line, but emitted while another program is current.
    env.log_messages = vec![
        format!("Program {DBC} invoke [1]"),
        env.log_messages[1].clone(),
        format!("Program {DBC} success"),
    ];
    assert!(PumpfunDecoder.parse(&env).is_empty());
}

#[test]
fn test_involvement_gate() {
    let mut env = pumpfun_log_envelope(&trade_event_bytes(1, 1, true));
    env.account_keys = vec!["FeePayer111".into()];
    assert!(PumpfunDecoder.parse(&env).is_empty());
}

fn swap2_event_bytes() -> Vec<u8> {
    let disc = meteora_damm::SCHEMA.events[0].discriminator;
    PayloadWriter::with_discriminator(disc)
        .pubkey(&key(9)) // pool
        .u8(0) // trade_direction
        .u8(0) // collect_fee_mode
        .bool(false) // has_referral
        .u64(2_000_000_000) // params.amount_in
        .u64(1) // params.minimum_amount_out
        .u64(2_000_000_000) // swap_result.input_amount
        .u64(42_000_000) // swap_result.output_amount
        .u128(79_228_162_514_264_337_593) // swap_result.next_sqrt_price
        .u64(3_000_000) // swap_result.lp_fee
        .u64(1_000_000) // swap_result.protocol_fee
        .u64(0) // swap_result.partner_fee
        .u64(0) // swap_result.referral_fee
        .u64(2_000_000_000) // actual_amount_in
        .u64(1_700_000_000) // current_timestamp
        .bytes()
}

fn damm_cpi_envelope(inner_data: Vec<u8>) -> TransactionEnvelope {
    TransactionEnvelope {
        signature: "DammSig111".into(),
        slot: 200,
        block_time: Some(1_700_000_100),
        is_success: true,
        account_keys: vec!["FeePayer111".into(), DAMM_V2.into()],
        inner_instructions: vec![InnerInstructions {
            outer_index: 0,
            instructions: vec![Instruction {
                program_index: 1,
                accounts: vec![],
                data: inner_data,
            }],
        }],
        ..Default::default()
    }
}

#[test]
fn test_cpi_event_decode_with_wrapper() {
    let mut data = EVENT_CPI_WRAPPER.to_vec();
    data.extend_from_slice(&swap2_event_bytes());
    let env = damm_cpi_envelope(data);

    let events = engine::decode::MeteoraDammDecoder.parse(&env);
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.name, "EvtSwap2");
    assert_eq!(event.data.get("pool").unwrap().as_str(), Some(key(9).as_str()));
    // Nested struct survives and its first level is flattened.
    assert!(event.data.get("swap_result").unwrap().as_map().is_some());
    assert_eq!(
        event.data.get("output_amount").unwrap(),
        &Value::Big("42000000".into())
    );
}

#[test]
fn test_cpi_event_decode_bare() {
    let env = damm_cpi_envelope(swap2_event_bytes());
    let events = engine::decode::MeteoraDammDecoder.parse(&env);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "EvtSwap2");
}

#[test]
fn test_decoder_determinism_and_unique_ids() {
    let mut env = pumpfun_log_envelope(&trade_event_bytes(1_000_000_000, 5_000_000, true));
    // Two data lines → two events.
    let b64 = base64::engine::general_purpose::STANDARD
        .encode(trade_event_bytes(2_000_000_000, 1_000_000, false));
    env.log_messages.insert(2, format!("Program data: {b64}"));

    let first = PumpfunDecoder.parse(&env);
    let second = PumpfunDecoder.parse(&env);

    assert_eq!(first.len(), 2);
    assert_eq!(first[0].id, second[0].id);
    assert_eq!(first[1].id, second[1].id);
    assert_ne!(first[0].id, first[1].id);
    assert_eq!(first[0].data, second[0].data);
}

struct PanickingDecoder;

impl ProgramDecoder for PanickingDecoder {
    fn program(&self) -> ProgramId {
        ProgramId::RaydiumCpmm
    }

    fn parse(&self, _env: &TransactionEnvelope) -> Vec<Event> {
        panic!("decoder bug");
    }
}

#[test]
fn test_decoder_isolation() {
    let env = pumpfun_log_envelope(&trade_event_bytes(1_000_000_000, 5_000_000, true));

    let mut registry = DecoderRegistry::new();
    registry.register(Box::new(PanickingDecoder));
    registry.register(Box::new(PumpfunDecoder));

    // The panicking decoder contributes nothing; pumpfun's output is
    // unchanged.
    let events = registry.parse(&env);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "TradeEvent");
}

#[test]
fn test_aggregator_attribution() {
    let mut env = pumpfun_log_envelope(&trade_event_bytes(1, 1, true));
    env.account_keys.push(JUPITER.into());

    let events = PumpfunDecoder.parse(&env);
    assert_eq!(events[0].source.kind, SourceKind::Jupiter);
    assert_eq!(events[0].source.outer_program.as_deref(), Some(JUPITER));
}

#[test]
fn test_token_identity_enrichment() {
    let mut env = pumpfun_log_envelope(&trade_event_bytes(1, 1, true));
    env.post_token_balances = vec![
        TokenBalance {
            account_index: 1,
            mint: WSOL_MINT.into(),
            owner: None,
            amount: "1".into(),
            decimals: Some(9),
        },
        TokenBalance {
            account_index: 2,
            mint: key(40),
            owner: None,
            amount: "2".into(),
            decimals: Some(6),
        },
    ];

    let events = PumpfunDecoder.parse(&env);
    let data = &events[0].data;
    assert_eq!(data.get("token_mint").unwrap().as_str(), Some(key(40).as_str()));
    assert_eq!(data.get("quote_mint").unwrap().as_str(), Some(WSOL_MINT));
}

#[test]
fn test_dbc_initialize_pool_synthesis() {
    let init_disc = meteora_dbc::SCHEMA.instructions[0].discriminator;
    let mut data = init_disc.to_vec();
    for s in ["Moon Token", "MOON", "https://example.com/moon.json"] {
        data.extend_from_slice(&(s.len() as u32).to_le_bytes());
        data.extend_from_slice(s.as_bytes());
    }

    let env = TransactionEnvelope {
        signature: "DbcInitSig".into(),
        slot: 300,
        block_time: Some(1_700_000_200),
        is_success: true,
        account_keys: vec![
            "FeePayer111".into(),
            DBC.into(),
            key(50), // config
            key(51), // pool_authority
            key(52), // creator
            key(53), // base_mint
        ],
        instructions: vec![Instruction {
            program_index: 1,
            accounts: vec![2, 3, 4, 5],
            data,
        }],
        ..Default::default()
    };

    let events = MeteoraDbcDecoder.parse(&env);
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.name, "EvtInitializePool");
    assert_eq!(event.data.get("name").unwrap().as_str(), Some("Moon Token"));
    assert_eq!(event.data.get("symbol").unwrap().as_str(), Some("MOON"));
    assert_eq!(event.data.get("config").unwrap().as_str(), Some(key(50).as_str()));
    assert_eq!(event.data.get("creator").unwrap().as_str(), Some(key(52).as_str()));
    assert_eq!(event.data.get("token_standard").unwrap().as_str(), Some("spl"));
}

#[test]
fn test_dbc_migration_synthesis() {
    let migration_disc = meteora_dbc::SCHEMA.instructions[2].discriminator;

    let env = TransactionEnvelope {
        signature: "DbcMigrateSig".into(),
        slot: 301,
        block_time: Some(1_700_000_300),
        is_success: true,
        account_keys: vec!["FeePayer111".into(), DBC.into(), key(60), key(61)],
        instructions: vec![Instruction {
            program_index: 1,
            accounts: vec![2, 3],
            data: migration_disc.to_vec(),
        }],
        ..Default::default()
    };

    let events = MeteoraDbcDecoder.parse(&env);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "EvtMigrationDammV2");
    assert_eq!(
        events[0].data.get("virtual_pool").unwrap().as_str(),
        Some(key(60).as_str())
    );
}

#[test]
fn test_dbc_synthesis_skipped_when_event_decoded() {
    // A swap event plus an init instruction: only the decoded event surfaces.
    let swap_disc = meteora_dbc::SCHEMA.events[0].discriminator;
    let swap_bytes = PayloadWriter::with_discriminator(swap_disc)
        .pubkey(&key(70)) // pool
        .pubkey(&key(71)) // config
        .u8(0) // trade_direction
        .bool(false) // has_referral
        .u64(1_000) // params.amount_in
        .u64(1) // params.minimum_amount_out
        .u64(1_000) // swap_result.actual_input_amount
        .u64(900) // swap_result.output_amount
        .u128(1) // swap_result.next_sqrt_price
        .u64(10) // swap_result.trading_fee
        .u64(1) // swap_result.protocol_fee
        .u64(0) // swap_result.referral_fee
        .u64(1_000) // amount_in
        .u64(1_700_000_000) // current_timestamp
        .bytes();

    let mut wrapped = EVENT_CPI_WRAPPER.to_vec();
    wrapped.extend_from_slice(&swap_bytes);

    let init_disc = meteora_dbc::SCHEMA.instructions[0].discriminator;
    let env = TransactionEnvelope {
        signature: "DbcSwapSig".into(),
        slot: 302,
        is_success: true,
        account_keys: vec!["FeePayer111".into(), DBC.into()],
        instructions: vec![Instruction {
            program_index: 1,
            accounts: vec![],
            data: init_disc.to_vec(),
        }],
        inner_instructions: vec![InnerInstructions {
            outer_index: 0,
            instructions: vec![Instruction {
                program_index: 1,
                accounts: vec![],
                data: wrapped,
            }],
        }],
        ..Default::default()
    };

    let events = MeteoraDbcDecoder.parse(&env);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "EvtSwap");
}
