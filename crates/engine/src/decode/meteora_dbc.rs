//! Meteora dynamic bonding-curve decoder.
//!
//! Events arrive as CPI self-invocations behind the event-CPI wrapper
//! discriminator. Pool initialization and migration are additionally inferred
//! from instruction discriminators: when such an instruction is present but
//! no event decoded, a single event is synthesized from the instruction's
//! accounts and (for initialization) its UTF-8 metadata payload.

use schema::{
    ByteReader, DataMap, Event, EventDef, FieldDef, FieldTy, InstructionDef, ProgramId,
    ProgramSchema, TransactionEnvelope, Value,
};

use super::cpi::decode_cpi_events;
use super::enrich::{apply_role_accounts, flatten_nested, infer_token_identity};
use super::{EventFactory, ProgramDecoder};

const NAME_CAP: usize = 200;
const SYMBOL_CAP: usize = 50;
const URI_CAP: usize = 500;

const SWAP_PARAMS: &[FieldDef] = &[
    FieldDef { name: "amount_in", ty: FieldTy::U64 },
    FieldDef { name: "minimum_amount_out", ty: FieldTy::U64 },
];

const SWAP_RESULT: &[FieldDef] = &[
    FieldDef { name: "actual_input_amount", ty: FieldTy::U64 },
    FieldDef { name: "output_amount", ty: FieldTy::U64 },
    FieldDef { name: "next_sqrt_price", ty: FieldTy::U128 },
    FieldDef { name: "trading_fee", ty: FieldTy::U64 },
    FieldDef { name: "protocol_fee", ty: FieldTy::U64 },
    FieldDef { name: "referral_fee", ty: FieldTy::U64 },
];

const SWAP_FIELDS: &[FieldDef] = &[
    FieldDef { name: "pool", ty: FieldTy::Pubkey },
    FieldDef { name: "config", ty: FieldTy::Pubkey },
    FieldDef { name: "trade_direction", ty: FieldTy::U8 },
    FieldDef { name: "has_referral", ty: FieldTy::Bool },
    FieldDef { name: "params", ty: FieldTy::Struct(SWAP_PARAMS) },
    FieldDef { name: "swap_result", ty: FieldTy::Struct(SWAP_RESULT) },
    FieldDef { name: "amount_in", ty: FieldTy::U64 },
    FieldDef { name: "current_timestamp", ty: FieldTy::U64 },
];

const CURVE_COMPLETE_FIELDS: &[FieldDef] = &[
    FieldDef { name: "pool", ty: FieldTy::Pubkey },
    FieldDef { name: "config", ty: FieldTy::Pubkey },
    FieldDef { name: "base_mint", ty: FieldTy::Pubkey },
    FieldDef { name: "quote_reserve", ty: FieldTy::U64 },
];

const INIT_ROLES: &[&str] = &[
    "config",
    "pool_authority",
    "creator",
    "base_mint",
    "quote_mint",
    "pool",
    "base_vault",
    "quote_vault",
    "mint_metadata",
    "",
    "payer",
];

const MIGRATION_ROLES: &[&str] = &[
    "virtual_pool",
    "migration_metadata",
    "config",
    "pool_authority",
    "pool",
    "first_position_nft_mint",
    "",
    "damm_pool_authority",
    "amm_program",
    "base_mint",
    "quote_mint",
    "base_vault",
    "quote_vault",
];

const IX_INITIALIZE_SPL: [u8; 8] = [140, 85, 215, 176, 102, 54, 104, 79];
const IX_INITIALIZE_TOKEN2022: [u8; 8] = [169, 118, 51, 78, 145, 110, 220, 13];
const IX_MIGRATION_DAMM_V2: [u8; 8] = [63, 121, 33, 88, 105, 217, 142, 70];

pub const SCHEMA: ProgramSchema = ProgramSchema {
    address: "dbcij3LWUppWqq96dh6gJWwBifmcGfLSB5D4DuSMaqN",
    events: &[
        EventDef {
            name: "EvtSwap",
            discriminator: [27, 60, 21, 213, 138, 170, 187, 147],
            fields: SWAP_FIELDS,
        },
        EventDef {
            name: "EvtCurveComplete",
            discriminator: [208, 36, 65, 177, 28, 199, 85, 53],
            fields: CURVE_COMPLETE_FIELDS,
        },
    ],
    instructions: &[
        InstructionDef {
            name: "initialize_virtual_pool_with_spl_token",
            discriminator: IX_INITIALIZE_SPL,
            accounts: INIT_ROLES,
        },
        InstructionDef {
            name: "initialize_virtual_pool_with_token2022",
            discriminator: IX_INITIALIZE_TOKEN2022,
            accounts: INIT_ROLES,
        },
        InstructionDef {
            name: "migration_damm_v2",
            discriminator: IX_MIGRATION_DAMM_V2,
            accounts: MIGRATION_ROLES,
        },
        InstructionDef {
            name: "swap",
            discriminator: [248, 198, 158, 145, 225, 117, 135, 200],
            accounts: &[
                "pool_authority",
                "config",
                "pool",
                "input_token_account",
                "output_token_account",
                "base_vault",
                "quote_vault",
                "base_mint",
                "quote_mint",
                "payer",
            ],
        },
    ],
};

fn roles_for(name: &str) -> &'static [&'static str] {
    match name {
        "EvtSwap" => &[
            "pool_authority",
            "config",
            "pool",
            "input_token_account",
            "output_token_account",
            "base_vault",
            "quote_vault",
            "base_mint",
            "quote_mint",
            "payer",
        ],
        _ => &[],
    }
}

/// Parse the length-prefixed `name`/`symbol`/`uri` triple from an
/// initialize-pool payload. Abandons silently on bad lengths or invalid
/// UTF-8, returning whatever had already parsed cleanly as absent.
fn parse_pool_metadata(payload: &[u8]) -> Option<(String, String, String)> {
    let mut reader = ByteReader::new(payload);
    let name = reader.string(NAME_CAP).ok()?;
    let symbol = reader.string(SYMBOL_CAP).ok()?;
    let uri = reader.string(URI_CAP).ok()?;
    Some((name, symbol, uri))
}

pub struct MeteoraDbcDecoder;

impl ProgramDecoder for MeteoraDbcDecoder {
    fn program(&self) -> ProgramId {
        ProgramId::MeteoraDbc
    }

    fn parse(&self, env: &TransactionEnvelope) -> Vec<Event> {
        if !env.involves(self.address()) {
            return Vec::new();
        }

        let mut factory = EventFactory::new(env, self.program());
        let mut events = Vec::new();

        for (name, mut data) in decode_cpi_events(env, &SCHEMA, true) {
            flatten_nested(&mut data);
            infer_token_identity(env, &mut data);
            if let Some(ix) = env.primary_instruction(self.address()) {
                apply_role_accounts(env, ix, roles_for(name), &mut data);
            }
            events.push(factory.build(name, data));
        }

        if events.is_empty() {
            if let Some(event) = self.synthesize_from_instructions(env, &mut factory) {
                events.push(event);
            }
        }

        events
    }
}

impl MeteoraDbcDecoder {
    /// Instruction-type detection: pool initialization (standard and
    /// token-2022 variants) and migration are observable from instruction
    /// discriminators even when no event was emitted.
    fn synthesize_from_instructions(
        &self,
        env: &TransactionEnvelope,
        factory: &mut EventFactory<'_>,
    ) -> Option<Event> {
        for ix in env.instructions_for(self.address()) {
            if ix.data.len() < 8 {
                continue;
            }
            let disc = ix.data[..8].to_vec();

            if disc == IX_INITIALIZE_SPL || disc == IX_INITIALIZE_TOKEN2022 {
                let mut data = DataMap::new();
                apply_role_accounts(env, ix, INIT_ROLES, &mut data);
                data.insert(
                    "token_standard".to_string(),
                    Value::Str(
                        if disc == IX_INITIALIZE_SPL { "spl" } else { "token2022" }.to_string(),
                    ),
                );
                if let Some((name, symbol, uri)) = parse_pool_metadata(&ix.data[8..]) {
                    data.insert("name".to_string(), Value::Str(name));
                    data.insert("symbol".to_string(), Value::Str(symbol));
                    data.insert("uri".to_string(), Value::Str(uri));
                }
                infer_token_identity(env, &mut data);
                return Some(factory.build("EvtInitializePool", data));
            }

            if disc == IX_MIGRATION_DAMM_V2 {
                let mut data = DataMap::new();
                apply_role_accounts(env, ix, MIGRATION_ROLES, &mut data);
                infer_token_identity(env, &mut data);
                return Some(factory.build("EvtMigrationDammV2", data));
            }
        }
        None
    }
}
