//! Pump AMM decoder (post-migration pools, CPI-emitted events).

use schema::{
    Event, EventDef, FieldDef, FieldTy, InstructionDef, ProgramId, ProgramSchema,
    TransactionEnvelope,
};

use super::cpi::decode_cpi_events;
use super::enrich::{apply_role_accounts, flatten_nested, infer_token_identity};
use super::{EventFactory, ProgramDecoder};

const BUY_FIELDS: &[FieldDef] = &[
    FieldDef { name: "timestamp", ty: FieldTy::I64 },
    FieldDef { name: "base_amount_out", ty: FieldTy::U64 },
    FieldDef { name: "max_quote_amount_in", ty: FieldTy::U64 },
    FieldDef { name: "user_base_token_reserves", ty: FieldTy::U64 },
    FieldDef { name: "user_quote_token_reserves", ty: FieldTy::U64 },
    FieldDef { name: "pool_base_token_reserves", ty: FieldTy::U64 },
    FieldDef { name: "pool_quote_token_reserves", ty: FieldTy::U64 },
    FieldDef { name: "quote_amount_in", ty: FieldTy::U64 },
    FieldDef { name: "lp_fee_basis_points", ty: FieldTy::U64 },
    FieldDef { name: "lp_fee", ty: FieldTy::U64 },
    FieldDef { name: "protocol_fee_basis_points", ty: FieldTy::U64 },
    FieldDef { name: "protocol_fee", ty: FieldTy::U64 },
    FieldDef { name: "quote_amount_in_with_lp_fee", ty: FieldTy::U64 },
    FieldDef { name: "user_quote_amount_in", ty: FieldTy::U64 },
    FieldDef { name: "pool", ty: FieldTy::Pubkey },
    FieldDef { name: "user", ty: FieldTy::Pubkey },
    FieldDef { name: "user_base_token_account", ty: FieldTy::Pubkey },
    FieldDef { name: "user_quote_token_account", ty: FieldTy::Pubkey },
    FieldDef { name: "protocol_fee_recipient", ty: FieldTy::Pubkey },
    FieldDef { name: "protocol_fee_recipient_token_account", ty: FieldTy::Pubkey },
];

const SELL_FIELDS: &[FieldDef] = &[
    FieldDef { name: "timestamp", ty: FieldTy::I64 },
    FieldDef { name: "base_amount_in", ty: FieldTy::U64 },
    FieldDef { name: "min_quote_amount_out", ty: FieldTy::U64 },
    FieldDef { name: "user_base_token_reserves", ty: FieldTy::U64 },
    FieldDef { name: "user_quote_token_reserves", ty: FieldTy::U64 },
    FieldDef { name: "pool_base_token_reserves", ty: FieldTy::U64 },
    FieldDef { name: "pool_quote_token_reserves", ty: FieldTy::U64 },
    FieldDef { name: "quote_amount_out", ty: FieldTy::U64 },
    FieldDef { name: "lp_fee_basis_points", ty: FieldTy::U64 },
    FieldDef { name: "lp_fee", ty: FieldTy::U64 },
    FieldDef { name: "protocol_fee_basis_points", ty: FieldTy::U64 },
    FieldDef { name: "protocol_fee", ty: FieldTy::U64 },
    FieldDef { name: "quote_amount_out_without_lp_fee", ty: FieldTy::U64 },
    FieldDef { name: "user_quote_amount_out", ty: FieldTy::U64 },
    FieldDef { name: "pool", ty: FieldTy::Pubkey },
    FieldDef { name: "user", ty: FieldTy::Pubkey },
    FieldDef { name: "user_base_token_account", ty: FieldTy::Pubkey },
    FieldDef { name: "user_quote_token_account", ty: FieldTy::Pubkey },
    FieldDef { name: "protocol_fee_recipient", ty: FieldTy::Pubkey },
    FieldDef { name: "protocol_fee_recipient_token_account", ty: FieldTy::Pubkey },
];

const CREATE_POOL_FIELDS: &[FieldDef] = &[
    FieldDef { name: "timestamp", ty: FieldTy::I64 },
    FieldDef { name: "index", ty: FieldTy::U16 },
    FieldDef { name: "creator", ty: FieldTy::Pubkey },
    FieldDef { name: "base_mint", ty: FieldTy::Pubkey },
    FieldDef { name: "quote_mint", ty: FieldTy::Pubkey },
    FieldDef { name: "base_mint_decimals", ty: FieldTy::U8 },
    FieldDef { name: "quote_mint_decimals", ty: FieldTy::U8 },
    FieldDef { name: "base_amount_in", ty: FieldTy::U64 },
    FieldDef { name: "quote_amount_in", ty: FieldTy::U64 },
    FieldDef { name: "pool_base_amount", ty: FieldTy::U64 },
    FieldDef { name: "pool_quote_amount", ty: FieldTy::U64 },
    FieldDef { name: "minimum_liquidity", ty: FieldTy::U64 },
    FieldDef { name: "initial_liquidity", ty: FieldTy::U64 },
    FieldDef { name: "lp_token_amount_out", ty: FieldTy::U64 },
    FieldDef { name: "pool_bump", ty: FieldTy::U8 },
    FieldDef { name: "pool", ty: FieldTy::Pubkey },
    FieldDef { name: "lp_mint", ty: FieldTy::Pubkey },
    FieldDef { name: "user_base_token_account", ty: FieldTy::Pubkey },
    FieldDef { name: "user_quote_token_account", ty: FieldTy::Pubkey },
];

const TRADE_ROLES: &[&str] = &[
    "pool",
    "user",
    "global_config",
    "base_mint",
    "quote_mint",
    "user_base_token_account",
    "user_quote_token_account",
    "pool_base_token_account",
    "pool_quote_token_account",
    "protocol_fee_recipient",
    "protocol_fee_recipient_token_account",
];

pub const SCHEMA: ProgramSchema = ProgramSchema {
    address: "pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA",
    events: &[
        EventDef {
            name: "BuyEvent",
            discriminator: [103, 244, 82, 31, 44, 245, 119, 119],
            fields: BUY_FIELDS,
        },
        EventDef {
            name: "SellEvent",
            discriminator: [62, 47, 55, 10, 165, 3, 220, 42],
            fields: SELL_FIELDS,
        },
        EventDef {
            name: "CreatePoolEvent",
            discriminator: [177, 49, 12, 210, 160, 118, 167, 116],
            fields: CREATE_POOL_FIELDS,
        },
    ],
    instructions: &[
        InstructionDef {
            name: "buy",
            discriminator: [102, 6, 61, 18, 1, 218, 235, 234],
            accounts: TRADE_ROLES,
        },
        InstructionDef {
            name: "sell",
            discriminator: [51, 230, 133, 164, 1, 127, 131, 173],
            accounts: TRADE_ROLES,
        },
        InstructionDef {
            name: "create_pool",
            discriminator: [233, 146, 209, 142, 207, 104, 64, 188],
            accounts: &[
                "pool",
                "global_config",
                "creator",
                "base_mint",
                "quote_mint",
                "lp_mint",
                "user_base_token_account",
                "user_quote_token_account",
            ],
        },
    ],
};

fn roles_for(name: &str) -> &'static [&'static str] {
    match name {
        "BuyEvent" | "SellEvent" => TRADE_ROLES,
        "CreatePoolEvent" => &[
            "pool",
            "global_config",
            "creator",
            "base_mint",
            "quote_mint",
            "lp_mint",
            "user_base_token_account",
            "user_quote_token_account",
        ],
        _ => &[],
    }
}

pub struct PumpswapDecoder;

impl ProgramDecoder for PumpswapDecoder {
    fn program(&self) -> ProgramId {
        ProgramId::Pumpswap
    }

    fn parse(&self, env: &TransactionEnvelope) -> Vec<Event> {
        if !env.involves(self.address()) {
            return Vec::new();
        }

        let mut factory = EventFactory::new(env, self.program());
        let mut events = Vec::new();

        for (name, mut data) in decode_cpi_events(env, &SCHEMA, false) {
            flatten_nested(&mut data);
            infer_token_identity(env, &mut data);
            if let Some(ix) = env.primary_instruction(self.address()) {
                apply_role_accounts(env, ix, roles_for(name), &mut data);
            }
            events.push(factory.build(name, data));
        }

        events
    }
}
