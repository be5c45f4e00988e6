//! Raydium Launchpad bonding-curve decoder (log-emitted events).
//!
//! Trades carry a `trade_direction` tag (0 = buy, 1 = sell) instead of the
//! boolean the other pre-migration program uses.

use schema::{
    Event, EventDef, FieldDef, FieldTy, InstructionDef, ProgramId, ProgramSchema,
    TransactionEnvelope,
};

use super::enrich::{apply_role_accounts, infer_token_identity};
use super::logs::decode_log_events;
use super::{EventFactory, ProgramDecoder};

const TRADE_FIELDS: &[FieldDef] = &[
    FieldDef { name: "pool_state", ty: FieldTy::Pubkey },
    FieldDef { name: "total_base_sell", ty: FieldTy::U64 },
    FieldDef { name: "virtual_base", ty: FieldTy::U64 },
    FieldDef { name: "virtual_quote", ty: FieldTy::U64 },
    FieldDef { name: "real_base_before", ty: FieldTy::U64 },
    FieldDef { name: "real_quote_before", ty: FieldTy::U64 },
    FieldDef { name: "real_base_after", ty: FieldTy::U64 },
    FieldDef { name: "real_quote_after", ty: FieldTy::U64 },
    FieldDef { name: "amount_in", ty: FieldTy::U64 },
    FieldDef { name: "amount_out", ty: FieldTy::U64 },
    FieldDef { name: "protocol_fee", ty: FieldTy::U64 },
    FieldDef { name: "platform_fee", ty: FieldTy::U64 },
    FieldDef { name: "share_fee", ty: FieldTy::U64 },
    FieldDef { name: "trade_direction", ty: FieldTy::U8 },
    FieldDef { name: "pool_status", ty: FieldTy::U8 },
];

const POOL_CREATE_FIELDS: &[FieldDef] = &[
    FieldDef { name: "pool_state", ty: FieldTy::Pubkey },
    FieldDef { name: "creator", ty: FieldTy::Pubkey },
    FieldDef { name: "config", ty: FieldTy::Pubkey },
    FieldDef { name: "base_mint", ty: FieldTy::Pubkey },
    FieldDef { name: "quote_mint", ty: FieldTy::Pubkey },
    FieldDef { name: "base_decimals", ty: FieldTy::U8 },
    FieldDef { name: "quote_decimals", ty: FieldTy::U8 },
    FieldDef { name: "supply", ty: FieldTy::U64 },
    FieldDef { name: "total_base_sell", ty: FieldTy::U64 },
];

pub const SCHEMA: ProgramSchema = ProgramSchema {
    address: "LanMV9sAd7wArD4vJFi2qDdfnVhFxYSUg6eADduJ3uj",
    events: &[
        EventDef {
            name: "TradeEvent",
            discriminator: [82, 109, 17, 44, 203, 96, 120, 77],
            fields: TRADE_FIELDS,
        },
        EventDef {
            name: "PoolCreateEvent",
            discriminator: [97, 9, 133, 77, 2, 88, 171, 62],
            fields: POOL_CREATE_FIELDS,
        },
    ],
    instructions: &[
        InstructionDef {
            name: "buy_exact_in",
            discriminator: [250, 234, 13, 123, 213, 156, 19, 236],
            accounts: &[
                "payer",
                "authority",
                "global_config",
                "platform_config",
                "pool_state",
                "user_base_token",
                "user_quote_token",
                "base_vault",
                "quote_vault",
                "base_mint",
                "quote_mint",
            ],
        },
        InstructionDef {
            name: "sell_exact_in",
            discriminator: [149, 39, 222, 155, 211, 124, 138, 183],
            accounts: &[
                "payer",
                "authority",
                "global_config",
                "platform_config",
                "pool_state",
                "user_base_token",
                "user_quote_token",
                "base_vault",
                "quote_vault",
                "base_mint",
                "quote_mint",
            ],
        },
        InstructionDef {
            name: "initialize",
            discriminator: [175, 175, 109, 31, 13, 152, 155, 237],
            accounts: &[
                "payer",
                "creator",
                "global_config",
                "platform_config",
                "authority",
                "pool_state",
                "base_mint",
                "quote_mint",
            ],
        },
    ],
};

fn roles_for(name: &str) -> &'static [&'static str] {
    match name {
        "TradeEvent" => &[
            "payer",
            "authority",
            "global_config",
            "platform_config",
            "pool_state",
            "user_base_token",
            "user_quote_token",
            "base_vault",
            "quote_vault",
            "base_mint",
            "quote_mint",
        ],
        "PoolCreateEvent" => &[
            "payer",
            "creator",
            "global_config",
            "platform_config",
            "authority",
            "pool_state",
            "base_mint",
            "quote_mint",
        ],
        _ => &[],
    }
}

pub struct RaydiumLaunchpadDecoder;

impl ProgramDecoder for RaydiumLaunchpadDecoder {
    fn program(&self) -> ProgramId {
        ProgramId::RaydiumLaunchpad
    }

    fn parse(&self, env: &TransactionEnvelope) -> Vec<Event> {
        if !env.involves(self.address()) {
            return Vec::new();
        }

        let mut factory = EventFactory::new(env, self.program());
        let mut events = Vec::new();

        for (name, mut data) in decode_log_events(env, &SCHEMA) {
            infer_token_identity(env, &mut data);
            if let Some(ix) = env.primary_instruction(self.address()) {
                apply_role_accounts(env, ix, roles_for(name), &mut data);
            }
            events.push(factory.build(name, data));
        }

        events
    }
}
