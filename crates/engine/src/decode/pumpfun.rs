//! Pump.fun bonding-curve decoder.
//!
//! Events arrive as base64 `"Program data:"` log lines. Trade events carry
//! the virtual reserve state used downstream for price and curve progress.

use schema::{
    Event, EventDef, FieldDef, FieldTy, InstructionDef, ProgramId, ProgramSchema,
    TransactionEnvelope,
};

use super::enrich::{apply_role_accounts, infer_token_identity};
use super::logs::decode_log_events;
use super::{EventFactory, ProgramDecoder};

const TRADE_FIELDS: &[FieldDef] = &[
    FieldDef { name: "mint", ty: FieldTy::Pubkey },
    FieldDef { name: "sol_amount", ty: FieldTy::U64 },
    FieldDef { name: "token_amount", ty: FieldTy::U64 },
    FieldDef { name: "is_buy", ty: FieldTy::Bool },
    FieldDef { name: "user", ty: FieldTy::Pubkey },
    FieldDef { name: "timestamp", ty: FieldTy::I64 },
    FieldDef { name: "virtual_sol_reserves", ty: FieldTy::U64 },
    FieldDef { name: "virtual_token_reserves", ty: FieldTy::U64 },
    FieldDef { name: "real_sol_reserves", ty: FieldTy::U64 },
    FieldDef { name: "real_token_reserves", ty: FieldTy::U64 },
];

const CREATE_FIELDS: &[FieldDef] = &[
    FieldDef { name: "name", ty: FieldTy::Str },
    FieldDef { name: "symbol", ty: FieldTy::Str },
    FieldDef { name: "uri", ty: FieldTy::Str },
    FieldDef { name: "mint", ty: FieldTy::Pubkey },
    FieldDef { name: "bonding_curve", ty: FieldTy::Pubkey },
    FieldDef { name: "user", ty: FieldTy::Pubkey },
];

const COMPLETE_FIELDS: &[FieldDef] = &[
    FieldDef { name: "user", ty: FieldTy::Pubkey },
    FieldDef { name: "mint", ty: FieldTy::Pubkey },
    FieldDef { name: "bonding_curve", ty: FieldTy::Pubkey },
    FieldDef { name: "timestamp", ty: FieldTy::I64 },
];

pub const SCHEMA: ProgramSchema = ProgramSchema {
    address: "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P",
    events: &[
        EventDef {
            name: "TradeEvent",
            discriminator: [189, 219, 127, 211, 78, 230, 97, 238],
            fields: TRADE_FIELDS,
        },
        EventDef {
            name: "CreateEvent",
            discriminator: [27, 114, 169, 77, 222, 235, 99, 118],
            fields: CREATE_FIELDS,
        },
        EventDef {
            name: "CompleteEvent",
            discriminator: [95, 114, 97, 156, 212, 46, 152, 8],
            fields: COMPLETE_FIELDS,
        },
    ],
    instructions: &[
        InstructionDef {
            name: "buy",
            discriminator: [102, 6, 61, 18, 1, 218, 235, 234],
            accounts: &[
                "global",
                "fee_recipient",
                "mint",
                "bonding_curve",
                "associated_bonding_curve",
                "associated_user",
                "user",
            ],
        },
        InstructionDef {
            name: "sell",
            discriminator: [51, 230, 133, 164, 1, 127, 131, 173],
            accounts: &[
                "global",
                "fee_recipient",
                "mint",
                "bonding_curve",
                "associated_bonding_curve",
                "associated_user",
                "user",
            ],
        },
        InstructionDef {
            name: "create",
            discriminator: [24, 30, 200, 40, 5, 28, 7, 119],
            accounts: &[
                "mint",
                "mint_authority",
                "bonding_curve",
                "associated_bonding_curve",
                "global",
                "",
                "metadata",
                "user",
            ],
        },
    ],
};

fn roles_for(name: &str) -> &'static [&'static str] {
    match name {
        "TradeEvent" => &[
            "global",
            "fee_recipient",
            "mint",
            "bonding_curve",
            "associated_bonding_curve",
            "associated_user",
            "user",
        ],
        "CreateEvent" => &[
            "mint",
            "mint_authority",
            "bonding_curve",
            "associated_bonding_curve",
            "global",
            "",
            "metadata",
            "user",
        ],
        _ => &[],
    }
}

pub struct PumpfunDecoder;

impl ProgramDecoder for PumpfunDecoder {
    fn program(&self) -> ProgramId {
        ProgramId::Pumpfun
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
