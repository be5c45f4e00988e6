//! Meteora DAMM v2 decoder (post-migration pools, CPI-emitted events).
//!
//! Swap payloads group the execution result under a nested `swap_result`
//! struct; both the nested form and the flattened first level are exposed.

use schema::{
    Event, EventDef, FieldDef, FieldTy, InstructionDef, ProgramId, ProgramSchema,
    TransactionEnvelope,
};

use super::cpi::decode_cpi_events;
use super::enrich::{apply_role_accounts, flatten_nested, infer_token_identity};
use super::{EventFactory, ProgramDecoder};

const SWAP_PARAMS: &[FieldDef] = &[
    FieldDef { name: "amount_in", ty: FieldTy::U64 },
    FieldDef { name: "minimum_amount_out", ty: FieldTy::U64 },
];

const SWAP_RESULT: &[FieldDef] = &[
    FieldDef { name: "input_amount", ty: FieldTy::U64 },
    FieldDef { name: "output_amount", ty: FieldTy::U64 },
    FieldDef { name: "next_sqrt_price", ty: FieldTy::U128 },
    FieldDef { name: "lp_fee", ty: FieldTy::U64 },
    FieldDef { name: "protocol_fee", ty: FieldTy::U64 },
    FieldDef { name: "partner_fee", ty: FieldTy::U64 },
    FieldDef { name: "referral_fee", ty: FieldTy::U64 },
];

const SWAP2_FIELDS: &[FieldDef] = &[
    FieldDef { name: "pool", ty: FieldTy::Pubkey },
    FieldDef { name: "trade_direction", ty: FieldTy::U8 },
    FieldDef { name: "collect_fee_mode", ty: FieldTy::U8 },
    FieldDef { name: "has_referral", ty: FieldTy::Bool },
    FieldDef { name: "params", ty: FieldTy::Struct(SWAP_PARAMS) },
    FieldDef { name: "swap_result", ty: FieldTy::Struct(SWAP_RESULT) },
    FieldDef { name: "actual_amount_in", ty: FieldTy::U64 },
    FieldDef { name: "current_timestamp", ty: FieldTy::U64 },
];

const INITIALIZE_POOL_FIELDS: &[FieldDef] = &[
    FieldDef { name: "pool", ty: FieldTy::Pubkey },
    FieldDef { name: "token_a_mint", ty: FieldTy::Pubkey },
    FieldDef { name: "token_b_mint", ty: FieldTy::Pubkey },
    FieldDef { name: "creator", ty: FieldTy::Pubkey },
    FieldDef { name: "payer", ty: FieldTy::Pubkey },
    FieldDef { name: "liquidity", ty: FieldTy::U128 },
    FieldDef { name: "activation_point", ty: FieldTy::U64 },
];

const SWAP_ROLES: &[&str] = &[
    "pool_authority",
    "pool",
    "input_token_account",
    "output_token_account",
    "token_a_vault",
    "token_b_vault",
    "token_a_mint",
    "token_b_mint",
    "payer",
];

pub const SCHEMA: ProgramSchema = ProgramSchema {
    address: "cpamdpZCGKUy5JxQXB4dcpGPiikHawvSWAd6mEn1sGG",
    events: &[
        EventDef {
            name: "EvtSwap2",
            discriminator: [175, 1, 132, 40, 111, 254, 96, 36],
            fields: SWAP2_FIELDS,
        },
        EventDef {
            name: "EvtInitializePool2",
            discriminator: [22, 88, 104, 61, 199, 143, 27, 84],
            fields: INITIALIZE_POOL_FIELDS,
        },
    ],
    instructions: &[InstructionDef {
        name: "swap",
        discriminator: [248, 198, 158, 145, 225, 117, 135, 200],
        accounts: SWAP_ROLES,
    }],
};

fn roles_for(name: &str) -> &'static [&'static str] {
    match name {
        "EvtSwap2" => SWAP_ROLES,
        _ => &[],
    }
}

pub struct MeteoraDammDecoder;

impl ProgramDecoder for MeteoraDammDecoder {
    fn program(&self) -> ProgramId {
        ProgramId::MeteoraDammV2
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
