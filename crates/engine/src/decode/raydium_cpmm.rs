//! Raydium CPMM decoder (post-migration pools, CPI-emitted events).

use schema::{
    Event, EventDef, FieldDef, FieldTy, InstructionDef, ProgramId, ProgramSchema,
    TransactionEnvelope,
};

use super::cpi::decode_cpi_events;
use super::enrich::{apply_role_accounts, infer_token_identity};
use super::{EventFactory, ProgramDecoder};

const SWAP_FIELDS: &[FieldDef] = &[
    FieldDef { name: "pool_id", ty: FieldTy::Pubkey },
    FieldDef { name: "input_vault_before", ty: FieldTy::U64 },
    FieldDef { name: "output_vault_before", ty: FieldTy::U64 },
    FieldDef { name: "input_amount", ty: FieldTy::U64 },
    FieldDef { name: "output_amount", ty: FieldTy::U64 },
    FieldDef { name: "input_transfer_fee", ty: FieldTy::U64 },
    FieldDef { name: "output_transfer_fee", ty: FieldTy::U64 },
    FieldDef { name: "base_input", ty: FieldTy::Bool },
    FieldDef { name: "input_mint", ty: FieldTy::Pubkey },
    FieldDef { name: "output_mint", ty: FieldTy::Pubkey },
];

const LP_CHANGE_FIELDS: &[FieldDef] = &[
    FieldDef { name: "pool_id", ty: FieldTy::Pubkey },
    FieldDef { name: "lp_amount_before", ty: FieldTy::U64 },
    FieldDef { name: "token_0_vault_before", ty: FieldTy::U64 },
    FieldDef { name: "token_1_vault_before", ty: FieldTy::U64 },
    FieldDef { name: "token_0_amount", ty: FieldTy::U64 },
    FieldDef { name: "token_1_amount", ty: FieldTy::U64 },
    FieldDef { name: "change_type", ty: FieldTy::U8 },
];

const SWAP_ROLES: &[&str] = &[
    "payer",
    "authority",
    "amm_config",
    "pool_state",
    "input_token_account",
    "output_token_account",
    "input_vault",
    "output_vault",
    "",
    "",
    "input_mint",
    "output_mint",
    "observation_state",
];

pub const SCHEMA: ProgramSchema = ProgramSchema {
    address: "CPMMoo8L3F4NbTegBCKVNunggL7H1ZpdTHKxQB5qKP1C",
    events: &[
        EventDef {
            name: "SwapEvent",
            discriminator: [64, 198, 205, 232, 38, 8, 113, 226],
            fields: SWAP_FIELDS,
        },
        EventDef {
            name: "LpChangeEvent",
            discriminator: [121, 163, 205, 201, 57, 218, 117, 60],
            fields: LP_CHANGE_FIELDS,
        },
    ],
    instructions: &[
        InstructionDef {
            name: "swap_base_input",
            discriminator: [143, 190, 90, 218, 196, 30, 51, 222],
            accounts: SWAP_ROLES,
        },
        InstructionDef {
            name: "swap_base_output",
            discriminator: [55, 217, 98, 86, 163, 74, 180, 173],
            accounts: SWAP_ROLES,
        },
    ],
};

fn roles_for(name: &str) -> &'static [&'static str] {
    match name {
        "SwapEvent" => SWAP_ROLES,
        _ => &[],
    }
}

pub struct RaydiumCpmmDecoder;

impl ProgramDecoder for RaydiumCpmmDecoder {
    fn program(&self) -> ProgramId {
        ProgramId::RaydiumCpmm
    }

    fn parse(&self, env: &TransactionEnvelope) -> Vec<Event> {
        if !env.involves(self.address()) {
            return Vec::new();
        }

        let mut factory = EventFactory::new(env, self.program());
        let mut events = Vec::new();

        for (name, mut data) in decode_cpi_events(env, &SCHEMA, false) {
            infer_token_identity(env, &mut data);
            if let Some(ix) = env.primary_instruction(self.address()) {
                apply_role_accounts(env, ix, roles_for(name), &mut data);
            }
            events.push(factory.build(name, data));
        }

        events
    }
}
