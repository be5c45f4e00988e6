//! Fixed catalog of the supported AMM / bonding-curve programs.
//!
//! The catalog is process-lifetime constant: symbolic id, on-chain address
//! and migration category for each program, plus the orthogonal aggregator
//! catalog used for source attribution.

use serde::{Deserialize, Serialize};

/// Wrapped-SOL mint, the default quote mint.
pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

pub const SYSTEM_PROGRAM: &str = "11111111111111111111111111111111";
pub const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgramId {
    Pumpfun,
    RaydiumLaunchpad,
    MeteoraDbc,
    Pumpswap,
    MeteoraDammV2,
    RaydiumCpmm,
}

/// Pre-migration programs host bonding curves; post-migration programs host
/// the AMM pools tokens graduate into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    PreMigration,
    PostMigration,
}

#[derive(Debug, Clone, Copy)]
pub struct ProgramInfo {
    pub id: ProgramId,
    pub address: &'static str,
    pub category: Category,
}

pub const PROGRAMS: [ProgramInfo; 6] = [
    ProgramInfo {
        id: ProgramId::Pumpfun,
        address: "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P",
        category: Category::PreMigration,
    },
    ProgramInfo {
        id: ProgramId::RaydiumLaunchpad,
        address: "LanMV9sAd7wArD4vJFi2qDdfnVhFxYSUg6eADduJ3uj",
        category: Category::PreMigration,
    },
    ProgramInfo {
        id: ProgramId::MeteoraDbc,
        address: "dbcij3LWUppWqq96dh6gJWwBifmcGfLSB5D4DuSMaqN",
        category: Category::PreMigration,
    },
    ProgramInfo {
        id: ProgramId::Pumpswap,
        address: "pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA",
        category: Category::PostMigration,
    },
    ProgramInfo {
        id: ProgramId::MeteoraDammV2,
        address: "cpamdpZCGKUy5JxQXB4dcpGPiikHawvSWAd6mEn1sGG",
        category: Category::PostMigration,
    },
    ProgramInfo {
        id: ProgramId::RaydiumCpmm,
        address: "CPMMoo8L3F4NbTegBCKVNunggL7H1ZpdTHKxQB5qKP1C",
        category: Category::PostMigration,
    },
];

impl ProgramId {
    pub fn info(&self) -> &'static ProgramInfo {
        PROGRAMS
            .iter()
            .find(|p| p.id == *self)
            .expect("catalog covers every ProgramId")
    }

    pub fn address(&self) -> &'static str {
        self.info().address
    }

    pub fn category(&self) -> Category {
        self.info().category
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramId::Pumpfun => "pumpfun",
            ProgramId::RaydiumLaunchpad => "raydium-launchpad",
            ProgramId::MeteoraDbc => "meteora-dbc",
            ProgramId::Pumpswap => "pumpswap",
            ProgramId::MeteoraDammV2 => "meteora-damm-v2",
            ProgramId::RaydiumCpmm => "raydium-cpmm",
        }
    }
}

impl std::fmt::Display for ProgramId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn program_by_address(address: &str) -> Option<&'static ProgramInfo> {
    PROGRAMS.iter().find(|p| p.address == address)
}

/// Routing programs that invoke the AMMs on the user's behalf. Presence in
/// the account-key set attributes the event to that aggregator.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    pub address: &'static str,
    pub tag: &'static str,
}

pub const AGGREGATORS: [Aggregator; 2] = [
    Aggregator {
        address: "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4",
        tag: "jupiter",
    },
    Aggregator {
        address: "routeUGWgWzqBWFcrCfv8tritsqukccJPu3q5GPP3xS",
        tag: "raydium",
    },
];

pub fn aggregator_by_address(address: &str) -> Option<&'static Aggregator> {
    AGGREGATORS.iter().find(|a| a.address == address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_reverse_index() {
        for p in PROGRAMS.iter() {
            assert_eq!(program_by_address(p.address).unwrap().id, p.id);
            assert_eq!(p.id.address(), p.address);
        }
        assert!(program_by_address("nonexistent").is_none());
    }

    #[test]
    fn test_serde_ids_are_kebab_case() {
        let s = serde_json::to_string(&ProgramId::MeteoraDammV2).unwrap();
        assert_eq!(s, "\"meteora-damm-v2\"");
        let back: ProgramId = serde_json::from_str("\"pumpfun\"").unwrap();
        assert_eq!(back, ProgramId::Pumpfun);
    }

    #[test]
    fn test_aggregator_catalog() {
        assert_eq!(
            aggregator_by_address("JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4")
                .unwrap()
                .tag,
            "jupiter"
        );
        assert!(aggregator_by_address(WSOL_MINT).is_none());
    }
}
