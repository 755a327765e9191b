//! Venue attribution table.
//!
//! An ordered, injected list of `program id -> venue name` rules.
//! Matching is exact; the first instruction whose program id appears
//! in the table decides the venue.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::Venue;

/// Jupiter aggregator v4 program.
pub const JUPITER_PROGRAM_ID: &str = "JUP4Fb2cqiRUcaTHdrPC8h2gNsA2ETXiPDD33WcGuJB";
/// Raydium AMM v4 program.
pub const RAYDIUM_PROGRAM_ID: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
/// Orca token swap v1 program.
pub const ORCA_PROGRAM_ID: &str = "DjVE6JNiYqPL2QXyCUUh8rNjHrbz9hXHNYt99MQ59qw1";

/// A single attribution rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueRule {
    /// Human-readable venue name.
    pub name: String,
    /// Exact program id that identifies the venue.
    pub program_id: String,
}

impl VenueRule {
    pub fn new(name: impl Into<String>, program_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program_id: program_id.into(),
        }
    }
}

/// Lookup from program id to venue.
#[derive(Debug, Clone, Default)]
pub struct VenueTable {
    rules: Vec<VenueRule>,
    by_program: HashMap<String, usize>,
}

impl VenueTable {
    /// Build a table. When two rules share a program id the earlier wins.
    pub fn new(rules: impl IntoIterator<Item = VenueRule>) -> Self {
        let mut table = Self::default();
        for rule in rules {
            if table.by_program.contains_key(&rule.program_id) {
                continue;
            }
            table
                .by_program
                .insert(rule.program_id.clone(), table.rules.len());
            table.rules.push(rule);
        }
        table
    }

    /// The well-known Solana DEX programs.
    pub fn default_venues() -> Self {
        Self::new(default_rules())
    }

    /// Venue for a single program id, if known.
    pub fn lookup(&self, program_id: &str) -> Option<&str> {
        self.by_program
            .get(program_id)
            .map(|&i| self.rules[i].name.as_str())
    }

    /// Attribute a transaction from its ordered instruction program ids.
    pub fn attribute<'a>(&self, programs: impl IntoIterator<Item = &'a str>) -> Venue {
        programs
            .into_iter()
            .find_map(|p| self.lookup(p))
            .map_or(Venue::Unknown, |name| Venue::Known(name.to_string()))
    }

    pub fn rules(&self) -> &[VenueRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Default rule list used when the config names no venues.
pub fn default_rules() -> Vec<VenueRule> {
    vec![
        VenueRule::new("Jupiter", JUPITER_PROGRAM_ID),
        VenueRule::new("Raydium", RAYDIUM_PROGRAM_ID),
        VenueRule::new("Orca", ORCA_PROGRAM_ID),
    ]
}
