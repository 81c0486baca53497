use near_sdk::borsh::{BorshDeserialize, BorshSerialize};
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::AccountId;

use crate::asset::Asset;

/// Per-symbol supply row, one per registered token.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[borsh(crate = "near_sdk::borsh")]
#[serde(crate = "near_sdk::serde")]
pub struct SupplyRecord {
    /// Currently circulating amount. Never negative, never above `max_supply`.
    pub supply: Asset,
    /// Ceiling on `supply`; carries the same symbol tag.
    pub max_supply: Asset,
    /// Account authorized to issue, burn and recover for this symbol.
    pub issuer: AccountId,
}

/// Per-(owner, symbol) balance row.
///
/// A row exists only while it holds a non-zero balance or was explicitly
/// opened; a debit that empties it removes it. `claimed` records whether the
/// owner (or a delegate) has taken over the row's storage cost from the
/// issuer; `ram_payer` is whoever was charged for the row at insert time.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[borsh(crate = "near_sdk::borsh")]
#[serde(crate = "near_sdk::serde")]
pub struct BalanceRecord {
    pub balance: Asset,
    pub claimed: bool,
    pub ram_payer: AccountId,
}
