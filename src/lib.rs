mod asset;
mod receiver;
mod record;

pub use crate::asset::{Asset, ParseError, Symbol, SymbolCode};
pub use crate::record::{BalanceRecord, SupplyRecord};

use crate::receiver::ext_transfer_recipient;
use near_sdk::borsh::{BorshDeserialize, BorshSerialize};
use near_sdk::store::LookupMap;
use near_sdk::{
    env, log, near_bindgen, require, AccountId, BorshStorageKey, Gas, PanicOnDefault,
};

const MAX_MEMO_BYTES: usize = 256;
const GAS_FOR_ON_TRANSFER: Gas = Gas::from_tgas(5);

#[derive(BorshStorageKey, BorshSerialize)]
#[borsh(crate = "near_sdk::borsh")]
pub enum KeyPrefix {
    Registry,
    Balances,
}

/// Account-based fungible-token ledger.
///
/// Tracks a supply row per symbol and a balance row per (owner, symbol).
/// Balance rows start out with their storage cost carried by whoever inserted
/// them - the issuer when tokens are first pushed to a holder - and the
/// `claim`/`recover` pair moves that cost onto the owner, or sweeps an
/// unclaimed balance back to the issuer. See the individual methods for the
/// exact authorization each operation demands.
#[near_bindgen]
#[derive(BorshSerialize, BorshDeserialize, PanicOnDefault)]
#[borsh(crate = "near_sdk::borsh")]
pub struct TokenLedger {
    registry: LookupMap<SymbolCode, SupplyRecord>,
    balances: LookupMap<(AccountId, SymbolCode), BalanceRecord>,
}

#[near_bindgen]
impl TokenLedger {
    #[init]
    pub fn new() -> Self {
        Self {
            registry: LookupMap::new(KeyPrefix::Registry),
            balances: LookupMap::new(KeyPrefix::Balances),
        }
    }

    /// Registers a new symbol. Only the contract account itself may create
    /// tokens; the designated `issuer` then controls issue/burn/recover.
    ///
    /// # Arguments
    /// * `issuer` - account authorized to manage the new token.
    /// * `max_supply` - supply ceiling; its symbol tag (code and precision)
    ///   is fixed for the token's lifetime.
    pub fn create(&mut self, issuer: AccountId, max_supply: Asset) {
        require!(
            env::predecessor_account_id() == env::current_account_id(),
            "only the contract account can create tokens"
        );
        require!(max_supply.is_valid(), "invalid supply");
        require!(max_supply.amount() > 0, "max-supply must be positive");
        require!(
            !self.registry.contains_key(max_supply.symbol().code()),
            "token with symbol already exists"
        );

        let symbol = max_supply.symbol().clone();
        self.registry.insert(
            symbol.code().clone(),
            SupplyRecord { supply: Asset::zero(symbol), max_supply, issuer },
        );
    }

    /// Replaces a token's supply ceiling and issuer. Only the contract
    /// account itself may update, and the new ceiling cannot undercut the
    /// circulating supply.
    ///
    /// # Arguments
    /// * `issuer` - new managing account.
    /// * `max_supply` - new ceiling; must carry the token's original tag.
    pub fn update(&mut self, issuer: AccountId, max_supply: Asset) {
        require!(
            env::predecessor_account_id() == env::current_account_id(),
            "only the contract account can update tokens"
        );
        require!(max_supply.is_valid(), "invalid supply");
        require!(max_supply.amount() > 0, "max-supply must be positive");

        let stats = self
            .registry
            .get_mut(max_supply.symbol().code())
            .expect("token with symbol does not exist, create token before update");
        require!(
            stats.supply.amount() <= max_supply.amount(),
            "max-supply cannot be less than available supply"
        );
        require!(
            max_supply.symbol() == stats.supply.symbol(),
            "symbol precision mismatch"
        );

        stats.max_supply = max_supply;
        stats.issuer = issuer;
    }

    /// Mints `quantity` onto the issuer's own balance. Tokens always land on
    /// the issuer first and move onward via `transfer`.
    ///
    /// # Arguments
    /// * `to` - must equal the token's issuer.
    /// * `quantity` - amount to mint; bounded by the remaining headroom under
    ///   `max_supply`.
    /// * `memo` - opaque metadata, at most 256 bytes.
    pub fn issue(&mut self, to: AccountId, quantity: Asset, memo: Option<String>) {
        require!(quantity.is_valid(), "invalid quantity");
        check_memo(&memo);

        let code = quantity.symbol().code().clone();
        let stats = self
            .registry
            .get(&code)
            .expect("token with symbol does not exist, create token before issue");
        require!(to == stats.issuer, "tokens can only be issued to issuer account");
        require!(
            env::predecessor_account_id() == stats.issuer,
            "only the issuer can issue"
        );
        require!(quantity.amount() > 0, "must issue positive quantity");
        require!(
            quantity.symbol() == stats.supply.symbol(),
            "symbol precision mismatch"
        );
        require!(
            quantity.amount() <= stats.max_supply.amount() - stats.supply.amount(),
            "quantity exceeds available supply"
        );
        let issuer = stats.issuer.clone();

        let stats = self
            .registry
            .get_mut(&code)
            .expect("token with symbol does not exist");
        stats.supply = stats.supply.checked_add(&quantity).expect("supply overflow");
        // the issuer always carries the storage cost of its own row
        self.add_balance(&issuer, quantity.clone(), &issuer, true);
        log!("issue {} to {}", quantity, issuer);
    }

    /// Destroys `quantity` out of `from`'s balance and shrinks the supply.
    /// Only the issuer may burn; the whole operation fails if `from` holds
    /// less than `quantity`.
    pub fn burn(&mut self, from: AccountId, quantity: Asset) {
        require!(quantity.is_valid(), "invalid quantity");

        let code = quantity.symbol().code().clone();
        let stats = self
            .registry
            .get(&code)
            .expect("token with symbol does not exist, create token before burn");
        require!(
            env::predecessor_account_id() == stats.issuer,
            "only the issuer can burn"
        );
        require!(quantity.amount() > 0, "must burn positive quantity");
        require!(
            quantity.symbol() == stats.supply.symbol(),
            "symbol precision mismatch"
        );

        // debit first: it is the only step that can still fail
        self.sub_balance(&from, &quantity);
        let stats = self
            .registry
            .get_mut(&code)
            .expect("token with symbol does not exist");
        stats.supply = stats.supply.checked_sub(&quantity).expect("supply underflow");
        log!("burn {} from {}", quantity, from);
    }

    /// Moves `quantity` from `from` to `to`, notifying both parties.
    ///
    /// Transferring also settles storage ownership: the sender is forced to
    /// claim its own remaining row, and when the sender is not the issuer it
    /// additionally pays for and claims the recipient's row. A transfer out
    /// of the issuer leaves the recipient's row unclaimed (issuer
    /// subsidized).
    ///
    /// # Arguments
    /// * `from` - the debited account; must be the caller.
    /// * `to` - the credited account.
    /// * `quantity` - amount to move.
    /// * `memo` - opaque metadata, at most 256 bytes.
    pub fn transfer(&mut self, from: AccountId, to: AccountId, quantity: Asset, memo: Option<String>) {
        require!(from != to, "cannot transfer to self");
        require!(
            env::predecessor_account_id() == from,
            "only the sender can transfer"
        );
        require!(quantity.is_valid(), "invalid quantity");
        check_memo(&memo);

        let code = quantity.symbol().code().clone();
        let stats = self
            .registry
            .get(&code)
            .expect("token with symbol does not exist");
        require!(quantity.amount() > 0, "must transfer positive quantity");
        require!(
            quantity.symbol() == stats.supply.symbol(),
            "symbol precision mismatch"
        );
        let issuer = stats.issuer.clone();

        // all failure modes are ruled out above and here, before the first
        // write: the claim steps below must not outlive a failed debit
        self.assert_can_debit(&from, &quantity);

        for recipient in [&from, &to] {
            ext_transfer_recipient::ext(recipient.clone())
                .with_static_gas(GAS_FOR_ON_TRANSFER)
                .on_transfer(from.clone(), to.clone(), quantity.clone(), memo.clone());
        }

        self.do_claim(&from, quantity.symbol(), &from);
        self.sub_balance(&from, &quantity);
        self.add_balance(&to, quantity.clone(), &from, from != issuer);
        // a row freshly pushed out by the issuer stays issuer-subsidized;
        // any other sender pays for the recipient's row as well
        if from != issuer {
            self.do_claim(&to, quantity.symbol(), &from);
        }
        log!("transfer {} from {} to {}", quantity, from, to);
    }

    /// Takes over the storage cost of the caller's own balance row. No-op if
    /// the row is already claimed.
    pub fn claim(&mut self, owner: AccountId, symbol: Symbol) {
        self.do_claim(&owner, &symbol, &owner);
    }

    /// Issuer-only sweep of an abandoned balance: if `owner`'s row for
    /// `symbol` exists and is still unclaimed, its full balance moves back to
    /// the issuer and the row is removed. Absent or already-claimed rows are
    /// left untouched, so a sweep over a stale snapshot can be re-run safely.
    pub fn recover(&mut self, owner: AccountId, symbol: Symbol) {
        let code = symbol.code().clone();
        let stats = self
            .registry
            .get(&code)
            .expect("token with symbol does not exist, create token before recover");
        require!(
            env::predecessor_account_id() == stats.issuer,
            "only the issuer can recover"
        );
        let issuer = stats.issuer.clone();

        let unclaimed = self
            .balances
            .get(&(owner.clone(), code))
            .and_then(|row| (!row.claimed).then(|| row.balance.clone()));
        if let Some(value) = unclaimed {
            self.sub_balance(&owner, &value);
            self.add_balance(&issuer, value.clone(), &issuer, true);
            log!("recover {} from {}", value, owner);
        }
    }

    /// Pre-registers a zero-balance row for `owner`, claimed and paid for by
    /// the caller, so the account can receive funds without relying on
    /// auto-creation. No-op if the row already exists.
    pub fn open(&mut self, owner: AccountId, symbol: Symbol, ram_payer: AccountId) {
        require!(
            env::predecessor_account_id() == ram_payer,
            "only the payer can open"
        );
        let stats = self
            .registry
            .get(symbol.code())
            .expect("symbol does not exist");
        require!(*stats.supply.symbol() == symbol, "symbol precision mismatch");

        let key = (owner, symbol.code().clone());
        if !self.balances.contains_key(&key) {
            self.balances.insert(
                key,
                BalanceRecord { balance: Asset::zero(symbol), claimed: true, ram_payer },
            );
        }
    }

    /// Removes the caller's empty balance row, releasing its storage.
    pub fn close(&mut self, owner: AccountId, symbol: Symbol) {
        require!(
            env::predecessor_account_id() == owner,
            "only the owner can close"
        );
        let key = (owner, symbol.code().clone());
        let row = self
            .balances
            .get(&key)
            .expect("balance row already deleted or never existed");
        require!(
            row.balance.amount() == 0,
            "cannot close because the balance is not zero"
        );
        self.balances.remove(&key);
    }

    /// Circulating supply of a token.
    pub fn get_supply(&self, sym_code: SymbolCode) -> Asset {
        self.registry
            .get(&sym_code)
            .expect("token with symbol does not exist")
            .supply
            .clone()
    }

    /// Balance held by `owner` for a token.
    pub fn get_balance(&self, owner: AccountId, sym_code: SymbolCode) -> Asset {
        self.balances
            .get(&(owner, sym_code))
            .expect("no balance object found")
            .balance
            .clone()
    }
}

impl TokenLedger {
    // Fails unless `owner` holds at least `value`. Used to front-load the
    // only fallible step of multi-write operations.
    fn assert_can_debit(&self, owner: &AccountId, value: &Asset) {
        let key = (owner.clone(), value.symbol().code().clone());
        let row = self.balances.get(&key).expect("no balance object found");
        require!(row.balance.amount() >= value.amount(), "overdrawn balance");
    }

    // Debit `value` from `owner`, removing the row entirely when it empties.
    fn sub_balance(&mut self, owner: &AccountId, value: &Asset) {
        let key = (owner.clone(), value.symbol().code().clone());
        let row = self.balances.get_mut(&key).expect("no balance object found");
        require!(row.balance.amount() >= value.amount(), "overdrawn balance");

        if row.balance.amount() == value.amount() {
            self.balances.remove(&key);
        } else {
            row.balance = row.balance.checked_sub(value).expect("balance underflow");
        }
    }

    // Credit `value` to `owner`. A fresh row records `ram_payer` and the
    // given claimed flag; a credit to an existing row changes neither.
    fn add_balance(&mut self, owner: &AccountId, value: Asset, ram_payer: &AccountId, claimed: bool) {
        let key = (owner.clone(), value.symbol().code().clone());
        match self.balances.get_mut(&key) {
            Some(row) => {
                row.balance = row.balance.checked_add(&value).expect("balance overflow");
            }
            None => {
                self.balances.insert(
                    key,
                    BalanceRecord { balance: value, claimed, ram_payer: ram_payer.clone() },
                );
            }
        }
    }

    // Move `owner`'s row into the claimed state with its storage charged to
    // `payer`. The payer is tied to the row at insert time, so the transition
    // is a remove followed by a reinsert of the same balance, never an
    // in-place flag flip. No-op if already claimed.
    fn do_claim(&mut self, owner: &AccountId, symbol: &Symbol, payer: &AccountId) {
        require!(
            env::predecessor_account_id() == *payer,
            "only the payer can claim"
        );
        let key = (owner.clone(), symbol.code().clone());
        let row = self.balances.get(&key).expect("no balance object found");
        if row.claimed {
            return;
        }

        let value = row.balance.clone();
        self.balances.remove(&key);
        require!(!self.balances.contains_key(&key), "there must be no balance object");
        self.balances.insert(
            key,
            BalanceRecord { balance: value, claimed: true, ram_payer: payer.clone() },
        );
    }
}

fn check_memo(memo: &Option<String>) {
    if let Some(memo) = memo {
        require!(memo.len() <= MAX_MEMO_BYTES, "memo has more than 256 bytes");
    }
}
