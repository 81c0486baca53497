use near_sdk::{ext_contract, AccountId};

use crate::asset::Asset;

/// Notification delivered to both parties of a `transfer`. Fire-and-forget:
/// the ledger does not wait on or resolve the call, and a recipient that does
/// not implement it simply ignores the receipt.
#[ext_contract(ext_transfer_recipient)]
pub trait TransferRecipient {
    /// Observe a transfer this account took part in.
    ///
    /// ## Arguments:
    /// * `from` - the debited account.
    /// * `to` - the credited account.
    /// * `quantity` - the transferred amount.
    /// * `memo` - opaque metadata supplied by the sender, at most 256 bytes.
    fn on_transfer(&mut self, from: AccountId, to: AccountId, quantity: Asset, memo: Option<String>);
}
