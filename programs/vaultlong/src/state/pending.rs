use anchor_lang::prelude::*;
use crate::constants::MAX_ACTIONABLE_PENDING_ACTIONS;

/// Every protocol action, as seen by the price oracle.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolAction {
    Initialize,
    InitiateDeposit,
    ValidateDeposit,
    InitiateWithdrawal,
    ValidateWithdrawal,
    InitiateOpenPosition,
    ValidateOpenPosition,
    InitiateClosePosition,
    ValidateClosePosition,
    Liquidation,
}

impl ProtocolAction {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ProtocolAction::ValidateDeposit
                | ProtocolAction::ValidateWithdrawal
                | ProtocolAction::ValidateOpenPosition
                | ProtocolAction::ValidateClosePosition
        )
    }
}

/// Protocol balances frozen at the initiation of a vault action.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub asset_price: u128,
    pub total_expo: u128,
    pub balance_vault: u128,
    pub balance_long: u128,
    pub stable_supply: u128,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum PendingActionKind {
    Open {
        tick: i32,
        tick_version: u64,
        index: u64,
        amount: u128,
    },
    Close {
        tick: i32,
        tick_version: u64,
        index: u64,
        // Collateral and exposure being closed
        amount: u128,
        total_expo: u128,
        liquidation_penalty: u8,
        liq_multiplier: u128,
        // Value already debited from the long balance
        temp_transfer: u128,
    },
    Deposit {
        amount: u128,
        snapshot: BalanceSnapshot,
    },
    Withdrawal {
        shares: u128,
        // Estimate counted in the pending vault balance
        pending_value: u128,
        snapshot: BalanceSnapshot,
    },
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct PendingAction {
    pub user: Pubkey,
    pub validator: Pubkey,
    pub to: Pubkey,
    pub timestamp: i64,
    pub security_deposit: u64,
    pub kind: PendingActionKind,
}

impl PendingAction {
    pub fn validate_action(&self) -> ProtocolAction {
        match self.kind {
            PendingActionKind::Open { .. } => ProtocolAction::ValidateOpenPosition,
            PendingActionKind::Close { .. } => ProtocolAction::ValidateClosePosition,
            PendingActionKind::Deposit { .. } => ProtocolAction::ValidateDeposit,
            PendingActionKind::Withdrawal { .. } => ProtocolAction::ValidateWithdrawal,
        }
    }

    /// Anyone may validate once the deadline has elapsed.
    pub fn is_actionable(&self, now: i64, validation_deadline: i64) -> bool {
        self.timestamp.saturating_add(validation_deadline) < now
    }
}

/// FIFO of pending actions addressed by raw index. Removed actions leave a
/// tombstone until they reach the front so raw indices stay stable.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingQueue {
    // Raw index of `slots[0]`
    pub head: u128,
    pub slots: Vec<Option<PendingAction>>,
}

impl PendingQueue {
    pub fn push(&mut self, action: PendingAction) -> u128 {
        self.slots.push(Some(action));
        self.head + self.slots.len() as u128 - 1
    }

    fn slot(&self, raw_index: u128) -> Option<usize> {
        let offset = raw_index.checked_sub(self.head)?;
        let offset = usize::try_from(offset).ok()?;
        (offset < self.slots.len()).then_some(offset)
    }

    pub fn get(&self, raw_index: u128) -> Option<&PendingAction> {
        self.slot(raw_index).and_then(|i| self.slots[i].as_ref())
    }

    pub fn remove(&mut self, raw_index: u128) -> Option<PendingAction> {
        let i = self.slot(raw_index)?;
        let action = self.slots[i].take()?;
        while matches!(self.slots.first(), Some(None)) {
            self.slots.remove(0);
            self.head += 1;
        }
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
        Some(action)
    }

    pub fn find_by_validator(&self, validator: &Pubkey) -> Option<(u128, &PendingAction)> {
        self.iter().find(|(_, action)| action.validator == *validator)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u128, &PendingAction)> {
        let head = self.head;
        self.slots
            .iter()
            .enumerate()
            .filter_map(move |(i, slot)| slot.as_ref().map(|a| (head + i as u128, a)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PendingAction> {
        self.slots.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Oldest actions past their deadline, excluding those of `caller`.
    pub fn actionable(
        &self,
        caller: &Pubkey,
        now: i64,
        validation_deadline: i64,
    ) -> Vec<(u128, PendingAction)> {
        self.iter()
            .filter(|(_, action)| {
                action.validator != *caller && action.is_actionable(now, validation_deadline)
            })
            .take(MAX_ACTIONABLE_PENDING_ACTIONS)
            .map(|(raw, action)| (raw, action.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit(validator: Pubkey, timestamp: i64) -> PendingAction {
        PendingAction {
            user: validator,
            validator,
            to: validator,
            timestamp,
            security_deposit: 0,
            kind: PendingActionKind::Deposit {
                amount: 1,
                snapshot: BalanceSnapshot::default(),
            },
        }
    }

    #[test]
    fn raw_indices_survive_removals() {
        let mut queue = PendingQueue::default();
        let keys: Vec<Pubkey> = (0..3).map(|_| Pubkey::new_unique()).collect();
        let raws: Vec<u128> = keys.iter().map(|k| queue.push(deposit(*k, 0))).collect();
        assert_eq!(raws, vec![0, 1, 2]);

        assert!(queue.remove(1).is_some());
        assert_eq!(queue.slots.len(), 3);
        assert_eq!(queue.get(2).unwrap().validator, keys[2]);

        assert!(queue.remove(0).is_some());
        assert_eq!(queue.head, 2);
        assert_eq!(queue.slots.len(), 1);
        assert_eq!(queue.find_by_validator(&keys[2]).unwrap().0, 2);
        assert!(queue.remove(0).is_none());

        assert_eq!(queue.push(deposit(keys[0], 0)), 3);
        assert!(queue.remove(2).is_some());
        assert_eq!(queue.head, 3);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn actionable_skips_fresh_and_own_actions() {
        let mut queue = PendingQueue::default();
        let me = Pubkey::new_unique();
        let other = Pubkey::new_unique();
        let fresh = Pubkey::new_unique();
        queue.push(deposit(me, 0));
        queue.push(deposit(other, 0));
        queue.push(deposit(fresh, 900));

        let actionable = queue.actionable(&me, 1_000, 100);
        assert_eq!(actionable.len(), 1);
        assert_eq!(actionable[0].0, 1);
        assert_eq!(actionable[0].1.validator, other);

        // Exactly at the deadline the action is still reserved for its validator
        assert!(queue.actionable(&me, 100, 100).is_empty());
    }

    #[test]
    fn actionable_is_bounded() {
        let mut queue = PendingQueue::default();
        for _ in 0..(MAX_ACTIONABLE_PENDING_ACTIONS + 5) {
            queue.push(deposit(Pubkey::new_unique(), 0));
        }
        let actionable = queue.actionable(&Pubkey::new_unique(), 1_000, 10);
        assert_eq!(actionable.len(), MAX_ACTIONABLE_PENDING_ACTIONS);
        assert_eq!(actionable[0].0, 0);
    }
}
