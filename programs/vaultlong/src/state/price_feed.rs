use anchor_lang::prelude::*;
use crate::{constants::PRICE_FEED_CAPACITY, engine::PriceInfo, state::ProtocolAction, VaultLongError};

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq, InitSpace)]
pub struct PriceObservation {
    pub timestamp: i64,
    pub price: u128,
}

/// Ring of the latest prices published by the oracle authority. Actions
/// reference an observation by its timestamp.
#[account]
#[derive(Default, InitSpace)]
pub struct PriceFeed {
    // Allowed to publish observations
    pub authority: Pubkey,

    pub protocol: Pubkey,

    // Ordered by timestamp, oldest first
    // anchor 0.28 max_len only accepts literals; must equal PRICE_FEED_CAPACITY
    #[max_len(32)]
    pub observations: Vec<PriceObservation>,

    // Bump seed for PDA derivation
    pub bump: u8,
}

impl PriceFeed {
    pub const LEN: usize = 8 + PriceFeed::INIT_SPACE;

    pub fn publish(&mut self, timestamp: i64, price: u128) -> Result<()> {
        require!(price > 0, VaultLongError::InvalidPriceObservation);
        if let Some(last) = self.observations.last() {
            require!(timestamp > last.timestamp, VaultLongError::InvalidPriceObservation);
        }
        if self.observations.len() >= PRICE_FEED_CAPACITY {
            self.observations.remove(0);
        }
        self.observations.push(PriceObservation { timestamp, price });
        Ok(())
    }

    pub fn observation(&self, timestamp: i64) -> Option<&PriceObservation> {
        self.observations
            .binary_search_by_key(&timestamp, |o| o.timestamp)
            .ok()
            .map(|i| &self.observations[i])
    }

    /// `price_data` is the borsh encoded timestamp of an observation.
    /// Validations need an observation at or after `target_timestamp`, other
    /// actions one at most `max_age` seconds old.
    pub fn attest(
        &self,
        action: ProtocolAction,
        target_timestamp: i64,
        now: i64,
        max_age: i64,
        price_data: &[u8],
    ) -> Result<PriceInfo> {
        let timestamp =
            i64::try_from_slice(price_data).map_err(|_| error!(VaultLongError::InvalidPriceData))?;
        let observation = self
            .observation(timestamp)
            .ok_or(error!(VaultLongError::InvalidPriceData))?;
        require!(observation.timestamp <= now, VaultLongError::InvalidPriceData);
        if action.is_validation() {
            require!(
                observation.timestamp >= target_timestamp,
                VaultLongError::PriceTooOld
            );
        } else {
            require!(
                now - observation.timestamp <= max_age,
                VaultLongError::PriceTooOld
            );
        }
        Ok(PriceInfo {
            price: observation.price,
            timestamp: observation.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::error_code;

    fn feed() -> PriceFeed {
        let mut feed = PriceFeed::default();
        feed.publish(100, 2_000).unwrap();
        feed.publish(130, 2_100).unwrap();
        feed
    }

    fn data(timestamp: i64) -> Vec<u8> {
        timestamp.try_to_vec().unwrap()
    }

    #[test]
    fn rejects_out_of_order_observations() {
        let mut feed = feed();
        assert!(feed.publish(130, 1).is_err());
        assert!(feed.publish(131, 0).is_err());
    }

    #[test]
    fn ring_keeps_latest_observations() {
        let mut feed = PriceFeed::default();
        for i in 0..(PRICE_FEED_CAPACITY as i64 + 3) {
            feed.publish(i, 1 + i as u128).unwrap();
        }
        assert_eq!(feed.observations.len(), PRICE_FEED_CAPACITY);
        assert!(feed.observation(2).is_none());
        assert_eq!(feed.observation(3).unwrap().price, 4);
    }

    #[test]
    fn initiation_needs_a_recent_price() {
        let feed = feed();
        let info = feed
            .attest(ProtocolAction::InitiateDeposit, 140, 140, 60, &data(100))
            .unwrap();
        assert_eq!(info.price, 2_000);
        let err = feed
            .attest(ProtocolAction::InitiateDeposit, 200, 200, 60, &data(100))
            .unwrap_err();
        assert_eq!(error_code(&err), u32::from(VaultLongError::PriceTooOld));
    }

    #[test]
    fn validation_needs_a_price_after_the_target() {
        let feed = feed();
        let err = feed
            .attest(ProtocolAction::ValidateDeposit, 124, 500, 60, &data(100))
            .unwrap_err();
        assert_eq!(error_code(&err), u32::from(VaultLongError::PriceTooOld));
        let info = feed
            .attest(ProtocolAction::ValidateDeposit, 124, 500, 60, &data(130))
            .unwrap();
        assert_eq!(info.timestamp, 130);
        assert!(feed
            .attest(ProtocolAction::ValidateDeposit, 124, 500, 60, &[1, 2])
            .is_err());
    }
}
