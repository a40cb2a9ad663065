//! The randomized account balances shown to each session.

use std::ops::RangeInclusive;

use rand::Rng;

/// The inclusive range from which each account balance is drawn.
pub const BALANCE_RANGE: RangeInclusive<u32> = 3000..=10000;

/// The balances of the four accounts belonging to a session.
///
/// Balances are drawn once when a session is first seen and never change
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balances {
    /// The amount owing on the loan account.
    pub loan: u32,
    /// The amount owing on the credit card.
    pub credit_card: u32,
    /// The checking account balance.
    pub checking: u32,
    /// The savings account balance.
    pub savings: u32,
}

impl Balances {
    /// Draw each balance independently and uniformly from [BALANCE_RANGE].
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            loan: rng.gen_range(BALANCE_RANGE),
            credit_card: rng.gen_range(BALANCE_RANGE),
            checking: rng.gen_range(BALANCE_RANGE),
            savings: rng.gen_range(BALANCE_RANGE),
        }
    }

    /// The balances paired with their account keys, in display order.
    pub fn entries(&self) -> [(&'static str, u32); 4] {
        [
            ("loan", self.loan),
            ("credit_card", self.credit_card),
            ("checking", self.checking),
            ("savings", self.savings),
        ]
    }
}
