//! Side-aware price comparisons
//!
//! Every threshold check in the lifecycle engine goes through
//! [`has_reached`], so long and short logic cannot drift apart.

use rust_decimal::Decimal;

use crate::directive::Side;

/// Direction of a price move relative to the position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// Price moving in the position's favor (up for long, down for short)
    Favorable,
    /// Price moving against the position
    Adverse,
}

/// Whether `price` is at or beyond `level` in the given direction for `side`
pub fn has_reached(side: Side, movement: Movement, price: Decimal, level: Decimal) -> bool {
    match (side, movement) {
        (Side::Long, Movement::Favorable) | (Side::Short, Movement::Adverse) => price >= level,
        (Side::Long, Movement::Adverse) | (Side::Short, Movement::Favorable) => price <= level,
    }
}

/// Whether moving the stop from `current` to `proposed` reduces risk
///
/// Long stops may only rise, short stops may only fall.
pub fn is_tighter(side: Side, proposed: Decimal, current: Decimal) -> bool {
    proposed != current && has_reached(side, Movement::Favorable, proposed, current)
}
