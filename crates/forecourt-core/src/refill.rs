// Refill financial reconciliation
//
// Converts a user preset into explicit volume/amount targets, validates
// them against station limits and tank availability, and reconciles the
// wallet hold against the actual charge after dispensing. All monetary
// values are rounded to 2 decimals at the boundary.

use thiserror::Error;

use crate::model::{PresetKind, RefillOutcome, RefillPreset, RefillQuote, StopReason};

/// Business constants for quoting. Configuration, not literals: the
/// buffer and low-tank thresholds are operator policy, so they arrive
/// here rather than being baked into the algorithm.
#[derive(Debug, Clone)]
pub struct RefillPolicy {
    pub min_volume_litres: f64,
    pub min_amount: f64,
    /// Fraction added on top of the estimated amount when computing the
    /// wallet hold.
    pub hold_buffer_fraction: f64,
    /// Advisory threshold: warn when the refill would leave the tank
    /// below this fraction of capacity.
    pub low_tank_fraction: f64,
}

impl Default for RefillPolicy {
    fn default() -> Self {
        Self {
            min_volume_litres: 1.0,
            min_amount: 5.0,
            hold_buffer_fraction: 0.10,
            low_tank_fraction: 0.20,
        }
    }
}

/// Station-configured dispense ceilings.
#[derive(Debug, Clone, Copy)]
pub struct StationLimits {
    pub max_volume_litres: f64,
    pub max_amount: f64,
}

/// What the selected tank can currently supply.
#[derive(Debug, Clone, Copy)]
pub struct TankAvailability {
    pub available_litres: f64,
    pub capacity_litres: f64,
}

/// Refill request rejected by a business rule. Not a device fault:
/// always surfaced to the user with the specific reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RefillRejected {
    #[error("target volume {target:.2} L is below minimum volume {min:.2} L")]
    BelowMinimumVolume { target: f64, min: f64 },

    #[error("target amount {target:.2} is below minimum amount {min:.2}")]
    BelowMinimumAmount { target: f64, min: f64 },

    #[error("target volume {target:.2} L exceeds station maximum {max:.2} L")]
    AboveMaximumVolume { target: f64, max: f64 },

    #[error("target amount {target:.2} exceeds station maximum {max:.2}")]
    AboveMaximumAmount { target: f64, max: f64 },

    #[error("tank has {available:.2} L available, refill needs {target:.2} L")]
    InsufficientTankVolume { target: f64, available: f64 },
}

/// Quote and settlement arithmetic for the pre-authorization →
/// dispense → completion lifecycle.
#[derive(Debug, Clone, Default)]
pub struct RefillCalculator {
    policy: RefillPolicy,
}

impl RefillCalculator {
    pub fn new(policy: RefillPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RefillPolicy {
        &self.policy
    }

    /// Validate a preset and compute the quote.
    pub fn quote(
        &self,
        preset: &RefillPreset,
        unit_price: f64,
        limits: StationLimits,
        tank: TankAvailability,
    ) -> Result<RefillQuote, RefillRejected> {
        let (target_volume, target_amount) = match preset.kind {
            PresetKind::Volume => (preset.value, preset.value * unit_price),
            PresetKind::Amount => (preset.value / unit_price, preset.value),
        };
        let target_volume = round2(target_volume);
        let target_amount = round2(target_amount);

        if target_volume < self.policy.min_volume_litres {
            return Err(RefillRejected::BelowMinimumVolume {
                target: target_volume,
                min: self.policy.min_volume_litres,
            });
        }
        if target_amount < self.policy.min_amount {
            return Err(RefillRejected::BelowMinimumAmount {
                target: target_amount,
                min: self.policy.min_amount,
            });
        }
        if target_volume > limits.max_volume_litres {
            return Err(RefillRejected::AboveMaximumVolume {
                target: target_volume,
                max: limits.max_volume_litres,
            });
        }
        if target_amount > limits.max_amount {
            return Err(RefillRejected::AboveMaximumAmount {
                target: target_amount,
                max: limits.max_amount,
            });
        }
        if tank.available_litres < target_volume {
            return Err(RefillRejected::InsufficientTankVolume {
                target: target_volume,
                available: tank.available_litres,
            });
        }

        let hold_amount = round2(target_amount * (1.0 + self.policy.hold_buffer_fraction));

        let low_tank_advisory = tank.capacity_litres > 0.0
            && (tank.available_litres - target_volume) / tank.capacity_litres
                < self.policy.low_tank_fraction;

        Ok(RefillQuote {
            target_volume_litres: target_volume,
            target_amount,
            unit_price,
            hold_amount,
            low_tank_advisory,
        })
    }

    /// Reconcile the actual dispense against the hold. The stop reason
    /// is supplied by the caller and passed through unchanged.
    pub fn settle(
        &self,
        quote: &RefillQuote,
        actual_volume_litres: f64,
        stop_reason: StopReason,
    ) -> RefillOutcome {
        let actual_amount = round2(actual_volume_litres * quote.unit_price);
        let refund_amount = round2((quote.hold_amount - actual_amount).max(0.0));

        RefillOutcome {
            actual_volume_litres,
            actual_amount,
            hold_amount: quote.hold_amount,
            refund_amount,
            stop_reason,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use forecourt_pts::Product;

    use super::{RefillCalculator, RefillPolicy, RefillRejected, StationLimits, TankAvailability};
    use crate::model::{PresetKind, RefillPreset, StopReason};

    fn calculator() -> RefillCalculator {
        RefillCalculator::new(RefillPolicy::default())
    }

    fn limits() -> StationLimits {
        StationLimits {
            max_volume_litres: 100.0,
            max_amount: 500.0,
        }
    }

    fn full_tank() -> TankAvailability {
        TankAvailability {
            available_litres: 5000.0,
            capacity_litres: 5000.0,
        }
    }

    fn preset(kind: PresetKind, value: f64) -> RefillPreset {
        RefillPreset {
            product: Product::Ron95,
            kind,
            value,
        }
    }

    #[test]
    fn volume_preset_quote() {
        let quote = calculator()
            .quote(&preset(PresetKind::Volume, 10.0), 2.05, limits(), full_tank())
            .unwrap();

        assert!((quote.target_volume_litres - 10.0).abs() < f64::EPSILON);
        assert!((quote.target_amount - 20.50).abs() < f64::EPSILON);
        assert!((quote.hold_amount - 22.55).abs() < f64::EPSILON);
        assert!(!quote.low_tank_advisory);
    }

    #[test]
    fn amount_preset_quote() {
        let quote = calculator()
            .quote(&preset(PresetKind::Amount, 50.0), 2.50, limits(), full_tank())
            .unwrap();

        assert!((quote.target_volume_litres - 20.0).abs() < f64::EPSILON);
        assert!((quote.target_amount - 50.0).abs() < f64::EPSILON);
        assert!((quote.hold_amount - 55.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_below_minimum_volume() {
        let err = calculator()
            .quote(&preset(PresetKind::Volume, 0.5), 2.05, limits(), full_tank())
            .unwrap_err();

        assert!(matches!(err, RefillRejected::BelowMinimumVolume { .. }));
    }

    #[test]
    fn rejects_below_minimum_amount() {
        // 2 L at 2.05 is 4.10, below the 5.00 floor.
        let err = calculator()
            .quote(&preset(PresetKind::Volume, 2.0), 2.05, limits(), full_tank())
            .unwrap_err();

        assert!(matches!(err, RefillRejected::BelowMinimumAmount { .. }));
    }

    #[test]
    fn rejects_above_station_maximums() {
        let err = calculator()
            .quote(&preset(PresetKind::Volume, 150.0), 2.05, limits(), full_tank())
            .unwrap_err();
        assert!(matches!(err, RefillRejected::AboveMaximumVolume { .. }));

        let err = calculator()
            .quote(&preset(PresetKind::Amount, 600.0), 10.0, limits(), full_tank())
            .unwrap_err();
        assert!(matches!(err, RefillRejected::AboveMaximumAmount { .. }));
    }

    #[test]
    fn rejects_insufficient_tank_volume() {
        let near_empty = TankAvailability {
            available_litres: 8.0,
            capacity_litres: 5000.0,
        };
        let err = calculator()
            .quote(&preset(PresetKind::Volume, 10.0), 2.05, limits(), near_empty)
            .unwrap_err();

        assert!(matches!(
            err,
            RefillRejected::InsufficientTankVolume { .. }
        ));
    }

    #[test]
    fn low_tank_advisory_is_not_a_rejection() {
        // 950 L available of 5000 L capacity; a 50 L refill leaves 18%.
        let low_tank = TankAvailability {
            available_litres: 950.0,
            capacity_litres: 5000.0,
        };
        let quote = calculator()
            .quote(&preset(PresetKind::Volume, 50.0), 2.05, limits(), low_tank)
            .unwrap();

        assert!(quote.low_tank_advisory);
    }

    #[test]
    fn settle_refunds_unused_hold() {
        let calc = calculator();
        let quote = calc
            .quote(&preset(PresetKind::Volume, 10.0), 2.05, limits(), full_tank())
            .unwrap();

        let outcome = calc.settle(&quote, 9.8, StopReason::UserStopped);

        assert!((outcome.actual_amount - 20.09).abs() < f64::EPSILON);
        assert!((outcome.refund_amount - 2.46).abs() < f64::EPSILON);
        assert_eq!(outcome.stop_reason, StopReason::UserStopped);
    }

    #[test]
    fn settle_never_refunds_negative() {
        let calc = calculator();
        let quote = calc
            .quote(&preset(PresetKind::Volume, 10.0), 2.05, limits(), full_tank())
            .unwrap();

        // Dispensed past the hold (meter overshoot): refund clamps at 0.
        let outcome = calc.settle(&quote, 12.0, StopReason::TargetReached);

        assert!((outcome.actual_amount - 24.60).abs() < f64::EPSILON);
        assert!(outcome.refund_amount.abs() < f64::EPSILON);
    }
}
