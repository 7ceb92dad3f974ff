//! FIFO consumption planning.
//!
//! Planning is separated from mutation: `plan_fifo` decides which lots to drain and by
//! how much, the caller applies the plan under whatever lock guards those lots.

use farmlink_core::LotId;

use crate::InventoryLot;

/// What happens to a lot when its planned take is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotMutation {
    /// The lot is drained to zero and removed.
    Delete,
    /// The lot keeps `new_quantity` units.
    Decrement { new_quantity: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumptionStep {
    pub lot_id: LotId,
    pub take: i64,
    pub mutation: LotMutation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionPlan {
    pub requested: i64,
    pub steps: Vec<ConsumptionStep>,
    pub covered: i64,
    pub shortfall: i64,
}

impl ConsumptionPlan {
    pub fn is_complete(&self) -> bool {
        self.shortfall == 0
    }
}

/// Oldest first; lot id breaks ties so the order is total.
pub fn fifo_sort(lots: &mut [&InventoryLot]) {
    lots.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id_typed().cmp(&b.id_typed()))
    });
}

/// Plan draining `requested` units from the available lots, oldest first.
///
/// Reserved and sold lots are skipped. A shortfall is reported, never hidden.
pub fn plan_fifo<'a, I>(lots: I, requested: i64) -> ConsumptionPlan
where
    I: IntoIterator<Item = &'a InventoryLot>,
{
    let mut candidates: Vec<&InventoryLot> = lots
        .into_iter()
        .filter(|l| l.is_available() && l.quantity() > 0)
        .collect();
    fifo_sort(&mut candidates);

    let requested = requested.max(0);
    let mut remaining = requested;
    let mut steps = Vec::new();

    for lot in candidates {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(lot.quantity());
        let left = lot.quantity() - take;
        steps.push(ConsumptionStep {
            lot_id: lot.id_typed(),
            take,
            mutation: if left == 0 {
                LotMutation::Delete
            } else {
                LotMutation::Decrement { new_quantity: left }
            },
        });
        remaining -= take;
    }

    ConsumptionPlan {
        requested,
        steps,
        covered: requested - remaining,
        shortfall: remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LotStatus;
    use chrono::{DateTime, TimeZone, Utc};
    use farmlink_core::UserId;
    use proptest::prelude::*;

    fn t(sec: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + sec, 0).unwrap()
    }

    fn lot(quantity: i64, created: i64) -> InventoryLot {
        InventoryLot::new(UserId::new(), "Beans", quantity, "kg", "Thika", t(created)).unwrap()
    }

    #[test]
    fn drains_oldest_first() {
        let newer = lot(40, 10);
        let older = lot(30, 0);
        let plan = plan_fifo([&newer, &older], 50);

        assert!(plan.is_complete());
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].lot_id, older.id_typed());
        assert_eq!(plan.steps[0].mutation, LotMutation::Delete);
        assert_eq!(plan.steps[1].take, 20);
        assert_eq!(plan.steps[1].mutation, LotMutation::Decrement { new_quantity: 20 });
    }

    #[test]
    fn skips_reserved_lots_and_reports_shortfall() {
        let mut reserved = lot(100, 0);
        reserved.reserve(t(1)).unwrap();
        let available = lot(10, 5);

        let plan = plan_fifo([&reserved, &available], 25);
        assert_eq!(plan.covered, 10);
        assert_eq!(plan.shortfall, 15);
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(reserved.status(), LotStatus::Reserved);
    }

    #[test]
    fn zero_request_plans_nothing() {
        let l = lot(10, 0);
        let plan = plan_fifo([&l], 0);
        assert!(plan.steps.is_empty());
        assert!(plan.is_complete());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        /// Property: covered + shortfall == requested, and no step takes more than its lot holds.
        #[test]
        fn plan_accounts_for_every_unit(
            quantities in prop::collection::vec(0i64..200, 0..10),
            requested in 0i64..1500,
        ) {
            let lots: Vec<_> = quantities.iter().enumerate().map(|(i, q)| lot(*q, i as i64)).collect();
            let plan = plan_fifo(lots.iter(), requested);

            prop_assert_eq!(plan.covered + plan.shortfall, requested);
            let taken: i64 = plan.steps.iter().map(|s| s.take).sum();
            prop_assert_eq!(taken, plan.covered);
            for step in &plan.steps {
                let source = lots.iter().find(|l| l.id_typed() == step.lot_id).unwrap();
                prop_assert!(step.take <= source.quantity());
            }
        }
    }
}
