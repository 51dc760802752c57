//! Unit counts per type.

use serde::{Deserialize, Serialize};

use crate::data::{Defense, UnitData, UnitKind, UnitRequirement};

/// Number of units of each kind.
///
/// Iteration always follows [`UnitKind::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Army {
    counts: [u32; 6],
}

impl Army {
    /// An army with no units.
    #[must_use]
    pub const fn new() -> Self {
        Self { counts: [0; 6] }
    }

    /// Units of one kind.
    #[must_use]
    pub const fn get(&self, kind: UnitKind) -> u32 {
        self.counts[kind.index()]
    }

    /// Overwrite the count of one kind.
    pub fn set(&mut self, kind: UnitKind, count: u32) {
        self.counts[kind.index()] = count;
    }

    /// Add units of one kind.
    pub fn add(&mut self, kind: UnitKind, count: u32) {
        let slot = &mut self.counts[kind.index()];
        *slot = slot.saturating_add(count);
    }

    /// Remove units of one kind, stopping at zero.
    pub fn remove(&mut self, kind: UnitKind, count: u32) {
        let slot = &mut self.counts[kind.index()];
        *slot = slot.saturating_sub(count);
    }

    /// Whether every requirement is covered.
    #[must_use]
    pub fn can_satisfy(&self, requirements: &[UnitRequirement]) -> bool {
        requirements.iter().all(|r| self.get(r.unit) >= r.count)
    }

    /// Add the units named by a requirement list.
    pub fn add_all(&mut self, requirements: &[UnitRequirement]) {
        for r in requirements {
            self.add(r.unit, r.count);
        }
    }

    /// Remove the units named by a requirement list.
    pub fn remove_all(&mut self, requirements: &[UnitRequirement]) {
        for r in requirements {
            self.remove(r.unit, r.count);
        }
    }

    /// Element-wise sum of two armies.
    #[must_use]
    pub fn combined(&self, other: &Self) -> Self {
        let mut out = *self;
        for kind in UnitKind::ALL {
            out.add(kind, other.get(kind));
        }
        out
    }

    /// Total number of units.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }

    /// Whether there are no units at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Non-zero counts in fixed unit order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitKind, u32)> + '_ {
        UnitKind::ALL
            .into_iter()
            .map(|k| (k, self.get(k)))
            .filter(|&(_, c)| c > 0)
    }

    /// Aggregate defense of the army against each threat class.
    ///
    /// Units missing from `roster` contribute nothing.
    #[must_use]
    pub fn defense<'a>(&self, roster: impl IntoIterator<Item = &'a UnitData>) -> DefenseTotals {
        let mut totals = DefenseTotals::default();
        for unit in roster {
            totals.add(&unit.defense, self.get(unit.kind));
        }
        totals
    }
}

/// Defense summed over a whole army.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DefenseTotals {
    /// Total defense against cavalry.
    pub cavalry: u64,
    /// Total defense against infantry.
    pub infantry: u64,
    /// Total defense against artillery.
    pub artillery: u64,
}

impl DefenseTotals {
    /// Add `count` copies of a unit's defense profile.
    pub fn add(&mut self, defense: &Defense, count: u32) {
        let n = u64::from(count);
        self.cavalry = self.cavalry.saturating_add(u64::from(defense.cavalry) * n);
        self.infantry = self.infantry.saturating_add(u64::from(defense.infantry) * n);
        self.artillery = self
            .artillery
            .saturating_add(u64::from(defense.artillery) * n);
    }

    /// Totals after adding one more unit with the given profile.
    #[must_use]
    pub fn with(&self, defense: &Defense) -> Self {
        let mut next = *self;
        next.add(defense, 1);
        next
    }

    /// Weakest of the three totals.
    #[must_use]
    pub fn min(&self) -> u64 {
        self.cavalry.min(self.infantry).min(self.artillery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(unit: UnitKind, count: u32) -> UnitRequirement {
        UnitRequirement { unit, count }
    }

    #[test]
    fn test_add_remove_saturates() {
        let mut army = Army::new();
        army.add(UnitKind::Archer, 3);
        army.remove(UnitKind::Archer, 5);
        assert_eq!(army.get(UnitKind::Archer), 0);
        assert!(army.is_empty());
    }

    #[test]
    fn test_can_satisfy() {
        let mut army = Army::new();
        army.add(UnitKind::Spearman, 10);
        army.add(UnitKind::Horseman, 1);

        assert!(army.can_satisfy(&[req(UnitKind::Spearman, 10)]));
        assert!(!army.can_satisfy(&[req(UnitKind::Spearman, 5), req(UnitKind::Horseman, 2)]));
        assert!(army.can_satisfy(&[]));
    }

    #[test]
    fn test_commit_and_return() {
        let reqs = [req(UnitKind::Spearman, 4), req(UnitKind::Archer, 2)];
        let mut home = Army::new();
        home.add(UnitKind::Spearman, 6);
        home.add(UnitKind::Archer, 2);
        let mut away = Army::new();

        home.remove_all(&reqs);
        away.add_all(&reqs);
        assert_eq!(home.get(UnitKind::Spearman), 2);
        assert_eq!(home.combined(&away).total(), 8);

        away.remove_all(&reqs);
        home.add_all(&reqs);
        assert!(away.is_empty());
        assert_eq!(home.total(), 8);
    }

    #[test]
    fn test_iter_skips_empty_in_fixed_order() {
        let mut army = Army::new();
        army.add(UnitKind::Lancer, 1);
        army.add(UnitKind::Spearman, 2);
        let items: Vec<_> = army.iter().collect();
        assert_eq!(items, vec![(UnitKind::Spearman, 2), (UnitKind::Lancer, 1)]);
    }

    #[test]
    fn test_defense_totals() {
        let roster = UnitData::standard_roster();
        let mut army = Army::new();
        army.add(UnitKind::Spearman, 2);
        army.add(UnitKind::Crossbowman, 1);

        let totals = army.defense(&roster);
        assert_eq!(totals.cavalry, 2 * 59 + 33);
        assert_eq!(totals.infantry, 2 * 32 + 91);
        assert_eq!(totals.artillery, 2 * 20 + 60);
        assert_eq!(totals.min(), 100);
        assert_eq!(totals.with(&roster[0].defense).min(), 120);
    }
}
