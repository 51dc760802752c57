//! Mop-up after every target is reached.
//!
//! The event loop is done at this point, so actions here wait out queue and
//! resource shortages synchronously by moving the clock forward.

use crate::data::{BuildingKind, TechData, UnitData};
use crate::error::Result;
use crate::events::EventKind;
use crate::resources::Costs;
use crate::solution::{ResearchLogEntry, TrainingLogEntry};

use super::Run;

impl Run<'_> {
    pub(super) fn finalize(&mut self) -> Result<()> {
        tracing::info!(time = self.state.now(), "Researching remaining technologies");
        self.research_remaining()?;

        tracing::info!(time = self.state.now(), "Training units for missions");
        self.train_for_missions()?;

        tracing::info!(time = self.state.now(), "Running final missions");
        self.run_final_missions()?;

        tracing::info!(time = self.state.now(), "Filling food with defenders");
        self.fill_defense()
    }

    /// Move the clock until `costs` is affordable. Returns `false` if it
    /// never will be.
    ///
    /// Each wait must be shorter than the one before it, otherwise
    /// production is not closing the gap and the cost is given up on.
    pub(super) fn wait_until_affordable(&mut self, costs: &Costs) -> bool {
        let mut previous = u64::MAX;
        loop {
            match self.state.wait_time_for(costs) {
                Some(0) => return true,
                Some(wait) if wait < previous => {
                    self.state.advance_by(wait);
                    previous = wait;
                }
                Some(wait) => {
                    tracing::warn!(wait, "Production stalled while saving up");
                    return false;
                }
                None => return false,
            }
        }
    }

    /// Research every remaining technology the library allows, by
    /// (library level, name).
    fn research_remaining(&mut self) -> Result<()> {
        let catalog = self.catalog;
        let library = self.state.level(BuildingKind::Library);
        let mut remaining: Vec<&TechData> = catalog
            .techs()
            .filter(|t| !self.state.is_researched(&t.name))
            .collect();
        remaining.sort_by(|a, b| {
            a.required_library_level
                .cmp(&b.required_library_level)
                .then_with(|| a.name.cmp(&b.name))
        });

        for tech in remaining {
            if library < tech.required_library_level {
                tracing::debug!(tech = %tech.name, "Library too low, leaving unresearched");
                continue;
            }
            self.state.advance_to(self.state.research_free_at());
            if !self.wait_until_affordable(&tech.costs) || !self.state.can_afford_food(tech.costs.food) {
                tracing::warn!(tech = %tech.name, "Cannot afford technology");
                continue;
            }

            let start = self.state.now();
            self.state.deduct(&tech.costs)?;
            let end = start.saturating_add(tech.research_time);
            self.state.research_free_at = end;
            self.state.mark_researched(&tech.name);
            tracing::debug!(tech = %tech.name, start, end, "Researched");

            self.research_log.push(ResearchLogEntry {
                tech: tech.name.clone(),
                start,
                end,
                costs: tech.costs,
                food_used: self.state.food_used(),
                food_capacity: self.state.food_capacity(),
            });
        }
        Ok(())
    }

    /// Train one unit right away, waiting for the queue and resources.
    ///
    /// Returns whether the unit was trained.
    fn train_now(&mut self, unit: &UnitData) -> Result<bool> {
        if !self.state.can_afford_food(unit.costs.food) {
            return Ok(false);
        }
        self.state.advance_to(self.state.training_free_at());
        if !self.wait_until_affordable(&unit.costs) {
            return Ok(false);
        }

        let start = self.state.now();
        self.state.deduct(&unit.costs)?;
        let end = start.saturating_add(unit.training_time);
        self.state.training_free_at = end;
        self.state.army.add(unit.kind, 1);

        self.training_log.push(TrainingLogEntry {
            unit: unit.kind,
            start,
            end,
            costs: unit.costs,
            food_used: self.state.food_used(),
            food_capacity: self.state.food_capacity(),
        });
        Ok(true)
    }

    fn is_unlocked(&self, unit: &UnitData) -> bool {
        unit.required_tech
            .as_deref()
            .map_or(true, |t| self.state.is_researched(t))
    }

    /// Cover the largest unit requirement of every mission the final tavern
    /// offers.
    fn train_for_missions(&mut self) -> Result<()> {
        let catalog = self.catalog;
        let needed = self
            .board
            .requirements_at(self.state.level(BuildingKind::Tavern));

        for unit in catalog.units() {
            if !self.is_unlocked(unit) {
                continue;
            }
            while self.state.total_army().get(unit.kind) < needed.get(unit.kind) {
                if !self.train_now(unit)? {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Start every eligible mission once and run them to completion.
    fn run_final_missions(&mut self) -> Result<()> {
        // Units trained above only exist once training finishes
        self.state.advance_to(self.state.training_free_at());
        self.start_missions(&[])?;

        while let Some(event) = self.events.pop() {
            if event.kind == EventKind::StateChanged {
                continue;
            }
            self.process(event)?;
        }
        Ok(())
    }

    /// Spend the remaining food on units, each time picking the one that
    /// raises the weakest defense total the most.
    ///
    /// Candidates are scanned by defense per food, best first, so the first
    /// of several equal improvements wins.
    fn fill_defense(&mut self) -> Result<()> {
        let catalog = self.catalog;
        let mut roster: Vec<&UnitData> = catalog
            .units()
            .filter(|u| u.costs.food > 0 && self.is_unlocked(u))
            .collect();
        roster.sort_by(|a, b| {
            b.defense_per_food()
                .partial_cmp(&a.defense_per_food())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.kind.cmp(&b.kind))
        });

        let mut trained = 0u32;
        loop {
            let totals = self.state.total_army().defense(catalog.units());

            let mut best: Option<(usize, u64)> = None;
            for (index, unit) in roster.iter().enumerate() {
                if !self.state.can_afford_food(unit.costs.food) {
                    continue;
                }
                let weakest = totals.with(&unit.defense).min();
                if best.map_or(true, |(_, b)| weakest > b) {
                    best = Some((index, weakest));
                }
            }

            let Some((index, _)) = best else {
                break;
            };
            let unit = roster[index];
            if self.train_now(unit)? {
                trained += 1;
            } else {
                tracing::warn!(unit = %unit.kind, "Unit can never be afforded, dropping from defense roster");
                roster.remove(index);
            }
        }

        tracing::debug!(
            trained,
            food_used = self.state.food_used(),
            food_capacity = self.state.food_capacity(),
            "Defense filled"
        );
        Ok(())
    }
}
