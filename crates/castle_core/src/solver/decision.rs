//! Per-tick decisions for the four activity queues.

use crate::actions::{Action, BuildingAction, ResearchAction, StartMission, TrainingAction};
use crate::data::{BuildingKind, TechData, UnitKind, PRODUCTION_TECHS};
use crate::error::Result;
use crate::events::EventKind;
use crate::missions;
use crate::resources::Costs;

use super::Run;

impl Run<'_> {
    /// Let every idle queue start something, then schedule a wakeup.
    pub(super) fn on_state_changed(&mut self) -> Result<()> {
        if self.state.building_idle() {
            self.try_start_building()?;
        }

        if self.state.research_idle() {
            if let Some(action) = self.pick_research() {
                if self.state.can_afford_all(&action.costs) {
                    self.start(action.into())?;
                }
            }
        }

        if self.state.training_idle() {
            if let Some(action) = self.pick_training() {
                if self.state.can_afford_all(&action.costs) {
                    self.start(action.into())?;
                }
            }
        }

        let blocked = self.blocked_costs();
        self.start_missions(&blocked)?;
        self.schedule_wakeup(&blocked);
        Ok(())
    }

    /// Building candidates in the order they should be tried.
    ///
    /// A library upgrade goes first when a production technology beats the
    /// best building on ROI but its library level is not reached yet.
    fn building_candidates(&self) -> Vec<BuildingAction> {
        let ranked = self.roi.rank_buildings(&self.state);
        let Some(top) = ranked.first() else {
            return Vec::new();
        };
        let top_roi = top.roi;

        let mut candidates: Vec<BuildingAction> = ranked.into_iter().map(|r| r.action).collect();
        if let Some((tech, tech_roi)) = self.roi.best_production_tech(&self.state) {
            let library = self.state.level(BuildingKind::Library);
            if tech_roi > top_roi && library < tech.required_library_level {
                if let Some(upgrade) =
                    BuildingAction::next_level(self.catalog, BuildingKind::Library, library)
                {
                    tracing::trace!(tech = %tech.name, tech_roi, top_roi, "Library jumps the queue");
                    candidates.insert(0, upgrade);
                }
            }
        }
        candidates
    }

    fn try_start_building(&mut self) -> Result<()> {
        for candidate in self.building_candidates() {
            let Some(action) = self.resolver.resolve(&self.state, candidate) else {
                continue;
            };
            if self.state.can_afford_all(&action.costs) {
                return self.start(action.into());
            }
        }
        Ok(())
    }

    fn library_met(&self, tech: &TechData) -> bool {
        self.state.level(BuildingKind::Library) >= tech.required_library_level
    }

    /// An unresearched technology whose library level is met.
    fn researchable(&self, name: &str) -> Option<&TechData> {
        if self.state.is_researched(name) {
            return None;
        }
        self.catalog.tech(name).filter(|t| self.library_met(t))
    }

    /// Next technology to research, by fixed priority: building
    /// prerequisites, then unit unlocks for missions, then production.
    ///
    /// Building prerequisites cover the target levels themselves and any
    /// farm, store or library level the resolver puts in front of a ranked
    /// candidate.
    pub(super) fn pick_research(&self) -> Option<ResearchAction> {
        for (&kind, &target) in self.targets {
            let Some(data) = self.catalog.building(kind) else {
                continue;
            };
            for level in self.state.level(kind).saturating_add(1)..=target {
                if let Some(tech) = data.required_tech(level).and_then(|t| self.researchable(t)) {
                    return Some(ResearchAction::from(tech));
                }
            }
        }

        let substitute_gate = self
            .building_candidates()
            .into_iter()
            .find_map(|candidate| self.resolver.blocking_tech(&self.state, candidate));
        if let Some(tech) = substitute_gate {
            return Some(ResearchAction::from(tech));
        }

        let tavern = self.state.level(BuildingKind::Tavern);
        let tavern_goal = self
            .targets
            .get(&BuildingKind::Tavern)
            .copied()
            .unwrap_or(tavern)
            .max(tavern);
        let needed = self.board.requirements_up_to(tavern_goal);
        let owned = self.state.total_army();
        for kind in UnitKind::ALL {
            if owned.get(kind) >= needed.get(kind) {
                continue;
            }
            let tech = self
                .catalog
                .unit(kind)
                .and_then(|u| u.required_tech.as_deref())
                .and_then(|t| self.researchable(t));
            if let Some(tech) = tech {
                return Some(ResearchAction::from(tech));
            }
        }

        PRODUCTION_TECHS
            .iter()
            .find_map(|name| self.researchable(name))
            .map(ResearchAction::from)
    }

    /// Next unit to train for the missions the tavern currently offers.
    ///
    /// Largest deficit first, then shortest training. Units locked behind a
    /// technology or that would overflow food are skipped.
    pub(super) fn pick_training(&self) -> Option<TrainingAction> {
        if self.state.food_headroom() < self.config.training_food_headroom {
            return None;
        }

        let needed = self.board.requirements_at(self.state.level(BuildingKind::Tavern));
        let owned = self.state.total_army();

        let mut deficits: Vec<_> = UnitKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let deficit = needed.get(kind).saturating_sub(owned.get(kind));
                if deficit == 0 {
                    return None;
                }
                self.catalog.unit(kind).map(|unit| (deficit, unit))
            })
            .collect();
        deficits.sort_by(|(da, ua), (db, ub)| {
            db.cmp(da).then_with(|| ua.training_time.cmp(&ub.training_time))
        });

        deficits
            .into_iter()
            .map(|(_, unit)| unit)
            .find(|unit| {
                let unlocked = unit
                    .required_tech
                    .as_deref()
                    .map_or(true, |t| self.state.is_researched(t));
                unlocked && self.state.can_afford_food(unit.costs.food)
            })
            .map(TrainingAction::from)
    }

    /// Pay for an action, occupy its queue and schedule its completion.
    pub(super) fn start(&mut self, action: Action) -> Result<()> {
        self.state.deduct(&action.costs())?;
        let now = self.state.now();
        let done = now.saturating_add(action.duration());
        tracing::debug!(action = %action, start = now, end = done, "Starting");

        match action {
            Action::Building(a) => {
                self.state.building_free_at = done;
                self.state.pending_building = Some(a);
                self.events.push(done, EventKind::BuildingComplete);
            }
            Action::Research(a) => {
                self.state.research_free_at = done;
                self.state.pending_research = Some(a);
                self.events.push(done, EventKind::ResearchComplete);
            }
            Action::Training(a) => {
                self.state.training_free_at = done;
                self.state.pending_training = Some(a);
                self.events.push(done, EventKind::TrainingComplete);
            }
            Action::Mission(a) => {
                let running = missions::commit(&mut self.state, a);
                self.events.push(
                    running.end,
                    EventKind::MissionComplete {
                        mission: running.mission,
                    },
                );
            }
        }
        Ok(())
    }

    /// Start the best eligible mission until none is left.
    ///
    /// Missions never spend a resource that a candidate in `reserved` is
    /// still short of.
    pub(super) fn start_missions(&mut self, reserved: &[Costs]) -> Result<()> {
        while let Some(mission) = self.board.pick_best(&self.state, reserved) {
            self.start(StartMission::from(mission).into())?;
        }
        Ok(())
    }

    /// Costs of the candidates that idle queues are waiting to afford.
    ///
    /// For the building queue this is the first resolvable candidate, the
    /// one a wakeup is scheduled for.
    fn blocked_costs(&self) -> Vec<Costs> {
        let mut blocked = Vec::with_capacity(3);

        if self.state.building_idle() {
            let first = self
                .roi
                .rank_buildings(&self.state)
                .into_iter()
                .find_map(|r| self.resolver.resolve(&self.state, r.action));
            if let Some(action) = first {
                blocked.push(action.costs);
            }
        }
        if self.state.research_idle() {
            if let Some(action) = self.pick_research() {
                blocked.push(action.costs);
            }
        }
        if self.state.training_idle() {
            if let Some(action) = self.pick_training() {
                blocked.push(action.costs);
            }
        }
        blocked
    }

    /// Wake up when the first blocked candidate becomes affordable.
    fn schedule_wakeup(&mut self, blocked: &[Costs]) {
        let now = self.state.now();
        let wakeup = blocked
            .iter()
            .filter_map(|costs| self.state.wait_time_for(costs))
            .filter(|&w| w > 0)
            .map(|w| now.saturating_add(w))
            .min();

        if let Some(time) = wakeup.filter(|&t| t > now) {
            if self.events.push_state_changed_if_absent(time) {
                tracing::trace!(now, wakeup = time, "Scheduled resource wakeup");
            }
        }
    }
}
