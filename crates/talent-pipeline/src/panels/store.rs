use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::domain::{
    validate_windows, AvailabilityId, DateAvailability, NewPanel, Panel, PanelId, PanelPatch,
    SlotId, SlotTemplate, SlotWindow, TimeSlot,
};
use super::repository::PanelRepository;
use crate::clock::Clock;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::workflows::domain::WorkflowId;

/// Mutex per stored panel. Every read-modify-write of a panel runs under its lock.
///
/// Entries are only registered for panels that were found in the repository and are
/// dropped again when the panel turns out to be gone.
#[derive(Default)]
struct PanelLocks {
    locks: Mutex<HashMap<PanelId, Arc<Mutex<()>>>>,
}

impl PanelLocks {
    fn handle(&self, id: &PanelId) -> Arc<Mutex<()>> {
        let mut guard = self.locks.lock().expect("panel lock registry poisoned");
        guard.entry(id.clone()).or_default().clone()
    }

    fn forget(&self, id: &PanelId) {
        self.locks
            .lock()
            .expect("panel lock registry poisoned")
            .remove(id);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().expect("panel lock registry poisoned").len()
    }
}

/// Owns concrete bookable slots per panel and date.
pub struct SlotStore<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    locks: PanelLocks,
    expansion_limit_days: u32,
}

impl<R> SlotStore<R>
where
    R: PanelRepository + 'static,
{
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            locks: PanelLocks::default(),
            expansion_limit_days: PipelineConfig::default().max_expansion_days,
        }
    }

    /// Caps the number of days one recurring-rule expansion may cover.
    pub fn with_expansion_limit(mut self, days: u32) -> Self {
        self.expansion_limit_days = days;
        self
    }

    pub fn expansion_limit_days(&self) -> u32 {
        self.expansion_limit_days
    }

    pub fn create_panel(&self, request: NewPanel) -> Result<Panel, PipelineError> {
        let panel = Panel::from_request(request)?;
        let stored = self.repository.insert(panel)?;
        info!(panel_id = %stored.id, members = stored.members.len(), "panel created");
        Ok(stored)
    }

    pub fn panel(&self, panel_id: &PanelId) -> Result<Panel, PipelineError> {
        self.repository
            .fetch(panel_id)?
            .ok_or_else(|| PipelineError::not_found("panel", panel_id))
    }

    pub fn panels(&self) -> Result<Vec<Panel>, PipelineError> {
        Ok(self.repository.list()?)
    }

    /// Full availability list for a panel, booked slots included.
    pub fn availability(&self, panel_id: &PanelId) -> Result<Vec<DateAvailability>, PipelineError> {
        Ok(self.panel(panel_id)?.availability)
    }

    /// Runs `mutate` against the stored panel while holding that panel's lock and persists
    /// the result. Nothing is written when `mutate` fails.
    pub(crate) fn with_panel<T>(
        &self,
        panel_id: &PanelId,
        mutate: impl FnOnce(&mut Panel) -> Result<T, PipelineError>,
    ) -> Result<(T, Panel), PipelineError> {
        self.panel(panel_id)?;
        let handle = self.locks.handle(panel_id);
        let _guard = handle.lock().expect("panel lock poisoned");

        let mut panel = match self.repository.fetch(panel_id)? {
            Some(panel) => panel,
            None => {
                self.locks.forget(panel_id);
                return Err(PipelineError::not_found("panel", panel_id));
            }
        };
        let outcome = mutate(&mut panel)?;
        self.repository.update(panel.clone())?;
        Ok((outcome, panel))
    }

    /// Number of panels with a registered lock.
    #[cfg(test)]
    pub(crate) fn locked_panels(&self) -> usize {
        self.locks.len()
    }

    /// Merges the supplied fields into the stored panel; omitted fields are kept.
    pub fn update_panel(
        &self,
        panel_id: &PanelId,
        patch: PanelPatch,
    ) -> Result<Panel, PipelineError> {
        let (_, panel) = self.with_panel(panel_id, |panel| panel.apply(patch))?;
        info!(%panel_id, members = panel.members.len(), "panel updated");
        Ok(panel)
    }

    /// Removes a panel with all of its availability. Workflows that booked one of its slots
    /// keep their own record of the booking.
    pub fn delete_panel(&self, panel_id: &PanelId) -> Result<Panel, PipelineError> {
        self.panel(panel_id)?;
        let handle = self.locks.handle(panel_id);
        let removed = {
            let _guard = handle.lock().expect("panel lock poisoned");
            let stored = self.repository.fetch(panel_id)?;
            if stored.is_some() {
                self.repository.delete(panel_id)?;
            }
            self.locks.forget(panel_id);
            stored.ok_or_else(|| PipelineError::not_found("panel", panel_id))?
        };

        let booked: usize = removed
            .availability
            .iter()
            .map(DateAvailability::booked_count)
            .sum();
        if booked > 0 {
            warn!(%panel_id, booked, "panel deleted while holding booked slots");
        }
        info!(%panel_id, "panel deleted");
        Ok(removed)
    }

    /// Replaces the slots for `date` wholesale, or adds the date when it is new.
    pub fn upsert_availability(
        &self,
        panel_id: &PanelId,
        date: NaiveDate,
        windows: Vec<SlotWindow>,
    ) -> Result<Panel, PipelineError> {
        validate_windows("time_slots", &windows)?;

        let slots: Vec<TimeSlot> = windows.into_iter().map(TimeSlot::open).collect();
        let (replaced, panel) = self.with_panel(panel_id, |panel| Ok(panel.put_day(date, slots)))?;

        match replaced {
            Some(previous) => {
                let booked = previous.iter().filter(|slot| slot.is_booked).count();
                if booked > 0 {
                    warn!(
                        %panel_id,
                        %date,
                        booked,
                        "availability replaced a day that held booked slots"
                    );
                }
                debug!(%panel_id, %date, "availability replaced");
            }
            None => debug!(%panel_id, %date, "availability added"),
        }

        Ok(panel)
    }

    /// Unbooked slots for every date in `start..=end`; fully booked dates are omitted.
    pub fn query_available(
        &self,
        panel_id: &PanelId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DateAvailability>, PipelineError> {
        if start > end {
            return Err(PipelineError::validation(
                "end_date",
                "end date must not be before start date",
            ));
        }

        let panel = self.panel(panel_id)?;
        Ok(panel
            .availability
            .iter()
            .filter(|entry| entry.date >= start && entry.date <= end)
            .filter_map(DateAvailability::open_slots)
            .collect())
    }

    /// Marks a slot as booked by `workflow_id`. At most one concurrent caller succeeds.
    pub fn book_slot(
        &self,
        panel_id: &PanelId,
        date: NaiveDate,
        slot_id: &SlotId,
        workflow_id: &WorkflowId,
    ) -> Result<TimeSlot, PipelineError> {
        let now = self.clock.now();
        let (booked, _) = self.with_panel(panel_id, |panel| {
            let day = panel
                .day_mut(date)
                .ok_or_else(|| PipelineError::not_found("availability", date))?;
            let slot = day
                .time_slots
                .iter_mut()
                .find(|slot| &slot.id == slot_id)
                .ok_or_else(|| PipelineError::not_found("time slot", slot_id))?;

            if slot.is_booked {
                warn!(
                    %panel_id,
                    %date,
                    %slot_id,
                    requested_by = %workflow_id,
                    "slot already booked"
                );
                return Err(PipelineError::SlotConflict {
                    panel_id: panel_id.clone(),
                    date,
                    slot_id: slot_id.clone(),
                });
            }

            slot.is_booked = true;
            slot.booked_by = Some(workflow_id.clone());
            slot.booked_at = Some(now);
            Ok(slot.clone())
        })?;

        info!(%panel_id, %date, %slot_id, %workflow_id, "slot booked");
        Ok(booked)
    }

    /// Undoes a booking made by `workflow_id`. Returns `false` when the slot is no longer
    /// held by that workflow (already released, replaced, or deleted).
    pub fn release_slot(
        &self,
        panel_id: &PanelId,
        date: NaiveDate,
        slot_id: &SlotId,
        workflow_id: &WorkflowId,
    ) -> Result<bool, PipelineError> {
        let (released, _) = self.with_panel(panel_id, |panel| {
            let slot = panel.day_mut(date).and_then(|day| {
                day.time_slots
                    .iter_mut()
                    .find(|slot| &slot.id == slot_id)
            });

            match slot {
                Some(slot) if slot.booked_by.as_ref() == Some(workflow_id) => {
                    slot.is_booked = false;
                    slot.booked_by = None;
                    slot.booked_at = None;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })?;

        if released {
            info!(%panel_id, %date, %slot_id, %workflow_id, "slot released");
        }
        Ok(released)
    }

    /// Removes a whole dated entry. Individual slots cannot be removed on their own.
    pub fn delete_availability(
        &self,
        panel_id: &PanelId,
        availability_id: &AvailabilityId,
    ) -> Result<Panel, PipelineError> {
        let (removed, panel) = self.with_panel(panel_id, |panel| {
            panel
                .remove_day(availability_id)
                .ok_or_else(|| PipelineError::not_found("availability", availability_id))
        })?;

        info!(
            %panel_id,
            date = %removed.date,
            booked = removed.booked_count(),
            "availability deleted"
        );
        Ok(panel)
    }

    /// Sets the weekly templates for `day_of_week` (0 = Sunday), replacing any existing rule.
    pub fn add_recurring_rule(
        &self,
        panel_id: &PanelId,
        day_of_week: u8,
        templates: Vec<SlotTemplate>,
    ) -> Result<Panel, PipelineError> {
        if day_of_week > 6 {
            return Err(PipelineError::validation(
                "day_of_week",
                "day of week must be 0-6 (0 = Sunday, 6 = Saturday)",
            ));
        }
        let windows: Vec<SlotWindow> = templates.iter().map(SlotTemplate::window).collect();
        validate_windows("time_slots", &windows)?;
        for (index, template) in templates.iter().enumerate() {
            let duration = template.slot_duration_minutes;
            if !(SlotTemplate::MIN_DURATION_MINUTES..=SlotTemplate::MAX_DURATION_MINUTES)
                .contains(&duration)
            {
                return Err(PipelineError::validation(
                    format!("time_slots[{index}].slot_duration_minutes"),
                    "slot duration must be between 15 and 480 minutes",
                ));
            }
        }

        let (_, panel) = self.with_panel(panel_id, |panel| {
            panel.put_rule(day_of_week, templates);
            Ok(())
        })?;

        info!(%panel_id, day_of_week, "recurring rule stored");
        Ok(panel)
    }
}
