use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use super::domain::{weekday_index, DateAvailability, Panel, PanelId, TimeSlot};
use super::repository::PanelRepository;
use super::store::SlotStore;
use crate::error::PipelineError;

/// Materialises weekly rules into dated availability ahead of time.
pub struct RecurringRuleExpander<R> {
    store: Arc<SlotStore<R>>,
}

impl<R> RecurringRuleExpander<R>
where
    R: PanelRepository + 'static,
{
    pub fn new(store: Arc<SlotStore<R>>) -> Self {
        Self { store }
    }

    /// Generates entries for every date in `start..=end` whose weekday has a rule and that
    /// has no entry yet. Existing dates, explicit or generated earlier, are never touched.
    ///
    /// The range may span at most the store's expansion limit.
    pub fn expand(
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
        let limit = self.store.expansion_limit_days();
        let span = (end - start).num_days() + 1;
        if span > i64::from(limit) {
            return Err(PipelineError::validation(
                "end_date",
                format!(
                    "date range spans {span} days; at most {limit} can be generated at once"
                ),
            ));
        }

        let (generated, _) = self
            .store
            .with_panel(panel_id, |panel| Ok(materialize(panel, start, end)))?;

        info!(
            %panel_id,
            %start,
            %end,
            generated = generated.len(),
            "recurring availability expanded"
        );
        Ok(generated)
    }
}

/// Adds fresh unbooked slots for each eligible date and returns the new entries.
fn materialize(
    panel: &mut Panel,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<DateAvailability> {
    let existing: HashSet<NaiveDate> =
        panel.availability.iter().map(|entry| entry.date).collect();

    let generated: Vec<DateAvailability> = start
        .iter_days()
        .take_while(|date| *date <= end)
        .filter(|date| !existing.contains(date))
        .filter_map(|date| {
            let rule = panel.rule_for(weekday_index(date))?;
            let slots: Vec<TimeSlot> = rule
                .templates
                .iter()
                .map(|template| TimeSlot::open(template.window()))
                .collect();
            Some(DateAvailability::new(date, slots))
        })
        .collect();

    panel.add_days(generated.iter().cloned());
    generated
}
