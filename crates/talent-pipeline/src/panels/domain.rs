use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::refs::UserRef;
use crate::workflows::domain::WorkflowId;

static PANEL_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static AVAILABILITY_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static SLOT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Identifier wrapper for interview panels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PanelId(pub String);

impl PanelId {
    pub(crate) fn next() -> Self {
        let id = PANEL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("panel-{id:06}"))
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one dated availability entry on a panel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailabilityId(pub String);

impl AvailabilityId {
    pub(crate) fn next() -> Self {
        let id = AVAILABILITY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("avail-{id:06}"))
    }
}

impl fmt::Display for AvailabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Slot identifier; only unique within the owning [`DateAvailability`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId(pub String);

impl SlotId {
    pub(crate) fn next() -> Self {
        let id = SLOT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("slot-{id:06}"))
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Zero-padded 24-hour "HH:MM" value.
///
/// Input may omit the leading zero of the hour (`9:30`); it is normalised on parse so
/// ordering matches a lexicographic comparison of the padded strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let invalid = || format!("'{raw}' is not a valid HH:MM time");
        let (hour, minute) = raw.trim().split_once(':').ok_or_else(invalid)?;
        let digits = |part: &str, max_len: usize| {
            !part.is_empty() && part.len() <= max_len && part.bytes().all(|b| b.is_ascii_digit())
        };
        if !digits(hour, 2) || minute.len() != 2 || !digits(minute, 2) {
            return Err(invalid());
        }
        let hour = hour.parse::<u8>().map_err(|_| invalid())?;
        let minute = minute.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    pub fn as_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN)
    }

    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.as_naive_time())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Requested start/end pair submitted for a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotWindow {
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

impl SlotWindow {
    pub fn new(start_time: TimeOfDay, end_time: TimeOfDay) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    pub fn label(&self) -> String {
        format!("{} - {}", self.start_time, self.end_time)
    }
}

/// Concrete bookable interval owned by a [`DateAvailability`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: SlotId,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub is_booked: bool,
    /// Non-owning back-reference kept for lookup and audit only.
    pub booked_by: Option<WorkflowId>,
    pub booked_at: Option<NaiveDateTime>,
}

impl TimeSlot {
    pub fn open(window: SlotWindow) -> Self {
        Self {
            id: SlotId::next(),
            start_time: window.start_time,
            end_time: window.end_time,
            is_booked: false,
            booked_by: None,
            booked_at: None,
        }
    }

    pub fn window(&self) -> SlotWindow {
        SlotWindow::new(self.start_time, self.end_time)
    }
}

/// All slots offered by a panel on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateAvailability {
    pub id: AvailabilityId,
    pub date: NaiveDate,
    pub time_slots: Vec<TimeSlot>,
}

impl DateAvailability {
    pub fn slot(&self, slot_id: &SlotId) -> Option<&TimeSlot> {
        self.time_slots.iter().find(|slot| &slot.id == slot_id)
    }

    pub(crate) fn new(date: NaiveDate, time_slots: Vec<TimeSlot>) -> Self {
        Self {
            id: AvailabilityId::next(),
            date,
            time_slots,
        }
    }

    pub fn booked_count(&self) -> usize {
        self.time_slots.iter().filter(|slot| slot.is_booked).count()
    }

    /// Copy of this entry restricted to unbooked slots, or `None` when none remain.
    pub fn open_slots(&self) -> Option<DateAvailability> {
        let time_slots: Vec<TimeSlot> = self
            .time_slots
            .iter()
            .filter(|slot| !slot.is_booked)
            .cloned()
            .collect();

        (!time_slots.is_empty()).then(|| DateAvailability {
            id: self.id.clone(),
            date: self.date,
            time_slots,
        })
    }
}

/// Template copied into each generated slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotTemplate {
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    #[serde(default = "SlotTemplate::default_duration")]
    pub slot_duration_minutes: u16,
}

impl SlotTemplate {
    pub const MIN_DURATION_MINUTES: u16 = 15;
    pub const MAX_DURATION_MINUTES: u16 = 480;

    pub fn new(start_time: TimeOfDay, end_time: TimeOfDay) -> Self {
        Self {
            start_time,
            end_time,
            slot_duration_minutes: Self::default_duration(),
        }
    }

    fn default_duration() -> u16 {
        60
    }

    pub fn window(&self) -> SlotWindow {
        SlotWindow::new(self.start_time, self.end_time)
    }
}

/// Weekly template for one weekday, 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayRule {
    pub day_of_week: u8,
    pub templates: Vec<SlotTemplate>,
}

/// Sunday-based weekday index used by recurring rules.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Request payload for creating a panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPanel {
    pub name: String,
    pub description: String,
    pub members: Vec<UserRef>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Partial panel update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub members: Option<Vec<UserRef>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Pool of interviewers with explicit dated availability and weekly rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    pub id: PanelId,
    pub name: String,
    pub description: String,
    pub members: Vec<UserRef>,
    /// Sorted by date, at most one entry per date.
    pub availability: Vec<DateAvailability>,
    /// At most one rule per weekday.
    pub recurring_availability: Vec<WeekdayRule>,
    pub timezone: String,
    pub is_active: bool,
}

impl Panel {
    pub fn from_request(request: NewPanel) -> Result<Self, PipelineError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(PipelineError::validation("name", "panel name is required"));
        }
        let description = request.description.trim();
        if description.is_empty() {
            return Err(PipelineError::validation(
                "description",
                "description is required",
            ));
        }
        if request.members.is_empty() {
            return Err(PipelineError::validation(
                "members",
                "at least one member is required",
            ));
        }

        Ok(Self {
            id: PanelId::next(),
            name: name.to_string(),
            description: description.to_string(),
            members: request.members,
            availability: Vec::new(),
            recurring_availability: Vec::new(),
            timezone: request.timezone.unwrap_or_else(|| "UTC".to_string()),
            is_active: true,
        })
    }

    /// Validates the whole patch before touching any field.
    pub(crate) fn apply(&mut self, patch: PanelPatch) -> Result<(), PipelineError> {
        let name = patch.name.as_deref().map(str::trim);
        if name.is_some_and(str::is_empty) {
            return Err(PipelineError::validation("name", "panel name cannot be empty"));
        }
        let description = patch.description.as_deref().map(str::trim);
        if description.is_some_and(str::is_empty) {
            return Err(PipelineError::validation(
                "description",
                "description cannot be empty",
            ));
        }
        if patch.members.as_ref().is_some_and(Vec::is_empty) {
            return Err(PipelineError::validation(
                "members",
                "at least one member is required",
            ));
        }

        if let Some(name) = name {
            self.name = name.to_string();
        }
        if let Some(description) = description {
            self.description = description.to_string();
        }
        if let Some(members) = patch.members {
            self.members = members;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        Ok(())
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DateAvailability> {
        self.availability.iter().find(|entry| entry.date == date)
    }

    pub(crate) fn day_mut(&mut self, date: NaiveDate) -> Option<&mut DateAvailability> {
        self.availability.iter_mut().find(|entry| entry.date == date)
    }

    pub fn rule_for(&self, day_of_week: u8) -> Option<&WeekdayRule> {
        self.recurring_availability
            .iter()
            .find(|rule| rule.day_of_week == day_of_week)
    }

    /// Replaces the slot list for `date`, or inserts a new entry in date order.
    ///
    /// Returns the replaced slots when an entry already existed.
    pub(crate) fn put_day(
        &mut self,
        date: NaiveDate,
        time_slots: Vec<TimeSlot>,
    ) -> Option<Vec<TimeSlot>> {
        if let Some(existing) = self.day_mut(date) {
            return Some(std::mem::replace(&mut existing.time_slots, time_slots));
        }

        let position = self
            .availability
            .partition_point(|entry| entry.date < date);
        self.availability
            .insert(position, DateAvailability::new(date, time_slots));
        None
    }

    /// Adds entries for dates that have none yet, restoring date order once at the end.
    pub(crate) fn add_days(&mut self, entries: impl IntoIterator<Item = DateAvailability>) {
        self.availability.extend(entries);
        self.availability.sort_by_key(|entry| entry.date);
    }

    pub(crate) fn remove_day(&mut self, id: &AvailabilityId) -> Option<DateAvailability> {
        let index = self.availability.iter().position(|entry| &entry.id == id)?;
        Some(self.availability.remove(index))
    }

    /// Replaces the templates of the rule for `day_of_week`, or appends a new rule.
    pub(crate) fn put_rule(&mut self, day_of_week: u8, templates: Vec<SlotTemplate>) {
        match self
            .recurring_availability
            .iter_mut()
            .find(|rule| rule.day_of_week == day_of_week)
        {
            Some(rule) => rule.templates = templates,
            None => self.recurring_availability.push(WeekdayRule {
                day_of_week,
                templates,
            }),
        }
    }
}

/// Checks the ordering invariant on a batch of windows before anything is written.
pub fn validate_windows(field: &str, windows: &[SlotWindow]) -> Result<(), PipelineError> {
    if windows.is_empty() {
        return Err(PipelineError::validation(
            field,
            "at least one time slot is required",
        ));
    }

    for (index, window) in windows.iter().enumerate() {
        if window.start_time >= window.end_time {
            return Err(PipelineError::validation(
                format!("{field}[{index}]"),
                format!(
                    "invalid time slot {}: start time must be before end time",
                    window.label()
                ),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(raw: &str) -> TimeOfDay {
        TimeOfDay::parse(raw).expect("valid time")
    }

    #[test]
    fn time_of_day_normalises_single_digit_hours() {
        assert_eq!(time("9:05").to_string(), "09:05");
        assert!(time("9:05") < time("10:00"));
    }

    #[test]
    fn time_of_day_rejects_out_of_range_values() {
        for raw in ["24:00", "12:60", "12-30", "1230", "12:5", "ab:cd", ""] {
            assert!(TimeOfDay::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn time_of_day_serializes_as_padded_string() {
        let json = serde_json::to_string(&time("7:30")).expect("serializes");
        assert_eq!(json, "\"07:30\"");
        let parsed: TimeOfDay = serde_json::from_str("\"18:45\"").expect("deserializes");
        assert_eq!(parsed, time("18:45"));
        assert!(serde_json::from_str::<TimeOfDay>("\"25:00\"").is_err());
    }

    #[test]
    fn weekday_index_starts_on_sunday() {
        let sunday = NaiveDate::from_ymd_opt(2024, 6, 2).expect("valid date");
        let monday = NaiveDate::from_ymd_opt(2024, 6, 3).expect("valid date");
        assert_eq!(weekday_index(sunday), 0);
        assert_eq!(weekday_index(monday), 1);
    }

    #[test]
    fn validate_windows_reports_offending_index() {
        let windows = vec![
            SlotWindow::new(time("09:00"), time("10:00")),
            SlotWindow::new(time("11:00"), time("11:00")),
        ];
        match validate_windows("time_slots", &windows) {
            Err(PipelineError::Validation { field, .. }) => assert_eq!(field, "time_slots[1]"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn put_day_keeps_entries_sorted_and_unique() {
        let mut panel = Panel::from_request(NewPanel {
            name: "Platform".to_string(),
            description: "Backend interviews".to_string(),
            members: vec![UserRef("u-1".to_string())],
            timezone: None,
        })
        .expect("valid panel");
        let later = NaiveDate::from_ymd_opt(2024, 6, 10).expect("valid date");
        let earlier = NaiveDate::from_ymd_opt(2024, 6, 3).expect("valid date");
        let window = SlotWindow::new(time("09:00"), time("10:00"));

        assert!(panel.put_day(later, vec![TimeSlot::open(window)]).is_none());
        assert!(panel.put_day(earlier, vec![TimeSlot::open(window)]).is_none());
        let replaced = panel.put_day(later, vec![TimeSlot::open(window), TimeSlot::open(window)]);

        assert_eq!(replaced.map(|slots| slots.len()), Some(1));
        let dates: Vec<NaiveDate> = panel.availability.iter().map(|entry| entry.date).collect();
        assert_eq!(dates, vec![earlier, later]);
        assert_eq!(panel.day(later).map(|entry| entry.time_slots.len()), Some(2));
    }

    #[test]
    fn panel_requires_members() {
        let result = Panel::from_request(NewPanel {
            name: "Platform".to_string(),
            description: "Backend interviews".to_string(),
            members: Vec::new(),
            timezone: None,
        });
        assert!(matches!(
            result,
            Err(PipelineError::Validation { ref field, .. }) if field == "members"
        ));
    }
}
