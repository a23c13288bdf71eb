//! Interview panel availability: dated slots, weekly rules, and booking.

pub mod domain;
pub mod recurring;
pub mod repository;
pub mod router;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    AvailabilityId, DateAvailability, NewPanel, Panel, PanelId, PanelPatch, SlotId,
    SlotTemplate, SlotWindow, TimeOfDay, TimeSlot, WeekdayRule,
};
pub use recurring::RecurringRuleExpander;
pub use repository::PanelRepository;
pub use router::panel_router;
pub use store::SlotStore;
