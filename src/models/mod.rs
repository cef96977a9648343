pub mod booking;
pub mod capacity_override;
pub mod service;
pub mod slot;

pub use booking::{Booking, BookingStatus, CancelActor};
pub use capacity_override::CapacityOverride;
pub use service::Service;
pub use slot::{DayAvailability, DaySummary, SlotAvailability, SlotStatus, SLOT_TIMES};
