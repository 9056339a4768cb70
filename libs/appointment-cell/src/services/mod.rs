pub mod availability;
pub mod booking;
pub mod emergency;
pub mod repository;
pub mod reschedule;
pub mod settings;
pub mod slots;
pub mod swap;

pub use availability::{compute_availability, AvailabilityService};
pub use booking::AppointmentBookingService;
pub use emergency::{select_emergency_slot, EmergencyAllocator};
pub use reschedule::RescheduleService;
pub use settings::SettingsStore;
pub use slots::generate_slots;
pub use swap::SwapService;
