pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export the engine surface for external use
pub use models::*;
pub use services::availability::AvailabilityService;
pub use services::booking::BookingService;
pub use services::occupancy::OccupancyIndex;
pub use services::schedule::ScheduleResolver;
