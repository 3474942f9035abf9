pub mod availability;
pub mod booking;
pub mod occupancy;
pub mod schedule;
