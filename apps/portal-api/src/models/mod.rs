pub mod candidate;
pub mod job;
pub mod report;
pub mod ticket;
