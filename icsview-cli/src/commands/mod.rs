pub mod events;
pub mod month;
pub mod year;
