pub mod autosave;
pub mod calendar;
pub mod clock;
pub mod lifecycle;
pub mod notifications;
pub mod payment;
pub mod pricing;
pub mod registry;
pub mod scheduling;
pub mod store;
pub mod validation;
