pub mod appointment;
pub mod booking;
pub mod customer;
pub mod payment;
pub mod pricing;
pub mod service;
pub mod validation;

pub use appointment::{
    AppointmentInfo, AppointmentStatus, LocationType, ReminderRecord, RescheduleEntry,
    RescheduleInitiator,
};
pub use booking::{Booking, BookingStatus};
pub use customer::{Address, ContactChannel, CustomerInfo};
pub use payment::{PaymentInfo, PaymentMethod, PaymentMethodKind, PaymentStatus, RefundRecord};
pub use pricing::{Discount, Installment, PriceAdjustment, PricingInfo};
pub use service::{
    CollaborationDetails, PerformanceDetails, ServiceDetails, ServiceType, SkillLevel,
    TeachingDetails,
};
pub use validation::BookingValidation;
