use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::models::{Booking, BookingValidation, ServiceDetails};
use crate::services::pricing;

/// Accumulates rule outcomes. Required rules feed the completeness score; recommended rules
/// only produce warnings.
#[derive(Default)]
struct Rules {
    errors: BTreeMap<String, String>,
    warnings: BTreeMap<String, String>,
    required: u32,
    satisfied: u32,
}

impl Rules {
    fn required(&mut self, field: &str, ok: bool, message: &str) {
        self.required += 1;
        if ok {
            self.satisfied += 1;
        } else {
            self.errors
                .entry(field.to_string())
                .or_insert_with(|| message.to_string());
        }
    }

    fn recommended(&mut self, field: &str, ok: bool, message: &str) {
        if !ok {
            self.warnings
                .entry(field.to_string())
                .or_insert_with(|| message.to_string());
        }
    }

    fn finish(self) -> BookingValidation {
        let completeness = if self.required == 0 {
            100
        } else {
            (f64::from(self.satisfied) * 100.0 / f64::from(self.required)).round() as u8
        };
        BookingValidation {
            is_valid: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
            completeness,
        }
    }
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Scores a booking against the rule set for its service type. Safe to call in any status.
pub fn validate(booking: &Booking) -> BookingValidation {
    let mut rules = Rules::default();

    let customer = &booking.customer;
    rules.required(
        "customer.name",
        !customer.name.trim().is_empty(),
        "name is required",
    );
    if customer.email.trim().is_empty() {
        rules.required("customer.email", false, "email is required");
    } else {
        rules.required(
            "customer.email",
            customer.has_valid_email(),
            "email address is not valid",
        );
    }
    rules.recommended(
        "customer.phone",
        !customer.phone.trim().is_empty(),
        "a phone number helps with day-of-service contact",
    );

    match &booking.service {
        ServiceDetails::Teaching(t) => {
            rules.required("service.lesson_type", filled(&t.lesson_type), "lesson type is required");
            rules.required(
                "service.skill_level",
                t.skill_level.is_some(),
                "skill level is required",
            );
            rules.recommended(
                "service.session_count",
                t.session_count > 0,
                "number of sessions not specified",
            );
        }
        ServiceDetails::Performance(p) => {
            rules.required("service.event_type", filled(&p.event_type), "event type is required");
            rules.required("service.event_date", p.event_date.is_some(), "event date is required");
            rules.required("service.venue", filled(&p.venue), "venue is required");
            rules.recommended(
                "service.guest_count",
                p.guest_count.is_some(),
                "expected guest count not specified",
            );
        }
        ServiceDetails::Collaboration(c) => {
            rules.required(
                "service.project_type",
                filled(&c.project_type),
                "project type is required",
            );
            rules.required("service.timeline", filled(&c.timeline), "timeline is required");
            rules.recommended(
                "service.description",
                filled(&c.description),
                "a project description helps with scoping",
            );
        }
    }

    let pricing_info = &booking.pricing;
    rules.required(
        "pricing.base_price",
        pricing_info.base_price > Decimal::ZERO,
        "base price must be greater than zero",
    );
    rules.recommended(
        "pricing.discounts",
        pricing::discount_total(pricing_info) <= pricing::subtotal(pricing_info),
        "discounts exceed the subtotal; total is floored at zero",
    );
    if let Some(schedule) = &pricing_info.payment_schedule {
        let scheduled = schedule
            .iter()
            .try_fold(Decimal::ZERO, |acc, i| acc.checked_add(i.amount));
        rules.recommended(
            "pricing.payment_schedule",
            scheduled == Some(pricing_info.total_price),
            "installments do not add up to the total price",
        );
    }

    rules.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BookingStatus, CollaborationDetails, CustomerInfo, Discount, Installment,
        PerformanceDetails, PricingInfo, ServiceType, SkillLevel, TeachingDetails,
    };
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    fn booking(service: ServiceDetails) -> Booking {
        let now = NaiveDateTime::parse_from_str("2025-06-01 09:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        Booking {
            id: "bkg_test".to_string(),
            customer: CustomerInfo::default(),
            service,
            pricing: PricingInfo::new("USD"),
            appointment: None,
            payment: None,
            status: BookingStatus::Draft,
            notes: String::new(),
            metadata: Default::default(),
            created_at: now,
            updated_at: now,
        }
    }

    fn complete_customer() -> CustomerInfo {
        CustomerInfo {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            phone: "+15551110000".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_draft_is_invalid_with_zero_completeness() {
        let v = validate(&booking(ServiceDetails::empty(ServiceType::Teaching)));
        assert!(!v.is_valid);
        assert_eq!(v.completeness, 0);
        assert!(v.errors.contains_key("customer.name"));
        assert!(v.errors.contains_key("customer.email"));
        assert!(v.errors.contains_key("service.lesson_type"));
        assert!(v.errors.contains_key("service.skill_level"));
        assert!(v.errors.contains_key("pricing.base_price"));
        assert!(v.warnings.contains_key("customer.phone"));
    }

    #[test]
    fn test_complete_teaching_booking_is_valid() {
        let mut b = booking(ServiceDetails::Teaching(TeachingDetails {
            lesson_type: Some("Piano".to_string()),
            skill_level: Some(SkillLevel::Beginner),
            session_count: 4,
            focus_areas: vec![],
        }));
        b.customer = complete_customer();
        b.pricing.base_price = dec!(200);
        b.pricing.total_price = dec!(200);

        let v = validate(&b);
        assert!(v.is_valid, "unexpected errors: {:?}", v.errors);
        assert_eq!(v.completeness, 100);
        assert!(v.warnings.is_empty());
    }

    #[test]
    fn test_completeness_denominator_follows_service_type() {
        // teaching: 2 customer + 2 service + 1 pricing = 5 required
        let mut b = booking(ServiceDetails::empty(ServiceType::Teaching));
        b.customer = complete_customer();
        assert_eq!(validate(&b).completeness, 40);

        // performance: 2 customer + 3 service + 1 pricing = 6 required
        let mut b = booking(ServiceDetails::empty(ServiceType::Performance));
        b.customer = complete_customer();
        assert_eq!(validate(&b).completeness, 33);
    }

    #[test]
    fn test_invalid_email_is_an_error() {
        let mut b = booking(ServiceDetails::empty(ServiceType::Collaboration));
        b.customer = complete_customer();
        b.customer.email = "not-an-email".to_string();
        let v = validate(&b);
        assert_eq!(
            v.errors.get("customer.email").map(String::as_str),
            Some("email address is not valid")
        );
    }

    #[test]
    fn test_performance_rules() {
        let mut b = booking(ServiceDetails::Performance(PerformanceDetails {
            event_type: Some("wedding".to_string()),
            event_date: NaiveDate::from_ymd_opt(2025, 9, 20),
            venue: None,
            guest_count: None,
            set_length_minutes: None,
        }));
        b.customer = complete_customer();
        b.pricing.base_price = dec!(900);

        let v = validate(&b);
        assert!(!v.is_valid);
        assert_eq!(v.errors.len(), 1);
        assert!(v.errors.contains_key("service.venue"));
        assert!(v.warnings.contains_key("service.guest_count"));
    }

    #[test]
    fn test_collaboration_recommendations_do_not_affect_validity() {
        let mut b = booking(ServiceDetails::Collaboration(CollaborationDetails {
            project_type: Some("album".to_string()),
            timeline: Some("3 months".to_string()),
            description: None,
            deliverables: vec![],
        }));
        b.customer = complete_customer();
        b.pricing.base_price = dec!(1500);

        let v = validate(&b);
        assert!(v.is_valid);
        assert!(v.warnings.contains_key("service.description"));
    }

    #[test]
    fn test_pricing_warnings() {
        let mut b = booking(ServiceDetails::Teaching(TeachingDetails {
            lesson_type: Some("Voice".to_string()),
            skill_level: Some(SkillLevel::Advanced),
            session_count: 1,
            focus_areas: vec![],
        }));
        b.customer = complete_customer();
        b.pricing.base_price = dec!(100);
        b.pricing.discounts = vec![Discount::Fixed {
            amount: dec!(150),
            description: "comp".to_string(),
        }];
        b.pricing.total_price = dec!(0);
        b.pricing.payment_schedule = Some(vec![Installment {
            due_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            amount: dec!(50),
            paid: false,
        }]);

        let v = validate(&b);
        assert!(v.is_valid);
        assert!(v.warnings.contains_key("pricing.discounts"));
        assert!(v.warnings.contains_key("pricing.payment_schedule"));
    }

    #[test]
    fn test_overflowing_installments_warn_instead_of_panicking() {
        let mut b = booking(ServiceDetails::Teaching(TeachingDetails {
            lesson_type: Some("Voice".to_string()),
            ..Default::default()
        }));
        b.customer = complete_customer();
        b.pricing.base_price = dec!(100);
        b.pricing.total_price = dec!(100);
        let due = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        b.pricing.payment_schedule = Some(vec![
            Installment { due_date: due, amount: Decimal::MAX, paid: false },
            Installment { due_date: due, amount: Decimal::MAX, paid: false },
        ]);

        let v = validate(&b);
        assert!(v.warnings.contains_key("pricing.payment_schedule"));
    }
}
