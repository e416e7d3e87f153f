use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Teaching,
    Performance,
    Collaboration,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Teaching => "teaching",
            ServiceType::Performance => "performance",
            ServiceType::Collaboration => "collaboration",
        }
    }
}

/// Service-specific payload. The variant is chosen when the booking is created and never
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "service_type", rename_all = "lowercase")]
pub enum ServiceDetails {
    Teaching(TeachingDetails),
    Performance(PerformanceDetails),
    Collaboration(CollaborationDetails),
}

impl ServiceDetails {
    pub fn empty(service_type: ServiceType) -> Self {
        match service_type {
            ServiceType::Teaching => ServiceDetails::Teaching(TeachingDetails::default()),
            ServiceType::Performance => ServiceDetails::Performance(PerformanceDetails::default()),
            ServiceType::Collaboration => {
                ServiceDetails::Collaboration(CollaborationDetails::default())
            }
        }
    }

    pub fn service_type(&self) -> ServiceType {
        match self {
            ServiceDetails::Teaching(_) => ServiceType::Teaching,
            ServiceDetails::Performance(_) => ServiceType::Performance,
            ServiceDetails::Collaboration(_) => ServiceType::Collaboration,
        }
    }

    /// Short human label, used for calendar summaries.
    pub fn label(&self) -> String {
        match self {
            ServiceDetails::Teaching(t) => match &t.lesson_type {
                Some(lesson) => format!("{lesson} lesson"),
                None => "Lesson".to_string(),
            },
            ServiceDetails::Performance(p) => match &p.event_type {
                Some(event) => format!("Performance: {event}"),
                None => "Performance".to_string(),
            },
            ServiceDetails::Collaboration(c) => match &c.project_type {
                Some(project) => format!("Collaboration: {project}"),
                None => "Collaboration".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeachingDetails {
    pub lesson_type: Option<String>,
    pub skill_level: Option<SkillLevel>,
    pub session_count: u32,
    pub focus_areas: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Professional,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceDetails {
    pub event_type: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub venue: Option<String>,
    pub guest_count: Option<u32>,
    pub set_length_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaborationDetails {
    pub project_type: Option<String>,
    pub timeline: Option<String>,
    pub description: Option<String>,
    pub deliverables: Vec<String>,
}
