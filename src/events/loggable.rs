use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Severity of an activity log entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Role, key and deletion events
    Critical,
    #[default]
    Important,
    Noise,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Important => "important",
            Severity::Noise => "noise",
        }
    }
}

/// Implemented by every record that shows up in the activity log.
pub trait Loggable: Serialize + Send + Sync {
    /// Prefix of the event name, e.g. "schedule" in "schedule.created"
    fn entity_type() -> &'static str;

    fn subject_id(&self) -> String;

    fn severity(&self) -> Severity {
        Severity::Important
    }

    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            "deleted" => Severity::Critical,
            _ => self.severity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Thing;

    impl Loggable for Thing {
        fn entity_type() -> &'static str { "thing" }
        fn subject_id(&self) -> String { "T1".into() }
    }

    #[test]
    fn deletes_are_critical() {
        assert_eq!(Thing.severity_for_action("deleted"), Severity::Critical);
        assert_eq!(Thing.severity_for_action("created"), Severity::Important);
        assert_eq!(Thing.severity_for_action("checkin"), Severity::Important);
    }

    #[derive(Serialize)]
    struct Grant;

    impl Loggable for Grant {
        fn entity_type() -> &'static str { "grant" }
        fn subject_id(&self) -> String { "G1".into() }
        fn severity(&self) -> Severity { Severity::Critical }
    }

    #[test]
    fn other_actions_keep_the_entity_severity() {
        assert_eq!(Grant.severity_for_action("granted"), Severity::Critical);
        assert_eq!(Grant.severity_for_action("revoked"), Severity::Critical);
        assert_eq!(Severity::Noise.as_str(), "noise");
    }
}
