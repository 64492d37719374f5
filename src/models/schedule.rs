use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::events::{Loggable, Severity};

pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

// =============================================================================
// SHIFT EVENT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ShiftEventType {
    /// The assignee gives the shift up
    Drop,
    /// Someone takes over a dropped shift
    Pickup,
    /// The person on shift is present
    Checkin,
}

impl ShiftEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftEventType::Drop => "drop",
            ShiftEventType::Pickup => "pickup",
            ShiftEventType::Checkin => "checkin",
        }
    }
}

impl FromStr for ShiftEventType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop" => Ok(ShiftEventType::Drop),
            "pickup" => Ok(ShiftEventType::Pickup),
            "checkin" => Ok(ShiftEventType::Checkin),
            other => Err(AppError::internal(format!("unknown shift event type `{other}`"))),
        }
    }
}

/// A change applied to a shift. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShiftEvent {
    #[schema(example = 1717430400)]
    pub timestamp: i64,
    /// Midnight of the day the event applies to
    #[schema(example = 1717372800)]
    pub shift_date: i64,
    #[serde(rename = "type")]
    pub event_type: ShiftEventType,
    #[schema(example = "U1")]
    pub initiator: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbShiftEvent {
    pub shift_uuid: String,
    pub timestamp: i64,
    pub shift_date: i64,
    pub event_type: String,
    pub initiator: String,
}

impl TryFrom<DbShiftEvent> for ShiftEvent {
    type Error = AppError;

    fn try_from(value: DbShiftEvent) -> Result<Self, Self::Error> {
        Ok(ShiftEvent {
            timestamp: value.timestamp,
            shift_date: value.shift_date,
            event_type: value.event_type.parse()?,
            initiator: value.initiator,
        })
    }
}

// =============================================================================
// SHIFT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Shift {
    #[schema(example = "S1")]
    pub uuid: String,
    /// 0-indexed day of the week, Sunday is 0
    #[schema(example = 1)]
    pub day: u8,
    /// Seconds after midnight
    #[schema(example = 36000)]
    pub sec_start: i64,
    #[schema(example = 43200)]
    pub sec_end: i64,
    #[schema(example = "U1")]
    pub assignee: String,
    #[serde(default)]
    pub history: Vec<ShiftEvent>,
}

impl Shift {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.uuid.trim().is_empty() {
            return Err(AppError::bad_request("shift uuid must not be empty"));
        }
        if self.day > 6 {
            return Err(AppError::bad_request(format!(
                "shift day must be between 0 and 6, got {}",
                self.day
            )));
        }
        if self.sec_start < 0 || self.sec_end > SECONDS_PER_DAY || self.sec_start >= self.sec_end {
            return Err(AppError::bad_request(format!(
                "shift must start before it ends within one day, got {}..{}",
                self.sec_start, self.sec_end
            )));
        }
        Ok(())
    }

    pub fn has_event_by(&self, user_uuid: &str, event_type: ShiftEventType) -> bool {
        self.history
            .iter()
            .any(|e| e.initiator == user_uuid && e.event_type == event_type)
    }

    pub fn public(&self) -> PublicShift {
        PublicShift {
            day: self.day,
            sec_start: self.sec_start,
            sec_end: self.sec_end,
            assignee: self.assignee.clone(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbShift {
    pub uuid: String,
    pub schedule_uuid: String,
    pub day: i64,
    pub sec_start: i64,
    pub sec_end: i64,
    pub assignee: String,
}

impl DbShift {
    pub fn into_shift(self, history: Vec<ShiftEvent>) -> Result<Shift, AppError> {
        let day = u8::try_from(self.day)
            .map_err(|_| AppError::internal(format!("stored shift day out of range: {}", self.day)))?;
        Ok(Shift {
            uuid: self.uuid,
            day,
            sec_start: self.sec_start,
            sec_end: self.sec_end,
            assignee: self.assignee,
            history,
        })
    }
}

/// Shift data without uuid and history, safe to show publicly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PublicShift {
    pub day: u8,
    pub sec_start: i64,
    pub sec_end: i64,
    pub assignee: String,
}

// =============================================================================
// ALERT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    #[schema(example = "A1")]
    pub uuid: String,
    /// Shown regardless of its window
    #[serde(default)]
    pub default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_end: Option<i64>,
    #[schema(example = "Closed for maintenance")]
    pub header: String,
    #[schema(example = "The laser cutter room is closed until Friday.")]
    pub message: String,
}

impl Alert {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.uuid.trim().is_empty() {
            return Err(AppError::bad_request("alert uuid must not be empty"));
        }
        match (self.timestamp_start, self.timestamp_end) {
            (Some(start), Some(end)) if start >= end => Err(AppError::bad_request(
                "alert timestamp_start must be before timestamp_end",
            )),
            (Some(_), Some(_)) => Ok(()),
            _ if self.default => Ok(()),
            _ => Err(AppError::bad_request(
                "timestamp_start and timestamp_end are required unless the alert is default",
            )),
        }
    }

    /// Whether `now` falls in `[timestamp_start, timestamp_end)`.
    pub fn is_active_at(&self, now: i64) -> bool {
        match (self.timestamp_start, self.timestamp_end) {
            (Some(start), Some(end)) => start <= now && now < end,
            _ => false,
        }
    }
}

impl Loggable for Alert {
    fn entity_type() -> &'static str { "alert" }
    fn subject_id(&self) -> String { self.uuid.clone() }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbAlert {
    pub uuid: String,
    pub schedule_uuid: String,
    pub is_default: bool,
    pub timestamp_start: Option<i64>,
    pub timestamp_end: Option<i64>,
    pub header: String,
    pub message: String,
}

impl From<DbAlert> for Alert {
    fn from(db: DbAlert) -> Self {
        Alert {
            uuid: db.uuid,
            default: db.is_default,
            timestamp_start: db.timestamp_start,
            timestamp_end: db.timestamp_end,
            header: db.header,
            message: db.message,
        }
    }
}

// =============================================================================
// SCHEDULE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Schedule {
    #[schema(example = "SC1")]
    pub uuid: String,
    #[schema(example = 1717200000)]
    pub timestamp_start: i64,
    #[schema(example = 1725148800)]
    pub timestamp_end: i64,
    /// Set through the activate route, ignored on create and replace
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub shifts: Vec<Shift>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

impl Schedule {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.uuid.trim().is_empty() {
            return Err(AppError::bad_request("schedule uuid must not be empty"));
        }
        if self.timestamp_start >= self.timestamp_end {
            return Err(AppError::bad_request(
                "schedule timestamp_start must be before timestamp_end",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for shift in &self.shifts {
            shift.validate()?;
            if !seen.insert(shift.uuid.as_str()) {
                return Err(AppError::bad_request(format!(
                    "shift uuid `{}` appears more than once",
                    shift.uuid
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for alert in &self.alerts {
            alert.validate()?;
            if !seen.insert(alert.uuid.as_str()) {
                return Err(AppError::bad_request(format!(
                    "alert uuid `{}` appears more than once",
                    alert.uuid
                )));
            }
        }
        Ok(())
    }

    pub fn shift(&self, shift_uuid: &str) -> Option<&Shift> {
        self.shifts.iter().find(|s| s.uuid == shift_uuid)
    }

    pub fn alert(&self, alert_uuid: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.uuid == alert_uuid)
    }

    pub fn shifts_assigned_to(&self, user_uuid: &str) -> Vec<Shift> {
        self.shifts
            .iter()
            .filter(|s| s.assignee == user_uuid)
            .cloned()
            .collect()
    }

    pub fn shifts_with_event_by(&self, user_uuid: &str, event_type: ShiftEventType) -> Vec<Shift> {
        self.shifts
            .iter()
            .filter(|s| s.has_event_by(user_uuid, event_type))
            .cloned()
            .collect()
    }

    /// Alerts in their window at `now`, plus every default alert.
    pub fn alerts_at(&self, now: i64) -> Vec<Alert> {
        self.alerts
            .iter()
            .filter(|a| a.default || a.is_active_at(now))
            .cloned()
            .collect()
    }

    pub fn public_view(&self) -> PublicSchedule {
        PublicSchedule {
            shifts: self.shifts.iter().map(Shift::public).collect(),
        }
    }

    /// Overwrite the fields present in `patch`.
    pub fn apply(&mut self, patch: SchedulePatch) {
        if let Some(start) = patch.timestamp_start {
            self.timestamp_start = start;
        }
        if let Some(end) = patch.timestamp_end {
            self.timestamp_end = end;
        }
        if let Some(shifts) = patch.shifts {
            self.shifts = shifts;
        }
        if let Some(alerts) = patch.alerts {
            self.alerts = alerts;
        }
    }
}

impl Loggable for Schedule {
    fn entity_type() -> &'static str { "schedule" }
    fn subject_id(&self) -> String { self.uuid.clone() }

    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            // routine presence marks
            "checkin" => Severity::Noise,
            "deleted" => Severity::Critical,
            _ => self.severity(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbSchedule {
    pub uuid: String,
    pub timestamp_start: i64,
    pub timestamp_end: i64,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicSchedule {
    pub shifts: Vec<PublicShift>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SchedulePatch {
    pub timestamp_start: Option<i64>,
    pub timestamp_end: Option<i64>,
    pub shifts: Option<Vec<Shift>>,
    pub alerts: Option<Vec<Alert>>,
}

// =============================================================================
// REQUEST BODIES
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScheduleBody {
    pub schedule_obj: Schedule,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SchedulePatchBody {
    pub partial_schedule_obj: SchedulePatch,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShiftBody {
    pub shift_obj: Shift,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShiftEventBody {
    pub event_obj: ShiftEvent,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AlertBody {
    pub alert_obj: Alert,
}
