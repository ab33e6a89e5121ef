pub mod session;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use tracing::info;

use session::SessionKey;

/// Slot strings are minute-floored local timestamps, e.g. "2026-08-23 14:05".
pub const SLOT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// How many hourly candidates availability looks ahead.
const AVAILABILITY_WINDOW_HOURS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AgentType {
    Sales,
    Service,
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentType::Sales => write!(f, "Sales"),
            AgentType::Service => write!(f, "Service"),
        }
    }
}

impl FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sales" => Ok(AgentType::Sales),
            "service" => Ok(AgentType::Service),
            other => Err(format!("unknown agent type: {}", other)),
        }
    }
}

/// Outcome of a booking attempt, rendered verbatim to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    Confirmed {
        agent_type: AgentType,
        agent_name: String,
        slot: String,
    },
    SlotTaken(String),
    UnknownAgent(String),
    SessionRejected,
}

impl fmt::Display for BookingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingOutcome::Confirmed {
                agent_type,
                agent_name,
                slot,
            } => write!(
                f,
                "Appointment booked with {} ({}) at {}",
                agent_name, agent_type, slot
            ),
            BookingOutcome::SlotTaken(slot) => {
                write!(f, "Slot {} is already booked.", slot)
            }
            BookingOutcome::UnknownAgent(name) => {
                write!(f, "Agent {} not found.", name)
            }
            BookingOutcome::SessionRejected => write!(f, "Invalid or expired session."),
        }
    }
}

/// In-memory appointment calendar: per (pool, agent) an append-only list of
/// booked slot strings. Lives for the process lifetime, no persistence.
/// Constructed explicitly and passed into operations so tests get isolated
/// fixtures instead of process-wide state.
pub struct Calendar {
    pools: BTreeMap<AgentType, BTreeMap<String, Vec<String>>>,
}

impl Calendar {
    pub fn new() -> Self {
        Self {
            pools: BTreeMap::new(),
        }
    }

    /// The demo roster: three sales agents, three service advisors.
    pub fn with_demo_roster() -> Self {
        let mut calendar = Self::new();
        for name in ["Sarah Johnson", "Mike Rodriguez", "Jennifer Chen"] {
            calendar.register(AgentType::Sales, name);
        }
        for name in ["Tom Wilson", "Lisa Martinez", "David Park"] {
            calendar.register(AgentType::Service, name);
        }
        calendar
    }

    pub fn register(&mut self, agent_type: AgentType, agent_name: &str) {
        self.pools
            .entry(agent_type)
            .or_default()
            .entry(agent_name.to_string())
            .or_default();
    }

    pub fn roster(&self, agent_type: AgentType) -> Vec<String> {
        self.pools
            .get(&agent_type)
            .map(|pool| pool.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn booked(&self, agent_type: AgentType, agent_name: &str) -> Option<&Vec<String>> {
        self.pools.get(&agent_type)?.get(agent_name)
    }

    /// Next available slots for an agent: hourly candidates from now+1h to
    /// now+5h, minute-floored, minus slots already booked for that agent in
    /// that pool. Unknown agents get an empty list.
    pub fn availability(
        &self,
        agent_type: AgentType,
        agent_name: &str,
        now: NaiveDateTime,
    ) -> Vec<String> {
        let Some(booked) = self.booked(agent_type, agent_name) else {
            return Vec::new();
        };

        (1..=AVAILABILITY_WINDOW_HOURS)
            .map(|i| (now + Duration::hours(i)).format(SLOT_FORMAT).to_string())
            .filter(|slot| !booked.contains(slot))
            .collect()
    }

    /// Append-only booking: a slot goes from absent to present exactly once
    /// per (pool, agent); there is no cancellation path.
    pub fn book(
        &mut self,
        agent_type: AgentType,
        agent_name: &str,
        time_slot: &str,
    ) -> BookingOutcome {
        let Some(booked) = self
            .pools
            .get_mut(&agent_type)
            .and_then(|pool| pool.get_mut(agent_name))
        else {
            return BookingOutcome::UnknownAgent(agent_name.to_string());
        };

        if booked.iter().any(|s| s == time_slot) {
            return BookingOutcome::SlotTaken(time_slot.to_string());
        }

        booked.push(time_slot.to_string());
        info!(%agent_type, agent_name, time_slot, "appointment booked");
        BookingOutcome::Confirmed {
            agent_type,
            agent_name: agent_name.to_string(),
            slot: time_slot.to_string(),
        }
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new()
    }
}

/// Gate a booking on the caller's session token. A rejected token leaves the
/// calendar untouched.
pub fn book_appointment(
    key: &SessionKey,
    token: &str,
    calendar: &mut Calendar,
    agent_type: AgentType,
    agent_name: &str,
    time_slot: &str,
    now: NaiveDateTime,
) -> BookingOutcome {
    if !key.verify_session(token, now) {
        return BookingOutcome::SessionRejected;
    }
    calendar.book(agent_type, agent_name, time_slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2099, 1, 1)
            .unwrap()
            .and_hms_opt(9, 30, 45)
            .unwrap()
    }

    #[test]
    fn test_agent_type_round_trip() {
        assert_eq!("sales".parse::<AgentType>().unwrap(), AgentType::Sales);
        assert_eq!("Service".parse::<AgentType>().unwrap(), AgentType::Service);
        assert!("parts".parse::<AgentType>().is_err());
        assert_eq!(AgentType::Sales.to_string(), "Sales");
    }

    #[test]
    fn test_availability_five_hourly_slots_minute_floored() {
        let calendar = Calendar::with_demo_roster();
        let slots = calendar.availability(AgentType::Sales, "Sarah Johnson", fixed_now());
        assert_eq!(
            slots,
            vec![
                "2099-01-01 10:30",
                "2099-01-01 11:30",
                "2099-01-01 12:30",
                "2099-01-01 13:30",
                "2099-01-01 14:30",
            ]
        );
    }

    #[test]
    fn test_availability_excludes_booked_slots() {
        let mut calendar = Calendar::with_demo_roster();
        let outcome = calendar.book(AgentType::Sales, "Sarah Johnson", "2099-01-01 11:30");
        assert!(matches!(outcome, BookingOutcome::Confirmed { .. }));

        let slots = calendar.availability(AgentType::Sales, "Sarah Johnson", fixed_now());
        assert_eq!(slots.len(), 4);
        assert!(!slots.contains(&"2099-01-01 11:30".to_string()));
    }

    #[test]
    fn test_availability_scoped_to_pool() {
        // Booking under Service must not shadow a same-named Sales agent.
        let mut calendar = Calendar::new();
        calendar.register(AgentType::Sales, "Alex Kim");
        calendar.register(AgentType::Service, "Alex Kim");
        calendar.book(AgentType::Service, "Alex Kim", "2099-01-01 10:30");

        let slots = calendar.availability(AgentType::Sales, "Alex Kim", fixed_now());
        assert!(slots.contains(&"2099-01-01 10:30".to_string()));
    }

    #[test]
    fn test_availability_unknown_agent_is_empty() {
        let calendar = Calendar::with_demo_roster();
        assert!(calendar
            .availability(AgentType::Sales, "Nobody", fixed_now())
            .is_empty());
    }

    #[test]
    fn test_double_booking_conflicts() {
        let mut calendar = Calendar::with_demo_roster();
        let slot = "2099-01-01 10:00";

        let first = calendar.book(AgentType::Sales, "Sarah Johnson", slot);
        let message = first.to_string();
        assert!(message.contains("Sarah Johnson"));
        assert!(message.contains("Sales"));

        let second = calendar.book(AgentType::Sales, "Sarah Johnson", slot);
        assert_eq!(second, BookingOutcome::SlotTaken(slot.to_string()));
        assert!(second.to_string().contains("already booked"));

        // Exactly one entry for the slot.
        let booked = calendar.booked(AgentType::Sales, "Sarah Johnson").unwrap();
        assert_eq!(booked.iter().filter(|s| *s == slot).count(), 1);
    }

    #[test]
    fn test_book_unknown_agent() {
        let mut calendar = Calendar::with_demo_roster();
        let outcome = calendar.book(AgentType::Service, "Sarah Johnson", "2099-01-01 10:00");
        assert_eq!(
            outcome,
            BookingOutcome::UnknownAgent("Sarah Johnson".to_string())
        );
        assert!(outcome.to_string().contains("not found"));
    }

    #[test]
    fn test_book_appointment_rejects_bad_session() {
        let key = SessionKey::from_secret("booking-secret");
        let mut calendar = Calendar::with_demo_roster();

        let outcome = book_appointment(
            &key,
            "not-a-token",
            &mut calendar,
            AgentType::Sales,
            "Sarah Johnson",
            "2099-01-01 10:00",
            fixed_now(),
        );
        assert_eq!(outcome, BookingOutcome::SessionRejected);

        // No state change on rejection.
        assert!(calendar
            .booked(AgentType::Sales, "Sarah Johnson")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_book_appointment_with_valid_session() {
        let key = SessionKey::from_secret("booking-secret");
        let mut calendar = Calendar::with_demo_roster();
        let token = key.create_session("visitor-1", fixed_now());

        let outcome = book_appointment(
            &key,
            &token,
            &mut calendar,
            AgentType::Sales,
            "Sarah Johnson",
            "2099-01-01 10:00",
            fixed_now(),
        );
        assert!(matches!(outcome, BookingOutcome::Confirmed { .. }));
    }
}
