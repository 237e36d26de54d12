use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Notification frequency class. Each class maps to a fixed-length window;
/// `Monthly` is a flat 30 days, not a calendar month. The upstream system
/// compared raw millisecond deltas against fixed thresholds and that
/// behavior is kept as-is.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
	Daily,
	Weekly,
	Monthly,
}
impl Cadence {
	pub fn window(self) -> Duration {
		match self {
			Self::Daily => Duration::hours(24),
			Self::Weekly => Duration::days(7),
			Self::Monthly => Duration::days(30),
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Daily => "daily",
			Self::Weekly => "weekly",
			Self::Monthly => "monthly",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"daily" => Some(Self::Daily),
			"weekly" => Some(Self::Weekly),
			"monthly" => Some(Self::Monthly),
			_ => None,
		}
	}
}

/// Whether a saved search's cadence window has elapsed at `now`. A search
/// that never fired is due immediately once notifications are enabled.
pub fn is_due(
	notifications_enabled: bool,
	cadence: Cadence,
	last_fired_at: Option<OffsetDateTime>,
	now: OffsetDateTime,
) -> bool {
	if !notifications_enabled {
		return false;
	}

	match last_fired_at {
		None => true,
		Some(fired) => now - fired >= cadence.window(),
	}
}
