//! Geofence rules and first-match-wins rule selection.
//!
//! Rules are owned by the user-facing rule store; the monitor only reads them.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schedule::{ClockTime, DayOfWeek, TimeWindow};

/// Unique identifier for a geofence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(Uuid);

impl RuleId {
    /// Creates a new random rule ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for RuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the monitor does when a crossing is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Charge the default payment method immediately.
    AutoPay,
    /// Create a pending event and ask the driver to confirm.
    NotifyWithConfirm,
    /// Create a pending event and notify.
    NotifyOnly,
    /// Create a pending event without notifying.
    Silent,
}

impl RuleAction {
    /// Action used when no rule matches.
    pub const DEFAULT: Self = Self::NotifyWithConfirm;

    /// True if this action produces a notification.
    #[must_use]
    pub const fn notifies(self) -> bool {
        !matches!(self, Self::Silent)
    }
}

impl Default for RuleAction {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AutoPay => "auto_pay",
            Self::NotifyWithConfirm => "notify_with_confirm",
            Self::NotifyOnly => "notify_only",
            Self::Silent => "silent",
        };
        f.write_str(s)
    }
}

/// A user-defined rule scoping an action to days and a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceRule {
    /// Rule identity.
    #[serde(default)]
    pub id: RuleId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Inactive rules never match.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Days on which the rule applies; `None` means every day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<DayOfWeek>>,
    /// Local time window; `None` means all day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<TimeWindow>,
    /// Action taken on a crossing.
    pub action: RuleAction,
}

const fn default_active() -> bool {
    true
}

impl GeofenceRule {
    /// Creates an active rule matching every day and time.
    #[must_use]
    pub fn new(name: impl Into<String>, action: RuleAction) -> Self {
        Self {
            id: RuleId::new(),
            name: name.into(),
            active: true,
            days: None,
            window: None,
            action,
        }
    }

    /// Restricts the rule to the given days.
    #[must_use]
    pub fn on_days(mut self, days: impl IntoIterator<Item = DayOfWeek>) -> Self {
        self.days = Some(days.into_iter().collect());
        self
    }

    /// Restricts the rule to a local time window.
    #[must_use]
    pub fn during(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Marks the rule inactive.
    #[must_use]
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// True if the rule applies at the given local instant.
    ///
    /// A missing day set matches any day, a missing window matches any time.
    /// An empty day set matches no day.
    #[must_use]
    pub fn applies_at(&self, now: &DateTime<FixedOffset>) -> bool {
        if !self.active {
            return false;
        }
        if let Some(days) = &self.days {
            if !days.contains(&DayOfWeek::of(now)) {
                return false;
            }
        }
        if let Some(window) = &self.window {
            if !window.contains(ClockTime::of(now)) {
                return false;
            }
        }
        true
    }
}

/// Result of rule selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch {
    /// Rule that matched; `None` when the default applied.
    pub rule_id: Option<RuleId>,
    /// Selected action.
    pub action: RuleAction,
}

/// An ordered list of active rules.
///
/// Selection is first-match-wins in list order. There is no specificity or
/// priority ordering: a broad rule listed first shadows narrower rules after
/// it. Changing this is a behavior change for every stored rule list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<GeofenceRule>,
}

impl RuleSet {
    /// Builds a rule set, dropping inactive rules and keeping order.
    #[must_use]
    pub fn new(rules: Vec<GeofenceRule>) -> Self {
        Self {
            rules: rules.into_iter().filter(|r| r.active).collect(),
        }
    }

    /// An empty rule set; every match yields the default action.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The rules in match order.
    #[must_use]
    pub fn rules(&self) -> &[GeofenceRule] {
        &self.rules
    }

    /// True when no active rules exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Selects the first applicable rule, or the default action.
    #[must_use]
    pub fn select(&self, now: &DateTime<FixedOffset>) -> RuleMatch {
        self.rules
            .iter()
            .find(|r| r.applies_at(now))
            .map_or(
                RuleMatch {
                    rule_id: None,
                    action: RuleAction::DEFAULT,
                },
                |r| RuleMatch {
                    rule_id: Some(r.id),
                    action: r.action,
                },
            )
    }

    /// Action of the first applicable rule, or `notify_with_confirm`.
    #[must_use]
    pub fn match_action(&self, now: &DateTime<FixedOffset>) -> RuleAction {
        self.select(now).action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // Monday 2026-10-19 at the given local time, UTC-7.
    fn monday(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::west_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 19, h, m, 0)
            .unwrap()
    }

    fn saturday(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::west_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 24, h, m, 0)
            .unwrap()
    }

    #[test]
    fn empty_set_defaults_to_notify_with_confirm() {
        let set = RuleSet::empty();
        assert_eq!(set.match_action(&monday(8, 0)), RuleAction::NotifyWithConfirm);
        assert_eq!(set.select(&monday(8, 0)).rule_id, None);
    }

    #[test]
    fn first_match_wins_over_specificity() {
        let broad = GeofenceRule::new("always notify", RuleAction::NotifyOnly);
        let narrow = GeofenceRule::new("commute", RuleAction::AutoPay)
            .on_days(DayOfWeek::WEEKDAYS)
            .during(TimeWindow::parse("07:00", "09:00").unwrap());

        let set = RuleSet::new(vec![broad.clone(), narrow.clone()]);
        assert_eq!(set.match_action(&monday(8, 0)), RuleAction::NotifyOnly);

        let set = RuleSet::new(vec![narrow, broad]);
        assert_eq!(set.match_action(&monday(8, 0)), RuleAction::AutoPay);
        assert_eq!(set.match_action(&monday(10, 0)), RuleAction::NotifyOnly);
    }

    #[test]
    fn day_filter_applies() {
        let weekend = GeofenceRule::new("weekend", RuleAction::Silent).on_days(DayOfWeek::WEEKEND);
        let set = RuleSet::new(vec![weekend]);
        assert_eq!(set.match_action(&saturday(12, 0)), RuleAction::Silent);
        assert_eq!(set.match_action(&monday(12, 0)), RuleAction::NotifyWithConfirm);
    }

    #[test]
    fn window_end_is_exclusive() {
        let rule = GeofenceRule::new("morning", RuleAction::AutoPay)
            .during(TimeWindow::parse("07:00", "09:00").unwrap());
        let set = RuleSet::new(vec![rule]);
        assert_eq!(set.match_action(&monday(8, 59)), RuleAction::AutoPay);
        assert_eq!(set.match_action(&monday(9, 0)), RuleAction::NotifyWithConfirm);
    }

    #[test]
    fn inactive_rules_are_skipped() {
        let off = GeofenceRule::new("off", RuleAction::AutoPay).deactivated();
        let on = GeofenceRule::new("on", RuleAction::NotifyOnly);
        let set = RuleSet::new(vec![off, on.clone()]);
        assert_eq!(set.rules().len(), 1);
        assert_eq!(set.select(&monday(8, 0)).rule_id, Some(on.id));
    }

    #[test]
    fn rule_deserializes_with_defaults() {
        let rule: GeofenceRule = serde_json::from_str(
            r#"{"action":"auto_pay","days":["monday","friday"],"window":{"start":"07:00","end":"09:30"}}"#,
        )
        .unwrap();
        assert!(rule.active);
        assert_eq!(rule.action, RuleAction::AutoPay);
        assert!(rule.applies_at(&monday(9, 29)));
        assert!(!rule.applies_at(&monday(9, 30)));
    }

    #[test]
    fn empty_window_rule_loads_but_never_matches() {
        let rules: Vec<GeofenceRule> = serde_json::from_str(
            r#"[
                {"name":"broken","action":"silent","window":{"start":"16:00","end":"16:00"}},
                {"name":"evening","action":"auto_pay","window":{"start":"15:00","end":"18:00"}}
            ]"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 2);
        assert!(!rules[0].applies_at(&monday(16, 0)));

        let set = RuleSet::new(rules);
        assert_eq!(set.match_action(&monday(16, 0)), RuleAction::AutoPay);
        assert_eq!(set.match_action(&monday(12, 0)), RuleAction::NotifyWithConfirm);
    }

    #[test]
    fn action_display_is_snake_case() {
        assert_eq!(RuleAction::NotifyWithConfirm.to_string(), "notify_with_confirm");
        assert_eq!(
            serde_json::to_string(&RuleAction::AutoPay).unwrap(),
            "\"auto_pay\""
        );
    }
}
