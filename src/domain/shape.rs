//! Tolerant extraction from upstream response bodies.
//!
//! Vendor APIs have moved fields around between versions, so every read of a
//! list or key that has been seen under more than one name goes through an
//! ordered probe list defined here. The first probe that yields a value wins.
//!
//! | Constant | Probes, in order |
//! |---|---|
//! | [`REFERRERS`] | `referrers`, `metrics`, top-level array |
//! | [`COUNTRIES`] | `metrics`, `countries`, top-level array |
//! | [`CLICK_SERIES`] | `link_clicks`, `clicks`, top-level array |
//! | [`BITLINKS`] | `links`, top-level array |
//! | [`TICKET_TAILOR_DATA`] | `data`, top-level array |
//! | [`MEMBERS`] | `members` |
//! | [`CAMPAIGNS`] | `campaigns` |
//! | [`GROWTH_HISTORY`] | `history` |
//! | [`REFERRER_KEY`] | `referrer`, `value` |
//! | [`COUNTRY_KEY`] | `value`, `country` |
//! | [`ERROR_MESSAGE`] | `message`, `detail`, `error`, `title` |
//! | [`TICKET_TYPE_NAME`] | `ticket_type.name`, `description` |
//! | [`EVENT_START`] | `start.date`, `start.iso`, `start` |
//! | [`VENUE_NAME`] | `venue.name`, `venue` |

use serde_json::Value;

/// One way of locating a value inside a JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// A top-level object field.
    Field(&'static str),
    /// The body itself.
    Root,
}

pub const REFERRERS: &[Probe] = &[Probe::Field("referrers"), Probe::Field("metrics"), Probe::Root];
pub const COUNTRIES: &[Probe] = &[Probe::Field("metrics"), Probe::Field("countries"), Probe::Root];
pub const CLICK_SERIES: &[Probe] = &[Probe::Field("link_clicks"), Probe::Field("clicks"), Probe::Root];
pub const BITLINKS: &[Probe] = &[Probe::Field("links"), Probe::Root];
pub const TICKET_TAILOR_DATA: &[Probe] = &[Probe::Field("data"), Probe::Root];
pub const MEMBERS: &[Probe] = &[Probe::Field("members")];
pub const CAMPAIGNS: &[Probe] = &[Probe::Field("campaigns")];
pub const GROWTH_HISTORY: &[Probe] = &[Probe::Field("history")];

pub const REFERRER_KEY: &[&str] = &["referrer", "value"];
pub const COUNTRY_KEY: &[&str] = &["value", "country"];
pub const ERROR_MESSAGE: &[&str] = &["message", "detail", "error", "title"];

pub const TICKET_TYPE_NAME: &[&str] = &["ticket_type.name", "description"];
pub const EVENT_START: &[&str] = &["start.date", "start.iso", "start"];
pub const VENUE_NAME: &[&str] = &["venue.name", "venue"];

/// Returns the first array found by `probes`, or an empty vector.
pub fn probe_array(body: &Value, probes: &[Probe]) -> Vec<Value> {
    probes
        .iter()
        .find_map(|probe| {
            let candidate = match probe {
                Probe::Field(name) => body.get(*name),
                Probe::Root => Some(body),
            };
            candidate.and_then(Value::as_array)
        })
        .cloned()
        .unwrap_or_default()
}

/// Returns the first non-empty string field among `keys`.
pub fn probe_str<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| item.get(*key).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
}

/// Like [`probe_str`], but each key may be a dotted path.
pub fn probe_path_str<'a>(item: &'a Value, paths: &[&str]) -> Option<&'a str> {
    paths
        .iter()
        .filter_map(|p| path(item, p).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
}

/// Reads a non-negative count, accepting integers, floats and numeric strings.
pub fn count_field(item: &Value, key: &str) -> u64 {
    match item.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Follows a dotted path such as `"stats.member_count"`.
pub fn path<'a>(body: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(body, |current, segment| current.get(segment))
}

/// Reads an item identifier, stringifying numeric ids.
pub fn id_of(item: &Value, field: &str) -> Option<String> {
    match item.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Human-readable message from an upstream error body.
pub fn error_message(body: &Value) -> Option<String> {
    probe_str(body, ERROR_MESSAGE).map(str::to_string)
}
