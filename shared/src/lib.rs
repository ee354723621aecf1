use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

/// Supported birth time-zone identifiers.
///
/// The editing surfaces only offer these two zones; everything else the
/// remote API can hand back is folded onto them via [`TzId::from_iana`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TzId {
    #[default]
    #[serde(rename = "IST")]
    Ist,
    #[serde(rename = "UTC")]
    Utc,
}

impl TzId {
    /// IANA zone name used in remote payloads.
    pub fn iana(self) -> &'static str {
        match self {
            TzId::Ist => "Asia/Kolkata",
            TzId::Utc => "UTC",
        }
    }

    /// Fixed offset from UTC in hours (IST = +5:30).
    pub fn offset_hours(self) -> f64 {
        match self {
            TzId::Ist => 5.5,
            TzId::Utc => 0.0,
        }
    }

    fn offset_seconds(self) -> i64 {
        match self {
            TzId::Ist => 5 * 3600 + 1800,
            TzId::Utc => 0,
        }
    }

    /// Map an IANA zone name onto the supported enum set. Any Kolkata or
    /// Calcutta spelling means IST; everything else defaults to UTC.
    pub fn from_iana(iana: &str) -> TzId {
        let lower = iana.to_ascii_lowercase();
        if lower.contains("kolkata") || lower.contains("calcutta") {
            TzId::Ist
        } else {
            TzId::Utc
        }
    }
}

/// Format a fractional hour offset as `+HH:MM` / `-HH:MM`.
pub fn tz_hours_to_offset(hours: f64) -> String {
    let sign = if hours >= 0.0 { '+' } else { '-' };
    let abs = hours.abs();
    let hh = abs.floor();
    let mm = ((abs - hh) * 60.0).round();
    format!("{}{:02}:{:02}", sign, hh as u32, mm as u32)
}

/// Wall-clock date and time-of-day in one of the supported zones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCivil {
    /// `YYYY-MM-DD`
    pub dob: String,
    /// `HH:MM` (24h)
    pub tob: String,
    pub tz_id: TzId,
}

/// Compose a `YYYY-MM-DD` date and `HH:MM` time with the zone's fixed
/// offset and normalize to an absolute UTC instant.
///
/// Returns `None` when either string fails to parse.
pub fn local_civil_to_utc(dob: &str, tob: &str, tz_id: TzId) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(dob, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(tob, "%H:%M").ok()?;
    let naive = date.and_time(time) - Duration::seconds(tz_id.offset_seconds());
    Some(Utc.from_utc_datetime(&naive))
}

/// Project a UTC instant into the named zone's local calendar date and
/// time-of-day. The zone id is inferred from the IANA name, so the
/// projection is exact for the supported zone set and falls back to UTC
/// wall-clock for everything else.
pub fn utc_to_local_civil(datetime: DateTime<Utc>, iana: &str) -> LocalCivil {
    let tz_id = TzId::from_iana(iana);
    let local = datetime.naive_utc() + Duration::seconds(tz_id.offset_seconds());
    LocalCivil {
        dob: local.format("%Y-%m-%d").to_string(),
        tob: local.format("%H:%M").to_string(),
        tz_id,
    }
}

/// The remote-ready projection of a local birth record: an absolute UTC
/// instant plus the numeric fields API payloads want.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BirthInstant {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub datetime: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    /// IANA zone name, e.g. `Asia/Kolkata`.
    pub tz: String,
    pub tz_offset_hours: f64,
}

impl BirthInstant {
    /// Build the chart-collection POST body from this instant.
    pub fn to_payload(&self, place: Option<String>) -> ChartPayload {
        ChartPayload {
            name: self.name.clone(),
            birth_datetime: self.datetime,
            latitude: self.lat,
            longitude: self.lon,
            timezone: self.tz.clone(),
            place,
            force: false,
        }
    }
}

fn birth_instant_from_fields(
    name: Option<&String>,
    dob: &str,
    tob: &str,
    tz_id: TzId,
    lat: &str,
    lon: &str,
) -> Option<BirthInstant> {
    if dob.is_empty() || tob.is_empty() || lat.is_empty() || lon.is_empty() {
        return None;
    }
    let datetime = local_civil_to_utc(dob, tob, tz_id)?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    Some(BirthInstant {
        name: name.cloned(),
        datetime,
        lat,
        lon,
        tz: tz_id.iana().to_string(),
        tz_offset_hours: tz_id.offset_hours(),
    })
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// The mutable scratch birth record the creation flow edits in place.
///
/// `svg`/`summary`/`vimshottari` form the cached chart preview and are
/// either all present or all null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BirthDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `YYYY-MM-DD`
    pub dob: String,
    /// `HH:MM` (24h)
    pub tob: String,
    pub tz_id: TzId,
    pub place: String,
    /// Decimal degrees, stored as entered.
    pub lat: String,
    pub lon: String,
    pub svg: Option<String>,
    pub summary: Option<HashMap<String, String>>,
    pub vimshottari: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl BirthDraft {
    pub fn has_preview(&self) -> bool {
        self.svg.is_some() && self.summary.is_some() && self.vimshottari.is_some()
    }

    /// Attach a freshly rendered preview. The three parts are only ever
    /// written together.
    pub fn set_preview(
        &mut self,
        svg: String,
        summary: HashMap<String, String>,
        vimshottari: serde_json::Value,
        at: DateTime<Utc>,
    ) {
        self.svg = Some(svg);
        self.summary = Some(summary);
        self.vimshottari = Some(vimshottari);
        self.saved_at = Some(at);
    }

    /// Drop the cached preview, keep the birth fields, bump the timestamp.
    pub fn clear_preview(&mut self, at: DateTime<Utc>) {
        self.svg = None;
        self.summary = None;
        self.vimshottari = None;
        self.saved_at = Some(at);
    }

    pub fn birth_instant(&self) -> Option<BirthInstant> {
        birth_instant_from_fields(
            self.name.as_ref(),
            &self.dob,
            &self.tob,
            self.tz_id,
            &self.lat,
            &self.lon,
        )
    }

    pub fn to_payload(&self) -> Option<ChartPayload> {
        Some(self.birth_instant()?.to_payload(non_empty(&self.place)))
    }
}

/// A chart kept in the browser-local saved list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedChart {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub dob: String,
    pub tob: String,
    pub tz_id: TzId,
    pub place: String,
    pub lat: String,
    pub lon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SavedChart {
    /// Fresh client-generated identifier; never reused, even after deletion.
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn apply(&mut self, patch: SavedChartPatch) {
        if let Some(name) = patch.name {
            self.name = Some(name);
        }
        if let Some(dob) = patch.dob {
            self.dob = dob;
        }
        if let Some(tob) = patch.tob {
            self.tob = tob;
        }
        if let Some(tz_id) = patch.tz_id {
            self.tz_id = tz_id;
        }
        if let Some(place) = patch.place {
            self.place = place;
        }
        if let Some(lat) = patch.lat {
            self.lat = lat;
        }
        if let Some(lon) = patch.lon {
            self.lon = lon;
        }
        if let Some(tags) = patch.tags {
            self.tags = Some(tags);
        }
    }

    pub fn birth_instant(&self) -> Option<BirthInstant> {
        birth_instant_from_fields(
            self.name.as_ref(),
            &self.dob,
            &self.tob,
            self.tz_id,
            &self.lat,
            &self.lon,
        )
    }

    pub fn to_payload(&self) -> Option<ChartPayload> {
        Some(self.birth_instant()?.to_payload(non_empty(&self.place)))
    }

    /// Draft pre-filled from this chart, preview cleared.
    pub fn to_draft(&self) -> BirthDraft {
        BirthDraft {
            name: self.name.clone(),
            dob: self.dob.clone(),
            tob: self.tob.clone(),
            tz_id: self.tz_id,
            place: self.place.clone(),
            lat: self.lat.clone(),
            lon: self.lon.clone(),
            svg: None,
            summary: None,
            vimshottari: None,
            saved_at: None,
        }
    }
}

/// Fields for [`SavedChart`] creation; id and timestamps are assigned by
/// the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewSavedChart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub dob: String,
    pub tob: String,
    pub tz_id: TzId,
    pub place: String,
    pub lat: String,
    pub lon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Partial update for a saved chart; only the populated fields are merged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SavedChartPatch {
    pub name: Option<String>,
    pub dob: Option<String>,
    pub tob: Option<String>,
    pub tz_id: Option<TzId>,
    pub place: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// A chart as the remote account-scoped collection returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteChart {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    /// Absolute UTC instant.
    pub birth_datetime: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA zone name, e.g. `Asia/Kolkata`.
    pub timezone: String,
    #[serde(default)]
    pub place: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RemoteChart {
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => "Unnamed Chart".to_string(),
        }
    }

    /// Project this remote chart into the local draft shape: wall-clock
    /// date/time in the chart's zone plus the inferred zone id.
    pub fn to_draft(&self) -> BirthDraft {
        let civil = utc_to_local_civil(self.birth_datetime, &self.timezone);
        BirthDraft {
            name: self.name.clone(),
            dob: civil.dob,
            tob: civil.tob,
            tz_id: civil.tz_id,
            place: self.place.clone().unwrap_or_default(),
            lat: self.latitude.to_string(),
            lon: self.longitude.to_string(),
            svg: None,
            summary: None,
            vimshottari: None,
            saved_at: None,
        }
    }
}

/// POST body for the remote chart collection. `force` bypasses duplicate
/// detection and is only serialized when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub birth_datetime: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub force: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ChartPayload {
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// One saved-chart-like record in either the server or the local shape.
///
/// This is the `charts:append` payload; consumers reconcile by
/// [`ChartRecord::dedupe_key`] and [`ChartRecord::recency`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartRecord {
    Remote(RemoteChart),
    Local(SavedChart),
}

impl ChartRecord {
    pub fn dedupe_key(&self) -> String {
        match self {
            ChartRecord::Remote(chart) => chart.id.to_string(),
            ChartRecord::Local(chart) => chart.id.clone(),
        }
    }

    pub fn recency(&self) -> DateTime<Utc> {
        match self {
            ChartRecord::Remote(chart) => chart.created_at,
            ChartRecord::Local(chart) => chart.updated_at,
        }
    }
}

/// One entry in the local activity history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub id: String,
    /// Free-form tag, e.g. `chart.saved`, `daily.opened`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Display string, localized at write-time.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_id: Option<String>,
    pub ts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, serde_json::Value>>,
}

impl HistoryEvent {
    pub fn generate_id() -> String {
        format!("h-{}", Uuid::new_v4().simple())
    }
}

/// Fields for a history entry; id and (optionally) timestamp are assigned
/// by the log.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewHistoryEvent {
    pub kind: String,
    pub title: String,
    pub chart_id: Option<String>,
    /// Explicit timestamp; the log stamps "now" when absent.
    pub ts: Option<DateTime<Utc>>,
    pub meta: Option<HashMap<String, serde_json::Value>>,
}

impl NewHistoryEvent {
    pub fn new(kind: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// The entry recorded after a successful remote save.
    pub fn chart_saved(chart: &RemoteChart) -> Self {
        Self {
            kind: "chart.saved".to_string(),
            title: chart.display_name(),
            chart_id: Some(chart.id.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Landing {
    Daily,
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFormat {
    #[serde(rename = "12h")]
    H12,
    #[serde(rename = "24h")]
    H24,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    #[serde(rename = "DD-MM-YYYY")]
    DayFirst,
    #[serde(rename = "YYYY-MM-DD")]
    YearFirst,
}

/// Sparse user preferences; a write only overwrites the keys it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Prefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landing: Option<Landing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_format: Option<TimeFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<DateFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_reminder: Option<bool>,
}

impl Prefs {
    /// Merge-on-write: populated keys from `patch` win, the rest keep
    /// their prior value.
    pub fn merge(&mut self, patch: Prefs) {
        if patch.locale.is_some() {
            self.locale = patch.locale;
        }
        if patch.landing.is_some() {
            self.landing = patch.landing;
        }
        if patch.time_format.is_some() {
            self.time_format = patch.time_format;
        }
        if patch.date_format.is_some() {
            self.date_format = patch.date_format;
        }
        if patch.daily_reminder.is_some() {
            self.daily_reminder = patch.daily_reminder;
        }
    }
}
