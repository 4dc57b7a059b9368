// ABOUTME: Conversion between stored game attributes and Notion property values
// ABOUTME: Builds create/update payloads and parses database pages back into SinkPages

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{json, Map, Value};

use super::models::PageObject;
use crate::config::PropertyMapping;
use crate::model::{AchievementStats, AppId, AttributePatch, SinkPage, StoredAttributes};

pub type Properties = Map<String, Value>;

/// Properties for a new page: every mapped attribute plus the sync stamp.
pub fn create_properties(
    mapping: &PropertyMapping,
    external_id: AppId,
    attributes: &StoredAttributes,
    synced_at: DateTime<Utc>,
) -> Properties {
    let mut props = Properties::new();
    put(&mut props, &mapping.title, title_value(&attributes.name));
    put(&mut props, &mapping.app_id, json!({ "number": external_id }));
    put(
        &mut props,
        &mapping.playtime,
        json!({ "number": attributes.playtime_hours }),
    );
    put(
        &mut props,
        &mapping.last_played,
        date_value(attributes.last_played.map(|d| d.to_string())),
    );
    put(
        &mut props,
        &mapping.store_url,
        json!({ "url": attributes.store_url }),
    );
    if let Some(flag) = attributes.free_to_play {
        put(&mut props, &mapping.free_to_play, json!({ "checkbox": flag }));
    }
    if let Some(stats) = attributes.achievements {
        put_achievements(&mut props, mapping, stats);
    }
    if let Some(ref description) = attributes.description {
        put(&mut props, &mapping.description, rich_text_value(description));
    }
    if let Some(ref tags) = attributes.tags {
        put(&mut props, &mapping.tags, multi_select_value(tags));
    }
    put(
        &mut props,
        &mapping.last_synced,
        date_value(Some(synced_at.to_rfc3339())),
    );
    props
}

/// Properties for an update: only the fields present in the patch, plus the sync stamp.
pub fn update_properties(
    mapping: &PropertyMapping,
    changes: &AttributePatch,
    synced_at: DateTime<Utc>,
) -> Properties {
    let mut props = Properties::new();
    if let Some(ref name) = changes.name {
        put(&mut props, &mapping.title, title_value(name));
    }
    if let Some(hours) = changes.playtime_hours {
        put(&mut props, &mapping.playtime, json!({ "number": hours }));
    }
    if let Some(last_played) = changes.last_played {
        put(
            &mut props,
            &mapping.last_played,
            date_value(last_played.map(|d| d.to_string())),
        );
    }
    if let Some(ref url) = changes.store_url {
        put(&mut props, &mapping.store_url, json!({ "url": url }));
    }
    if let Some(flag) = changes.free_to_play {
        put(&mut props, &mapping.free_to_play, json!({ "checkbox": flag }));
    }
    if let Some(stats) = changes.achievements {
        put_achievements(&mut props, mapping, stats);
    }
    if let Some(ref description) = changes.description {
        put(&mut props, &mapping.description, rich_text_value(description));
    }
    if let Some(ref tags) = changes.tags {
        put(&mut props, &mapping.tags, multi_select_value(tags));
    }
    put(
        &mut props,
        &mapping.last_synced,
        date_value(Some(synced_at.to_rfc3339())),
    );
    props
}

/// Read a database page back into a [`SinkPage`].
///
/// Returns `None` for pages without a usable external id (rows added by hand,
/// or created before the id column existed).
pub fn parse_page(mapping: &PropertyMapping, page: &PageObject) -> Option<SinkPage> {
    let prop = |name: &str| -> Option<&Value> {
        if name.is_empty() {
            None
        } else {
            page.properties.get(name)
        }
    };

    let external_id = prop(&mapping.app_id).and_then(read_number).and_then(to_app_id)?;

    let name = prop(&mapping.title).map(read_title).unwrap_or_default();
    let playtime_hours = prop(&mapping.playtime).and_then(read_number).unwrap_or(0.0);
    let last_played = prop(&mapping.last_played)
        .and_then(read_date_start)
        .and_then(|s| parse_date(&s));
    // An unmapped store URL column is treated as holding the canonical URL
    let store_url = if mapping.store_url.is_empty() {
        format!("https://store.steampowered.com/app/{}", external_id)
    } else {
        prop(&mapping.store_url).and_then(read_url).unwrap_or_default()
    };
    let free_to_play = prop(&mapping.free_to_play)
        .and_then(|v| v.get("checkbox"))
        .and_then(Value::as_bool);
    let achievements = match (
        prop(&mapping.total_achievements).and_then(read_number),
        prop(&mapping.achieved_achievements).and_then(read_number),
    ) {
        (Some(total), Some(achieved)) if total >= 0.0 && achieved >= 0.0 => {
            Some(AchievementStats {
                total: total.round() as u32,
                achieved: achieved.round() as u32,
            })
        }
        _ => None,
    };
    let description = prop(&mapping.description).map(read_rich_text);
    let tags = prop(&mapping.tags).map(read_multi_select);
    let last_synced_timestamp = prop(&mapping.last_synced)
        .and_then(read_date_start)
        .and_then(|s| parse_datetime(&s));

    Some(SinkPage {
        page_id: page.id.clone(),
        external_id,
        stored_attributes: StoredAttributes {
            name,
            playtime_hours,
            last_played,
            store_url,
            free_to_play,
            achievements,
            description,
            tags,
        },
        last_synced_timestamp,
    })
}

fn put(props: &mut Properties, name: &str, value: Value) {
    if !name.is_empty() {
        props.insert(name.to_string(), value);
    }
}

fn put_achievements(props: &mut Properties, mapping: &PropertyMapping, stats: AchievementStats) {
    put(
        props,
        &mapping.total_achievements,
        json!({ "number": stats.total }),
    );
    put(
        props,
        &mapping.achieved_achievements,
        json!({ "number": stats.achieved }),
    );
    put(
        props,
        &mapping.completion,
        json!({ "number": stats.completion() }),
    );
}

fn title_value(text: &str) -> Value {
    json!({ "title": [{ "type": "text", "text": { "content": text } }] })
}

fn rich_text_value(text: &str) -> Value {
    if text.is_empty() {
        return json!({ "rich_text": [] });
    }
    json!({ "rich_text": [{ "type": "text", "text": { "content": text } }] })
}

fn multi_select_value(tags: &[String]) -> Value {
    let options: Vec<Value> = tags.iter().map(|tag| json!({ "name": tag })).collect();
    json!({ "multi_select": options })
}

fn date_value(start: Option<String>) -> Value {
    match start {
        Some(start) => json!({ "date": { "start": start } }),
        None => json!({ "date": null }),
    }
}

fn read_title(value: &Value) -> String {
    value
        .get("title")
        .and_then(Value::as_array)
        .map(|parts| parts.iter().filter_map(plain_text).collect())
        .unwrap_or_default()
}

fn read_rich_text(value: &Value) -> String {
    value
        .get("rich_text")
        .and_then(Value::as_array)
        .map(|parts| parts.iter().filter_map(plain_text).collect())
        .unwrap_or_default()
}

fn read_multi_select(value: &Value) -> Vec<String> {
    value
        .get("multi_select")
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|o| o.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn plain_text(part: &Value) -> Option<&str> {
    part.get("plain_text")
        .and_then(Value::as_str)
        .or_else(|| part.pointer("/text/content").and_then(Value::as_str))
}

fn read_number(value: &Value) -> Option<f64> {
    value.get("number").and_then(Value::as_f64)
}

fn read_url(value: &Value) -> Option<String> {
    value.get("url").and_then(Value::as_str).map(str::to_string)
}

fn read_date_start(value: &Value) -> Option<String> {
    value
        .pointer("/date/start")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn to_app_id(number: f64) -> Option<AppId> {
    if number >= 0.0 && number.fract() == 0.0 && number <= u64::MAX as f64 {
        Some(number as AppId)
    } else {
        None
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    s.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            parse_date(s)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| Utc.from_utc_datetime(&dt))
        })
}
