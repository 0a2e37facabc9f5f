//! Plain-text rendering of favorites and weather for the terminal

use chrono::{DateTime, FixedOffset, Utc};

use crate::favorites::FavoriteCity;
use crate::weather::{ForecastData, GeocodingResponse, Units, WeatherData};

/// Renders the favorites list, one line per favorite
pub fn format_favorites(favorites: &[FavoriteCity]) -> String {
    if favorites.is_empty() {
        return "No favorites yet. Add one with `wxfav add` or `wxfav search --add`.\n".to_string();
    }

    let id_width = favorites.iter().map(|c| c.id.len()).max().unwrap_or(0);
    let mut out = String::new();
    for city in favorites {
        let added = city
            .added_at_time()
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<width$}  {}  ({})  added {}\n",
            city.id,
            city.display_name(),
            city.coordinates(),
            added,
            width = id_width
        ));
    }
    out
}

/// Renders current conditions under a heading
pub fn format_weather(label: &str, weather: &WeatherData, units: Units, favorite: bool) -> String {
    let temp = units.temperature_symbol();
    let marker = if favorite { " ★" } else { "" };
    let conditions = match weather.condition() {
        Some(condition) => format!("{} ({})", condition.description(), weather.summary()),
        None => capitalize(weather.summary()),
    };
    let mut out = format!("{}{}\n", label, marker);
    out.push_str(&format!(
        "  {}, {:.1}{} (feels like {:.1}{})\n",
        conditions,
        weather.main.temp,
        temp,
        weather.main.feels_like,
        temp
    ));
    out.push_str(&format!(
        "  Low {:.1}{} / High {:.1}{}\n",
        weather.main.temp_min, temp, weather.main.temp_max, temp
    ));
    out.push_str(&format!(
        "  Humidity {}%  Wind {:.1} {}\n",
        weather.main.humidity,
        weather.wind.speed,
        units.speed_symbol()
    ));
    if let (Some(sunrise), Some(sunset)) = (weather.sys.sunrise, weather.sys.sunset) {
        out.push_str(&format!(
            "  Sunrise {}  Sunset {}\n",
            local_time(sunrise, weather.timezone),
            local_time(sunset, weather.timezone)
        ));
    }
    out
}

/// Renders the forecast as one line per three-hour step
pub fn format_forecast(forecast: &ForecastData, units: Units) -> String {
    let temp = units.temperature_symbol();
    let mut out = match &forecast.city.country {
        Some(country) => format!("Forecast for {}, {}\n", forecast.city.name, country),
        None => format!("Forecast for {}\n", forecast.city.name),
    };

    for entry in &forecast.list {
        let summary = entry
            .weather
            .first()
            .map(|w| w.description.as_str())
            .unwrap_or("unknown");
        let pop = entry
            .pop
            .map(|p| format!("  {:>3.0}% precip", p * 100.0))
            .unwrap_or_default();
        out.push_str(&format!(
            "  {}  {:>6.1}{}  {}{}\n",
            local_datetime(entry.dt, forecast.city.timezone),
            entry.main.temp,
            temp,
            summary,
            pop
        ));
    }
    out
}

/// Renders numbered search results, marking those already saved
pub fn format_search_results<F>(results: &[GeocodingResponse], is_favorite: F) -> String
where
    F: Fn(f64, f64) -> bool,
{
    if results.is_empty() {
        return "No locations found.\n".to_string();
    }

    let mut out = String::new();
    for (i, place) in results.iter().enumerate() {
        let region = match &place.state {
            Some(state) => format!("{}, {}, {}", place.name, state, place.country),
            None => format!("{}, {}", place.name, place.country),
        };
        let marker = if is_favorite(place.lat, place.lon) {
            "  ★"
        } else {
            ""
        };
        out.push_str(&format!(
            "{:>2}. {}  ({}){}\n",
            i + 1,
            region,
            place.coordinates(),
            marker
        ));
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn with_offset(timestamp: i64, offset_secs: i64) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(i32::try_from(offset_secs).ok()?)?;
    DateTime::<Utc>::from_timestamp(timestamp, 0).map(|t| t.with_timezone(&offset))
}

fn local_time(timestamp: i64, offset_secs: i64) -> String {
    with_offset(timestamp, offset_secs)
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

fn local_datetime(timestamp: i64, offset_secs: i64) -> String {
    with_offset(timestamp, offset_secs)
        .map(|t| t.format("%a %d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::NewFavorite;

    fn place(name: &str, state: Option<&str>, lat: f64, lon: f64) -> GeocodingResponse {
        GeocodingResponse {
            name: name.to_string(),
            lat,
            lon,
            country: "US".to_string(),
            state: state.map(str::to_string),
            local_names: None,
        }
    }

    fn weather(conditions: &str) -> WeatherData {
        let json = format!(
            r#"{{
                "coord": {{"lat": 51.5, "lon": -0.1}},
                "weather": {},
                "main": {{"temp": 14.2, "feels_like": 13.8, "temp_min": 12.9, "temp_max": 15.6, "pressure": 1012, "humidity": 77}},
                "wind": {{"speed": 4.1}},
                "dt": 1721052000,
                "sys": {{"country": "GB", "sunrise": 1721016236, "sunset": 1721074880}},
                "timezone": 3600,
                "name": "London"
            }}"#,
            conditions
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_format_weather_shows_condition_category() {
        let data = weather(
            r#"[{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}]"#,
        );

        let out = format_weather("London, GB", &data, Units::Metric, true);
        let lines: Vec<_> = out.lines().collect();

        assert_eq!(lines[0], "London, GB ★");
        assert_eq!(lines[1], "  Cloudy (broken clouds), 14.2°C (feels like 13.8°C)");
        assert!(lines[3].contains("Humidity 77%"));
        assert_eq!(lines[4], "  Sunrise 05:03  Sunset 21:21");
    }

    #[test]
    fn test_format_weather_without_conditions() {
        let out = format_weather("Somewhere", &weather("[]"), Units::Imperial, false);

        assert!(out.starts_with("Somewhere\n"));
        assert!(out.contains("  Unknown, 14.2°F"));
    }

    #[test]
    fn test_format_empty_favorites() {
        assert!(format_favorites(&[]).contains("No favorites yet"));
    }

    #[test]
    fn test_format_favorites_lists_ids_and_names() {
        let favorites = vec![
            FavoriteCity::from_new(NewFavorite::new("London", "GB", 51.5, -0.1), 1_721_052_000_000),
            FavoriteCity::from_new(
                NewFavorite::new("Portland", "US", 45.5152, -122.6784).with_state("Oregon"),
                1_721_052_000_000,
            ),
        ];

        let out = format_favorites(&favorites);
        let lines: Vec<_> = out.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("51.5--0.1"));
        assert!(lines[0].contains("London, GB"));
        assert!(lines[0].contains("added 2024-07-15"));
        assert!(lines[1].contains("Portland, Oregon, US"));
    }

    #[test]
    fn test_format_search_results_marks_favorites() {
        let results = vec![
            place("Portland", Some("Oregon"), 45.5152, -122.6784),
            place("Portland", Some("Maine"), 43.6591, -70.2568),
        ];

        let out = format_search_results(&results, |lat, _| lat > 45.0);
        let lines: Vec<_> = out.lines().collect();

        assert!(lines[0].starts_with(" 1. Portland, Oregon, US"));
        assert!(lines[0].ends_with('★'));
        assert!(!lines[1].contains('★'));
    }

    #[test]
    fn test_format_search_results_empty() {
        assert_eq!(format_search_results(&[], |_, _| false), "No locations found.\n");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("broken clouds"), "Broken clouds");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_local_time_applies_offset() {
        // 2024-07-15T04:03:56Z at UTC+1
        assert_eq!(local_time(1_721_016_236, 3600), "05:03");
        assert_eq!(local_time(1_721_016_236, i64::MAX), "--:--");
    }
}
