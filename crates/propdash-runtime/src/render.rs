//! Plain-text rendering for CLI output.

use propdash_api::ApiError;
use propdash_client::PollerView;
use propdash_core::types::{PropertyStats, WhatsAppGroup, confidence_percent};
use propdash_core::{ConnectionState, ConnectionStatus, Property};

/// Human label for a connection state.
pub fn state_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Idle => "not connected",
        ConnectionState::Connecting => "connecting",
        ConnectionState::QrPending => "waiting for QR scan",
        ConnectionState::Connected => "connected",
        ConnectionState::Error => "error",
    }
}

pub fn format_status(status: &ConnectionStatus) -> String {
    let mut lines = vec![format!("status: {}", state_label(status.state()))];
    if let Some(ref msg) = status.message {
        lines.push(format!("message: {msg}"));
    }
    if let Some(active) = status.socket_active {
        lines.push(format!("socket: {}", if active { "active" } else { "inactive" }));
    }
    if let Some(n) = status.active_connections {
        lines.push(format!("active connections: {n}"));
    }
    if let Some(ref qr) = status.qr_code {
        lines.push(format!("pairing code: {qr}"));
    }
    lines.join("\n")
}

/// JSON document for `status --json`.
pub fn status_json(status: &ConnectionStatus) -> serde_json::Value {
    serde_json::json!({
        "state": status.state(),
        "status": status,
    })
}

/// One line per published view, for `watch`.
pub fn format_view_line(view: &PollerView) -> String {
    let mut line = format!("[{}]", view.state);
    match (&view.error, &view.snapshot) {
        (Some(err), _) => {
            line.push_str(&format!(" {err}"));
            if view.consecutive_failures > 1 {
                line.push_str(&format!(" ({} failures)", view.consecutive_failures));
            }
        }
        (None, Some(s)) => {
            line.push(' ');
            line.push_str(state_label(s.state()));
            if let Some(ref msg) = s.message {
                line.push_str(&format!(": {msg}"));
            }
        }
        (None, None) => line.push_str(" waiting for first status"),
    }
    line
}

/// One-line report for a failed request.
///
/// Validation failures are the caller's input problem and say so.
pub fn api_error_line(e: &ApiError) -> String {
    if e.should_notify() {
        format!("request failed: {}", e.user_message())
    } else {
        format!("invalid input: {}", e.user_message())
    }
}

pub fn format_stats(stats: &PropertyStats) -> String {
    format!(
        "{} listings ({} sale, {} rental, {} lease)",
        stats.total, stats.sale, stats.rental, stats.lease
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

const NAME_W: usize = 28;
const TYPE_W: usize = 12;
const PRICE_W: usize = 14;
const LOC_W: usize = 24;

pub fn format_properties_table(properties: &[Property]) -> String {
    if properties.is_empty() {
        return "(no listings match the current filters)".to_string();
    }

    let mut out = format!(
        "{:<NAME_W$}  {:<6}  {:<TYPE_W$}  {:<PRICE_W$}  {:<LOC_W$}  {:>4}  {:>4}",
        "NAME", "KIND", "TYPE", "PRICE", "LOCATION", "BEDS", "CONF"
    );
    for p in properties {
        let beds = p.bedrooms.map(|b| b.to_string()).unwrap_or_else(|| "-".into());
        let conf = p
            .parsing_confidence
            .map(|c| format!("{}%", confidence_percent(c)))
            .unwrap_or_else(|| "-".into());
        out.push('\n');
        out.push_str(&format!(
            "{:<NAME_W$}  {:<6}  {:<TYPE_W$}  {:<PRICE_W$}  {:<LOC_W$}  {:>4}  {:>4}",
            truncate(p.display_name(), NAME_W),
            p.listing_type.as_str(),
            truncate(p.property_type.as_deref().unwrap_or("-"), TYPE_W),
            truncate(p.price.as_deref().unwrap_or("-"), PRICE_W),
            truncate(p.location_label().as_deref().unwrap_or("-"), LOC_W),
            beds,
            conf,
        ));
    }
    out
}

pub fn format_groups(groups: &[WhatsAppGroup]) -> String {
    if groups.is_empty() {
        return "(no groups found; link an account with `propdash connect`)".to_string();
    }
    groups
        .iter()
        .map(|g| {
            let mark = if g.is_enabled { "x" } else { " " };
            format!("[{mark}] {}  {}", g.group_id, g.group_name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use propdash_core::StatusPayload;

    fn property(name: Option<&str>, confidence: Option<f64>) -> Property {
        serde_json::from_value(serde_json::json!({
            "id": "p1",
            "message_id": "m1",
            "property_name": name,
            "listing_type": "rental",
            "price": "45k/month",
            "area_name": "Bandra West",
            "city": "Mumbai",
            "bedrooms": 2,
            "parsing_confidence": confidence,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z",
        }))
        .expect("property")
    }

    #[test]
    fn status_shows_pairing_code() {
        let status = ConnectionStatus::from_payload(StatusPayload {
            qr_code: Some("ABC123".into()),
            message: Some("scan to link".into()),
            ..StatusPayload::default()
        });
        let out = format_status(&status);
        assert!(out.starts_with("status: waiting for QR scan"));
        assert!(out.contains("pairing code: ABC123"));
    }

    #[test]
    fn status_json_carries_state() {
        let status = ConnectionStatus::from_payload(StatusPayload {
            is_connected: true,
            ..StatusPayload::default()
        });
        let v = status_json(&status);
        assert_eq!(v["state"], "connected");
        assert_eq!(v["status"]["is_connected"], true);
    }

    #[test]
    fn view_line_variants() {
        assert_eq!(
            format_view_line(&PollerView::default()),
            "[idle] waiting for first status"
        );
        let failing = PollerView {
            state: ConnectionState::Error,
            error: Some("connection refused".into()),
            consecutive_failures: 3,
            ..PollerView::default()
        };
        assert_eq!(
            format_view_line(&failing),
            "[error] connection refused (3 failures)"
        );
    }

    #[test]
    fn table_rows() {
        let rows = vec![property(Some("Sea View 2BHK"), Some(0.876)), property(None, None)];
        let out = format_properties_table(&rows);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[1].contains("Sea View 2BHK"));
        assert!(lines[1].contains("88%"));
        assert!(lines[1].contains("Bandra West, Mumbai"));
        assert!(lines[2].starts_with("Unnamed Property"));
        assert!(lines[2].trim_end().ends_with('-'));
    }

    #[test]
    fn empty_table_message() {
        assert!(format_properties_table(&[]).contains("no listings"));
    }

    #[test]
    fn stats_line() {
        let stats = PropertyStats {
            total: 3,
            sale: 1,
            rental: 2,
            lease: 0,
        };
        assert_eq!(format_stats(&stats), "3 listings (1 sale, 2 rental, 0 lease)");
    }

    #[test]
    fn error_lines() {
        let bad = ApiError::from_status(400, r#"{"message":"min_price must be a number"}"#, "");
        assert_eq!(api_error_line(&bad), "invalid input: min_price must be a number");
        let down = ApiError::Network("connection refused".into());
        assert_eq!(api_error_line(&down), "request failed: connection refused");
    }

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("abcdef", 5), "ab...");
        assert_eq!(truncate("abc", 5), "abc");
    }

    #[test]
    fn groups_listing() {
        let groups = vec![
            WhatsAppGroup {
                group_id: "g1".into(),
                group_name: "Brokers".into(),
                is_enabled: true,
            },
            WhatsAppGroup {
                group_id: "g2".into(),
                group_name: "Family".into(),
                is_enabled: false,
            },
        ];
        assert_eq!(format_groups(&groups), "[x] g1  Brokers\n[ ] g2  Family");
    }
}
