use serde_json::{json, Value};

use crate::game::room::{JoinTicket, RoomSummary};
use crate::types::RoomEvent;

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Move { x: f32, y: f32, t: Option<f64> },
    Dash,
    Ping { t: f64 },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "move" => {
            let x = finite_f64(object.get("x")?)? as f32;
            let y = finite_f64(object.get("y")?)? as f32;
            let t = match object.get("t") {
                None | Some(Value::Null) => None,
                Some(value) => Some(finite_f64(value)?),
            };
            if !x.is_finite() || !y.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Move { x, y, t })
        }
        "dash" => Some(ParsedClientMessage::Dash),
        "ping" => {
            let t = finite_f64(object.get("t")?)?;
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

fn finite_f64(value: &Value) -> Option<f64> {
    value.as_f64().filter(|number| number.is_finite())
}

/// The copy of `event` a given player may see, if any. Snapshots lose every
/// other entity's lookahead; elimination notices go only to the eliminated.
pub fn event_for_viewer(event: &RoomEvent, viewer_id: &str) -> Option<RoomEvent> {
    match event {
        RoomEvent::State(snapshot) => Some(RoomEvent::State(snapshot.for_viewer(viewer_id))),
        RoomEvent::Eliminated(notice) if notice.eliminated_id != viewer_id => None,
        other => Some(other.clone()),
    }
}

pub fn welcome_message(ticket: &JoinTicket, room: &RoomSummary) -> Value {
    json!({
        "type": "welcome",
        "playerId": ticket.player_id,
        "room": room,
        "config": ticket.config,
        "snapshot": ticket.snapshot,
    })
}

pub fn pong_message(t: f64, server_time: u64) -> Value {
    json!({ "type": "pong", "t": t, "serverTime": server_time })
}

pub fn error_message(message: &str) -> Value {
    json!({ "type": "error", "message": message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EliminationNotice, PlayerView, RpsState, StateSnapshot};

    fn notice_for(id: &str) -> RoomEvent {
        RoomEvent::Eliminated(EliminationNotice {
            eliminated_id: id.to_string(),
            eliminated_rps_state: RpsState::Rock,
            eliminator_id: "w".to_string(),
            eliminator_nickname: "W".to_string(),
            eliminator_rps_state: RpsState::Paper,
            message: "gone".to_string(),
            kill_count: 2,
        })
    }

    #[test]
    fn parse_move_message() {
        assert_eq!(
            parse_client_message(r#"{"type":"move","x":10.5,"y":20,"t":123.0}"#),
            Some(ParsedClientMessage::Move {
                x: 10.5,
                y: 20.0,
                t: Some(123.0)
            })
        );
        assert_eq!(
            parse_client_message(r#"{"type":"move","x":1,"y":2}"#),
            Some(ParsedClientMessage::Move {
                x: 1.0,
                y: 2.0,
                t: None
            })
        );
    }

    #[test]
    fn parse_rejects_malformed_moves() {
        for raw in [
            r#"{"type":"move","x":"1","y":2}"#,
            r#"{"type":"move","x":1}"#,
            r#"{"type":"move","x":1e300,"y":2}"#,
            r#"{"type":"move","x":1,"y":2,"t":"soon"}"#,
            r#"{"x":1,"y":2}"#,
            "not json",
        ] {
            assert_eq!(parse_client_message(raw), None, "{raw}");
        }
    }

    #[test]
    fn parse_dash_and_ping() {
        assert_eq!(
            parse_client_message(r#"{"type":"dash"}"#),
            Some(ParsedClientMessage::Dash)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"ping","t":42}"#),
            Some(ParsedClientMessage::Ping { t: 42.0 })
        );
        assert_eq!(parse_client_message(r#"{"type":"ping"}"#), None);
        assert_eq!(parse_client_message(r#"{"type":"shout"}"#), None);
    }

    #[test]
    fn elimination_notice_is_unicast() {
        assert!(event_for_viewer(&notice_for("me"), "me").is_some());
        assert!(event_for_viewer(&notice_for("someone"), "me").is_none());
        let left = RoomEvent::PlayerLeft {
            player_id: "x".to_string(),
        };
        assert!(event_for_viewer(&left, "me").is_some());
    }

    #[test]
    fn state_is_filtered_per_viewer() {
        let view = |id: &str| PlayerView {
            id: id.to_string(),
            nickname: id.to_string(),
            x: 0.0,
            y: 0.0,
            rps_state: RpsState::Rock,
            next_rps_state: Some(RpsState::Scissors),
            size: 30.0,
            is_agent: false,
            velocity_x: 0.0,
            velocity_y: 0.0,
            spawn_time: 0,
            last_transform_time: 0,
            kill_count: 0,
            is_dashing: false,
        };
        let event = RoomEvent::State(StateSnapshot {
            tick: 3,
            server_time: 99,
            time_until_transform: 100,
            players: vec![view("me"), view("you")],
        });
        let Some(RoomEvent::State(mine)) = event_for_viewer(&event, "me") else {
            panic!("state should pass through");
        };
        assert_eq!(mine.players[0].next_rps_state, Some(RpsState::Scissors));
        assert_eq!(mine.players[1].next_rps_state, None);

        let wire = serde_json::to_value(RoomEvent::State(mine)).unwrap();
        assert_eq!(wire["type"], "state");
        assert!(wire["players"][1].get("nextRpsState").is_none());
    }

    #[test]
    fn pong_echoes_client_time() {
        let value = pong_message(12.5, 1_000);
        assert_eq!(value["type"], "pong");
        assert_eq!(value["t"], 12.5);
        assert_eq!(value["serverTime"], 1_000);
    }
}
