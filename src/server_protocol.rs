use serde_json::Value;

use crate::types::Level;

#[derive(Debug)]
pub enum ParsedClientMessage {
    Hello {
        name: String,
        reconnect_token: Option<String>,
    },
    LobbyStart {
        level: Option<Level>,
        ai_player_count: Option<i64>,
        time_limit_seconds: Option<i64>,
    },
    Collect {
        coin_id: String,
    },
    Pause,
    Resume,
    Difficulty {
        level: Level,
    },
    Restart,
    Ping {
        t: f64,
    },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "hello" => {
            let name = object.get("name")?.as_str()?.to_string();
            let reconnect_token = match object.get("reconnectToken") {
                None => None,
                Some(value) => Some(value.as_str()?.to_string()),
            };
            Some(ParsedClientMessage::Hello {
                name,
                reconnect_token,
            })
        }
        "lobby_start" => {
            let level = match object.get("level") {
                None => None,
                Some(value) => Some(Level::parse(value.as_str()?)?),
            };
            let ai_player_count = parse_optional_i64(object.get("aiPlayerCount"))?;
            let time_limit_seconds = parse_optional_i64(object.get("timeLimitSeconds"))?;
            Some(ParsedClientMessage::LobbyStart {
                level,
                ai_player_count,
                time_limit_seconds,
            })
        }
        "collect" => {
            let coin_id = object.get("coinId")?.as_str()?.to_string();
            if coin_id.is_empty() {
                return None;
            }
            Some(ParsedClientMessage::Collect { coin_id })
        }
        "pause" => Some(ParsedClientMessage::Pause),
        "resume" => Some(ParsedClientMessage::Resume),
        "difficulty" => {
            let level = Level::parse(object.get("level")?.as_str()?)?;
            Some(ParsedClientMessage::Difficulty { level })
        }
        "restart" => Some(ParsedClientMessage::Restart),
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

fn parse_optional_i64(value: Option<&Value>) -> Option<Option<i64>> {
    const MAX_SAFE_INTEGER_F64: f64 = 9_007_199_254_740_991.0;

    let Some(value) = value else {
        return Some(None);
    };
    if let Some(number) = value.as_i64() {
        return Some(Some(number));
    }
    if let Some(number) = value.as_u64() {
        return i64::try_from(number).ok().map(Some);
    }
    if let Some(number) = value.as_f64() {
        if number.is_finite() {
            let floored = number.floor();
            if floored.abs() > MAX_SAFE_INTEGER_F64 {
                return None;
            }
            return Some(Some(floored as i64));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hello_message() {
        let parsed = parse_client_message(r#"{"type":"hello","name":"A","reconnectToken":"tok"}"#)
            .expect("hello message should parse");
        match parsed {
            ParsedClientMessage::Hello {
                name,
                reconnect_token,
            } => {
                assert_eq!(name, "A");
                assert_eq!(reconnect_token.as_deref(), Some("tok"));
            }
            _ => panic!("expected hello message"),
        }
    }

    #[test]
    fn parse_lobby_start_message() {
        let parsed = parse_client_message(
            r#"{"type":"lobby_start","level":"hard","aiPlayerCount":1,"timeLimitSeconds":45}"#,
        )
        .expect("lobby start message should parse");
        match parsed {
            ParsedClientMessage::LobbyStart {
                level,
                ai_player_count,
                time_limit_seconds,
            } => {
                assert_eq!(level, Some(Level::Hard));
                assert_eq!(ai_player_count, Some(1));
                assert_eq!(time_limit_seconds, Some(45));
            }
            _ => panic!("expected lobby_start message"),
        }
    }

    #[test]
    fn parse_lobby_start_rejects_unknown_level() {
        assert!(parse_client_message(r#"{"type":"lobby_start","level":"nightmare"}"#).is_none());
    }

    #[test]
    fn parse_lobby_start_floors_float_values() {
        let parsed = parse_client_message(
            r#"{"type":"lobby_start","aiPlayerCount":1.9,"timeLimitSeconds":-1.2}"#,
        )
        .expect("lobby start should parse");
        match parsed {
            ParsedClientMessage::LobbyStart {
                ai_player_count,
                time_limit_seconds,
                ..
            } => {
                assert_eq!(ai_player_count, Some(1));
                assert_eq!(time_limit_seconds, Some(-2));
            }
            _ => panic!("expected lobby_start message"),
        }
    }

    #[test]
    fn parse_lobby_start_rejects_overflow_numbers() {
        let parsed =
            parse_client_message(r#"{"type":"lobby_start","aiPlayerCount":18446744073709551615}"#);
        assert!(parsed.is_none());

        let parsed = parse_client_message(r#"{"type":"lobby_start","aiPlayerCount":1e100}"#);
        assert!(parsed.is_none());
    }

    #[test]
    fn parse_collect_requires_coin_id() {
        assert!(matches!(
            parse_client_message(r#"{"type":"collect","coinId":"coin_3"}"#),
            Some(ParsedClientMessage::Collect { coin_id }) if coin_id == "coin_3"
        ));
        assert!(parse_client_message(r#"{"type":"collect"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"collect","coinId":""}"#).is_none());
    }

    #[test]
    fn parse_lifecycle_controls() {
        assert!(matches!(
            parse_client_message(r#"{"type":"pause"}"#),
            Some(ParsedClientMessage::Pause)
        ));
        assert!(matches!(
            parse_client_message(r#"{"type":"resume"}"#),
            Some(ParsedClientMessage::Resume)
        ));
        assert!(matches!(
            parse_client_message(r#"{"type":"restart"}"#),
            Some(ParsedClientMessage::Restart)
        ));
        assert!(matches!(
            parse_client_message(r#"{"type":"difficulty","level":"easy"}"#),
            Some(ParsedClientMessage::Difficulty { level: Level::Easy })
        ));
        assert!(parse_client_message(r#"{"type":"difficulty"}"#).is_none());
    }

    #[test]
    fn parse_ping_requires_finite_number() {
        let parsed = parse_client_message(r#"{"type":"ping","t":12.5}"#);
        assert!(matches!(parsed, Some(ParsedClientMessage::Ping { .. })));
        assert!(parse_client_message(r#"{"type":"ping","t":"soon"}"#).is_none());
    }

    #[test]
    fn unknown_message_type_is_ignored() {
        assert!(parse_client_message(r#"{"type":"input","dir":"up"}"#).is_none());
        assert!(parse_client_message("not json").is_none());
    }
}
