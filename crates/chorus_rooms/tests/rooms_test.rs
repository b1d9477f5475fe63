//! End-to-end tests: lobby pairing through game completion.

use chorus_rooms::{
    ClientId, InMemoryRuntime, InboundCommand, InboundEvent, OutboundCommand, OutboundMessage,
    Player, RoomName, RoomRuntime, RoomsConfig, Scope, SessionManager, SessionPhase, Turn,
};

type Manager = SessionManager<InMemoryRuntime>;

const ROOM: &str = "alice vs bob";

fn id(s: &str) -> ClientId {
    ClientId::new(s)
}

fn manager() -> Manager {
    SessionManager::new(InMemoryRuntime::new(), &RoomsConfig::default())
}

/// Lobby with alice and bob paired and the game running.
fn paired() -> Manager {
    let mut m = manager();
    for who in ["alice", "bob"] {
        m.handle(&InboundEvent::lobby(who, InboundCommand::Join))
            .unwrap();
    }
    m
}

fn play(m: &mut Manager, who: &str, x: i64, y: i64) {
    m.handle(&InboundEvent::room(ROOM, who, InboundCommand::Move { x, y }))
        .unwrap();
}

fn last_command(m: &Manager, who: &str) -> Option<OutboundCommand> {
    m.runtime()
        .inbox(&id(who))
        .last()
        .map(|msg| msg.command.clone())
}

fn inbox_len(m: &Manager, who: &str) -> usize {
    m.runtime().inbox(&id(who)).len()
}

#[test]
fn test_lobby_pairs_first_two_and_keeps_third_waiting() {
    let mut m = paired();
    m.handle(&InboundEvent::lobby("carol", InboundCommand::Join))
        .unwrap();

    assert_eq!(m.session_count(), 1);
    assert_eq!(m.lobby().waiting(), &Some(id("carol")));
    assert_eq!(m.runtime().members(&Scope::Lobby), vec![id("carol")]);

    let session = m.session(&RoomName::new(ROOM)).unwrap();
    assert_eq!(session.player_x(), &Some(id("alice")));
    assert_eq!(session.player_o(), &Some(id("bob")));
    assert_eq!(*session.ready_count(), 2);

    assert_eq!(
        m.runtime().inbox(&id("bob")),
        &[OutboundMessage::to(id("bob"), OutboundCommand::OUser)]
    );
    assert!(m.runtime().inbox(&id("carol")).is_empty());
}

#[test]
fn test_move_hands_turn_to_opponent_with_board() {
    let mut m = paired();
    play(&mut m, "alice", 0, 0);

    assert_eq!(
        last_command(&m, "bob"),
        Some(OutboundCommand::Turn {
            board: "x........".parse().unwrap()
        })
    );
    assert_eq!(
        m.runtime()
            .sent()
            .last()
            .map(|sent| serde_json::to_value(sent).unwrap()),
        Some(serde_json::json!({
            "RoomId": ROOM,
            "ReceiverId": "bob",
            "Cmd": "turn",
            "Data": { "Board": "x........" },
        }))
    );
}

#[test]
fn test_out_of_turn_move_is_rejected() {
    let mut m = paired();
    play(&mut m, "bob", 1, 1);

    assert_eq!(
        last_command(&m, "bob"),
        Some(OutboundCommand::Error {
            msg: "Not your turn".to_string()
        })
    );
    let session = m.session(&RoomName::new(ROOM)).unwrap();
    assert_eq!(session.board().to_string(), ".........");
}

#[test]
fn test_win_broadcasts_and_ends_room() {
    let mut m = paired();
    play(&mut m, "alice", 0, 0);
    play(&mut m, "bob", 0, 1);
    play(&mut m, "alice", 1, 0);
    play(&mut m, "bob", 1, 1);
    play(&mut m, "alice", 2, 0);

    let win = Some(OutboundCommand::Win { winner: Player::X });
    assert_eq!(last_command(&m, "alice"), win);
    assert_eq!(last_command(&m, "bob"), win);

    let room = RoomName::new(ROOM);
    assert!(m.session(&room).is_none());
    assert!(!m.runtime().room_exists(&room));
    assert_eq!(m.runtime().ended_rooms(), &[room]);
}

#[test]
fn test_move_after_room_ended_is_an_error() {
    let mut m = paired();
    m.handle(&InboundEvent::room(ROOM, "alice", InboundCommand::Leave))
        .unwrap();
    assert!(m
        .handle(&InboundEvent::room(ROOM, "bob", InboundCommand::Move { x: 0, y: 0 }))
        .is_err());
}

#[test]
fn test_leave_mid_game_sends_endgame() {
    let mut m = paired();
    play(&mut m, "alice", 1, 1);
    m.handle(&InboundEvent::room(ROOM, "bob", InboundCommand::Leave))
        .unwrap();

    assert_eq!(last_command(&m, "alice"), Some(OutboundCommand::Endgame));
    assert_eq!(m.session_count(), 0);
    assert!(m.runtime().members(&Scope::Room(RoomName::new(ROOM))).is_empty());
}

#[test]
fn test_off_board_moves_never_change_the_board() {
    let mut m = paired();
    for x in -3i64..6 {
        for y in -3i64..6 {
            if (0..3).contains(&x) && (0..3).contains(&y) {
                continue;
            }
            let (alice_before, bob_before) = (inbox_len(&m, "alice"), inbox_len(&m, "bob"));
            play(&mut m, "alice", x, y);

            assert_eq!(inbox_len(&m, "alice"), alice_before + 1, "coordinate ({x}, {y})");
            assert_eq!(inbox_len(&m, "bob"), bob_before, "coordinate ({x}, {y})");
            assert_eq!(
                last_command(&m, "alice"),
                Some(OutboundCommand::Error {
                    msg: format!("position was not on board: {}", y * 3 + x)
                }),
                "coordinate ({x}, {y})"
            );
        }
    }

    let session = m.session(&RoomName::new(ROOM)).unwrap();
    assert_eq!(session.board().to_string(), ".........");
    assert_eq!(session.phase(), &SessionPhase::InProgress);
}

#[test]
fn test_occupied_move_sends_one_error_and_keeps_board() {
    let mut m = paired();
    play(&mut m, "alice", 1, 1);

    let (alice_before, bob_before) = (inbox_len(&m, "alice"), inbox_len(&m, "bob"));
    let sent_before = m.runtime().sent().len();
    play(&mut m, "bob", 1, 1);

    assert_eq!(inbox_len(&m, "bob"), bob_before + 1);
    assert_eq!(inbox_len(&m, "alice"), alice_before);
    assert_eq!(m.runtime().sent().len(), sent_before + 1);
    assert_eq!(
        last_command(&m, "bob"),
        Some(OutboundCommand::Error {
            msg: "illegal move, space not available: x".to_string()
        })
    );

    let session = m.session(&RoomName::new(ROOM)).unwrap();
    assert_eq!(session.board().to_string(), "....x....");
    assert_eq!(session.turn(), &Turn::Player(Player::O));
}

#[test]
fn test_chat_in_lobby_skips_players_in_a_game() {
    let mut m = paired();
    m.handle(&InboundEvent::lobby("carol", InboundCommand::Join))
        .unwrap();
    m.handle(&InboundEvent::lobby(
        "carol",
        InboundCommand::Say {
            msg: "anyone?".to_string(),
        },
    ))
    .unwrap();

    assert_eq!(
        last_command(&m, "carol"),
        Some(OutboundCommand::Say {
            from: id("carol"),
            msg: "anyone?".to_string(),
        })
    );
    assert_eq!(last_command(&m, "alice").map(|c| c.name()), Some("turn"));
    assert_eq!(inbox_len(&m, "bob"), 1);
}

#[test]
fn test_json_event_stream() {
    let mut m = manager();
    let lines = [
        r#"{"RoomId":"","SenderId":"alice","Cmd":"join","Data":{}}"#,
        r#"{"RoomId":"","SenderId":"bob","Cmd":"JOIN","Data":{}}"#,
        r#"{"RoomId":"alice vs bob","SenderId":"alice","Cmd":"move","Data":{"x":2,"y":2}}"#,
        r#"{"RoomId":"alice vs bob","SenderId":"bob","Cmd":"Move","Data":{"x":"2","y":"2"}}"#,
    ];
    for line in lines {
        let event = InboundEvent::from_json(line).unwrap();
        m.handle(&event).unwrap();
    }

    let wire: Vec<_> = m
        .runtime_mut()
        .drain_sent()
        .iter()
        .map(|sent| serde_json::to_value(sent).unwrap())
        .collect();
    let cmds: Vec<_> = wire.iter().map(|v| v["Cmd"].as_str().unwrap()).collect();
    assert_eq!(cmds, ["x-user", "o-user", "turn", "turn", "error"]);
    assert_eq!(wire[4]["ReceiverId"], "bob");
    assert_eq!(
        wire[4]["Data"]["Msg"],
        "illegal move, space not available: x"
    );
    assert!(m.runtime().sent().is_empty());
}

#[test]
fn test_config_file_enables_full_room_notice() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "notify_full_room = true").unwrap();
    let config = RoomsConfig::from_file(file.path()).unwrap();

    let mut m = SessionManager::new(InMemoryRuntime::new(), &config);
    for who in ["alice", "bob"] {
        m.handle(&InboundEvent::lobby(who, InboundCommand::Join))
            .unwrap();
    }
    m.handle(&InboundEvent::room(ROOM, "carol", InboundCommand::Join))
        .unwrap();

    assert_eq!(
        last_command(&m, "carol"),
        Some(OutboundCommand::Error {
            msg: "room is full".to_string()
        })
    );
    assert_eq!(
        m.runtime().members(&Scope::Room(RoomName::new(ROOM))),
        vec![id("alice"), id("bob")]
    );
}

#[test]
fn test_config_file_guards_duplicate_join() {
    let config = RoomsConfig::from_toml("reject_duplicate_join = true").unwrap();
    let mut m = SessionManager::new(InMemoryRuntime::new(), &config);
    for _ in 0..2 {
        m.handle(&InboundEvent::lobby("alice", InboundCommand::Join))
            .unwrap();
    }
    assert_eq!(m.session_count(), 0);
    assert_eq!(m.lobby().waiting(), &Some(id("alice")));
}
