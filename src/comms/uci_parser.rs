use std::time::Duration;

use shakmaty::Color;
use tracing::trace;

#[derive(Debug, PartialEq)]
pub enum UciCommand {
    /// "uci" cmd, sent at startup
    Uci,
    /// "isready" cmd, to check if engine is ready
    IsReady,
    /// "ucinewgame" cmd, to setup a new game state
    UciNewGame,
    /// "position" cmd, to setup the game history
    Position {
        startpos: bool,
        fen: Option<String>,
        moves: Vec<String>,
    },
    /// "go" cmd, to start a decision + time controls
    Go(GoParams),
    /// "stop" cmd, to abandon the running decision
    Stop,
    /// "setoption" cmd, to configure engine options
    SetOption { name: String, value: String },
    /// "quit" cmd, to exit
    Quit,
    /// unknown or unsupported cmd
    Unknown(String),
}

#[derive(Debug, PartialEq, Default)]
pub struct GoParams {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub movetime: Option<u64>,
    /// Hold the answer until `stop`.
    pub infinite: bool,
}

impl GoParams {
    /// Remaining clock for `side`, if the GUI sent one.
    pub fn remaining(&self, side: Color) -> Option<Duration> {
        let ms = match side {
            Color::White => self.wtime,
            Color::Black => self.btime,
        };
        ms.map(Duration::from_millis)
    }
}

pub fn parse_line(line: &str) -> UciCommand {
    trace!("UCI: {line}");
    let parts: Vec<&str> = line.trim().split_ascii_whitespace().collect();
    if parts.is_empty() {
        return UciCommand::Unknown(line.to_string());
    }

    match parts[0] {
        "uci" => UciCommand::Uci,
        "isready" => UciCommand::IsReady,
        "stop" => UciCommand::Stop,
        "quit" => UciCommand::Quit,
        "position" => parse_position(&parts[1..]),
        "go" => parse_go(&parts[1..]),
        "ucinewgame" => UciCommand::UciNewGame,
        "setoption" => parse_setoption(&parts[1..]),
        _ => UciCommand::Unknown(line.to_string()),
    }
}

fn parse_position(parts: &[&str]) -> UciCommand {
    let mut fen: Option<String> = None;
    let mut moves: Vec<String> = Vec::new();
    let mut startpos = false;

    let moves_idx = parts.iter().position(|&p| p == "moves");

    let position_parts = if let Some(idx) = moves_idx {
        &parts[..idx]
    } else {
        parts
    };

    match position_parts.first() {
        Some(&"startpos") => startpos = true,
        Some(&"fen") => fen = Some(position_parts[1..].join(" ")),
        _ => {}
    }

    if let Some(idx) = moves_idx {
        moves = parts[idx + 1..].iter().map(|s| s.to_string()).collect();
    }

    UciCommand::Position {
        startpos,
        fen,
        moves,
    }
}

fn parse_go(parts: &[&str]) -> UciCommand {
    let mut params = GoParams::default();

    let mut i = 0;
    while i < parts.len() {
        let value = || parts.get(i + 1).and_then(|v| v.parse().ok());
        match parts[i] {
            "wtime" => {
                params.wtime = value();
                i += 1;
            }
            "btime" => {
                params.btime = value();
                i += 1;
            }
            // Increments and move counts do not change the floor.
            "winc" | "binc" | "movestogo" => i += 1,
            "movetime" => {
                params.movetime = value();
                i += 1;
            }
            "infinite" => params.infinite = true,
            _ => {}
        }
        i += 1;
    }

    UciCommand::Go(params)
}

fn parse_setoption(parts: &[&str]) -> UciCommand {
    // setoption name <name> [value <value>]
    let mut name = String::new();
    let mut value = String::new();
    let mut i = 0;
    while i < parts.len() {
        match parts[i] {
            "name" => {
                i += 1;
                while i < parts.len() && parts[i] != "value" {
                    if !name.is_empty() {
                        name.push(' ');
                    }
                    name.push_str(parts[i]);
                    i += 1;
                }
            }
            "value" => {
                i += 1;
                while i < parts.len() {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(parts[i]);
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    UciCommand::SetOption { name, value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_line("uci"), UciCommand::Uci);
        assert_eq!(parse_line("  isready "), UciCommand::IsReady);
        assert_eq!(parse_line("ucinewgame"), UciCommand::UciNewGame);
        assert_eq!(parse_line("stop"), UciCommand::Stop);
        assert_eq!(parse_line("quit"), UciCommand::Quit);
        assert_eq!(parse_line(""), UciCommand::Unknown(String::new()));
        assert_eq!(
            parse_line("debug on"),
            UciCommand::Unknown("debug on".to_string())
        );
    }

    #[test]
    fn test_position_startpos_with_moves() {
        assert_eq!(
            parse_line("position startpos moves e2e4 e7e5"),
            UciCommand::Position {
                startpos: true,
                fen: None,
                moves: vec!["e2e4".to_string(), "e7e5".to_string()],
            }
        );
        assert_eq!(
            parse_line("position startpos"),
            UciCommand::Position {
                startpos: true,
                fen: None,
                moves: vec![],
            }
        );
    }

    #[test]
    fn test_position_fen() {
        let UciCommand::Position { startpos, fen, moves } =
            parse_line("position fen 8/8/8/8/8/8/8/K6k w - - 0 1 moves a1a2")
        else {
            panic!("expected a position command");
        };
        assert!(!startpos);
        assert_eq!(fen.as_deref(), Some("8/8/8/8/8/8/8/K6k w - - 0 1"));
        assert_eq!(moves, vec!["a1a2".to_string()]);
    }

    #[test]
    fn test_go_clock() {
        let UciCommand::Go(params) =
            parse_line("go wtime 120000 btime 90000 winc 1000 binc 1000 movestogo 20")
        else {
            panic!("expected a go command");
        };
        assert_eq!(params.wtime, Some(120_000));
        assert_eq!(params.btime, Some(90_000));
        assert_eq!(params.movetime, None);
        assert!(!params.infinite);
        assert_eq!(
            params.remaining(Color::Black),
            Some(Duration::from_millis(90_000))
        );
    }

    #[test]
    fn test_go_movetime_and_infinite() {
        let UciCommand::Go(params) = parse_line("go movetime 500 infinite") else {
            panic!("expected a go command");
        };
        assert_eq!(params.movetime, Some(500));
        assert!(params.infinite);
        assert_eq!(params.remaining(Color::White), None);
    }

    #[test]
    fn test_setoption() {
        assert_eq!(
            parse_line("setoption name Mode value fast"),
            UciCommand::SetOption {
                name: "Mode".to_string(),
                value: "fast".to_string(),
            }
        );
        assert_eq!(
            parse_line("setoption name Log File value true"),
            UciCommand::SetOption {
                name: "Log File".to_string(),
                value: "true".to_string(),
            }
        );
    }
}
