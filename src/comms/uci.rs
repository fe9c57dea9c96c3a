use std::time::Duration;

use shakmaty::Color;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::oneshot,
    task::JoinHandle,
};

use crate::{
    comms::uci_parser::{GoParams, UciCommand, parse_line},
    prelude::*,
};

#[derive(Debug)]
pub struct UciState {
    engine: DecisionEngine,
    /// `None` after a rejected `position`, until a valid one arrives.
    history: Option<Vec<String>>,
    /// Set through `setoption name Mode`; otherwise the clock decides.
    mode: Option<SpeedMode>,
    decision: Option<JoinHandle<()>>,
    /// Holds back the `bestmove` of a `go infinite` until `stop`.
    release: Option<oneshot::Sender<()>>,
}

impl UciState {
    pub fn new(engine: DecisionEngine) -> Self {
        Self {
            engine,
            history: Some(Vec::new()),
            mode: None,
            decision: None,
            release: None,
        }
    }

    fn reset(&mut self) {
        trace!("Resetting UciState");
        self.history = Some(Vec::new());
    }

    fn side_to_move(&self) -> Color {
        let plies = self.history.as_ref().map_or(0, Vec::len);
        if plies % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    /// Mode for a `go`: the option if set, else the clock, else normal.
    fn mode_for(&self, params: &GoParams) -> SpeedMode {
        if let Some(mode) = self.mode {
            return mode;
        }
        if let Some(remaining) = params.remaining(self.side_to_move()) {
            return SpeedMode::from_clock(remaining);
        }
        let normal_floor = self.engine.think_time().floor(SpeedMode::Normal);
        match params.movetime {
            Some(ms) if Duration::from_millis(ms) < normal_floor => SpeedMode::Fast,
            _ => SpeedMode::default(),
        }
    }

    /// Drops an in-flight decision without printing its move.
    fn abandon(&mut self) {
        self.release = None;
        if let Some(handle) = self.decision.take() {
            debug!("Abandoning in-flight decision");
            handle.abort();
        }
    }
}

pub async fn play(engine: DecisionEngine) -> miette::Result<()> {
    let mut state = UciState::new(engine);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .into_diagnostic()
        .context("Reading UCI input")?
    {
        match parse_line(&line) {
            UciCommand::Uci => cmd_uci(),
            UciCommand::IsReady => cmd_isready(),
            UciCommand::UciNewGame => {
                state.abandon();
                state.reset();
            }
            UciCommand::Position {
                startpos,
                fen,
                moves,
            } => {
                state.abandon();
                if let Err(e) = cmd_position(&mut state, startpos, fen, moves) {
                    warn!("Error processing position command: {:?}", e);
                }
            }
            UciCommand::Go(go_params) => {
                state.abandon();
                cmd_go(&mut state, go_params);
            }
            UciCommand::Stop => cmd_stop(&mut state).await,
            UciCommand::Quit => break,
            UciCommand::Unknown(cmd) => {
                if !cmd.is_empty() {
                    info!("Received unknown command: {cmd}");
                }
            }
            UciCommand::SetOption { name, value } => {
                if let Err(e) = cmd_setoption(&mut state, &name, &value) {
                    warn!("Error setting option: {e:?}");
                }
            }
        }
    }

    state.abandon();

    Ok(())
}

fn cmd_position(
    state: &mut UciState,
    startpos: bool,
    fen: Option<String>,
    moves: Vec<String>,
) -> miette::Result<()> {
    // The old game is gone either way, never answer for it.
    state.history = None;
    if let Some(fen) = fen {
        miette::bail!("`position fen {fen}` is unsupported, games must start from startpos");
    }
    miette::ensure!(startpos, "position needs `startpos`");

    Game::replay(&moves)?;
    state.history = Some(moves);
    Ok(())
}

fn cmd_go(state: &mut UciState, params: GoParams) {
    let Some(history) = state.history.clone() else {
        warn!("go without a valid position");
        println!("bestmove 0000");
        return;
    };
    let mode = state.mode_for(&params);
    let engine = state.engine.clone();

    let hold = if params.infinite {
        let (tx, rx) = oneshot::channel();
        state.release = Some(tx);
        Some(rx)
    } else {
        None
    };

    debug!("Deciding at ply {} in {mode} mode", history.len());
    state.decision = Some(tokio::spawn(async move {
        let line = match engine.decide(&history, mode).await {
            Ok(decision) => format!("bestmove {}", decision.uci),
            Err(e) => {
                warn!("No decision: {e}");
                "bestmove 0000".to_string()
            }
        };
        if let Some(rx) = hold {
            // A dropped sender releases as well.
            let _ = rx.await;
        }
        println!("{line}");
    }));
}

/// Releases a `go infinite` and waits for the running decision so its
/// `bestmove` still reaches the GUI.
async fn cmd_stop(state: &mut UciState) {
    if let Some(tx) = state.release.take() {
        let _ = tx.send(());
    }
    let Some(handle) = state.decision.take() else {
        return;
    };
    if let Err(e) = handle.await {
        warn!("Decision task failed: {e}");
    }
}

fn cmd_setoption(state: &mut UciState, name: &str, value: &str) -> miette::Result<()> {
    match name {
        "LogFile" => {
            let enable = value.to_lowercase() == "true";
            toggle_file_logging(enable)?;
            info!("Set file logging to {enable}");
        }
        "LogLevel" => {
            let level: Level = value
                .trim()
                .parse()
                .map_err(|_| miette::miette!("unknown log level `{value}`"))?;
            set_log_level(level)?;
        }
        "Mode" => {
            state.mode = match value.trim().to_ascii_lowercase().as_str() {
                "" | "auto" => None,
                other => Some(other.parse::<SpeedMode>().map_err(|e| miette::miette!(e))?),
            };
            info!("Set mode to {:?}", state.mode);
        }
        _ => {
            info!("Unknown option: {name} = {value}");
        }
    }
    Ok(())
}

fn cmd_isready() {
    println!("readyok");
}

fn cmd_uci() {
    println!("id name {} {}", env!("CARGO_PKG_NAME"), env!("APP_VERSION"));
    println!("id author {}", env!("CARGO_PKG_AUTHORS"));
    println!();
    println!("option name LogFile type check default false");
    println!("option name LogLevel type combo default info var error var warn var info var debug var trace");
    println!("option name Mode type combo default auto var auto var fast var normal");
    println!("uciok");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{book::OpeningBook, config::EngineConfig, model::TransitionModel};

    fn state() -> UciState {
        let vocab = Vocabulary::from_pairs([("e4", 1)]);
        let model = TransitionModel::uniform(vocab.len());
        let engine = DecisionEngine::new(
            Arc::new(vocab),
            Arc::new(model),
            Arc::new(OpeningBook::default()),
            &EngineConfig::default(),
        );
        UciState::new(engine)
    }

    fn moves(list: &[&str]) -> Vec<String> {
        list.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn test_position_replaces_history() {
        let mut state = state();
        cmd_position(&mut state, true, None, moves(&["e2e4", "e7e5"])).unwrap();
        assert_eq!(state.history, Some(moves(&["e2e4", "e7e5"])));
        assert_eq!(state.side_to_move(), Color::White);
        cmd_position(&mut state, true, None, moves(&["d2d4"])).unwrap();
        assert_eq!(state.side_to_move(), Color::Black);
    }

    #[test]
    fn test_position_rejects_fen_and_illegal_moves() {
        let mut state = state();
        cmd_position(&mut state, true, None, moves(&["e2e4"])).unwrap();
        let fen = Some("8/8/8/8/8/8/8/K6k w - - 0 1".to_string());
        assert!(cmd_position(&mut state, false, fen, vec![]).is_err());
        assert_eq!(state.history, None);

        cmd_position(&mut state, true, None, moves(&["e2e4"])).unwrap();
        assert!(cmd_position(&mut state, true, None, moves(&["e2e5"])).is_err());
        assert_eq!(state.history, None);
    }

    #[tokio::test]
    async fn test_go_after_rejected_position_does_not_decide() {
        let mut state = state();
        cmd_position(&mut state, true, None, moves(&["e2e4"])).unwrap();
        let rejected = moves(&["e2e4", "e7e5", "e4e5"]);
        assert!(cmd_position(&mut state, true, None, rejected).is_err());

        cmd_go(&mut state, GoParams::default());
        assert!(state.decision.is_none());

        cmd_position(&mut state, true, None, moves(&["e2e4", "e7e5"])).unwrap();
        assert_eq!(state.side_to_move(), Color::White);
        cmd_setoption(&mut state, "Mode", "fast").unwrap();
        cmd_go(&mut state, GoParams::default());
        assert!(state.decision.is_some());
        cmd_stop(&mut state).await;
    }

    #[test]
    fn test_ucinewgame_clears_rejection() {
        let mut state = state();
        assert!(cmd_position(&mut state, true, None, moves(&["e2e5"])).is_err());
        state.reset();
        assert_eq!(state.history, Some(Vec::new()));
    }

    #[test]
    fn test_mode_selection() {
        let mut state = state();
        let short_clock = GoParams {
            wtime: Some(60_000),
            ..Default::default()
        };
        assert_eq!(state.mode_for(&short_clock), SpeedMode::Fast);
        assert_eq!(state.mode_for(&GoParams::default()), SpeedMode::Normal);
        let quick = GoParams {
            movetime: Some(100),
            ..Default::default()
        };
        assert_eq!(state.mode_for(&quick), SpeedMode::Fast);

        cmd_setoption(&mut state, "Mode", "normal").unwrap();
        assert_eq!(state.mode_for(&short_clock), SpeedMode::Normal);
        cmd_setoption(&mut state, "Mode", "auto").unwrap();
        assert_eq!(state.mode_for(&short_clock), SpeedMode::Fast);
        assert!(cmd_setoption(&mut state, "Mode", "blitz").is_err());
    }

    #[tokio::test]
    async fn test_stop_waits_for_decision() {
        let mut state = state();
        cmd_setoption(&mut state, "Mode", "fast").unwrap();
        cmd_go(&mut state, GoParams::default());
        assert!(state.decision.is_some());
        cmd_stop(&mut state).await;
        assert!(state.decision.is_none());
    }

    #[tokio::test]
    async fn test_infinite_holds_until_stop() {
        let mut state = state();
        cmd_position(&mut state, true, None, moves(&["e2e4"])).unwrap();
        cmd_setoption(&mut state, "Mode", "fast").unwrap();
        cmd_go(
            &mut state,
            GoParams {
                infinite: true,
                ..Default::default()
            },
        );
        assert!(state.release.is_some());

        // Well past the fast floor, the answer is still held.
        tokio::time::sleep(Duration::from_millis(800)).await;
        let running = state.decision.as_ref().map(|h| h.is_finished());
        assert_eq!(running, Some(false));

        cmd_stop(&mut state).await;
        assert!(state.release.is_none());
        assert!(state.decision.is_none());
    }
}
