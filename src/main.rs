use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use log::{info, trace, warn};
use memory_match::events::Channel;
use memory_match::game::{
    GameEngine, GlibScheduler, HistoryViewModel, JsonStatsStore, MemoryStatsStore, Scheduler,
    Settings, StatsStore,
};
use memory_match::model::{
    CardView, GameEngineCommand, GameEngineEvent, Provenance, SessionPhase, SessionSnapshot,
};
use memory_match::Destroyable;

const TAP_INTERVAL: Duration = Duration::from_millis(250);

fn init_logging() {
    env_logger::init();
}

/// Plays by remembering every face it has been shown.
#[derive(Default)]
struct AutoPlayer {
    game_id: u64,
    seen: HashMap<usize, u32>,
    snapshot: Option<SessionSnapshot>,
}

impl AutoPlayer {
    fn observe(&mut self, snapshot: &SessionSnapshot) {
        if snapshot.game_id != self.game_id {
            self.game_id = snapshot.game_id;
            self.seen.clear();
        }
        for card in &snapshot.cards {
            if let Some(value) = card.value {
                self.seen.insert(card.index, value);
            }
        }
        self.snapshot = Some(snapshot.clone());
    }

    fn next_tap(&self) -> Option<usize> {
        let snapshot = self.snapshot.as_ref()?;
        if snapshot.phase != SessionPhase::Active {
            return None;
        }
        let face_down: Vec<&CardView> = snapshot.cards.iter().filter(|c| !c.face_up).collect();

        match snapshot.pending_selection {
            Some(pending) => {
                let value = self.seen.get(&pending)?;
                face_down
                    .iter()
                    .find(|c| self.seen.get(&c.index) == Some(value))
                    .or_else(|| face_down.iter().find(|c| !self.seen.contains_key(&c.index)))
                    .or_else(|| face_down.first())
                    .map(|c| c.index)
            }
            None => {
                // wait for the last mismatch to be turned back
                if snapshot.cards.iter().any(|c| c.face_up && !c.matched) {
                    return None;
                }
                self.known_pair(&face_down)
                    .or_else(|| {
                        face_down
                            .iter()
                            .find(|c| !self.seen.contains_key(&c.index))
                            .map(|c| c.index)
                    })
                    .or_else(|| face_down.first().map(|c| c.index))
            }
        }
    }

    fn known_pair(&self, face_down: &[&CardView]) -> Option<usize> {
        let mut by_value: HashMap<u32, usize> = HashMap::new();
        for card in face_down {
            if let Some(value) = self.seen.get(&card.index) {
                if by_value.insert(*value, card.index).is_some() {
                    return Some(card.index);
                }
            }
        }
        None
    }
}

fn main() {
    init_logging();

    let mut settings = Settings::load();
    if settings.player_name.is_empty() {
        settings.player_name = std::env::var("USER").unwrap_or_else(|_| "player".to_string());
    }

    let main_loop = glib::MainLoop::new(None, false);
    let scheduler = Rc::new(GlibScheduler::new());
    let local = Rc::new(JsonStatsStore::new());
    let remote = Rc::new(MemoryStatsStore::new(Provenance::Remote));

    let history = Rc::new(RefCell::new(HistoryViewModel::new()));
    let history_subscriptions = vec![
        HistoryViewModel::connect(&history, &*local),
        HistoryViewModel::connect(&history, &*remote),
    ];

    let (game_engine_command_emitter, game_engine_command_observer) =
        Channel::<GameEngineCommand>::new();
    let (game_engine_event_emitter, game_engine_event_observer) =
        Channel::<GameEngineEvent>::new();
    let engine = GameEngine::new(
        game_engine_command_observer,
        game_engine_event_emitter,
        scheduler.clone(),
        vec![
            local.clone() as Rc<dyn StatsStore>,
            remote.clone() as Rc<dyn StatsStore>,
        ],
        settings,
    );

    let player = Rc::new(RefCell::new(AutoPlayer::default()));
    let event_subscription = {
        let player = Rc::clone(&player);
        let main_loop = main_loop.clone();
        game_engine_event_observer.subscribe(move |event| match event {
            GameEngineEvent::SessionUpdated(snapshot) => player.borrow_mut().observe(snapshot),
            GameEngineEvent::TimerTicked(seconds) => trace!(target: "main", "{}s", seconds),
            GameEngineEvent::GameOver(record) => {
                info!(
                    target: "main",
                    "{} finished {} in {} moves and {}s",
                    record.player_name,
                    record.board,
                    record.moves,
                    record.duration_secs
                );
                main_loop.quit();
            }
            GameEngineEvent::PersistenceFailed { error, .. } => {
                warn!(target: "main", "Result not saved: {}", error)
            }
            GameEngineEvent::ConfigurationRejected(reason) => {
                warn!(target: "main", "Configuration rejected: {}", reason)
            }
            _ => (),
        })
    };

    let tapper = {
        let player = Rc::clone(&player);
        let commands = game_engine_command_emitter.clone();
        scheduler.schedule_repeating(
            TAP_INTERVAL,
            Box::new(move || {
                let next = player.borrow().next_tap();
                if let Some(index) = next {
                    commands.emit(GameEngineCommand::Tap(index));
                }
            }),
        )
    };

    game_engine_command_emitter.emit(GameEngineCommand::InitDisplay);
    game_engine_command_emitter.emit(GameEngineCommand::NewGame);
    main_loop.run();

    scheduler.cancel(tapper);
    event_subscription.unsubscribe();

    {
        let mut history = history.borrow_mut();
        history.sort_by_moves();
        println!("{:<16} {:<10} {:>6} {:>8}  {}", "PLAYER", "BOARD", "MOVES", "TIME", "SOURCE");
        for record in history.records() {
            println!(
                "{:<16} {:<10} {:>6} {:>7}s  {}{}",
                record.player_name,
                record.board,
                record.moves,
                record.duration_secs,
                record.provenance,
                if record.completed { "" } else { " (abandoned)" }
            );
        }
    }
    for subscription in history_subscriptions {
        subscription.unsubscribe();
    }

    if let Err(err) = engine.borrow().settings().save() {
        warn!(target: "main", "Failed to save settings: {}", err);
    }
    engine.borrow_mut().destroy();
}
