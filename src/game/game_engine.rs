use log::{debug, error, info, trace, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::scheduler::{Scheduler, TaskId};
use super::session::{Session, TapOutcome};
use super::session_timer::SessionTimer;
use super::settings::Settings;
use super::stats_store::StatsStore;
use crate::destroyable::Destroyable;
use crate::error::GameError;
use crate::events::{EventEmitter, EventObserver, Unsubscriber};
use crate::model::{GameEngineCommand, GameEngineEvent, StatRecord};

#[derive(Debug)]
struct PendingHide {
    task: TaskId,
    first: usize,
    second: usize,
}

/// Owns the session and everything that mutates it: commands, timer ticks and
/// delayed hides all end up here, one at a time.
pub struct GameEngine {
    session: Session,
    settings: Settings,
    debug_mode: bool,
    timer: SessionTimer,
    scheduler: Rc<dyn Scheduler>,
    pending_hides: Vec<PendingHide>,
    stores: Vec<Rc<dyn StatsStore>>,
    subscription_id: Option<Unsubscriber<GameEngineCommand>>,
    game_engine_event_emitter: EventEmitter<GameEngineEvent>,
    self_ref: Weak<RefCell<GameEngine>>,
}

impl Destroyable for GameEngine {
    fn destroy(&mut self) {
        if let Some(subscription_id) = self.subscription_id.take() {
            subscription_id.unsubscribe();
        }
        self.timer.stop();
        self.cancel_pending_hides();
    }
}

impl GameEngine {
    pub fn new(
        game_engine_command_observer: EventObserver<GameEngineCommand>,
        game_engine_event_emitter: EventEmitter<GameEngineEvent>,
        scheduler: Rc<dyn Scheduler>,
        stores: Vec<Rc<dyn StatsStore>>,
        settings: Settings,
    ) -> Rc<RefCell<Self>> {
        let config = settings.board_config().unwrap_or_else(|err| {
            warn!(target: "game_engine", "Using default board: {}", err);
            Default::default()
        });
        let mut session = Session::new(config, Settings::seed_from_env());
        session.set_player_name(settings.player_name.clone());

        let refcell = Rc::new_cyclic(|self_ref| {
            RefCell::new(Self {
                session,
                settings,
                debug_mode: Settings::is_debug_mode(),
                timer: SessionTimer::new(Rc::clone(&scheduler)),
                scheduler,
                pending_hides: Vec::new(),
                stores,
                subscription_id: None,
                game_engine_event_emitter,
                self_ref: self_ref.clone(),
            })
        });
        GameEngine::wire_subscription(refcell.clone(), game_engine_command_observer);
        refcell
    }

    fn wire_subscription(
        game_engine: Rc<RefCell<Self>>,
        game_engine_command_observer: EventObserver<GameEngineCommand>,
    ) {
        let game_engine_handler = game_engine.clone();
        let subscription_id = game_engine_command_observer.subscribe(move |command| {
            let mut game_engine = game_engine_handler.borrow_mut();
            game_engine.handle_command(command.clone());
        });
        game_engine.borrow_mut().subscription_id = Some(subscription_id);
    }

    fn handle_command(&mut self, command: GameEngineCommand) {
        trace!(target: "game_engine", "Handling command: {:?}", command);
        let result = match command {
            GameEngineCommand::NewGame => self.start_new_game(),
            GameEngineCommand::Tap(index) => self.tap(index).map(|_| ()),
            GameEngineCommand::Restart => self.restart(),
            GameEngineCommand::UpdateConfiguration {
                card_count,
                columns,
            } => self.update_configuration(card_count, columns),
            GameEngineCommand::SetPlayerName(player_name) => {
                self.set_player_name(player_name);
                Ok(())
            }
            GameEngineCommand::SetSaveLocation(provenance) => {
                self.settings.save_location = provenance;
                Ok(())
            }
            GameEngineCommand::SetHideDelay(delay) => {
                self.settings.hide_delay_ms = delay.as_millis() as u64;
                Ok(())
            }
            GameEngineCommand::InitDisplay => {
                self.sync_session_display();
                Ok(())
            }
        };

        match result {
            Ok(()) => (),
            Err(err) if err.is_illegal_tap() => {
                debug!(target: "game_engine", "Ignoring tap: {}", err);
            }
            Err(GameError::InvalidConfiguration(err)) => {
                warn!(target: "game_engine", "Rejected configuration: {}", err);
                self.game_engine_event_emitter
                    .emit(GameEngineEvent::ConfigurationRejected(err.to_string()));
            }
            Err(err) => error!(target: "game_engine", "Command failed: {}", err),
        }
    }

    pub fn start_new_game(&mut self) -> Result<(), GameError> {
        self.session.start()?;
        self.begin_session();
        Ok(())
    }

    /// Abandons the current game, recording it as incomplete, and deals again.
    pub fn restart(&mut self) -> Result<(), GameError> {
        let abandoned = self.session.restart()?;
        self.begin_session();
        if let Some(record) = abandoned {
            self.persist(record);
        }
        Ok(())
    }

    pub fn update_configuration(
        &mut self,
        card_count: usize,
        columns: usize,
    ) -> Result<(), GameError> {
        self.session.update_configuration(card_count, columns)?;
        self.settings.card_count = card_count;
        self.settings.columns = columns;
        self.begin_session();
        Ok(())
    }

    pub fn tap(&mut self, index: usize) -> Result<TapOutcome, GameError> {
        let outcome = self.session.tap(index)?;
        match &outcome {
            TapOutcome::FirstSelected(_) | TapOutcome::Matched { .. } => {
                self.sync_session_display();
            }
            TapOutcome::Mismatched { first, second } => {
                self.schedule_hide(*first, *second);
                self.sync_session_display();
            }
            TapOutcome::Completed { record, .. } => {
                self.timer.stop();
                self.cancel_pending_hides();
                self.sync_session_display();
                self.game_engine_event_emitter
                    .emit(GameEngineEvent::GameOver(record.clone()));
                self.persist(record.clone());
            }
        }
        Ok(outcome)
    }

    fn set_player_name(&mut self, player_name: String) {
        self.settings.player_name = player_name.clone();
        self.session.set_player_name(player_name);
        self.sync_session_display();
    }

    fn begin_session(&mut self) {
        self.cancel_pending_hides();

        let game_id = self.session.game_id();
        let game_engine = self.self_ref.clone();
        self.timer.start(game_id, move || {
            if let Some(game_engine) = game_engine.upgrade() {
                game_engine.borrow_mut().on_timer_tick(game_id);
            }
        });

        if self.debug_mode {
            let values: Vec<u32> = self.session.deck().values().collect();
            info!(target: "game_engine", "Deck: {:?}", values);
        }
        self.sync_session_display();
    }

    fn on_timer_tick(&mut self, game_id: u64) {
        if game_id != self.session.game_id() {
            trace!(target: "game_engine", "Dropping tick from game {}", game_id);
            return;
        }
        if self.session.tick() {
            self.game_engine_event_emitter
                .emit(GameEngineEvent::TimerTicked(self.session.elapsed_secs()));
        }
    }

    fn schedule_hide(&mut self, first: usize, second: usize) {
        let game_id = self.session.game_id();
        let game_engine = self.self_ref.clone();
        let task = self.scheduler.schedule_once(
            self.settings.hide_delay(),
            Box::new(move || {
                if let Some(game_engine) = game_engine.upgrade() {
                    game_engine
                        .borrow_mut()
                        .on_hide_due(game_id, first, second);
                }
            }),
        );
        self.pending_hides.push(PendingHide {
            task,
            first,
            second,
        });
    }

    fn on_hide_due(&mut self, game_id: u64, first: usize, second: usize) {
        self.pending_hides
            .retain(|hide| (hide.first, hide.second) != (first, second));
        if game_id != self.session.game_id() {
            trace!(target: "game_engine", "Dropping hide from game {}", game_id);
            return;
        }

        let hidden = self.session.hide_mismatch(first, second);
        if !hidden.is_empty() {
            self.game_engine_event_emitter
                .emit(GameEngineEvent::CardsHidden(hidden));
            self.sync_session_display();
        }
    }

    fn cancel_pending_hides(&mut self) {
        for hide in self.pending_hides.drain(..) {
            self.scheduler.cancel(hide.task);
        }
    }

    fn persist(&mut self, record: StatRecord) {
        self.game_engine_event_emitter
            .emit(GameEngineEvent::StatRecorded(record.clone()));

        let location = self.settings.save_location;
        let result = match self
            .stores
            .iter()
            .find(|store| store.provenance() == location)
        {
            Some(store) => store.save(&record).map_err(|err| err.to_string()),
            None => Err(format!("no {} store configured", location)),
        };

        if let Err(err) = result {
            error!(target: "game_engine", "Failed to save stat record: {}", err);
            self.game_engine_event_emitter
                .emit(GameEngineEvent::PersistenceFailed { record, error: err });
        }
    }

    fn sync_session_display(&self) {
        self.game_engine_event_emitter
            .emit(GameEngineEvent::SessionUpdated(self.session.snapshot()));
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pending_hide_count(&self) -> usize {
        self.pending_hides.len()
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use serial_test::serial;
    use test_context::test_context;

    use super::*;
    use crate::events::Channel;
    use crate::game::scheduler::{GlibScheduler, ManualScheduler};
    use crate::game::session::tests::{mismatch_of, pair_of};
    use crate::game::stats_store::MemoryStatsStore;
    use crate::model::{Provenance, SessionPhase};
    use crate::tests::UsingLogger;

    struct Harness {
        engine: Rc<RefCell<GameEngine>>,
        commands: EventEmitter<GameEngineCommand>,
        events: Rc<RefCell<Vec<GameEngineEvent>>>,
        scheduler: Rc<ManualScheduler>,
        local: Rc<MemoryStatsStore>,
        remote: Rc<MemoryStatsStore>,
    }

    impl Harness {
        fn new(card_count: usize) -> Self {
            let (commands, command_observer) = Channel::<GameEngineCommand>::new();
            let (event_emitter, event_observer) = Channel::<GameEngineEvent>::new();
            let scheduler = Rc::new(ManualScheduler::new());
            let local = Rc::new(MemoryStatsStore::new(Provenance::Local));
            let remote = Rc::new(MemoryStatsStore::new(Provenance::Remote));
            let stores = vec![
                local.clone() as Rc<dyn StatsStore>,
                remote.clone() as Rc<dyn StatsStore>,
            ];
            let settings = Settings {
                card_count,
                columns: 2,
                player_name: "ada".to_string(),
                ..Settings::default()
            };
            let engine = GameEngine::new(
                command_observer,
                event_emitter,
                scheduler.clone(),
                stores,
                settings,
            );

            let events = Rc::new(RefCell::new(Vec::new()));
            let events_clone = Rc::clone(&events);
            event_observer.subscribe(move |event: &GameEngineEvent| {
                events_clone.borrow_mut().push(event.clone())
            });

            Self {
                engine,
                commands,
                events,
                scheduler,
                local,
                remote,
            }
        }

        fn pair(&self, value: u32) -> (usize, usize) {
            pair_of(self.engine.borrow().session(), value)
        }

        fn mismatch(&self) -> (usize, usize) {
            mismatch_of(self.engine.borrow().session())
        }

        fn tap_both(&self, (first, second): (usize, usize)) {
            self.commands.emit(GameEngineCommand::Tap(first));
            self.commands.emit(GameEngineCommand::Tap(second));
        }

        fn finish(&self) {
            let pairs = self.engine.borrow().session().config().pair_count() as u32;
            for value in 1..=pairs {
                self.tap_both(self.pair(value));
            }
        }

        fn elapsed(&self) -> u32 {
            self.engine.borrow().session().elapsed_secs()
        }

        fn count(&self, predicate: impl Fn(&GameEngineEvent) -> bool) -> usize {
            self.events.borrow().iter().filter(|e| predicate(e)).count()
        }
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_timer_stops_at_game_over(_: &mut UsingLogger) {
        let harness = Harness::new(4);
        harness.commands.emit(GameEngineCommand::NewGame);
        harness.scheduler.advance(Duration::from_secs(3));
        assert_eq!(harness.elapsed(), 3);
        assert_eq!(
            harness.count(|e| matches!(e, GameEngineEvent::TimerTicked(_))),
            3
        );

        harness.finish();
        assert!(harness.engine.borrow().session().is_game_over());
        assert!(!harness.engine.borrow().is_timer_running());

        harness.scheduler.advance(Duration::from_secs(5));
        assert_eq!(harness.elapsed(), 3);
        assert_eq!(harness.scheduler.pending_tasks(), 0);

        assert_eq!(harness.count(|e| matches!(e, GameEngineEvent::GameOver(_))), 1);
        let records = harness.local.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].completed);
        assert_eq!(records[0].moves, 2);
        assert_eq!(records[0].duration_secs, 3);
        assert_eq!(records[0].player_name, "ada");

        // taps after the end change nothing
        harness.commands.emit(GameEngineCommand::Tap(0));
        assert_eq!(harness.engine.borrow().session().moves(), 2);
        assert_eq!(harness.local.records().len(), 1);
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_restart_replaces_timer_and_records_abandoned_game(_: &mut UsingLogger) {
        let harness = Harness::new(8);
        harness.commands.emit(GameEngineCommand::NewGame);
        harness.scheduler.advance(Duration::from_secs(2));
        harness.tap_both(harness.mismatch());

        harness.commands.emit(GameEngineCommand::Restart);
        let records = harness.local.records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].completed);
        assert_eq!(records[0].moves, 1);
        assert_eq!(records[0].duration_secs, 2);

        // the old timer and the pending hide are gone
        assert_eq!(harness.scheduler.pending_tasks(), 1);
        assert_eq!(harness.engine.borrow().pending_hide_count(), 0);
        harness.scheduler.advance(Duration::from_secs(1));
        assert_eq!(harness.elapsed(), 1);
        assert_eq!(harness.engine.borrow().session().moves(), 0);
        assert_eq!(harness.count(|e| matches!(e, GameEngineEvent::CardsHidden(_))), 0);
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_restart_after_game_over_records_incomplete(_: &mut UsingLogger) {
        let harness = Harness::new(4);
        harness.commands.emit(GameEngineCommand::NewGame);
        harness.finish();
        harness.commands.emit(GameEngineCommand::Restart);

        let records = harness.local.records();
        assert_eq!(records.len(), 2);
        assert!(!records[0].completed);
        assert!(records[1].completed);
        assert_eq!(
            harness.engine.borrow().session().phase(),
            SessionPhase::Active
        );
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_mismatch_hidden_after_delay(_: &mut UsingLogger) {
        let harness = Harness::new(8);
        harness.commands.emit(GameEngineCommand::NewGame);
        let (a, b) = harness.mismatch();
        harness.tap_both((a, b));

        harness.scheduler.advance(Duration::from_millis(599));
        {
            let engine = harness.engine.borrow();
            assert!(engine.session().deck().get(a).unwrap().face_up);
            assert!(engine.session().deck().get(b).unwrap().face_up);
        }

        harness.scheduler.advance(Duration::from_millis(1));
        {
            let engine = harness.engine.borrow();
            assert!(!engine.session().deck().get(a).unwrap().face_up);
            assert!(!engine.session().deck().get(b).unwrap().face_up);
            assert_eq!(engine.pending_hide_count(), 0);
        }
        let hidden: Vec<Vec<usize>> = harness
            .events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                GameEngineEvent::CardsHidden(hidden) => Some(hidden.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(hidden, vec![vec![a, b]]);
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_play_continues_while_hide_is_pending(_: &mut UsingLogger) {
        let harness = Harness::new(8);
        harness.commands.emit(GameEngineCommand::NewGame);
        let (a, b) = harness.mismatch();
        harness.tap_both((a, b));

        let matched = {
            let engine = harness.engine.borrow();
            let value_a = engine.session().deck().get(a).unwrap().value;
            let value_b = engine.session().deck().get(b).unwrap().value;
            (1..=4)
                .find(|value| *value != value_a && *value != value_b)
                .unwrap()
        };
        let (c, d) = harness.pair(matched);
        harness.tap_both((c, d));

        harness.scheduler.advance(Duration::from_millis(600));
        let engine = harness.engine.borrow();
        let deck = engine.session().deck();
        assert!(deck.get(c).unwrap().matched && deck.get(c).unwrap().face_up);
        assert!(deck.get(d).unwrap().matched && deck.get(d).unwrap().face_up);
        assert!(!deck.get(a).unwrap().face_up);
        assert_eq!(engine.session().moves(), 2);
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_persistence_failure_does_not_block_play(_: &mut UsingLogger) {
        let harness = Harness::new(4);
        harness.local.set_online(false);
        harness.commands.emit(GameEngineCommand::NewGame);
        harness.finish();

        assert!(harness.engine.borrow().session().is_game_over());
        assert_eq!(
            harness.count(|e| matches!(e, GameEngineEvent::PersistenceFailed { .. })),
            1
        );
        assert_eq!(
            harness.count(|e| matches!(e, GameEngineEvent::StatRecorded(_))),
            1
        );

        harness.commands.emit(GameEngineCommand::NewGame);
        assert_eq!(
            harness.engine.borrow().session().phase(),
            SessionPhase::Active
        );
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_save_location_picks_store(_: &mut UsingLogger) {
        let harness = Harness::new(4);
        harness
            .commands
            .emit(GameEngineCommand::SetSaveLocation(Provenance::Remote));
        harness
            .commands
            .emit(GameEngineCommand::SetPlayerName("grace".to_string()));
        harness.commands.emit(GameEngineCommand::NewGame);
        harness.finish();

        assert!(harness.local.records().is_empty());
        let records = harness.remote.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].provenance, Provenance::Remote);
        assert_eq!(records[0].player_name, "grace");
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_invalid_configuration_rejected(_: &mut UsingLogger) {
        let harness = Harness::new(8);
        harness.commands.emit(GameEngineCommand::NewGame);
        let game_id = harness.engine.borrow().session().game_id();

        harness
            .commands
            .emit(GameEngineCommand::UpdateConfiguration {
                card_count: 7,
                columns: 4,
            });
        assert_eq!(
            harness.count(|e| matches!(e, GameEngineEvent::ConfigurationRejected(_))),
            1
        );
        assert_eq!(harness.engine.borrow().session().game_id(), game_id);
        assert_eq!(harness.engine.borrow().settings().card_count, 8);

        harness
            .commands
            .emit(GameEngineCommand::UpdateConfiguration {
                card_count: 12,
                columns: 3,
            });
        let engine = harness.engine.borrow();
        assert_eq!(engine.session().deck().len(), 12);
        assert_eq!(engine.settings().card_count, 12);
        assert_eq!(engine.settings().columns, 3);
        assert_eq!(harness.scheduler.pending_tasks(), 1);
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_illegal_taps_are_ignored(_: &mut UsingLogger) {
        let harness = Harness::new(4);
        harness.commands.emit(GameEngineCommand::Tap(0));
        harness.commands.emit(GameEngineCommand::NewGame);
        let before = harness.events.borrow().len();

        harness.commands.emit(GameEngineCommand::Tap(42));
        harness.commands.emit(GameEngineCommand::Tap(1));
        harness.commands.emit(GameEngineCommand::Tap(1));
        assert_eq!(harness.events.borrow().len(), before + 1);
        assert_eq!(harness.engine.borrow().session().moves(), 0);
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_destroy_detaches_engine(_: &mut UsingLogger) {
        let harness = Harness::new(8);
        harness.commands.emit(GameEngineCommand::NewGame);
        harness.tap_both(harness.mismatch());
        harness.engine.borrow_mut().destroy();

        assert_eq!(harness.scheduler.pending_tasks(), 0);
        assert_eq!(harness.commands.listener_count(), 0);
        harness.commands.emit(GameEngineCommand::Restart);
        assert!(harness.local.records().is_empty());
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_init_display_publishes_snapshot(_: &mut UsingLogger) {
        let harness = Harness::new(8);
        harness.commands.emit(GameEngineCommand::InitDisplay);
        let events = harness.events.borrow();
        match events.last() {
            Some(GameEngineEvent::SessionUpdated(snapshot)) => {
                assert_eq!(snapshot.phase, SessionPhase::Idle);
                assert_eq!(snapshot.player_name, "ada");
            }
            other => panic!("expected a snapshot, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_glib_hide_fires_on_main_context() {
        let context = glib::MainContext::default();
        let (commands, command_observer) = Channel::<GameEngineCommand>::new();
        let (event_emitter, event_observer) = Channel::<GameEngineEvent>::new();
        let scheduler = Rc::new(GlibScheduler::new());
        let engine = GameEngine::new(
            command_observer,
            event_emitter,
            scheduler.clone(),
            vec![Rc::new(MemoryStatsStore::new(Provenance::Local)) as Rc<dyn StatsStore>],
            Settings::default(),
        );
        let hidden = Rc::new(RefCell::new(None));
        let hidden_clone = Rc::clone(&hidden);
        event_observer.subscribe(move |event: &GameEngineEvent| {
            if let GameEngineEvent::CardsHidden(cards) = event {
                *hidden_clone.borrow_mut() = Some(cards.clone());
            }
        });

        commands.emit(GameEngineCommand::SetHideDelay(Duration::from_millis(20)));
        commands.emit(GameEngineCommand::NewGame);
        let (a, b) = mismatch_of(engine.borrow().session());
        commands.emit(GameEngineCommand::Tap(a));
        commands.emit(GameEngineCommand::Tap(b));

        let deadline = Instant::now() + Duration::from_secs(2);
        while hidden.borrow().is_none() && Instant::now() < deadline {
            context.iteration(true);
        }
        assert_eq!(*hidden.borrow(), Some(vec![a, b]));

        engine.borrow_mut().destroy();
        assert_eq!(scheduler.active_tasks(), 0);
    }
}
