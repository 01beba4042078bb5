//! Engine supervisor (C11, §4.10): holds the symbol set, constructs one
//! pipeline, fusion instance, and worker per symbol, and owns the
//! lifecycle (`start` -> run until signal -> `stop` -> join workers in
//! deterministic order).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use common::{CanonicalBook, CanonicalTick, Clock, Px, Qty, Side, SystemClock, Symbol, Ts};
use oms::{OmsFsm, OrderRouter, OrderType, TimeInForce};
use pipeline::{FusionTable, SymbolPipeline};
use risk::{Intent, PnlTracker, PositionTracker, Supervisor as RiskSupervisor};

use crate::config::EngineConfig;
use crate::logger::{AuditLogger, LogLevel, LogRecord};

/// Per-symbol latest-value cache. The worker does a tight latch-check and
/// process of whatever is cached (§5), never blocking on I/O.
struct SymbolCache {
    tick: Mutex<Option<CanonicalTick>>,
    book: Mutex<Option<CanonicalBook>>,
}

impl SymbolCache {
    fn empty() -> Self {
        Self {
            tick: Mutex::new(None),
            book: Mutex::new(None),
        }
    }

    fn take(&self) -> (Option<CanonicalTick>, Option<CanonicalBook>) {
        let tick = self.tick.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take();
        let book = self.book.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take();
        (tick, book)
    }
}

/// The running engine: shared risk/position/PnL/OMS state, one cache and
/// one worker handle per symbol.
pub struct Engine {
    running: Arc<AtomicBool>,
    caches: Arc<HashMap<Symbol, Arc<SymbolCache>>>,
    risk: Arc<RiskSupervisor>,
    positions: Arc<PositionTracker>,
    pnl: Arc<Mutex<PnlTracker>>,
    oms: Arc<Mutex<OmsFsm>>,
    router: Arc<OrderRouter>,
    logger: Arc<AuditLogger>,
    workers: Vec<(Symbol, JoinHandle<()>)>,
    next_seq: Arc<Mutex<u64>>,
}

impl Engine {
    /// Construct an engine from validated config and an already-running
    /// [`AuditLogger`]. Workers are not spawned until [`Engine::start`].
    #[must_use]
    pub fn new(config: &EngineConfig, logger: Arc<AuditLogger>, now_ms: u64) -> Self {
        let mut caches = HashMap::new();
        for symbol in &config.symbols {
            caches.insert(Symbol::new(symbol), Arc::new(SymbolCache::empty()));
        }

        Self {
            running: Arc::new(AtomicBool::new(false)),
            caches: Arc::new(caches),
            risk: Arc::new(RiskSupervisor::new(config.risk, now_ms)),
            positions: Arc::new(PositionTracker::new()),
            pnl: Arc::new(Mutex::new(PnlTracker::new())),
            oms: Arc::new(Mutex::new(OmsFsm::new())),
            router: Arc::new(OrderRouter::new(config.fix.sender_comp_id.clone(), config.fix.target_comp_id.clone(), "OR")),
            logger,
            workers: Vec::new(),
            next_seq: Arc::new(Mutex::new(1)),
        }
    }

    /// Feed a new canonical tick into its symbol's cache (overwrites
    /// whatever was cached, per the "latest wins" worker model).
    pub fn ingest_tick(&self, tick: CanonicalTick) {
        if let Some(cache) = self.caches.get(&tick.symbol) {
            *cache.tick.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(tick);
        }
    }

    /// Feed a new canonical book into its symbol's cache.
    pub fn ingest_book(&self, book: CanonicalBook) {
        if let Some(cache) = self.caches.get(&book.symbol) {
            *cache.book.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(book);
        }
    }

    /// Apply an inbound ExecutionReport (35=8) to the shared OMS FSM.
    pub fn on_exec_report(&self, msg: &fixp::codec::FixMessage<'_>, now: Ts) {
        let mut fsm = self.oms.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.log_order_event(fsm.apply_exec_report(msg, now), now);
    }

    /// Apply an inbound OrderCancelReject (35=9) to the shared OMS FSM,
    /// reverting the affected order out of `PendingCancel` (§4.9).
    pub fn on_cancel_reject(&self, msg: &fixp::codec::FixMessage<'_>, now: Ts) {
        let mut fsm = self.oms.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.log_order_event(fsm.apply_cancel_reject(msg, now), now);
    }

    /// Dispatch an inbound application-level FIX message to the right OMS
    /// handler by `35=` (MsgType): `8` is an ExecutionReport, `9` an
    /// OrderCancelReject. Anything else is not an order-lifecycle message
    /// and is ignored here.
    pub fn on_inbound_order_message(&self, msg: &fixp::codec::FixMessage<'_>, now: Ts) {
        if msg.is_msg_type(fixp::msg_type::EXECUTION_REPORT) {
            self.on_exec_report(msg, now);
        } else if msg.is_msg_type(fixp::msg_type::ORDER_CANCEL_REJECT) {
            self.on_cancel_reject(msg, now);
        }
    }

    fn log_order_event(&self, result: Result<Option<oms::OrderEvent>, oms::OmsError>, now: Ts) {
        match result {
            Ok(Some(event)) => {
                self.logger.log(LogRecord {
                    ts_micros: now.as_micros(),
                    level: LogLevel::Info,
                    target: "oms",
                    message: format!("{} {:?} -> {:?}", event.cl_ord_id, event.from, event.to),
                });
            }
            Ok(None) => {}
            Err(err) => {
                self.logger.log(LogRecord {
                    ts_micros: now.as_micros(),
                    level: LogLevel::Warn,
                    target: "oms",
                    message: err.to_string(),
                });
            }
        }
    }

    /// Start one worker thread per symbol. Each worker polls its cache,
    /// runs the pipeline, fuses a signal, and (if risk approves) routes a
    /// NewOrderSingle.
    pub fn start(&mut self) {
        self.running.store(true, Ordering::SeqCst);
        let mut symbols: Vec<Symbol> = self.caches.keys().copied().collect();
        symbols.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        for symbol in symbols {
            let cache = Arc::clone(self.caches.get(&symbol).expect("symbol present"));
            let running = Arc::clone(&self.running);
            let risk = Arc::clone(&self.risk);
            let positions = Arc::clone(&self.positions);
            let pnl = Arc::clone(&self.pnl);
            let oms = Arc::clone(&self.oms);
            let router = Arc::clone(&self.router);
            let logger = Arc::clone(&self.logger);
            let next_seq = Arc::clone(&self.next_seq);

            let handle = thread::spawn(move || {
                let mut pipeline = SymbolPipeline::new(symbol, FusionTable::default_weights());
                let clock = SystemClock::new();
                while running.load(Ordering::SeqCst) {
                    let (tick, book) = cache.take();
                    if tick.is_none() && book.is_none() {
                        thread::sleep(Duration::from_micros(200));
                        continue;
                    }
                    if let Some(tick) = tick {
                        pipeline.push_tick(tick);
                    }
                    if let Some(book) = book {
                        pipeline.push_book(book);
                    }
                    let metrics = pipeline.compute();
                    let signal = pipeline.fused_signal();

                    if signal.abs() < f64::EPSILON {
                        continue;
                    }

                    let side = if signal > 0.0 { Side::Bid } else { Side::Ask };
                    let price = metrics.last_mid;
                    let intent = Intent {
                        symbol,
                        side,
                        qty: Qty::new(1.0),
                        price: Px::new(price),
                        signal_magnitude: signal,
                    };

                    let now_ms = clock.wall_millis();
                    let ts_micros = clock.monotonic_micros();
                    let pnl_snapshot = pnl.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                    let decision = risk.evaluate(&intent, &positions, &pnl_snapshot, now_ms);
                    drop(pnl_snapshot);
                    match decision {
                        Ok(()) => {
                            let seq = {
                                let mut seq = next_seq.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                                let current = *seq;
                                *seq += 1;
                                current
                            };
                            let (cl_ord_id, _wire) = router.new_order(
                                symbol,
                                side,
                                intent.qty,
                                OrderType::Market,
                                intent.price,
                                TimeInForce::Ioc,
                                now_ms,
                                seq,
                            );
                            let record = common::OrderRecord::new_pending(
                                cl_ord_id.clone(),
                                symbol,
                                side,
                                intent.qty,
                                intent.price,
                                Ts::from_millis(now_ms),
                            );
                            oms.lock().unwrap_or_else(std::sync::PoisonError::into_inner).submit(record);
                            logger.log(LogRecord {
                                ts_micros,
                                level: LogLevel::Info,
                                target: "router",
                                message: format!("{cl_ord_id} routed signal={signal:.4}"),
                            });
                        }
                        Err(reason) => {
                            logger.log(LogRecord {
                                ts_micros,
                                level: LogLevel::Warn,
                                target: "risk",
                                message: format!("rejected: {reason}"),
                            });
                        }
                    }
                }
            });
            self.workers.push((symbol, handle));
        }
    }

    /// Two-phase drain (§5 "Cancellation"): flip `running` to false, then
    /// join workers in deterministic (symbol-sorted) order.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.workers.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        for (_, handle) in self.workers.drain(..) {
            let _ = handle.join();
        }
    }

    /// Whether the engine is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Shared risk supervisor, exposed for admin-surface kill-switch
    /// clearing.
    #[must_use]
    pub fn risk(&self) -> &RiskSupervisor {
        &self.risk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, EngineConfig};

    fn sample_config() -> EngineConfig {
        let cfg = Config::parse(
            "
            [engine]
            mode=sim
            symbol=BTCUSDT

            [fix]
            sender_comp_id=US
            target_comp_id=VENUE
            primary_host=test
            ",
        );
        EngineConfig::from_config(&cfg).unwrap()
    }

    #[test]
    fn engine_starts_and_stops_cleanly_with_no_ticks() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(AuditLogger::init(dir.path().join("audit.log"), 64).unwrap());
        let config = sample_config();
        let mut engine = Engine::new(&config, logger, 0);
        engine.start();
        assert!(engine.is_running());
        thread::sleep(Duration::from_millis(5));
        engine.stop();
        assert!(!engine.is_running());
    }

    #[test]
    fn cancel_reject_reverts_order_via_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(AuditLogger::init(dir.path().join("audit.log"), 64).unwrap());
        let config = sample_config();
        let engine = Engine::new(&config, logger, 0);

        let record = common::OrderRecord::new_pending(
            "OR1_0".to_string(),
            Symbol::new("BTCUSDT"),
            Side::Bid,
            Qty::new(1.0),
            Px::new(100.0),
            Ts::from_millis(0),
        );
        {
            let mut fsm = engine.oms.lock().unwrap();
            fsm.submit(record);
            fsm.mark_pending_cancel("OR1_0", Ts::from_millis(1)).unwrap();
        }

        let wire = fixp::codec::FixBuilder::new()
            .field(11, "OR1_0")
            .build(fixp::msg_type::ORDER_CANCEL_REJECT, "VENUE", "US", 1);
        let msg = fixp::codec::FixMessage::parse(&wire).unwrap();
        engine.on_inbound_order_message(&msg, Ts::from_millis(2));

        assert_eq!(engine.oms.lock().unwrap().get("OR1_0").unwrap().state, common::OrderState::PendingNew);
    }

    #[test]
    fn ingest_tick_for_unknown_symbol_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(AuditLogger::init(dir.path().join("audit.log"), 64).unwrap());
        let config = sample_config();
        let engine = Engine::new(&config, logger, 0);
        let tick = CanonicalTick {
            symbol: Symbol::new("ETHUSDT"),
            bid: Px::new(1.0),
            ask: Px::new(1.1),
            bid_size: Qty::new(1.0),
            ask_size: Qty::new(1.0),
            buy_volume: Qty::zero(),
            sell_volume: Qty::zero(),
            ts_exchange: Ts::from_millis(0),
            ts_local: Ts::from_nanos(0),
        };
        engine.ingest_tick(tick);
    }
}
