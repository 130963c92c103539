//! Event loop: drains the queue and dispatches each event to its handler.
//!
//! Per event:
//! - Market: record the price, hand the strategy a read-only view, queue its signals
//! - Signal: size against current cash, queue a market order
//! - Order: price through the cost model, guard, then apply or reject
//! - Fill: apply to the ledger
//!
//! The run ends when the terminal marker is dequeued. Derived events always
//! drain before the next historical event, so a signal raised on the last
//! observation is still processed.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{
    Event, EventKind, FillEvent, LastPriceTable, LedgerError, MarketEvent, OrderEvent,
    PortfolioLedger, SignalEvent,
};
use crate::report::{BacktestReport, RunCounters};
use crate::sizers::{AllocationSizer, Sizer};
use crate::strategy::{Strategy, StrategyError};

use super::cost_model::CostModel;
use super::execution::{check_execution, RejectedOrder};
use super::queue::{EventQueue, QueueError, QueueItem};
use super::state::{EngineConfig, EngineConfigError, RunResult};
use super::view::EngineView;

/// Fatal engine failures. Rejected orders and dropped signals are not errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] EngineConfigError),

    #[error("queue: {0}")]
    Queue(#[from] QueueError),

    #[error("strategy '{strategy}' failed at {timestamp}: {source}")]
    Strategy {
        strategy: String,
        timestamp: DateTime<Utc>,
        #[source]
        source: StrategyError,
    },

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("event queue ran dry before the terminal marker")]
    MissingTerminal,

    #[error("backtest already finished")]
    Finished,
}

/// Outcome of a single [`Backtest::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Processed(EventKind),
    Terminal,
}

/// A single backtest: queue, ledger, cost model, sizer and strategy.
pub struct Backtest<S> {
    queue: EventQueue,
    ledger: PortfolioLedger,
    prices: LastPriceTable,
    cost_model: CostModel,
    sizer: Box<dyn Sizer>,
    strategy: S,
    trades: Vec<FillEvent>,
    rejected: Vec<RejectedOrder>,
    dropped_signals: usize,
    dropped_orders: usize,
    events_processed: usize,
    finished: bool,
}

impl<S: Strategy> Backtest<S> {
    pub fn new(config: EngineConfig, strategy: S) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            queue: EventQueue::new(),
            ledger: PortfolioLedger::new(config.initial_capital),
            prices: LastPriceTable::new(),
            cost_model: config.cost_model(),
            sizer: Box::new(AllocationSizer::new(config.allocation_fraction)),
            strategy,
            trades: Vec::new(),
            rejected: Vec::new(),
            dropped_signals: 0,
            dropped_orders: 0,
            events_processed: 0,
            finished: false,
        })
    }

    /// Replace the default allocation sizer.
    pub fn with_sizer(mut self, sizer: impl Sizer + 'static) -> Self {
        self.sizer = Box::new(sizer);
        self
    }

    /// Queue historical observations in order. Returns how many were queued.
    pub fn load<I>(&mut self, events: I) -> Result<usize, EngineError>
    where
        I: IntoIterator<Item = MarketEvent>,
    {
        let mut count = 0;
        for event in events {
            self.queue.enqueue(Event::Market(event))?;
            count += 1;
        }
        Ok(count)
    }

    /// Queue any event. Market events are refused after [`Backtest::close`].
    pub fn enqueue(&mut self, event: impl Into<Event>) -> Result<(), EngineError> {
        self.queue.enqueue(event.into())?;
        Ok(())
    }

    /// Mark the end of historical data.
    pub fn close(&mut self) -> Result<(), EngineError> {
        self.queue.close()?;
        Ok(())
    }

    /// Dequeue and dispatch one event.
    pub fn step(&mut self) -> Result<StepOutcome, EngineError> {
        if self.finished {
            return Err(EngineError::Finished);
        }
        match self.queue.dequeue() {
            Some(QueueItem::Event(event)) => {
                let kind = event.kind();
                self.dispatch(event)?;
                self.events_processed += 1;
                Ok(StepOutcome::Processed(kind))
            }
            Some(QueueItem::Terminal) => {
                self.finished = true;
                Ok(StepOutcome::Terminal)
            }
            None => Err(EngineError::MissingTerminal),
        }
    }

    /// Close the queue if needed and step until the terminal marker.
    pub fn run(&mut self) -> Result<BacktestReport, EngineError> {
        if !self.queue.is_closed() {
            self.queue.close()?;
        }
        info!(
            strategy = self.strategy.name(),
            pending = self.queue.len(),
            initial_capital = self.ledger.initial_capital(),
            "starting backtest"
        );

        while self.step()? != StepOutcome::Terminal {}

        let report = self.report();
        info!(
            strategy = self.strategy.name(),
            events = self.events_processed,
            trades = report.total_trades,
            rejected = report.rejected_orders,
            final_value = report.final_portfolio_value,
            roi_pct = report.roi_pct,
            "backtest complete"
        );
        Ok(report)
    }

    /// Report over the current state. Safe to call mid-run.
    pub fn report(&self) -> BacktestReport {
        BacktestReport::generate(&self.ledger, &self.prices, &self.trades, self.counters())
    }

    pub fn into_result(self) -> RunResult {
        let report = self.report();
        RunResult {
            report,
            trades: self.trades,
            rejected_orders: self.rejected,
            ledger: self.ledger,
        }
    }

    pub fn view(&self) -> EngineView<'_> {
        EngineView::new(&self.ledger, &self.prices, &self.trades)
    }

    pub fn ledger(&self) -> &PortfolioLedger {
        &self.ledger
    }

    pub fn prices(&self) -> &LastPriceTable {
        &self.prices
    }

    pub fn trades(&self) -> &[FillEvent] {
        &self.trades
    }

    pub fn rejected_orders(&self) -> &[RejectedOrder] {
        &self.rejected
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn events_processed(&self) -> usize {
        self.events_processed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn counters(&self) -> RunCounters {
        RunCounters {
            rejected_orders: self.rejected.len(),
            dropped_signals: self.dropped_signals,
            dropped_orders: self.dropped_orders,
        }
    }

    fn dispatch(&mut self, event: Event) -> Result<(), EngineError> {
        match event {
            Event::Market(market) => self.on_market(market),
            Event::Signal(signal) => self.on_signal(signal),
            Event::Order(order) => self.on_order(order),
            Event::Fill(fill) => self.on_fill(fill),
        }
    }

    fn on_market(&mut self, market: MarketEvent) -> Result<(), EngineError> {
        self.prices.record(&market);

        let view = EngineView::new(&self.ledger, &self.prices, &self.trades);
        let signals = match self.strategy.on_event(&view, &market) {
            Ok(signals) => signals,
            Err(source) => {
                return Err(EngineError::Strategy {
                    strategy: self.strategy.name().to_string(),
                    timestamp: market.timestamp(),
                    source,
                })
            }
        };

        for signal in signals {
            self.queue.enqueue(Event::Signal(signal))?;
        }
        Ok(())
    }

    fn on_signal(&mut self, signal: SignalEvent) -> Result<(), EngineError> {
        let Some(price) = self.prices.get(signal.symbol()) else {
            debug!(symbol = signal.symbol(), "no observed price, signal dropped");
            self.dropped_signals += 1;
            return Ok(());
        };

        let quantity = self.sizer.size(self.ledger.cash(), &signal, price);
        match OrderEvent::market(signal.timestamp(), signal.symbol(), signal.side(), quantity) {
            Ok(order) => self.queue.enqueue(Event::Order(order))?,
            Err(_) => {
                debug!(
                    symbol = signal.symbol(),
                    side = %signal.side(),
                    quantity,
                    sizer = self.sizer.name(),
                    "non-positive size, signal dropped"
                );
                self.dropped_signals += 1;
            }
        }
        Ok(())
    }

    fn on_order(&mut self, order: OrderEvent) -> Result<(), EngineError> {
        let Some(reference_price) = self.prices.get(order.symbol()) else {
            debug!(symbol = order.symbol(), "no observed price, order dropped");
            self.dropped_orders += 1;
            return Ok(());
        };

        let fill = self.cost_model.execute(&order, reference_price);
        if let Err(reason) = check_execution(&self.ledger, &order, &fill) {
            warn!(
                timestamp = %order.timestamp(),
                symbol = order.symbol(),
                side = %order.side(),
                quantity = order.quantity(),
                %reason,
                "order rejected"
            );
            self.rejected.push(RejectedOrder { order, reason });
            return Ok(());
        }

        self.on_fill(fill)
    }

    fn on_fill(&mut self, fill: FillEvent) -> Result<(), EngineError> {
        self.ledger.apply_fill(&fill)?;
        debug!(
            symbol = fill.symbol(),
            side = %fill.side(),
            quantity = fill.quantity(),
            price = fill.executed_price(),
            commission = fill.commission(),
            cash = self.ledger.cash(),
            "fill applied"
        );
        self.trades.push(fill);
        Ok(())
    }
}

/// Run a complete backtest over historical market events.
pub fn run_backtest<S, I>(
    config: EngineConfig,
    events: I,
    strategy: S,
) -> Result<RunResult, EngineError>
where
    S: Strategy,
    I: IntoIterator<Item = MarketEvent>,
{
    let mut backtest = Backtest::new(config, strategy)?;
    backtest.load(events)?;
    backtest.run()?;
    Ok(backtest.into_result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderSide;
    use crate::engine::RejectionReason;
    use crate::strategy::{from_fn, HoldStrategy};

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_704_153_600 + secs, 0).unwrap()
    }

    fn market(secs: i64, price: f64) -> MarketEvent {
        MarketEvent::new(ts(secs), "BTC", price, 1.0).unwrap()
    }

    #[test]
    fn invalid_config_refused() {
        let config = EngineConfig {
            allocation_fraction: 1.5,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Backtest::new(config, HoldStrategy),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn hold_strategy_leaves_capital_untouched() {
        let events = (0..10).map(|i| market(i, 100.0 + i as f64));
        let result = run_backtest(EngineConfig::default(), events, HoldStrategy).unwrap();
        assert_eq!(result.report.total_trades, 0);
        assert_eq!(result.report.final_portfolio_value, 10_000.0);
        assert_eq!(result.report.pnl, 0.0);
    }

    #[test]
    fn injected_market_order_fills_at_slipped_price() {
        let mut backtest = Backtest::new(EngineConfig::default(), HoldStrategy).unwrap();
        backtest.load([market(0, 100.0)]).unwrap();
        backtest.close().unwrap();
        backtest.step().unwrap();
        backtest
            .enqueue(OrderEvent::market(ts(0), "BTC", OrderSide::Buy, 10.0).unwrap())
            .unwrap();
        let report = backtest.run().unwrap();

        assert_eq!(report.total_trades, 1);
        let fill = &backtest.trades()[0];
        assert!((fill.executed_price() - 100.05).abs() < 1e-9);
        assert!((fill.commission() - 2.001).abs() < 1e-9);
        assert!((fill.total_cost() - 1002.501).abs() < 1e-9);
        assert!((backtest.ledger().cash() - 8997.499).abs() < 1e-9);
        assert_eq!(backtest.ledger().position("BTC"), 10.0);
    }

    #[test]
    fn sell_without_position_is_rejected() {
        let mut backtest = Backtest::new(EngineConfig::default(), HoldStrategy).unwrap();
        backtest.load([market(0, 100.0)]).unwrap();
        backtest.close().unwrap();
        backtest.step().unwrap();
        backtest
            .enqueue(OrderEvent::market(ts(0), "BTC", OrderSide::Sell, 1.0).unwrap())
            .unwrap();
        backtest.run().unwrap();

        assert!(backtest.trades().is_empty());
        assert_eq!(backtest.ledger().cash(), 10_000.0);
        assert!(matches!(
            backtest.rejected_orders()[0].reason,
            RejectionReason::InsufficientPosition { .. }
        ));
    }

    #[test]
    fn signal_on_last_observation_is_processed() {
        let strategy = from_fn("last_bar_buy", |_view, event: &MarketEvent| {
            if event.price() == 120.0 {
                Ok(vec![SignalEvent::buy(event)])
            } else {
                Ok(Vec::new())
            }
        });
        let events = [market(0, 100.0), market(1, 110.0), market(2, 120.0)];
        let result = run_backtest(EngineConfig::default(), events, strategy).unwrap();

        assert_eq!(result.report.total_trades, 1);
        assert_eq!(result.trades[0].side(), OrderSide::Buy);
    }

    #[test]
    fn order_without_price_is_dropped() {
        let mut backtest = Backtest::new(EngineConfig::default(), HoldStrategy).unwrap();
        backtest
            .enqueue(OrderEvent::market(ts(0), "ETH", OrderSide::Buy, 1.0).unwrap())
            .unwrap();
        let report = backtest.run().unwrap();
        assert_eq!(report.dropped_orders, 1);
        assert_eq!(report.total_trades, 0);
    }

    #[test]
    fn strategy_error_aborts_run() {
        let strategy = from_fn("broken", |_view, _event: &MarketEvent| {
            Err(StrategyError::Failed("boom".into()))
        });
        let err = run_backtest(EngineConfig::default(), [market(0, 100.0)], strategy).unwrap_err();
        match err {
            EngineError::Strategy { strategy, .. } => assert_eq!(strategy, "broken"),
            other => panic!("expected strategy error, got {other:?}"),
        }
    }

    #[test]
    fn step_reports_each_event_kind() {
        let strategy = from_fn("always_buy", |_view, event: &MarketEvent| {
            Ok(vec![SignalEvent::buy(event)])
        });
        let mut backtest = Backtest::new(EngineConfig::default(), strategy).unwrap();
        backtest.load([market(0, 100.0)]).unwrap();
        backtest.close().unwrap();

        assert_eq!(backtest.step().unwrap(), StepOutcome::Processed(EventKind::Market));
        assert_eq!(backtest.step().unwrap(), StepOutcome::Processed(EventKind::Signal));
        assert_eq!(backtest.step().unwrap(), StepOutcome::Processed(EventKind::Order));
        assert_eq!(backtest.step().unwrap(), StepOutcome::Terminal);
        assert!(backtest.is_finished());
        assert!(matches!(backtest.step(), Err(EngineError::Finished)));
    }

    #[test]
    fn step_without_terminal_errors() {
        let mut backtest = Backtest::new(EngineConfig::default(), HoldStrategy).unwrap();
        assert!(matches!(backtest.step(), Err(EngineError::MissingTerminal)));
    }
}
