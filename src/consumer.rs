//! The single consumer between the measurement queue and the HRV engine.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time;

use crate::context::HrvContext;
use crate::record::{GateDecision, InputGate, PpiRecord};
use crate::report::{csv_line, duty_cycle, json_line, ReportFormat};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerSummary {
    pub received: u64,
    pub accepted: u64,
    pub rejected: u64,
}

pub struct Consumer<W> {
    context: HrvContext,
    gate: InputGate,
    out: W,
    format: ReportFormat,
    paced: bool,
    started: Instant,
    summary: ConsumerSummary,
}

impl<W: Write> Consumer<W> {
    pub fn new(context: HrvContext, gate: InputGate, out: W, format: ReportFormat) -> Self {
        Self {
            context,
            gate,
            out,
            format,
            paced: false,
            started: Instant::now(),
            summary: ConsumerSummary::default(),
        }
    }

    /// Sleep after each record for the remainder of the interval it carried.
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    /// Gate one record, update the engine if it passed and write one report line.
    ///
    /// Returns the interval now driving the outputs.
    pub fn handle(&mut self, record: PpiRecord) -> io::Result<u16> {
        self.summary.received += 1;
        let decision = self.gate.check(record);
        match decision {
            GateDecision::Accept(value) if value > 0 => {
                self.summary.accepted += 1;
                self.context.update(value);
            }
            GateDecision::Accept(_) => {}
            GateDecision::Reject { held } => {
                self.summary.rejected += 1;
                tracing::debug!(value = record.value, valid = record.valid, held, "record rejected");
            }
        }

        let effective = decision.effective();
        let config = self.context.config();
        let duty = duty_cycle(effective, config.hist_start_ms, config.hist_end_ms);
        let elapsed = self.started.elapsed().as_secs_f64();
        let snapshot = self.context.snapshot();

        let line = match self.format {
            ReportFormat::Csv => csv_line(elapsed, duty, snapshot),
            ReportFormat::Json => json_line(elapsed, duty, snapshot)?,
        };
        writeln!(self.out, "{line}")?;
        Ok(effective)
    }

    /// Drain the queue until every producer has hung up.
    pub async fn run(mut self, mut rx: mpsc::Receiver<PpiRecord>) -> io::Result<(HrvContext, ConsumerSummary)> {
        while let Some(record) = rx.recv().await {
            let began = Instant::now();
            let effective = self.handle(record)?;
            if self.paced && effective > 0 {
                let budget = Duration::from_millis(u64::from(effective));
                time::sleep(budget.saturating_sub(began.elapsed())).await;
            }
        }
        self.out.flush()?;
        tracing::info!(
            received = self.summary.received,
            accepted = self.summary.accepted,
            rejected = self.summary.rejected,
            "measurement queue drained"
        );
        Ok((self.context, self.summary))
    }

    pub fn context(&self) -> &HrvContext {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HrvConfig;

    fn consumer() -> Consumer<Vec<u8>> {
        let ctx = HrvContext::new(HrvConfig::default()).unwrap();
        Consumer::new(ctx, InputGate::new(300, 300), Vec::new(), ReportFormat::Csv)
    }

    #[test]
    fn rejected_records_never_reach_the_engine() {
        let mut c = consumer();
        assert_eq!(c.handle(PpiRecord::valid(800)).unwrap(), 800);
        assert_eq!(c.handle(PpiRecord::valid(1400)).unwrap(), 800);
        assert_eq!(c.handle(PpiRecord { value: 820, valid: false }).unwrap(), 800);
        assert_eq!(c.handle(PpiRecord::valid(810)).unwrap(), 810);
        assert_eq!(c.context().snapshot().count, 2);
        assert_eq!(c.summary, ConsumerSummary { received: 4, accepted: 2, rejected: 2 });
    }

    #[test]
    fn writes_one_line_per_record() {
        let mut c = consumer();
        for v in [800, 810, 5000, 790] {
            c.handle(PpiRecord::valid(v)).unwrap();
        }
        let text = String::from_utf8(c.out.clone()).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().all(|l| l.starts_with("START,") && l.ends_with(",END")));
    }

    #[test]
    fn csv_carries_duty_of_the_held_interval() {
        let mut c = consumer();
        c.handle(PpiRecord::valid(800)).unwrap();
        c.handle(PpiRecord::valid(1400)).unwrap();
        let text = String::from_utf8(c.out.clone()).unwrap();
        assert!(text.lines().all(|l| l.ends_with(",1204,END")));
    }

    #[tokio::test]
    async fn run_drains_queue_in_order() {
        let (tx, rx) = mpsc::channel(4);
        let producer = async move {
            for v in [800u16, 805, 790, 812, 799, 808] {
                tx.send(PpiRecord::valid(v)).await.unwrap();
            }
        };
        let (_, result) = tokio::join!(producer, consumer().run(rx));
        let (ctx, summary) = result.unwrap();
        assert_eq!(summary.accepted, 6);
        assert_eq!(ctx.snapshot().latest, 808);
        assert_eq!(ctx.snapshot().count, 6);
    }
}
