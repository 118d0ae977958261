//! The aggregate batch processor: turns one batch of compressed channel
//! sample groups into rendered output lines.

use std::mem;
use std::sync::Arc;
use std::time::Instant;

use agf_common::{AggregateRecord, BatchId, ChannelSampleGroup, GroupFlags, RecordBatch};
use tracing::{debug, error, warn};

use crate::codec::{decode_group, decompress};
use crate::error::{FetchError, Result};
use crate::format::{to_csv_line, NumberFormatter, TemplateContext};
use crate::record::{build_record, ChannelSampleRecord, SampleTimes};

use super::{
    BatchContext, BatchOutcome, BatchProcessor, BatchStats, FinishedBatch, OrderKey,
    OutputStrategy,
};

/// Processes one [`RecordBatch`], handing its output to strategy `S`.
pub struct AggregateBatchProcessor<S: OutputStrategy> {
    ctx: BatchContext,
    batch: RecordBatch,
    processor_number: usize,
    strategy: S,
    stats: BatchStats,
    formatter: NumberFormatter,
}

/// Output accumulated while walking a batch.
#[derive(Default)]
struct BatchOutput {
    records: Vec<String>,
    order_keys: Vec<OrderKey>,
}

impl<S: OutputStrategy> AggregateBatchProcessor<S> {
    pub fn new(ctx: BatchContext, batch: RecordBatch, processor_number: usize, strategy: S) -> Self {
        Self {
            ctx,
            batch,
            processor_number,
            strategy,
            stats: BatchStats::default(),
            formatter: NumberFormatter::new(),
        }
    }

    /// Statistics gathered by the last [`BatchProcessor::process_batch`] call.
    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    fn process_record_batch(&mut self) -> Result<BatchOutcome> {
        let aggregates = mem::take(&mut self.batch.records);
        let mut output = BatchOutput::default();

        for aggregate in &aggregates {
            self.process_aggregate(aggregate, &mut output)?;
        }

        let batch_id = self.batch.batch_id.clone();
        if output.records.is_empty() {
            self.ctx.coordinator.deregister_batch(&batch_id);
            return Ok(BatchOutcome::Empty);
        }

        let records = output.records.len();
        let finished = FinishedBatch {
            batch_id: batch_id.clone(),
            processor_number: self.processor_number,
            records: output.records,
            order_keys: output.order_keys,
        };
        let info = self.strategy.finalize(finished, &mut self.stats)?;
        self.ctx.coordinator.register_batch(&batch_id, info);
        Ok(BatchOutcome::Registered { records })
    }

    fn process_aggregate(&mut self, aggregate: &AggregateRecord, output: &mut BatchOutput) -> Result<()> {
        if let Some(filter) = &self.ctx.config.channel_ids {
            let started = Instant::now();
            let wanted = filter.matches_superset(aggregate.channel_id_superset());
            self.stats.prefilter += started.elapsed();
            if !wanted {
                self.stats.groups_skipped += 1;
                return Ok(());
            }
        }

        let started = Instant::now();
        let bytes = decompress(&aggregate.payload)?;
        self.stats.decompress += started.elapsed();

        let started = Instant::now();
        let group = decode_group(&bytes)?;
        self.stats.deserialize += started.elapsed();
        self.stats.groups_read += 1;

        self.process_group(aggregate, &group, output);
        Ok(())
    }

    fn process_group(
        &mut self,
        aggregate: &AggregateRecord,
        group: &ChannelSampleGroup,
        output: &mut BatchOutput,
    ) {
        let config = Arc::clone(&self.ctx.config);
        let flags = GroupFlags::from(&group.discriminator);
        let wants_keys = self.strategy.collects_order_keys();

        for member in &group.members {
            let channel_id = member.channel_id.to_uppercase();

            if let Some(filter) = &config.channel_ids {
                if !filter.contains(&channel_id) {
                    self.stats.members_rejected += 1;
                    continue;
                }
            }
            if let Some(filter) = &config.module_filter {
                if !filter.matches(member.module.as_deref()) {
                    self.stats.members_rejected += 1;
                    continue;
                }
            }

            let started = Instant::now();
            let mut times = SampleTimes::from_member(member);
            if config.use_lst && !times.scet.is_dummy() {
                if let Some(solar) = &self.ctx.solar {
                    if solar.venue_uses_sol(aggregate.host_id, aggregate.session_id) {
                        times.lst = solar.local_solar_time(&times.scet, aggregate.spacecraft_id);
                    }
                }
            }
            let in_range = config
                .time_range
                .as_ref()
                .map_or(true, |range| range.contains(&times.ert, &times.scet, &times.sclk));
            self.stats.time_format_and_range += started.elapsed();
            if !in_range {
                self.stats.members_rejected += 1;
                continue;
            }

            let started = Instant::now();
            let built = build_record(
                aggregate,
                &group.discriminator,
                member,
                channel_id,
                times,
                config.include_packet_info,
            );
            self.stats.record_construction += started.elapsed();
            let record = match built {
                Ok(record) => record,
                Err(e) => {
                    warn!(
                        processor = self.processor_number,
                        batch_id = %self.batch.batch_id,
                        channel_id = %member.channel_id,
                        monitor = flags.monitor,
                        error = %e,
                        "could not construct channel sample, skipping"
                    );
                    self.stats.dn_failures += 1;
                    self.stats.members_rejected += 1;
                    continue;
                }
            };

            if let Some(filter) = &config.alarm_filter {
                if !filter.matches(record.dn_alarm, record.eu_alarm) {
                    self.stats.members_rejected += 1;
                    continue;
                }
            }

            if wants_keys {
                let sort_field = record.sort_field(config.order_by, &config.time_format);
                output.order_keys.push(OrderKey::new(
                    self.batch.batch_id.clone(),
                    output.records.len(),
                    sort_field,
                ));
            }

            let line = self.render(&record);
            output.records.push(line);
            self.stats.members_emitted += 1;
            *self.stats.per_channel.entry(record.channel_id).or_insert(0) += 1;
        }
    }

    fn render(&mut self, record: &ChannelSampleRecord) -> String {
        let config = &self.ctx.config;
        let started = Instant::now();
        match &self.ctx.template {
            Some(template) => {
                let ctx = TemplateContext::new(
                    &config.template_globals,
                    record,
                    &self.formatter,
                    &config.time_format,
                );
                let line = match template.render(&ctx) {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(
                            processor = self.processor_number,
                            channel_id = %record.channel_id,
                            error = %e,
                            "template render failed"
                        );
                        self.stats.render_failures += 1;
                        String::new()
                    }
                };
                self.stats.template_render += started.elapsed();
                line
            }
            None => {
                let line = to_csv_line(record, &config.csv_columns, &config.time_format);
                self.stats.csv_render += started.elapsed();
                line
            }
        }
    }
}

impl<S: OutputStrategy> BatchProcessor for AggregateBatchProcessor<S> {
    fn batch_id(&self) -> &BatchId {
        &self.batch.batch_id
    }

    fn processor_number(&self) -> usize {
        self.processor_number
    }

    fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    fn process_batch(&mut self) -> BatchOutcome {
        self.stats = BatchStats::default();
        let outcome = match self.process_record_batch() {
            Ok(outcome) => outcome,
            Err(e) => {
                match &e {
                    FetchError::Decompress(_) | FetchError::Decode(_) => warn!(
                        processor = self.processor_number,
                        batch_id = %self.batch.batch_id,
                        error = %e,
                        "unreadable aggregate payload, abandoning batch"
                    ),
                    _ => error!(
                        processor = self.processor_number,
                        batch_id = %self.batch.batch_id,
                        error = %e,
                        "batch processing failed"
                    ),
                }
                self.ctx.coordinator.deregister_batch(&self.batch.batch_id);
                BatchOutcome::Failed(e)
            }
        };
        self.stats.log(self.processor_number, &self.batch.batch_id);
        debug!(
            processor = self.processor_number,
            batch_id = %self.batch.batch_id,
            emitted = self.stats.members_emitted,
            "batch processed"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use agf_common::{
        AccurateTime, AlarmLevel, AlarmValue, ChannelSampleMember, DnValue, GroupDiscriminator,
        SignedDn,
    };
    use agf_config::{AlarmFilter, CsvColumn, FetchConfig, ModuleFilter};

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::codec::pack_group;
    use crate::coordinator::{InMemoryCoordinator, ProcessedBatchInfo};
    use crate::processor::NonSortingOutput;
    use crate::solar::SolarTimeProvider;

    fn member(id: &str, module: Option<&str>, dn: i16, alarm: Option<AlarmLevel>) -> ChannelSampleMember {
        ChannelSampleMember {
            channel_id: id.to_string(),
            name: id.to_lowercase(),
            module: module.map(str::to_string),
            packet_id: 0,
            dn: DnValue::SignedInt(SignedDn::I16(dn)).encode(),
            eu: None,
            status: None,
            dn_format: None,
            eu_format: None,
            alarms: alarm
                .map(|level| {
                    vec![AlarmValue {
                        level,
                        in_alarm: true,
                        on_eu: false,
                    }]
                })
                .unwrap_or_default(),
            ert: AccurateTime::new(1_000, 0).unwrap(),
            rct: AccurateTime::new(1_000, 0).unwrap(),
            scet: None,
            sclk: None,
        }
    }

    fn aggregate(members: Vec<ChannelSampleMember>) -> AggregateRecord {
        let superset = members
            .iter()
            .map(|m| m.channel_id.clone())
            .collect::<Vec<_>>()
            .join(":");
        let group = ChannelSampleGroup {
            discriminator: GroupDiscriminator::default(),
            members,
        };
        AggregateRecord {
            payload: pack_group(&group).unwrap(),
            channel_ids: superset,
            ..AggregateRecord::default()
        }
    }

    fn run(config: FetchConfig, records: Vec<AggregateRecord>) -> (BatchOutcome, Vec<String>) {
        let coordinator = Arc::new(InMemoryCoordinator::new());
        let id = coordinator.generate_batch_id();
        let config = config.with_columns(&[CsvColumn::ChannelId, CsvColumn::Dn]);
        let ctx = BatchContext::new(Arc::new(config), coordinator.clone()).unwrap();
        let mut processor =
            AggregateBatchProcessor::new(ctx, RecordBatch::new(id, records), 1, NonSortingOutput);
        let outcome = processor.process_batch();
        let lines = match coordinator.take_next_batch() {
            Some((_, ProcessedBatchInfo::InMemory(lines))) => lines,
            _ => Vec::new(),
        };
        (outcome, lines)
    }

    #[test]
    fn test_filters_apply_per_member() {
        let records = vec![aggregate(vec![
            member("A-0001", Some("PWR"), 1, Some(AlarmLevel::Red)),
            member("B-0002", Some("THERM"), 2, Some(AlarmLevel::Red)),
            member("C-0003", Some("PWR"), 3, None),
        ])];
        let config = FetchConfig::default()
            .with_module_filter(ModuleFilter::new("pw", "[*%?]").unwrap())
            .with_alarm_filter(AlarmFilter::parse("ANY").unwrap());
        // module match is case-sensitive
        let (outcome, lines) = run(config, records.clone());
        assert!(matches!(outcome, BatchOutcome::Empty));
        assert!(lines.is_empty());

        let config = FetchConfig::default()
            .with_module_filter(ModuleFilter::new("PW*", "[*%?]").unwrap())
            .with_alarm_filter(AlarmFilter::parse("RED").unwrap());
        let (outcome, lines) = run(config, records);
        assert!(matches!(outcome, BatchOutcome::Registered { records: 1 }));
        assert_eq!(lines, vec!["\"A-0001\",1".to_string()]);
    }

    #[test]
    fn test_channel_prefilter_skips_whole_group() {
        let records = vec![
            aggregate(vec![member("A-0001", None, 1, None)]),
            aggregate(vec![member("b-0002", None, 2, None)]),
        ];
        let config = FetchConfig::default().with_channel_ids(["B-0002"]);
        let (_, lines) = run(config, records);
        assert_eq!(lines, vec!["\"B-0002\",2".to_string()]);
    }

    #[test]
    fn test_corrupt_payload_fails_batch() {
        let mut bad = aggregate(vec![member("A-0001", None, 1, None)]);
        bad.payload = vec![1, 2, 3];
        let (outcome, lines) = run(FetchConfig::default(), vec![bad]);
        assert!(matches!(outcome, BatchOutcome::Failed(FetchError::Decompress(_))));
        assert!(lines.is_empty());
    }

    #[test]
    fn test_template_failure_renders_empty_line() {
        let coordinator = Arc::new(InMemoryCoordinator::new());
        let id = coordinator.generate_batch_id();
        let config = FetchConfig::default().with_template("${channel_id}:${dn:%s}|${missing}");
        let ctx = BatchContext::new(Arc::new(config), coordinator.clone()).unwrap();
        let mut processor = AggregateBatchProcessor::new(
            ctx,
            RecordBatch::new(id, vec![aggregate(vec![member("A-0001", None, 7, None)])]),
            3,
            NonSortingOutput,
        );
        assert!(matches!(
            processor.process_batch(),
            BatchOutcome::Registered { records: 1 }
        ));
        assert_eq!(processor.stats().render_failures, 1);
        match coordinator.take_next_batch() {
            Some((_, ProcessedBatchInfo::InMemory(lines))) => assert_eq!(lines, vec![String::new()]),
            other => panic!("unexpected batch result: {:?}", other),
        }
    }

    #[derive(Default)]
    struct CountingSolar {
        venue_checks: AtomicUsize,
    }

    impl SolarTimeProvider for CountingSolar {
        fn venue_uses_sol(&self, _host_id: i32, _session_id: i64) -> bool {
            self.venue_checks.fetch_add(1, Ordering::SeqCst);
            true
        }

        fn local_solar_time(&self, _scet: &AccurateTime, _spacecraft_id: i32) -> Option<String> {
            Some("SOL-0042M10:00:00.000".to_string())
        }
    }

    fn run_with_solar(use_lst: bool, scet: Option<AccurateTime>) -> (usize, Vec<String>) {
        let solar = Arc::new(CountingSolar::default());
        let coordinator = Arc::new(InMemoryCoordinator::new());
        let id = coordinator.generate_batch_id();
        let config = FetchConfig::default()
            .with_columns(&[CsvColumn::ChannelId, CsvColumn::Lst])
            .with_lst(use_lst);
        let ctx = BatchContext::new(Arc::new(config), coordinator.clone())
            .unwrap()
            .with_solar(solar.clone());
        let mut sample = member("A-0001", Some("PWR"), 1, None);
        sample.scet = scet;
        let mut processor = AggregateBatchProcessor::new(
            ctx,
            RecordBatch::new(id, vec![aggregate(vec![sample])]),
            1,
            NonSortingOutput,
        );
        processor.process_batch();
        let lines = match coordinator.take_next_batch() {
            Some((_, ProcessedBatchInfo::InMemory(lines))) => lines,
            other => panic!("unexpected batch result: {:?}", other),
        };
        (solar.venue_checks.load(Ordering::SeqCst), lines)
    }

    #[test]
    fn test_lst_only_computed_when_enabled_with_real_scet() {
        let scet = AccurateTime::new(500, 0).unwrap();

        let (checks, lines) = run_with_solar(false, Some(scet));
        assert_eq!(checks, 0);
        assert_eq!(lines, vec!["\"A-0001\",".to_string()]);

        let (checks, lines) = run_with_solar(true, None);
        assert_eq!(checks, 0);
        assert_eq!(lines, vec!["\"A-0001\",".to_string()]);

        let (checks, lines) = run_with_solar(true, Some(scet));
        assert_eq!(checks, 1);
        assert_eq!(
            lines,
            vec!["\"A-0001\",\"SOL-0042M10:00:00.000\"".to_string()]
        );
    }
}
