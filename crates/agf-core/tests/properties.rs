//! Property-based tests for member filtering and the changes-only filter.

use std::collections::HashMap;
use std::sync::Arc;

use agf_common::{
    AccurateTime, AggregateRecord, AlarmLevel, AlarmValue, ChannelSampleGroup,
    ChannelSampleMember, DnValue, GroupDiscriminator, RecordBatch, SignedDn,
};
use agf_config::{AlarmFilter, CsvColumn, FetchConfig, ModuleFilter, TimeBasis, TimeRange};
use agf_core::codec::pack_group;
use agf_core::processor::NonSortingOutput;
use agf_core::{
    BatchContext, BatchProcessor, ChangesOnlyFilter, InMemoryCoordinator,
    NonSortingBatchProcessor, ProcessedBatchInfo, StreamFilter,
};
use proptest::prelude::*;

const CHANNELS: [&str; 3] = ["A-0001", "B-0002", "C-0003"];
const MODULES: [Option<&str>; 3] = [Some("PWR"), Some("THERM"), None];

#[derive(Debug, Clone)]
struct Sample {
    channel: usize,
    module: usize,
    alarm: AlarmLevel,
    ert_millis: i64,
}

#[derive(Debug, Clone)]
struct Filters {
    channels: Option<Vec<usize>>,
    module: Option<&'static str>,
    red_only: bool,
    window: Option<(i64, i64)>,
}

fn alarm_level() -> impl Strategy<Value = AlarmLevel> {
    prop_oneof![
        Just(AlarmLevel::None),
        Just(AlarmLevel::Yellow),
        Just(AlarmLevel::Red),
    ]
}

fn sample() -> impl Strategy<Value = Sample> {
    (0..CHANNELS.len(), 0..MODULES.len(), alarm_level(), 0i64..10_000).prop_map(
        |(channel, module, alarm, ert_millis)| Sample {
            channel,
            module,
            alarm,
            ert_millis,
        },
    )
}

fn filters() -> impl Strategy<Value = Filters> {
    (
        proptest::option::of(proptest::collection::vec(0..CHANNELS.len(), 1..3)),
        proptest::option::of(prop_oneof![Just("PWR"), Just("THERM"), Just("R")]),
        any::<bool>(),
        proptest::option::of((0i64..5_000, 5_000i64..10_000)),
    )
        .prop_map(|(channels, module, red_only, window)| Filters {
            channels,
            module,
            red_only,
            window,
        })
}

fn to_member(index: usize, s: &Sample) -> ChannelSampleMember {
    let alarms = match s.alarm {
        AlarmLevel::None => Vec::new(),
        level => vec![AlarmValue {
            level,
            in_alarm: true,
            on_eu: false,
        }],
    };
    ChannelSampleMember {
        channel_id: CHANNELS[s.channel].to_string(),
        name: String::new(),
        module: MODULES[s.module].map(str::to_string),
        packet_id: 0,
        dn: DnValue::SignedInt(SignedDn::I64(index as i64)).encode(),
        eu: None,
        status: None,
        dn_format: None,
        eu_format: None,
        alarms,
        ert: AccurateTime::new(s.ert_millis, 0).unwrap(),
        rct: AccurateTime::new(s.ert_millis, 0).unwrap(),
        scet: None,
        sclk: None,
    }
}

fn config_for(f: &Filters) -> FetchConfig {
    let mut config = FetchConfig::default().with_columns(&[CsvColumn::Dn]);
    if let Some(channels) = &f.channels {
        config = config.with_channel_ids(channels.iter().map(|i| CHANNELS[*i]));
    }
    if let Some(module) = f.module {
        config = config.with_module_filter(ModuleFilter::new(module, "[*%?]").unwrap());
    }
    if f.red_only {
        config = config.with_alarm_filter(AlarmFilter::parse("RED").unwrap());
    }
    if let Some((start, stop)) = f.window {
        let range = TimeRange::parse(
            TimeBasis::Ert,
            Some(AccurateTime::new(start, 0).unwrap().format(3).as_str()),
            Some(AccurateTime::new(stop, 0).unwrap().format(3).as_str()),
        )
        .unwrap();
        config = config.with_time_range(range);
    }
    config
}

fn expected(samples: &[Sample], f: &Filters) -> Vec<String> {
    samples
        .iter()
        .enumerate()
        .filter(|(_, s)| f.channels.as_ref().map_or(true, |c| c.contains(&s.channel)))
        .filter(|(_, s)| {
            f.module
                .map_or(true, |m| MODULES[s.module].unwrap_or("").contains(m))
        })
        .filter(|(_, s)| !f.red_only || s.alarm == AlarmLevel::Red)
        .filter(|(_, s)| {
            f.window
                .map_or(true, |(a, b)| (a..=b).contains(&s.ert_millis))
        })
        .map(|(i, _)| i.to_string())
        .collect()
}

fn process(samples: &[Sample], config: FetchConfig) -> Vec<String> {
    let members = samples
        .iter()
        .enumerate()
        .map(|(i, s)| to_member(i, s))
        .collect::<Vec<_>>();
    let record = AggregateRecord {
        channel_ids: CHANNELS.join(":"),
        payload: pack_group(&ChannelSampleGroup {
            discriminator: GroupDiscriminator::default(),
            members,
        })
        .unwrap(),
        ..AggregateRecord::default()
    };

    let coordinator = Arc::new(InMemoryCoordinator::new());
    let ctx = BatchContext::new(Arc::new(config), coordinator.clone()).unwrap();
    let id = coordinator.generate_batch_id();
    let mut processor =
        NonSortingBatchProcessor::new(ctx, RecordBatch::new(id, vec![record]), 1, NonSortingOutput);
    processor.process_batch();
    match coordinator.take_next_batch() {
        Some((_, ProcessedBatchInfo::InMemory(lines))) => lines,
        _ => Vec::new(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A member is emitted exactly when it passes every configured filter.
    #[test]
    fn filters_compose_independently(
        samples in proptest::collection::vec(sample(), 0..40),
        f in filters(),
    ) {
        let lines = process(&samples, config_for(&f));
        prop_assert_eq!(lines, expected(&samples, &f));
    }

    /// The changes-only filter keeps exactly the first line of every run of
    /// equal values per channel.
    #[test]
    fn changes_only_keeps_value_transitions(
        stream in proptest::collection::vec((0usize..3, 0u8..3), 0..60),
    ) {
        let lines: Vec<String> = stream
            .iter()
            .map(|(c, v)| format!("\"{}\",{}", CHANNELS[*c], v))
            .collect();
        let mut filter = ChangesOnlyFilter::with_positions(0, 1, None, false);
        let kept = filter.filter(lines.clone());

        let mut last: HashMap<usize, u8> = HashMap::new();
        let mut want = Vec::new();
        for ((c, v), line) in stream.iter().zip(&lines) {
            if last.get(c) != Some(v) {
                last.insert(*c, *v);
                want.push(line.clone());
            }
        }
        prop_assert_eq!(kept, want);
    }
}
