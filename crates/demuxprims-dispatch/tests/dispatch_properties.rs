use bytes::{Bytes, BytesMut};
use demuxprims_dispatch::{
    Dispatcher, DrainStats, OutcomeKind, ParseOutcome, ParserConfig,
};
use demuxprims_frame::{FrameBuffer, SourceId, TimeTagEpoch};
use demuxprims_protocols::ieee1344::{self, CommonFrameHeader, FrameType, Ieee1344Frame};
use demuxprims_protocols::pdcstream::{self, FrameKind, ParsingOptions, PdcStreamFrame};
use demuxprims_protocols::{Ieee1344Codec, PdcStreamCodec};

fn ieee_dispatcher(limit: u32) -> Dispatcher<Ieee1344Codec> {
    let config = ParserConfig {
        unparsed_data_reuse_limit: limit,
        ..ParserConfig::default()
    };
    let dispatcher = Dispatcher::new(Ieee1344Codec, config).unwrap();
    dispatcher.start(&ieee1344::candidates()).unwrap();
    dispatcher
}

fn data_frame(soc: u32, body: &[u8]) -> Bytes {
    ieee1344::encode_frame(CommonFrameHeader::new(FrameType::DATA, soc), body).unwrap()
}

fn kinds(outcomes: &[ParseOutcome<FrameType>]) -> Vec<OutcomeKind> {
    outcomes.iter().map(ParseOutcome::kind).collect()
}

fn decoded_socs(outcomes: &[ParseOutcome<FrameType>], source: &str) -> Vec<u32> {
    outcomes
        .iter()
        .filter(|outcome| outcome.source().as_str() == source)
        .flat_map(|outcome| outcome.frames())
        .map(|frame| {
            frame
                .as_any()
                .downcast_ref::<Ieee1344Frame>()
                .unwrap()
                .header()
                .unwrap()
                .second_of_century()
        })
        .collect()
}

#[test]
fn back_to_back_frames_yield_one_parsed_outcome() {
    let dispatcher = ieee_dispatcher(5);
    let mut image = BytesMut::new();
    for soc in 0..8 {
        image.extend_from_slice(&data_frame(soc, &[soc as u8; 12]));
    }
    dispatcher.enqueue("pmu", image.freeze()).unwrap();

    let mut outcomes = Vec::new();
    let stats = dispatcher.drain(&mut outcomes).unwrap();

    assert_eq!(kinds(&outcomes), vec![OutcomeKind::Parsed]);
    assert_eq!(decoded_socs(&outcomes, "pmu"), (0..8).collect::<Vec<_>>());
    assert_eq!(stats.frames, 8);
}

#[test]
fn frame_split_across_images_decodes_once() {
    let dispatcher = ieee_dispatcher(5);
    let frame = data_frame(42, b"phasor estimates");
    let cut = frame.len() / 2;
    dispatcher.enqueue("pmu", frame.slice(..cut)).unwrap();
    dispatcher.enqueue("pmu", frame.slice(cut..)).unwrap();

    let mut outcomes = Vec::new();
    let stats = dispatcher.drain(&mut outcomes).unwrap();

    assert_eq!(kinds(&outcomes), vec![OutcomeKind::Reused, OutcomeKind::Parsed]);
    assert_eq!(decoded_socs(&outcomes, "pmu"), vec![42]);
    assert_eq!(stats.discarded_bytes, 0);
    assert_eq!(dispatcher.retry_count(&SourceId::from("pmu")), 0);
}

#[test]
fn split_across_drains_is_held_until_next_image() {
    let dispatcher = ieee_dispatcher(5);
    let source = SourceId::from("pmu");
    let frame = data_frame(7, b"0123456789");

    dispatcher.enqueue(source.clone(), frame.slice(..3)).unwrap();
    let mut outcomes = Vec::new();
    dispatcher.drain(&mut outcomes).unwrap();
    assert_eq!(dispatcher.pending_tail_len(&source), 3);

    dispatcher.enqueue(source.clone(), frame.slice(3..)).unwrap();
    dispatcher.drain(&mut outcomes).unwrap();

    assert_eq!(kinds(&outcomes), vec![OutcomeKind::Reused, OutcomeKind::Parsed]);
    assert_eq!(decoded_socs(&outcomes, "pmu"), vec![7]);
    assert_eq!(dispatcher.pending_tail_len(&source), 0);
}

#[test]
fn leftovers_are_discarded_after_limit_is_exhausted() {
    let limit = 2;
    let dispatcher = ieee_dispatcher(limit);
    let source = SourceId::from("pmu");
    let frame = data_frame(1, &[0u8; 64]);

    for chunk in 0..=limit as usize {
        dispatcher
            .enqueue(source.clone(), frame.slice(chunk * 3..chunk * 3 + 3))
            .unwrap();
    }

    let mut outcomes = Vec::new();
    let stats = dispatcher.drain(&mut outcomes).unwrap();

    assert_eq!(
        kinds(&outcomes),
        vec![OutcomeKind::Reused, OutcomeKind::Reused, OutcomeKind::Discarded]
    );
    match &outcomes[2] {
        ParseOutcome::Discarded {
            identifier,
            discarded,
            ..
        } => {
            assert_eq!(*identifier, Some(FrameType::DATA));
            assert_eq!(*discarded, 9);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(stats.reused, 2);
    assert_eq!(stats.discarded, 1);
    assert_eq!(dispatcher.retry_count(&source), 0);
    assert_eq!(dispatcher.pending_tail_len(&source), 0);

    dispatcher.enqueue(source, data_frame(2, b"fresh")).unwrap();
    let mut outcomes = Vec::new();
    dispatcher.drain(&mut outcomes).unwrap();
    assert_eq!(decoded_socs(&outcomes, "pmu"), vec![2]);
}

#[test]
fn sources_do_not_share_leftovers() {
    let dispatcher = ieee_dispatcher(5);
    let a = data_frame(100, b"from a");
    let b = data_frame(200, b"from b");

    dispatcher.enqueue("a", a.slice(..5)).unwrap();
    dispatcher.enqueue("b", b.clone()).unwrap();
    dispatcher.enqueue("a", a.slice(5..)).unwrap();

    let mut outcomes = Vec::new();
    dispatcher.drain(&mut outcomes).unwrap();

    assert_eq!(decoded_socs(&outcomes, "a"), vec![100]);
    assert_eq!(decoded_socs(&outcomes, "b"), vec![200]);
    assert_eq!(dispatcher.retry_count(&SourceId::from("b")), 0);
}

#[test]
fn unknown_type_does_not_touch_retry_count() {
    let dispatcher = ieee_dispatcher(5);
    let source = SourceId::from("pmu");
    let frame = data_frame(1, b"abc");

    dispatcher.enqueue(source.clone(), frame.slice(..4)).unwrap();
    let mut outcomes = Vec::new();
    dispatcher.drain(&mut outcomes).unwrap();
    assert_eq!(dispatcher.retry_count(&source), 1);

    // The held four bytes plus a reserved sample word read as an unknown type.
    let mut reserved = BytesMut::from(&frame[4..]);
    reserved[0] |= 0x60;
    dispatcher.enqueue(source.clone(), reserved.freeze()).unwrap();
    dispatcher.drain(&mut outcomes).unwrap();

    assert_eq!(outcomes.last().map(ParseOutcome::kind), Some(OutcomeKind::UnknownType));
    assert_eq!(dispatcher.retry_count(&source), 1);
}

#[test]
fn unknown_type_only_discards_its_own_image() {
    let dispatcher = ieee_dispatcher(5);
    let mut reserved = BytesMut::from(&data_frame(10, b"??")[..]);
    reserved[4] |= 0x60;
    reserved.extend_from_slice(&data_frame(11, b"lost"));
    let unknown_len = reserved.len();

    dispatcher.enqueue("a", reserved.freeze()).unwrap();
    dispatcher.enqueue("b", data_frame(20, b"kept")).unwrap();

    let mut outcomes = Vec::new();
    let stats = dispatcher.drain(&mut outcomes).unwrap();

    let summary: Vec<(&str, OutcomeKind, usize)> = outcomes
        .iter()
        .map(|outcome| (outcome.source().as_str(), outcome.kind(), outcome.frames().len()))
        .collect();
    assert_eq!(
        summary,
        vec![("a", OutcomeKind::UnknownType, 0), ("b", OutcomeKind::Parsed, 1)]
    );
    assert_eq!(decoded_socs(&outcomes, "b"), vec![20]);
    assert_eq!(stats.discarded_bytes, unknown_len);
    assert_eq!(dispatcher.retry_count(&SourceId::from("a")), 0);
    assert_eq!(dispatcher.pending_tail_len(&SourceId::from("b")), 0);
}

#[test]
fn concurrent_producers_keep_per_source_order() {
    let dispatcher = ieee_dispatcher(5);
    let sources = ["pmu-a", "pmu-b", "pmu-c", "pmu-d"];
    let per_source = 40u32;

    let mut outcomes = Vec::new();
    std::thread::scope(|scope| {
        for (index, source) in sources.iter().enumerate() {
            let dispatcher = &dispatcher;
            scope.spawn(move || {
                for n in 0..per_source {
                    let frame = data_frame(index as u32 * 1000 + n, b"sample");
                    let cut = 1 + (n as usize % (frame.len() - 1));
                    dispatcher.enqueue(*source, frame.slice(..cut)).unwrap();
                    dispatcher.enqueue(*source, frame.slice(cut..)).unwrap();
                }
            });
        }

        for _ in 0..20 {
            dispatcher.drain(&mut outcomes).unwrap();
            std::thread::yield_now();
        }
    });
    let stats: DrainStats = dispatcher.drain_all(&mut outcomes).unwrap();

    for (index, source) in sources.iter().enumerate() {
        let expected: Vec<u32> = (0..per_source).map(|n| index as u32 * 1000 + n).collect();
        assert_eq!(decoded_socs(&outcomes, source), expected);
    }
    assert!(outcomes
        .iter()
        .all(|outcome| matches!(outcome.kind(), OutcomeKind::Parsed | OutcomeKind::Reused)));
    assert!(stats.is_lossless());
}

#[test]
fn explicit_batch_preserves_given_order() {
    let dispatcher = ieee_dispatcher(5);
    let batch = vec![
        FrameBuffer::new("pmu", data_frame(3, b""), 9),
        FrameBuffer::new("pmu", data_frame(1, b""), 2),
    ];

    let mut outcomes = Vec::new();
    let stats = dispatcher.process_batch(batch, &mut outcomes).unwrap();

    assert_eq!(decoded_socs(&outcomes, "pmu"), vec![3, 1]);
    assert_eq!(stats.images, 2);
}

#[test]
fn lookup_strategy_does_not_change_outcomes() {
    let mut image = BytesMut::new();
    image.extend_from_slice(&data_frame(1, b"x"));
    image.extend_from_slice(
        &ieee1344::encode_frame(CommonFrameHeader::new(FrameType::CONFIGURATION, 2), b"cfg")
            .unwrap(),
    );
    image.extend_from_slice(&data_frame(3, b"y")[..6]);
    let image = image.freeze();

    let run = |optimize_parsing: bool| {
        let config = ParserConfig {
            optimize_parsing,
            ..ParserConfig::default()
        };
        let dispatcher = Dispatcher::new(Ieee1344Codec, config).unwrap();
        dispatcher.start(&ieee1344::candidates()).unwrap();
        dispatcher.enqueue("pmu", image.clone()).unwrap();
        let mut outcomes = Vec::new();
        let stats = dispatcher.drain(&mut outcomes).unwrap();
        (kinds(&outcomes), decoded_socs(&outcomes, "pmu"), stats)
    };

    assert_eq!(run(true), run(false));
}

#[test]
fn pdcstream_frames_dispatch_by_packet_number() {
    let options = ParsingOptions::default();
    let dispatcher = Dispatcher::new(PdcStreamCodec::new(options), ParserConfig::default()).unwrap();
    assert_eq!(dispatcher.start(&pdcstream::candidates(options)).unwrap(), 2);

    let config = pdcstream::encode_frame(pdcstream::CommonFrameHeader::new(0), b"cf", options)
        .unwrap();
    let soc = 1_700_000_000u32.to_be_bytes();
    let mut body = soc.to_vec();
    body.extend_from_slice(b"samples!");
    let data = pdcstream::encode_frame(pdcstream::CommonFrameHeader::new(3), &body, options)
        .unwrap();

    let mut image = BytesMut::new();
    image.extend_from_slice(&config);
    image.extend_from_slice(&data);
    dispatcher.enqueue("pdc", image.freeze()).unwrap();

    let mut outcomes: Vec<ParseOutcome<FrameKind>> = Vec::new();
    dispatcher.drain(&mut outcomes).unwrap();

    assert_eq!(outcomes.len(), 1);
    let frames = outcomes[0].frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].identifier(), Some(FrameKind::Configuration));
    assert_eq!(frames[1].identifier(), Some(FrameKind::Data));

    let data = frames[1].as_any().downcast_ref::<PdcStreamFrame>().unwrap();
    let header = data.header().unwrap();
    assert_eq!(header.time_tag_epoch(), Some(TimeTagEpoch::Unix));
    assert_eq!(
        header.timestamp().map(|ts| ts.unix_seconds()),
        Some(1_700_000_000)
    );
}
