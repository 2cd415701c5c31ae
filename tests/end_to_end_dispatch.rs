/// End-to-end tests: payload -> dispatcher -> queue -> drain -> sink
///
/// Each test drives a session with raw transport payloads and inspects the
/// PCM buffers that reach a memory sink.
use keytone::dispatcher::EventDispatcher;
use keytone::pitch_map::PitchMap;
use keytone::queue::PlaybackQueue;
use keytone::sink::MemorySink;
use keytone::synth::{synthesize, NoteSettings, SampleBuffer, Synthesizer};
use keytone::timbre::Timbre;
use std::sync::Arc;

/// Run `payloads` through one session and return what the sink received
fn play(payloads: &[&[u8]]) -> Vec<SampleBuffer> {
    let (queue, drain) = PlaybackQueue::with_capacity(10);
    let sink = MemorySink::new();
    let mut session = EventDispatcher::with_synthesizer(
        Arc::new(PitchMap::build()),
        queue.clone(),
        Synthesizer::with_seed(NoteSettings::default(), 42),
        Timbre::Strings,
    );

    for payload in payloads {
        session.handle_message(payload);
    }
    drop(session);

    queue.close();
    drain.run(&mut sink.clone());
    sink.buffers()
}

fn freq(key: char) -> f64 {
    PitchMap::standard().frequency(key).unwrap()
}

// ========== Key presses ==========

#[test]
fn test_key_with_default_strings_timbre() {
    let buffers = play(&[br#"{"type":"key","key":"a"}"#]);
    assert_eq!(buffers.len(), 1);

    let note = &buffers[0];
    assert_eq!(note.len(), 13230);
    assert_eq!(note.as_bytes()[0], 128);

    let expected = synthesize(freq('a'), 0.3, 44100, Timbre::Strings).unwrap();
    assert_eq!(note, &expected);
}

#[test]
fn test_wave_change_applies_to_later_keys_only() {
    let buffers = play(&[
        br#"{"type":"key","key":"a"}"#,
        br#"{"type":"wave","wave":"square"}"#,
        br#"{"type":"key","key":"s"}"#,
    ]);
    assert_eq!(buffers.len(), 2);

    let before = synthesize(freq('a'), 0.3, 44100, Timbre::Strings).unwrap();
    let after = synthesize(freq('s'), 0.3, 44100, Timbre::Square).unwrap();
    assert_eq!(buffers[0], before);
    assert_eq!(buffers[1], after);
    // square notes start at full envelope height
    assert_eq!(buffers[1].as_bytes()[0], 230);
}

#[test]
fn test_legacy_byte_matches_key_envelope() {
    let legacy = play(&[b"j"]);
    let structured = play(&[br#"{"type":"key","key":"j"}"#]);
    assert_eq!(legacy.len(), 1);
    assert_eq!(legacy, structured);
}

#[test]
fn test_unknown_key_produces_nothing() {
    let (queue, _drain) = PlaybackQueue::with_capacity(10);
    let mut session = EventDispatcher::new(
        Arc::new(PitchMap::build()),
        queue.clone(),
        NoteSettings::default(),
        Timbre::Strings,
    );

    assert!(session.handle_message(br#"{"type":"key","key":"q"}"#).is_none());
    assert_eq!(session.stats().unknown_keys, 1);
    assert_eq!(queue.stats().enqueued, 0);
    assert!(queue.is_empty());
}

#[test]
fn test_key_order_preserved() {
    let buffers = play(&[b"a", b"s", b"d", b"f"]);
    let expected: Vec<SampleBuffer> = ['a', 's', 'd', 'f']
        .iter()
        .map(|&k| synthesize(freq(k), 0.3, 44100, Timbre::Strings).unwrap())
        .collect();
    assert_eq!(buffers, expected);
}

// ========== Backpressure ==========

#[test]
fn test_burst_beyond_capacity_drops_newest() {
    let (queue, drain) = PlaybackQueue::with_capacity(10);
    let mut session = EventDispatcher::new(
        Arc::new(PitchMap::build()),
        queue.clone(),
        NoteSettings::default(),
        Timbre::Sine,
    );

    let keys = "asdfghjkl;'";
    for key in keys.bytes() {
        session.handle_message(&[key]);
    }
    assert_eq!(session.stats().played, 10);
    assert_eq!(session.stats().skipped, 1);

    queue.close();
    let sink = MemorySink::new();
    drain.run(&mut sink.clone());

    let expected: Vec<SampleBuffer> = keys
        .chars()
        .take(10)
        .map(|k| synthesize(freq(k), 0.3, 44100, Timbre::Sine).unwrap())
        .collect();
    assert_eq!(sink.buffers(), expected);
}

// ========== Malformed input ==========

#[test]
fn test_malformed_messages_are_skipped() {
    let buffers = play(&[
        b"garbage",
        br#"{"type":"volume","level":3}"#,
        br#"{"type":"key","key":"abc"}"#,
        br#"{"type":"wave","wave":""}"#,
        b"k",
    ]);
    assert_eq!(buffers.len(), 1);
    assert_eq!(
        buffers[0],
        synthesize(freq('k'), 0.3, 44100, Timbre::Strings).unwrap()
    );
}
