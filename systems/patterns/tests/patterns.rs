use std::{fs, time::Duration};

use ringfire_core::{SpawnLimit, SpawnableKind};
use ringfire_system_patterns::{PatternError, PatternReader};

const TWO_LEVELS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<levels>
  <!-- opening wave -->
  <level>
    <spawnable type="Crasher">
      <pattern>
        <limit>4</limit>
        <rate>2.5</rate>
        <delay>1</delay>
        <maxDistance>15</maxDistance>
        <minDistance>8</minDistance>
      </pattern>
      <pattern repeat="2">
        <limit>-1</limit>
      </pattern>
    </spawnable>
    <spawnable type="HealthCapsule">
      <pattern>
        <limit>1</limit>
        <rate>10</rate>
        <maxDistance>5</maxDistance>
      </pattern>
    </spawnable>
  </level>
  <level>
    <spawnable type="Drone">
      <pattern>
        <limit>3</limit>
        <rate>1.0</rate>
        <delay>0.5</delay>
        <maxDistance>12</maxDistance>
      </pattern>
    </spawnable>
  </level>
</levels>
"#;

#[test]
fn reads_one_level_per_call() {
    let mut reader = PatternReader::from_text(TWO_LEVELS);

    let first = reader.next_level().expect("first level");
    assert_eq!(first.len(), 2);
    assert_eq!(first.required(SpawnableKind::Crasher), 3);
    assert_eq!(first.required(SpawnableKind::HealthCapsule), 1);
    assert_eq!(first.required(SpawnableKind::Drone), 0);

    let second = reader.next_level().expect("second level");
    assert_eq!(second.len(), 1);
    assert_eq!(second.required(SpawnableKind::Drone), 1);
    assert_eq!(reader.levels_read(), 2);
}

#[test]
fn repeated_patterns_inherit_previous_values_and_pop_first() {
    let mut reader = PatternReader::from_text(TWO_LEVELS);
    let level = reader.next_level().expect("level");
    let mut crashers = level
        .into_groups()
        .into_iter()
        .find(|group| group.kind() == SpawnableKind::Crasher)
        .expect("crasher group");

    for _ in 0..2 {
        let config = crashers.pop().expect("repeated config");
        assert_eq!(config.limit(), SpawnLimit::Unbounded);
        assert_eq!(config.rate(), Duration::from_millis(2500));
        assert_eq!(config.initial_delay(), Duration::from_secs(1));
        assert_eq!(config.min_distance(), 8.0);
        assert_eq!(config.max_distance(), 15.0);
    }
    let first = crashers.pop().expect("first config");
    assert_eq!(first.limit(), SpawnLimit::Finite(4));
    assert!(crashers.pop().is_none());
}

#[test]
fn optional_values_default_to_zero() {
    let mut reader = PatternReader::from_text(TWO_LEVELS);
    let level = reader.next_level().expect("level");
    let capsule = level
        .groups()
        .iter()
        .find(|group| group.kind() == SpawnableKind::HealthCapsule)
        .and_then(|group| group.peek().copied())
        .expect("capsule config");
    assert!(capsule.initial_delay().is_zero());
    assert_eq!(capsule.min_distance(), 0.0);
}

#[test]
fn exhausted_document_cycles_back_to_first_level() {
    let mut reader = PatternReader::from_text(TWO_LEVELS);
    let first = reader.next_level().expect("first");
    let _ = reader.next_level().expect("second");
    let third = reader.next_level().expect("third");
    assert_eq!(third, first);
}

#[test]
fn rewind_restarts_from_first_level() {
    let mut reader = PatternReader::from_text(TWO_LEVELS);
    let first = reader.next_level().expect("first");
    reader.rewind();
    assert_eq!(reader.next_level().expect("again"), first);
}

#[test]
fn repeated_kinds_merge_into_one_group() {
    let text = r#"<levels><level>
        <spawnable type="Drone"><pattern><limit>1</limit><rate>1</rate><maxDistance>4</maxDistance></pattern></spawnable>
        <spawnable type="Crasher"><pattern><limit>1</limit><rate>1</rate><maxDistance>4</maxDistance></pattern></spawnable>
        <spawnable type="Drone"><pattern><limit>2</limit><rate>1</rate><maxDistance>4</maxDistance></pattern></spawnable>
    </level></levels>"#;
    let level = PatternReader::from_text(text).next_level().expect("level");
    assert_eq!(level.len(), 2);
    let drones = &level.groups()[0];
    assert_eq!(drones.kind(), SpawnableKind::Drone);
    assert_eq!(
        drones.peek().map(|config| config.limit()),
        Some(SpawnLimit::Finite(2))
    );
}

#[test]
fn unknown_types_are_skipped_without_inheriting() {
    let text = r#"<levels><level>
        <spawnable type="Crasher"><pattern><limit>1</limit><rate>1</rate><maxDistance>4</maxDistance></pattern></spawnable>
        <spawnable type="Mothership"><pattern><limit>9</limit><rate>1</rate><maxDistance>4</maxDistance></pattern></spawnable>
    </level></levels>"#;
    let level = PatternReader::from_text(text).next_level().expect("level");
    assert_eq!(level.len(), 1);
    assert_eq!(level.required(SpawnableKind::Crasher), 1);
}

#[test]
fn missing_type_is_fatal() {
    let text = "<levels><level><spawnable><pattern/></spawnable></level></levels>";
    let error = PatternReader::from_text(text).next_level().unwrap_err();
    assert!(matches!(error, PatternError::MissingType));
}

#[test]
fn missing_required_value_is_fatal() {
    let text = r#"<levels><level>
        <spawnable type="Drone"><pattern><limit>2</limit><maxDistance>4</maxDistance></pattern></spawnable>
    </level></levels>"#;
    let error = PatternReader::from_text(text).next_level().unwrap_err();
    assert!(matches!(
        error,
        PatternError::MissingField {
            kind: SpawnableKind::Drone,
            field: "rate",
        }
    ));
}

#[test]
fn inverted_distances_are_rejected() {
    let text = r#"<levels><level>
        <spawnable type="Drone"><pattern>
            <limit>2</limit><rate>1</rate><maxDistance>4</maxDistance><minDistance>9</minDistance>
        </pattern></spawnable>
    </level></levels>"#;
    let error = PatternReader::from_text(text).next_level().unwrap_err();
    assert!(matches!(error, PatternError::Config(_)));
}

#[test]
fn invalid_repeat_is_fatal() {
    let text = r#"<levels><level><spawnable type="Drone"><pattern repeat="zero"/></spawnable></level></levels>"#;
    let error = PatternReader::from_text(text).next_level().unwrap_err();
    assert!(matches!(error, PatternError::InvalidRepeat(raw) if raw == "zero"));
}

#[test]
fn document_without_levels_is_empty() {
    let error = PatternReader::from_text("<levels/>").next_level().unwrap_err();
    assert!(matches!(error, PatternError::Empty));
}

#[test]
fn truncated_level_is_reported() {
    let text = r#"<level><spawnable type="Drone">"#;
    let error = PatternReader::from_text(text).next_level().unwrap_err();
    assert!(matches!(
        error,
        PatternError::UnexpectedEof | PatternError::Xml { .. }
    ));
}

#[test]
fn reads_documents_from_disk() {
    let path = std::env::temp_dir().join(format!("ringfire-patterns-{}.xml", std::process::id()));
    fs::write(&path, TWO_LEVELS).expect("write pattern file");

    let mut reader = PatternReader::from_path(&path);
    let first = reader.next_level().expect("first level");
    assert_eq!(first.required(SpawnableKind::Crasher), 3);
    fs::remove_file(&path).expect("remove pattern file");
}

#[test]
fn missing_file_reports_its_path() {
    let mut reader = PatternReader::from_path("/nonexistent/ringfire/patterns.xml");
    let error = reader.next_level().unwrap_err();
    assert!(matches!(error, PatternError::Open { ref path, .. } if path.ends_with("patterns.xml")));
}
