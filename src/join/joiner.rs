//! Pairs frame records with the pupil window that ends at each frame.

use std::collections::BTreeMap;

use crate::interpolation::{sample_window, WindowConfig};
use crate::join::cache::InterpolantLookup;
use crate::join::classes::{ClassIndex, ClassMap};
use crate::models::{format_time_ms, FrameRecord, InterpolantKey, JoinedRecord};
use crate::report::{SkipEvent, SkipLog, SkipReason, Stage};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Joined records plus the class enumeration their indices refer to.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub records: Vec<JoinedRecord>,
    pub classes: ClassIndex,
}

/// Join every frame record with its window.
///
/// Records are grouped by `(participant, emotion)` and the groups are visited
/// in key order, so output order does not depend on input order across
/// groups. Within a group, input order is kept. Nothing here fails the
/// batch: unresolvable groups and records are reported to `skips`.
pub fn join_records(
    records: Vec<FrameRecord>,
    lookup: &impl InterpolantLookup,
    classes: &ClassMap,
    window: WindowConfig,
    skips: &mut SkipLog,
) -> JoinOutcome {
    let total = records.len();

    let mut groups: BTreeMap<InterpolantKey, Vec<FrameRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.key()).or_default().push(record);
    }

    let mut joined = Vec::with_capacity(total);
    for (key, group) in groups {
        let spline = match lookup.get(&key) {
            Ok(spline) => spline,
            Err(err) => {
                skips.record(
                    SkipEvent::new(Stage::Join, SkipReason::MissingInterpolant, &key.participant)
                        .emotion(&key.emotion)
                        .detail(format!("{err}; {} frame records dropped", group.len())),
                );
                continue;
            }
        };

        let expected = classes.class_for(&key.emotion);
        let class_index = expected.and_then(|label| classes.index().index_of(label));

        for record in group {
            let (label, index) = match (expected, class_index) {
                (Some(label), Some(index)) if record.class_label == label => (label, index),
                _ => {
                    let wanted = match expected {
                        Some(label) => format!("expected `{label}`"),
                        None => format!("emotion `{}` has no class in this run", key.emotion),
                    };
                    skips.record(
                        SkipEvent::new(Stage::Join, SkipReason::LabelMismatch, &key.participant)
                            .emotion(&key.emotion)
                            .detail(format!(
                                "frame at {} labelled `{}`, {wanted}",
                                format_time_ms(record.end_time),
                                record.class_label,
                            )),
                    );
                    continue;
                }
            };

            let Some(values) =
                sample_window(&spline, record.end_time, window.window_size, window.period_ms)
            else {
                skips.record(
                    SkipEvent::new(Stage::Join, SkipReason::InsufficientHistory, &key.participant)
                        .emotion(&key.emotion)
                        .detail(format!(
                            "frame at {} needs {} ms of history",
                            format_time_ms(record.end_time),
                            window.history_ms()
                        )),
                );
                continue;
            };

            log_debug!("joined {} at {}", key, format_time_ms(record.end_time));
            joined.push(JoinedRecord {
                image_reference: record.image_reference,
                window: values,
                class_label: label.to_string(),
                class_index: index,
                participant: record.participant,
                emotion: record.emotion,
                end_time: record.end_time,
            });
        }
    }

    log_info!("joined {} of {} frame records", joined.len(), total);

    JoinOutcome {
        records: joined,
        classes: classes.index().clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::interpolation::CubicSpline;
    use crate::join::cache::InterpolantCache;
    use crate::join::classes::{ClassScheme, Polarity};

    fn ramp() -> CubicSpline {
        let times: Vec<f64> = (0..=100).map(|k| k as f64 * 10.0).collect();
        let values: Vec<f64> = times.iter().map(|t| t / 1000.0).collect();
        CubicSpline::fit(&times, &values).unwrap()
    }

    fn frame(participant: &str, emotion: &str, label: &str, end_time: f64) -> FrameRecord {
        FrameRecord {
            participant: participant.to_string(),
            emotion: emotion.to_string(),
            class_label: label.to_string(),
            end_time,
            image_reference: PathBuf::from(format!(
                "{label}/{participant}_{emotion}_{end_time:?}_c.png"
            )),
        }
    }

    fn classes(scheme: ClassScheme) -> ClassMap {
        let emotions = ["joy", "anger", "fear", "fun", "sad", "happy", "calm"];
        ClassMap::new(scheme, emotions, &Polarity::default()).unwrap()
    }

    fn small_window() -> WindowConfig {
        WindowConfig {
            window_size: 10,
            period_ms: 10.0,
        }
    }

    #[test]
    fn missing_interpolant_drops_only_its_group() {
        let cache: InterpolantCache = [(InterpolantKey::new("ab", "joy"), ramp())]
            .into_iter()
            .collect();
        let records = vec![
            frame("ab", "joy", "joy", 300.0),
            frame("cd", "joy", "joy", 300.0),
            frame("ab", "joy", "joy", 400.0),
        ];
        let mut skips = SkipLog::new();

        let multiclass = classes(ClassScheme::Multiclass);
        let outcome = join_records(records, &cache, &multiclass, small_window(), &mut skips);

        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.records.iter().all(|r| r.participant == "ab"));
        assert_eq!(skips.len(), 1);
        assert_eq!(skips.count(SkipReason::MissingInterpolant), 1);
    }

    #[test]
    fn missing_key_is_the_only_difference_from_full_coverage() {
        let records = vec![
            frame("ab", "joy", "joy", 300.0),
            frame("cd", "joy", "joy", 300.0),
        ];
        let full: InterpolantCache = [
            (InterpolantKey::new("ab", "joy"), ramp()),
            (InterpolantKey::new("cd", "joy"), ramp()),
        ]
        .into_iter()
        .collect();
        let partial: InterpolantCache = [(InterpolantKey::new("ab", "joy"), ramp())]
            .into_iter()
            .collect();

        let multiclass = classes(ClassScheme::Multiclass);
        let window = small_window();
        let mut skips = SkipLog::new();
        let with_all = join_records(records.clone(), &full, &multiclass, window, &mut skips);
        let with_gap = join_records(records, &partial, &multiclass, window, &mut skips);

        let expected: Vec<_> = with_all
            .records
            .into_iter()
            .filter(|r| r.participant != "cd")
            .collect();
        assert_eq!(with_gap.records, expected);
    }

    #[test]
    fn label_mismatch_and_short_history_are_skipped() {
        let cache: InterpolantCache = [(InterpolantKey::new("ab", "fear"), ramp())]
            .into_iter()
            .collect();
        let records = vec![
            frame("ab", "fear", "fear", 50.0),
            frame("ab", "fear", "joy", 300.0),
            frame("ab", "fear", "fear", 300.0),
        ];
        let mut skips = SkipLog::new();

        let multiclass = classes(ClassScheme::Multiclass);
        let outcome = join_records(records, &cache, &multiclass, small_window(), &mut skips);

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].end_time, 300.0);
        assert_eq!(skips.count(SkipReason::InsufficientHistory), 1);
        assert_eq!(skips.count(SkipReason::LabelMismatch), 1);
    }

    #[test]
    fn binary_scheme_uses_folded_labels_and_indices() {
        let cache: InterpolantCache = [
            (InterpolantKey::new("ab", "sad"), ramp()),
            (InterpolantKey::new("ab", "calm"), ramp()),
        ]
        .into_iter()
        .collect();
        let records = vec![
            frame("ab", "sad", "negative", 300.0),
            frame("ab", "calm", "positive", 300.0),
        ];
        let mut skips = SkipLog::new();

        let binary = classes(ClassScheme::Binary);
        let outcome = join_records(records, &cache, &binary, small_window(), &mut skips);

        assert!(skips.is_empty());
        let by_emotion: BTreeMap<_, _> = outcome
            .records
            .iter()
            .map(|r| (r.emotion.as_str(), (r.class_label.as_str(), r.class_index)))
            .collect();
        assert_eq!(by_emotion["sad"], ("negative", 0));
        assert_eq!(by_emotion["calm"], ("positive", 1));
    }

    #[test]
    fn window_has_configured_length() {
        let cache: InterpolantCache = [(InterpolantKey::new("ab", "joy"), ramp())]
            .into_iter()
            .collect();
        let mut skips = SkipLog::new();

        let outcome = join_records(
            vec![frame("ab", "joy", "joy", 600.0)],
            &cache,
            &classes(ClassScheme::Multiclass),
            small_window(),
            &mut skips,
        );

        let record = &outcome.records[0];
        assert_eq!(record.window.len(), 10);
        assert_eq!(record.class_index, outcome.classes.index_of("joy").unwrap());
    }

    #[test]
    fn configured_emotion_outside_the_default_set_is_joined() {
        let cache: InterpolantCache = [(InterpolantKey::new("ab", "surprise"), ramp())]
            .into_iter()
            .collect();
        let vocabulary =
            ClassMap::new(ClassScheme::Multiclass, ["joy", "surprise"], &Polarity::default())
                .unwrap();
        let mut skips = SkipLog::new();

        let outcome = join_records(
            vec![frame("ab", "surprise", "surprise", 600.0)],
            &cache,
            &vocabulary,
            small_window(),
            &mut skips,
        );

        assert!(skips.is_empty());
        assert_eq!(outcome.classes.labels(), vec!["joy", "surprise"]);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].class_label, "surprise");
        assert_eq!(outcome.records[0].class_index, 1);
    }

    #[test]
    fn emotion_missing_from_the_vocabulary_is_a_label_mismatch() {
        let cache: InterpolantCache = [(InterpolantKey::new("ab", "surprise"), ramp())]
            .into_iter()
            .collect();
        let mut skips = SkipLog::new();

        let outcome = join_records(
            vec![frame("ab", "surprise", "surprise", 600.0)],
            &cache,
            &classes(ClassScheme::Multiclass),
            small_window(),
            &mut skips,
        );

        assert!(outcome.records.is_empty());
        assert_eq!(skips.count(SkipReason::LabelMismatch), 1);
        assert!(skips.events()[0].detail.contains("no class in this run"));
    }
}
