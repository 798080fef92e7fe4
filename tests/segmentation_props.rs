use proptest::prelude::*;
use pupilfuse_lib::interpolation::CubicSpline;
use pupilfuse_lib::models::{Sample, Segment, SegmentTable};
use pupilfuse_lib::segmentation::segment_stream;

/// Contiguous segments from 0 with the given durations, plus sorted sample
/// times inside `[0, total]`.
fn table_and_samples() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    prop::collection::vec(1.0f64..500.0, 1..8).prop_flat_map(|durations| {
        let total: f64 = durations.iter().sum();
        let times = prop::collection::vec(0.0..=total, 0..200).prop_map(|mut times| {
            times.sort_by(|a, b| a.total_cmp(b));
            times
        });
        (Just(durations), times)
    })
}

fn build_table(durations: &[f64]) -> SegmentTable {
    let mut start = 0.0;
    let segments = durations
        .iter()
        .enumerate()
        .map(|(idx, duration)| {
            let segment = Segment::new(format!("{}.mp4", idx + 1), start, start + duration);
            start += duration;
            segment
        })
        .collect();
    SegmentTable::new(segments).unwrap()
}

proptest! {
    #[test]
    fn every_sample_lands_in_exactly_one_segment((durations, times) in table_and_samples()) {
        let table = build_table(&durations);
        let samples: Vec<Sample> = times.iter().map(|&t| Sample::new(t, t * 0.01)).collect();

        let series = segment_stream(&samples, &table).unwrap();

        prop_assert_eq!(series.len(), table.len());
        prop_assert_eq!(series.total_points(), samples.len());

        let mut rebuilt = Vec::with_capacity(samples.len());
        for entry in series.entries() {
            for (&relative, &value) in entry.relative_times.iter().zip(&entry.values) {
                let absolute = relative + entry.segment.start_ms;
                prop_assert!(absolute <= entry.segment.end_ms + 1e-9);
                rebuilt.push((absolute, value));
            }
        }
        for ((absolute, value), sample) in rebuilt.iter().zip(&samples) {
            prop_assert!((absolute - sample.time_ms).abs() < 1e-9);
            prop_assert_eq!(*value, sample.value);
        }
    }

    #[test]
    fn spline_is_exact_at_knots(
        steps in prop::collection::vec(0.5f64..50.0, 1..40),
        seed in -10.0f64..10.0,
    ) {
        let mut t = 0.0;
        let mut times = vec![t];
        for step in &steps {
            t += step;
            times.push(t);
        }
        let values: Vec<f64> = times.iter().map(|x| (x * 0.1 + seed).sin() * 3.0).collect();

        let spline = CubicSpline::fit(&times, &values).unwrap();

        for (&x, &y) in times.iter().zip(&values) {
            prop_assert!((spline.evaluate(x) - y).abs() < 1e-9);
        }
    }
}
