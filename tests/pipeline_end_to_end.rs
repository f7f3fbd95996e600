//! Table-driven end-to-end cases for the exact path of `Finder`.
//!
//! Each case pastes copies of a synthetic pattern into a noisy scene and
//! checks the reported positions and counts.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scenematch::{ColorView, ExactConfig, FindConfig, Finder, MatchKind, Point};
use serde::Deserialize;

const CASES: &str = r#"{
  "cases": [
    { "case_id": "single", "scene": [120, 90], "pattern": [18, 12],
      "instances": [[50, 40]], "expected": 1 },
    { "case_id": "three_spread", "scene": [160, 100], "pattern": [14, 10],
      "instances": [[3, 4], [70, 30], [130, 80]], "expected": 3 },
    { "case_id": "count_bound", "scene": [160, 60], "pattern": [10, 8],
      "instances": [[2, 2], [30, 2], [60, 30], [90, 10], [130, 40]],
      "max_count": 2, "expected": 3 },
    { "case_id": "rgb_input", "scene": [80, 50], "pattern": [12, 9],
      "instances": [[61, 33]], "rgb": true, "expected": 1 },
    { "case_id": "absent", "scene": [90, 60], "pattern": [12, 9],
      "instances": [], "expected": 0 }
  ]
}"#;

#[derive(Debug, Deserialize)]
struct Manifest {
    cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
struct Case {
    case_id: String,
    scene: [usize; 2],
    pattern: [usize; 2],
    instances: Vec<[usize; 2]>,
    #[serde(default)]
    max_count: Option<usize>,
    #[serde(default)]
    rgb: bool,
    expected: usize,
}

fn make_pattern(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            data.push((((x * 23) ^ (y * 41) ^ (x * y * 3)) & 0xFF) as u8);
        }
    }
    data
}

fn render(case: &Case, seed: u64) -> (Vec<u8>, Vec<u8>) {
    let [sw, sh] = case.scene;
    let [pw, _] = case.pattern;
    let pattern = make_pattern(case.pattern[0], case.pattern[1]);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scene: Vec<u8> = (0..sw * sh).map(|_| rng.random_range(0..24u8)).collect();
    for &[x, y] in &case.instances {
        for (row, src) in pattern.chunks(pw).enumerate() {
            let start = (y + row) * sw + x;
            scene[start..start + pw].copy_from_slice(src);
        }
    }
    (scene, pattern)
}

fn rgb(gray: &[u8]) -> Vec<u8> {
    gray.iter().flat_map(|&v| [v, v / 2, 255 - v]).collect()
}

#[test]
fn synthetic_cases() {
    let manifest: Manifest = serde_json::from_str(CASES).unwrap();
    for (i, case) in manifest.cases.iter().enumerate() {
        let (scene, pattern) = render(case, 1000 + i as u64);
        let [sw, sh] = case.scene;
        let [pw, ph] = case.pattern;

        let cfg = FindConfig {
            exact: ExactConfig {
                max_count: case.max_count.unwrap_or(10),
                ..ExactConfig::default()
            },
            feature_fallback: false,
            ..FindConfig::default()
        };
        let finder = Finder::new().with_config(cfg);

        let out = if case.rgb {
            let (scene_rgb, pattern_rgb) = (rgb(&scene), rgb(&pattern));
            finder
                .find(
                    ColorView::rgb(&scene_rgb, sw, sh).unwrap(),
                    ColorView::rgb(&pattern_rgb, pw, ph).unwrap(),
                )
                .unwrap()
        } else {
            finder
                .find(
                    ColorView::gray(&scene, sw, sh).unwrap(),
                    ColorView::gray(&pattern, pw, ph).unwrap(),
                )
                .unwrap()
        };

        assert_eq!(out.len(), case.expected, "case {}", case.case_id);
        for m in &out {
            let hit = Point::new(m.top_left.x, m.top_left.y);
            assert!(
                case.instances
                    .iter()
                    .any(|&[x, y]| hit == Point::new(x as i32, y as i32)),
                "case {}: unexpected match at {hit:?}",
                case.case_id
            );
            assert!(matches!(m.kind, MatchKind::Exact { confidence } if confidence > 0.99));
        }
        let mut tops: Vec<Point> = out.iter().map(|m| m.top_left).collect();
        tops.dedup();
        assert_eq!(tops.len(), out.len(), "case {}: duplicate match", case.case_id);
    }
}

#[test]
fn convenience_entry_points_agree() {
    let case = Case {
        case_id: "two".into(),
        scene: [100, 70],
        pattern: [15, 11],
        instances: vec![[10, 10], [60, 40]],
        max_count: None,
        rgb: false,
        expected: 2,
    };
    let (scene, pattern) = render(&case, 7);
    let scene_view = ColorView::gray(&scene, 100, 70).unwrap();
    let pattern_view = ColorView::gray(&pattern, 15, 11).unwrap();
    let finder = Finder::new();

    let all = finder.find(scene_view, pattern_view).unwrap();
    assert_eq!(all.len(), case.expected);
    let centers = finder.find_all_centers(scene_view, pattern_view).unwrap();
    assert_eq!(centers, all.iter().map(|m| m.center).collect::<Vec<_>>());
    assert_eq!(finder.find_first(scene_view, pattern_view).unwrap(), Some(all[0]));
    assert_eq!(
        finder.find_center(scene_view, pattern_view).unwrap(),
        Some(all[0].center)
    );
    assert_eq!(finder.find_exact(scene_view, pattern_view).unwrap(), all);
}
