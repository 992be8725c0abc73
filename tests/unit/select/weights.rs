use super::*;

#[test]
fn marker_is_read_as_percentage() {
    assert!((marker_weight("red#80.png") - 0.8).abs() < 1e-12);
    assert!((marker_weight("blue#20.png") - 0.2).abs() < 1e-12);
    assert!((marker_weight("gold#2.5.png") - 0.025).abs() < 1e-12);
    assert_eq!(marker_weight("circle.png"), 1.0);
}

#[test]
fn only_first_marker_counts() {
    assert!((marker_weight("a#10-b#90.png") - 0.1).abs() < 1e-12);
    assert_eq!(strip_marker("a#10-b#90.png"), "a-b#90.png");
    assert_eq!(strip_marker("red#80.png"), "red.png");
    assert_eq!(strip_marker("plain.png"), "plain.png");
}

#[test]
fn probabilities_sum_to_one_for_any_listing() {
    let listings: Vec<Vec<&str>> = vec![
        vec!["only.png"],
        vec!["red#80.png", "blue#20.png"],
        vec!["a#1.png", "b.png", "c#250.png", "d#33.png"],
        (0..17).map(|_| "x#7.png").collect(),
    ];
    for names in listings {
        let set = extract_probabilities(&names).unwrap();
        assert_eq!(set.len(), names.len());
        let total: f64 = set.entries().iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9, "{names:?} sums to {total}");
    }
}

#[test]
fn unmarked_names_weigh_one_relative_to_markers() {
    let set = extract_probabilities(&["plain.png", "half#50.png"]).unwrap();
    let plain = set.probability_of(&"plain.png".to_string()).unwrap();
    let half = set.probability_of(&"half#50.png".to_string()).unwrap();
    assert!((plain - 2.0 / 3.0).abs() < 1e-12);
    assert!((half - 1.0 / 3.0).abs() < 1e-12);
}

#[test]
fn empty_listing_is_empty_and_zero_markers_are_fatal() {
    let names: [&str; 0] = [];
    assert!(extract_probabilities(&names).unwrap().is_empty());

    let err = extract_probabilities(&["a#0.png", "b#0.png"]).unwrap_err();
    assert!(err.is_config());
}
