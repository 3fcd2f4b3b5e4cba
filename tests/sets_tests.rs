//! Parameter-set pipelines across files: format conversion, range
//! refinement, robustness filtering, and search-log extraction.

use somite_tools::analysis::{count_passes, extract_good_sets, write_robust_sets, RobustnessConfig};
use somite_tools::params::{
    convert_file, read_float_sets, read_ranges, read_sets, refine, write_ranges,
};

#[test]
fn test_convert_file_round_trips_through_the_master_list() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("sets-45.params");
    let wide = dir.path().join("sets-88.params");
    let back = dir.path().join("back-45.params");

    let set_a: Vec<String> = (0..45).map(|i| format!("a{i}")).collect();
    let set_b: Vec<String> = (0..45).map(|i| format!("b{i}")).collect();
    let text = format!(
        "# survivors from the deterministic search\n\n{}\n{}\n",
        set_a.join(","),
        set_b.join(",")
    );
    std::fs::write(&input, text).unwrap();

    assert_eq!(convert_file(&input, &wide, 88).unwrap(), 2);
    let widened = read_sets(&wide).unwrap();
    assert_eq!(widened.len(), 2);
    assert_eq!(widened[0].len(), 88);

    // Narrowing the widened file recovers the original values.
    assert_eq!(convert_file(&wide, &back, 45).unwrap(), 2);
    assert_eq!(read_sets(&back).unwrap(), vec![set_a, set_b]);
}

#[test]
fn test_refine_tightens_a_ranges_file_around_survivors() {
    let dir = tempfile::tempdir().unwrap();
    let ranges_file = dir.path().join("current.ranges");
    let sets_file = dir.path().join("good.params");
    let refined_file = dir.path().join("refined.ranges");

    std::fs::write(&ranges_file, "msh1 [0,100]\nmsh7 [10,60]\n").unwrap();
    std::fs::write(&sets_file, "# survivors\n50,20\n52,20\n54,20\n").unwrap();

    let ranges = read_ranges(&ranges_file).unwrap();
    let sets = read_float_sets(&sets_file).unwrap();
    let refined = refine(&ranges, &sets, 1.0, 2).unwrap();
    write_ranges(&refined_file, &refined).unwrap();

    // msh1: mean 52, population stdev sqrt(8/3), rounded at 2 digits.
    // msh7: no spread, so the range collapses to the mean.
    let text = std::fs::read_to_string(&refined_file).unwrap();
    assert_eq!(text, "msh1 [50.37,53.63]\nmsh7 [20,20]\n");
}

#[test]
fn test_robustness_counts_filter_the_input_sets() {
    let dir = tempfile::tempdir().unwrap();
    let write_scores = |seed: usize, chunk: usize, rows: &str| {
        let path = dir.path().join(format!("scores-{seed}-{chunk}.csv"));
        std::fs::write(&path, format!("set,mutant scores,total\n{rows}")).unwrap();
    };
    // Four sets split two per chunk; a set passes a seed when its total
    // hits the max score.
    write_scores(1000, 0, "0,20,46\n1,12,30\n");
    write_scores(1000, 1, "2,22,46\n3,21,46\n");
    write_scores(2000, 0, "0,19,46\n1,20,46\n\n");
    write_scores(2000, 1, "2,3,12\n3,20,46\n");

    let config = RobustnessConfig {
        seeds: 2,
        sets: 4,
        files: 2,
        scores_dir: dir.path().to_path_buf(),
        max_score: 46.0,
    };
    let counts = count_passes(&config).unwrap();
    assert_eq!(counts, vec![2, 1, 1, 2]);

    let input = dir.path().join("candidates.params");
    let output = dir.path().join("robust.params");
    std::fs::write(&input, "9,9,0\n8,8,1\n7,7,2\n6,6,3\n").unwrap();
    let kept = write_robust_sets(&input, &output, &counts, 2).unwrap();
    assert_eq!(kept, 2);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "9,9,0\n6,6,3\n"
    );
}

#[test]
fn test_extracted_good_sets_feed_the_set_reader() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("search.log");
    let good = dir.path().join("good.params");

    std::fs::write(
        &log,
        "generation 4\n\
         Found a good set:\n\
         0.000000,63.1,10.5,2\n\
         generation 5\n\
         Found a good set:\n\
         0.000000,88,11,3\n",
    )
    .unwrap();

    assert_eq!(extract_good_sets(&log, &good).unwrap(), 2);
    let sets = read_sets(&good).unwrap();
    assert_eq!(sets, vec![vec!["63.1", "10.5", "2"], vec!["88", "11", "3"]]);
}
