/// Number of classes considered for the response.
pub const TOP_K: usize = 3;
/// Percent a class must exceed to be reported.
pub const RELEVANCE_FLOOR_PERCENT: f32 = 1.0;

/// A class index with its probability as a percentage rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedClass {
    pub class_index: usize,
    pub percent: f32,
}

/// Take the `TOP_K` most probable classes and keep those above the floor.
///
/// Ties keep the lower class index first. The floor applies to the unrounded
/// percentage, so anywhere from zero to `TOP_K` entries come back.
pub fn rank_top(proba: &[f32]) -> Vec<RankedClass> {
    let mut order: Vec<usize> = (0..proba.len()).collect();
    order.sort_by(|&a, &b| proba[b].total_cmp(&proba[a]).then(a.cmp(&b)));
    order
        .into_iter()
        .take(TOP_K)
        .filter_map(|class_index| {
            let percent = proba[class_index] * 100.0;
            (percent > RELEVANCE_FLOOR_PERCENT).then(|| RankedClass {
                class_index,
                percent: round_one_decimal(percent),
            })
        })
        .collect()
}

fn round_one_decimal(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_top_three_in_descending_order() {
        let ranked = rank_top(&[0.05, 0.5, 0.1, 0.3, 0.05]);
        let indices: Vec<usize> = ranked.iter().map(|r| r.class_index).collect();
        assert_eq!(indices, vec![1, 3, 2]);
        assert_eq!(ranked[0].percent, 50.0);
        assert_eq!(ranked[1].percent, 30.0);
    }

    #[test]
    fn drops_entries_at_or_below_one_percent() {
        let ranked = rank_top(&[0.97, 0.01, 0.011, 0.009]);
        let indices: Vec<usize> = ranked.iter().map(|r| r.class_index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(ranked[1].percent, 1.1);
    }

    #[test]
    fn flat_distribution_yields_nothing() {
        assert!(rank_top(&[0.005; 200]).is_empty());
        assert!(rank_top(&[]).is_empty());
    }

    #[test]
    fn ties_prefer_lower_index() {
        let ranked = rank_top(&[0.25, 0.25, 0.25, 0.25]);
        let indices: Vec<usize> = ranked.iter().map(|r| r.class_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(round_one_decimal(33.333_33), 33.3);
        assert_eq!(round_one_decimal(66.666_67), 66.7);
    }
}
