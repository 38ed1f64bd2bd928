use edh_swipe::*;

/// Every subset of WUBRG, the empty set included
fn all_color_sets() -> Vec<Vec<Color>> {
    (0u32..32)
        .map(|mask| {
            Color::ALL
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1u32 << *i) != 0)
                .map(|(_, c)| *c)
                .collect()
        })
        .collect()
}

mod comprehensive_filter_tests {
    use super::*;

    /// Predicate equals "identity is a non-empty subset of the selection"
    #[test]
    fn test_color_predicate_over_all_subsets() {
        for selected in all_color_sets().into_iter().filter(|s| !s.is_empty()) {
            let filter = CardFilter::new(selected.iter().copied(), None);
            for identity in all_color_sets() {
                let card = Card::new("c", "https://img/c.png").with_color_identity(identity.iter().copied());
                let expected = !identity.is_empty() && identity.iter().all(|c| selected.contains(c));
                assert_eq!(
                    filter.matches_color(&card),
                    expected,
                    "selection {:?}, identity {:?}",
                    selected,
                    identity
                );
            }
        }
    }

    /// Query color token lists exactly the selection in WUBRG order
    #[test]
    fn test_query_token_for_every_selection() {
        for selected in all_color_sets() {
            let mut reversed = selected.clone();
            reversed.reverse();
            let filter = CardFilter::new(reversed, None);
            let query = filter.build_query("is:commander");

            if selected.is_empty() {
                assert_eq!(query, "is:commander");
            } else {
                let token: String = selected.iter().map(|c| c.code()).collect();
                assert_eq!(query, format!("is:commander id<={} -id:c", token));
            }
        }
    }

    /// Mana value clause is emitted once and only with a bucket selected
    #[test]
    fn test_mana_value_clause_once() {
        for bucket in ManaValueBucket::ALL {
            let query = CardFilter::new([Color::R, Color::W], Some(bucket)).build_query("is:commander");
            assert_eq!(query.matches(bucket.clause()).count(), 1);
            assert!(query.find("id<=WR").unwrap() < query.find(bucket.clause()).unwrap());
        }
        assert!(!CardFilter::default().build_query("is:commander").contains("cmc"));
    }

    /// Bucket predicate agrees with the inequality in its clause
    #[test]
    fn test_bucket_predicate_agrees_with_clause() {
        for bucket in ManaValueBucket::ALL {
            let filter = CardFilter::new([], Some(bucket));
            for mv in 0..=16 {
                let card = Card::new("c", "https://img/c.png").with_mana_value(mv as f64);
                let in_clause = bucket
                    .clause()
                    .split(' ')
                    .all(|term| match term.strip_prefix("cmc<=") {
                        Some(max) => mv <= max.parse::<i32>().unwrap(),
                        None => mv >= term.trim_start_matches("cmc>=").parse::<i32>().unwrap(),
                    });
                assert_eq!(filter.matches(&card), in_clause, "{:?} at {}", bucket, mv);
            }
        }
    }

    /// Each card lands in exactly one bucket for whole mana values
    #[test]
    fn test_buckets_partition_whole_numbers() {
        for mv in 0..=20 {
            let hits = ManaValueBucket::ALL
                .iter()
                .filter(|b| b.contains(mv as f64))
                .count();
            assert_eq!(hits, 1, "mana value {}", mv);
        }
    }
}
