use rand::{seq::SliceRandom, Rng};
use std::collections::HashSet;

/// What the gas holder hands out next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionPlan {
    /// A pool question this session has not seen.
    Ask(i32),
    /// Every question was seen; copy this one into a fresh row.
    CloneFrom(i32),
    PoolEmpty,
}

/// Never hands out a question id already in `seen`.
pub fn plan_next_question<R: Rng + ?Sized>(pool: &[i32], seen: &HashSet<i32>, rng: &mut R) -> QuestionPlan {
    let unseen: Vec<i32> = pool.iter().copied().filter(|id| !seen.contains(id)).collect();
    if let Some(id) = unseen.choose(&mut *rng) {
        return QuestionPlan::Ask(*id);
    }
    match pool.choose(&mut *rng) {
        Some(id) => QuestionPlan::CloneFrom(*id),
        None => QuestionPlan::PoolEmpty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn never_repeats_within_a_session() {
        let pool = [1, 2, 3, 4];
        let mut seen = HashSet::new();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..pool.len() {
            match plan_next_question(&pool, &seen, &mut rng) {
                QuestionPlan::Ask(id) => assert!(seen.insert(id), "question {id} repeated"),
                other => panic!("expected an unseen question, got {other:?}"),
            }
        }
        assert_eq!(seen.len(), pool.len());
    }

    #[test]
    fn exhausted_pool_clones_a_pool_question() {
        let pool = [10, 11];
        let seen: HashSet<i32> = pool.iter().copied().collect();
        let mut rng = StdRng::seed_from_u64(1);

        match plan_next_question(&pool, &seen, &mut rng) {
            QuestionPlan::CloneFrom(id) => assert!(pool.contains(&id)),
            other => panic!("expected a clone, got {other:?}"),
        }
    }

    #[test]
    fn empty_pool_has_nothing_to_ask() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(plan_next_question(&[], &HashSet::new(), &mut rng), QuestionPlan::PoolEmpty);
    }

    #[test]
    fn seen_ids_outside_the_pool_are_ignored() {
        let seen: HashSet<i32> = [99].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(plan_next_question(&[5], &seen, &mut rng), QuestionPlan::Ask(5));
    }
}
