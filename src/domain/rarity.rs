/// Share of attempts that ended with the badge earned, in percent.
///
/// `attempts` is the global counter registered under the badge name. Without
/// a positive counter the share is taken over all registered users instead.
pub fn badge_rarity(earned: i64, attempts: Option<i64>, total_users: i64) -> f64 {
    let denominator = match attempts {
        Some(n) if n > 0 => n,
        _ => total_users,
    };
    if denominator <= 0 || earned <= 0 {
        return 0.0;
    }

    let raw = earned as f64 / denominator as f64 * 100.0;
    if raw > 100.0 {
        tracing::warn!(earned, denominator, "badge rarity above 100%, attempt counter is behind");
    }
    round1(raw.min(100.0))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_attempt_counter_when_present() {
        assert_eq!(badge_rarity(3, Some(12), 100), 25.0);
        assert_eq!(badge_rarity(1, Some(3), 100), 33.3);
    }

    #[test]
    fn falls_back_to_user_count() {
        assert_eq!(badge_rarity(2, None, 8), 25.0);
        assert_eq!(badge_rarity(2, Some(0), 8), 25.0);
    }

    #[test]
    fn zero_denominator_is_zero() {
        assert_eq!(badge_rarity(0, None, 0), 0.0);
        assert_eq!(badge_rarity(5, None, 0), 0.0);
    }

    #[test]
    fn stale_counter_is_clamped() {
        assert_eq!(badge_rarity(9, Some(4), 20), 100.0);
    }

    #[test]
    fn user_fallback_stays_in_range() {
        // one grant per user, so earned never exceeds the user count
        for users in 1..=25_i64 {
            for earned in 0..=users {
                let r = badge_rarity(earned, None, users);
                assert!((0.0..=100.0).contains(&r), "{earned}/{users} -> {r}");
            }
        }
    }
}
