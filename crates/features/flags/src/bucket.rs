use fstone_domain::{EvaluationContext, RolloutStrategy};

pub const BUCKETS: u32 = 100;

/// Polynomial rolling hash (`h * 31 + unit`) over the UTF-16 code units of `key`, folded into
/// a 32-bit signed integer.
#[must_use]
pub fn string_hash(key: &str) -> i32 {
    key.encode_utf16().fold(0_i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Stable 0..100 bucket of a `(user, flag)` pair.
///
/// The same pair lands in the same bucket in every process and across restarts.
#[must_use]
pub fn bucket(user: &str, flag: &str) -> u32 {
    let mut key = String::with_capacity(user.len() + flag.len());
    key.push_str(user);
    key.push_str(flag);
    string_hash(&key).unsigned_abs() % BUCKETS
}

/// Whether `percentage` admits `bucket`. Non-finite percentages admit nobody.
#[must_use]
pub fn within_percentage(bucket: u32, percentage: f64) -> bool {
    percentage.is_finite() && f64::from(bucket) < percentage
}

/// Evaluates only the rollout strategy of a feature for `ctx`.
///
/// `Manual` is eligible: it is reached through an explicit operator action. A gradual rollout
/// without a percentage admits nobody.
#[must_use]
pub fn is_eligible(strategy: &RolloutStrategy, flag: &str, ctx: &EvaluationContext) -> bool {
    match strategy {
        RolloutStrategy::Immediate | RolloutStrategy::Manual => true,
        RolloutStrategy::Gradual { percentage } => percentage
            .is_some_and(|p| within_percentage(bucket(ctx.bucket_key(), flag), p)),
        RolloutStrategy::Beta { user_groups } => ctx.user_attributes.in_any_group(user_groups),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hash_matches_known_values() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash("ab"), 97 * 31 + 98);
        // wraps instead of overflowing
        let long = "z".repeat(64);
        assert_eq!(string_hash(&long), string_hash(&long));
    }

    #[test]
    fn bucket_concatenates_user_and_flag() {
        assert_eq!(bucket("u1", "dark_mode"), bucket("u1dark", "_mode"));
        assert_eq!(bucket("anonymous", "x"), string_hash("anonymousx").unsigned_abs() % 100);
    }

    #[test]
    fn zero_and_hundred_percent() {
        for i in 0..1_000 {
            let b = bucket(&format!("user-{i}"), "search");
            assert!(!within_percentage(b, 0.0));
            assert!(within_percentage(b, 100.0));
        }
        assert!(!within_percentage(0, f64::NAN));
    }

    #[test]
    fn half_rollout_is_roughly_half() {
        let enabled =
            (0..1_000).filter(|i| within_percentage(bucket(&format!("user-{i}"), "search"), 50.0)).count();
        assert!((350..=650).contains(&enabled), "enabled = {enabled}");
    }

    #[test]
    fn strategy_eligibility() {
        let ctx = EvaluationContext::for_user("u1").with_groups(["beta_testers"]);
        assert!(is_eligible(&RolloutStrategy::Immediate, "f", &ctx));
        assert!(is_eligible(&RolloutStrategy::Manual, "f", &ctx));
        assert!(is_eligible(&RolloutStrategy::beta(["beta_testers"]), "f", &ctx));
        assert!(!is_eligible(&RolloutStrategy::beta(["staff"]), "f", &ctx));
        assert!(!is_eligible(&RolloutStrategy::Gradual { percentage: None }, "f", &ctx));
        assert!(is_eligible(&RolloutStrategy::gradual(100.0), "f", &ctx));
    }

    proptest! {
        #[test]
        fn bucket_is_in_range_and_stable(user in ".{0,40}", flag in "[a-z_]{1,24}") {
            let first = bucket(&user, &flag);
            prop_assert!(first < BUCKETS);
            prop_assert_eq!(first, bucket(&user, &flag));
        }
    }
}
