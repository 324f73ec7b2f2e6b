//! Answer scoring.
//!
//! Pure functions from (correctness, latency, streak, multipliers) to
//! points. The room task is the only caller; keeping this free of any
//! room state makes invariant I1 checkable: replaying the accepted-answer
//! ledger through [`score_answer`] must reproduce the leaderboard.

/// Points for an instant correct answer before multipliers.
const MAX_BASE_POINTS: f64 = 1000.0;

/// The outcome of scoring one answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerScore {
    pub points: u32,
    pub new_streak: u32,
    /// The streak multiplier that was applied (1.0 for streaks below 3).
    pub streak_multiplier: f64,
}

/// Streak bonus: x1.5 from the third consecutive correct answer, x2 from
/// the fifth.
pub fn streak_multiplier(streak: u32) -> f64 {
    if streak >= 5 {
        2.0
    } else if streak >= 3 {
        1.5
    } else {
        1.0
    }
}

/// Scores a single answer.
///
/// `latency_fraction` is elapsed time over the question time limit; values
/// outside [0, 1] are clamped. A timeout is not an answer -- callers reset
/// the streak themselves for players who never answered.
pub fn score_answer(
    correct: bool,
    latency_fraction: f64,
    previous_streak: u32,
    player_multiplier: f64,
    is_bonus: bool,
) -> AnswerScore {
    if !correct {
        return AnswerScore {
            points: 0,
            new_streak: 0,
            streak_multiplier: 1.0,
        };
    }

    let fraction = latency_fraction.clamp(0.0, 1.0);
    let base = (MAX_BASE_POINTS * (1.0 - 0.5 * fraction)).round();
    let new_streak = previous_streak + 1;
    let streak_mul = streak_multiplier(new_streak);
    let bonus_mul = if is_bonus { 2.0 } else { 1.0 };
    // base is in [500, 1000] and multipliers cap at 2.0 each, so the
    // product always fits u32.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let points = (base * player_multiplier * streak_mul * bonus_mul).round() as u32;

    AnswerScore {
        points,
        new_streak,
        streak_multiplier: streak_mul,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base_points_by_latency() {
        // f=0 -> 1000, f=0.2 -> 900, f=0.5 -> 750, f=1 -> 500
        assert_eq!(score_answer(true, 0.0, 0, 1.0, false).points, 1000);
        assert_eq!(score_answer(true, 0.2, 0, 1.0, false).points, 900);
        assert_eq!(score_answer(true, 0.5, 0, 1.0, false).points, 750);
        assert_eq!(score_answer(true, 1.0, 0, 1.0, false).points, 500);
    }

    #[test]
    fn test_incorrect_scores_zero_and_resets_streak() {
        let score = score_answer(false, 0.1, 4, 2.0, true);
        assert_eq!(score.points, 0);
        assert_eq!(score.new_streak, 0);
        assert_eq!(score.streak_multiplier, 1.0);
    }

    #[test]
    fn test_latency_fraction_is_clamped() {
        assert_eq!(
            score_answer(true, -0.5, 0, 1.0, false).points,
            score_answer(true, 0.0, 0, 1.0, false).points
        );
        assert_eq!(
            score_answer(true, 1.7, 0, 1.0, false).points,
            score_answer(true, 1.0, 0, 1.0, false).points
        );
    }

    #[test]
    fn test_streak_multiplier_thresholds() {
        assert_eq!(streak_multiplier(0), 1.0);
        assert_eq!(streak_multiplier(2), 1.0);
        assert_eq!(streak_multiplier(3), 1.5);
        assert_eq!(streak_multiplier(4), 1.5);
        assert_eq!(streak_multiplier(5), 2.0);
        assert_eq!(streak_multiplier(12), 2.0);
    }

    #[test]
    fn test_streak_progression_three_in_a_row() {
        // Three instant correct answers: 1000, 1000, 1500.
        let first = score_answer(true, 0.0, 0, 1.0, false);
        assert_eq!((first.points, first.new_streak), (1000, 1));
        let second = score_answer(true, 0.0, first.new_streak, 1.0, false);
        assert_eq!((second.points, second.new_streak), (1000, 2));
        let third = score_answer(true, 0.0, second.new_streak, 1.0, false);
        assert_eq!((third.points, third.new_streak), (1500, 3));
    }

    #[test]
    fn test_streak_resets_then_scores_base_again() {
        // Wrong answer on a 3-streak, then correct: back to 1000.
        let wrong = score_answer(false, 0.0, 3, 1.0, false);
        assert_eq!(wrong.new_streak, 0);
        let next = score_answer(true, 0.0, wrong.new_streak, 1.0, false);
        assert_eq!(next.points, 1000);
    }

    #[test]
    fn test_bonus_doubles_base() {
        // f=0.5 on a bonus question: 750 * 2 = 1500.
        let score = score_answer(true, 0.5, 0, 1.0, true);
        assert_eq!(score.points, 1500);
    }

    #[test]
    fn test_double_points_power_up() {
        // Player multiplier 2.0 at f=0: 2000.
        let score = score_answer(true, 0.0, 0, 2.0, false);
        assert_eq!(score.points, 2000);
    }

    #[test]
    fn test_multipliers_compose() {
        // streak 5 (x2), bonus (x2), double points (x2) at f=1: 500*8 = 4000.
        let score = score_answer(true, 1.0, 4, 2.0, true);
        assert_eq!(score.new_streak, 5);
        assert_eq!(score.points, 4000);
    }

    proptest! {
        #[test]
        fn prop_correct_points_within_bounds(
            fraction in -1.0f64..2.0,
            streak in 0u32..20,
            doubled in proptest::bool::ANY,
            bonus in proptest::bool::ANY,
        ) {
            let multiplier = if doubled { 2.0 } else { 1.0 };
            let score = score_answer(true, fraction, streak, multiplier, bonus);
            // 500 at the slowest, 1000 * 2 * 2 * 2 at the fastest.
            prop_assert!(score.points >= 500);
            prop_assert!(score.points <= 8000);
            prop_assert_eq!(score.new_streak, streak + 1);
        }

        #[test]
        fn prop_faster_answers_never_score_less(
            fast in 0.0f64..=1.0,
            slow in 0.0f64..=1.0,
            streak in 0u32..20,
        ) {
            prop_assume!(fast <= slow);
            let quick = score_answer(true, fast, streak, 1.0, false);
            let late = score_answer(true, slow, streak, 1.0, false);
            prop_assert!(quick.points >= late.points);
        }
    }
}
