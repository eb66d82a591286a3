//! Due-date scheduling.
//!
//! A question's `status` is the minimum number of whole days that must
//! pass since it was last shown before it comes up again. These functions
//! are pure over snapshots of store data so they can run concurrently
//! from any number of readers.

use chrono::NaiveDate;
use rand::Rng;

use crate::store::Question;

/// Whether a question should be shown on `today`.
///
/// A question that has never been shown is always due. Otherwise it is
/// due once the whole-day gap since `last_shown_date` reaches `status`;
/// a gap of exactly `status` days counts as due.
pub fn is_due(question: &Question, today: NaiveDate) -> bool {
    match question.last_shown() {
        None => true,
        Some(last_shown) => (today - last_shown).num_days() >= question.status,
    }
}

/// Filter a snapshot of questions down to the ones due on `today`.
/// No ordering is guaranteed beyond the input order.
pub fn due_questions(questions: &[Question], today: NaiveDate) -> Vec<&Question> {
    questions.iter().filter(|q| is_due(q, today)).collect()
}

/// Pick one uniformly-random due question, or `None` when nothing is due.
pub fn pick_random_due<'a, R: Rng>(
    questions: &'a [Question],
    today: NaiveDate,
    rng: &mut R,
) -> Option<&'a Question> {
    let due = due_questions(questions, today);
    if due.is_empty() {
        None
    } else {
        Some(due[rng.gen_range(0..due.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn question(status: i64, last_shown: &str) -> Question {
        Question {
            question_id: 0,
            set_id: 1,
            content: "q".into(),
            status,
            last_shown_date: last_shown.into(),
        }
    }

    #[test]
    fn never_shown_is_always_due() {
        let q = question(50, "");
        assert!(is_due(&q, date(2024, 1, 1)));
        assert!(is_due(&q, date(1990, 6, 15)));
    }

    #[test]
    fn due_exactly_at_status_days() {
        let q = question(3, "2024-01-01");
        assert!(!is_due(&q, date(2024, 1, 2)));
        assert!(!is_due(&q, date(2024, 1, 3)));
        // Inclusive boundary: a gap of exactly `status` days is due
        assert!(is_due(&q, date(2024, 1, 4)));
        assert!(is_due(&q, date(2024, 2, 1)));
    }

    #[test]
    fn unparseable_last_shown_counts_as_never_shown() {
        let q = question(3, "garbage");
        assert!(is_due(&q, date(2024, 1, 1)));
    }

    #[test]
    fn due_questions_filters_snapshot() {
        let today = date(2024, 1, 10);
        let questions = vec![
            question(1, "2024-01-09"),
            question(5, "2024-01-09"),
            question(2, ""),
        ];
        let due = due_questions(&questions, today);
        assert_eq!(due.len(), 2);
        assert!(due.iter().all(|q| is_due(q, today)));
    }

    #[test]
    fn pick_random_due_returns_none_when_nothing_due() {
        let mut rng = StdRng::seed_from_u64(1);
        let questions = vec![question(10, "2024-01-09")];
        assert!(pick_random_due(&questions, date(2024, 1, 10), &mut rng).is_none());
    }

    #[test]
    fn pick_random_due_covers_all_due_questions() {
        let today = date(2024, 1, 10);
        let mut questions: Vec<Question> = (0..4).map(|_| question(1, "")).collect();
        for (i, q) in questions.iter_mut().enumerate() {
            q.question_id = i as i64;
        }

        let mut rng = StdRng::seed_from_u64(42);
        let mut seen: HashMap<i64, usize> = HashMap::new();
        for _ in 0..400 {
            let picked = pick_random_due(&questions, today, &mut rng).unwrap();
            *seen.entry(picked.question_id).or_default() += 1;
        }
        // Every due question shows up over many draws
        assert_eq!(seen.len(), 4);
        assert!(seen.values().all(|&count| count > 50));
    }
}
