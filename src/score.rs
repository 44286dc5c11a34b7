use crate::types::{AnswerVector, ScoreResult};

/// Scores a student's answers against the key. A question counts as correct
/// only if both answer vectors are identical, so a blank key question is
/// only matched by a blank student answer. Questions are compared pairwise
/// up to the shorter of the two sequences.
pub fn score_answers(key: &[AnswerVector], student: &[AnswerVector]) -> ScoreResult {
    let per_question = key
        .iter()
        .zip(student)
        .map(|(k, s)| u8::from(k == s))
        .collect::<Vec<u8>>();
    let total = per_question.iter().map(|v| *v as u32).sum();

    ScoreResult {
        total,
        per_question,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn answers(marks: &[Option<usize>], options: usize) -> Vec<AnswerVector> {
        marks
            .iter()
            .map(|mark| match mark {
                Some(index) => AnswerVector::marked(options, *index),
                None => AnswerVector::blank(options),
            })
            .collect()
    }

    #[test]
    fn test_score_two_by_two() {
        let key = answers(&[Some(0), Some(1)], 2);
        let student = answers(&[Some(0), Some(0)], 2);
        assert_eq!(
            score_answers(&key, &student),
            ScoreResult {
                total: 1,
                per_question: vec![1, 0],
            }
        );
    }

    #[test]
    fn test_blank_matches_only_blank() {
        let key = answers(&[None, None], 4);
        let student = answers(&[None, Some(3)], 4);
        assert_eq!(score_answers(&key, &student).per_question, vec![1, 0]);
    }

    fn marks_strategy() -> impl Strategy<Value = (Vec<Option<usize>>, Vec<Option<usize>>)> {
        (1usize..40).prop_flat_map(|questions| {
            (
                prop::collection::vec(prop::option::of(0usize..4), questions),
                prop::collection::vec(prop::option::of(0usize..4), questions),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_self_match_is_perfect((key, _) in marks_strategy()) {
            let key = answers(&key, 4);
            let result = score_answers(&key, &key);
            prop_assert_eq!(result.total as usize, key.len());
            prop_assert!(result.per_question.iter().all(|v| *v == 1));
        }

        #[test]
        fn prop_score_counts_agreements((key, student) in marks_strategy()) {
            let disagreements = key.iter().zip(&student).filter(|(k, s)| k != s).count();
            let key = answers(&key, 4);
            let student = answers(&student, 4);

            let result = score_answers(&key, &student);
            prop_assert_eq!(result.total as usize, key.len() - disagreements);
            prop_assert_eq!(result.per_question.len(), key.len());
            prop_assert_eq!(result, score_answers(&student, &key));
        }
    }
}
