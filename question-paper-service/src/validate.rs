//! Computational checks on calibration input and generated content.
//!
//! The model is asked for structural guarantees (paper count, difficulty
//! progression, zero duplication); the first two are verified here as hard
//! errors, duplication and count drift come back as advisory warnings.
//! Percentage-sum checks on calibration are always advisory.

use std::collections::HashMap;
use thiserror::Error;

use crate::models::{CalibrationForm, PaperDifficulty, PaperSetResult, QuestionBankResult};

/// Structural violations that make a generated paper set unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaperSetViolation {
    #[error("requested {requested} papers, model returned {returned}")]
    PaperCount { requested: u32, returned: usize },

    #[error("difficulty regresses at paper {index}: {current} after {previous}")]
    DifficultyRegression {
        index: usize,
        previous: PaperDifficulty,
        current: PaperDifficulty,
    },
}

/// Difficulty label for paper `i` of `n`, spread monotonically across the
/// five labels. A single paper sits in the middle.
pub fn difficulty_plan(num_papers: u32) -> Vec<PaperDifficulty> {
    let ladder = PaperDifficulty::LADDER;
    match num_papers {
        0 => Vec::new(),
        1 => vec![PaperDifficulty::Medium],
        n => (0..n as usize)
            .map(|i| ladder[i * (ladder.len() - 1) / (n as usize - 1)])
            .collect(),
    }
}

/// Advisory warnings for percentage splits that do not sum to 100. The
/// submission is accepted either way and the values are stored as given.
pub fn distribution_warnings(form: &CalibrationForm) -> Vec<String> {
    let mut warnings = Vec::new();

    for section in &form.sections {
        let difficulty = section.difficulty_distribution.total();
        if difficulty != 100 {
            warnings.push(format!(
                "section {}: difficulty split sums to {difficulty}%, not 100%",
                section.section_id
            ));
        }
        let bloom = section.bloom_distribution.total();
        if bloom != 100 {
            warnings.push(format!(
                "section {}: Bloom split sums to {bloom}%, not 100%",
                section.section_id
            ));
        }
        let style = section.question_style_distribution.total();
        if style != 100 {
            warnings.push(format!(
                "section {}: question style split sums to {style}%, not 100%",
                section.section_id
            ));
        }
    }

    let co_total: u32 = form.co_distribution.values().sum();
    if co_total != 100 {
        warnings.push(format!(
            "overall CO split sums to {co_total}%, not 100%"
        ));
    }

    warnings
}

/// Verify a generated paper set against the request.
///
/// Wrong paper count or a non-monotonic difficulty progression rejects the
/// set; everything else comes back as warnings.
pub fn verify_paper_set(
    result: &PaperSetResult,
    requested: u32,
) -> Result<Vec<String>, PaperSetViolation> {
    let papers = &result.generated_papers;
    if papers.len() != requested as usize {
        return Err(PaperSetViolation::PaperCount {
            requested,
            returned: papers.len(),
        });
    }

    for (index, pair) in papers.windows(2).enumerate() {
        if pair[1].difficulty_level < pair[0].difficulty_level {
            return Err(PaperSetViolation::DifficultyRegression {
                index: index + 1,
                previous: pair[0].difficulty_level,
                current: pair[1].difficulty_level,
            });
        }
    }

    let mut warnings = Vec::new();

    let texts = papers.iter().flat_map(|paper| {
        paper
            .sections
            .iter()
            .flat_map(|section| section.questions.iter())
            .flat_map(|entry| entry.questions())
            .map(|question| question.question_text.as_str())
    });
    warnings.extend(duplicate_warnings(texts));

    let claimed = result.generation_summary.total_papers_generated;
    if claimed as usize != papers.len() {
        warnings.push(format!(
            "summary claims {claimed} papers but the set holds {}",
            papers.len()
        ));
    }

    Ok(warnings)
}

/// Advisory warnings on a generated question bank: duplicated questions,
/// sections that missed their target count, summary drift.
pub fn verify_question_bank(result: &QuestionBankResult, requested_per_section: u32) -> Vec<String> {
    let mut warnings = Vec::new();

    let texts = result
        .question_bank
        .values()
        .flatten()
        .map(|question| question.question_text.as_str());
    warnings.extend(duplicate_warnings(texts));

    for (section_id, questions) in &result.question_bank {
        if questions.len() != requested_per_section as usize {
            warnings.push(format!(
                "section {section_id}: requested {requested_per_section} questions, generated {}",
                questions.len()
            ));
        }
    }

    let actual_total: usize = result.question_bank.values().map(Vec::len).sum();
    let claimed = result.bank_summary.total_questions_generated;
    if claimed as usize != actual_total {
        warnings.push(format!(
            "summary claims {claimed} questions but the bank holds {actual_total}"
        ));
    }

    warnings
}

fn duplicate_warnings<'a>(texts: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, u32> = HashMap::new();
    for text in texts {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            continue;
        }
        *seen.entry(normalized).or_insert(0) += 1;
    }

    let mut warnings: Vec<String> = seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(text, count)| {
            let preview: String = text.chars().take(60).collect();
            format!("question appears {count} times: \"{preview}\"")
        })
        .collect();
    warnings.sort();
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use crate::test_fixtures::{calibration_form, paper_set_with_difficulties};

    #[test]
    fn difficulty_plan_is_monotonic_for_all_supported_counts() {
        for n in 1..=10 {
            let plan = difficulty_plan(n);
            assert_eq!(plan.len(), n as usize);
            for pair in plan.windows(2) {
                assert!(pair[0] <= pair[1], "plan for {n} papers regresses");
            }
        }
    }

    #[test]
    fn difficulty_plan_spans_easy_to_hard() {
        assert_eq!(difficulty_plan(1), vec![PaperDifficulty::Medium]);
        assert_eq!(
            difficulty_plan(2),
            vec![PaperDifficulty::Easy, PaperDifficulty::Hard]
        );
        assert_eq!(difficulty_plan(5), PaperDifficulty::LADDER.to_vec());
    }

    #[test]
    fn sum_90_split_warns_but_keeps_literal_values() {
        let mut form = calibration_form();
        form.sections[0].difficulty_distribution = DifficultySplit {
            easy: 30,
            medium: 30,
            hard: 30,
        };

        let warnings = distribution_warnings(&form);
        assert!(
            warnings
                .iter()
                .any(|w| w.contains("difficulty split sums to 90%"))
        );
        // The split itself is untouched
        assert_eq!(form.sections[0].difficulty_distribution.total(), 90);
    }

    #[test]
    fn sum_100_split_produces_no_warnings() {
        assert!(distribution_warnings(&calibration_form()).is_empty());
    }

    #[test]
    fn paper_count_mismatch_is_rejected() {
        let set = paper_set_with_difficulties(&[PaperDifficulty::Easy, PaperDifficulty::Hard]);
        let violation = verify_paper_set(&set, 3).unwrap_err();
        assert_eq!(
            violation,
            PaperSetViolation::PaperCount {
                requested: 3,
                returned: 2
            }
        );
    }

    #[test]
    fn difficulty_regression_is_rejected() {
        let set = paper_set_with_difficulties(&[
            PaperDifficulty::Easy,
            PaperDifficulty::Medium,
            PaperDifficulty::EasyMedium,
        ]);
        let violation = verify_paper_set(&set, 3).unwrap_err();
        assert!(matches!(
            violation,
            PaperSetViolation::DifficultyRegression { index: 2, .. }
        ));
    }

    #[test]
    fn monotonic_set_with_repeated_labels_passes() {
        let set = paper_set_with_difficulties(&[
            PaperDifficulty::Easy,
            PaperDifficulty::Easy,
            PaperDifficulty::Hard,
        ]);
        assert!(verify_paper_set(&set, 3).is_ok());
    }

    #[test]
    fn duplicate_questions_across_papers_warn() {
        let mut set =
            paper_set_with_difficulties(&[PaperDifficulty::Easy, PaperDifficulty::Hard]);
        let repeated = "Calculate the reaction forces at both supports.".to_string();
        for paper in &mut set.generated_papers {
            for section in &mut paper.sections {
                for entry in &mut section.questions {
                    if let PaperEntry::Direct(question) = entry {
                        question.question_text = repeated.clone();
                    }
                }
            }
        }
        set.generation_summary.total_papers_generated = 2;

        let warnings = verify_paper_set(&set, 2).unwrap();
        assert!(warnings.iter().any(|w| w.contains("appears 2 times")));
    }

    #[test]
    fn bank_section_shortfall_warns() {
        let bank = QuestionBankResult {
            question_bank: [(
                "UNIT-I".to_string(),
                vec![BankQuestion {
                    question_id: "U1_Q001".to_string(),
                    question_text: "Define a stack.".to_string(),
                    visual_aid: None,
                    given_data: Vec::new(),
                    find: None,
                    marks: 2,
                    difficulty: Difficulty::Easy,
                    bloom_level: BloomLevel::Remember,
                    co: "CO3".to_string(),
                    topic: "Stacks".to_string(),
                    question_type: QuestionType::Theoretical,
                    solution_approach: None,
                }],
            )]
            .into_iter()
            .collect(),
            bank_summary: BankSummary {
                total_questions_generated: 1,
                questions_per_section: [("UNIT-I".to_string(), 1)].into_iter().collect(),
                difficulty_distribution: DifficultySplit {
                    easy: 100,
                    medium: 0,
                    hard: 0,
                },
                bloom_distribution: BloomSplit {
                    remember: 100,
                    understand: 0,
                    apply: 0,
                    analyze: 0,
                    evaluate: 0,
                    create: 0,
                },
                co_distribution: [("CO3".to_string(), 100)].into_iter().collect(),
                question_type_distribution: StyleSplit {
                    numerical_problems: 0,
                    theoretical: 100,
                    mixed: 0,
                },
                topics_covered: vec!["Stacks".to_string()],
                syllabus_utilization: "5%".to_string(),
            },
        };

        let warnings = verify_question_bank(&bank, 25);
        assert!(
            warnings
                .iter()
                .any(|w| w.contains("requested 25 questions, generated 1"))
        );
    }
}
