//! Shared builders for unit tests across the crate.

use std::collections::BTreeMap;

use crate::models::*;

pub fn subject_info() -> SubjectInfo {
    SubjectInfo {
        subject_name: "Data Structures".to_string(),
        subject_code: "CSE201".to_string(),
        syllabus: "UNIT-I Algorithms and recursion. UNIT-II Sorting and hashing.".to_string(),
        course_objectives: "CO1: Interpret searching algorithms. CO2: Implement sorting."
            .to_string(),
    }
}

fn co_split(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
    pairs
        .iter()
        .map(|(name, pct)| (name.to_string(), *pct))
        .collect()
}

fn section_structure(id: &str) -> SectionStructure {
    SectionStructure {
        section_id: id.to_string(),
        section_name: format!("{id} Questions"),
        section_instruction: "Answer any ONE question from this unit".to_string(),
        question_count: 2,
        marks_per_question: 20,
        total_section_marks: 20,
        question_type: "long_answer".to_string(),
        is_compulsory: false,
        has_internal_choice: true,
        internal_choice_format: "1a/1b - student picks ONE complete question".to_string(),
        questions_to_answer: 1,
        observed_topics: vec!["Recursion".to_string(), "Searching".to_string()],
        question_style_distribution: StyleSplit {
            numerical_problems: 60,
            theoretical: 30,
            mixed: 10,
        },
        difficulty_distribution: DifficultySplit {
            easy: 25,
            medium: 55,
            hard: 20,
        },
        bloom_distribution: BloomSplit {
            remember: 10,
            understand: 20,
            apply: 50,
            analyze: 20,
            evaluate: 0,
            create: 0,
        },
        co_distribution: co_split(&[("CO1", 70), ("CO2", 30)]),
    }
}

pub fn compatible_analysis() -> StructureAnalysis {
    StructureAnalysis {
        are_compatible: true,
        compatibility_reason: "Both papers share the two-unit internal-choice layout".to_string(),
        compatibility_score: 85,
        subject_analysis: SubjectAnalysis {
            subject_name: "Data Structures".to_string(),
            syllabus_coverage: SyllabusCoverage {
                total_topics_in_syllabus: 10,
                sample_topic_count: 4,
                sample_coverage_percentage: 40,
                uncovered_topics_in_samples: vec![
                    "Hashing".to_string(),
                    "Graphs".to_string(),
                ],
                topics_in_sample_papers: vec![
                    "Recursion".to_string(),
                    "Searching".to_string(),
                    "Sorting".to_string(),
                    "Stacks".to_string(),
                ],
                full_syllabus_topics: vec![
                    "Recursion".to_string(),
                    "Searching".to_string(),
                    "Sorting".to_string(),
                    "Hashing".to_string(),
                    "Stacks".to_string(),
                    "Queues".to_string(),
                    "Linked Lists".to_string(),
                    "Trees".to_string(),
                    "Graphs".to_string(),
                    "Complexity".to_string(),
                ],
            },
            question_style_analysis: QuestionStyleAnalysis {
                numerical_problems_percentage: 40,
                theoretical_questions_percentage: 50,
                mixed_questions_percentage: 10,
                internal_choice_pattern: "1a/1b format in each section".to_string(),
                typical_question_formats: vec![
                    "Define and illustrate...".to_string(),
                    "Trace the algorithm on...".to_string(),
                ],
            },
            co_alignment: CoAlignment {
                total_cos: 2,
                cos_covered_in_samples: vec!["CO1".to_string(), "CO2".to_string()],
                co_distribution_observed: co_split(&[("CO1", 60), ("CO2", 40)]),
                co_alignment_score: 80,
            },
        },
        common_structure: CommonStructure {
            exam_info: ExamInfo {
                exam_type: "midterm_exam".to_string(),
                subject_name: "Data Structures".to_string(),
                total_marks: 40,
                exam_duration_minutes: 120,
                total_questions: 4,
                instruction_text: "Answer any ONE question from each unit".to_string(),
            },
            sections: vec![section_structure("UNIT-I"), section_structure("UNIT-II")],
            overall_distributions: OverallDistributions {
                difficulty_distribution: DifficultySplit {
                    easy: 25,
                    medium: 55,
                    hard: 20,
                },
                bloom_distribution: BloomSplit {
                    remember: 10,
                    understand: 20,
                    apply: 50,
                    analyze: 20,
                    evaluate: 0,
                    create: 0,
                },
                co_distribution: co_split(&[("CO1", 60), ("CO2", 40)]),
                question_type_distribution: StyleSplit {
                    numerical_problems: 40,
                    theoretical: 50,
                    mixed: 10,
                },
            },
        },
        generation_ready: GenerationReadiness {
            can_generate: true,
            generation_confidence: 85,
            recommended_adjustments: vec!["Cover hashing and graphs".to_string()],
            full_syllabus_utilization: "ready to use complete syllabus".to_string(),
        },
    }
}

pub fn incompatible_analysis() -> StructureAnalysis {
    let mut analysis = compatible_analysis();
    analysis.are_compatible = false;
    analysis.compatibility_score = 20;
    analysis.compatibility_reason =
        "Paper 1 is a two-unit internal-choice exam, paper 2 is a 60-question objective quiz"
            .to_string();
    analysis
}

pub fn calibration_form() -> CalibrationForm {
    CalibrationForm::prefilled_from(&compatible_analysis())
}

pub fn calibrated_structure() -> CalibratedStructure {
    let analysis = compatible_analysis();
    let mut form = calibration_form();
    form.num_papers = 3;
    CalibratedStructure::from_form(form, &analysis)
}

pub fn paper_set_with_difficulties(levels: &[PaperDifficulty]) -> PaperSetResult {
    let papers: Vec<GeneratedPaper> = levels
        .iter()
        .enumerate()
        .map(|(i, level)| GeneratedPaper {
            paper_id: format!("Paper_Set_{}_{}", i + 1, level),
            difficulty_level: *level,
            total_marks: 40,
            exam_duration: 120,
            instructions: "Answer any ONE question from each unit".to_string(),
            sections: vec![PaperSection {
                section_id: "UNIT-I".to_string(),
                section_name: "Unit I Questions".to_string(),
                questions: vec![PaperEntry::Direct(PaperQuestion {
                    question_number: "1".to_string(),
                    question_text: format!(
                        "Trace binary search over a sorted array of {} elements.",
                        8 + i
                    ),
                    visual_aid: None,
                    given_data: Vec::new(),
                    find: None,
                    marks: 20,
                    co: "CO1".to_string(),
                    bloom_level: BloomLevel::Apply,
                    difficulty: Difficulty::Medium,
                    topic: "Searching".to_string(),
                    question_type: QuestionType::Mixed,
                })],
            }],
        })
        .collect();

    PaperSetResult {
        generation_summary: GenerationSummary {
            total_papers_generated: papers.len() as u32,
            unique_questions_created: papers.len() as u32,
            topics_covered: vec!["Searching".to_string()],
            cos_covered: vec!["CO1".to_string()],
            difficulty_progression: "Easy to Hard across papers".to_string(),
            syllabus_utilization: "10% of the syllabus".to_string(),
        },
        generated_papers: papers,
    }
}
