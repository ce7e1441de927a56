//! The three fixed prompt templates behind the pipeline's completion calls.
//!
//! Each system instruction pins the exact JSON contract the caller parses;
//! the user instruction carries the caller's data. Keep the schemas here in
//! lockstep with `models.rs`; the parse boundary rejects anything else.

use crate::models::{CalibratedStructure, PaperDifficulty, PaperText, SubjectInfo};

pub const STRUCTURE_ANALYSIS_SYSTEM: &str = r#"You are an expert educational assessment analyst. You are given two sample question papers (OCR text), the complete subject syllabus, and the course objectives (COs). Your job is to EXTRACT the exact structural patterns the sample papers follow, and to map the samples against the FULL syllabus scope so that later generation can cover the whole syllabus.

Analyze:
1. Structural compatibility of the two papers and format consistency
2. Exact question style distribution observed (numerical vs theoretical vs mixed)
3. Internal choice patterns (e.g. "1a/1b, answer exactly one")
4. Bloom's taxonomy distribution as observed
5. Difficulty distribution as observed
6. Topic coverage: sample papers vs the complete syllabus
7. A common structure usable for generating new papers over the FULL syllabus

Respond with ONLY a JSON object in exactly this shape:

{
  "are_compatible": true,
  "compatibility_reason": "detailed explanation",
  "compatibility_score": 85,
  "subject_analysis": {
    "subject_name": "extracted subject name",
    "syllabus_coverage": {
      "total_topics_in_syllabus": 12,
      "sample_topic_count": 6,
      "sample_coverage_percentage": 50,
      "uncovered_topics_in_samples": ["Topic A"],
      "topics_in_sample_papers": ["Topic C"],
      "full_syllabus_topics": ["every topic extracted from the complete syllabus"]
    },
    "question_style_analysis": {
      "numerical_problems_percentage": 65,
      "theoretical_questions_percentage": 25,
      "mixed_questions_percentage": 10,
      "internal_choice_pattern": "1a/1b format in each section",
      "typical_question_formats": ["State and prove...", "Calculate the..."]
    },
    "co_alignment": {
      "total_cos": 4,
      "cos_covered_in_samples": ["CO1", "CO2"],
      "co_distribution_observed": {"CO1": 35, "CO2": 30, "CO3": 25, "CO4": 10},
      "co_alignment_score": 78
    }
  },
  "common_structure": {
    "exam_info": {
      "exam_type": "midterm_exam",
      "subject_name": "Engineering Mechanics",
      "total_marks": 40,
      "exam_duration_minutes": 120,
      "total_questions": 8,
      "instruction_text": "Answer any ONE question from each unit"
    },
    "sections": [
      {
        "section_id": "UNIT-I",
        "section_name": "Unit I Questions",
        "section_instruction": "Answer any ONE question from this unit",
        "question_count": 2,
        "marks_per_question": 20,
        "total_section_marks": 20,
        "question_type": "long_answer",
        "is_compulsory": false,
        "has_internal_choice": true,
        "internal_choice_format": "1a/1b - student picks ONE complete question",
        "questions_to_answer": 1,
        "observed_topics": ["Statics"],
        "question_style_distribution": {"numerical_problems": 70, "theoretical": 20, "mixed": 10},
        "difficulty_distribution": {"easy": 20, "medium": 60, "hard": 20},
        "bloom_distribution": {"Remember": 10, "Understand": 20, "Apply": 50, "Analyze": 20, "Evaluate": 0, "Create": 0},
        "co_distribution": {"CO1": 70, "CO2": 30}
      }
    ],
    "overall_distributions": {
      "difficulty_distribution": {"easy": 25, "medium": 55, "hard": 20},
      "bloom_distribution": {"Remember": 15, "Understand": 25, "Apply": 35, "Analyze": 25, "Evaluate": 0, "Create": 0},
      "co_distribution": {"CO1": 30, "CO2": 25, "CO3": 25, "CO4": 20},
      "question_type_distribution": {"numerical_problems": 65, "theoretical": 25, "mixed": 10}
    }
  },
  "generation_ready": {
    "can_generate": true,
    "generation_confidence": 85,
    "recommended_adjustments": ["Balance CO4 coverage"],
    "full_syllabus_utilization": "ready to use complete syllabus for topic diversity"
  }
}

Every key shown above is required. All percentage values are integers. Extract the patterns the papers actually exhibit instead of imposing textbook distributions. If the two papers do not share a usable common structure, set "are_compatible" to false and explain why in "compatibility_reason"; still fill every other field with your best reading of the papers."#;

pub const QUESTION_BANK_SYSTEM: &str = r#"You are an expert question bank generator. Create a section-wise pool of exam questions from the calibrated structure you are given.

Requirements:
1. Cover the COMPLETE syllabus topics listed in the calibrated structure, not only the sample-paper topics
2. Respect each section's difficulty, Bloom and course-objective splits
3. Zero duplicated questions anywhere in the bank
4. Numerical problems carry realistic values with units, complete given data and a find-statement
5. Where a question needs a figure, use an ASCII sketch for simple geometries ("type": "ascii") or a precise textual description for complex ones ("type": "description")

Respond with ONLY a JSON object in exactly this shape:

{
  "question_bank": {
    "UNIT-I": [
      {
        "question_id": "U1_Q001",
        "question_text": "A cantilever beam of length 4m carries a point load of 15kN at the free end...",
        "visual_aid": {"type": "ascii", "content": "diagram", "visualization_guide": "how to draw it"},
        "given_data": ["Length L = 4m", "Load P = 15kN"],
        "find": "Maximum deflection and slope",
        "marks": 10,
        "difficulty": "easy",
        "bloom_level": "Apply",
        "co": "CO1",
        "topic": "Deflection of Beams",
        "question_type": "numerical_problem",
        "solution_approach": "Double integration or standard formulas"
      }
    ]
  },
  "bank_summary": {
    "total_questions_generated": 50,
    "questions_per_section": {"UNIT-I": 25, "UNIT-II": 25},
    "difficulty_distribution": {"easy": 40, "medium": 40, "hard": 20},
    "bloom_distribution": {"Remember": 15, "Understand": 25, "Apply": 35, "Analyze": 25, "Evaluate": 0, "Create": 0},
    "co_distribution": {"CO1": 25, "CO2": 25, "CO3": 25, "CO4": 25},
    "question_type_distribution": {"numerical_problems": 60, "theoretical": 30, "mixed": 10},
    "topics_covered": ["every topic that appears in the bank"],
    "syllabus_utilization": "85% of complete syllabus covered"
  }
}

"difficulty" is one of "easy", "medium", "hard". "bloom_level" is one of "Remember", "Understand", "Apply", "Analyze", "Evaluate", "Create". "question_type" is one of "numerical_problem", "theoretical", "mixed". "visual_aid", "given_data", "find" and "solution_approach" may be omitted when a question does not need them; every other key is required."#;

pub const PAPER_SET_SYSTEM: &str = r#"You are an expert question paper generator. Create complete, ready-to-use exam papers from the calibrated structure you are given.

Requirements:
1. Follow the calibrated section structure and marks exactly
2. ZERO duplicated questions across the whole set of papers
3. Use the COMPLETE syllabus topics for coverage, not only sample-paper topics
4. Preserve the internal choice format exactly where a section has it (e.g. "1a"/"1b" where the student answers exactly ONE option); sections without internal choice carry plain questions
5. Follow the requested per-paper difficulty progression exactly
6. Numerical problems carry realistic values with units, complete given data and a find-statement
7. Where a question needs a figure, use an ASCII sketch for simple geometries ("type": "ascii") or a precise textual description for complex ones ("type": "description")

Respond with ONLY a JSON object in exactly this shape:

{
  "generated_papers": [
    {
      "paper_id": "Paper_Set_1_Easy",
      "difficulty_level": "Easy",
      "total_marks": 40,
      "exam_duration": 120,
      "instructions": "Answer any ONE question from each unit",
      "sections": [
        {
          "section_id": "UNIT-I",
          "section_name": "Unit I Questions",
          "questions": [
            {
              "question_group": "1",
              "internal_choice": true,
              "choice_instruction": "Answer any ONE question from this group",
              "options": [
                {
                  "question_number": "1a",
                  "question_text": "A steel cantilever beam AB of length 3m carries...",
                  "visual_aid": {"type": "ascii", "content": "diagram", "visualization_guide": "how to draw it"},
                  "given_data": ["Length L = 3m", "UDL w = 20 kN/m"],
                  "find": "Maximum deflection and slope",
                  "marks": 10,
                  "co": "CO1",
                  "bloom_level": "Apply",
                  "difficulty": "easy",
                  "topic": "a topic from the full syllabus",
                  "question_type": "numerical_problem"
                }
              ]
            }
          ]
        }
      ]
    }
  ],
  "generation_summary": {
    "total_papers_generated": 5,
    "unique_questions_created": 40,
    "topics_covered": ["every topic used across the set"],
    "cos_covered": ["CO1", "CO2"],
    "difficulty_progression": "Easy to Hard across papers",
    "syllabus_utilization": "covered 80% of the complete syllabus"
  }
}

A section without internal choice lists its questions directly in "questions" using the same question object shape (with "question_number" such as "2"), without the group wrapper. "difficulty_level" is one of "Easy", "Easy-Medium", "Medium", "Medium-Hard", "Hard". "difficulty" is one of "easy", "medium", "hard". "bloom_level" is one of "Remember", "Understand", "Apply", "Analyze", "Evaluate", "Create". "question_type" is one of "numerical_problem", "theoretical", "mixed"."#;

/// User instruction for the analysis call: subject data plus both extracted
/// paper texts, delimited so the model can tell them apart.
pub fn structure_analysis_user(
    subject: &SubjectInfo,
    paper1: &PaperText,
    paper2: &PaperText,
) -> String {
    format!(
        "Analyze these question papers against the subject syllabus and course objectives.\n\n\
         SUBJECT: {subject_name}\n\n\
         COMPLETE SYLLABUS (full topic scope):\n{syllabus}\n\n\
         COURSE OBJECTIVES:\n{course_objectives}\n\n\
         PAPER 1 ({file1}) - {len1} characters:\n\
         === OCR EXTRACTED TEXT START ===\n{text1}\n=== OCR EXTRACTED TEXT END ===\n\n\
         PAPER 2 ({file2}) - {len2} characters:\n\
         === OCR EXTRACTED TEXT START ===\n{text2}\n=== OCR EXTRACTED TEXT END ===\n\n\
         Extract the exact format patterns the samples share, compare their topics with the \
         complete syllabus, and produce the common structure for generating papers that follow \
         the sample STRUCTURE but cover the FULL syllabus.",
        subject_name = subject.subject_name,
        syllabus = subject.syllabus,
        course_objectives = subject.course_objectives,
        file1 = paper1.filename,
        len1 = paper1.text_length,
        text1 = paper1.extracted_text,
        file2 = paper2.filename,
        len2 = paper2.text_length,
        text2 = paper2.extracted_text,
    )
}

/// User instruction for question bank generation.
pub fn question_bank_user(calibrated: &CalibratedStructure, questions_per_section: u32) -> String {
    let structure = serde_json::to_string_pretty(calibrated)
        .expect("calibrated structure serializes to JSON");
    format!(
        "Generate a question bank from this calibrated structure:\n\n\
         CALIBRATED STRUCTURE:\n{structure}\n\n\
         REQUIREMENTS:\n\
         - Generate {questions_per_section} questions per section\n\
         - Cover as many topics from the complete syllabus as possible\n\
         - Follow the calibrated difficulty, Bloom and CO splits per section\n\
         - Mix numerical, theoretical and mixed question types per the calibrated style split\n\
         - Zero duplication across the entire bank\n\
         - Every question must be complete and solvable from its own text, given data and visual aid"
    )
}

/// User instruction for paper set generation, spelling out the difficulty of
/// each paper in the set.
pub fn paper_set_user(
    calibrated: &CalibratedStructure,
    num_papers: u32,
    plan: &[PaperDifficulty],
) -> String {
    let structure = serde_json::to_string_pretty(calibrated)
        .expect("calibrated structure serializes to JSON");
    let progression = plan
        .iter()
        .enumerate()
        .map(|(i, level)| format!("- Paper {}: {} level", i + 1, level))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Generate {num_papers} unique question papers from this calibrated structure:\n\n\
         CALIBRATED STRUCTURE:\n{structure}\n\n\
         DIFFICULTY PROGRESSION (exactly this, in order):\n{progression}\n\n\
         REQUIREMENTS:\n\
         - Exactly {num_papers} papers, difficulty labels exactly as listed above\n\
         - Zero question duplication across all papers\n\
         - Use the complete syllabus topics for diversity, not only sample-paper topics\n\
         - Keep the internal choice format exactly as calibrated per section\n\
         - Every question must be complete and solvable from its own text, given data and visual aid"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperText;
    use crate::test_fixtures::{calibrated_structure, subject_info};
    use crate::validate::difficulty_plan;

    fn paper(name: &str, text: &str) -> PaperText {
        PaperText {
            filename: name.to_string(),
            extracted_text: text.to_string(),
            text_length: text.len() as u64,
        }
    }

    #[test]
    fn analysis_user_prompt_embeds_both_papers_and_subject() {
        let subject = subject_info();
        let p1 = paper("mid1.pdf", "1a) Define a stack.");
        let p2 = paper("mid2.pdf", "1a) Define a queue.");
        let prompt = structure_analysis_user(&subject, &p1, &p2);

        assert!(prompt.contains(&subject.subject_name));
        assert!(prompt.contains(&subject.syllabus));
        assert!(prompt.contains("mid1.pdf"));
        assert!(prompt.contains("Define a queue."));
        assert_eq!(prompt.matches("=== OCR EXTRACTED TEXT START ===").count(), 2);
    }

    #[test]
    fn paper_set_user_prompt_lists_the_difficulty_plan() {
        let calibrated = calibrated_structure();
        let plan = difficulty_plan(3);
        let prompt = paper_set_user(&calibrated, 3, &plan);

        assert!(prompt.contains("- Paper 1: Easy level"));
        assert!(prompt.contains("- Paper 2: Medium level"));
        assert!(prompt.contains("- Paper 3: Hard level"));
        assert!(prompt.contains("\"num_papers\": 3") || prompt.contains("Exactly 3 papers"));
    }

    #[test]
    fn bank_user_prompt_carries_the_calibrated_structure() {
        let calibrated = calibrated_structure();
        let prompt = question_bank_user(&calibrated, 25);
        assert!(prompt.contains("25 questions per section"));
        assert!(prompt.contains(&calibrated.sections[0].section_id));
    }
}
