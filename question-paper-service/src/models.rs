use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Operator-entered subject details, captured at session creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub subject_name: String,
    pub subject_code: String,
    pub syllabus: String,
    pub course_objectives: String,
}

/// A sample paper uploaded for extraction, carried through the session
/// context until the OCR call has been made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedPaper {
    pub filename: String,
    pub content_base64: String,
}

impl UploadedPaper {
    pub fn from_bytes(filename: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            filename: filename.into(),
            content_base64: STANDARD.encode(bytes),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.content_base64)
    }
}

/// One record as returned by the extraction endpoint.
///
/// `file_name`, `extracted_text` and `text_length` are required; the status
/// and error fields vary with the endpoint's mood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub file_name: String,
    pub extracted_text: String,
    pub text_length: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OcrResult {
    pub fn status_label(&self) -> &str {
        self.final_status
            .as_deref()
            .or(self.status.as_deref())
            .unwrap_or("unknown")
    }
}

/// Normalized extraction output consumed by the analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperText {
    pub filename: String,
    pub extracted_text: String,
    pub text_length: u64,
}

impl From<OcrResult> for PaperText {
    fn from(result: OcrResult) -> Self {
        Self {
            filename: result.file_name,
            extracted_text: result.extracted_text,
            text_length: result.text_length,
        }
    }
}

// ---------------------------------------------------------------------------
// Distribution splits
// ---------------------------------------------------------------------------

/// Easy/medium/hard percentage split. A total other than 100 is flagged as a
/// warning during calibration, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultySplit {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl DifficultySplit {
    pub fn total(&self) -> u32 {
        self.easy + self.medium + self.hard
    }
}

/// Bloom taxonomy percentage split. The calibration surface only exposes the
/// first four levels, so the last two default to zero on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomSplit {
    #[serde(rename = "Remember")]
    pub remember: u32,
    #[serde(rename = "Understand")]
    pub understand: u32,
    #[serde(rename = "Apply")]
    pub apply: u32,
    #[serde(rename = "Analyze")]
    pub analyze: u32,
    #[serde(rename = "Evaluate", default)]
    pub evaluate: u32,
    #[serde(rename = "Create", default)]
    pub create: u32,
}

impl BloomSplit {
    pub fn total(&self) -> u32 {
        self.remember + self.understand + self.apply + self.analyze + self.evaluate + self.create
    }
}

/// Numerical/theoretical/mixed question style percentage split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSplit {
    pub numerical_problems: u32,
    pub theoretical: u32,
    pub mixed: u32,
}

impl StyleSplit {
    pub fn total(&self) -> u32 {
        self.numerical_problems + self.theoretical + self.mixed
    }
}

// ---------------------------------------------------------------------------
// Structure analysis
// ---------------------------------------------------------------------------

/// Full report produced by the structure-analysis stage. Immutable once
/// stored; calibration copies what it needs into an editable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureAnalysis {
    pub are_compatible: bool,
    pub compatibility_reason: String,
    pub compatibility_score: u32,
    pub subject_analysis: SubjectAnalysis,
    pub common_structure: CommonStructure,
    pub generation_ready: GenerationReadiness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectAnalysis {
    pub subject_name: String,
    pub syllabus_coverage: SyllabusCoverage,
    pub question_style_analysis: QuestionStyleAnalysis,
    pub co_alignment: CoAlignment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyllabusCoverage {
    pub total_topics_in_syllabus: u32,
    pub sample_topic_count: u32,
    pub sample_coverage_percentage: u32,
    pub uncovered_topics_in_samples: Vec<String>,
    pub topics_in_sample_papers: Vec<String>,
    pub full_syllabus_topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionStyleAnalysis {
    pub numerical_problems_percentage: u32,
    pub theoretical_questions_percentage: u32,
    pub mixed_questions_percentage: u32,
    pub internal_choice_pattern: String,
    pub typical_question_formats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoAlignment {
    pub total_cos: u32,
    pub cos_covered_in_samples: Vec<String>,
    pub co_distribution_observed: BTreeMap<String, u32>,
    pub co_alignment_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonStructure {
    pub exam_info: ExamInfo,
    pub sections: Vec<SectionStructure>,
    pub overall_distributions: OverallDistributions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamInfo {
    pub exam_type: String,
    pub subject_name: String,
    pub total_marks: u32,
    pub exam_duration_minutes: u32,
    pub total_questions: u32,
    pub instruction_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionStructure {
    pub section_id: String,
    pub section_name: String,
    pub section_instruction: String,
    pub question_count: u32,
    pub marks_per_question: u32,
    pub total_section_marks: u32,
    pub question_type: String,
    pub is_compulsory: bool,
    pub has_internal_choice: bool,
    pub internal_choice_format: String,
    pub questions_to_answer: u32,
    pub observed_topics: Vec<String>,
    pub question_style_distribution: StyleSplit,
    pub difficulty_distribution: DifficultySplit,
    pub bloom_distribution: BloomSplit,
    pub co_distribution: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallDistributions {
    pub difficulty_distribution: DifficultySplit,
    pub bloom_distribution: BloomSplit,
    pub co_distribution: BTreeMap<String, u32>,
    pub question_type_distribution: StyleSplit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReadiness {
    pub can_generate: bool,
    pub generation_confidence: u32,
    pub recommended_adjustments: Vec<String>,
    pub full_syllabus_utilization: String,
}

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------

/// Operator-editable generation parameters. Pre-filled from the analysis,
/// submitted back with any overrides applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationForm {
    pub total_marks: u32,
    pub exam_duration_minutes: u32,
    pub instruction_text: String,
    pub num_papers: u32,
    pub sections: Vec<SectionConfig>,
    pub co_distribution: BTreeMap<String, u32>,
}

impl CalibrationForm {
    /// Editable defaults derived from an analysis result.
    pub fn prefilled_from(analysis: &StructureAnalysis) -> Self {
        let structure = &analysis.common_structure;
        Self {
            total_marks: structure.exam_info.total_marks,
            exam_duration_minutes: structure.exam_info.exam_duration_minutes,
            instruction_text: structure.exam_info.instruction_text.clone(),
            num_papers: 5,
            sections: structure
                .sections
                .iter()
                .map(|section| SectionConfig {
                    section_id: section.section_id.clone(),
                    question_count: section.question_count,
                    total_section_marks: section.total_section_marks,
                    has_internal_choice: section.has_internal_choice,
                    internal_choice_format: section.internal_choice_format.clone(),
                    topics_covered: section.observed_topics.clone(),
                    difficulty_distribution: section.difficulty_distribution,
                    bloom_distribution: section.bloom_distribution,
                    question_style_distribution: section.question_style_distribution,
                })
                .collect(),
            co_distribution: structure.overall_distributions.co_distribution.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub section_id: String,
    pub question_count: u32,
    pub total_section_marks: u32,
    pub has_internal_choice: bool,
    pub internal_choice_format: String,
    pub topics_covered: Vec<String>,
    pub difficulty_distribution: DifficultySplit,
    pub bloom_distribution: BloomSplit,
    pub question_style_distribution: StyleSplit,
}

/// The operator-approved contract handed to the generation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedStructure {
    pub exam_info: CalibratedExamInfo,
    pub sections: Vec<SectionConfig>,
    pub overall_distributions: CalibratedDistributions,
    pub generation_params: GenerationParams,
}

impl CalibratedStructure {
    /// Assemble the structure from a submitted form. Values are taken
    /// literally; sum warnings are computed separately and never alter them.
    pub fn from_form(form: CalibrationForm, analysis: &StructureAnalysis) -> Self {
        let coverage = &analysis.subject_analysis.syllabus_coverage;
        let style = &analysis.subject_analysis.question_style_analysis;
        Self {
            exam_info: CalibratedExamInfo {
                subject_name: analysis.common_structure.exam_info.subject_name.clone(),
                total_marks: form.total_marks,
                exam_duration_minutes: form.exam_duration_minutes,
                instruction_text: form.instruction_text,
            },
            sections: form.sections,
            overall_distributions: CalibratedDistributions {
                co_distribution: form.co_distribution.clone(),
            },
            generation_params: GenerationParams {
                num_papers: form.num_papers,
                full_syllabus_topics: coverage.full_syllabus_topics.clone(),
                sample_paper_topics: coverage.topics_in_sample_papers.clone(),
                course_objectives: form.co_distribution.keys().cloned().collect(),
                question_style_patterns: style.typical_question_formats.clone(),
                use_full_syllabus_scope: true,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedExamInfo {
    pub subject_name: String,
    pub total_marks: u32,
    pub exam_duration_minutes: u32,
    pub instruction_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedDistributions {
    pub co_distribution: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub num_papers: u32,
    pub full_syllabus_topics: Vec<String>,
    pub sample_paper_topics: Vec<String>,
    pub course_objectives: Vec<String>,
    pub question_style_patterns: Vec<String>,
    pub use_full_syllabus_scope: bool,
}

// ---------------------------------------------------------------------------
// Generation request and outputs
// ---------------------------------------------------------------------------

/// Operator's choice of what to generate from the calibrated structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationRequest {
    /// A section-wise pool of questions for mix-and-match paper assembly.
    QuestionBank { questions_per_section: u32 },
    /// Complete, ready-to-use papers with a difficulty progression. When
    /// `num_papers` is omitted the calibrated value is used.
    PaperSet {
        #[serde(default)]
        num_papers: Option<u32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BloomLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    NumericalProblem,
    Theoretical,
    Mixed,
}

/// Paper-level difficulty label. Variant order defines the progression used
/// for the monotonicity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PaperDifficulty {
    Easy,
    #[serde(rename = "Easy-Medium")]
    EasyMedium,
    Medium,
    #[serde(rename = "Medium-Hard")]
    MediumHard,
    Hard,
}

impl PaperDifficulty {
    pub const LADDER: [PaperDifficulty; 5] = [
        PaperDifficulty::Easy,
        PaperDifficulty::EasyMedium,
        PaperDifficulty::Medium,
        PaperDifficulty::MediumHard,
        PaperDifficulty::Hard,
    ];
}

impl fmt::Display for PaperDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaperDifficulty::Easy => "Easy",
            PaperDifficulty::EasyMedium => "Easy-Medium",
            PaperDifficulty::Medium => "Medium",
            PaperDifficulty::MediumHard => "Medium-Hard",
            PaperDifficulty::Hard => "Hard",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualAidKind {
    Ascii,
    Description,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualAid {
    #[serde(rename = "type")]
    pub kind: VisualAidKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization_guide: Option<String>,
}

/// Section-wise question pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionBankResult {
    pub question_bank: BTreeMap<String, Vec<BankQuestion>>,
    pub bank_summary: BankSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankQuestion {
    pub question_id: String,
    pub question_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_aid: Option<VisualAid>,
    #[serde(default)]
    pub given_data: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub find: Option<String>,
    pub marks: u32,
    pub difficulty: Difficulty,
    pub bloom_level: BloomLevel,
    pub co: String,
    pub topic: String,
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_approach: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankSummary {
    pub total_questions_generated: u32,
    pub questions_per_section: BTreeMap<String, u32>,
    pub difficulty_distribution: DifficultySplit,
    pub bloom_distribution: BloomSplit,
    pub co_distribution: BTreeMap<String, u32>,
    pub question_type_distribution: StyleSplit,
    pub topics_covered: Vec<String>,
    pub syllabus_utilization: String,
}

/// A full set of generated papers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperSetResult {
    pub generated_papers: Vec<GeneratedPaper>,
    pub generation_summary: GenerationSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPaper {
    pub paper_id: String,
    pub difficulty_level: PaperDifficulty,
    pub total_marks: u32,
    pub exam_duration: u32,
    pub instructions: String,
    pub sections: Vec<PaperSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperSection {
    pub section_id: String,
    pub section_name: String,
    pub questions: Vec<PaperEntry>,
}

/// Either an internal-choice group (the examinee answers exactly one option)
/// or a plain question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaperEntry {
    Choice(ChoiceGroup),
    Direct(PaperQuestion),
}

impl PaperEntry {
    /// All concrete questions under this entry.
    pub fn questions(&self) -> std::slice::Iter<'_, PaperQuestion> {
        match self {
            PaperEntry::Choice(group) => group.options.iter(),
            PaperEntry::Direct(question) => std::slice::from_ref(question).iter(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceGroup {
    pub question_group: String,
    pub internal_choice: bool,
    pub choice_instruction: String,
    pub options: Vec<PaperQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperQuestion {
    pub question_number: String,
    pub question_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_aid: Option<VisualAid>,
    #[serde(default)]
    pub given_data: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub find: Option<String>,
    pub marks: u32,
    pub co: String,
    pub bloom_level: BloomLevel,
    pub difficulty: Difficulty,
    pub topic: String,
    pub question_type: QuestionType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub total_papers_generated: u32,
    pub unique_questions_created: u32,
    pub topics_covered: Vec<String>,
    pub cos_covered: Vec<String>,
    pub difficulty_progression: String,
    pub syllabus_utilization: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_question(number: &str) -> PaperQuestion {
        PaperQuestion {
            question_number: number.to_string(),
            question_text: format!("Derive the expression asked in {number}."),
            visual_aid: None,
            given_data: vec!["L = 4m".to_string()],
            find: Some("Maximum deflection".to_string()),
            marks: 10,
            co: "CO1".to_string(),
            bloom_level: BloomLevel::Apply,
            difficulty: Difficulty::Easy,
            topic: "Deflection of Beams".to_string(),
            question_type: QuestionType::NumericalProblem,
        }
    }

    fn sample_paper_set() -> PaperSetResult {
        PaperSetResult {
            generated_papers: vec![GeneratedPaper {
                paper_id: "Paper_Set_1_Easy".to_string(),
                difficulty_level: PaperDifficulty::Easy,
                total_marks: 40,
                exam_duration: 120,
                instructions: "Answer any ONE question from each unit".to_string(),
                sections: vec![PaperSection {
                    section_id: "UNIT-I".to_string(),
                    section_name: "Unit I Questions".to_string(),
                    questions: vec![
                        PaperEntry::Choice(ChoiceGroup {
                            question_group: "1".to_string(),
                            internal_choice: true,
                            choice_instruction: "Answer any ONE question from this group"
                                .to_string(),
                            options: vec![sample_question("1a"), sample_question("1b")],
                        }),
                        PaperEntry::Direct(sample_question("2")),
                    ],
                }],
            }],
            generation_summary: GenerationSummary {
                total_papers_generated: 1,
                unique_questions_created: 3,
                topics_covered: vec!["Deflection of Beams".to_string()],
                cos_covered: vec!["CO1".to_string()],
                difficulty_progression: "Easy".to_string(),
                syllabus_utilization: "20% of the syllabus".to_string(),
            },
        }
    }

    #[test]
    fn paper_set_json_round_trip_is_lossless() {
        let original = sample_paper_set();
        let json = serde_json::to_string_pretty(&original).unwrap();
        let reparsed: PaperSetResult = serde_json::from_str(&json).unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn paper_entry_distinguishes_choice_groups_from_direct_questions() {
        let set = sample_paper_set();
        let entries = &set.generated_papers[0].sections[0].questions;
        assert!(matches!(entries[0], PaperEntry::Choice(_)));
        assert!(matches!(entries[1], PaperEntry::Direct(_)));
        assert_eq!(entries[0].questions().count(), 2);
        assert_eq!(entries[1].questions().count(), 1);
    }

    #[test]
    fn missing_required_field_is_rejected() {
        // No `are_compatible` key: the parse must fail instead of defaulting
        let raw = serde_json::json!({
            "compatibility_reason": "n/a",
            "compatibility_score": 10
        });
        assert!(serde_json::from_value::<StructureAnalysis>(raw).is_err());

        // A bank question without marks is equally invalid
        let raw = serde_json::json!({
            "question_id": "U1_Q001",
            "question_text": "Define a stack.",
            "difficulty": "easy",
            "bloom_level": "Remember",
            "co": "CO3",
            "topic": "Stacks",
            "question_type": "theoretical"
        });
        assert!(serde_json::from_value::<BankQuestion>(raw).is_err());
    }

    #[test]
    fn paper_difficulty_labels_round_trip_and_order() {
        for (label, level) in [
            ("\"Easy\"", PaperDifficulty::Easy),
            ("\"Easy-Medium\"", PaperDifficulty::EasyMedium),
            ("\"Medium\"", PaperDifficulty::Medium),
            ("\"Medium-Hard\"", PaperDifficulty::MediumHard),
            ("\"Hard\"", PaperDifficulty::Hard),
        ] {
            let parsed: PaperDifficulty = serde_json::from_str(label).unwrap();
            assert_eq!(parsed, level);
            assert_eq!(serde_json::to_string(&level).unwrap(), label);
        }
        assert!(PaperDifficulty::Easy < PaperDifficulty::EasyMedium);
        assert!(PaperDifficulty::MediumHard < PaperDifficulty::Hard);
    }

    #[test]
    fn bloom_split_defaults_upper_levels_on_input() {
        let raw = serde_json::json!({
            "Remember": 10,
            "Understand": 20,
            "Apply": 40,
            "Analyze": 30
        });
        let split: BloomSplit = serde_json::from_value(raw).unwrap();
        assert_eq!(split.evaluate, 0);
        assert_eq!(split.create, 0);
        assert_eq!(split.total(), 100);
    }

    #[test]
    fn calibration_form_prefill_copies_observed_sections() {
        let analysis = crate::test_fixtures::compatible_analysis();
        let form = CalibrationForm::prefilled_from(&analysis);
        assert_eq!(form.sections.len(), analysis.common_structure.sections.len());
        assert_eq!(form.total_marks, analysis.common_structure.exam_info.total_marks);
        assert_eq!(form.num_papers, 5);
        let section = &form.sections[0];
        let observed = &analysis.common_structure.sections[0];
        assert_eq!(section.section_id, observed.section_id);
        assert_eq!(section.difficulty_distribution, observed.difficulty_distribution);
    }
}
