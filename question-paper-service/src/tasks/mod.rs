pub mod analyze;
pub mod calibrate;
pub mod extract;
pub mod generate;

pub use analyze::AnalyzeTask;
pub use calibrate::CalibrateTask;
pub use extract::ExtractTask;
pub use generate::GenerateTask;

/// Stable task ids, used for graph wiring and HTTP stage gating.
pub mod task_ids {
    pub const EXTRACT: &str = "extract";
    pub const ANALYZE: &str = "analyze";
    pub const CALIBRATE: &str = "calibrate";
    pub const GENERATE: &str = "generate";
}

/// Context keys, one per piece of session state.
pub mod session_keys {
    pub const SUBJECT_INFO: &str = "subject_info";
    pub const UPLOADED_PAPERS: &str = "uploaded_papers";
    pub const PAPER_TEXTS: &str = "paper_texts";
    pub const STRUCTURE_ANALYSIS: &str = "structure_analysis";
    pub const CALIBRATION_DEFAULTS: &str = "calibration_defaults";
    pub const CALIBRATION_FORM: &str = "calibration_form";
    pub const CALIBRATED_STRUCTURE: &str = "calibrated_structure";
    pub const CALIBRATION_WARNINGS: &str = "calibration_warnings";
    pub const GENERATION_REQUEST: &str = "generation_request";
    pub const QUESTION_BANK: &str = "question_bank";
    pub const GENERATED_PAPERS: &str = "generated_papers";
    pub const GENERATION_WARNINGS: &str = "generation_warnings";

    /// Everything a pipeline reset clears; subject info survives.
    pub const STAGE_OUTPUTS: [&str; 11] = [
        UPLOADED_PAPERS,
        PAPER_TEXTS,
        STRUCTURE_ANALYSIS,
        CALIBRATION_DEFAULTS,
        CALIBRATION_FORM,
        CALIBRATED_STRUCTURE,
        CALIBRATION_WARNINGS,
        GENERATION_REQUEST,
        QUESTION_BANK,
        GENERATED_PAPERS,
        GENERATION_WARNINGS,
    ];
}
