//! Inspection runner that applies both inspections to a whole model.

use globset::GlobSet;
use tracing::{debug, info};

use crate::config::InspectionConfig;
use crate::model::{CodeModel, FileOrigin};

use super::{ExpensiveApiUsage, ExpensiveTypeUsedInSignature, InspectionResult, ProblemsHolder};

/// Executes the inspections against every project file of a model.
pub struct Runner {
    config: InspectionConfig,
    excluded: GlobSet,
}

impl Runner {
    pub fn new(config: InspectionConfig) -> Self {
        let excluded = config.exclusion_matcher();
        Self { config, excluded }
    }

    pub fn config(&self) -> &InspectionConfig {
        &self.config
    }

    /// Run the usage inspection, then the signature inspection, per file.
    ///
    /// Library files and excluded paths are not inspected. Files are
    /// visited in model order so the output is stable across runs.
    pub fn run<M: CodeModel + ?Sized>(&self, model: &M) -> InspectionResult {
        let mut result = InspectionResult::new();
        let usage = ExpensiveApiUsage::new(&self.config);
        let signature = ExpensiveTypeUsedInSignature::new(self.config.markers());

        for file_id in model.file_ids() {
            let Some(file) = model.file(file_id) else {
                continue;
            };
            if file.origin == FileOrigin::Library || self.excluded.is_match(&file.path) {
                continue;
            }

            let mut holder = ProblemsHolder::new();
            if !usage.check_file(model, file_id, &mut holder) {
                debug!(file = %file.path, "no marker annotation applies, skipping");
                result.skipped += 1;
                continue;
            }
            if self.config.signature_inspection {
                signature.check_file(model, file_id, &mut holder);
            }

            result.analyzed += 1;
            result.problems.extend(holder.into_problems());
        }

        info!(
            analyzed = result.analyzed,
            skipped = result.skipped,
            problems = result.problems.len(),
            "inspection finished"
        );
        result
    }
}
