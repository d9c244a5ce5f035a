// SPDX-License-Identifier: GPL-3.0-or-later
use reprise_config::AppConfig;
pub mod classifier;
pub mod engine;
pub mod report;
pub mod sources;

pub use classifier::{classify, ExactMatchClassifier, MatchClassifier};
pub use engine::{
    DestinationSearch, ReconciliationEngine, ReconciliationError, ReconciliationReport,
    SourceLibrary,
};
pub use report::ReportPresenter;

use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn on_start(&self) {
        info!(
            target: "application",
            result_limit = self.config.reconciliation.result_limit,
            page_size = self.config.reconciliation.page_size,
            "application state initialized"
        );
    }
}
