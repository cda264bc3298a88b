//! Rapport de run avec dégradation contrôlée
//!
//! Les étapes d'export optionnelles n'interrompent pas le run: leurs
//! échecs sont collectés ici et résumés en fin d'exécution.

use std::fmt;

/// Statut global d'un run de conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Toutes les étapes demandées ont réussi
    Success,
    /// Le shapefile est produit mais au moins un export a échoué
    PartialSuccess,
}

/// Étapes d'export rapportées
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepName {
    Zip,
    Geojson,
    Kmz,
    Csv,
    Metadata,
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Zip => "zip",
            Self::Geojson => "geojson",
            Self::Kmz => "kmz",
            Self::Csv => "csv",
            Self::Metadata => "metadata",
        };
        write!(f, "{}", name)
    }
}

/// Résultat d'une étape d'export
#[derive(Debug, Clone, Copy)]
pub struct ExportResult {
    /// Étape concernée
    pub step: StepName,
    /// Vrai si la conversion a abouti
    pub succeeded: bool,
}

/// Rapport complet d'un run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Résultats des étapes exécutées (les étapes non demandées
    /// n'apparaissent pas)
    pub steps: Vec<ExportResult>,
    /// Durée totale du run
    pub duration_secs: f64,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre le résultat d'une étape
    pub fn record(&mut self, step: StepName, succeeded: bool) {
        self.steps.push(ExportResult { step, succeeded });
    }

    /// Statut global du run
    pub fn status(&self) -> RunStatus {
        if self.steps.iter().all(|s| s.succeeded) {
            RunStatus::Success
        } else {
            RunStatus::PartialSuccess
        }
    }

    /// Nombre d'étapes en échec
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| !s.succeeded).count()
    }

    /// Affiche le résumé du run sur stdout
    pub fn print_summary(&self) {
        println!("=== Conversion report ===");
        println!("Duration: {:.2}s", self.duration_secs);
        for result in &self.steps {
            let state = if result.succeeded { "ok" } else { "FAILED" };
            println!("  {:<10} {}", result.step.to_string(), state);
        }
        match self.status() {
            RunStatus::Success => println!("Status: success"),
            RunStatus::PartialSuccess => {
                println!("Status: partial success ({} step(s) failed)", self.failed_steps())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_steps_ok() {
        let mut report = RunReport::new();
        report.record(StepName::Zip, true);
        report.record(StepName::Geojson, true);
        assert_eq!(report.status(), RunStatus::Success);
        assert_eq!(report.failed_steps(), 0);
    }

    #[test]
    fn test_partial_success() {
        let mut report = RunReport::new();
        report.record(StepName::Zip, true);
        report.record(StepName::Kmz, false);
        assert_eq!(report.status(), RunStatus::PartialSuccess);
        assert_eq!(report.failed_steps(), 1);
    }

    #[test]
    fn test_empty_report_is_success() {
        assert_eq!(RunReport::new().status(), RunStatus::Success);
    }
}
