//! Diagnosis entry point — wires together aggregation, bootstrap, assembly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use designlab_core::diagnosand::DiagnosandSpec;
use designlab_core::fingerprint::DiagnosisFingerprint;
use designlab_core::schema;
use designlab_core::table::Table;
use designlab_core::value::Value;

use crate::aggregate::{aggregate, AggregationError};
use crate::assemble::{assemble, simulation_counts};
use crate::bootstrap::{bootstrap_diagnosands, BootstrapConfig, ResamplingError};
use crate::config::DiagnosisConfig;
use crate::executor::{RayonExecutor, SequentialExecutor};

/// Current schema version for persisted diagnoses.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from a diagnosis run.
#[derive(Debug, Error)]
pub enum DiagnosisError {
    #[error(
        "simulations table carries neither an '{}' nor an '{}' column; nothing identifies what was estimated",
        schema::ESTIMAND,
        schema::ESTIMATOR
    )]
    MissingIdentifyingColumns,
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error(transparent)]
    Resampling(#[from] ResamplingError),
}

/// Complete result of one diagnosis run. Constructed once, then read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub fingerprint: DiagnosisFingerprint,
    /// The simulations table the diagnosis ran on.
    pub simulations: Table,
    /// Final diagnosand table (keys, counts, statistics, standard errors).
    pub diagnosands: Table,
    /// Statistic names in output order.
    pub diagnosand_names: Vec<String>,
    /// Grouping columns actually used.
    pub group_by: Vec<String>,
    /// Design parameters, if supplied.
    pub parameters: Option<Table>,
    /// Concatenated bootstrap replicate tables, when bootstrapping ran.
    pub replicates: Option<Table>,
    /// Configured replicate count; 0 signals bootstrapping was disabled.
    pub bootstrap_replicates: usize,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Diagnose a research design from its simulations table.
///
/// `parameters` is an optional one-row-per-design metadata table merged in
/// by design identifier. With `config.bootstrap_replicates == 0` the
/// bootstrap is skipped and the output carries no standard-error columns.
pub fn diagnose(
    simulations: &Table,
    parameters: Option<&Table>,
    spec: &DiagnosandSpec,
    config: &DiagnosisConfig,
) -> Result<Diagnosis, DiagnosisError> {
    if !schema::identifying_columns_present(simulations) {
        return Err(DiagnosisError::MissingIdentifyingColumns);
    }

    let group_by = schema::effective_group_by(simulations, &config.extra_group_by);
    let point = aggregate(simulations, spec, &group_by)?;

    let bootstrap = if config.bootstrap_replicates > 0 {
        let bootstrap_config = BootstrapConfig {
            n_replicates: config.bootstrap_replicates,
            seed: config.seed,
        };
        let output = if config.parallel {
            bootstrap_diagnosands(
                simulations,
                spec,
                &group_by,
                &point,
                &bootstrap_config,
                &RayonExecutor,
            )?
        } else {
            bootstrap_diagnosands(
                simulations,
                spec,
                &group_by,
                &point,
                &bootstrap_config,
                &SequentialExecutor,
            )?
        };
        Some(output)
    } else {
        None
    };

    let counts = simulation_counts(simulations, &point.key_columns);
    let diagnosands = assemble(&point, bootstrap.as_ref(), &counts, parameters);

    let fingerprint = DiagnosisFingerprint::new(
        simulations.columns(),
        simulations.n_rows(),
        distinct_draws(simulations),
        &group_by,
        config.bootstrap_replicates,
        config.seed,
    );

    Ok(Diagnosis {
        schema_version: SCHEMA_VERSION,
        fingerprint,
        simulations: simulations.clone(),
        diagnosands,
        diagnosand_names: point.stat_columns,
        group_by,
        parameters: parameters.cloned(),
        replicates: bootstrap.map(|b| b.replicates),
        bootstrap_replicates: config.bootstrap_replicates,
    })
}

/// Number of distinct simulation draws (0 when the cluster column is absent).
fn distinct_draws(simulations: &Table) -> usize {
    match simulations.column(schema::SIM_ID) {
        Some(ids) => {
            let distinct: std::collections::HashSet<&Value> = ids.into_iter().collect();
            distinct.len()
        }
        None => 0,
    }
}
