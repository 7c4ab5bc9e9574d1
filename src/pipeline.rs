//! Building an evaluation from configuration

use climeval_core::config::EvaluationConfig;
use climeval_core::errors::{EvalError, EvalResult};
use climeval_core::evaluation::Evaluation;
use climeval_core::loader::LoaderRegistry;
use tracing::info;

/// Load the datasets named in `config` and assemble an evaluation
///
/// The reference request must yield exactly one dataset. Target requests may yield any number
/// of datasets, which are added in request order.
pub fn evaluation_from_config(
    registry: &LoaderRegistry,
    config: EvaluationConfig,
) -> EvalResult<Evaluation> {
    let request = config.reference.as_ref().ok_or_else(|| {
        EvalError::Configuration("the configuration does not name a reference dataset".to_string())
    })?;
    let mut references = registry.load(request)?;
    if references.len() != 1 {
        return Err(EvalError::Configuration(format!(
            "the reference source '{}' produced {} datasets, expected exactly one",
            request.source,
            references.len()
        )));
    }
    let reference = references.remove(0);
    let targets = registry.load_all(&config.targets)?;
    info!(
        reference = %reference.name(),
        targets = targets.len(),
        "Loaded datasets from configuration"
    );

    Ok(Evaluation::from_config(reference, targets, config))
}
