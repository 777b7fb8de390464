//! Result type alias for the exporter

use super::errors::ExporterError;

/// Result type alias for exporter operations
///
/// # Examples
///
/// ```
/// use mongo_exporter::domain::result::Result;
/// use mongo_exporter::domain::errors::ExporterError;
///
/// fn example_function() -> Result<u64> {
///     Ok(1500)
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(ExporterError::Configuration("collectionName is required".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ExporterError>;
