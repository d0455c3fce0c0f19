//! Gate applied to a file drop before anything touches the network.

use shared::domain::CandidateFile;

use crate::error::ValidationError;

/// Accept exactly one `.csv` file.
///
/// The count is checked before the name, so a multi-file drop is rejected as
/// `TooManyFiles` even when every file would pass on its own. Contents are not
/// inspected.
pub fn validate(
    candidates: impl IntoIterator<Item = CandidateFile>,
) -> Result<CandidateFile, ValidationError> {
    let mut candidates: Vec<CandidateFile> = candidates.into_iter().collect();
    if candidates.len() > 1 {
        return Err(ValidationError::TooManyFiles {
            count: candidates.len(),
        });
    }
    let file = candidates.pop().ok_or(ValidationError::NoFile)?;
    if !file.has_csv_extension() {
        return Err(ValidationError::InvalidExtension { name: file.name });
    }
    Ok(file)
}
