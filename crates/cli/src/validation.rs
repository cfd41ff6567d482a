//! Validation for CLI arguments and configuration values

use crate::error::{Error, Result};
use std::path::Path;

/// Parse a growth threshold such as "5%" or "2.5" into a percentage
pub fn parse_threshold(threshold: &str) -> Result<f64> {
    let trimmed = threshold.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("Threshold cannot be empty".to_string()));
    }

    let number = trimmed.strip_suffix('%').unwrap_or(trimmed);
    let value: f64 = number.trim().parse().map_err(|_| {
        Error::Validation(format!(
            "Invalid threshold format: '{}'. Expected a percentage such as '5%'",
            threshold
        ))
    })?;

    if !value.is_finite() || value < 0.0 {
        return Err(Error::Validation(
            "Threshold percentage must be a finite number >= 0".to_string(),
        ));
    }

    Ok(value)
}

/// Validate the maximum number of concurrent builds
pub fn validate_concurrency(concurrency: Option<usize>) -> Result<()> {
    if let Some(n) = concurrency {
        if n == 0 {
            return Err(Error::Validation(
                "Concurrency must be greater than 0".to_string(),
            ));
        }
        if n > 1024 {
            return Err(Error::Validation(
                "Concurrency cannot exceed 1024".to_string(),
            ));
        }
    }
    Ok(())
}

/// Validate file path exists and is a file
pub fn validate_file_exists(path: &Path, description: &str) -> Result<()> {
    if !path.exists() {
        return Err(Error::Validation(format!(
            "{} does not exist: {}",
            description,
            path.display()
        )));
    }

    if !path.is_file() {
        return Err(Error::Validation(format!(
            "{} is not a file: {}",
            description,
            path.display()
        )));
    }

    Ok(())
}

/// Validate directory path exists and is a directory
pub fn validate_dir_exists(path: &Path, description: &str) -> Result<()> {
    if !path.is_dir() {
        return Err(Error::Validation(format!(
            "{} is not a directory: {}",
            description,
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("5%").unwrap(), 5.0);
        assert_eq!(parse_threshold("2.5").unwrap(), 2.5);
        assert_eq!(parse_threshold(" 10 % ").unwrap(), 10.0);
        assert_eq!(parse_threshold("0%").unwrap(), 0.0);

        assert!(parse_threshold("").is_err());
        assert!(parse_threshold("-1%").is_err());
        assert!(parse_threshold("abc").is_err());
        assert!(parse_threshold("inf%").is_err());
        assert!(parse_threshold("1.5x").is_err());
    }

    #[test]
    fn test_validate_concurrency() {
        assert!(validate_concurrency(None).is_ok());
        assert!(validate_concurrency(Some(1)).is_ok());
        assert!(validate_concurrency(Some(1024)).is_ok());

        assert!(validate_concurrency(Some(0)).is_err());
        assert!(validate_concurrency(Some(1025)).is_err());
    }

    #[test]
    fn test_validate_file_exists() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("report.json");
        std::fs::write(&file_path, "[]").unwrap();

        assert!(validate_file_exists(&file_path, "Report").is_ok());
        assert!(validate_file_exists(&temp_dir.path().join("missing.json"), "Report").is_err());
        assert!(validate_file_exists(temp_dir.path(), "Report").is_err());
    }

    #[test]
    fn test_validate_dir_exists() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("file");
        std::fs::write(&file_path, "").unwrap();

        assert!(validate_dir_exists(temp_dir.path(), "Root").is_ok());
        assert!(validate_dir_exists(&file_path, "Root").is_err());
        assert!(validate_dir_exists(&temp_dir.path().join("missing"), "Root").is_err());
    }
}
